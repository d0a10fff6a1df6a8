pub mod conversions;
pub mod convert;
pub mod documents;
pub mod download;
pub mod health;
pub mod jobs;
