pub mod documents;
pub mod jobs;
