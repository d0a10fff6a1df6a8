mod document;
mod job;

pub use document::{Document, DocumentResponse, DocumentStatus};
pub use job::{ConversionJob, ConversionJobResponse, JobStatus};
