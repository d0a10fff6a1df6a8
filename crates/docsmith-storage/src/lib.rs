//! File storage for the conversion pipeline.
//!
//! Two key namespaces live under one root: `uploads/{document_id}_{name}`
//! for ingested source files and `jobs/{job_id}.{ext}` for produced
//! artifacts. Keys are always relative and validated against path traversal
//! before touching the filesystem.

mod local;
mod reclaim;
mod traits;

pub use local::LocalStorage;
pub use reclaim::DeleteOnDrop;
pub use traits::{ByteStream, Storage, StorageError, StorageResult};
