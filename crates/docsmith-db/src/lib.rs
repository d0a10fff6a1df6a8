//! Database repositories for the data access layer.
//!
//! Each repository owns one table and exposes CRUD plus the status
//! transitions the conversion pipeline needs. Transitions are conditional
//! updates keyed on the expected current status, so concurrent writers can
//! never move a record backwards.

pub mod db;

pub use db::documents::DocumentRepository;
pub use db::jobs::JobRepository;
