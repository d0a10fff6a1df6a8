//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use docsmith_convert::Dispatcher;
use docsmith_core::Config;
use docsmith_db::{DocumentRepository, JobRepository};
use docsmith_storage::Storage;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub pool: PgPool,
    pub documents: DocumentRepository,
    pub jobs: JobRepository,
    pub storage: Arc<dyn Storage>,
    pub dispatcher: Arc<Dispatcher>,
}
