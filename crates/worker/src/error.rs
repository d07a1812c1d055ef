use geti_core::error::CoreError;
use geti_db::DbError;

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Db(#[from] DbError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid event payload: {0}")]
    Payload(#[from] serde_json::Error),
}
