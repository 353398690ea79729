use thiserror::Error;

#[derive(Error, Debug)]
pub enum FxError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid CSV header. Expected: '{expected}', but was: '{found}'")]
    InvalidHeader { expected: String, found: String },

    #[error("Invalid JSON batch: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, FxError>;
