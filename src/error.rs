use thiserror::Error;

#[derive(Error, Debug)]
pub enum TalentError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV parsing failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("Spreadsheet parsing failed: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {message}")]
    Database { message: String },

    #[error("Environment variable error: {0}")]
    Env(#[from] std::env::VarError),
}

impl From<rusqlite::Error> for TalentError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Database {
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TalentError>;
