//! Pipeline error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Database error: {0}")]
    Database(#[from] ragner_db::DbError),

    #[error("Core error: {0}")]
    Core(#[from] ragner_core::CoreError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Unknown prompt: {0}")]
    UnknownPrompt(String),

    #[error("Request cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, ExtractError>;
