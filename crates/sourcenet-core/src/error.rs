//! Error types for the SourceNet pipeline.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("required column `{name}` missing from input table")]
    MissingColumn { name: String },

    #[error("input table contains no event rows")]
    EmptyTable,

    #[error("malformed row {row}: {reason}")]
    MalformedRow { row: usize, reason: String },

    #[error("tensor shape mismatch: expected ({expected_rows}, {expected_cols}), got ({rows}, {cols})")]
    Shape {
        expected_rows: usize,
        expected_cols: usize,
        rows: usize,
        cols: usize,
    },

    #[error("training failed: {0}")]
    Training(String),

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("report artifact error: {0}")]
    Report(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<config::ConfigError> for Error {
    fn from(e: config::ConfigError) -> Self {
        Error::Config(e.to_string())
    }
}
