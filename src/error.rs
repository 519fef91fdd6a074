use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReconciliationError {
    #[error("Empty input batch: {0}")]
    EmptyBatch(&'static str),

    #[error("Required column '{column}' missing from every {kind} row")]
    MissingColumn {
        kind: &'static str,
        column: &'static str,
    },

    #[error("Invoice history store unavailable: {0}")]
    HistoryStoreUnavailable(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ReconciliationError>;
