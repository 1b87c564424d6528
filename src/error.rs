use thiserror::Error;

#[derive(Error, Debug)]
pub enum GlError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Workbook error: {0}")]
    Workbook(String),

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Sheet not found: {0}")]
    SheetNotFound(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, GlError>;
