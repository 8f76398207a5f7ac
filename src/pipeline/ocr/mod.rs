pub mod reader;
pub mod vision;

pub use reader::*;
pub use vision::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum OcrError {
    #[error("Image file not found: {0}")]
    FileNotFound(String),

    #[error("No text detected in image")]
    NoTextDetected,

    #[error("Detected text is empty")]
    EmptyText,

    #[error("Vision API key is not configured")]
    Configuration,

    #[error("Vision API returned error (status {status}): {message}")]
    VisionApi { status: u16, message: String },

    #[error("Cannot reach Vision API at {0}")]
    Connection(String),

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
