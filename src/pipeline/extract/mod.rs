pub mod extractor;
pub mod gemini;
pub mod parser;
pub mod prompt;
pub mod refine;
pub mod village;

pub use extractor::*;
pub use gemini::*;
pub use parser::*;
pub use refine::*;
pub use village::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Gemini API key is not configured")]
    Configuration,

    #[error("Gemini API returned error (status {status}): {body}")]
    GeminiApi { status: u16, body: String },

    #[error("Cannot reach Gemini API at {0}")]
    Connection(String),

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Model returned no completion")]
    EmptyCompletion,

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),
}
