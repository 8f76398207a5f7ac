pub mod geocoder;
pub mod maps;
pub mod reconcile;

pub use geocoder::*;
pub use maps::*;
pub use reconcile::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GeocodeError {
    #[error("Maps API key is not configured")]
    Configuration,

    #[error("Geocoding API status {status}: {message}")]
    Api { status: String, message: String },

    #[error("Geocoding API returned error (status {status}): {body}")]
    Http { status: u16, body: String },

    #[error("Cannot reach Geocoding API at {0}")]
    Connection(String),

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),
}
