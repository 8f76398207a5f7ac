//! Google Geocoding REST client.

use serde::Deserialize;

use super::GeocodeError;

pub const DEFAULT_GEOCODING_ENDPOINT: &str = "https://maps.googleapis.com";

/// Decoded geocoding response: Google's status string plus its hits.
/// Interpretation of the status (ZERO_RESULTS vs hard failures) belongs to
/// the geocoder, not the client.
#[derive(Debug, Clone, Default)]
pub struct GeocodeReply {
    pub status: String,
    pub error_message: Option<String>,
    pub hits: Vec<GeocodeHit>,
}

#[derive(Debug, Clone)]
pub struct GeocodeHit {
    pub latitude: f64,
    pub longitude: f64,
    pub formatted_address: String,
    pub location_type: String,
    pub components: Vec<AddressComponent>,
}

#[derive(Debug, Clone)]
pub struct AddressComponent {
    pub long_name: String,
    pub types: Vec<String>,
}

/// Seam for the geocoding service so the pipeline can run against a mock.
pub trait GeocodeApi: Send + Sync {
    fn geocode(&self, query: &str) -> Result<GeocodeReply, GeocodeError>;
}

/// Production client for the Google Geocoding API. All queries are biased
/// to India via the `region` parameter.
pub struct GoogleMapsClient {
    endpoint: String,
    api_key: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl GoogleMapsClient {
    pub fn new(api_key: &str, timeout_secs: u64) -> Self {
        Self::with_endpoint(DEFAULT_GEOCODING_ENDPOINT, api_key, timeout_secs)
    }

    pub fn with_endpoint(endpoint: &str, api_key: &str, timeout_secs: u64) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            client,
            timeout_secs,
        }
    }
}

// ──────────────────────────────────────────────
// Wire types (maps/api/geocode/json)
// ──────────────────────────────────────────────

#[derive(Deserialize)]
struct WireResponse {
    status: String,
    #[serde(default)]
    results: Vec<WireResult>,
    error_message: Option<String>,
}

#[derive(Deserialize)]
struct WireResult {
    geometry: WireGeometry,
    #[serde(default)]
    formatted_address: String,
    #[serde(default)]
    address_components: Vec<WireComponent>,
}

#[derive(Deserialize)]
struct WireGeometry {
    location: WireLocation,
    location_type: Option<String>,
}

#[derive(Deserialize)]
struct WireLocation {
    lat: f64,
    lng: f64,
}

#[derive(Deserialize)]
struct WireComponent {
    long_name: String,
    #[serde(default)]
    types: Vec<String>,
}

impl From<WireResult> for GeocodeHit {
    fn from(wire: WireResult) -> Self {
        GeocodeHit {
            latitude: wire.geometry.location.lat,
            longitude: wire.geometry.location.lng,
            formatted_address: wire.formatted_address,
            location_type: wire
                .geometry
                .location_type
                .unwrap_or_else(|| "APPROXIMATE".to_string()),
            components: wire
                .address_components
                .into_iter()
                .map(|c| AddressComponent {
                    long_name: c.long_name,
                    types: c.types,
                })
                .collect(),
        }
    }
}

impl GeocodeApi for GoogleMapsClient {
    fn geocode(&self, query: &str) -> Result<GeocodeReply, GeocodeError> {
        let url = format!("{}/maps/api/geocode/json", self.endpoint);

        let response = self
            .client
            .get(&url)
            .query(&[("address", query), ("region", "in"), ("key", &self.api_key)])
            .send()
            .map_err(|e| {
                if e.is_connect() {
                    GeocodeError::Connection(self.endpoint.clone())
                } else if e.is_timeout() {
                    GeocodeError::HttpClient(format!(
                        "Request timed out after {}s",
                        self.timeout_secs
                    ))
                } else {
                    GeocodeError::HttpClient(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(GeocodeError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: WireResponse = response
            .json()
            .map_err(|e| GeocodeError::ResponseParsing(e.to_string()))?;

        Ok(GeocodeReply {
            status: parsed.status,
            error_message: parsed.error_message,
            hits: parsed.results.into_iter().map(GeocodeHit::from).collect(),
        })
    }
}

/// Mock geocoding service — returns a configured reply and records the
/// queries it saw.
pub struct MockGeocodeApi {
    reply: GeocodeReply,
    queries: std::sync::Mutex<Vec<String>>,
}

impl MockGeocodeApi {
    pub fn with_reply(reply: GeocodeReply) -> Self {
        Self {
            reply,
            queries: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// One OK hit at the given point.
    pub fn found(latitude: f64, longitude: f64, formatted_address: &str) -> Self {
        Self::with_reply(GeocodeReply {
            status: "OK".into(),
            error_message: None,
            hits: vec![GeocodeHit {
                latitude,
                longitude,
                formatted_address: formatted_address.to_string(),
                location_type: "GEOMETRIC_CENTER".into(),
                components: Vec::new(),
            }],
        })
    }

    pub fn zero_results() -> Self {
        Self::with_reply(GeocodeReply {
            status: "ZERO_RESULTS".into(),
            ..GeocodeReply::default()
        })
    }

    pub fn with_status(status: &str, message: &str) -> Self {
        Self::with_reply(GeocodeReply {
            status: status.into(),
            error_message: Some(message.into()),
            hits: Vec::new(),
        })
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

impl GeocodeApi for MockGeocodeApi {
    fn geocode(&self, query: &str) -> Result<GeocodeReply, GeocodeError> {
        self.queries.lock().unwrap().push(query.to_string());
        Ok(self.reply.clone())
    }
}
