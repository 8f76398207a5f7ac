use serde::{Deserialize, Serialize};

use super::notice::GeocodingStatus;

/// Result of geocoding one village name, in the shape the dashboard and the
/// record-merge step both consume.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocodeResult {
    pub village_name: String,
    pub success: bool,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub formatted_address: Option<String>,
    pub district: Option<String>,
    pub taluka: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub confidence: f64,
    pub status: GeocodingStatus,
    pub error: Option<String>,
}

impl GeocodeResult {
    pub fn not_found(village_name: impl Into<String>) -> Self {
        GeocodeResult {
            village_name: village_name.into(),
            success: false,
            latitude: None,
            longitude: None,
            formatted_address: None,
            district: None,
            taluka: None,
            state: None,
            country: None,
            confidence: 0.0,
            status: GeocodingStatus::NotFound,
            error: None,
        }
    }

    pub fn failed(village_name: impl Into<String>, error: impl Into<String>) -> Self {
        GeocodeResult {
            error: Some(error.into()),
            status: GeocodingStatus::Failed,
            ..GeocodeResult::not_found(village_name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_constructors_carry_status() {
        let missing = GeocodeResult::not_found("રીબડા");
        assert!(!missing.success);
        assert_eq!(missing.status, GeocodingStatus::NotFound);
        assert!(missing.error.is_none());

        let broken = GeocodeResult::failed("રીબડા", "connect timeout");
        assert_eq!(broken.status, GeocodingStatus::Failed);
        assert_eq!(broken.error.as_deref(), Some("connect timeout"));
    }
}
