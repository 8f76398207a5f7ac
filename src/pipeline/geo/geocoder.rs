//! Village-name geocoding and the sequential batch sweep.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::models::notice::GeocodingStatus;
use crate::models::GeocodeResult;
use crate::pipeline::cleaner::clean_village_name;

use super::maps::{GeocodeApi, GeocodeHit};
use super::GeocodeError;

/// One village to geocode, with the extracted district when we have it to
/// disambiguate same-named villages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VillageQuery {
    pub village: String,
    #[serde(default)]
    pub district: Option<String>,
}

/// Geocode one village name.
///
/// The name is cleaned first, then anchored with ", Gujarat, India" so a
/// bare village name cannot match a same-named place elsewhere. ZERO_RESULTS
/// is a successful call with a not-found outcome; every other non-OK status
/// is an upstream error.
pub fn geocode_village(
    api: &dyn GeocodeApi,
    village: &str,
    district: Option<&str>,
) -> Result<GeocodeResult, GeocodeError> {
    let cleaned = clean_village_name(village);
    let query = build_query(&cleaned, district);
    let _span = tracing::info_span!("geocode", village = %cleaned).entered();

    let reply = api.geocode(&query)?;
    match reply.status.as_str() {
        "OK" => {
            let Some(hit) = reply.hits.into_iter().next() else {
                return Err(GeocodeError::ResponseParsing(
                    "status OK with no results".into(),
                ));
            };
            tracing::info!(
                lat = hit.latitude,
                lng = hit.longitude,
                location_type = %hit.location_type,
                "geocoded"
            );
            Ok(result_from_hit(cleaned, hit))
        }
        "ZERO_RESULTS" => {
            tracing::info!("no geocoding match");
            Ok(GeocodeResult::not_found(cleaned))
        }
        other => Err(GeocodeError::Api {
            status: other.to_string(),
            message: reply.error_message.unwrap_or_default(),
        }),
    }
}

/// Geocode a list sequentially with a fixed pause between calls. Per-entry
/// failures become failed results; the sweep itself never aborts.
pub fn geocode_batch(
    api: &dyn GeocodeApi,
    queries: &[VillageQuery],
    delay: Duration,
) -> Vec<GeocodeResult> {
    queries
        .iter()
        .enumerate()
        .map(|(index, query)| {
            if index > 0 && !delay.is_zero() {
                std::thread::sleep(delay);
            }
            match geocode_village(api, &query.village, query.district.as_deref()) {
                Ok(result) => result,
                Err(e) => {
                    tracing::warn!(village = %query.village, error = %e, "batch entry failed");
                    GeocodeResult::failed(clean_village_name(&query.village), e.to_string())
                }
            }
        })
        .collect()
}

fn build_query(village: &str, district: Option<&str>) -> String {
    match district.map(str::trim).filter(|d| !d.is_empty()) {
        Some(district) => format!("{village}, {district}, Gujarat, India"),
        None => format!("{village}, Gujarat, India"),
    }
}

fn result_from_hit(village_name: String, hit: GeocodeHit) -> GeocodeResult {
    GeocodeResult {
        village_name,
        success: true,
        latitude: Some(hit.latitude),
        longitude: Some(hit.longitude),
        confidence: location_type_confidence(&hit.location_type),
        district: component_of(&hit, "administrative_area_level_2"),
        taluka: component_of(&hit, "administrative_area_level_3"),
        state: component_of(&hit, "administrative_area_level_1"),
        country: component_of(&hit, "country"),
        formatted_address: Some(hit.formatted_address),
        status: GeocodingStatus::Success,
        error: None,
    }
}

fn component_of(hit: &GeocodeHit, kind: &str) -> Option<String> {
    hit.components
        .iter()
        .find(|component| component.types.iter().any(|t| t == kind))
        .map(|component| component.long_name.clone())
}

/// Geocoder confidence from Google's own precision class.
fn location_type_confidence(location_type: &str) -> f64 {
    match location_type {
        "ROOFTOP" => 0.95,
        "RANGE_INTERPOLATED" => 0.85,
        "GEOMETRIC_CENTER" => 0.75,
        _ => 0.6,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::geo::maps::{AddressComponent, GeocodeReply, MockGeocodeApi};

    fn rajkot_hit() -> GeocodeHit {
        GeocodeHit {
            latitude: 21.9804,
            longitude: 70.7907,
            formatted_address: "Ribda, Gujarat 360311, India".into(),
            location_type: "APPROXIMATE".into(),
            components: vec![
                AddressComponent {
                    long_name: "Ribda".into(),
                    types: vec!["locality".into(), "political".into()],
                },
                AddressComponent {
                    long_name: "Gondal Taluka".into(),
                    types: vec!["administrative_area_level_3".into(), "political".into()],
                },
                AddressComponent {
                    long_name: "Rajkot".into(),
                    types: vec!["administrative_area_level_2".into(), "political".into()],
                },
                AddressComponent {
                    long_name: "Gujarat".into(),
                    types: vec!["administrative_area_level_1".into(), "political".into()],
                },
                AddressComponent {
                    long_name: "India".into(),
                    types: vec!["country".into(), "political".into()],
                },
            ],
        }
    }

    #[test]
    fn success_maps_components_and_confidence() {
        let mock = MockGeocodeApi::with_reply(GeocodeReply {
            status: "OK".into(),
            error_message: None,
            hits: vec![rajkot_hit()],
        });
        let result = geocode_village(&mock, "રીબડા", None).unwrap();

        assert!(result.success);
        assert_eq!(result.status, GeocodingStatus::Success);
        assert_eq!(result.latitude, Some(21.9804));
        assert_eq!(result.district.as_deref(), Some("Rajkot"));
        assert_eq!(result.taluka.as_deref(), Some("Gondal Taluka"));
        assert_eq!(result.state.as_deref(), Some("Gujarat"));
        assert_eq!(result.country.as_deref(), Some("India"));
        assert!((result.confidence - 0.6).abs() < 1e-9, "APPROXIMATE -> 0.6");
    }

    #[test]
    fn query_is_cleaned_and_anchored_to_gujarat() {
        let mock = MockGeocodeApi::zero_results();
        geocode_village(&mock, "ગામ રીબડાના રેવન્યુ સર્વે નં ૩૬૭", None).unwrap();
        assert_eq!(mock.queries(), vec!["રીબડા, Gujarat, India".to_string()]);
    }

    #[test]
    fn district_lands_between_village_and_state() {
        let mock = MockGeocodeApi::zero_results();
        geocode_village(&mock, "રીબડા", Some("રાજકોટ")).unwrap();
        assert_eq!(
            mock.queries(),
            vec!["રીબડા, રાજકોટ, Gujarat, India".to_string()]
        );
    }

    #[test]
    fn zero_results_is_not_found_not_error() {
        let mock = MockGeocodeApi::zero_results();
        let result = geocode_village(&mock, "રીબડા", None).unwrap();
        assert!(!result.success);
        assert_eq!(result.status, GeocodingStatus::NotFound);
        assert!(result.error.is_none());
    }

    #[test]
    fn denied_status_is_an_error() {
        let mock = MockGeocodeApi::with_status("REQUEST_DENIED", "The provided API key is invalid.");
        let err = geocode_village(&mock, "રીબડા", None).unwrap_err();
        match err {
            GeocodeError::Api { status, message } => {
                assert_eq!(status, "REQUEST_DENIED");
                assert!(message.contains("invalid"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn location_type_confidence_ladder() {
        assert_eq!(location_type_confidence("ROOFTOP"), 0.95);
        assert_eq!(location_type_confidence("RANGE_INTERPOLATED"), 0.85);
        assert_eq!(location_type_confidence("GEOMETRIC_CENTER"), 0.75);
        assert_eq!(location_type_confidence("APPROXIMATE"), 0.6);
        assert_eq!(location_type_confidence("anything else"), 0.6);
    }

    #[test]
    fn batch_continues_past_failing_entries() {
        struct FlakyApi {
            calls: std::sync::Mutex<usize>,
        }
        impl GeocodeApi for FlakyApi {
            fn geocode(&self, _query: &str) -> Result<GeocodeReply, GeocodeError> {
                let mut calls = self.calls.lock().unwrap();
                *calls += 1;
                if *calls == 2 {
                    Err(GeocodeError::HttpClient("connection reset".into()))
                } else {
                    Ok(GeocodeReply {
                        status: "ZERO_RESULTS".into(),
                        ..GeocodeReply::default()
                    })
                }
            }
        }

        let api = FlakyApi {
            calls: std::sync::Mutex::new(0),
        };
        let queries = vec![
            VillageQuery { village: "રીબડા".into(), district: None },
            VillageQuery { village: "કુવાડવા".into(), district: None },
            VillageQuery { village: "શાપર".into(), district: None },
        ];
        let results = geocode_batch(&api, &queries, Duration::ZERO);

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].status, GeocodingStatus::NotFound);
        assert_eq!(results[1].status, GeocodingStatus::Failed);
        assert!(results[1].error.as_deref().unwrap().contains("connection reset"));
        assert_eq!(results[2].status, GeocodingStatus::NotFound);
    }

    #[test]
    fn empty_batch_is_fine() {
        let mock = MockGeocodeApi::zero_results();
        assert!(geocode_batch(&mock, &[], Duration::ZERO).is_empty());
    }
}
