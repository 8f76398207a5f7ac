//! Reconciliation between the geocoder's coordinates and the model's.
//!
//! Pure policy over two optional estimates. Within the agreement radius the
//! geocoder wins outright (it is the authority on *where a name is*; the
//! model merely corroborates). Beyond it the two disagree about which
//! village this is, so the more confident source wins and the loser is
//! recorded rather than dropped.

use serde::Serialize;

pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Two estimates within this distance are the same village.
pub const AGREEMENT_THRESHOLD_KM: f64 = 10.0;

/// Ceiling applied when only one source produced coordinates: nothing
/// corroborated it, so it never counts as fully confident.
pub const SINGLE_SOURCE_MAX_CONFIDENCE: f64 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateEstimate {
    pub latitude: f64,
    pub longitude: f64,
    pub confidence: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinateSource {
    Geocoder,
    Model,
}

/// The chosen coordinates, how they were chosen, and what was rejected.
#[derive(Debug, Clone, Serialize)]
pub struct ReconciledCoordinates {
    pub latitude: f64,
    pub longitude: f64,
    pub confidence: f64,
    pub source: CoordinateSource,
    /// True only when both sources existed and agreed.
    pub verified: bool,
    pub distance_km: Option<f64>,
    pub rejected: Option<RejectedEstimate>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RejectedEstimate {
    pub source: CoordinateSource,
    pub latitude: f64,
    pub longitude: f64,
    pub confidence: f64,
    pub distance_km: f64,
}

/// Great-circle distance in kilometers.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Reconcile the two estimates. None in, None out; one in, that one out
/// with its confidence capped.
pub fn reconcile(
    geocoder: Option<CoordinateEstimate>,
    model: Option<CoordinateEstimate>,
) -> Option<ReconciledCoordinates> {
    match (geocoder, model) {
        (None, None) => None,
        (Some(estimate), None) => Some(single_source(estimate, CoordinateSource::Geocoder)),
        (None, Some(estimate)) => Some(single_source(estimate, CoordinateSource::Model)),
        (Some(geo), Some(model)) => {
            let distance = haversine_km(
                geo.latitude,
                geo.longitude,
                model.latitude,
                model.longitude,
            );
            if distance <= AGREEMENT_THRESHOLD_KM {
                Some(ReconciledCoordinates {
                    latitude: geo.latitude,
                    longitude: geo.longitude,
                    confidence: geo.confidence.max(model.confidence),
                    source: CoordinateSource::Geocoder,
                    verified: true,
                    distance_km: Some(distance),
                    rejected: None,
                })
            } else if geo.confidence >= model.confidence {
                Some(disagreement(geo, CoordinateSource::Geocoder, model, CoordinateSource::Model, distance))
            } else {
                Some(disagreement(model, CoordinateSource::Model, geo, CoordinateSource::Geocoder, distance))
            }
        }
    }
}

fn single_source(estimate: CoordinateEstimate, source: CoordinateSource) -> ReconciledCoordinates {
    ReconciledCoordinates {
        latitude: estimate.latitude,
        longitude: estimate.longitude,
        confidence: estimate.confidence.min(SINGLE_SOURCE_MAX_CONFIDENCE),
        source,
        verified: false,
        distance_km: None,
        rejected: None,
    }
}

fn disagreement(
    winner: CoordinateEstimate,
    winner_source: CoordinateSource,
    loser: CoordinateEstimate,
    loser_source: CoordinateSource,
    distance: f64,
) -> ReconciledCoordinates {
    tracing::warn!(
        distance_km = distance,
        winner = ?winner_source,
        "coordinate sources disagree"
    );
    ReconciledCoordinates {
        latitude: winner.latitude,
        longitude: winner.longitude,
        confidence: winner.confidence,
        source: winner_source,
        verified: false,
        distance_km: Some(distance),
        rejected: Some(RejectedEstimate {
            source: loser_source,
            latitude: loser.latitude,
            longitude: loser.longitude,
            confidence: loser.confidence,
            distance_km: distance,
        }),
    }
}
