use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::extraction::ExtractionResult;
use crate::store::StoreError;

/// Outcome of the geocoding stage as persisted on a record.
///
/// `Pending` means geocoding has not run (or is still running in the
/// save-time background pass); `Failed` covers upstream errors, which never
/// fail the save itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeocodingStatus {
    Pending,
    Success,
    NotFound,
    Failed,
}

impl GeocodingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Success => "success",
            Self::NotFound => "not_found",
            Self::Failed => "failed",
        }
    }
}

impl std::str::FromStr for GeocodingStatus {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "success" => Ok(Self::Success),
            "not_found" => Ok(Self::NotFound),
            "failed" => Ok(Self::Failed),
            _ => Err(StoreError::InvalidField {
                field: "geocoding_status".into(),
                value: s.into(),
            }),
        }
    }
}

/// A digitized property-transfer notice.
///
/// Structured fields are all optional; the extractor leaves anything it
/// cannot read as `None` rather than guessing. `latitude` and `longitude`
/// are set together or not at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoticeRecord {
    pub id: Uuid,
    pub raw_text: String,
    pub village_name: Option<String>,
    pub survey_number: Option<String>,
    pub buyer_name: Option<String>,
    pub seller_name: Option<String>,
    pub notice_date: Option<NaiveDate>,
    pub advocate_name: Option<String>,
    pub advocate_address: Option<String>,
    pub advocate_mobile: Option<String>,
    pub district: Option<String>,
    pub taluka: Option<String>,
    pub land_area: Option<String>,
    pub confidence_score: f64,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub formatted_address: Option<String>,
    pub geocoding_status: GeocodingStatus,
    pub refinement_applied: bool,
    pub original_village_name: Option<String>,
    pub original_survey_number: Option<String>,
    pub original_notice_date: Option<String>,
    pub elapsed_ms: Option<u64>,
    pub services_used: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NoticeRecord {
    /// A fresh record around raw text, before any stage has filled it in.
    pub fn new(raw_text: impl Into<String>) -> Self {
        let now = Utc::now();
        NoticeRecord {
            id: Uuid::new_v4(),
            raw_text: raw_text.into(),
            village_name: None,
            survey_number: None,
            buyer_name: None,
            seller_name: None,
            notice_date: None,
            advocate_name: None,
            advocate_address: None,
            advocate_mobile: None,
            district: None,
            taluka: None,
            land_area: None,
            confidence_score: 0.0,
            latitude: None,
            longitude: None,
            formatted_address: None,
            geocoding_status: GeocodingStatus::Pending,
            refinement_applied: false,
            original_village_name: None,
            original_survey_number: None,
            original_notice_date: None,
            elapsed_ms: None,
            services_used: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Copy an extraction's fields onto the record. The date string is
    /// parsed day-first; confidence is clamped to [0, 1].
    pub fn apply_extraction(&mut self, fields: &ExtractionResult) {
        self.village_name = fields.village_name.clone();
        self.survey_number = fields.survey_number.clone();
        self.buyer_name = fields.buyer_name.clone();
        self.seller_name = fields.seller_name.clone();
        self.notice_date = fields.notice_date.as_deref().and_then(parse_notice_date);
        self.advocate_name = fields.advocate_name.clone();
        self.advocate_address = fields.advocate_address.clone();
        self.advocate_mobile = fields.advocate_mobile.clone();
        self.district = fields.district.clone();
        self.taluka = fields.taluka.clone();
        self.land_area = fields.land_area.clone();
        self.confidence_score = fields.confidence.clamp(0.0, 1.0);
    }

    pub fn has_coordinates(&self) -> bool {
        self.latitude.is_some() && self.longitude.is_some()
    }

    /// Google Maps link for the dashboard, present only when both
    /// coordinates are.
    pub fn maps_url(&self) -> Option<String> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) => {
                Some(format!("https://www.google.com/maps?q={lat},{lng}"))
            }
            _ => None,
        }
    }
}

/// One diagnostic line from a processing run, kept separately from the
/// record and cascade-deleted with it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingLogEntry {
    pub id: Uuid,
    pub notice_id: Uuid,
    pub stage: String,
    pub detail: String,
    pub created_at: DateTime<Utc>,
}

impl ProcessingLogEntry {
    pub fn new(notice_id: Uuid, stage: &str, detail: impl Into<String>) -> Self {
        ProcessingLogEntry {
            id: Uuid::new_v4(),
            notice_id,
            stage: stage.to_string(),
            detail: detail.into(),
            created_at: Utc::now(),
        }
    }
}

/// Parse the date formats the notices and the dashboard actually send.
/// Notices write day-first (૧૫/૦૩/૨૦૨૪ transliterated as 15/03/2024); the
/// dashboard round-trips ISO.
pub fn parse_notice_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    ["%d/%m/%Y", "%d-%m-%Y", "%Y-%m-%d"]
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(s, format).ok())
}
