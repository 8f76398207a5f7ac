//! Firestore REST implementation of the notice store.
//!
//! Documents API v1 with key-parameter auth. Records live in the
//! `notices` collection, their log lines in `processing_logs`; deletes go
//! through `:commit` so a record and its logs disappear together, and the
//! coordinate-gap sweep reads through `:runQuery`.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{parse_notice_date, GeocodingStatus, NoticeRecord, ProcessingLogEntry};

use super::{NoticeStore, StoreError};

pub const DEFAULT_FIRESTORE_ENDPOINT: &str = "https://firestore.googleapis.com";

const NOTICES_COLLECTION: &str = "notices";
const LOGS_COLLECTION: &str = "processing_logs";

/// Field paths written on update. `id` and `created_at` are deliberately
/// absent so a merge can never change a record's identity or birth time.
const UPDATE_MASK: &[&str] = &[
    "raw_text",
    "village_name",
    "survey_number",
    "buyer_name",
    "seller_name",
    "notice_date",
    "advocate_name",
    "advocate_address",
    "advocate_mobile",
    "district",
    "taluka",
    "land_area",
    "confidence_score",
    "latitude",
    "longitude",
    "formatted_address",
    "geocoding_status",
    "refinement_applied",
    "original_village_name",
    "original_survey_number",
    "original_notice_date",
    "elapsed_ms",
    "services_used",
    "updated_at",
];

/// Production client for the Firestore REST API.
#[derive(Debug)]
pub struct FirestoreStore {
    endpoint: String,
    project: String,
    api_key: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl FirestoreStore {
    pub fn new(project: &str, api_key: &str, timeout_secs: u64) -> Self {
        Self::with_endpoint(DEFAULT_FIRESTORE_ENDPOINT, project, api_key, timeout_secs)
    }

    pub fn with_endpoint(endpoint: &str, project: &str, api_key: &str, timeout_secs: u64) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            project: project.to_string(),
            api_key: api_key.to_string(),
            client,
            timeout_secs,
        }
    }

    fn documents_url(&self, suffix: &str) -> String {
        format!(
            "{}/v1/projects/{}/databases/(default)/documents{}",
            self.endpoint, self.project, suffix
        )
    }

    /// Full resource name, the form `:commit` writes refer to.
    fn resource_name(&self, collection: &str, id: &Uuid) -> String {
        format!(
            "projects/{}/databases/(default)/documents/{}/{}",
            self.project, collection, id
        )
    }

    fn request_error(&self, e: reqwest::Error) -> StoreError {
        if e.is_connect() {
            StoreError::Connection(self.endpoint.clone())
        } else if e.is_timeout() {
            StoreError::HttpClient(format!("Request timed out after {}s", self.timeout_secs))
        } else {
            StoreError::HttpClient(e.to_string())
        }
    }

    fn check(response: reqwest::blocking::Response) -> Result<reqwest::blocking::Response, StoreError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().unwrap_or_default();
        Err(StoreError::Firestore {
            status: status.as_u16(),
            body,
        })
    }

    fn parse<T: DeserializeOwned>(response: reqwest::blocking::Response) -> Result<T, StoreError> {
        response
            .json()
            .map_err(|e| StoreError::ResponseParsing(e.to_string()))
    }

    fn run_query(&self, query: StructuredQuery) -> Result<Vec<FireDocument>, StoreError> {
        let response = self
            .client
            .post(self.documents_url(":runQuery"))
            .query(&[("key", &self.api_key)])
            .json(&RunQueryBody {
                structured_query: query,
            })
            .send()
            .map_err(|e| self.request_error(e))?;
        let entries: Vec<RunQueryEntry> = Self::parse(Self::check(response)?)?;
        Ok(entries.into_iter().filter_map(|e| e.document).collect())
    }
}

impl NoticeStore for FirestoreStore {
    fn save(&self, record: &NoticeRecord) -> Result<NoticeRecord, StoreError> {
        let mut stored = record.clone();
        stored.id = Uuid::new_v4();
        let now = Utc::now();
        stored.created_at = now;
        stored.updated_at = now;

        let response = self
            .client
            .post(self.documents_url(&format!("/{NOTICES_COLLECTION}")))
            .query(&[
                ("documentId", stored.id.to_string()),
                ("key", self.api_key.clone()),
            ])
            .json(&FireDocument::with_fields(encode_notice(&stored)))
            .send()
            .map_err(|e| self.request_error(e))?;
        Self::check(response)?;

        let entry = ProcessingLogEntry::new(stored.id, "saved", "notice persisted");
        if let Err(e) = self.append_log(&entry) {
            tracing::warn!(notice_id = %stored.id, error = %e, "could not append save log entry");
        }

        tracing::info!(notice_id = %stored.id, "notice saved");
        Ok(stored)
    }

    fn get(&self, id: &Uuid) -> Result<Option<NoticeRecord>, StoreError> {
        let response = self
            .client
            .get(self.documents_url(&format!("/{NOTICES_COLLECTION}/{id}")))
            .query(&[("key", &self.api_key)])
            .send()
            .map_err(|e| self.request_error(e))?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let document: FireDocument = Self::parse(Self::check(response)?)?;
        decode_notice(&document).map(Some)
    }

    fn list(&self, limit: usize) -> Result<Vec<NoticeRecord>, StoreError> {
        let response = self
            .client
            .get(self.documents_url(&format!("/{NOTICES_COLLECTION}")))
            .query(&[
                ("pageSize", limit.to_string()),
                ("orderBy", "created_at desc".to_string()),
                ("key", self.api_key.clone()),
            ])
            .send()
            .map_err(|e| self.request_error(e))?;
        let reply: ListReply = Self::parse(Self::check(response)?)?;
        reply.documents.iter().map(decode_notice).collect()
    }

    fn update(&self, record: &NoticeRecord) -> Result<NoticeRecord, StoreError> {
        let mut updated = record.clone();
        updated.updated_at = Utc::now();

        let mut params: Vec<(&str, String)> = vec![
            ("currentDocument.exists", "true".into()),
            ("key", self.api_key.clone()),
        ];
        for field in UPDATE_MASK {
            params.push(("updateMask.fieldPaths", (*field).to_string()));
        }

        let response = self
            .client
            .patch(self.documents_url(&format!("/{NOTICES_COLLECTION}/{}", record.id)))
            .query(&params)
            .json(&FireDocument::with_fields(encode_notice(&updated)))
            .send()
            .map_err(|e| self.request_error(e))?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound(record.id));
        }
        // The reply carries the merged document, with the server's own
        // created_at untouched by the mask.
        let document: FireDocument = Self::parse(Self::check(response)?)?;
        decode_notice(&document)
    }

    fn delete(&self, id: &Uuid) -> Result<bool, StoreError> {
        if self.get(id)?.is_none() {
            return Ok(false);
        }
        let logs = self.logs_for(id)?;

        let mut writes = vec![FireWrite {
            delete: self.resource_name(NOTICES_COLLECTION, id),
        }];
        writes.extend(logs.iter().map(|entry| FireWrite {
            delete: self.resource_name(LOGS_COLLECTION, &entry.id),
        }));

        let response = self
            .client
            .post(self.documents_url(":commit"))
            .query(&[("key", &self.api_key)])
            .json(&FireCommit { writes })
            .send()
            .map_err(|e| self.request_error(e))?;
        Self::check(response)?;

        tracing::info!(notice_id = %id, log_entries = logs.len(), "notice deleted");
        Ok(true)
    }

    fn list_missing_coordinates(&self) -> Result<Vec<NoticeRecord>, StoreError> {
        let query = StructuredQuery {
            from: vec![CollectionSelector {
                collection_id: NOTICES_COLLECTION.into(),
            }],
            filter: Some(QueryFilter {
                unary_filter: Some(UnaryFilter {
                    op: "IS_NULL".into(),
                    field: FieldReference {
                        field_path: "latitude".into(),
                    },
                }),
                field_filter: None,
            }),
        };

        let documents = self.run_query(query)?;
        let mut records = documents
            .iter()
            .map(decode_notice)
            .collect::<Result<Vec<_>, _>>()?;
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(records)
    }

    fn append_log(&self, entry: &ProcessingLogEntry) -> Result<(), StoreError> {
        let response = self
            .client
            .post(self.documents_url(&format!("/{LOGS_COLLECTION}")))
            .query(&[
                ("documentId", entry.id.to_string()),
                ("key", self.api_key.clone()),
            ])
            .json(&FireDocument::with_fields(encode_log(entry)))
            .send()
            .map_err(|e| self.request_error(e))?;
        Self::check(response)?;
        Ok(())
    }

    fn logs_for(&self, notice_id: &Uuid) -> Result<Vec<ProcessingLogEntry>, StoreError> {
        let query = StructuredQuery {
            from: vec![CollectionSelector {
                collection_id: LOGS_COLLECTION.into(),
            }],
            filter: Some(QueryFilter {
                unary_filter: None,
                field_filter: Some(FieldFilter {
                    field: FieldReference {
                        field_path: "notice_id".into(),
                    },
                    op: "EQUAL".into(),
                    value: FireValue::string(&notice_id.to_string()),
                }),
            }),
        };

        let documents = self.run_query(query)?;
        let mut entries = documents
            .iter()
            .map(decode_log)
            .collect::<Result<Vec<_>, _>>()?;
        // Ordering server-side would need a composite index; sort here.
        entries.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(entries)
    }

    fn count(&self) -> Result<usize, StoreError> {
        let body = AggregationBody {
            structured_aggregation_query: StructuredAggregationQuery {
                structured_query: StructuredQuery {
                    from: vec![CollectionSelector {
                        collection_id: NOTICES_COLLECTION.into(),
                    }],
                    filter: None,
                },
                aggregations: vec![Aggregation {
                    count: CountAggregation {},
                    alias: "count".into(),
                }],
            },
        };

        let response = self
            .client
            .post(self.documents_url(":runAggregationQuery"))
            .query(&[("key", &self.api_key)])
            .json(&body)
            .send()
            .map_err(|e| self.request_error(e))?;
        let entries: Vec<AggregationEntry> = Self::parse(Self::check(response)?)?;

        entries
            .iter()
            .find_map(|entry| entry.result.as_ref())
            .and_then(|result| result.aggregate_fields.get("count"))
            .and_then(FireValue::as_i64)
            .map(|count| count as usize)
            .ok_or_else(|| StoreError::ResponseParsing("no count in aggregation reply".into()))
    }
}

// ---------------------------------------------------------------------------
// Wire types (documents API)
// ---------------------------------------------------------------------------

/// One typed Firestore value; exactly one branch is set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FireValue {
    #[serde(skip_serializing_if = "Option::is_none")]
    string_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    double_value: Option<f64>,
    /// Firestore wires 64-bit integers as decimal strings.
    #[serde(skip_serializing_if = "Option::is_none")]
    integer_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    boolean_value: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    timestamp_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    null_value: Option<()>,
    #[serde(skip_serializing_if = "Option::is_none")]
    array_value: Option<FireArray>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct FireArray {
    #[serde(default)]
    values: Vec<FireValue>,
}

impl FireValue {
    fn string(s: &str) -> Self {
        FireValue {
            string_value: Some(s.to_string()),
            ..Default::default()
        }
    }

    fn opt_string(s: Option<&str>) -> Self {
        match s {
            Some(s) => Self::string(s),
            None => Self::null(),
        }
    }

    fn double(value: f64) -> Self {
        FireValue {
            double_value: Some(value),
            ..Default::default()
        }
    }

    fn opt_double(value: Option<f64>) -> Self {
        match value {
            Some(value) => Self::double(value),
            None => Self::null(),
        }
    }

    fn integer(value: i64) -> Self {
        FireValue {
            integer_value: Some(value.to_string()),
            ..Default::default()
        }
    }

    fn opt_integer(value: Option<i64>) -> Self {
        match value {
            Some(value) => Self::integer(value),
            None => Self::null(),
        }
    }

    fn boolean(value: bool) -> Self {
        FireValue {
            boolean_value: Some(value),
            ..Default::default()
        }
    }

    fn timestamp(value: DateTime<Utc>) -> Self {
        FireValue {
            timestamp_value: Some(value.to_rfc3339_opts(SecondsFormat::Micros, true)),
            ..Default::default()
        }
    }

    fn null() -> Self {
        FireValue {
            null_value: Some(()),
            ..Default::default()
        }
    }

    fn strings(values: &[String]) -> Self {
        FireValue {
            array_value: Some(FireArray {
                values: values.iter().map(|s| Self::string(s)).collect(),
            }),
            ..Default::default()
        }
    }

    fn as_str(&self) -> Option<&str> {
        self.string_value.as_deref()
    }

    fn as_f64(&self) -> Option<f64> {
        self.double_value
    }

    fn as_i64(&self) -> Option<i64> {
        self.integer_value.as_deref().and_then(|s| s.parse().ok())
    }

    fn as_bool(&self) -> Option<bool> {
        self.boolean_value
    }

    fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp_value
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|t| t.with_timezone(&Utc))
    }

    fn string_items(&self) -> Vec<String> {
        self.array_value
            .as_ref()
            .map(|array| {
                array
                    .values
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FireDocument {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default)]
    fields: BTreeMap<String, FireValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    create_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    update_time: Option<String>,
}

impl FireDocument {
    fn with_fields(fields: BTreeMap<String, FireValue>) -> Self {
        FireDocument {
            fields,
            ..Default::default()
        }
    }
}

#[derive(Deserialize)]
struct ListReply {
    #[serde(default)]
    documents: Vec<FireDocument>,
}

#[derive(Serialize)]
struct FireCommit {
    writes: Vec<FireWrite>,
}

#[derive(Serialize)]
struct FireWrite {
    delete: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RunQueryBody {
    structured_query: StructuredQuery,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StructuredQuery {
    from: Vec<CollectionSelector>,
    #[serde(rename = "where", skip_serializing_if = "Option::is_none")]
    filter: Option<QueryFilter>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CollectionSelector {
    collection_id: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    unary_filter: Option<UnaryFilter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    field_filter: Option<FieldFilter>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UnaryFilter {
    op: String,
    field: FieldReference,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FieldFilter {
    field: FieldReference,
    op: String,
    value: FireValue,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FieldReference {
    field_path: String,
}

#[derive(Deserialize)]
struct RunQueryEntry {
    #[serde(default)]
    document: Option<FireDocument>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AggregationBody {
    structured_aggregation_query: StructuredAggregationQuery,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StructuredAggregationQuery {
    structured_query: StructuredQuery,
    aggregations: Vec<Aggregation>,
}

#[derive(Serialize)]
struct Aggregation {
    count: CountAggregation,
    alias: String,
}

#[derive(Serialize)]
struct CountAggregation {}

#[derive(Deserialize)]
struct AggregationEntry {
    result: Option<AggregationResult>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AggregationResult {
    #[serde(default)]
    aggregate_fields: BTreeMap<String, FireValue>,
}

// ---------------------------------------------------------------------------
// Record <-> document mapping
// ---------------------------------------------------------------------------

fn encode_notice(record: &NoticeRecord) -> BTreeMap<String, FireValue> {
    let mut fields = BTreeMap::new();
    fields.insert("id".into(), FireValue::string(&record.id.to_string()));
    fields.insert("raw_text".into(), FireValue::string(&record.raw_text));
    fields.insert(
        "village_name".into(),
        FireValue::opt_string(record.village_name.as_deref()),
    );
    fields.insert(
        "survey_number".into(),
        FireValue::opt_string(record.survey_number.as_deref()),
    );
    fields.insert(
        "buyer_name".into(),
        FireValue::opt_string(record.buyer_name.as_deref()),
    );
    fields.insert(
        "seller_name".into(),
        FireValue::opt_string(record.seller_name.as_deref()),
    );
    fields.insert(
        "notice_date".into(),
        FireValue::opt_string(record.notice_date.map(|d| d.to_string()).as_deref()),
    );
    fields.insert(
        "advocate_name".into(),
        FireValue::opt_string(record.advocate_name.as_deref()),
    );
    fields.insert(
        "advocate_address".into(),
        FireValue::opt_string(record.advocate_address.as_deref()),
    );
    fields.insert(
        "advocate_mobile".into(),
        FireValue::opt_string(record.advocate_mobile.as_deref()),
    );
    fields.insert(
        "district".into(),
        FireValue::opt_string(record.district.as_deref()),
    );
    fields.insert(
        "taluka".into(),
        FireValue::opt_string(record.taluka.as_deref()),
    );
    fields.insert(
        "land_area".into(),
        FireValue::opt_string(record.land_area.as_deref()),
    );
    fields.insert(
        "confidence_score".into(),
        FireValue::double(record.confidence_score),
    );
    fields.insert("latitude".into(), FireValue::opt_double(record.latitude));
    fields.insert("longitude".into(), FireValue::opt_double(record.longitude));
    fields.insert(
        "formatted_address".into(),
        FireValue::opt_string(record.formatted_address.as_deref()),
    );
    fields.insert(
        "geocoding_status".into(),
        FireValue::string(record.geocoding_status.as_str()),
    );
    fields.insert(
        "refinement_applied".into(),
        FireValue::boolean(record.refinement_applied),
    );
    fields.insert(
        "original_village_name".into(),
        FireValue::opt_string(record.original_village_name.as_deref()),
    );
    fields.insert(
        "original_survey_number".into(),
        FireValue::opt_string(record.original_survey_number.as_deref()),
    );
    fields.insert(
        "original_notice_date".into(),
        FireValue::opt_string(record.original_notice_date.as_deref()),
    );
    fields.insert(
        "elapsed_ms".into(),
        FireValue::opt_integer(record.elapsed_ms.map(|v| v as i64)),
    );
    fields.insert(
        "services_used".into(),
        FireValue::strings(&record.services_used),
    );
    fields.insert(
        "created_at".into(),
        FireValue::timestamp(record.created_at),
    );
    fields.insert(
        "updated_at".into(),
        FireValue::timestamp(record.updated_at),
    );
    fields
}

fn decode_notice(document: &FireDocument) -> Result<NoticeRecord, StoreError> {
    let fields = &document.fields;
    let id = fields
        .get("id")
        .and_then(FireValue::as_str)
        .ok_or_else(|| StoreError::ResponseParsing("document missing id".into()))?;
    let id: Uuid = id.parse().map_err(|_| StoreError::InvalidField {
        field: "id".into(),
        value: id.to_string(),
    })?;

    let geocoding_status = match fields.get("geocoding_status").and_then(FireValue::as_str) {
        Some(s) => s.parse()?,
        None => GeocodingStatus::Pending,
    };

    Ok(NoticeRecord {
        id,
        raw_text: str_field(fields, "raw_text").unwrap_or_default(),
        village_name: str_field(fields, "village_name"),
        survey_number: str_field(fields, "survey_number"),
        buyer_name: str_field(fields, "buyer_name"),
        seller_name: str_field(fields, "seller_name"),
        notice_date: fields
            .get("notice_date")
            .and_then(FireValue::as_str)
            .and_then(parse_notice_date),
        advocate_name: str_field(fields, "advocate_name"),
        advocate_address: str_field(fields, "advocate_address"),
        advocate_mobile: str_field(fields, "advocate_mobile"),
        district: str_field(fields, "district"),
        taluka: str_field(fields, "taluka"),
        land_area: str_field(fields, "land_area"),
        confidence_score: fields
            .get("confidence_score")
            .and_then(FireValue::as_f64)
            .unwrap_or(0.0),
        latitude: fields.get("latitude").and_then(FireValue::as_f64),
        longitude: fields.get("longitude").and_then(FireValue::as_f64),
        formatted_address: str_field(fields, "formatted_address"),
        geocoding_status,
        refinement_applied: fields
            .get("refinement_applied")
            .and_then(FireValue::as_bool)
            .unwrap_or(false),
        original_village_name: str_field(fields, "original_village_name"),
        original_survey_number: str_field(fields, "original_survey_number"),
        original_notice_date: str_field(fields, "original_notice_date"),
        elapsed_ms: fields
            .get("elapsed_ms")
            .and_then(FireValue::as_i64)
            .map(|v| v as u64),
        services_used: fields
            .get("services_used")
            .map(FireValue::string_items)
            .unwrap_or_default(),
        created_at: timestamp_field(fields, "created_at", document.create_time.as_deref()),
        updated_at: timestamp_field(fields, "updated_at", document.update_time.as_deref()),
    })
}

fn encode_log(entry: &ProcessingLogEntry) -> BTreeMap<String, FireValue> {
    let mut fields = BTreeMap::new();
    fields.insert("id".into(), FireValue::string(&entry.id.to_string()));
    fields.insert(
        "notice_id".into(),
        FireValue::string(&entry.notice_id.to_string()),
    );
    fields.insert("stage".into(), FireValue::string(&entry.stage));
    fields.insert("detail".into(), FireValue::string(&entry.detail));
    fields.insert("created_at".into(), FireValue::timestamp(entry.created_at));
    fields
}

fn decode_log(document: &FireDocument) -> Result<ProcessingLogEntry, StoreError> {
    let fields = &document.fields;
    let id = uuid_field(fields, "id")?;
    let notice_id = uuid_field(fields, "notice_id")?;

    Ok(ProcessingLogEntry {
        id,
        notice_id,
        stage: str_field(fields, "stage").unwrap_or_default(),
        detail: str_field(fields, "detail").unwrap_or_default(),
        created_at: timestamp_field(fields, "created_at", document.create_time.as_deref()),
    })
}

fn str_field(fields: &BTreeMap<String, FireValue>, key: &str) -> Option<String> {
    fields
        .get(key)
        .and_then(FireValue::as_str)
        .map(str::to_string)
}

fn uuid_field(fields: &BTreeMap<String, FireValue>, key: &str) -> Result<Uuid, StoreError> {
    let raw = fields
        .get(key)
        .and_then(FireValue::as_str)
        .ok_or_else(|| StoreError::ResponseParsing(format!("document missing {key}")))?;
    raw.parse().map_err(|_| StoreError::InvalidField {
        field: key.to_string(),
        value: raw.to_string(),
    })
}

/// Our own timestamp field first, the document's server timestamp as a
/// fallback for documents written by older tooling.
fn timestamp_field(
    fields: &BTreeMap<String, FireValue>,
    key: &str,
    server_time: Option<&str>,
) -> DateTime<Utc> {
    fields
        .get(key)
        .and_then(FireValue::as_timestamp)
        .or_else(|| {
            server_time
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|t| t.with_timezone(&Utc))
        })
        .unwrap_or_else(Utc::now)
}
