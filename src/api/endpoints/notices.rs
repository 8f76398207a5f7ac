//! Stored-notice endpoints: list, detail, logs, delete, CSV export.

use axum::extract::{Path, Query, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::endpoints::run_blocking;
use crate::api::error::ApiError;
use crate::config::{DEFAULT_LIST_LIMIT, EXPORT_LIST_LIMIT};
use crate::models::{NoticeRecord, ProcessingLogEntry};
use crate::state::AppState;
use crate::store::NoticeStore;

#[derive(Deserialize)]
pub struct ListParams {
    pub limit: Option<usize>,
}

/// A stored record plus the derived map link the dashboard renders.
#[derive(Serialize)]
pub struct NoticeView {
    #[serde(flatten)]
    pub record: NoticeRecord,
    pub maps_url: Option<String>,
}

impl From<NoticeRecord> for NoticeView {
    fn from(record: NoticeRecord) -> Self {
        let maps_url = record.maps_url();
        NoticeView { record, maps_url }
    }
}

#[derive(Serialize)]
pub struct NoticeListResponse {
    pub notices: Vec<NoticeView>,
    pub total: usize,
}

#[derive(Serialize)]
pub struct NoticeLogsResponse {
    pub notice_id: Uuid,
    pub entries: Vec<ProcessingLogEntry>,
}

#[derive(Serialize)]
pub struct DeleteResponse {
    pub deleted: bool,
    pub id: Uuid,
}

/// `GET /api/notices` — stored notices, newest first.
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<NoticeListResponse>, ApiError> {
    let store = state.store()?;
    let limit = params.limit.unwrap_or(DEFAULT_LIST_LIMIT);
    let records = run_blocking(move || Ok(store.list(limit)?)).await?;
    let notices: Vec<NoticeView> = records.into_iter().map(NoticeView::from).collect();
    let total = notices.len();
    Ok(Json(NoticeListResponse { notices, total }))
}

/// `GET /api/notices/:id` — one stored notice.
pub async fn detail(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<NoticeView>, ApiError> {
    let store = state.store()?;
    let record = run_blocking(move || {
        store
            .get(&id)?
            .ok_or_else(|| ApiError::NotFound(format!("Notice {id} not found")))
    })
    .await?;
    Ok(Json(record.into()))
}

/// `GET /api/notices/:id/logs` — a notice's processing history, in the
/// order the stages happened.
pub async fn logs(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<NoticeLogsResponse>, ApiError> {
    let store = state.store()?;
    let entries = run_blocking(move || {
        if store.get(&id)?.is_none() {
            return Err(ApiError::NotFound(format!("Notice {id} not found")));
        }
        Ok(store.logs_for(&id)?)
    })
    .await?;
    Ok(Json(NoticeLogsResponse {
        notice_id: id,
        entries,
    }))
}

/// `DELETE /api/notices/:id` — remove a notice and its logs.
pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let store = state.store()?;
    let deleted = run_blocking(move || Ok(store.delete(&id)?)).await?;
    if !deleted {
        return Err(ApiError::NotFound(format!("Notice {id} not found")));
    }
    Ok(Json(DeleteResponse { deleted, id }))
}

/// `GET /api/notices/export` — stored notices as a CSV download.
pub async fn export_csv(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let store = state.store()?;
    let records = run_blocking(move || Ok(store.list(EXPORT_LIST_LIMIT)?)).await?;

    let mut body = String::from(
        "id,village_name,survey_number,buyer_name,seller_name,notice_date,district,taluka,\
         advocate_name,advocate_mobile,land_area,confidence_score,latitude,longitude,\
         geocoding_status,created_at\n",
    );
    for record in &records {
        let row = [
            record.id.to_string(),
            record.village_name.clone().unwrap_or_default(),
            record.survey_number.clone().unwrap_or_default(),
            record.buyer_name.clone().unwrap_or_default(),
            record.seller_name.clone().unwrap_or_default(),
            record
                .notice_date
                .map(|d| d.to_string())
                .unwrap_or_default(),
            record.district.clone().unwrap_or_default(),
            record.taluka.clone().unwrap_or_default(),
            record.advocate_name.clone().unwrap_or_default(),
            record.advocate_mobile.clone().unwrap_or_default(),
            record.land_area.clone().unwrap_or_default(),
            format!("{:.2}", record.confidence_score),
            record.latitude.map(|v| v.to_string()).unwrap_or_default(),
            record.longitude.map(|v| v.to_string()).unwrap_or_default(),
            record.geocoding_status.as_str().to_string(),
            record.created_at.to_rfc3339(),
        ];
        let line: Vec<String> = row.iter().map(|field| csv_field(field)).collect();
        body.push_str(&line.join(","));
        body.push('\n');
    }

    Ok((
        [
            (CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                CONTENT_DISPOSITION,
                "attachment; filename=\"notices.csv\"",
            ),
        ],
        body,
    ))
}

/// Quote a CSV field when it contains a delimiter, quote, or newline.
fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
