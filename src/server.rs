//! HTTP routes for the phone-number collection.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::header,
    response::IntoResponse,
    routing::{get, patch, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::error::ApiError;
use crate::export;
use crate::model::{PhoneChanges, PhoneFilter, PhoneRecord, PhoneStatus, RecordId};
use crate::schema::{PhoneNumber, SchemaError};
use crate::store::{PhoneStore, SharedStore};

pub const DEFAULT_LIMIT: i64 = 500;
pub const MAX_LIMIT: i64 = 5000;

/// Shared application state.
///
/// `store` is built once at boot and never replaced. It is `None` when no
/// connection could be established; data routes then answer
/// [`ApiError::StoreUnavailable`] and only the diagnostics keep working.
#[derive(Clone)]
pub struct AppState {
    pub store: Option<SharedStore>,
    pub database_url_set: bool,
    pub database_name_set: bool,
}

impl AppState {
    fn store(&self) -> Result<&dyn PhoneStore, ApiError> {
        self.store.as_deref().ok_or(ApiError::StoreUnavailable)
    }
}

#[derive(Debug, Deserialize)]
pub struct PhoneIn {
    pub phone: String,
    pub country: Option<String>,
    #[serde(default)]
    pub status: PhoneStatus,
    pub note: Option<String>,
}

impl PhoneIn {
    fn into_schema(self) -> Result<PhoneNumber, SchemaError> {
        PhoneNumber::new(self.phone, self.country, self.status, self.note)
    }
}

/// Partial update body. Absent and `null` fields are both left unchanged.
#[derive(Debug, Default, Deserialize)]
pub struct PhoneUpdate {
    pub phone: Option<String>,
    pub country: Option<String>,
    pub status: Option<PhoneStatus>,
    pub note: Option<String>,
}

impl From<PhoneUpdate> for PhoneChanges {
    fn from(update: PhoneUpdate) -> Self {
        PhoneChanges {
            phone: update.phone,
            country: update.country,
            status: update.status,
            note: update.note,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct BulkPhones {
    pub items: Vec<PhoneIn>,
}

/// Query parameters for listing.
#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub status: Option<String>,
    pub q: Option<String>,
    pub limit: Option<i64>,
}

/// Query parameters for export.
#[derive(Debug, Deserialize)]
pub struct ExportParams {
    pub status: Option<String>,
    pub q: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ItemsResponse {
    pub items: Vec<PhoneRecord>,
}

#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub id: RecordId,
}

#[derive(Debug, Serialize)]
pub struct BulkResponse {
    pub inserted: Vec<RecordId>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct UpdatedResponse {
    pub updated: u64,
}

#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub deleted: u64,
}

#[derive(Debug, Serialize)]
pub struct DiagnosticsResponse {
    pub backend: String,
    pub database: String,
    pub database_url: String,
    pub database_name: String,
    pub connection_status: String,
    pub collections: Vec<String>,
}

/// Create the Axum router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/test", get(diagnostics_handler))
        .route("/phones", get(list_handler).post(create_handler))
        .route("/phones/bulk", post(bulk_create_handler))
        .route("/phones/export", get(export_handler))
        .route("/phones/:id", patch(update_handler).delete(delete_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn root_handler() -> Json<Value> {
    Json(json!({ "message": "Phone status tracker backend running" }))
}

fn set_marker(set: bool) -> String {
    let marker = if set { "✅ Set" } else { "❌ Not Set" };
    marker.to_string()
}

fn truncate(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// Store diagnostics. Never fails: problems are reported in the body.
async fn diagnostics_handler(State(state): State<AppState>) -> Json<DiagnosticsResponse> {
    let mut response = DiagnosticsResponse {
        backend: "✅ Running".to_string(),
        database: "❌ Not Available".to_string(),
        database_url: set_marker(state.database_url_set),
        database_name: set_marker(state.database_name_set),
        connection_status: "Not Connected".to_string(),
        collections: Vec::new(),
    };

    match state.store.as_deref() {
        None => response.database = "❌ Not initialized (check env)".to_string(),
        Some(store) => match store.collection_names().await {
            Ok(names) => {
                response.collections = names;
                response.connection_status = "Connected".to_string();
                response.database = "✅ Connected & Working".to_string();
            }
            Err(err) => {
                tracing::warn!(error = %err, "Diagnostics could not list collections");
                response.database =
                    format!("⚠️ Connected but Error: {}", truncate(&err.to_string(), 80));
            }
        },
    }

    Json(response)
}

fn checked_limit(limit: Option<i64>) -> Result<i64, ApiError> {
    let limit = limit.unwrap_or(DEFAULT_LIMIT);
    if !(1..=MAX_LIMIT).contains(&limit) {
        return Err(ApiError::Validation(format!(
            "limit must be between 1 and {MAX_LIMIT}, got {limit}"
        )));
    }
    Ok(limit)
}

async fn list_handler(
    State(state): State<AppState>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<ItemsResponse>, ApiError> {
    let store = state.store()?;
    let Query(params) = params?;
    let limit = checked_limit(params.limit)?;
    let filter = PhoneFilter::new(params.status, params.q);

    let items = store.find(&filter, Some(limit)).await?;
    Ok(Json(ItemsResponse { items }))
}

async fn create_handler(
    State(state): State<AppState>,
    payload: Result<Json<PhoneIn>, JsonRejection>,
) -> Result<Json<CreatedResponse>, ApiError> {
    let store = state.store()?;
    let Json(item) = payload?;
    let record = item.into_schema()?;

    let id = store.insert(&record, Utc::now()).await?;
    tracing::debug!(%id, "Created phone record");
    Ok(Json(CreatedResponse { id }))
}

/// Best-effort batch: each item is validated and inserted on its own, and
/// failures are skipped without undoing earlier inserts.
async fn bulk_create_handler(
    State(state): State<AppState>,
    payload: Result<Json<BulkPhones>, JsonRejection>,
) -> Result<Json<BulkResponse>, ApiError> {
    let store = state.store()?;
    let Json(payload) = payload?;

    let total = payload.items.len();
    let mut inserted = Vec::with_capacity(total);
    for (index, item) in payload.items.into_iter().enumerate() {
        let record = match item.into_schema() {
            Ok(record) => record,
            Err(err) => {
                tracing::debug!(index, error = %err, "Skipping invalid bulk item");
                continue;
            }
        };
        match store.insert(&record, Utc::now()).await {
            Ok(id) => inserted.push(id),
            Err(err) => tracing::debug!(index, error = %err, "Skipping bulk item insert failure"),
        }
    }

    tracing::info!(total, inserted = inserted.len(), "Bulk insert complete");
    let count = inserted.len();
    Ok(Json(BulkResponse { inserted, count }))
}

async fn update_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<PhoneUpdate>, JsonRejection>,
) -> Result<Json<UpdatedResponse>, ApiError> {
    let store = state.store()?;
    let id: RecordId = id.parse()?;
    let Json(update) = payload?;

    let changes = PhoneChanges::from(update);
    if changes.is_empty() {
        return Ok(Json(UpdatedResponse { updated: 0 }));
    }

    let updated = store.update(id, &changes, Utc::now()).await?;
    Ok(Json(UpdatedResponse { updated }))
}

async fn delete_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeletedResponse>, ApiError> {
    let store = state.store()?;
    let id: RecordId = id.parse()?;

    let deleted = store.delete(id).await?;
    Ok(Json(DeletedResponse { deleted }))
}

async fn export_handler(
    State(state): State<AppState>,
    params: Result<Query<ExportParams>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let store = state.store()?;
    let Query(params) = params?;
    let filter = PhoneFilter::new(params.status, params.q);

    let records = store.find(&filter, None).await?;
    let body = export::to_csv(&records)?;
    Ok(([(header::CONTENT_TYPE, "text/csv; charset=utf-8")], body))
}
