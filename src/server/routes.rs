//! HTTP handlers
//!
//! Transfer handlers always answer with a JSON envelope; failures are
//! reported through `success` and the sentinel `count`, never as a panic.

use std::collections::BTreeMap;

use axum::{
    body::Bytes,
    extract::{FromRequest, Multipart, Path, Query, Request, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use super::SharedState;
use crate::store::RecordKind;
use crate::transfer::export::ExportTarget;
use crate::transfer::ingest::{ingest_archive, normalize_payload};
use crate::transfer::packager::{self, Selection};
use crate::transfer::{
    check_credential, CategoryFilter, ExportRequest, TransferError, TransferResponse,
};

/// Optional `?password=` on upload endpoints
#[derive(Debug, Default, Deserialize)]
pub struct PasswordQuery {
    pub password: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PhotoResponse {
    pub success: bool,
    pub name: String,
}

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    "OK"
}

/// Read an upload body that is either a multipart form (first field wins)
/// or the raw request body.
async fn read_upload(request: Request) -> Result<Vec<u8>, String> {
    let is_multipart = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("multipart/form-data"));

    if !is_multipart {
        return Bytes::from_request(request, &())
            .await
            .map(|b| b.to_vec())
            .map_err(|e| e.body_text());
    }

    let mut multipart = Multipart::from_request(request, &())
        .await
        .map_err(|e| e.body_text())?;
    match multipart.next_field().await.map_err(|e| e.body_text())? {
        Some(field) => field
            .bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|e| e.body_text()),
        None => Ok(Vec::new()),
    }
}

/// POST / - ingest an uploaded archive
pub async fn upload_archive(
    State(state): State<SharedState>,
    Query(query): Query<PasswordQuery>,
    request: Request,
) -> Json<TransferResponse> {
    if let Err(e) = check_credential(state.config.password(), query.password.as_deref()) {
        warn!("Rejected archive upload: {}", e);
        return Json(TransferResponse::from(&e));
    }

    let payload = match read_upload(request).await {
        Ok(body) => normalize_payload(body),
        Err(e) => {
            warn!(error = %e, "Failed to read archive upload");
            return Json(TransferResponse::from(&TransferError::ArchiveCorrupt(e)));
        }
    };

    let _transfer = state.transfer_lock.lock().await;
    let store = state.store.clone();
    let temp_path = state.config.store.temp_archive.clone();
    let max_entry_bytes = state.config.max_upload_bytes() as u64;
    let result = tokio::task::spawn_blocking(move || {
        ingest_archive(&store, &temp_path, &payload, max_entry_bytes)
    })
    .await
    .unwrap_or_else(|e| {
        error!(error = %e, "Ingest task failed");
        Err(TransferError::task_failed(&state.config.store.temp_archive, e))
    });

    if let Err(e) = &result {
        warn!(error = %e, "Archive ingest failed");
    }
    Json(TransferResponse::from(result))
}

/// POST /photo/:subject - store one picture under the next free number
pub async fn upload_photo(
    State(state): State<SharedState>,
    Path(subject): Path<String>,
    Query(query): Query<PasswordQuery>,
    request: Request,
) -> Json<PhotoResponse> {
    if let Err(e) = check_credential(state.config.password(), query.password.as_deref()) {
        warn!(subject = %subject, "Rejected photo upload: {}", e);
        return Json(PhotoResponse {
            success: false,
            name: e.to_string(),
        });
    }

    let data = match read_upload(request).await {
        Ok(body) => normalize_payload(body),
        Err(e) => {
            warn!(subject = %subject, error = %e, "Failed to read photo upload");
            return Json(PhotoResponse {
                success: false,
                name: String::new(),
            });
        }
    };

    let store = state.store.clone();
    let result = tokio::task::spawn_blocking(move || store.store_photo(&subject, &data)).await;
    match result {
        Ok(Ok(name)) => Json(PhotoResponse {
            success: true,
            name,
        }),
        Ok(Err(e)) => {
            warn!(error = %e, "Failed to store photo");
            Json(PhotoResponse {
                success: false,
                name: String::new(),
            })
        }
        Err(e) => {
            warn!(error = %e, "Photo task failed");
            Json(PhotoResponse {
                success: false,
                name: String::new(),
            })
        }
    }
}

/// GET /getZip - every `.json` record, unfiltered
pub async fn get_zip(State(state): State<SharedState>) -> Response {
    let _transfer = state.transfer_lock.lock().await;
    let store = state.store.clone();
    let temp_path = state.config.store.temp_archive.clone();

    let result = tokio::task::spawn_blocking(move || {
        let packaged = packager::package(&store, &Selection::AllRecords, &temp_path)?;
        std::fs::read(packaged.path()).map_err(|e| TransferError::Filesystem {
            written: packaged.count,
            source: crate::store::StoreError::io(&temp_path, e),
        })
    })
    .await;

    match result {
        Ok(Ok(bytes)) => (
            [
                (header::CONTENT_TYPE, "application/zip"),
                (header::CONTENT_DISPOSITION, "attachment; filename=\"uploads.zip\""),
            ],
            bytes,
        )
            .into_response(),
        Ok(Err(e)) => {
            warn!(error = %e, "Failed to package uploads");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

/// GET /export?to=&password=&event_id=&{flags} - push a filtered archive to
/// another server
pub async fn export(
    State(state): State<SharedState>,
    Query(target): Query<ExportTarget>,
    Query(filter): Query<CategoryFilter>,
) -> Json<TransferResponse> {
    info!(
        to = %target.to,
        event_id = %filter.event_id,
        categories = ?filter.enabled(),
        "Export requested"
    );

    let request = ExportRequest::new(target, filter);
    let result = state
        .exporter
        .export(
            state.store.clone(),
            state.config.store.temp_archive.clone(),
            &state.transfer_lock,
            request,
        )
        .await;
    Json(TransferResponse::from(result))
}

/// GET /listPics
pub async fn list_pics(
    State(state): State<SharedState>,
) -> Result<Json<BTreeMap<String, Vec<String>>>, (StatusCode, String)> {
    state.store.list_pictures().map(Json).map_err(|e| {
        warn!(error = %e, "Failed to list pictures");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })
}

fn joined_names(state: &SharedState, kind: RecordKind) -> Result<String, (StatusCode, String)> {
    state
        .store
        .list_kind(kind)
        .map(|names| names.join(","))
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}

pub async fn pit_result_names(
    State(state): State<SharedState>,
) -> Result<String, (StatusCode, String)> {
    joined_names(&state, RecordKind::Pit)
}

pub async fn match_result_names(
    State(state): State<SharedState>,
) -> Result<String, (StatusCode, String)> {
    joined_names(&state, RecordKind::Match)
}

pub async fn note_names(State(state): State<SharedState>) -> Result<String, (StatusCode, String)> {
    joined_names(&state, RecordKind::Note)
}

pub async fn image_names(State(state): State<SharedState>) -> Result<String, (StatusCode, String)> {
    joined_names(&state, RecordKind::Image)
}

/// GET /scripts/keys.js - the configured TBA key, else the client's own file
pub async fn keys_js(State(state): State<SharedState>) -> Response {
    let js = [(header::CONTENT_TYPE, "text/javascript")];
    if let Some(key) = state.config.auth.tba_key.as_deref().filter(|k| !k.is_empty()) {
        return (js, format!("API_KEY=\"{}\"", key)).into_response();
    }

    let path = state.config.store.app_dir.join("scripts").join("keys.js");
    match tokio::fs::read_to_string(&path).await {
        Ok(script) => (js, script).into_response(),
        Err(_) => StatusCode::NOT_FOUND.into_response(),
    }
}
