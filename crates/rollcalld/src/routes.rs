use std::sync::Arc;
use std::time::Instant;

use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use rollcall_core::{FaceEncoder, MatchDecision, Matcher};
use rollcall_store::{records_to_csv, AttendanceRecord, AttendanceStore};
use serde_json::{json, Value};
use tower_http::limit::RequestBodyLimitLayer;

use crate::error::Result;
use crate::state::AppState;

/// Upload limit for recognition images.
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Build the API router.
pub fn create_app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/recognize", post(recognize_handler))
        .route("/api/attendance", get(attendance_handler))
        .route("/api/attendance.csv", get(export_handler))
        .route("/api/status", get(status_handler))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(MAX_UPLOAD_BYTES))
        .with_state(state)
}

/// Recognize faces in an uploaded image and record every accepted match.
///
/// Each upload is its own run: unlike the live loop there is no session
/// deduplication, so repeat uploads of the same person append repeat
/// records.
async fn recognize_handler(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<Value>> {
    let start = Instant::now();

    let mut bytes = None;
    while let Some(field) = multipart.next_field().await? {
        if bytes.is_none() || field.name() == Some("file") {
            bytes = Some(field.bytes().await?);
        }
    }
    let Some(bytes) = bytes else {
        return Err(anyhow::anyhow!("multipart upload contained no file").into());
    };

    let image = image::load_from_memory(&bytes)?;
    tracing::info!(
        bytes = bytes.len(),
        width = image.width(),
        height = image.height(),
        "recognizing uploaded image"
    );

    // Inference is CPU-bound; keep it off the async workers.
    let decisions: Vec<MatchDecision> = tokio::task::block_in_place(|| {
        let mut encoder = state
            .encoder
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let faces = encoder.encode(&image)?;
        Ok::<_, anyhow::Error>(
            faces
                .iter()
                .map(|face| {
                    state
                        .matcher
                        .identify(&face.embedding, state.gallery.entries(), state.threshold)
                })
                .collect(),
        )
    })?;

    let mut recognized = Vec::new();
    for decision in &decisions {
        let Some(name) = &decision.name else {
            continue;
        };
        let record = AttendanceRecord::now(name);
        match state.store.insert(&record) {
            Ok(()) => {
                tracing::info!(
                    name = %name,
                    confidence = decision.confidence,
                    "attendance marked"
                );
            }
            Err(err) => {
                tracing::error!(name = %name, error = %err, "failed to record attendance");
            }
        }
        recognized.push(json!({
            "name": name,
            "confidence": decision.confidence,
        }));
    }

    Ok(Json(json!({
        "faces": decisions.len(),
        "recognized": recognized,
        "time_ms": start.elapsed().as_millis() as u64,
    })))
}

/// Attendance records, most recent first.
async fn attendance_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<AttendanceRecord>>> {
    let records = state.store.query_all()?;
    Ok(Json(records))
}

/// Attendance as a CSV download.
async fn export_handler(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse> {
    let records = state.store.query_all()?;
    let csv = records_to_csv(&records);
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"attendance.csv\"",
            ),
        ],
        csv,
    ))
}

/// Daemon status information.
async fn status_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "gallery_size": state.gallery.len(),
        "known_names": state.gallery.names().collect::<Vec<_>>(),
        "threshold": state.threshold,
    }))
}
