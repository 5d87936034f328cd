//! Axum route handlers for the workflow surface.

use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::preview::PreviewView;
use crate::state::AppState;
use crate::transfer::{RenderedDocument, SourceDocument, PDF_SIGNATURE};
use crate::workflow::{Admission, GenerateCompletion, Session, UploadCompletion};

const UPLOAD_FIELD: &str = "file";
const DEFAULT_FILENAME: &str = "profile.pdf";

// ────────────────────────────────────────────────────────────────────────────
// Request types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SelectThemeRequest {
    pub theme: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Helpers
// ────────────────────────────────────────────────────────────────────────────

async fn find_session(state: &AppState, id: Uuid) -> Result<Arc<Session>, AppError> {
    state
        .sessions
        .get(id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Session {id} not found")))
}

async fn loaded_preview(session: &Session, id: Uuid) -> Result<PreviewView, AppError> {
    session
        .preview()
        .await
        .ok_or_else(|| AppError::NotFound(format!("Session {id} has no profile loaded")))
}

/// Current view with the given status.
async fn view_response(session: &Session, status: StatusCode) -> Response {
    (status, Json(session.view().await)).into_response()
}

/// Pulls the single `file` field out of the upload form.
async fn read_source_document(
    mut multipart: Multipart,
    max_bytes: usize,
) -> Result<SourceDocument, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let filename = field
            .file_name()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(DEFAULT_FILENAME)
            .to_string();
        let bytes: Bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Could not read uploaded file: {e}")))?;

        if bytes.is_empty() {
            return Err(AppError::Validation("No file selected".to_string()));
        }
        if bytes.len() > max_bytes {
            return Err(AppError::Validation(format!(
                "File is larger than the {max_bytes} byte limit"
            )));
        }
        if !bytes.starts_with(PDF_SIGNATURE) {
            return Err(AppError::Validation(
                "Uploaded file is not a PDF document".to_string(),
            ));
        }

        return Ok(SourceDocument { filename, bytes });
    }

    Err(AppError::Validation("No file provided".to_string()))
}

/// `Content-Disposition` for a download. The filename carries the opaque
/// profile id, so anything outside a plain ASCII set is replaced with `_`.
fn attachment_disposition(filename: &str) -> String {
    let safe: String = filename
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("attachment; filename=\"{safe}\"")
}

fn download_response(document: RenderedDocument) -> Response {
    let disposition = attachment_disposition(&document.filename);
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        document.bytes,
    )
        .into_response()
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/sessions
pub async fn handle_create_session(State(state): State<AppState>) -> Response {
    let session = state.sessions.create().await;
    view_response(&session, StatusCode::CREATED).await
}

/// GET /api/v1/sessions/:id
pub async fn handle_get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let session = find_session(&state, id).await?;
    Ok(view_response(&session, StatusCode::OK).await)
}

/// DELETE /api/v1/sessions/:id
pub async fn handle_end_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if state.sessions.remove(id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("Session {id} not found")))
    }
}

/// POST /api/v1/sessions/:id/upload
///
/// Multipart body with one `file` field. Waits for the parsing collaborator;
/// a collaborator failure comes back as 502 with the error on the view.
pub async fn handle_upload(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let session = find_session(&state, id).await?;
    let document = read_source_document(multipart, state.config.max_upload_bytes).await?;
    info!(session_id = %id, "Upload received: {} ({} bytes)", document.filename, document.bytes.len());

    match session.upload(state.transfer.clone(), document).await? {
        Admission::Started(UploadCompletion::Loaded) => {
            Ok(view_response(&session, StatusCode::OK).await)
        }
        Admission::Started(UploadCompletion::Failed) => {
            Ok(view_response(&session, StatusCode::BAD_GATEWAY).await)
        }
        Admission::Started(UploadCompletion::Stale) => Err(AppError::Conflict(
            "The session changed before the upload completed".to_string(),
        )),
        Admission::AlreadyInFlight => Err(AppError::Conflict(
            "An upload is already in progress".to_string(),
        )),
    }
}

/// GET /api/v1/sessions/:id/preview
pub async fn handle_preview(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let session = find_session(&state, id).await?;
    let view = loaded_preview(&session, id).await?;
    Ok(Json(view).into_response())
}

/// GET /api/v1/sessions/:id/preview.txt
pub async fn handle_preview_text(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<String, AppError> {
    let session = find_session(&state, id).await?;
    let view = loaded_preview(&session, id).await?;
    Ok(view.to_string())
}

/// POST /api/v1/sessions/:id/theme
///
/// Resolves the theme, asks the rendering collaborator for the PDF and
/// returns it as an attachment.
pub async fn handle_select_theme(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<SelectThemeRequest>,
) -> Result<Response, AppError> {
    let session = find_session(&state, id).await?;

    match session
        .select_theme(state.transfer.clone(), &request.theme)
        .await?
    {
        Admission::Started(GenerateCompletion::Download(document)) => {
            info!(session_id = %id, "Delivering {} ({} bytes)", document.filename, document.bytes.len());
            Ok(download_response(document))
        }
        Admission::Started(GenerateCompletion::Failed) => {
            Ok(view_response(&session, StatusCode::BAD_GATEWAY).await)
        }
        Admission::Started(GenerateCompletion::Stale) => Err(AppError::Conflict(
            "The session changed before the resume was generated".to_string(),
        )),
        Admission::AlreadyInFlight => Err(AppError::Conflict(
            "A resume is already being generated".to_string(),
        )),
    }
}

/// POST /api/v1/sessions/:id/back
pub async fn handle_back(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let session = find_session(&state, id).await?;
    session.back().await;
    Ok(view_response(&session, StatusCode::OK).await)
}
