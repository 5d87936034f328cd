//! Transfer Client: the only module that talks to the parsing and rendering
//! collaborators.
//!
//! Both calls are single attempts. Every failure is normalized into
//! `TransferError` so the workflow controller can store it as one value.
//! Response bodies are decoded here, at the boundary: nothing outside this
//! module ever sees an untyped collaborator payload.

use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use serde::Deserialize;
use thiserror::Error;

use crate::models::{download_filename, ProfileRecord, ProfileSections};
use crate::themes::ThemeConfig;

pub mod http;

pub use http::HttpTransferClient;

/// Leading bytes of every PDF file.
pub const PDF_SIGNATURE: &[u8] = b"%PDF-";

/// Which external service a call was addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collaborator {
    Parser,
    Renderer,
}

impl fmt::Display for Collaborator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Collaborator::Parser => f.write_str("parsing service"),
            Collaborator::Renderer => f.write_str("rendering service"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransferError {
    #[error("Could not reach the {service}: {detail}")]
    UpstreamUnavailable {
        service: Collaborator,
        detail: String,
    },

    /// `message` is the collaborator's own message when it sent one.
    #[error("{message}")]
    UpstreamRejected {
        service: Collaborator,
        status: u16,
        message: String,
    },

    #[error("Malformed response from the {service}: {detail}")]
    MalformedResponse {
        service: Collaborator,
        detail: String,
    },
}

/// A source PDF as selected by the user.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub filename: String,
    pub bytes: Bytes,
}

/// A generated PDF ready to be saved by the user.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedDocument {
    pub filename: String,
    pub bytes: Bytes,
}

/// The two collaborator calls. `AppState` carries an `Arc<dyn DocumentTransfer>`
/// so tests can substitute an in-memory fake.
#[async_trait]
pub trait DocumentTransfer: Send + Sync {
    /// Sends the source PDF to the parsing collaborator.
    async fn parse_document(&self, document: SourceDocument)
        -> Result<ProfileRecord, TransferError>;

    /// Asks the rendering collaborator for a PDF of the given profile.
    async fn generate_document(
        &self,
        profile_id: &str,
        theme: &ThemeConfig,
    ) -> Result<RenderedDocument, TransferError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Response decoding
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ParseResponse {
    profile_id: String,
    profile_data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RejectionBody {
    Flat { error: String },
    Nested { error: NestedError },
}

#[derive(Debug, Deserialize)]
struct NestedError {
    message: String,
}

fn malformed(service: Collaborator, detail: impl Into<String>) -> TransferError {
    TransferError::MalformedResponse {
        service,
        detail: detail.into(),
    }
}

/// Decodes a successful parse body into a validated `ProfileRecord`.
pub fn decode_parse_response(body: &[u8]) -> Result<ProfileRecord, TransferError> {
    let service = Collaborator::Parser;

    let raw: serde_json::Value = serde_json::from_slice(body)
        .map_err(|e| malformed(service, format!("body is not JSON: {e}")))?;
    let envelope: ParseResponse = serde_json::from_value(raw)
        .map_err(|e| malformed(service, format!("unexpected envelope: {e}")))?;

    if !envelope.profile_data.is_object() {
        return Err(malformed(service, "profile_data is not an object"));
    }
    let sections: ProfileSections = serde_json::from_value(envelope.profile_data)
        .map_err(|e| malformed(service, format!("profile_data does not match: {e}")))?;

    ProfileRecord::new(envelope.profile_id, sections)
        .ok_or_else(|| malformed(service, "profile_id is empty or a dot segment"))
}

/// Builds the message surfaced for a non-success status: the collaborator's
/// own `error` text when present, otherwise a generic one naming the status.
pub fn rejection_message(service: Collaborator, status: u16, body: &[u8]) -> String {
    match serde_json::from_slice::<RejectionBody>(body) {
        Ok(RejectionBody::Flat { error }) if !error.trim().is_empty() => error,
        Ok(RejectionBody::Nested { error }) if !error.message.trim().is_empty() => error.message,
        _ => format!("The {service} responded with status {status}"),
    }
}

/// Checks that a successful generate body is a PDF and names it.
pub fn decode_rendered_document(
    profile_id: &str,
    body: Bytes,
) -> Result<RenderedDocument, TransferError> {
    let service = Collaborator::Renderer;
    if body.is_empty() {
        return Err(malformed(service, "empty body"));
    }
    if !body.starts_with(PDF_SIGNATURE) {
        return Err(malformed(service, "body is not a PDF document"));
    }
    Ok(RenderedDocument {
        filename: download_filename(profile_id),
        bytes: body,
    })
}
