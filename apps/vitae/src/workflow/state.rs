//! The explicit session state owned by `WorkflowController`.

use serde::Serialize;

use crate::models::ProfileRecord;
use crate::transfer::TransferError;

/// Discrete stage of the upload → preview → generate workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Idle,
    Uploading,
    UploadFailed,
    Previewing,
    Generating,
    GenerateFailed,
}

impl Stage {
    /// Stage the user interface presents: failed stages look like the stage
    /// they fell back to, with the error banner overlaid.
    pub fn presented_as(&self) -> Stage {
        match self {
            Stage::UploadFailed => Stage::Idle,
            Stage::GenerateFailed => Stage::Previewing,
            other => *other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    UpstreamUnavailable,
    UpstreamRejected,
    MalformedResponse,
}

/// The single user-visible error of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorInfo {
    pub kind: ErrorKind,
    pub message: String,
    /// Collaborator status code, for rejections.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl From<&TransferError> for ErrorInfo {
    fn from(err: &TransferError) -> Self {
        let (kind, status) = match err {
            TransferError::UpstreamUnavailable { .. } => (ErrorKind::UpstreamUnavailable, None),
            TransferError::UpstreamRejected { status, .. } => {
                (ErrorKind::UpstreamRejected, Some(*status))
            }
            TransferError::MalformedResponse { .. } => (ErrorKind::MalformedResponse, None),
        };
        ErrorInfo {
            kind,
            message: err.to_string(),
            status,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowState {
    pub stage: Stage,
    pub is_uploading: bool,
    pub is_generating: bool,
    pub profile: Option<ProfileRecord>,
    pub error: Option<ErrorInfo>,
}

impl Default for WorkflowState {
    fn default() -> Self {
        Self {
            stage: Stage::Idle,
            is_uploading: false,
            is_generating: false,
            profile: None,
            error: None,
        }
    }
}
