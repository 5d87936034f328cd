//! Workflow Controller: the transition table for one session.
//!
//! All state changes go through `begin_*`, `complete_*` and `back`. External
//! calls happen between a `begin_*` and its `complete_*`; the controller itself
//! never performs I/O, which keeps every transition synchronous and testable.
//!
//! Each request is issued a ticket stamped with the current epoch. `back`
//! advances the epoch, so a result that arrives after the user navigated away
//! is recognized as stale and dropped instead of overwriting the new state.

use thiserror::Error;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::models::ProfileRecord;
use crate::themes::{self, ThemeConfig, UnknownThemeKind};
use crate::transfer::{RenderedDocument, TransferError};
use crate::workflow::state::{ErrorInfo, Stage, WorkflowState};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    UnknownThemeKind(#[from] UnknownThemeKind),

    #[error("Precondition violated: {0}")]
    PreconditionViolation(String),
}

/// Outcome of a guarded `begin_*` call.
#[derive(Debug, PartialEq)]
pub enum Admission<T> {
    /// The transition happened; the caller must run the request and report back.
    Started(T),
    /// A request of the same kind is already outstanding. Nothing changed.
    AlreadyInFlight,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTicket {
    epoch: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerateTicket {
    epoch: u64,
    pub profile_id: String,
    pub theme: &'static ThemeConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadCompletion {
    Loaded,
    Failed,
    /// The session moved on before the result arrived; it was discarded.
    Stale,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GenerateCompletion {
    /// The rendered PDF to hand to the user's save-as action.
    Download(RenderedDocument),
    Failed,
    Stale,
}

#[derive(Debug)]
pub struct WorkflowController {
    session_id: Uuid,
    epoch: u64,
    state: WorkflowState,
}

impl WorkflowController {
    pub fn new(session_id: Uuid) -> Self {
        Self {
            session_id,
            epoch: 0,
            state: WorkflowState::default(),
        }
    }

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    pub fn stage(&self) -> Stage {
        self.state.stage
    }

    fn transition(&mut self, to: Stage) {
        info!(
            session_id = %self.session_id,
            "Workflow {:?} -> {:?}",
            self.state.stage,
            to
        );
        self.state.stage = to;
    }

    fn precondition(&self, message: &str) -> WorkflowError {
        error!(
            session_id = %self.session_id,
            stage = ?self.stage(),
            "Precondition violated: {message}"
        );
        WorkflowError::PreconditionViolation(message.to_string())
    }

    // ── Upload ──────────────────────────────────────────────────────────────

    /// File selected. Accepted from `Idle` and `UploadFailed`.
    pub fn begin_upload(&mut self) -> Result<Admission<UploadTicket>, WorkflowError> {
        if self.state.is_uploading || self.state.is_generating {
            debug!(
                session_id = %self.session_id,
                stage = ?self.stage(),
                "Request already in flight; ignoring upload"
            );
            return Ok(Admission::AlreadyInFlight);
        }
        if !matches!(self.state.stage, Stage::Idle | Stage::UploadFailed) {
            return Err(self.precondition("an upload can only start from the upload page"));
        }

        self.state.is_uploading = true;
        self.state.error = None;
        self.state.profile = None;
        self.transition(Stage::Uploading);

        Ok(Admission::Started(UploadTicket { epoch: self.epoch }))
    }

    pub fn complete_upload(
        &mut self,
        ticket: UploadTicket,
        result: Result<ProfileRecord, TransferError>,
    ) -> UploadCompletion {
        if ticket.epoch != self.epoch || !self.state.is_uploading {
            warn!(session_id = %self.session_id, "Discarding stale upload result");
            return UploadCompletion::Stale;
        }

        self.state.is_uploading = false;
        match result {
            Ok(profile) => {
                self.state.profile = Some(profile);
                self.transition(Stage::Previewing);
                UploadCompletion::Loaded
            }
            Err(e) => {
                self.state.error = Some(ErrorInfo::from(&e));
                self.transition(Stage::UploadFailed);
                UploadCompletion::Failed
            }
        }
    }

    // ── Generate ────────────────────────────────────────────────────────────

    /// Theme selected from the preview. The key is resolved through the theme
    /// catalog before any guard is evaluated.
    pub fn begin_generate(
        &mut self,
        theme_key: &str,
    ) -> Result<Admission<GenerateTicket>, WorkflowError> {
        let theme = themes::lookup(theme_key)?;

        let profile_id = match &self.state.profile {
            Some(profile) => profile.profile_id.clone(),
            None => return Err(self.precondition("no profile is loaded")),
        };
        if self.state.is_generating {
            debug!(session_id = %self.session_id, "Generate already in flight; ignoring");
            return Ok(Admission::AlreadyInFlight);
        }
        if !matches!(self.state.stage, Stage::Previewing | Stage::GenerateFailed) {
            return Err(self.precondition("generation requires the preview stage"));
        }

        self.state.is_generating = true;
        self.state.error = None;
        self.transition(Stage::Generating);

        Ok(Admission::Started(GenerateTicket {
            epoch: self.epoch,
            profile_id,
            theme,
        }))
    }

    pub fn complete_generate(
        &mut self,
        ticket: GenerateTicket,
        result: Result<RenderedDocument, TransferError>,
    ) -> GenerateCompletion {
        if ticket.epoch != self.epoch || !self.state.is_generating {
            warn!(session_id = %self.session_id, "Discarding stale generate result");
            return GenerateCompletion::Stale;
        }

        self.state.is_generating = false;
        match result {
            Ok(document) => {
                self.transition(Stage::Previewing);
                GenerateCompletion::Download(document)
            }
            Err(e) => {
                self.state.error = Some(ErrorInfo::from(&e));
                self.transition(Stage::GenerateFailed);
                GenerateCompletion::Failed
            }
        }
    }

    // ── Navigation ──────────────────────────────────────────────────────────

    /// Back to the upload page. Unconditional; in-flight results become stale.
    pub fn back(&mut self) {
        self.epoch += 1;
        self.transition(Stage::Idle);
        self.state = WorkflowState::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProfileSections;
    use crate::themes::{FontFamily, Layout};
    use crate::transfer::Collaborator;
    use bytes::Bytes;

    fn controller() -> WorkflowController {
        WorkflowController::new(Uuid::new_v4())
    }

    fn profile(id: &str) -> ProfileRecord {
        ProfileRecord::new(id, ProfileSections::default()).unwrap()
    }

    fn rendered(id: &str) -> RenderedDocument {
        RenderedDocument {
            filename: format!("resume_{id}.pdf"),
            bytes: Bytes::from_static(b"%PDF-1.4"),
        }
    }

    fn rejected(message: &str) -> TransferError {
        TransferError::UpstreamRejected {
            service: Collaborator::Parser,
            status: 500,
            message: message.to_string(),
        }
    }

    fn started<T: std::fmt::Debug>(admission: Result<Admission<T>, WorkflowError>) -> T {
        match admission {
            Ok(Admission::Started(ticket)) => ticket,
            other => panic!("expected Started, got {other:?}"),
        }
    }

    /// Drives a fresh controller into `Previewing` with the given profile.
    fn previewing(id: &str) -> WorkflowController {
        let mut c = controller();
        let ticket = started(c.begin_upload());
        assert_eq!(c.complete_upload(ticket, Ok(profile(id))), UploadCompletion::Loaded);
        c
    }

    #[test]
    fn test_file_selection_starts_upload() {
        let mut c = controller();
        started(c.begin_upload());
        assert_eq!(c.stage(), Stage::Uploading);
        assert!(c.state().is_uploading);
        assert!(!c.state().is_generating);
    }

    #[test]
    fn test_second_file_selection_while_uploading_is_noop() {
        let mut c = controller();
        started(c.begin_upload());
        let before = c.state().clone();

        assert_eq!(c.begin_upload(), Ok(Admission::AlreadyInFlight));
        assert_eq!(c.state(), &before);
    }

    #[test]
    fn test_parse_success_moves_to_previewing() {
        let c = previewing("p1");
        assert_eq!(c.stage(), Stage::Previewing);
        assert_eq!(c.state().profile.as_ref().unwrap().profile_id, "p1");
        assert!(!c.state().is_uploading);
        assert!(c.state().error.is_none());
    }

    #[test]
    fn test_parse_failure_moves_to_upload_failed_with_message() {
        let mut c = controller();
        let ticket = started(c.begin_upload());
        let outcome = c.complete_upload(ticket, Err(rejected("bad pdf")));

        assert_eq!(outcome, UploadCompletion::Failed);
        assert_eq!(c.stage(), Stage::UploadFailed);
        assert_eq!(c.state().error.as_ref().unwrap().message, "bad pdf");
        assert!(!c.state().is_uploading);
    }

    #[test]
    fn test_upload_failed_accepts_new_file_and_clears_error() {
        let mut c = controller();
        let ticket = started(c.begin_upload());
        c.complete_upload(ticket, Err(rejected("bad pdf")));

        started(c.begin_upload());
        assert_eq!(c.stage(), Stage::Uploading);
        assert!(c.state().error.is_none());
    }

    #[test]
    fn test_upload_while_generating_is_noop() {
        let mut c = previewing("p1");
        started(c.begin_generate("modern"));
        let before = c.state().clone();

        assert_eq!(c.begin_upload(), Ok(Admission::AlreadyInFlight));
        assert_eq!(c.state(), &before);
        assert_eq!(c.stage(), Stage::Generating);
    }

    #[test]
    fn test_upload_from_preview_requires_back_navigation() {
        let mut c = previewing("p1");
        let err = c.begin_upload().unwrap_err();
        assert!(matches!(err, WorkflowError::PreconditionViolation(_)));
        assert_eq!(c.stage(), Stage::Previewing);
    }

    #[test]
    fn test_classic_theme_issues_generate_with_times_traditional() {
        let mut c = previewing("p1");
        let ticket = started(c.begin_generate("classic"));

        assert_eq!(ticket.profile_id, "p1");
        assert_eq!(ticket.theme.font_family, FontFamily::Times);
        assert_eq!(ticket.theme.layout, Layout::Traditional);
        assert_eq!(c.stage(), Stage::Generating);
        assert!(c.state().is_generating);
        assert!(!c.state().is_uploading);
    }

    #[test]
    fn test_generate_success_returns_to_preview_with_download() {
        let mut c = previewing("p1");
        let ticket = started(c.begin_generate("classic"));
        let outcome = c.complete_generate(ticket, Ok(rendered("p1")));

        assert_eq!(outcome, GenerateCompletion::Download(rendered("p1")));
        assert_eq!(c.stage(), Stage::Previewing);
        assert!(!c.state().is_generating);
        assert!(c.state().profile.is_some());
    }

    #[test]
    fn test_generate_failure_keeps_profile_and_sets_error() {
        let mut c = previewing("p1");
        let ticket = started(c.begin_generate("modern"));
        let outcome = c.complete_generate(ticket, Err(rejected("latex failed")));

        assert_eq!(outcome, GenerateCompletion::Failed);
        assert_eq!(c.stage(), Stage::GenerateFailed);
        assert_eq!(c.stage().presented_as(), Stage::Previewing);
        assert!(c.state().profile.is_some());
        assert_eq!(c.state().error.as_ref().unwrap().message, "latex failed");
    }

    #[test]
    fn test_retry_from_generate_failed_clears_error() {
        let mut c = previewing("p1");
        let ticket = started(c.begin_generate("modern"));
        c.complete_generate(ticket, Err(rejected("latex failed")));

        started(c.begin_generate("minimal"));
        assert_eq!(c.stage(), Stage::Generating);
        assert!(c.state().error.is_none());
    }

    #[test]
    fn test_second_generate_while_generating_is_noop() {
        let mut c = previewing("p1");
        started(c.begin_generate("modern"));
        let before = c.state().clone();

        assert_eq!(c.begin_generate("classic"), Ok(Admission::AlreadyInFlight));
        assert_eq!(c.state(), &before);
    }

    #[test]
    fn test_generate_without_profile_is_precondition_violation() {
        let mut c = controller();
        let ticket = started(c.begin_upload());
        c.complete_upload(ticket, Err(rejected("bad pdf")));
        let before = c.state().clone();

        let err = c.begin_generate("modern").unwrap_err();
        assert!(matches!(err, WorkflowError::PreconditionViolation(_)));
        assert_eq!(c.state(), &before);
    }

    #[test]
    fn test_generate_with_unknown_theme_fails_without_transition() {
        let mut c = previewing("p1");
        let err = c.begin_generate("neon").unwrap_err();
        assert_eq!(
            err,
            WorkflowError::UnknownThemeKind(UnknownThemeKind("neon".to_string()))
        );
        assert_eq!(c.stage(), Stage::Previewing);
        assert!(!c.state().is_generating);
    }

    #[test]
    fn test_back_clears_profile_and_error() {
        let mut c = previewing("p1");
        let ticket = started(c.begin_generate("modern"));
        c.complete_generate(ticket, Err(rejected("latex failed")));

        c.back();
        assert_eq!(c.state(), &WorkflowState::default());
    }

    #[test]
    fn test_cycle_after_back_behaves_like_fresh_session() {
        let mut c = previewing("p1");
        c.back();

        let ticket = started(c.begin_upload());
        assert_eq!(c.complete_upload(ticket, Ok(profile("p2"))), UploadCompletion::Loaded);
        let ticket = started(c.begin_generate("minimal"));
        assert_eq!(ticket.profile_id, "p2");
    }

    #[test]
    fn test_upload_result_after_back_is_discarded() {
        let mut c = controller();
        let ticket = started(c.begin_upload());
        c.back();

        assert_eq!(c.complete_upload(ticket, Ok(profile("p1"))), UploadCompletion::Stale);
        assert_eq!(c.state(), &WorkflowState::default());
    }

    #[test]
    fn test_upload_result_from_previous_epoch_cannot_hijack_new_upload() {
        let mut c = controller();
        let old = started(c.begin_upload());
        c.back();
        let fresh = started(c.begin_upload());

        assert_eq!(c.complete_upload(old, Ok(profile("old"))), UploadCompletion::Stale);
        assert!(c.state().is_uploading);
        assert_eq!(c.complete_upload(fresh, Ok(profile("new"))), UploadCompletion::Loaded);
        assert_eq!(c.state().profile.as_ref().unwrap().profile_id, "new");
    }

    #[test]
    fn test_generate_result_after_back_is_discarded() {
        let mut c = previewing("p1");
        let ticket = started(c.begin_generate("classic"));
        c.back();

        assert_eq!(
            c.complete_generate(ticket, Ok(rendered("p1"))),
            GenerateCompletion::Stale
        );
        assert_eq!(c.stage(), Stage::Idle);
    }

    #[test]
    fn test_flags_are_never_both_set() {
        let mut c = controller();
        let ticket = started(c.begin_upload());
        assert!(!(c.state().is_uploading && c.state().is_generating));
        assert!(c.begin_generate("modern").is_err());
        c.complete_upload(ticket, Ok(profile("p1")));

        started(c.begin_generate("modern"));
        assert!(c.begin_upload().is_err());
        assert!(!(c.state().is_uploading && c.state().is_generating));
    }
}
