//! Session hosting: one `WorkflowController` per user session, driven by the
//! collaborator calls.
//!
//! The controller lock is never held across an external call. Each call runs
//! on its own task, so it completes (and its flag is cleared) even when the
//! HTTP request that started it goes away.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant};
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::ProfileRecord;
use crate::preview::{render_preview, PreviewView};
use crate::transfer::{DocumentTransfer, SourceDocument};
use crate::workflow::controller::{
    Admission, GenerateCompletion, UploadCompletion, WorkflowController, WorkflowError,
};
use crate::workflow::state::{ErrorInfo, Stage};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    #[error("Transfer task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Snapshot of a session as returned to clients.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub session_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub stage: Stage,
    /// What the page shows: failed stages fall back with a banner.
    pub presented_stage: Stage,
    pub is_uploading: bool,
    pub is_generating: bool,
    pub profile: Option<ProfileRecord>,
    pub error: Option<ErrorInfo>,
}

pub struct Session {
    id: Uuid,
    created_at: DateTime<Utc>,
    last_active: Mutex<Instant>,
    controller: Mutex<WorkflowController>,
}

impl Session {
    pub fn new() -> Self {
        let id = Uuid::new_v4();
        Self {
            id,
            created_at: Utc::now(),
            last_active: Mutex::new(Instant::now()),
            controller: Mutex::new(WorkflowController::new(id)),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    async fn touch(&self) {
        *self.last_active.lock().await = Instant::now();
    }

    /// Unused for at least `ttl` and with no collaborator call outstanding.
    async fn is_expired(&self, now: Instant, ttl: Duration) -> bool {
        let idle = now.saturating_duration_since(*self.last_active.lock().await);
        if idle < ttl {
            return false;
        }
        let controller = self.controller.lock().await;
        let state = controller.state();
        !state.is_uploading && !state.is_generating
    }

    pub async fn view(&self) -> SessionView {
        let controller = self.controller.lock().await;
        let state = controller.state();
        SessionView {
            session_id: self.id,
            created_at: self.created_at,
            stage: state.stage,
            presented_stage: state.stage.presented_as(),
            is_uploading: state.is_uploading,
            is_generating: state.is_generating,
            profile: state.profile.clone(),
            error: state.error.clone(),
        }
    }

    /// Preview of the loaded profile with the current error banner. `None`
    /// until a profile is loaded.
    pub async fn preview(&self) -> Option<PreviewView> {
        let controller = self.controller.lock().await;
        let state = controller.state();
        state
            .profile
            .as_ref()
            .map(|profile| render_preview(profile, state.is_generating, state.error.as_ref()))
    }

    /// Upload → parse. Returns once the parse has completed or failed.
    pub async fn upload(
        self: &Arc<Self>,
        transfer: Arc<dyn DocumentTransfer>,
        document: SourceDocument,
    ) -> Result<Admission<UploadCompletion>, SessionError> {
        let ticket = match self.controller.lock().await.begin_upload()? {
            Admission::Started(ticket) => ticket,
            Admission::AlreadyInFlight => return Ok(Admission::AlreadyInFlight),
        };

        let session = Arc::clone(self);
        let completion = tokio::spawn(async move {
            let result = transfer.parse_document(document).await;
            session.controller.lock().await.complete_upload(ticket, result)
        })
        .await?;
        self.touch().await;

        Ok(Admission::Started(completion))
    }

    /// Theme selection → generate. On success the completion carries the PDF.
    pub async fn select_theme(
        self: &Arc<Self>,
        transfer: Arc<dyn DocumentTransfer>,
        theme_key: &str,
    ) -> Result<Admission<GenerateCompletion>, SessionError> {
        let ticket = match self.controller.lock().await.begin_generate(theme_key)? {
            Admission::Started(ticket) => ticket,
            Admission::AlreadyInFlight => return Ok(Admission::AlreadyInFlight),
        };

        let session = Arc::clone(self);
        let completion = tokio::spawn(async move {
            let result = transfer
                .generate_document(&ticket.profile_id, ticket.theme)
                .await;
            session
                .controller
                .lock()
                .await
                .complete_generate(ticket, result)
        })
        .await?;
        self.touch().await;

        Ok(Admission::Started(completion))
    }

    pub async fn back(&self) {
        self.controller.lock().await.back();
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// All live sessions, keyed by id.
#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, Arc<Session>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create(&self) -> Arc<Session> {
        let session = Arc::new(Session::new());
        self.sessions
            .write()
            .await
            .insert(session.id(), Arc::clone(&session));
        info!(session_id = %session.id(), "Session started");
        session
    }

    /// Looks up a session and marks it active.
    pub async fn get(&self, id: Uuid) -> Option<Arc<Session>> {
        let session = self.sessions.read().await.get(&id).cloned()?;
        session.touch().await;
        Some(session)
    }

    /// Ends a session. Returns `false` if it did not exist.
    pub async fn remove(&self, id: Uuid) -> bool {
        let removed = self.sessions.write().await.remove(&id).is_some();
        if removed {
            info!(session_id = %id, "Session ended");
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Drops sessions idle for at least `ttl`. Sessions waiting on a
    /// collaborator are kept. Returns how many were dropped.
    pub async fn evict_idle(&self, ttl: Duration) -> usize {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;

        let mut expired = Vec::new();
        for (id, session) in sessions.iter() {
            if session.is_expired(now, ttl).await {
                expired.push(*id);
            }
        }
        for id in &expired {
            sessions.remove(id);
            debug!(session_id = %id, "Session expired");
        }
        expired.len()
    }

    /// Background sweep that evicts idle sessions every half `ttl`.
    pub fn spawn_expiry(&self, ttl: Duration) -> JoinHandle<()> {
        let store = self.clone();
        let period = (ttl / 2).max(Duration::from_secs(1));

        tokio::spawn(async move {
            let mut tick = interval(period);
            loop {
                tick.tick().await;
                let evicted = store.evict_idle(ttl).await;
                if evicted > 0 {
                    let remaining = store.len().await;
                    info!(evicted, remaining, "Expired idle sessions");
                }
            }
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use bytes::Bytes;
    use tokio::sync::Notify;

    use crate::models::{ProfileSections, ProfileRecord};
    use crate::themes::ThemeConfig;
    use crate::transfer::{Collaborator, RenderedDocument, TransferError};

    /// In-memory collaborator pair. Records generate requests and can hold a
    /// call open until released.
    #[derive(Default)]
    pub(crate) struct FakeTransfer {
        pub parse_error: Option<TransferError>,
        pub generate_error: Option<TransferError>,
        pub gate: Option<Arc<Notify>>,
        pub generated: std::sync::Mutex<Vec<(String, ThemeConfig)>>,
    }

    impl FakeTransfer {
        pub(crate) fn profile() -> ProfileRecord {
            let sections: ProfileSections = serde_json::from_value(serde_json::json!({
                "contact": {"name": "Ada Lovelace", "email": "ada@example.com", "location": "London"},
                "summary": "First programmer.",
                "experience": [
                    {"title": "Analyst", "company": "Engines Ltd", "dates": {"start": "1842", "end": "1843"}}
                ]
            }))
            .unwrap();
            ProfileRecord::new("p1", sections).unwrap()
        }

        async fn wait_gate(&self) {
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
        }
    }

    #[async_trait]
    impl DocumentTransfer for FakeTransfer {
        async fn parse_document(
            &self,
            _document: SourceDocument,
        ) -> Result<ProfileRecord, TransferError> {
            self.wait_gate().await;
            match &self.parse_error {
                Some(e) => Err(e.clone()),
                None => Ok(Self::profile()),
            }
        }

        async fn generate_document(
            &self,
            profile_id: &str,
            theme: &ThemeConfig,
        ) -> Result<RenderedDocument, TransferError> {
            self.wait_gate().await;
            self.generated
                .lock()
                .unwrap()
                .push((profile_id.to_string(), *theme));
            match &self.generate_error {
                Some(e) => Err(e.clone()),
                None => Ok(RenderedDocument {
                    filename: format!("resume_{profile_id}.pdf"),
                    bytes: Bytes::from_static(b"%PDF-1.7 fake"),
                }),
            }
        }
    }

    pub(crate) fn pdf() -> SourceDocument {
        SourceDocument {
            filename: "profile.pdf".to_string(),
            bytes: Bytes::from_static(b"%PDF-1.4"),
        }
    }

    #[tokio::test]
    async fn test_upload_then_generate_round() {
        let fake = Arc::new(FakeTransfer::default());
        let session = Arc::new(Session::new());

        let outcome = session.upload(fake.clone(), pdf()).await.unwrap();
        assert_eq!(outcome, Admission::Started(UploadCompletion::Loaded));
        assert_eq!(session.view().await.stage, Stage::Previewing);

        let outcome = session.select_theme(fake.clone(), "classic").await.unwrap();
        match outcome {
            Admission::Started(GenerateCompletion::Download(doc)) => {
                assert_eq!(doc.filename, "resume_p1.pdf")
            }
            other => panic!("unexpected outcome {other:?}"),
        }

        let generated = fake.generated.lock().unwrap();
        assert_eq!(generated.len(), 1);
        assert_eq!(generated[0].0, "p1");
        assert_eq!(generated[0].1.font_size, "12pt");
        drop(generated);

        let view = session.view().await;
        assert_eq!(view.stage, Stage::Previewing);
        assert!(!view.is_generating);
    }

    #[tokio::test]
    async fn test_upload_failure_is_stored_not_returned() {
        let fake = Arc::new(FakeTransfer {
            parse_error: Some(TransferError::UpstreamRejected {
                service: Collaborator::Parser,
                status: 500,
                message: "bad pdf".to_string(),
            }),
            ..Default::default()
        });
        let session = Arc::new(Session::new());

        let outcome = session.upload(fake, pdf()).await.unwrap();
        assert_eq!(outcome, Admission::Started(UploadCompletion::Failed));

        let view = session.view().await;
        assert_eq!(view.stage, Stage::UploadFailed);
        assert_eq!(view.presented_stage, Stage::Idle);
        assert_eq!(view.error.unwrap().message, "bad pdf");
    }

    #[tokio::test]
    async fn test_state_is_observable_while_upload_in_flight() {
        let gate = Arc::new(Notify::new());
        let fake = Arc::new(FakeTransfer {
            gate: Some(gate.clone()),
            ..Default::default()
        });
        let session = Arc::new(Session::new());

        let running = {
            let session = Arc::clone(&session);
            let fake = fake.clone();
            tokio::spawn(async move { session.upload(fake, pdf()).await })
        };

        // Wait until the upload has been admitted.
        while !session.view().await.is_uploading {
            tokio::task::yield_now().await;
        }

        let second = session.upload(fake.clone(), pdf()).await.unwrap();
        assert_eq!(second, Admission::AlreadyInFlight);

        gate.notify_one();
        let first = running.await.unwrap().unwrap();
        assert_eq!(first, Admission::Started(UploadCompletion::Loaded));
        assert!(!session.view().await.is_uploading);
    }

    #[tokio::test]
    async fn test_back_during_upload_discards_result() {
        let gate = Arc::new(Notify::new());
        let fake = Arc::new(FakeTransfer {
            gate: Some(gate.clone()),
            ..Default::default()
        });
        let session = Arc::new(Session::new());

        let running = {
            let session = Arc::clone(&session);
            let fake = fake.clone();
            tokio::spawn(async move { session.upload(fake, pdf()).await })
        };
        while !session.view().await.is_uploading {
            tokio::task::yield_now().await;
        }

        session.back().await;
        gate.notify_one();

        let outcome = running.await.unwrap().unwrap();
        assert_eq!(outcome, Admission::Started(UploadCompletion::Stale));
        let view = session.view().await;
        assert_eq!(view.stage, Stage::Idle);
        assert!(view.profile.is_none());
    }

    #[tokio::test]
    async fn test_select_theme_without_profile_is_rejected() {
        let fake = Arc::new(FakeTransfer::default());
        let session = Arc::new(Session::new());

        let err = session.select_theme(fake.clone(), "modern").await.unwrap_err();
        assert!(matches!(
            err,
            SessionError::Workflow(WorkflowError::PreconditionViolation(_))
        ));
        assert!(fake.generated.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_sessions_are_evicted() {
        let store = SessionStore::new();
        let ttl = Duration::from_secs(30);

        let abandoned = store.create().await;
        tokio::time::advance(Duration::from_secs(20)).await;
        let recent = store.create().await;
        tokio::time::advance(Duration::from_secs(15)).await;

        assert_eq!(store.evict_idle(ttl).await, 1);
        assert_eq!(store.len().await, 1);
        assert!(store.get(abandoned.id()).await.is_none());
        assert!(store.get(recent.id()).await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_lookup_keeps_session_alive() {
        let store = SessionStore::new();
        let ttl = Duration::from_secs(30);
        let session = store.create().await;

        tokio::time::advance(Duration::from_secs(25)).await;
        assert!(store.get(session.id()).await.is_some());
        tokio::time::advance(Duration::from_secs(25)).await;

        assert_eq!(store.evict_idle(ttl).await, 0);
        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(store.evict_idle(ttl).await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_waiting_on_collaborator_is_not_evicted() {
        let gate = Arc::new(Notify::new());
        let fake = Arc::new(FakeTransfer {
            gate: Some(gate.clone()),
            ..Default::default()
        });
        let store = SessionStore::new();
        let session = store.create().await;

        let running = {
            let session = Arc::clone(&session);
            let fake = fake.clone();
            tokio::spawn(async move { session.upload(fake, pdf()).await })
        };
        while !session.view().await.is_uploading {
            tokio::task::yield_now().await;
        }

        tokio::time::advance(Duration::from_secs(120)).await;
        assert_eq!(store.evict_idle(Duration::from_secs(30)).await, 0);

        gate.notify_one();
        running.await.unwrap().unwrap();
        assert_eq!(store.evict_idle(Duration::from_secs(30)).await, 0);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expiry_task_sweeps_abandoned_sessions() {
        let store = SessionStore::new();
        for _ in 0..3 {
            store.create().await;
        }
        let sweeper = store.spawn_expiry(Duration::from_secs(10));

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(store.len().await, 0);
        sweeper.abort();
    }

    #[tokio::test]
    async fn test_store_create_get_remove() {
        let store = SessionStore::new();
        let session = store.create().await;
        assert_eq!(store.len().await, 1);
        assert!(store.get(session.id()).await.is_some());

        assert!(store.remove(session.id()).await);
        assert!(!store.remove(session.id()).await);
        assert!(store.get(session.id()).await.is_none());
    }
}
