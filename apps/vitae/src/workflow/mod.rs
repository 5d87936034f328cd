// Workflow: upload → parse → preview → theme select → generate → download.
// The controller owns all state transitions; sessions drive it with the
// Transfer Client; handlers expose it over HTTP.

pub mod controller;
pub mod handlers;
pub mod session;
pub mod state;

pub use controller::{Admission, GenerateCompletion, UploadCompletion, WorkflowError};
pub use session::{Session, SessionError, SessionStore};
