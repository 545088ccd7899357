//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use crate::web::oauth::GoogleReconciler;
use std::sync::Arc;
use thetamind_core::orchestrator::TutorOrchestrator;
use thetamind_core::ports::{CredentialStore, HistoryStore, SessionStore};

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn CredentialStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub history: Arc<dyn HistoryStore>,
    pub tutor: Arc<TutorOrchestrator>,
    /// Present only when Google client credentials are configured.
    pub google: Option<Arc<GoogleReconciler>>,
    pub config: Arc<Config>,
}
