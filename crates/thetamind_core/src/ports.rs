//! crates/thetamind_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or APIs.

use async_trait::async_trait;

use crate::domain::{AskRecord, QuizStat, User};
use crate::tasks::TaskKind;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all store port operations.
/// This abstracts away the specific errors from external services (e.g., database).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    /// A uniqueness constraint on username/email/oauth identity rejected the write.
    #[error("Duplicate identity: {0}")]
    DuplicateIdentity(String),
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Identity and Session Ports
//=========================================================================================

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Exact-match lookup. Absence is a valid "no such user" result, not an error.
    async fn find_by_username(&self, username: &str) -> PortResult<Option<User>>;

    async fn find_by_email(&self, email: &str) -> PortResult<Option<User>>;

    /// Lookup by `(provider, subject_id)` for federated accounts.
    async fn find_by_oauth(&self, provider: &str, subject_id: &str)
        -> PortResult<Option<User>>;

    /// Inserts a locally registered user. The password arrives already hashed.
    /// A username/email collision surfaces as `DuplicateIdentity`, detected via
    /// the store's uniqueness constraint rather than a racy pre-check.
    async fn create_local_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> PortResult<User>;

    /// Inserts a federation-created user carrying a sentinel password hash.
    async fn create_federated_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
        provider: &str,
        subject_id: &str,
    ) -> PortResult<User>;
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Records an opaque server-minted session token for the user.
    async fn create_session(&self, token: &str, user_id: i64) -> PortResult<()>;

    /// Resolves a client-supplied token to its user. Unknown or garbled
    /// tokens resolve to `None`; this never raises to the caller.
    async fn resolve_session(&self, token: &str) -> PortResult<Option<User>>;

    async fn delete_session(&self, token: &str) -> PortResult<()>;

    /// Persists a pending federated-login CSRF state value.
    async fn save_login_state(&self, state: &str) -> PortResult<()>;

    /// Consumes a pending state value. Returns whether it existed; a state
    /// can only be taken once.
    async fn take_login_state(&self, state: &str) -> PortResult<bool>;
}

//=========================================================================================
// History Port
//=========================================================================================

#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Appends one free-form ask exchange. Callers treat this as best-effort
    /// logging; a failure here must not fail the surrounding request.
    async fn record_ask(
        &self,
        user_tag: &str,
        question: &str,
        ocr_text: &str,
        answer: &str,
    ) -> PortResult<()>;

    /// Appends one graded quiz attempt, called only after a successful
    /// evaluation.
    async fn record_quiz_attempt(
        &self,
        user_id: i64,
        topic: &str,
        difficulty: &str,
        question: &str,
        solution: &str,
        is_correct: bool,
    ) -> PortResult<()>;

    /// Per-user aggregation grouped by (topic, difficulty, verdict).
    async fn stats_for(&self, user_id: i64) -> PortResult<Vec<QuizStat>>;

    /// Ask history for a tag, most recent first, capped at `limit` rows.
    async fn history_for(&self, user_tag: &str, limit: i64) -> PortResult<Vec<AskRecord>>;
}

//=========================================================================================
// AI Provider Port
//=========================================================================================

/// An error from the text-completion capability itself.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("No AI provider is configured")]
    Unconfigured,
    /// Any transport/provider-level failure (timeout, auth, quota), carrying
    /// the underlying message for server-side diagnostics only.
    #[error("AI provider call failed: {0}")]
    Upstream(String),
}

/// The capability "generate text from a prompt".
///
/// The task tag travels alongside the rendered prompt so that offline
/// implementations can dispatch on it directly instead of sniffing marker
/// substrings out of the prompt text.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, task: TaskKind, prompt: &str) -> Result<String, ProviderError>;
}
