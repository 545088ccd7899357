//! crates/thetamind_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Utc};

/// Represents a registered user of the tutoring service.
///
/// A user row is created either at local registration or at the first
/// successful federated login, and is never updated or deleted afterward.
/// Federation-created rows still carry a (sentinel) password hash, so
/// `hashed_password` is never empty.
#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub hashed_password: String,
    /// Set when the account was created via federated login ("google").
    /// A non-None provider always comes with a non-None subject id.
    pub oauth_provider: Option<String>,
    pub oauth_id: Option<String>,
}

/// A single free-form tutoring exchange from the unauthenticated ask
/// endpoint. Keyed by a free-text user tag, not by `User::id`. Append-only.
#[derive(Debug, Clone)]
pub struct AskRecord {
    pub id: i64,
    pub user_tag: String,
    pub question_text: String,
    pub ocr_text: String,
    pub ai_answer_text: String,
    pub ts: DateTime<Utc>,
}

/// One graded quiz attempt by an authenticated user. Append-only.
#[derive(Debug, Clone)]
pub struct QuizRecord {
    pub id: i64,
    pub user_id: i64,
    pub topic: String,
    pub difficulty: String,
    pub question_text: String,
    pub user_solution_text: String,
    /// None when the attempt was persisted before an evaluation verdict
    /// existed.
    pub is_correct: Option<bool>,
    pub ts: DateTime<Utc>,
}

/// One row of the per-user dashboard aggregation:
/// (topic, difficulty, verdict) -> attempt count.
#[derive(Debug, Clone)]
pub struct QuizStat {
    pub topic: String,
    pub difficulty: String,
    pub is_correct: Option<bool>,
    pub count: i64,
}

/// The identity assertion extracted from an external identity provider
/// after a completed token exchange.
#[derive(Debug, Clone)]
pub struct FederatedProfile {
    pub subject_id: String,
    pub email: String,
    pub display_name: Option<String>,
}
