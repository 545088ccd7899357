//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `CredentialStore`, `SessionStore` and `HistoryStore` ports from the
//! `core` crate. It handles all interactions with the SQLite database using `sqlx`.
//!
//! Every operation opens a fresh, short-lived connection and drops it when done;
//! no pooled connection is shared across concurrent requests. Uniqueness races on
//! user creation are arbitrated solely by the table's UNIQUE constraints.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
use sqlx::{Connection, FromRow};
use std::str::FromStr;

use thetamind_core::domain::{AskRecord, QuizStat, User};
use thetamind_core::ports::{
    CredentialStore, HistoryStore, PortError, PortResult, SessionStore,
};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A SQLite adapter implementing the identity, session and history ports.
#[derive(Clone)]
pub struct SqliteStore {
    options: SqliteConnectOptions,
}

impl SqliteStore {
    /// Creates a new `SqliteStore` from prepared connect options.
    pub fn new(options: SqliteConnectOptions) -> Self {
        Self { options }
    }

    /// Creates a store from a `sqlite:` URL, creating the file on first use.
    pub fn from_url(url: &str) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);
        Ok(Self::new(options))
    }

    async fn connect(&self) -> PortResult<SqliteConnection> {
        SqliteConnection::connect_with(&self.options)
            .await
            .map_err(unexpected)
    }

    /// Creates all tables at startup. The unauthenticated ask log keeps the
    /// historical `sess` shape (free-text `usr` tag); graded attempts live in
    /// `quiz_history` keyed by `user_id`. The two are deliberately not unified.
    pub async fn init_schema(&self) -> PortResult<()> {
        let mut conn = self.connect().await?;
        let statements = [
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT UNIQUE NOT NULL,
                email TEXT UNIQUE NOT NULL,
                hashed_password TEXT NOT NULL,
                oauth_provider TEXT,
                oauth_id TEXT,
                UNIQUE (oauth_provider, oauth_id)
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                token TEXT PRIMARY KEY,
                user_id INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users (id)
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS login_states (
                state TEXT PRIMARY KEY,
                created_at TEXT NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS quiz_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                topic TEXT NOT NULL,
                difficulty TEXT NOT NULL,
                question TEXT NOT NULL,
                user_solution TEXT,
                is_correct BOOLEAN,
                ts TEXT NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users (id)
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS sess (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                usr TEXT NOT NULL,
                qtxt TEXT NOT NULL,
                ocrtxt TEXT NOT NULL,
                ai_res TEXT NOT NULL,
                ts TEXT NOT NULL
            )
            "#,
        ];
        for statement in statements {
            sqlx::query(statement)
                .execute(&mut conn)
                .await
                .map_err(unexpected)?;
        }
        Ok(())
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

/// Maps a failed insert to the port taxonomy: a UNIQUE violation means the
/// identity already exists, anything else is unexpected.
fn map_insert_err(e: sqlx::Error, what: &str) -> PortError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            PortError::DuplicateIdentity(what.to_string())
        }
        _ => PortError::Unexpected(e.to_string()),
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    id: i64,
    username: String,
    email: String,
    hashed_password: String,
    oauth_provider: Option<String>,
    oauth_id: Option<String>,
}
impl UserRecord {
    fn to_domain(self) -> User {
        User {
            id: self.id,
            username: self.username,
            email: self.email,
            hashed_password: self.hashed_password,
            oauth_provider: self.oauth_provider,
            oauth_id: self.oauth_id,
        }
    }
}

#[derive(FromRow)]
struct AskRecordRow {
    id: i64,
    usr: String,
    qtxt: String,
    ocrtxt: String,
    ai_res: String,
    ts: DateTime<Utc>,
}
impl AskRecordRow {
    fn to_domain(self) -> AskRecord {
        AskRecord {
            id: self.id,
            user_tag: self.usr,
            question_text: self.qtxt,
            ocr_text: self.ocrtxt,
            ai_answer_text: self.ai_res,
            ts: self.ts,
        }
    }
}

#[derive(FromRow)]
struct QuizStatRow {
    topic: String,
    difficulty: String,
    is_correct: Option<bool>,
    count: i64,
}
impl QuizStatRow {
    fn to_domain(self) -> QuizStat {
        QuizStat {
            topic: self.topic,
            difficulty: self.difficulty,
            is_correct: self.is_correct,
            count: self.count,
        }
    }
}

const USER_COLUMNS: &str = "id, username, email, hashed_password, oauth_provider, oauth_id";

//=========================================================================================
// `CredentialStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl CredentialStore for SqliteStore {
    async fn find_by_username(&self, username: &str) -> PortResult<Option<User>> {
        let mut conn = self.connect().await?;
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = ?"
        ))
        .bind(username)
        .fetch_optional(&mut conn)
        .await
        .map_err(unexpected)?;
        Ok(record.map(UserRecord::to_domain))
    }

    async fn find_by_email(&self, email: &str) -> PortResult<Option<User>> {
        let mut conn = self.connect().await?;
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = ?"
        ))
        .bind(email)
        .fetch_optional(&mut conn)
        .await
        .map_err(unexpected)?;
        Ok(record.map(UserRecord::to_domain))
    }

    async fn find_by_oauth(
        &self,
        provider: &str,
        subject_id: &str,
    ) -> PortResult<Option<User>> {
        let mut conn = self.connect().await?;
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE oauth_provider = ? AND oauth_id = ?"
        ))
        .bind(provider)
        .bind(subject_id)
        .fetch_optional(&mut conn)
        .await
        .map_err(unexpected)?;
        Ok(record.map(UserRecord::to_domain))
    }

    async fn create_local_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> PortResult<User> {
        let mut conn = self.connect().await?;
        let result = sqlx::query(
            "INSERT INTO users (username, email, hashed_password) VALUES (?, ?, ?)",
        )
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .execute(&mut conn)
        .await
        .map_err(|e| map_insert_err(e, "username or email already exists"))?;

        Ok(User {
            id: result.last_insert_rowid(),
            username: username.to_string(),
            email: email.to_string(),
            hashed_password: password_hash.to_string(),
            oauth_provider: None,
            oauth_id: None,
        })
    }

    async fn create_federated_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
        provider: &str,
        subject_id: &str,
    ) -> PortResult<User> {
        let mut conn = self.connect().await?;
        let result = sqlx::query(
            "INSERT INTO users (username, email, hashed_password, oauth_provider, oauth_id) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .bind(provider)
        .bind(subject_id)
        .execute(&mut conn)
        .await
        .map_err(|e| map_insert_err(e, "federated identity already exists"))?;

        Ok(User {
            id: result.last_insert_rowid(),
            username: username.to_string(),
            email: email.to_string(),
            hashed_password: password_hash.to_string(),
            oauth_provider: Some(provider.to_string()),
            oauth_id: Some(subject_id.to_string()),
        })
    }
}

//=========================================================================================
// `SessionStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl SessionStore for SqliteStore {
    async fn create_session(&self, token: &str, user_id: i64) -> PortResult<()> {
        let mut conn = self.connect().await?;
        sqlx::query("INSERT INTO sessions (token, user_id, created_at) VALUES (?, ?, ?)")
            .bind(token)
            .bind(user_id)
            .bind(Utc::now())
            .execute(&mut conn)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn resolve_session(&self, token: &str) -> PortResult<Option<User>> {
        let mut conn = self.connect().await?;
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT u.id, u.username, u.email, u.hashed_password, u.oauth_provider, u.oauth_id \
             FROM sessions s JOIN users u ON u.id = s.user_id WHERE s.token = ?",
        )
        .bind(token)
        .fetch_optional(&mut conn)
        .await
        .map_err(unexpected)?;
        Ok(record.map(UserRecord::to_domain))
    }

    async fn delete_session(&self, token: &str) -> PortResult<()> {
        let mut conn = self.connect().await?;
        sqlx::query("DELETE FROM sessions WHERE token = ?")
            .bind(token)
            .execute(&mut conn)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn save_login_state(&self, state: &str) -> PortResult<()> {
        let mut conn = self.connect().await?;
        sqlx::query("INSERT INTO login_states (state, created_at) VALUES (?, ?)")
            .bind(state)
            .bind(Utc::now())
            .execute(&mut conn)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn take_login_state(&self, state: &str) -> PortResult<bool> {
        let mut conn = self.connect().await?;
        let result = sqlx::query("DELETE FROM login_states WHERE state = ?")
            .bind(state)
            .execute(&mut conn)
            .await
            .map_err(unexpected)?;
        Ok(result.rows_affected() > 0)
    }
}

//=========================================================================================
// `HistoryStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl HistoryStore for SqliteStore {
    async fn record_ask(
        &self,
        user_tag: &str,
        question: &str,
        ocr_text: &str,
        answer: &str,
    ) -> PortResult<()> {
        let mut conn = self.connect().await?;
        sqlx::query("INSERT INTO sess (usr, qtxt, ocrtxt, ai_res, ts) VALUES (?, ?, ?, ?, ?)")
            .bind(user_tag)
            .bind(question)
            .bind(ocr_text)
            .bind(answer)
            .bind(Utc::now())
            .execute(&mut conn)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn record_quiz_attempt(
        &self,
        user_id: i64,
        topic: &str,
        difficulty: &str,
        question: &str,
        solution: &str,
        is_correct: bool,
    ) -> PortResult<()> {
        let mut conn = self.connect().await?;
        sqlx::query(
            "INSERT INTO quiz_history (user_id, topic, difficulty, question, user_solution, is_correct, ts) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(topic)
        .bind(difficulty)
        .bind(question)
        .bind(solution)
        .bind(is_correct)
        .bind(Utc::now())
        .execute(&mut conn)
        .await
        .map_err(unexpected)?;
        Ok(())
    }

    async fn stats_for(&self, user_id: i64) -> PortResult<Vec<QuizStat>> {
        let mut conn = self.connect().await?;
        let rows = sqlx::query_as::<_, QuizStatRow>(
            "SELECT topic, difficulty, is_correct, COUNT(*) as count FROM quiz_history \
             WHERE user_id = ? GROUP BY topic, difficulty, is_correct \
             ORDER BY topic, difficulty",
        )
        .bind(user_id)
        .fetch_all(&mut conn)
        .await
        .map_err(unexpected)?;
        Ok(rows.into_iter().map(QuizStatRow::to_domain).collect())
    }

    async fn history_for(&self, user_tag: &str, limit: i64) -> PortResult<Vec<AskRecord>> {
        let mut conn = self.connect().await?;
        let rows = sqlx::query_as::<_, AskRecordRow>(
            "SELECT id, usr, qtxt, ocrtxt, ai_res, ts FROM sess \
             WHERE usr = ? ORDER BY id DESC LIMIT ?",
        )
        .bind(user_tag)
        .bind(limit)
        .fetch_all(&mut conn)
        .await
        .map_err(unexpected)?;
        Ok(rows.into_iter().map(AskRecordRow::to_domain).collect())
    }
}

//=========================================================================================
// Tests
//=========================================================================================

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_store() -> (SqliteStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let options = SqliteConnectOptions::new()
            .filename(dir.path().join("thetamind.db"))
            .create_if_missing(true)
            .foreign_keys(true);
        let store = SqliteStore::new(options);
        store.init_schema().await.unwrap();
        (store, dir)
    }

    #[tokio::test]
    async fn create_then_find_round_trips() {
        let (store, _dir) = test_store().await;
        let created = store
            .create_local_user("alice", "alice@x.com", "hash-1")
            .await
            .unwrap();
        let found = store.find_by_username("alice").await.unwrap().unwrap();
        assert_eq!(found.id, created.id);
        assert_eq!(found.email, "alice@x.com");
        assert_eq!(found.hashed_password, "hash-1");
        assert!(found.oauth_provider.is_none());

        assert!(store.find_by_username("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_username_is_rejected_with_one_row_kept() {
        let (store, _dir) = test_store().await;
        store
            .create_local_user("alice", "alice@x.com", "hash-1")
            .await
            .unwrap();
        let err = store
            .create_local_user("alice", "other@x.com", "hash-2")
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::DuplicateIdentity(_)));

        // The first row is untouched.
        let found = store.find_by_username("alice").await.unwrap().unwrap();
        assert_eq!(found.email, "alice@x.com");
        assert!(store.find_by_email("other@x.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let (store, _dir) = test_store().await;
        store
            .create_local_user("alice", "alice@x.com", "hash-1")
            .await
            .unwrap();
        let err = store
            .create_local_user("bob", "alice@x.com", "hash-2")
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::DuplicateIdentity(_)));
    }

    #[tokio::test]
    async fn federated_identity_is_unique_and_findable() {
        let (store, _dir) = test_store().await;
        let created = store
            .create_federated_user("g@x.com", "g@x.com", "sentinel", "google", "sub-1")
            .await
            .unwrap();
        assert_eq!(created.oauth_provider.as_deref(), Some("google"));

        let found = store
            .find_by_oauth("google", "sub-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, created.id);

        let err = store
            .create_federated_user("g2@x.com", "g2@x.com", "sentinel", "google", "sub-1")
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::DuplicateIdentity(_)));
    }

    #[tokio::test]
    async fn session_round_trip_and_revocation() {
        let (store, _dir) = test_store().await;
        let user = store
            .create_local_user("alice", "alice@x.com", "hash-1")
            .await
            .unwrap();

        store.create_session("tok-1", user.id).await.unwrap();
        let resolved = store.resolve_session("tok-1").await.unwrap().unwrap();
        assert_eq!(resolved.username, "alice");

        // Garbage tokens resolve to None, never an error.
        assert!(store.resolve_session("garbage").await.unwrap().is_none());

        store.delete_session("tok-1").await.unwrap();
        assert!(store.resolve_session("tok-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn login_state_is_single_use() {
        let (store, _dir) = test_store().await;
        store.save_login_state("csrf-1").await.unwrap();
        assert!(store.take_login_state("csrf-1").await.unwrap());
        assert!(!store.take_login_state("csrf-1").await.unwrap());
        assert!(!store.take_login_state("never-saved").await.unwrap());
    }

    #[tokio::test]
    async fn ask_history_is_filtered_ordered_and_capped() {
        let (store, _dir) = test_store().await;
        for i in 0..55 {
            store
                .record_ask("alice", &format!("q{i}"), "", &format!("a{i}"))
                .await
                .unwrap();
        }
        store.record_ask("bob", "other", "", "answer").await.unwrap();

        let rows = store.history_for("alice", 50).await.unwrap();
        assert_eq!(rows.len(), 50);
        // Most recent first, strictly descending ids, only alice's rows.
        assert!(rows.windows(2).all(|w| w[0].id > w[1].id));
        assert_eq!(rows[0].question_text, "q54");
        assert!(rows.iter().all(|r| r.user_tag == "alice"));
    }

    #[tokio::test]
    async fn quiz_stats_group_by_topic_difficulty_and_verdict() {
        let (store, _dir) = test_store().await;
        let user = store
            .create_local_user("alice", "alice@x.com", "hash-1")
            .await
            .unwrap();

        store
            .record_quiz_attempt(user.id, "Algebra", "Medium", "q1", "s1", true)
            .await
            .unwrap();
        store
            .record_quiz_attempt(user.id, "Algebra", "Medium", "q2", "s2", true)
            .await
            .unwrap();
        store
            .record_quiz_attempt(user.id, "Geometry", "Easy", "q3", "s3", false)
            .await
            .unwrap();

        let stats = store.stats_for(user.id).await.unwrap();
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].topic, "Algebra");
        assert_eq!(stats[0].is_correct, Some(true));
        assert_eq!(stats[0].count, 2);
        assert_eq!(stats[1].topic, "Geometry");
        assert_eq!(stats[1].count, 1);

        // Another user sees nothing.
        assert!(store.stats_for(user.id + 1).await.unwrap().is_empty());
    }
}
