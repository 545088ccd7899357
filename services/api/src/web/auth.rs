//! services/api/src/web/auth.rs
//!
//! Local-account endpoints (register, login, logout) and the argon2 password
//! helpers shared with the federated-login path.

use argon2::{
    password_hash::{self, rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Form,
};
use serde::Deserialize;
use std::sync::{Arc, OnceLock};
use tracing::error;
use uuid::Uuid;

use thetamind_core::ports::{PortError, PortResult, SessionStore};

use crate::web::middleware::{session_token, SESSION_COOKIE};
use crate::web::state::AppState;

//=========================================================================================
// Password Helpers
//=========================================================================================

/// Hashes a plaintext password with a freshly generated salt.
pub fn hash_password(plain: &str) -> Result<String, password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(plain.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verifies a plaintext password against a stored PHC hash. An unparsable
/// hash verifies as false rather than erroring.
pub fn verify_password(plain: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(plain.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// A hash to verify against when the user does not exist, so the login path
/// performs a verify-shaped amount of work either way.
pub fn dummy_hash() -> &'static str {
    static DUMMY: OnceLock<String> = OnceLock::new();
    DUMMY.get_or_init(|| {
        hash_password("thetamind-dummy-credential")
            .expect("hashing a constant with a fresh salt cannot fail")
    })
}

//=========================================================================================
// Session Issuing
//=========================================================================================

/// Mints an opaque session token for the user, records it server-side, and
/// returns the Set-Cookie value. The cookie carries no expiry attribute; its
/// lifetime is whatever the client retains.
pub async fn issue_session(sessions: &dyn SessionStore, user_id: i64) -> PortResult<String> {
    let token = Uuid::new_v4().to_string();
    sessions.create_session(&token, user_id).await?;
    Ok(format!(
        "{SESSION_COOKIE}={token}; HttpOnly; SameSite=Lax; Path=/"
    ))
}

fn cleared_session_cookie() -> String {
    format!("{SESSION_COOKIE}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0")
}

//=========================================================================================
// Request Types
//=========================================================================================

#[derive(Deserialize)]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /register - Create a new local account.
///
/// Redirects to the login page on success; a duplicate username/email sends
/// the browser back to the registration page with an error code (page
/// rendering is the front-end's concern).
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    Form(form): Form<RegisterForm>,
) -> Redirect {
    let password_hash = match hash_password(&form.password) {
        Ok(hash) => hash,
        Err(e) => {
            error!("Failed to hash password: {e:?}");
            return Redirect::to("/register?error=internal");
        }
    };

    match state
        .users
        .create_local_user(&form.username, &form.email, &password_hash)
        .await
    {
        Ok(_) => Redirect::to("/login"),
        Err(PortError::DuplicateIdentity(_)) => Redirect::to("/register?error=duplicate"),
        Err(e) => {
            error!("Failed to create user: {e:?}");
            Redirect::to("/register?error=internal")
        }
    }
}

/// POST /login - Authenticate and start a session.
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Form(form): Form<LoginForm>,
) -> Result<Response, (StatusCode, String)> {
    let user = state
        .users
        .find_by_username(&form.username)
        .await
        .map_err(|e| {
            error!("Failed to look up user: {e:?}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Authentication error".to_string(),
            )
        })?;

    let Some(user) = user else {
        // Burn a verification against the dummy hash so an absent user costs
        // the same as a wrong password.
        let _ = verify_password(&form.password, dummy_hash());
        return Ok(Redirect::to("/login?error=invalid_credentials").into_response());
    };

    if !verify_password(&form.password, &user.hashed_password) {
        return Ok(Redirect::to("/login?error=invalid_credentials").into_response());
    }

    let cookie = issue_session(state.sessions.as_ref(), user.id)
        .await
        .map_err(|e| {
            error!("Failed to create session: {e:?}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to create session".to_string(),
            )
        })?;

    Ok((
        [(header::SET_COOKIE, cookie)],
        Redirect::to("/dashboard"),
    )
        .into_response())
}

/// GET /logout - Revoke the session and clear the cookie.
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    if let Some(token) = session_token(&headers) {
        if let Err(e) = state.sessions.delete_session(token).await {
            error!("Failed to delete session: {e:?}");
        }
    }
    (
        [(header::SET_COOKIE, cleared_session_cookie())],
        Redirect::to("/"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify_round_trips() {
        let hash = hash_password("pw123456").unwrap();
        assert!(verify_password("pw123456", &hash));
        assert!(!verify_password("pw1234567", &hash));
    }

    #[test]
    fn two_hashes_of_the_same_password_differ_by_salt() {
        let first = hash_password("pw123456").unwrap();
        let second = hash_password("pw123456").unwrap();
        assert_ne!(first, second);
        assert!(verify_password("pw123456", &second));
    }

    #[test]
    fn dummy_hash_is_a_valid_phc_string_matching_nothing_likely() {
        assert!(PasswordHash::new(dummy_hash()).is_ok());
        assert!(!verify_password("pw123456", dummy_hash()));
    }

    #[test]
    fn garbage_stored_hash_verifies_false() {
        assert!(!verify_password("pw123456", "not-a-phc-string"));
    }
}
