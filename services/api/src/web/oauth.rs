//! services/api/src/web/oauth.rs
//!
//! Google federated login: the authorization-code round trip plus the
//! reconciliation of an external identity assertion onto a local user row.
//!
//! ## Flow
//!
//! 1. `GET /google-login` builds an authorization URL requesting the
//!    `openid`, `email` and `profile` scopes, persists the random CSRF state
//!    in the `login_states` table, and redirects the browser.
//! 2. `GET /auth` consumes the state row (single use), exchanges the
//!    authorization code for an access token, fetches the Google userinfo
//!    endpoint, and reconciles the asserted identity: lookup by
//!    `(provider, subject)` first, create a sentinel-password account if
//!    absent, then re-fetch by email so repeated completions always resolve
//!    to the same user row.

use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Redirect, Response},
};
use oauth2::basic::BasicClient;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, EndpointNotSet, EndpointSet,
    RedirectUrl, Scope, TokenResponse, TokenUrl,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::error;
use uuid::Uuid;

use thetamind_core::domain::{FederatedProfile, User};
use thetamind_core::ports::{CredentialStore, PortError, SessionStore};

use crate::web::auth::{hash_password, issue_session};
use crate::web::state::AppState;

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

/// The provider tag stored on federation-created user rows.
pub const GOOGLE_PROVIDER: &str = "google";

/// Errors from the federated-login round trip.
#[derive(Debug, thiserror::Error)]
pub enum FederationError {
    /// The provider completed the exchange but returned no usable identity
    /// claims (missing or empty subject/email).
    #[error("identity provider returned no usable identity claims")]
    AssertionMissing,
    /// The token exchange itself failed, or the state was unknown/replayed.
    #[error("token exchange with the identity provider failed: {0}")]
    ExchangeFailed(String),
    #[error(transparent)]
    Store(#[from] PortError),
}

/// Google user info from the userinfo API.
#[derive(Debug, Deserialize)]
struct GoogleUserInfo {
    id: Option<String>,
    email: Option<String>,
    name: Option<String>,
}

/// OAuth client type with auth URL and token URL set.
type ConfiguredClient = oauth2::Client<
    oauth2::basic::BasicErrorResponse,
    oauth2::basic::BasicTokenResponse,
    oauth2::basic::BasicTokenIntrospectionResponse,
    oauth2::StandardRevocableToken,
    oauth2::basic::BasicRevocationErrorResponse,
    EndpointSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointSet,
>;

/// Maps Google identity assertions onto local user rows.
pub struct GoogleReconciler {
    oauth: ConfiguredClient,
    http: reqwest::Client,
}

impl GoogleReconciler {
    pub fn new(
        client_id: String,
        client_secret: String,
        redirect_url: String,
    ) -> Result<Self, String> {
        let oauth = BasicClient::new(ClientId::new(client_id))
            .set_client_secret(ClientSecret::new(client_secret))
            .set_auth_uri(AuthUrl::new(GOOGLE_AUTH_URL.to_string()).map_err(|e| e.to_string())?)
            .set_token_uri(TokenUrl::new(GOOGLE_TOKEN_URL.to_string()).map_err(|e| e.to_string())?)
            .set_redirect_uri(RedirectUrl::new(redirect_url).map_err(|e| e.to_string())?);

        // The token-exchange client must not follow redirects.
        let http = reqwest::ClientBuilder::new()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| e.to_string())?;

        Ok(Self { oauth, http })
    }

    /// First round trip: returns the provider's authorization URL after
    /// persisting the CSRF state.
    pub async fn begin_login(
        &self,
        sessions: &dyn SessionStore,
    ) -> Result<String, FederationError> {
        let (auth_url, csrf_state) = self
            .oauth
            .authorize_url(CsrfToken::new_random)
            .add_scope(Scope::new("openid".to_string()))
            .add_scope(Scope::new("email".to_string()))
            .add_scope(Scope::new("profile".to_string()))
            .url();

        sessions.save_login_state(csrf_state.secret()).await?;
        Ok(auth_url.to_string())
    }

    /// Second round trip: exchanges the authorization response for an
    /// identity assertion and reconciles it onto a user row.
    pub async fn complete_login(
        &self,
        users: &dyn CredentialStore,
        sessions: &dyn SessionStore,
        code: &str,
        state: &str,
    ) -> Result<User, FederationError> {
        if !sessions.take_login_state(state).await? {
            return Err(FederationError::ExchangeFailed(
                "unknown or already-used login state".to_string(),
            ));
        }

        let token = self
            .oauth
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .request_async(&self.http)
            .await
            .map_err(|e| FederationError::ExchangeFailed(e.to_string()))?;

        let info: GoogleUserInfo = self
            .http
            .get(GOOGLE_USERINFO_URL)
            .bearer_auth(token.access_token().secret())
            .send()
            .await
            .map_err(|e| FederationError::ExchangeFailed(e.to_string()))?
            .json()
            .await
            .map_err(|e| FederationError::ExchangeFailed(e.to_string()))?;

        let profile = profile_from(info)?;
        reconcile(users, profile).await
    }
}

/// Validates the raw userinfo response into an identity assertion.
fn profile_from(info: GoogleUserInfo) -> Result<FederatedProfile, FederationError> {
    let subject_id = info.id.filter(|s| !s.is_empty());
    let email = info.email.filter(|s| !s.is_empty());
    match (subject_id, email) {
        (Some(subject_id), Some(email)) => Ok(FederatedProfile {
            subject_id,
            email,
            display_name: info.name,
        }),
        _ => Err(FederationError::AssertionMissing),
    }
}

/// Maps an identity assertion onto exactly one user row.
///
/// Repeated completions with the same `(provider, subject)` resolve to the
/// same row: the subject lookup hits first on the fast path, and a loser of
/// a concurrent create falls through the `DuplicateIdentity` arm to the
/// email re-fetch. An existing local account with the asserted email is
/// linked the same way.
pub async fn reconcile(
    users: &dyn CredentialStore,
    profile: FederatedProfile,
) -> Result<User, FederationError> {
    if let Some(user) = users
        .find_by_oauth(GOOGLE_PROVIDER, &profile.subject_id)
        .await?
    {
        return Ok(user);
    }

    // The account is never meant to be unlocked via password; store the hash
    // of a throwaway random secret.
    let sentinel = hash_password(&Uuid::new_v4().to_string())
        .map_err(|e| FederationError::Store(PortError::Unexpected(e.to_string())))?;

    match users
        .create_federated_user(
            &profile.email,
            &profile.email,
            &sentinel,
            GOOGLE_PROVIDER,
            &profile.subject_id,
        )
        .await
    {
        Ok(_) | Err(PortError::DuplicateIdentity(_)) => {}
        Err(e) => return Err(e.into()),
    }

    users
        .find_by_email(&profile.email)
        .await?
        .ok_or_else(|| {
            FederationError::Store(PortError::NotFound(format!(
                "federated account for {}",
                profile.email
            )))
        })
}

//=========================================================================================
// Handlers
//=========================================================================================

#[derive(Deserialize)]
pub struct AuthCallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
}

/// GET /google-login - Redirect the browser to Google's authorization endpoint.
pub async fn google_login_handler(State(state): State<Arc<AppState>>) -> Response {
    let Some(google) = &state.google else {
        return Redirect::to("/login?error=federation_unconfigured").into_response();
    };

    match google.begin_login(state.sessions.as_ref()).await {
        Ok(url) => Redirect::to(&url).into_response(),
        Err(e) => {
            error!("Failed to begin federated login: {e:?}");
            Redirect::to("/login?error=federation_failed").into_response()
        }
    }
}

/// GET /auth - The provider's redirect target; completes the login.
pub async fn auth_callback_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AuthCallbackParams>,
) -> Response {
    let Some(google) = &state.google else {
        return Redirect::to("/login?error=federation_unconfigured").into_response();
    };

    let (Some(code), Some(csrf_state)) = (params.code, params.state) else {
        return Redirect::to("/login?error=federation_failed").into_response();
    };

    let user = match google
        .complete_login(
            state.users.as_ref(),
            state.sessions.as_ref(),
            &code,
            &csrf_state,
        )
        .await
    {
        Ok(user) => user,
        Err(e) => {
            error!("Federated login failed: {e:?}");
            return Redirect::to("/login?error=federation_failed").into_response();
        }
    };

    match issue_session(state.sessions.as_ref(), user.id).await {
        Ok(cookie) => (
            [(header::SET_COOKIE, cookie)],
            Redirect::to("/dashboard"),
        )
            .into_response(),
        Err(e) => {
            error!("Failed to create session after federated login: {e:?}");
            Redirect::to("/login?error=federation_failed").into_response()
        }
    }
}
