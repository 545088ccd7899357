pub mod auth;
pub mod middleware;
pub mod oauth;
pub mod rest;
pub mod state;

pub use middleware::require_auth;
pub use state::AppState;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

/// Builds the application router: the public identity/ask surface plus the
/// session-protected tutoring endpoints. The binary layers CORS on top.
pub fn build_router(state: Arc<AppState>) -> Router {
    let public_routes = Router::new()
        .route("/register", post(auth::register_handler))
        .route("/login", post(auth::login_handler))
        .route("/logout", get(auth::logout_handler))
        .route("/google-login", get(oauth::google_login_handler))
        .route("/auth", get(oauth::auth_callback_handler))
        .route("/api/ask", post(rest::ask_handler))
        .route("/api/history", get(rest::history_handler));

    let protected_routes = Router::new()
        .route("/api/generate_quiz", post(rest::generate_quiz_handler))
        .route("/api/evaluate_answer", post(rest::evaluate_answer_handler))
        .route("/api/get_lesson", post(rest::get_lesson_handler))
        .route("/api/solve_problem", post(rest::solve_problem_handler))
        .route("/dashboard", get(rest::dashboard_handler))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            require_auth,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
