//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
    Extension, Form,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, warn};
use utoipa::{OpenApi, ToSchema};

use thetamind_core::domain::User;
use thetamind_core::tasks::{EvaluationPayload, LessonPayload, QuizPayload, SolutionPayload};

use crate::web::state::AppState;

/// The cap on rows returned by the ask-history endpoint.
pub const HISTORY_LIMIT: i64 = 50;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        ask_handler,
        history_handler,
        generate_quiz_handler,
        evaluate_answer_handler,
        get_lesson_handler,
        solve_problem_handler,
    ),
    components(
        schemas(AskResponse, HistoryResponse, HistoryRow, ErrorBody)
    ),
    tags(
        (name = "thetamind API", description = "API endpoints for the AI math tutoring service.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

/// The generic JSON error body; never carries raw provider or database text.
#[derive(Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(message: &str) -> Self {
        Self {
            error: message.to_string(),
        }
    }
}

fn internal_error(message: &str) -> (StatusCode, Json<ErrorBody>) {
    (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorBody::new(message)))
}

#[derive(Deserialize, ToSchema)]
pub struct AskForm {
    pub usr: String,
    pub txt: String,
    #[serde(default)]
    pub ocr: String,
}

#[derive(Serialize, ToSchema)]
pub struct AskResponse {
    pub ok: bool,
    pub ans: String,
}

#[derive(Deserialize)]
pub struct HistoryParams {
    pub usr: String,
}

#[derive(Serialize, ToSchema)]
pub struct HistoryRow {
    pub id: i64,
    pub q: String,
    pub ocr: String,
    pub ai: String,
    pub ts: String,
}

#[derive(Serialize, ToSchema)]
pub struct HistoryResponse {
    pub ok: bool,
    pub rows: Vec<HistoryRow>,
}

#[derive(Deserialize, ToSchema)]
pub struct QuizForm {
    pub topic: String,
    pub difficulty: String,
}

#[derive(Deserialize, ToSchema)]
pub struct EvaluateForm {
    pub question: String,
    pub user_solution: String,
    pub correct_solution: String,
    pub topic: String,
    pub difficulty: String,
}

#[derive(Deserialize, ToSchema)]
pub struct LessonForm {
    pub topic: String,
}

#[derive(Deserialize, ToSchema)]
pub struct SolveForm {
    pub problem: String,
}

#[derive(Serialize, ToSchema)]
pub struct StatRow {
    pub topic: String,
    pub difficulty: String,
    pub is_correct: Option<bool>,
    pub count: i64,
}

#[derive(Serialize, ToSchema)]
pub struct DashboardResponse {
    pub username: String,
    pub stats: Vec<StatRow>,
}

//=========================================================================================
// Unauthenticated API Handlers
//=========================================================================================

/// Ask a free-form tutoring question.
///
/// No authentication required; the caller identifies itself with a free-text
/// tag. The exchange is appended to the ask log on a best-effort basis - a
/// failure to persist never fails the request.
#[utoipa::path(
    post,
    path = "/api/ask",
    request_body(content = AskForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "The AI tutor's answer", body = AskResponse),
        (status = 500, description = "The AI tutor could not produce an answer", body = ErrorBody)
    )
)]
pub async fn ask_handler(
    State(state): State<Arc<AppState>>,
    Form(form): Form<AskForm>,
) -> Result<Json<AskResponse>, (StatusCode, Json<ErrorBody>)> {
    let answer = state.tutor.ask(&form.txt, &form.ocr).await.map_err(|e| {
        error!("Ask task failed: {e:?}");
        internal_error("Failed to get an answer from the AI tutor.")
    })?;

    // Best-effort logging; the answer is still returned when the append fails.
    if let Err(e) = state
        .history
        .record_ask(&form.usr, &form.txt, &form.ocr, &answer)
        .await
    {
        warn!("Failed to store ask history: {e:?}");
    }

    Ok(Json(AskResponse {
        ok: true,
        ans: answer,
    }))
}

/// Fetch the ask history for a user tag, newest first, capped at 50 rows.
#[utoipa::path(
    get,
    path = "/api/history",
    params(("usr" = String, Query, description = "The free-text user tag")),
    responses(
        (status = 200, description = "The most recent ask exchanges", body = HistoryResponse)
    )
)]
pub async fn history_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<HistoryResponse>, (StatusCode, Json<ErrorBody>)> {
    let records = state
        .history
        .history_for(&params.usr, HISTORY_LIMIT)
        .await
        .map_err(|e| {
            error!("Failed to load ask history: {e:?}");
            internal_error("Failed to load history.")
        })?;

    let rows = records
        .into_iter()
        .map(|r| HistoryRow {
            id: r.id,
            q: r.question_text,
            ocr: r.ocr_text,
            ai: r.ai_answer_text,
            ts: r.ts.to_rfc3339(),
        })
        .collect();

    Ok(Json(HistoryResponse { ok: true, rows }))
}

//=========================================================================================
// Authenticated API Handlers
//=========================================================================================

/// Generate a single quiz question for a topic and difficulty.
#[utoipa::path(
    post,
    path = "/api/generate_quiz",
    request_body(content = QuizForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "A quiz question with its solution"),
        (status = 401, description = "Authentication required", body = ErrorBody),
        (status = 500, description = "The AI did not return a usable question", body = ErrorBody)
    )
)]
pub async fn generate_quiz_handler(
    State(state): State<Arc<AppState>>,
    Form(form): Form<QuizForm>,
) -> Result<Json<QuizPayload>, (StatusCode, Json<ErrorBody>)> {
    let payload = state
        .tutor
        .generate_quiz(&form.topic, &form.difficulty)
        .await
        .map_err(|e| {
            error!("Quiz generation failed: {e:?}");
            internal_error("Failed to generate a valid quiz question from AI.")
        })?;
    Ok(Json(payload))
}

/// Evaluate a student's solution and record the graded attempt.
#[utoipa::path(
    post,
    path = "/api/evaluate_answer",
    request_body(content = EvaluateForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "The evaluation verdict and feedback"),
        (status = 401, description = "Authentication required", body = ErrorBody),
        (status = 500, description = "The AI did not return a usable evaluation", body = ErrorBody)
    )
)]
pub async fn evaluate_answer_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Form(form): Form<EvaluateForm>,
) -> Result<Json<EvaluationPayload>, (StatusCode, Json<ErrorBody>)> {
    let evaluation = state
        .tutor
        .evaluate_answer(&form.question, &form.user_solution, &form.correct_solution)
        .await
        .map_err(|e| {
            error!("Answer evaluation failed: {e:?}");
            internal_error("Failed to get a valid evaluation from AI.")
        })?;

    // The graded path is not best-effort: a failure to persist the attempt
    // surfaces to the caller.
    state
        .history
        .record_quiz_attempt(
            user.id,
            &form.topic,
            &form.difficulty,
            &form.question,
            &form.user_solution,
            evaluation.is_correct,
        )
        .await
        .map_err(|e| {
            error!("Failed to record quiz attempt: {e:?}");
            internal_error("Failed to record the quiz attempt.")
        })?;

    Ok(Json(evaluation))
}

/// Fetch a short lesson on a math concept.
#[utoipa::path(
    post,
    path = "/api/get_lesson",
    request_body(content = LessonForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "A titled explanation of the concept"),
        (status = 401, description = "Authentication required", body = ErrorBody),
        (status = 500, description = "The AI did not return a usable lesson", body = ErrorBody)
    )
)]
pub async fn get_lesson_handler(
    State(state): State<Arc<AppState>>,
    Form(form): Form<LessonForm>,
) -> Result<Json<LessonPayload>, (StatusCode, Json<ErrorBody>)> {
    let payload = state.tutor.get_lesson(&form.topic).await.map_err(|e| {
        error!("Lesson generation failed: {e:?}");
        internal_error("Failed to generate a valid lesson from AI.")
    })?;
    Ok(Json(payload))
}

/// Solve a math problem with a step-by-step explanation.
#[utoipa::path(
    post,
    path = "/api/solve_problem",
    request_body(content = SolveForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "A worked solution"),
        (status = 401, description = "Authentication required", body = ErrorBody),
        (status = 500, description = "The AI did not return a usable solution", body = ErrorBody)
    )
)]
pub async fn solve_problem_handler(
    State(state): State<Arc<AppState>>,
    Form(form): Form<SolveForm>,
) -> Result<Json<SolutionPayload>, (StatusCode, Json<ErrorBody>)> {
    let payload = state.tutor.solve_problem(&form.problem).await.map_err(|e| {
        error!("Problem solving failed: {e:?}");
        internal_error("Failed to generate a valid solution from AI.")
    })?;
    Ok(Json(payload))
}

/// The per-user dashboard aggregation of graded quiz attempts.
pub async fn dashboard_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
) -> Result<Json<DashboardResponse>, (StatusCode, Json<ErrorBody>)> {
    let stats = state.history.stats_for(user.id).await.map_err(|e| {
        error!("Failed to load dashboard stats: {e:?}");
        internal_error("Failed to load dashboard statistics.")
    })?;

    let stats = stats
        .into_iter()
        .map(|s| StatRow {
            topic: s.topic,
            difficulty: s.difficulty,
            is_correct: s.is_correct,
            count: s.count,
        })
        .collect();

    Ok(Json(DashboardResponse {
        username: user.username,
        stats,
    }))
}
