//! crates/thetamind_core/src/orchestrator.rs
//!
//! The provider-agnostic orchestration layer: renders a task prompt,
//! dispatches it to whichever `CompletionProvider` was injected at startup,
//! and strictly parses the structured JSON contract out of the response.

use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::ports::{CompletionProvider, ProviderError};
use crate::tasks::{
    EvaluationPayload, LessonPayload, QuizPayload, SolutionPayload, TaskRequest,
};

/// An error surfaced to callers of the orchestrator.
///
/// Providers are not trusted to return valid JSON; a response that does not
/// parse into the task's schema becomes `MalformedResponse` carrying the raw
/// text for server-side diagnostics. Nothing here is retried automatically.
#[derive(Debug, thiserror::Error)]
pub enum AiError {
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error("AI response did not match the expected schema")]
    MalformedResponse { raw: String },
}

/// Builds task prompts and mediates between the use cases and the configured
/// AI provider. Constructed once at startup with the injected provider.
pub struct TutorOrchestrator {
    provider: Arc<dyn CompletionProvider>,
}

impl TutorOrchestrator {
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self { provider }
    }

    /// Free-form tutoring: the answer is plain prose, no JSON contract.
    pub async fn ask(&self, question: &str, ocr_text: &str) -> Result<String, AiError> {
        let req = TaskRequest::FreeformTutor {
            question: question.to_string(),
            ocr_text: ocr_text.to_string(),
        };
        let prompt = req.render_prompt();
        let answer = self.provider.complete(req.kind(), &prompt).await?;
        Ok(answer)
    }

    pub async fn generate_quiz(
        &self,
        topic: &str,
        difficulty: &str,
    ) -> Result<QuizPayload, AiError> {
        self.complete_json(TaskRequest::GenerateQuiz {
            topic: topic.to_string(),
            difficulty: difficulty.to_string(),
        })
        .await
    }

    pub async fn evaluate_answer(
        &self,
        question: &str,
        user_solution: &str,
        correct_solution: &str,
    ) -> Result<EvaluationPayload, AiError> {
        self.complete_json(TaskRequest::EvaluateAnswer {
            question: question.to_string(),
            user_solution: user_solution.to_string(),
            correct_solution: correct_solution.to_string(),
        })
        .await
    }

    pub async fn get_lesson(&self, topic: &str) -> Result<LessonPayload, AiError> {
        self.complete_json(TaskRequest::GetLesson {
            topic: topic.to_string(),
        })
        .await
    }

    pub async fn solve_problem(&self, problem: &str) -> Result<SolutionPayload, AiError> {
        self.complete_json(TaskRequest::SolveProblem {
            problem: problem.to_string(),
        })
        .await
    }

    /// The shared path for every JSON-contract task: render, dispatch, and
    /// strict-parse. A parse failure is contained as a typed error rather
    /// than propagating a raw serde error.
    async fn complete_json<T: DeserializeOwned>(&self, req: TaskRequest) -> Result<T, AiError> {
        let prompt = req.render_prompt();
        let raw = self.provider.complete(req.kind(), &prompt).await?;
        serde_json::from_str(&raw).map_err(|_| AiError::MalformedResponse { raw })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::TaskKind;
    use async_trait::async_trait;

    /// A provider stub that replies with a fixed string for every task.
    struct FixedProvider(String);

    #[async_trait]
    impl CompletionProvider for FixedProvider {
        async fn complete(&self, _task: TaskKind, _prompt: &str) -> Result<String, ProviderError> {
            Ok(self.0.clone())
        }
    }

    /// A provider stub that always fails at the transport level.
    struct FailingProvider;

    #[async_trait]
    impl CompletionProvider for FailingProvider {
        async fn complete(&self, _task: TaskKind, _prompt: &str) -> Result<String, ProviderError> {
            Err(ProviderError::Upstream("connection reset".to_string()))
        }
    }

    fn orchestrator_with(reply: &str) -> TutorOrchestrator {
        TutorOrchestrator::new(Arc::new(FixedProvider(reply.to_string())))
    }

    #[tokio::test]
    async fn well_formed_evaluation_parses_into_payload() {
        let orchestrator = orchestrator_with(
            r#"{"is_correct": true, "feedback": "Great job!", "smarter_way": "FOIL."}"#,
        );
        let payload = orchestrator
            .evaluate_answer("q", "student", "correct")
            .await
            .unwrap();
        assert!(payload.is_correct);
        assert_eq!(payload.feedback, "Great job!");
    }

    #[tokio::test]
    async fn non_json_reply_becomes_malformed_response() {
        let orchestrator = orchestrator_with("Sorry, I can only answer in prose.");
        let err = orchestrator.generate_quiz("Algebra", "Easy").await.unwrap_err();
        match err {
            AiError::MalformedResponse { raw } => {
                assert!(raw.contains("prose"));
            }
            other => panic!("expected MalformedResponse, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn json_missing_required_keys_is_malformed() {
        let orchestrator = orchestrator_with(r#"{"question": "only one key"}"#);
        let err = orchestrator.generate_quiz("Algebra", "Easy").await.unwrap_err();
        assert!(matches!(err, AiError::MalformedResponse { .. }));
    }

    #[tokio::test]
    async fn provider_failure_passes_through_as_provider_error() {
        let orchestrator = TutorOrchestrator::new(Arc::new(FailingProvider));
        let err = orchestrator.solve_problem("x = ?").await.unwrap_err();
        assert!(matches!(err, AiError::Provider(ProviderError::Upstream(_))));
    }

    #[tokio::test]
    async fn freeform_answer_is_returned_verbatim() {
        let orchestrator = orchestrator_with("Step 1: add the numbers.");
        let answer = orchestrator.ask("What is 2+2?", "").await.unwrap();
        assert_eq!(answer, "Step 1: add the numbers.");
    }
}
