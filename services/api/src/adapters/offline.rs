//! services/api/src/adapters/offline.rs
//!
//! The deterministic offline responder, used whenever the selected provider
//! has no usable credential. It lets the rest of the system run without live
//! keys: each task kind maps to a fixed canned payload matching that task's
//! JSON contract, returned after a small artificial delay standing in for
//! network latency.
//!
//! Dispatch is on the explicit `TaskKind` tag threaded through the port, not
//! on marker substrings inside the rendered prompt.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use thetamind_core::ports::{CompletionProvider, ProviderError};
use thetamind_core::tasks::TaskKind;

const DEFAULT_LATENCY: Duration = Duration::from_millis(300);

/// A network-free `CompletionProvider` with deterministic canned replies.
#[derive(Clone)]
pub struct OfflineCompletionAdapter {
    latency: Duration,
}

impl OfflineCompletionAdapter {
    pub fn new() -> Self {
        Self {
            latency: DEFAULT_LATENCY,
        }
    }

    /// Overrides the artificial delay; tests use `Duration::ZERO`.
    pub fn with_latency(latency: Duration) -> Self {
        Self { latency }
    }

    fn canned_reply(task: TaskKind) -> String {
        match task {
            TaskKind::FreeformTutor => "Step 1: Write down what the problem gives you and \
                what it asks for. Step 2: Pick the rule that connects the two and apply it \
                one operation at a time. Step 3: Check the result by substituting it back \
                into the original problem. Hint: if you are stuck, try working the problem \
                backwards from the answer's units."
                .to_string(),
            TaskKind::GenerateQuiz => json!({
                "question": "If a rectangle has a length of (2x + 1) and a width of (x - 3), what is its area in terms of x?",
                "solution": "Area = (2x + 1)(x - 3) = 2x² - 5x - 3.",
                "difficulty": "Medium"
            })
            .to_string(),
            TaskKind::EvaluateAnswer => json!({
                "is_correct": true,
                "feedback": "Great job! Your method is perfect.",
                "smarter_way": "The FOIL method is the most direct way."
            })
            .to_string(),
            TaskKind::GetLesson => json!({
                "title": "The FOIL Method",
                "explanation": "FOIL stands for First, Outer, Inner, Last. It's a mnemonic for multiplying two binomials. For (a+b)(c+d), you multiply: First terms (a*c), Outer terms (a*d), Inner terms (b*c), and Last terms (b*d), then sum them up."
            })
            .to_string(),
            TaskKind::SolveProblem => json!({
                "solution": "To factor x² - 5x + 6, you look for two numbers that multiply to 6 and add to -5. These numbers are -2 and -3. So, the factored form is (x - 2)(x - 3)."
            })
            .to_string(),
        }
    }
}

impl Default for OfflineCompletionAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CompletionProvider for OfflineCompletionAdapter {
    async fn complete(&self, task: TaskKind, _prompt: &str) -> Result<String, ProviderError> {
        tokio::time::sleep(self.latency).await;
        Ok(Self::canned_reply(task))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use thetamind_core::tasks::{
        EvaluationPayload, LessonPayload, QuizPayload, SolutionPayload,
    };

    fn adapter() -> OfflineCompletionAdapter {
        OfflineCompletionAdapter::with_latency(Duration::ZERO)
    }

    #[tokio::test]
    async fn quiz_reply_matches_the_quiz_schema() {
        let raw = adapter()
            .complete(TaskKind::GenerateQuiz, "ignored")
            .await
            .unwrap();
        let payload: QuizPayload = serde_json::from_str(&raw).unwrap();
        assert_eq!(payload.difficulty, "Medium");
        assert!(payload.question.contains("rectangle"));
    }

    #[tokio::test]
    async fn evaluation_reply_matches_the_evaluation_schema() {
        let raw = adapter()
            .complete(TaskKind::EvaluateAnswer, "ignored")
            .await
            .unwrap();
        let payload: EvaluationPayload = serde_json::from_str(&raw).unwrap();
        assert!(payload.is_correct);
        assert!(!payload.smarter_way.is_empty());
    }

    #[tokio::test]
    async fn lesson_and_solution_replies_match_their_schemas() {
        let raw = adapter()
            .complete(TaskKind::GetLesson, "ignored")
            .await
            .unwrap();
        let lesson: LessonPayload = serde_json::from_str(&raw).unwrap();
        assert_eq!(lesson.title, "The FOIL Method");

        let raw = adapter()
            .complete(TaskKind::SolveProblem, "ignored")
            .await
            .unwrap();
        let solution: SolutionPayload = serde_json::from_str(&raw).unwrap();
        assert!(solution.solution.contains("(x - 2)(x - 3)"));
    }

    #[tokio::test]
    async fn freeform_reply_is_plain_prose() {
        let raw = adapter()
            .complete(TaskKind::FreeformTutor, "ignored")
            .await
            .unwrap();
        assert!(raw.contains("Step 1"));
        assert!(serde_json::from_str::<serde_json::Value>(&raw).is_err());
    }

    #[tokio::test]
    async fn replies_are_deterministic() {
        let first = adapter()
            .complete(TaskKind::GenerateQuiz, "prompt a")
            .await
            .unwrap();
        let second = adapter()
            .complete(TaskKind::GenerateQuiz, "prompt b")
            .await
            .unwrap();
        assert_eq!(first, second);
    }
}
