//! crates/thetamind_core/src/tasks.rs
//!
//! The AI task contracts: one prompt template per task kind, plus the fixed
//! JSON key set each prompt instructs the provider to answer with. Prompt
//! rendering is pure; nothing here talks to a provider.

use serde::{Deserialize, Serialize};

//=========================================================================================
// Task Kinds and Parameters
//=========================================================================================

/// The five tutoring tasks the orchestrator can dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    /// Free-form question/answer; the provider replies with plain text.
    FreeformTutor,
    GenerateQuiz,
    EvaluateAnswer,
    GetLesson,
    SolveProblem,
}

/// A task together with its parameters, ready to be rendered into a prompt.
#[derive(Debug, Clone)]
pub enum TaskRequest {
    FreeformTutor {
        question: String,
        ocr_text: String,
    },
    GenerateQuiz {
        topic: String,
        difficulty: String,
    },
    EvaluateAnswer {
        question: String,
        user_solution: String,
        correct_solution: String,
    },
    GetLesson {
        topic: String,
    },
    SolveProblem {
        problem: String,
    },
}

impl TaskRequest {
    pub fn kind(&self) -> TaskKind {
        match self {
            TaskRequest::FreeformTutor { .. } => TaskKind::FreeformTutor,
            TaskRequest::GenerateQuiz { .. } => TaskKind::GenerateQuiz,
            TaskRequest::EvaluateAnswer { .. } => TaskKind::EvaluateAnswer,
            TaskRequest::GetLesson { .. } => TaskKind::GetLesson,
            TaskRequest::SolveProblem { .. } => TaskKind::SolveProblem,
        }
    }

    /// Renders the natural-language prompt for this task. Every JSON task
    /// spells out its expected key set; the freeform task asks for plain
    /// prose.
    pub fn render_prompt(&self) -> String {
        match self {
            TaskRequest::FreeformTutor { question, ocr_text } => format!(
                "Student: {question}\nOCR:{ocr_text}\nTask: give step-by-step solution and hint if stuck."
            ),
            TaskRequest::GenerateQuiz { topic, difficulty } => format!(
                "Generate a single math quiz question on the topic of '{topic}' with a \
                 difficulty of '{difficulty}'. Format the response as a JSON object with \
                 keys: 'question', 'solution', 'difficulty'."
            ),
            TaskRequest::EvaluateAnswer {
                question,
                user_solution,
                correct_solution,
            } => format!(
                "As an expert AI Math Tutor, evaluate a student's work.\n\
                 Original Question: \"{question}\"\n\
                 Student's Solution: \"{user_solution}\"\n\
                 Correct Solution: \"{correct_solution}\"\n\
                 Analyze the student's process. Provide your evaluation as a JSON object \
                 with keys: \"is_correct\" (boolean), \"feedback\" (constructive paragraph), \
                 \"smarter_way\" (alternative method or encouragement)."
            ),
            TaskRequest::GetLesson { topic } => format!(
                "Explain the following math concept in a clear, concise way suitable for a \
                 student: '{topic}'. Format the response as a JSON object with keys: 'title' \
                 and 'explanation'."
            ),
            TaskRequest::SolveProblem { problem } => format!(
                "Solve the following math problem and provide a step-by-step explanation: \
                 '{problem}'. Format the response as a JSON object with a single key: \
                 'solution'."
            ),
        }
    }
}

//=========================================================================================
// Structured Response Payloads
//=========================================================================================

/// The structured contract for `GenerateQuiz`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizPayload {
    pub question: String,
    pub solution: String,
    pub difficulty: String,
}

/// The structured contract for `EvaluateAnswer`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationPayload {
    pub is_correct: bool,
    pub feedback: String,
    pub smarter_way: String,
}

/// The structured contract for `GetLesson`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LessonPayload {
    pub title: String,
    pub explanation: String,
}

/// The structured contract for `SolveProblem`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolutionPayload {
    pub solution: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn freeform_prompt_carries_question_and_ocr() {
        let req = TaskRequest::FreeformTutor {
            question: "What is 2+2?".to_string(),
            ocr_text: "2+2=".to_string(),
        };
        let prompt = req.render_prompt();
        assert!(prompt.contains("Student: What is 2+2?"));
        assert!(prompt.contains("OCR:2+2="));
        assert!(prompt.contains("step-by-step solution"));
        assert_eq!(req.kind(), TaskKind::FreeformTutor);
    }

    #[test]
    fn quiz_prompt_names_topic_difficulty_and_keys() {
        let req = TaskRequest::GenerateQuiz {
            topic: "Algebra".to_string(),
            difficulty: "Medium".to_string(),
        };
        let prompt = req.render_prompt();
        assert!(prompt.contains("'Algebra'"));
        assert!(prompt.contains("'Medium'"));
        assert!(prompt.contains("'question', 'solution', 'difficulty'"));
    }

    #[test]
    fn evaluation_prompt_embeds_all_three_solutions() {
        let req = TaskRequest::EvaluateAnswer {
            question: "Factor x^2-1".to_string(),
            user_solution: "(x-1)(x+1)".to_string(),
            correct_solution: "(x+1)(x-1)".to_string(),
        };
        let prompt = req.render_prompt();
        assert!(prompt.contains("Factor x^2-1"));
        assert!(prompt.contains("(x-1)(x+1)"));
        assert!(prompt.contains("\"is_correct\""));
        assert!(prompt.contains("\"smarter_way\""));
    }

    #[test]
    fn lesson_and_solve_prompts_name_their_keys() {
        let lesson = TaskRequest::GetLesson {
            topic: "FOIL".to_string(),
        };
        assert!(lesson.render_prompt().contains("'title'"));

        let solve = TaskRequest::SolveProblem {
            problem: "x^2 - 5x + 6 = 0".to_string(),
        };
        assert!(solve.render_prompt().contains("single key: 'solution'"));
    }

    #[test]
    fn evaluation_payload_round_trips_through_json() {
        let raw = r#"{"is_correct": true, "feedback": "Nice work.", "smarter_way": "FOIL."}"#;
        let payload: EvaluationPayload = serde_json::from_str(raw).unwrap();
        assert!(payload.is_correct);
        let back = serde_json::to_string(&payload).unwrap();
        assert!(back.contains("\"smarter_way\""));
    }
}
