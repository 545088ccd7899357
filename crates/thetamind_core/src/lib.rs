pub mod domain;
pub mod orchestrator;
pub mod ports;
pub mod tasks;

pub use domain::{AskRecord, FederatedProfile, QuizRecord, QuizStat, User};
pub use orchestrator::{AiError, TutorOrchestrator};
pub use ports::{
    CompletionProvider, CredentialStore, HistoryStore, PortError, PortResult, ProviderError,
    SessionStore,
};
pub use tasks::{
    EvaluationPayload, LessonPayload, QuizPayload, SolutionPayload, TaskKind, TaskRequest,
};
