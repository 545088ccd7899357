pub mod db;
pub mod offline;
pub mod openai_llm;

pub use db::SqliteStore;
pub use offline::OfflineCompletionAdapter;
pub use openai_llm::OpenAiCompletionAdapter;

use std::sync::Arc;

use async_openai::{config::OpenAIConfig, Client};
use thetamind_core::ports::CompletionProvider;
use tracing::warn;

use crate::config::{Config, ProviderChoice};

/// Builds the process-wide completion provider from startup configuration.
///
/// The selected provider is used only when its credential is present;
/// otherwise dispatch falls back to the deterministic offline responder so
/// the rest of the system keeps working without live keys.
pub fn build_provider(config: &Config) -> Arc<dyn CompletionProvider> {
    match config.ai_provider {
        ProviderChoice::OpenAi => {
            if let Some(key) = &config.openai_api_key {
                let openai_config = OpenAIConfig::new().with_api_key(key.clone());
                return Arc::new(OpenAiCompletionAdapter::new(
                    Client::with_config(openai_config),
                    config.openai_model.clone(),
                ));
            }
        }
        ProviderChoice::Gemini => {
            if let Some(key) = &config.gemini_api_key {
                let gemini_config = OpenAIConfig::new()
                    .with_api_key(key.clone())
                    .with_api_base(config.gemini_api_base.clone());
                return Arc::new(OpenAiCompletionAdapter::new(
                    Client::with_config(gemini_config),
                    config.gemini_model.clone(),
                ));
            }
        }
    }
    warn!("No usable AI credential configured; using the offline responder");
    Arc::new(OfflineCompletionAdapter::new())
}
