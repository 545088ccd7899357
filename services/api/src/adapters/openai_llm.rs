//! services/api/src/adapters/openai_llm.rs
//!
//! This module contains the adapter for OpenAI-compatible chat-completion
//! providers. It implements the `CompletionProvider` port from the `core`
//! crate; both the primary (OpenAI) and secondary (Gemini, via its
//! OpenAI-compatible endpoint) providers are served by this one adapter with
//! different client configurations.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs},
    Client,
};
use async_trait::async_trait;
use thetamind_core::ports::{CompletionProvider, ProviderError};
use thetamind_core::tasks::TaskKind;

/// An adapter that implements `CompletionProvider` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiCompletionAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiCompletionAdapter {
    /// Creates a new `OpenAiCompletionAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }
}

#[async_trait]
impl CompletionProvider for OpenAiCompletionAdapter {
    async fn complete(&self, _task: TaskKind, prompt: &str) -> Result<String, ProviderError> {
        let messages = vec![ChatCompletionRequestUserMessageArgs::default()
            .content(prompt.to_string())
            .build()
            .map_err(|e| ProviderError::Upstream(e.to_string()))?
            .into()];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .n(1)
            .build()
            .map_err(|e| ProviderError::Upstream(e.to_string()))?;

        // Call the API and manually map the error if it occurs; any
        // transport/provider-level failure becomes a typed `Upstream` error
        // and never crashes the request handler.
        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e: OpenAIError| ProviderError::Upstream(e.to_string()))?;

        // Extract the text content from the first choice in the response.
        if let Some(choice) = response.choices.into_iter().next() {
            if let Some(content) = choice.message.content {
                Ok(content)
            } else {
                Err(ProviderError::Upstream(
                    "LLM response contained no text content".to_string(),
                ))
            }
        } else {
            Err(ProviderError::Upstream(
                "LLM returned no choices in its response".to_string(),
            ))
        }
    }
}
