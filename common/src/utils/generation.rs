use std::sync::Arc;

use async_openai::{
    config::OpenAIConfig,
    types::{ChatCompletionRequestUserMessage, CreateChatCompletionRequestArgs},
    Client,
};
use tracing::debug;

use crate::error::AppError;

/// Single-turn generative model boundary: one user-role prompt in, the
/// model's text out, returned verbatim.
#[derive(Clone)]
pub struct GenerationProvider {
    inner: GenerationInner,
}

#[derive(Clone)]
enum GenerationInner {
    OpenAi {
        client: Arc<Client<OpenAIConfig>>,
        model: String,
    },
    /// Offline backend: replies with a fixed string, or echoes the prompt
    /// when none is configured. Used by tests and dry runs.
    Echo { reply: Option<String> },
}

impl GenerationProvider {
    pub fn new_openai(client: Arc<Client<OpenAIConfig>>, model: String) -> Self {
        GenerationProvider {
            inner: GenerationInner::OpenAi { client, model },
        }
    }

    pub fn new_echo(reply: Option<String>) -> Self {
        GenerationProvider {
            inner: GenerationInner::Echo { reply },
        }
    }

    pub fn backend_label(&self) -> &'static str {
        match self.inner {
            GenerationInner::OpenAi { .. } => "openai",
            GenerationInner::Echo { .. } => "echo",
        }
    }

    pub async fn complete(&self, prompt: &str) -> Result<String, AppError> {
        match &self.inner {
            GenerationInner::Echo { reply } => Ok(reply
                .clone()
                .unwrap_or_else(|| prompt.to_owned())),
            GenerationInner::OpenAi { client, model } => {
                let request = CreateChatCompletionRequestArgs::default()
                    .model(model.clone())
                    .messages([ChatCompletionRequestUserMessage::from(prompt.to_owned())
                        .into()])
                    .build()
                    .map_err(|e| AppError::GenerationService(e.to_string()))?;

                let response = client
                    .chat()
                    .create(request)
                    .await
                    .map_err(|e| AppError::GenerationService(e.to_string()))?;

                debug!(model = %model, "chat completion received");

                response
                    .choices
                    .first()
                    .and_then(|choice| choice.message.content.clone())
                    .ok_or_else(|| {
                        AppError::GenerationService(
                            "no content in chat completion response".into(),
                        )
                    })
            }
        }
    }
}
