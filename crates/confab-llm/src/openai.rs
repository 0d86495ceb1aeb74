//! Chat completions through the OpenAI API (or any compatible endpoint).

use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionRequestAssistantMessage, ChatCompletionRequestAssistantMessageContent,
    ChatCompletionRequestMessage, ChatCompletionRequestUserMessage,
    ChatCompletionRequestUserMessageContent, CreateChatCompletionRequest,
};
use async_openai::Client;
use async_trait::async_trait;

use confab_core::error::{ConfabError, ConfabResult};
use confab_core::traits::{GenerationOptions, Llm, LlmConfig, LlmResponse};
use confab_core::types::{Message, MessageRole};

/// Model families that only accept their default sampling.
const FIXED_SAMPLING_PREFIXES: [&str; 3] = ["o1", "o3", "o4"];

pub struct OpenAIProvider {
    client: Client<OpenAIConfig>,
    config: LlmConfig,
}

impl OpenAIProvider {
    pub fn new(config: LlmConfig) -> ConfabResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .ok_or_else(|| {
                ConfabError::Configuration(
                    "no OpenAI API key: set OPENAI_API_KEY or llm.api_key".to_string(),
                )
            })?;

        let mut client_config = OpenAIConfig::new().with_api_key(api_key);
        if let Some(base_url) = &config.base_url {
            let parsed = url::Url::parse(base_url).map_err(|e| {
                ConfabError::Configuration(format!("invalid llm.base_url '{}': {}", base_url, e))
            })?;
            client_config = client_config.with_api_base(parsed.as_str().trim_end_matches('/'));
        }

        Ok(Self {
            client: Client::with_config(client_config),
            config,
        })
    }

    fn accepts_sampling(&self) -> bool {
        let model = self.config.model.to_lowercase();
        !FIXED_SAMPLING_PREFIXES.iter().any(|p| model.starts_with(p))
    }

    fn build_request(
        &self,
        messages: &[Message],
        options: GenerationOptions,
    ) -> CreateChatCompletionRequest {
        let mut request = CreateChatCompletionRequest {
            model: self.config.model.clone(),
            messages: messages.iter().map(to_request_message).collect(),
            ..Default::default()
        };
        request.max_tokens = Some(options.max_tokens.unwrap_or(self.config.max_tokens));
        if self.accepts_sampling() {
            request.temperature = Some(options.temperature.unwrap_or(self.config.temperature));
        }
        request
    }
}

fn to_request_message(message: &Message) -> ChatCompletionRequestMessage {
    let text = message.content.clone();
    match message.role {
        MessageRole::User => ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
            content: ChatCompletionRequestUserMessageContent::Text(text),
            name: None,
        }),
        MessageRole::Assistant => {
            ChatCompletionRequestMessage::Assistant(ChatCompletionRequestAssistantMessage {
                content: Some(ChatCompletionRequestAssistantMessageContent::Text(text)),
                ..Default::default()
            })
        }
    }
}

#[async_trait]
impl Llm for OpenAIProvider {
    async fn generate(
        &self,
        messages: &[Message],
        options: Option<GenerationOptions>,
    ) -> ConfabResult<LlmResponse> {
        let request = self.build_request(messages, options.unwrap_or_default());
        tracing::debug!(model = %self.config.model, turns = messages.len(), "Requesting completion");

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| ConfabError::llm(format!("completion with '{}' failed: {}", self.config.model, e)))?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();
        Ok(LlmResponse::text(content))
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(model: &str) -> OpenAIProvider {
        OpenAIProvider::new(LlmConfig {
            model: model.to_string(),
            api_key: Some("sk-test".to_string()),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_request_carries_history_and_limits() {
        let llm = provider("gpt-4o-mini");
        let history = [
            Message::user("hi").with_name("alice"),
            Message::assistant("hello"),
        ];
        let request = llm.build_request(
            &history,
            GenerationOptions {
                max_tokens: Some(32),
                ..Default::default()
            },
        );
        assert_eq!(request.messages.len(), 2);
        assert!(matches!(request.messages[1], ChatCompletionRequestMessage::Assistant(_)));
        assert_eq!(request.max_tokens, Some(32));
        assert_eq!(request.temperature, Some(0.7));
    }

    #[test]
    fn test_reasoning_models_skip_temperature() {
        let request = provider("o3-mini").build_request(&[Message::user("hi")], GenerationOptions::default());
        assert_eq!(request.temperature, None);
        assert_eq!(request.max_tokens, Some(1024));
    }

    #[test]
    fn test_bad_base_url_is_a_config_error() {
        let result = OpenAIProvider::new(LlmConfig {
            api_key: Some("sk-test".to_string()),
            base_url: Some("not a url".to_string()),
            ..Default::default()
        });
        assert!(matches!(result, Err(ConfabError::Configuration(_))));
    }
}
