//! Chat completion client over the OpenAI API.
//!
//! [ChatClient] talks to any OpenAI-compatible endpoint (including OpenRouter via a
//! custom API base in [LlmConfig](crate::config::LlmConfig)). The pipeline core treats
//! it as an opaque external collaborator: structured messages in, one [Completion] out,
//! or a provider/transport error. Timeout and retry policy live here (in the underlying
//! HTTP client), never in the pipeline core.

use anyhow::{anyhow, bail, Result};
use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs,
};
use async_openai::Client;
use serde::{Deserialize, Serialize};

use crate::config::LlmConfig;

/// One chat message. Roles follow the OpenAI convention: `system`, `user`, `assistant`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system".to_string(), content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".to_string(), content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: "assistant".to_string(), content: content.into() }
    }
}

/// The part of a chat completion response users care about: the reply text plus a
/// little metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Completion {
    pub content: String,
    pub model: String,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

/// Client for chat completion requests against one model with one temperature.
#[derive(Clone)]
#[readonly::make]
pub struct ChatClient {
    client: Client<OpenAIConfig>,
    /// Model identifier sent with every request, readonly
    pub model: String,
    /// Sampling temperature sent with every request, readonly
    pub temperature: f32,
}

impl ChatClient {
    pub fn new(config: LlmConfig) -> Self {
        let mut openai_config = OpenAIConfig::new().with_api_key(config.api_key);
        if let Some(api_base) = config.api_base {
            openai_config = openai_config.with_api_base(api_base);
        }
        Self {
            client: Client::with_config(openai_config),
            model: config.model,
            temperature: config.temperature,
        }
    }

    /// Send one message list and return the first choice of the reply.
    pub async fn complete(&self, messages: Vec<ChatMessage>) -> Result<Completion> {
        if messages.is_empty() {
            bail!("cannot request a completion for an empty message list");
        }
        let messages = messages
            .into_iter()
            .map(to_request_message)
            .collect::<Result<Vec<_>>>()?;
        let request = CreateChatCompletionRequestArgs::default()
            .model(self.model.as_str())
            .temperature(self.temperature)
            .messages(messages)
            .build()?;
        let response = self.client.chat().create(request).await?;
        let model = response.model;
        let (prompt_tokens, completion_tokens) = response
            .usage
            .map(|usage| (usage.prompt_tokens, usage.completion_tokens))
            .unwrap_or((0, 0));
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("chat completion response carried no choices"))?;
        Ok(Completion {
            content: choice.message.content.unwrap_or_default(),
            model,
            prompt_tokens,
            completion_tokens,
        })
    }

    /// Send a single user message, like typing a prompt into a chat box.
    pub async fn complete_text(&self, prompt: impl Into<String>) -> Result<Completion> {
        self.complete(vec![ChatMessage::user(prompt)]).await
    }
}

fn to_request_message(message: ChatMessage) -> Result<ChatCompletionRequestMessage> {
    let request_message = match message.role.as_str() {
        "system" => ChatCompletionRequestSystemMessageArgs::default()
            .content(message.content)
            .build()?
            .into(),
        "user" => ChatCompletionRequestUserMessageArgs::default()
            .content(message.content)
            .build()?
            .into(),
        "assistant" => ChatCompletionRequestAssistantMessageArgs::default()
            .content(message.content)
            .build()?
            .into(),
        other => bail!("unsupported chat role: {}", other),
    };
    Ok(request_message)
}

#[cfg(test)]
mod test_llm {
    use super::ChatMessage;

    #[test]
    fn test_message_constructors() {
        assert_eq!(ChatMessage::system("be brief").role, "system");
        assert_eq!(ChatMessage::user("hello").role, "user");
        assert_eq!(ChatMessage::assistant("hi").content, "hi");
    }

    #[test]
    fn test_messages_round_trip_through_json() {
        let messages = vec![
            ChatMessage::system("you are an assistant that answers questions in a {style} style"),
            ChatMessage::user("Who is Alan Turing?"),
        ];
        let value = serde_json::to_value(&messages).unwrap();
        let back: Vec<ChatMessage> = serde_json::from_value(value).unwrap();
        assert_eq!(messages, back);
    }
}
