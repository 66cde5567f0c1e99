//! # Stage
//! Built-in stage implementations for the chain core: template filling, chat template
//! filling, LLM invocation, output parsing and plain function transforms.
//!
//! Contracts between stages are loose, documented per stage and checked at evaluation
//! time only: a template stage wants a JSON object, an LLM stage wants a prompt string
//! or a message array, a parser wants a completion object. Anything else fails with a
//! [StageError](crate::chain::errors::StageError) naming the offending stage.

use async_trait::async_trait;

use crate::chain::errors::StageError;
use crate::chain::{ChainValue, Stage};
use crate::prompt::PromptTemplate;
use crate::utils::llm::{ChatClient, ChatMessage};
use crate::utils::postprocess::json::filter_to_json;

/// Render a JSON value into a placeholder filling. Strings drop their quotes, everything
/// else renders as compact JSON, so numbers and booleans read naturally in a prompt.
fn value_to_filling(value: &ChainValue) -> String {
    match value {
        ChainValue::String(string) => string.clone(),
        other => other.to_string(),
    }
}

/// Fills a [PromptTemplate] from a JSON object input and outputs the completed prompt
/// as a string.
pub struct TemplateStage {
    name: String,
    template: PromptTemplate,
}

impl TemplateStage {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            name: "template".to_string(),
            template: PromptTemplate::new(template),
        }
    }

    /// Rename the stage, so errors from several template stages in one chain can be
    /// told apart.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

#[async_trait]
impl Stage for TemplateStage {
    fn name(&self) -> &str {
        &self.name
    }

    async fn apply(&self, input: ChainValue) -> Result<ChainValue, StageError> {
        let input = input
            .as_object()
            .ok_or_else(|| StageError::validation(&self.name, "expected a JSON object input"))?;
        let mut partial = self.template.construct_prompt();
        for placeholder in &self.template.placeholders {
            let value = input.get(placeholder).ok_or_else(|| {
                StageError::validation(
                    &self.name,
                    format!("input has no value for placeholder `{}`", placeholder),
                )
            })?;
            partial
                .try_fill(placeholder, value_to_filling(value))
                .map_err(|fill_error| StageError::validation(&self.name, fill_error.to_string()))?;
        }
        let prompt = partial
            .complete()
            .map_err(|complete_error| StageError::validation(&self.name, complete_error.to_string()))?;
        Ok(ChainValue::String(prompt))
    }
}

/// Fills one template per chat message from the same JSON object input and outputs an
/// array of `{role, content}` messages.
pub struct ChatTemplateStage {
    name: String,
    messages: Vec<(String, PromptTemplate)>,
}

impl ChatTemplateStage {
    pub fn from_messages<R, T>(messages: Vec<(R, T)>) -> Self
    where
        R: Into<String>,
        T: Into<String>,
    {
        Self {
            name: "chat_template".to_string(),
            messages: messages
                .into_iter()
                .map(|(role, template)| (role.into(), PromptTemplate::new(template)))
                .collect(),
        }
    }
}

#[async_trait]
impl Stage for ChatTemplateStage {
    fn name(&self) -> &str {
        &self.name
    }

    async fn apply(&self, input: ChainValue) -> Result<ChainValue, StageError> {
        let input = input
            .as_object()
            .ok_or_else(|| StageError::validation(&self.name, "expected a JSON object input"))?;
        let mut rendered = Vec::with_capacity(self.messages.len());
        for (role, template) in &self.messages {
            let mut partial = template.construct_prompt();
            for placeholder in &template.placeholders {
                let value = input.get(placeholder).ok_or_else(|| {
                    StageError::validation(
                        &self.name,
                        format!("input has no value for placeholder `{}`", placeholder),
                    )
                })?;
                partial
                    .try_fill(placeholder, value_to_filling(value))
                    .map_err(|fill_error| StageError::validation(&self.name, fill_error.to_string()))?;
            }
            let content = partial
                .complete()
                .map_err(|complete_error| StageError::validation(&self.name, complete_error.to_string()))?;
            rendered.push(ChatMessage { role: role.clone(), content });
        }
        serde_json::to_value(rendered)
            .map_err(|serialize_error| StageError::validation(&self.name, serialize_error.to_string()))
    }
}

/// Invokes a [ChatClient]. Accepts a prompt string or a `{role, content}` message array
/// and outputs the completion as a JSON object.
pub struct LlmStage {
    name: String,
    client: ChatClient,
}

impl LlmStage {
    pub fn new(client: ChatClient) -> Self {
        Self { name: "llm".to_string(), client }
    }
}

#[async_trait]
impl Stage for LlmStage {
    fn name(&self) -> &str {
        &self.name
    }

    async fn apply(&self, input: ChainValue) -> Result<ChainValue, StageError> {
        let messages = match input {
            ChainValue::String(prompt) => vec![ChatMessage::user(prompt)],
            array @ ChainValue::Array(_) => serde_json::from_value::<Vec<ChatMessage>>(array)
                .map_err(|shape_error| StageError::validation(&self.name, shape_error.to_string()))?,
            _ => {
                return Err(StageError::validation(
                    &self.name,
                    "expected a prompt string or a message array",
                ))
            }
        };
        let completion = self
            .client
            .complete(messages)
            .await
            .map_err(|call_error| StageError::external_call(&self.name, call_error.to_string()))?;
        serde_json::to_value(completion)
            .map_err(|serialize_error| StageError::external_call(&self.name, serialize_error.to_string()))
    }
}

/// Extracts the textual `content` from a completion object. Plain strings pass through
/// unchanged.
#[derive(Default)]
pub struct ContentParser;

#[async_trait]
impl Stage for ContentParser {
    fn name(&self) -> &str {
        "parse_content"
    }

    async fn apply(&self, input: ChainValue) -> Result<ChainValue, StageError> {
        match input {
            string @ ChainValue::String(_) => Ok(string),
            ChainValue::Object(object) => match object.get("content") {
                Some(ChainValue::String(content)) => Ok(ChainValue::String(content.clone())),
                _ => Err(StageError::parse(
                    self.name(),
                    "completion object has no string `content` field",
                )),
            },
            other => Err(StageError::parse(
                self.name(),
                format!("cannot extract content from: {}", other),
            )),
        }
    }
}

/// Extracts the first JSON object from model output, tolerating surrounding prose and
/// code fences.
#[derive(Default)]
pub struct JsonParser;

#[async_trait]
impl Stage for JsonParser {
    fn name(&self) -> &str {
        "parse_json"
    }

    async fn apply(&self, input: ChainValue) -> Result<ChainValue, StageError> {
        let text = match &input {
            ChainValue::String(string) => string.as_str(),
            ChainValue::Object(object) => object
                .get("content")
                .and_then(ChainValue::as_str)
                .ok_or_else(|| {
                    StageError::parse(self.name(), "completion object has no string `content` field")
                })?,
            _ => return Err(StageError::parse(self.name(), "expected text to parse")),
        };
        filter_to_json(text).map_err(|json_error| StageError::parse(self.name(), json_error.to_string()))
    }
}

/// A plain function as a stage.
///
/// This is the factory for turning any unary function into a pipeline stage; no special
/// syntax involved. Failures surface as validation errors under the given name.
pub struct FnStage<F> {
    name: String,
    func: F,
}

/// Wrap a unary function in the [Stage] capability.
pub fn transform<F>(name: impl Into<String>, func: F) -> FnStage<F>
where
    F: Fn(ChainValue) -> anyhow::Result<ChainValue> + Send + Sync,
{
    FnStage { name: name.into(), func }
}

#[async_trait]
impl<F> Stage for FnStage<F>
where
    F: Fn(ChainValue) -> anyhow::Result<ChainValue> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn apply(&self, input: ChainValue) -> Result<ChainValue, StageError> {
        (self.func)(input).map_err(|func_error| StageError::validation(&self.name, func_error.to_string()))
    }
}
