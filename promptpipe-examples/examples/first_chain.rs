//! A first chain: prompt template piped into a model.

use anyhow::Result;
use dotenv::dotenv;
use promptpipe::chain::{Node, Pipeline};
use promptpipe::config::LlmConfig;
use promptpipe::stage::{LlmStage, TemplateStage};
use promptpipe::utils::llm::ChatClient;
use serde_json::json;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    let question_template = TemplateStage::new("Hi, I'm {name}! Tell me a joke about my name!");
    let model = ChatClient::new(LlmConfig::from_env()?);

    let chain = Pipeline::new(Node::from(question_template) | LlmStage::new(model));
    let result = chain.evaluate(json!({"name": "Aldebaran"})).await?;

    println!("{}", result);
    println!("{}", "=".repeat(30));
    println!("{}", result["content"].as_str().unwrap_or_default());
    Ok(())
}
