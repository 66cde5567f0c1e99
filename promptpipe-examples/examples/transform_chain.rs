//! Plain functions as chain stages: compute a value, then ask the model about it.

use anyhow::{anyhow, Result};
use dotenv::dotenv;
use promptpipe::chain::{Node, Pipeline};
use promptpipe::config::LlmConfig;
use promptpipe::stage::{transform, LlmStage, TemplateStage};
use promptpipe::utils::llm::ChatClient;
use serde_json::json;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    let square = transform("square", |input| {
        let x = input["x"]
            .as_i64()
            .ok_or_else(|| anyhow!("input has no integer `x`"))?;
        Ok(json!({"square_result": x * x}))
    });
    let question_template = TemplateStage::new("Tell me about the number {square_result}!");
    let model = ChatClient::new(LlmConfig::from_env()?);

    let chain = Pipeline::new(Node::from(square) | question_template | LlmStage::new(model));
    let result = chain.evaluate(json!({"x": 10})).await?;

    println!("{}", result);
    println!("{}", "=".repeat(30));
    println!("{}", result["content"].as_str().unwrap_or_default());
    Ok(())
}
