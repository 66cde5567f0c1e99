//! Chat prompt templates: render system/user messages from one input, then send them.

use anyhow::Result;
use dotenv::dotenv;
use promptpipe::chain::{Node, Pipeline, Stage};
use promptpipe::config::LlmConfig;
use promptpipe::stage::{ChatTemplateStage, LlmStage};
use promptpipe::utils::llm::ChatClient;
use serde_json::json;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    let chat_prompt = ChatTemplateStage::from_messages(vec![
        ("system", "you are an assistant that answers questions in a {style} style"),
        ("user", "{question}"),
    ]);

    let input = json!({"style": "funny", "question": "Who is Alan Turing?"});

    // render once to see what the model will receive
    let messages = chat_prompt.apply(input.clone()).await?;
    for msg in messages.as_array().unwrap() {
        println!(
            "{}: {}",
            msg["role"].as_str().unwrap_or_default(),
            msg["content"].as_str().unwrap_or_default()
        );
    }

    let model = ChatClient::new(LlmConfig::from_env()?);
    let pipeline = Pipeline::new(Node::from(chat_prompt) | LlmStage::new(model));
    let result = pipeline.evaluate(input).await?;

    println!("{}", result);
    println!("{}", "=".repeat(30));
    println!("{}", result["content"].as_str().unwrap_or_default());
    Ok(())
}
