//! A two-step processing pipeline: translate, then fan the translation into a
//! summarization chain.

use anyhow::Result;
use dotenv::dotenv;
use promptpipe::chain::{FanOut, Node, Pipeline};
use promptpipe::config::LlmConfig;
use promptpipe::stage::{ContentParser, LlmStage, TemplateStage};
use promptpipe::utils::llm::ChatClient;
use serde_json::json;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    let template_translate = TemplateStage::new(
        "Translate the following text to {target_language}\n ```{initial_text}```",
    )
    .with_name("translate_template");
    let template_summary = TemplateStage::new(
        "Summarize the following text in 4 words:\n ```{text_to_summarize}```",
    )
    .with_name("summary_template");

    let model = ChatClient::new(LlmConfig::from_env()?);

    let translate = Node::from(template_translate) | LlmStage::new(model.clone()) | ContentParser;
    let pipeline = Pipeline::new(
        Node::from(FanOut::new().branch("text_to_summarize", translate))
            | template_summary
            | LlmStage::new(model)
            | ContentParser,
    );

    let result = pipeline
        .evaluate(json!({
            "initial_text": "promptpipe is a framework for developing LLM applications in Rust",
            "target_language": "Portuguese",
        }))
        .await?;

    println!("{}", result);
    Ok(())
}
