//! Smallest possible use of the chat client: one prompt in, one completion out.

use anyhow::Result;
use dotenv::dotenv;
use promptpipe::config::LlmConfig;
use promptpipe::utils::llm::ChatClient;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    let model = ChatClient::new(LlmConfig::from_env()?);
    let message = model.complete_text("Hello, world!").await?;

    println!("{:?}", message);
    println!("{}", "=".repeat(30));
    println!("{}", message.content);
    Ok(())
}
