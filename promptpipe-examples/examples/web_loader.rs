//! Load a web page and split it into chunks.
//!
//! Dedicated crawling crates do this better for anything complex; this demo only fetches
//! one page.

use anyhow::Result;
use promptpipe::utils::loaders::{AsyncLoad, WebLoader};
use promptpipe::utils::splitting::RecursiveCharacterSplitter;
use promptpipe::utils::token::count_tokens_by_len;
use url::Url;

#[tokio::main]
async fn main() -> Result<()> {
    let loader = WebLoader::new(Url::parse("https://www.rust-lang.org/")?);
    let docs = loader.load().await?;

    let splitter = RecursiveCharacterSplitter::new(500, 100);
    let chunks = splitter.split_documents(docs, &count_tokens_by_len);

    for chunk in &chunks {
        println!("{}", chunk.page_content);
        println!("{}", "-".repeat(30));
    }
    Ok(())
}
