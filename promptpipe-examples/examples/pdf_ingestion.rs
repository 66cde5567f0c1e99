//! Ingestion: load a PDF, split it, embed the chunks and upsert them into Qdrant.
//!
//! Usage: `cargo run --example pdf_ingestion -- path/to/file.pdf`

use anyhow::Result;
use dotenv::dotenv;
use promptpipe::config::{EmbeddingConfig, VectorStoreConfig};
use promptpipe::utils::embedding::OpenAIEmbedding;
use promptpipe::utils::loaders::{Document, Load, PdfLoader};
use promptpipe::utils::splitting::RecursiveCharacterSplitter;
use promptpipe::utils::token::count_tokens_by_len;
use promptpipe::utils::vec_stores::QdrantStore;
use promptpipe::utils::JsonMap;
use serde_json::json;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    // fail fast on configuration before doing any work
    let embedding_config = EmbeddingConfig::from_env()?;
    let store_config = VectorStoreConfig::from_env()?;

    let pdf_path = std::env::args().nth(1).unwrap_or_else(|| "gpt5.pdf".to_string());
    let docs = PdfLoader::new(pdf_path).load()?;

    let splitter = RecursiveCharacterSplitter::new(1000, 150);
    let splits = splitter.split_documents(docs, &count_tokens_by_len);
    if splits.is_empty() {
        return Ok(());
    }

    let enriched: Vec<Document> = splits.into_iter().map(Document::scrub_metadata).collect();

    let embedding = OpenAIEmbedding::new(embedding_config);
    let texts: Vec<String> = enriched.iter().map(|doc| doc.page_content.clone()).collect();
    let vectors = embedding.embed_batch(texts).await?;

    let store = QdrantStore::new(store_config)?;
    let points: Vec<(u64, Vec<f32>, JsonMap)> = enriched
        .into_iter()
        .zip(vectors)
        .enumerate()
        .map(|(index, (doc, vector))| {
            let mut payload = doc.metadata;
            payload.insert("page_content".to_string(), json!(doc.page_content));
            payload.insert("doc_id".to_string(), json!(format!("doc-{}", index)));
            (index as u64, vector, payload)
        })
        .collect();

    let ingested = points.len();
    store.upsert_points(points).await?;
    println!("ingested {} chunks into collection {}", ingested, store.collection);
    Ok(())
}
