use anyhow::{anyhow, Result};
use async_openai::config::OpenAIConfig;
use async_openai::types::{CreateEmbeddingRequestArgs, EmbeddingInput, EmbeddingUsage};
use async_openai::Client;
use async_trait::async_trait;

use crate::config::EmbeddingConfig;

/// Vector of floats representing an embedding.
pub type EmbedVec = Vec<f32>;

/// Trait for getting the embedding dimension.
pub trait GetEmbedDim {
    fn embedding_dim(&self) -> Option<usize>;
}

/// Trait for embedding a string and outputting the embedding vector and extra info.
#[async_trait]
pub trait AsyncEmbed: GetEmbedDim {
    type OutputExtra;
    async fn embed(&self, string: impl Into<String> + Send) -> Result<(EmbedVec, Self::OutputExtra)>;
}

/// Trait for embedding a string and outputting only the embedding vector.
#[async_trait]
pub trait AsyncSimplyEmbed: GetEmbedDim {
    async fn embed(&self, string: impl Into<String> + Send) -> Result<EmbedVec>;
}

/// Blanket impl of AsyncSimplyEmbed for AsyncEmbed trait.
#[async_trait]
impl<T: AsyncEmbed + Sync> AsyncSimplyEmbed for T
where
    <T as AsyncEmbed>::OutputExtra: Send,
{
    async fn embed(&self, string: impl Into<String> + Send) -> Result<EmbedVec> {
        AsyncEmbed::embed(self, string).await.map(|e| e.0)
    }
}

/// Embedding model from the OpenAI API.
#[derive(Clone)]
pub struct OpenAIEmbedding {
    client: Client<OpenAIConfig>,
    pub embedding_model: String,
}

impl OpenAIEmbedding {
    pub fn new(config: EmbeddingConfig) -> Self {
        let mut openai_config = OpenAIConfig::new().with_api_key(config.api_key);
        if let Some(api_base) = config.api_base {
            openai_config = openai_config.with_api_base(api_base);
        }
        Self {
            client: Client::with_config(openai_config),
            embedding_model: config.model,
        }
    }

    /// Embed a batch of strings in one request. Vectors come back in input order.
    pub async fn embed_batch(&self, strings: Vec<String>) -> Result<Vec<EmbedVec>> {
        if strings.is_empty() {
            return Ok(Vec::new());
        }
        let expected = strings.len();
        let request = CreateEmbeddingRequestArgs::default()
            .model(self.embedding_model.as_str())
            .input(EmbeddingInput::StringArray(strings))
            .build()?;
        let response = self.client.embeddings().create(request).await?;
        if response.data.len() != expected {
            return Err(anyhow!(
                "embedding response carried {} vectors for {} inputs",
                response.data.len(),
                expected
            ));
        }
        let mut data = response.data;
        data.sort_by_key(|embedding| embedding.index);
        Ok(data.into_iter().map(|embedding| embedding.embedding).collect())
    }
}

impl GetEmbedDim for OpenAIEmbedding {
    fn embedding_dim(&self) -> Option<usize> {
        let dim = match self.embedding_model.as_str() {
            "text-embedding-ada-002" => 1536,
            "text-embedding-3-small" => 1536,
            "text-embedding-3-large" => 3072,
            _ => return None,
        };
        Some(dim)
    }
}

#[async_trait]
impl AsyncEmbed for OpenAIEmbedding {
    type OutputExtra = EmbeddingUsage;

    async fn embed(&self, string: impl Into<String> + Send) -> Result<(EmbedVec, Self::OutputExtra)> {
        let request = CreateEmbeddingRequestArgs::default()
            .model(self.embedding_model.as_str())
            .input(EmbeddingInput::String(string.into()))
            .build()?;
        let mut response = self.client.embeddings().create(request).await?;
        let embedding = response
            .data
            .pop()
            .ok_or_else(|| anyhow!("embedding response carried no vectors"))?
            .embedding;
        let usage = response.usage;
        Ok((embedding, usage))
    }
}

#[cfg(test)]
mod test_embedding {
    use super::{GetEmbedDim, OpenAIEmbedding};
    use crate::config::EmbeddingConfig;

    fn embedding_with_model(model: &str) -> OpenAIEmbedding {
        OpenAIEmbedding::new(EmbeddingConfig {
            api_key: "test-key".to_string(),
            api_base: None,
            model: model.to_string(),
        })
    }

    #[test]
    fn test_known_model_dimensions() {
        assert_eq!(embedding_with_model("text-embedding-ada-002").embedding_dim(), Some(1536));
        assert_eq!(embedding_with_model("text-embedding-3-large").embedding_dim(), Some(3072));
        assert_eq!(embedding_with_model("some-new-model").embedding_dim(), None);
    }
}
