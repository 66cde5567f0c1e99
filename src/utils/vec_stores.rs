use anyhow::Result;
use qdrant_client::prelude::{CreateCollection, Distance, QdrantClient, SearchPoints};
use qdrant_client::qdrant::vectors_config::Config;
use qdrant_client::qdrant::with_payload_selector::SelectorOptions::Enable;
use qdrant_client::qdrant::{
    CollectionOperationResponse, PointStruct, ScoredPoint, VectorParams, VectorsConfig,
    WithPayloadSelector,
};

use crate::config::VectorStoreConfig;
use crate::utils::embedding::EmbedVec;
use crate::utils::JsonMap;

pub type Vector = EmbedVec;

/// Vector store backed by a Qdrant collection.
///
/// This is a collaborator boundary: the store persists identified vectors with JSON
/// payloads and answers nearest-neighbour queries. Idempotency on id collision is
/// Qdrant's contract (an upsert with a known id overwrites the point).
pub struct QdrantStore {
    pub client: QdrantClient,
    pub collection: String,
}

impl QdrantStore {
    pub fn new(config: VectorStoreConfig) -> Result<Self> {
        let client = QdrantClient::from_url(config.url.as_str())
            .with_api_key(config.api_key)
            .build()?;
        Ok(Self {
            client,
            collection: config.collection,
        })
    }

    /// Qdrant point ids are unsigned integers or UUIDs, so identifiers here are numeric;
    /// put human-readable identifiers in the payload.
    pub fn create_point(id: u64, vec: Vector, payload: JsonMap) -> PointStruct {
        let payload = payload
            .into_iter()
            .map(|(key, value)| (key, value.into()))
            .collect();
        PointStruct {
            id: Some(id.into()),
            payload,
            vectors: Some(vec.into()),
        }
    }

    pub async fn create_simple_vector_collection(
        &self,
        collection_name: impl Into<String>,
        distance: Distance,
        vector_size: u64,
    ) -> Result<CollectionOperationResponse> {
        let create = CreateCollection {
            collection_name: collection_name.into(),
            vectors_config: Some(VectorsConfig {
                config: Some(Config::Params(VectorParams {
                    size: vector_size,
                    distance: distance.into(),
                    ..Default::default()
                })),
            }),
            ..Default::default()
        };
        self.client.create_collection(&create).await
    }

    pub async fn upsert_point(&self, id: u64, vec: Vector, payload: JsonMap) -> Result<()> {
        self.upsert_points(vec![(id, vec, payload)]).await
    }

    pub async fn upsert_points(&self, points: Vec<(u64, Vector, JsonMap)>) -> Result<()> {
        let points = points
            .into_iter()
            .map(|(id, vec, payload)| Self::create_point(id, vec, payload))
            .collect();
        self.client
            .upsert_points(&self.collection, points, None)
            .await
            .map(|_| ())
    }

    pub async fn search_nearest_with_payload(&self, vec: Vector, top_k: u64) -> Result<Vec<ScoredPoint>> {
        self.client
            .search_points(&SearchPoints {
                collection_name: self.collection.clone(),
                vector: vec,
                limit: top_k,
                with_payload: Some(WithPayloadSelector {
                    selector_options: Some(Enable(true)),
                }),
                ..Default::default()
            })
            .await
            .map(|response| response.result)
    }
}
