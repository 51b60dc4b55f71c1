use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use qdrant_client::qdrant::{
    CreateCollectionBuilder, Distance, PointStruct, SearchPointsBuilder, UpsertPointsBuilder,
    VectorParamsBuilder,
};
use qdrant_client::{Payload, Qdrant};
use serde_json::json;

use crate::store::{ScoredChunk, StoredPoint, VectorBackend};

pub fn connect(url: &str, timeout: Duration) -> Result<Qdrant> {
    Ok(Qdrant::from_url(url).timeout(timeout).build()?)
}

#[async_trait]
impl VectorBackend for Qdrant {
    async fn collection_names(&self) -> Result<Vec<String>> {
        let response = self.list_collections().await?;
        Ok(response.collections.into_iter().map(|c| c.name).collect())
    }

    async fn create_collection(&self, name: &str, dimension: u64, distance: Distance) -> Result<()> {
        Qdrant::create_collection(
            self,
            CreateCollectionBuilder::new(name)
                .vectors_config(VectorParamsBuilder::new(dimension, distance)),
        )
        .await?;
        Ok(())
    }

    async fn upsert(&self, collection: &str, points: Vec<StoredPoint>) -> Result<()> {
        let points = points
            .into_iter()
            .map(|p| -> Result<PointStruct> {
                let payload: Payload = json!({
                    "text": p.text,
                    "source": p.source,
                    "page": p.page,
                })
                .try_into()?;
                Ok(PointStruct::new(p.id, p.vector, payload))
            })
            .collect::<Result<Vec<_>>>()?;
        self.upsert_points(UpsertPointsBuilder::new(collection, points).wait(true))
            .await?;
        Ok(())
    }

    async fn search(&self, collection: &str, vector: Vec<f32>, limit: u64) -> Result<Vec<ScoredChunk>> {
        let response = self
            .search_points(SearchPointsBuilder::new(collection, vector, limit).with_payload(true))
            .await?;
        Ok(response
            .result
            .into_iter()
            .map(|scored_point| {
                let field = |key: &str| {
                    scored_point
                        .payload
                        .get(key)
                        .and_then(|v| v.as_str())
                        .map(|s| s.to_string())
                };
                ScoredChunk {
                    text: field("text").unwrap_or_default(),
                    source: field("source"),
                    score: scored_point.score,
                }
            })
            .collect())
    }
}
