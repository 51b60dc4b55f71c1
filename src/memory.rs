//! In-process vector backend. Nothing is persisted; the store is discarded when the process exits.

use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use qdrant_client::qdrant::Distance;

use crate::store::{ScoredChunk, StoredPoint, VectorBackend};

struct Collection {
    dimension: u64,
    distance: Distance,
    points: Vec<StoredPoint>,
}

#[derive(Default)]
pub struct MemoryBackend {
    collections: Mutex<HashMap<String, Collection>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn point_count(&self, collection: &str) -> usize {
        self.lock()
            .get(collection)
            .map_or(0, |c| c.points.len())
    }

    pub fn dimension(&self, collection: &str) -> Option<u64> {
        self.lock().get(collection).map(|c| c.dimension)
    }

    pub fn distance(&self, collection: &str) -> Option<Distance> {
        self.lock().get(collection).map(|c| c.distance)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Collection>> {
        self.collections.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl VectorBackend for MemoryBackend {
    async fn collection_names(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.lock().keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn create_collection(&self, name: &str, dimension: u64, distance: Distance) -> Result<()> {
        let mut collections = self.lock();
        if collections.contains_key(name) {
            bail!("collection '{name}' already exists");
        }
        if distance != Distance::Cosine {
            bail!("in-memory collections only support cosine distance, got {distance:?}");
        }
        collections.insert(
            name.to_string(),
            Collection {
                dimension,
                distance,
                points: Vec::new(),
            },
        );
        Ok(())
    }

    async fn upsert(&self, collection: &str, points: Vec<StoredPoint>) -> Result<()> {
        let mut collections = self.lock();
        let c = collections
            .get_mut(collection)
            .ok_or_else(|| anyhow!("collection '{collection}' not found"))?;
        if let Some(p) = points.iter().find(|p| p.vector.len() as u64 != c.dimension) {
            bail!(
                "vector dimension error: expected dim: {}, got {}",
                c.dimension,
                p.vector.len()
            );
        }
        for point in points {
            match c.points.iter_mut().find(|existing| existing.id == point.id) {
                Some(existing) => *existing = point,
                None => c.points.push(point),
            }
        }
        Ok(())
    }

    async fn search(&self, collection: &str, vector: Vec<f32>, limit: u64) -> Result<Vec<ScoredChunk>> {
        let collections = self.lock();
        let c = collections
            .get(collection)
            .ok_or_else(|| anyhow!("collection '{collection}' not found"))?;
        let mut scored: Vec<ScoredChunk> = c
            .points
            .iter()
            .map(|p| ScoredChunk {
                text: p.text.clone(),
                source: p.source.clone(),
                score: cosine(&vector, &p.vector),
            })
            .collect();
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit as usize);
        Ok(scored)
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let norm = norm(a) * norm(b);
    if norm <= 0.0 {
        0.0
    } else {
        dot(a, b) / norm
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn norm(v: &[f32]) -> f32 {
    dot(v, v).sqrt()
}
