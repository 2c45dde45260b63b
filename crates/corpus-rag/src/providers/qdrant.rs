//! Qdrant-backed vector index over the REST API

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use uuid::Uuid;

use crate::config::IndexConfig;
use crate::error::{Error, Result};
use crate::types::{IndexPoint, PointPayload, ScoredPoint};

use super::index::{CollectionInfo, IndexFilter, VectorIndex};

/// Vector index client for a Qdrant collection
pub struct QdrantIndex {
    client: Client,
    base_url: String,
    collection: String,
    api_key: Option<String>,
    hnsw_m: usize,
    hnsw_ef_construct: usize,
}

impl QdrantIndex {
    pub fn new(config: &IndexConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            collection: config.collection.clone(),
            api_key: config.api_key.clone(),
            hnsw_m: config.hnsw_m,
            hnsw_ef_construct: config.hnsw_ef_construct,
        })
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/collections/{}{}",
            self.base_url, self.collection, path
        )
    }

    fn with_key(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.header("api-key", key),
            None => builder,
        }
    }

    fn doc_filter(doc_id: &Uuid) -> serde_json::Value {
        json!({
            "must": [
                { "key": "doc_id", "match": { "value": doc_id.to_string() } }
            ]
        })
    }
}

#[derive(Deserialize)]
struct SearchResponse {
    result: Vec<QdrantHit>,
}

#[derive(Deserialize)]
struct QdrantHit {
    id: serde_json::Value,
    score: f32,
    payload: Option<PointPayload>,
    #[serde(default)]
    vector: Option<Vec<f32>>,
}

#[derive(Deserialize)]
struct CollectionResponse {
    result: CollectionResult,
}

#[derive(Deserialize)]
struct CollectionResult {
    #[serde(default)]
    points_count: Option<usize>,
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(Error::Upstream(format!(
        "vector index HTTP {}: {}",
        status, body
    )))
}

#[async_trait]
impl VectorIndex for QdrantIndex {
    async fn ensure_collection(&self, dimensions: usize) -> Result<()> {
        let response = self.with_key(self.client.get(self.url(""))).send().await?;

        if response.status().is_success() {
            return Ok(());
        }
        if response.status() != reqwest::StatusCode::NOT_FOUND {
            return check_status(response).await.map(|_| ());
        }

        tracing::info!("Creating collection: {}", self.collection);
        let body = json!({
            "vectors": { "size": dimensions, "distance": "Cosine" },
            "hnsw_config": { "m": self.hnsw_m, "ef_construct": self.hnsw_ef_construct },
        });
        let response = self
            .with_key(self.client.put(self.url("")))
            .json(&body)
            .send()
            .await?;
        check_status(response).await?;

        // Payload index so delete-by-doc filters stay exact-match fast
        let index_body = json!({ "field_name": "doc_id", "field_schema": "keyword" });
        let response = self
            .with_key(self.client.put(self.url("/index")))
            .json(&index_body)
            .send()
            .await?;
        check_status(response).await?;

        tracing::info!("Collection {} created", self.collection);
        Ok(())
    }

    async fn search(
        &self,
        vector: &[f32],
        limit: usize,
        score_threshold: f32,
        filter: Option<&IndexFilter>,
    ) -> Result<Vec<ScoredPoint>> {
        let mut body = json!({
            "vector": vector,
            "limit": limit,
            "score_threshold": score_threshold,
            "with_payload": true,
            "with_vector": true,
        });
        if let Some(IndexFilter {
            doc_id: Some(doc_id),
        }) = filter
        {
            body["filter"] = Self::doc_filter(doc_id);
        }

        let response = self
            .with_key(self.client.post(self.url("/points/search")))
            .json(&body)
            .send()
            .await?;
        let response = check_status(response).await?;
        let parsed: SearchResponse = response.json().await?;

        let mut points = Vec::with_capacity(parsed.result.len());
        for hit in parsed.result {
            let Some(payload) = hit.payload else {
                tracing::warn!("Search hit without payload, skipping");
                continue;
            };
            let id = hit
                .id
                .as_str()
                .and_then(|s| Uuid::parse_str(s).ok())
                .unwrap_or_else(Uuid::nil);
            points.push(ScoredPoint {
                id,
                score: hit.score,
                payload,
                vector: hit.vector,
                rerank_score: None,
            });
        }
        Ok(points)
    }

    async fn upsert(&self, points: Vec<IndexPoint>) -> Result<()> {
        if points.is_empty() {
            return Ok(());
        }
        let count = points.len();
        let body = json!({ "points": points });
        let response = self
            .with_key(self.client.put(format!("{}?wait=true", self.url("/points"))))
            .json(&body)
            .send()
            .await?;
        check_status(response).await?;
        tracing::debug!("Upserted {} points", count);
        Ok(())
    }

    async fn delete_by_doc(&self, doc_id: &Uuid) -> Result<()> {
        let body = json!({ "filter": Self::doc_filter(doc_id) });
        let response = self
            .with_key(
                self.client
                    .post(format!("{}?wait=true", self.url("/points/delete"))),
            )
            .json(&body)
            .send()
            .await?;
        check_status(response).await?;
        tracing::info!("Deleted points for document {}", doc_id);
        Ok(())
    }

    async fn collection_info(&self) -> Result<CollectionInfo> {
        let response = self.with_key(self.client.get(self.url(""))).send().await?;
        let response = check_status(response).await?;
        let parsed: CollectionResponse = response.json().await?;
        Ok(CollectionInfo {
            points_count: parsed.result.points_count.unwrap_or(0),
        })
    }

    fn name(&self) -> &str {
        "qdrant"
    }
}
