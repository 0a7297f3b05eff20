use crate::embedder::Embedder;
use crate::error::StoreError;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Client for an OpenAI-compatible `/v1/embeddings` endpoint, such as a
/// self-hosted sentence-transformers server.
pub struct HttpEmbedder {
    client: Client,
    base_url: String,
    model: String,
    dimension: usize,
    api_key: Option<String>,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a [String],
    model: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: Option<usize>,
}

impl HttpEmbedder {
    pub fn new(base_url: String, model: String, dimension: usize, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            dimension,
            api_key,
        }
    }
}

#[async_trait::async_trait]
impl Embedder for HttpEmbedder {
    async fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, StoreError> {
        let url = format!("{}/v1/embeddings", self.base_url);

        let mut request = self.client.post(&url).json(&EmbeddingRequest {
            input: texts,
            model: &self.model,
        });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let resp = request
            .send()
            .await
            .map_err(|e| StoreError::Embedder(format!("Embedding API error: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(StoreError::Embedder(format!("Embedding API {status}: {body}")));
        }

        let mut result: EmbeddingResponse = resp
            .json()
            .await
            .map_err(|e| StoreError::Embedder(format!("Parse error: {e}")))?;

        if result.data.len() != texts.len() {
            return Err(StoreError::Embedder(format!(
                "Expected {} embeddings, got {}",
                texts.len(),
                result.data.len()
            )));
        }

        // Servers may return entries out of order; `index` is authoritative when present
        result.data.sort_by_key(|d| d.index.unwrap_or(usize::MAX));
        Ok(result.data.into_iter().map(|d| d.embedding).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model(&self) -> &str {
        &self.model
    }
}
