//! Retrieval stage: embeds the query and asks the vector index for the nearest
//! passages.
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;

use crate::{config::Config, error::RetrievalError};

const PINECONE_API_VERSION: &str = "2024-07";
const TEXT_METADATA_KEY: &str = "text";

#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedPassage {
    pub text: String,
}

#[async_trait]
pub trait Retriever: Send + Sync {
    /// Top-K passages for `query`, most similar first.
    async fn retrieve(&self, query: &str) -> Result<Vec<RetrievedPassage>, RetrievalError>;
}

/// Concatenates passage texts, separated by a blank line.
pub fn join_context(passages: &[RetrievedPassage]) -> String {
    passages
        .iter()
        .map(|p| p.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[derive(Serialize)]
struct EmbeddingBody<'a> {
    model: &'a str,
    input: Vec<&'a str>,
    dimensions: usize,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingObject>,
}

#[derive(Deserialize)]
struct EmbeddingObject {
    embedding: Vec<f32>,
}

#[derive(Debug, Clone, Deserialize)]
struct IndexDescription {
    host: String,
    dimension: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryBody<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
    include_values: bool,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<ScoredMatch>,
}

#[derive(Deserialize)]
struct ScoredMatch {
    #[serde(default)]
    score: f32,
    #[serde(default)]
    metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

pub struct PineconeRetriever {
    client: reqwest::Client,
    openai_base_url: String,
    openai_api_key: Option<String>,
    control_url: String,
    pinecone_api_key: Option<String>,
    index_name: Option<String>,
    embedding_model: String,
    embedding_dimension: usize,
    top_k: usize,
    index: OnceCell<IndexDescription>,
}

impl PineconeRetriever {
    pub fn from_config(config: &Config, client: reqwest::Client) -> Self {
        Self {
            client,
            openai_base_url: config.openai_base_url.clone(),
            openai_api_key: config.openai_api_key.clone(),
            control_url: config.pinecone_control_url.clone(),
            pinecone_api_key: config.pinecone_api_key.clone(),
            index_name: config.pinecone_index_name.clone(),
            embedding_model: config.embedding_model.clone(),
            embedding_dimension: config.embedding_dimension,
            top_k: config.top_k,
            index: OnceCell::new(),
        }
    }

    fn pinecone_key(&self) -> Result<&str, RetrievalError> {
        self.pinecone_api_key
            .as_deref()
            .ok_or_else(|| RetrievalError::Config("PINECONE_API_KEY is not set".into()))
    }

    async fn describe_index(&self) -> Result<&IndexDescription, RetrievalError> {
        self.index
            .get_or_try_init(|| async {
                let name = self.index_name.as_deref().ok_or_else(|| {
                    RetrievalError::Config("PINECONE_INDEX_NAME is not set".into())
                })?;
                let url = format!("{}/indexes/{}", self.control_url, name);
                let resp = self
                    .client
                    .get(&url)
                    .header("Api-Key", self.pinecone_key()?)
                    .header("X-Pinecone-API-Version", PINECONE_API_VERSION)
                    .send()
                    .await?;
                let description: IndexDescription = read_json(resp, "pinecone describe_index").await?;
                tracing::info!(
                    index = name,
                    host = %description.host,
                    dimension = description.dimension,
                    "connected to vector index"
                );
                Ok::<_, RetrievalError>(description)
            })
            .await
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, RetrievalError> {
        let api_key = self
            .openai_api_key
            .as_deref()
            .ok_or_else(|| RetrievalError::Config("OPENAI_API_KEY is not set".into()))?;

        let resp = self
            .client
            .post(format!("{}/embeddings", self.openai_base_url))
            .bearer_auth(api_key)
            .json(&EmbeddingBody {
                model: &self.embedding_model,
                input: vec![text],
                dimensions: self.embedding_dimension,
            })
            .send()
            .await?;
        let body: EmbeddingResponse = read_json(resp, "openai embeddings").await?;

        body.data
            .into_iter()
            .next()
            .map(|item| item.embedding)
            .ok_or_else(|| RetrievalError::Config("embedding response contained no vectors".into()))
    }
}

#[async_trait]
impl Retriever for PineconeRetriever {
    async fn retrieve(&self, query: &str) -> Result<Vec<RetrievedPassage>, RetrievalError> {
        let index = self.describe_index().await?;
        if index.dimension != self.embedding_dimension {
            tracing::error!(
                model = %self.embedding_model,
                configured = self.embedding_dimension,
                index = index.dimension,
                "embedding model and vector index disagree on dimension"
            );
            return Err(RetrievalError::DimensionMismatch {
                got: self.embedding_dimension,
                expected: index.dimension,
            });
        }

        let vector = self.embed(query).await?;
        if vector.len() != index.dimension {
            return Err(RetrievalError::DimensionMismatch {
                got: vector.len(),
                expected: index.dimension,
            });
        }

        tracing::debug!(top_k = self.top_k, "querying vector index");
        let resp = self
            .client
            .post(format!("https://{}/query", index.host))
            .header("Api-Key", self.pinecone_key()?)
            .header("X-Pinecone-API-Version", PINECONE_API_VERSION)
            .json(&QueryBody {
                vector: &vector,
                top_k: self.top_k,
                include_metadata: true,
                include_values: false,
            })
            .send()
            .await?;
        let body: QueryResponse = read_json(resp, "pinecone query").await?;

        Ok(passages_by_score(body.matches))
    }
}

/// Extracts passage text in descending score order, skipping matches without text.
fn passages_by_score(mut matches: Vec<ScoredMatch>) -> Vec<RetrievedPassage> {
    matches.sort_by(|a, b| b.score.total_cmp(&a.score));
    matches
        .into_iter()
        .filter_map(|m| {
            m.metadata?
                .get(TEXT_METADATA_KEY)?
                .as_str()
                .map(|text| RetrievedPassage {
                    text: text.to_string(),
                })
        })
        .collect()
}

async fn read_json<T: for<'de> Deserialize<'de>>(
    resp: reqwest::Response,
    service: &'static str,
) -> Result<T, RetrievalError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(RetrievalError::Status {
            service,
            status: status.as_u16(),
            body,
        });
    }
    Ok(resp.json::<T>().await?)
}
