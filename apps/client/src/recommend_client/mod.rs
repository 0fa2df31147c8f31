/// Recommend client — the only code that talks HTTP to the recommendation service.
///
/// The orchestrator depends on the `RecommendTransport` trait, not on this
/// concrete client, so tests can script responses without a network.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::ClientError;
use crate::models::health::HealthStatus;
use crate::models::recommendation::RecommendationResult;
use crate::query::Query;

const RECOMMEND_PATH: &str = "recommend";

/// Anything that can turn a `Query` into a result table.
#[async_trait]
pub trait RecommendTransport: Send + Sync {
    async fn recommend(&self, query: &Query) -> Result<RecommendationResult, ClientError>;
}

/// Error body the service sends with a non-success status. `detail` is only
/// used when it is a plain string.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    detail: Option<Value>,
}

fn error_detail(body: &str) -> Option<String> {
    match serde_json::from_str::<ErrorBody>(body).ok()?.detail? {
        Value::String(s) => Some(s),
        other => {
            debug!("Ignoring non-string error detail: {other}");
            None
        }
    }
}

/// HTTP transport over `reqwest`, bound to one service origin.
#[derive(Clone)]
pub struct RecommendClient {
    client: Client,
    base: Url,
}

impl RecommendClient {
    pub fn new(api_base: &str, timeout: Duration) -> Result<Self, ClientError> {
        // A trailing slash makes `join` append instead of replacing the last segment
        let normalized = format!("{}/", api_base.trim_end_matches('/'));
        let base = Url::parse(&normalized)
            .map_err(|e| ClientError::InvalidBaseUrl(format!("{api_base}: {e}")))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(ClientError::InvalidBaseUrl(format!(
                "{api_base}: scheme must be http or https"
            )));
        }

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self { client, base })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        self.base
            .join(path)
            .map_err(|e| ClientError::InvalidBaseUrl(format!("{}: {e}", self.base)))
    }

    /// GET on the service root. Used by the `health` command only.
    pub async fn health(&self) -> Result<HealthStatus, ClientError> {
        let response = self.client.get(self.base.clone()).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ClientError::Api {
                status: status.as_u16(),
                message: error_detail(&body),
            });
        }

        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl RecommendTransport for RecommendClient {
    /// Single POST, no retry.
    async fn recommend(&self, query: &Query) -> Result<RecommendationResult, ClientError> {
        let url = self.endpoint(RECOMMEND_PATH)?;
        debug!("POST {url} top_k={}", query.top_k);

        let response = self
            .client
            .post(url)
            .json(query)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            warn!("Recommendation service returned {status}");
            return Err(ClientError::Api {
                status: status.as_u16(),
                message: error_detail(&body),
            });
        }

        let result: RecommendationResult = serde_json::from_str(&body)?;
        debug!("Received {} rows", result.rows.len());

        Ok(result)
    }
}
