//! ShopifyTransport - Admin API 上の BulkTransport
//!
//! # エンドポイント
//! - GraphQL: `https://{shop}/admin/api/{version}/graphql.json`
//!   - `bulkOperationRunQuery`（submit）
//!   - `currentBulkOperation`（status）
//! - REST: `webhooks.json`（完了 webhook の登録）
//! - 結果ファイル: 署名付き URL への GET（トークンは付けない）

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use super::webhooks::{NewWebhook, WebhookPlan, WebhookSubscription, plan_webhook};
use crate::domain::{BulkOperationStatus, BulkQuery, SubmitResponse, TenantId, TransportError};
use crate::ports::{BulkTransport, ByteStream};

const ACCESS_TOKEN_HEADER: &str = "X-Shopify-Access-Token";

const RUN_QUERY_MUTATION: &str = r#"
mutation RunBulkQuery($query: String!) {
  bulkOperationRunQuery(query: $query) {
    bulkOperation {
      id
      status
    }
    userErrors {
      field
      message
    }
  }
}
"#;

const CURRENT_OPERATION_QUERY: &str = r#"
{
  currentBulkOperation {
    id
    status
    errorCode
    createdAt
    completedAt
    objectCount
    fileSize
    url
    partialDataUrl
  }
}
"#;

/// Connection settings for one store.
#[derive(Debug, Clone, Deserialize)]
pub struct ShopifyConfig {
    pub shop: TenantId,
    pub access_token: SecretString,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    /// Applies to API calls; result downloads are only bounded by the
    /// connect timeout since they can be large.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

pub const DEFAULT_API_VERSION: &str = "2024-10";

fn default_api_version() -> String {
    DEFAULT_API_VERSION.to_string()
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

impl ShopifyConfig {
    pub fn new(shop: TenantId, access_token: SecretString) -> Self {
        Self {
            shop,
            access_token,
            api_version: default_api_version(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }

    pub fn graphql_url(&self) -> String {
        format!(
            "https://{}/admin/api/{}/graphql.json",
            self.shop, self.api_version
        )
    }

    pub fn rest_url(&self, path: &str) -> String {
        format!("https://{}/admin/api/{}/{}", self.shop, self.api_version, path)
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[derive(Debug, Deserialize)]
struct GraphQlEnvelope<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlMessage>,
}

#[derive(Debug, Deserialize)]
struct GraphQlMessage {
    message: String,
}

impl<T> GraphQlEnvelope<T> {
    fn into_data(self) -> Result<T, TransportError> {
        if !self.errors.is_empty() {
            let messages: Vec<String> = self.errors.into_iter().map(|e| e.message).collect();
            return Err(TransportError::GraphQl(messages.join("; ")));
        }
        self.data
            .ok_or_else(|| TransportError::Decode("graphql reply without data".to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct RunQueryData {
    #[serde(rename = "bulkOperationRunQuery")]
    run: Option<SubmitResponse>,
}

#[derive(Debug, Deserialize)]
struct CurrentOperationData {
    #[serde(rename = "currentBulkOperation")]
    current: Option<BulkOperationStatus>,
}

#[derive(Debug, Deserialize)]
struct WebhookList {
    webhooks: Vec<WebhookSubscription>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WebhookEnvelope<T> {
    webhook: T,
}

/// Admin API client for one store.
#[derive(Clone)]
pub struct ShopifyTransport {
    http: reqwest::Client,
    config: ShopifyConfig,
}

impl ShopifyTransport {
    pub fn new(config: ShopifyConfig) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ShopifyConfig {
        &self.config
    }

    async fn graphql<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<T, TransportError> {
        let response = self
            .http
            .post(self.config.graphql_url())
            .header(ACCESS_TOKEN_HEADER, self.config.access_token.expose_secret())
            .timeout(self.config.request_timeout())
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await?;
        let envelope: GraphQlEnvelope<T> = ensure_success(response).await?.json().await?;
        envelope.into_data()
    }

    fn rest(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, self.config.rest_url(path))
            .header(ACCESS_TOKEN_HEADER, self.config.access_token.expose_secret())
            .timeout(self.config.request_timeout())
    }

    pub async fn list_webhooks(&self, topic: &str) -> Result<Vec<WebhookSubscription>, TransportError> {
        let response = self
            .rest(reqwest::Method::GET, "webhooks.json")
            .query(&[("topic", topic)])
            .send()
            .await?;
        let list: WebhookList = ensure_success(response).await?.json().await?;
        Ok(list.webhooks)
    }

    pub async fn delete_webhook(&self, id: u64) -> Result<(), TransportError> {
        let response = self
            .rest(reqwest::Method::DELETE, &format!("webhooks/{id}.json"))
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }

    pub async fn create_webhook(
        &self,
        topic: &str,
        address: &str,
    ) -> Result<WebhookSubscription, TransportError> {
        let body = WebhookEnvelope {
            webhook: NewWebhook {
                topic,
                address,
                format: "json",
            },
        };
        let response = self
            .rest(reqwest::Method::POST, "webhooks.json")
            .json(&body)
            .send()
            .await?;
        let created: WebhookEnvelope<WebhookSubscription> =
            ensure_success(response).await?.json().await?;
        Ok(created.webhook)
    }

    /// Make sure `topic` is delivered to `address`, replacing subscriptions
    /// for the topic that point elsewhere.
    pub async fn ensure_webhook(
        &self,
        topic: &str,
        address: &str,
    ) -> Result<WebhookSubscription, TransportError> {
        let existing = self.list_webhooks(topic).await?;
        match plan_webhook(&existing, topic, address) {
            WebhookPlan::Keep { id } => {
                debug!(shop = %self.config.shop, topic, id, "webhook already registered");
                existing
                    .into_iter()
                    .find(|w| w.id == id)
                    .ok_or_else(|| TransportError::Decode(format!("webhook {id} vanished")))
            }
            WebhookPlan::Create => self.create_webhook(topic, address).await,
            WebhookPlan::Replace { remove } => {
                for id in remove {
                    self.delete_webhook(id).await?;
                    info!(shop = %self.config.shop, topic, id, "removed stale webhook");
                }
                self.create_webhook(topic, address).await
            }
        }
    }
}

async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, TransportError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(TransportError::Status {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl BulkTransport for ShopifyTransport {
    async fn submit(&self, query: &BulkQuery) -> Result<SubmitResponse, TransportError> {
        let data: RunQueryData = self
            .graphql(RUN_QUERY_MUTATION, json!({ "query": query.as_str() }))
            .await?;
        data.run
            .ok_or_else(|| TransportError::Decode("bulkOperationRunQuery returned null".to_string()))
    }

    async fn current_status(&self) -> Result<Option<BulkOperationStatus>, TransportError> {
        let data: CurrentOperationData = self.graphql(CURRENT_OPERATION_QUERY, json!({})).await?;
        Ok(data.current)
    }

    async fn download(&self, url: &str) -> Result<ByteStream, TransportError> {
        let response = self.http.get(url).send().await?;
        let response = ensure_success(response).await?;
        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map_err(TransportError::from))
            .boxed())
    }
}
