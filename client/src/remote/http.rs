//! HTTP adapter for the hosted function server.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use consume_common::chat::ConversationId;
use consume_common::identity::UserId;
use consume_common::resource::Resource;

use super::{RemoteStore, Watermarks};
use crate::config::ClientConfig;
use crate::error::{ClientError, Result};

// ─── Wire types ──────────────────────────────────────────────────────────────

/// Every response body: `{ success, data?, error? }`.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    success: bool,
    data: Option<T>,
    error: Option<String>,
}

impl<T> Envelope<T> {
    fn into_result(self, status: StatusCode) -> Result<Option<T>> {
        if !status.is_success() || !self.success {
            let reason = self.error.unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            });
            return Err(ClientError::rejected(Some(status.as_u16()), reason));
        }
        Ok(self.data)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WatermarkBody<'a> {
    user_id: &'a UserId,
    conversation_id: &'a ConversationId,
    timestamp: DateTime<Utc>,
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// [`RemoteStore`] over the function server's REST routes.
pub struct HttpStore {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpStore {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        config.validate()?;
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ClientError::Config(format!("http client: {e}")))?;
        Ok(Self {
            client,
            base_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    async fn call<T: DeserializeOwned>(
        &self,
        what: &str,
        request: RequestBuilder,
    ) -> Result<Option<T>> {
        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(|e| ClientError::NetworkFailure(e.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ClientError::NetworkFailure(e.to_string()))?;
        tracing::trace!("{what}: {status} ({} bytes)", body.len());
        decode_envelope(what, status, &body)
    }

    async fn call_required<T: DeserializeOwned>(
        &self,
        what: &str,
        request: RequestBuilder,
    ) -> Result<T> {
        self.call(what, request)
            .await?
            .ok_or_else(|| ClientError::rejected(None, format!("no data in {what} response")))
    }
}

fn decode_envelope<T: DeserializeOwned>(
    what: &str,
    status: StatusCode,
    body: &str,
) -> Result<Option<T>> {
    match serde_json::from_str::<Envelope<T>>(body) {
        Ok(envelope) => envelope.into_result(status),
        Err(_) if !status.is_success() => {
            let reason = if body.trim().is_empty() {
                status.canonical_reason().unwrap_or("request failed").to_string()
            } else {
                body.trim().to_string()
            };
            Err(ClientError::rejected(Some(status.as_u16()), reason))
        }
        Err(e) => Err(ClientError::decode(what, e)),
    }
}

#[async_trait]
impl RemoteStore for HttpStore {
    async fn list(&self, resource: Resource, scope: Option<&str>) -> Result<Vec<Value>> {
        let mut request = self.client.get(self.url(resource.as_str()));
        if let Some(scope) = scope {
            request = request.query(&[("scope", scope)]);
        }
        let records: Option<Vec<Value>> = self.call(resource.as_str(), request).await?;
        Ok(records.unwrap_or_default())
    }

    async fn create(&self, resource: Resource, record: Value) -> Result<Value> {
        let request = self.client.post(self.url(resource.as_str())).json(&record);
        self.call_required(resource.as_str(), request).await
    }

    async fn update(&self, resource: Resource, id: &str, patch: Value) -> Result<Value> {
        let request = self
            .client
            .put(self.url(&format!("{resource}/{id}")))
            .json(&patch);
        self.call_required(resource.as_str(), request).await
    }

    async fn delete(&self, resource: Resource, id: &str) -> Result<()> {
        let request = self.client.delete(self.url(&format!("{resource}/{id}")));
        self.call::<Value>(resource.as_str(), request).await?;
        Ok(())
    }

    async fn get_watermarks(&self, user: &UserId) -> Result<Watermarks> {
        let request = self.client.get(self.url(&format!("last-seen/{user}")));
        let marks: Option<Watermarks> = self.call("last-seen", request).await?;
        Ok(marks.unwrap_or_default())
    }

    async fn set_watermark(
        &self,
        user: &UserId,
        conversation: &ConversationId,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let body = WatermarkBody {
            user_id: user,
            conversation_id: conversation,
            timestamp: at,
        };
        let request = self.client.post(self.url("last-seen")).json(&body);
        self.call::<Value>("last-seen", request).await?;
        Ok(())
    }
}
