//! REST API client for the Shopware Admin endpoints.
//!
//! Resource paths follow the Admin API convention: `POST /{resource}`
//! to create, `GET /{resource}/{id}` to read, `POST /search/{resource}`
//! for filtered lookup. Errors carry the HTTP status and raw body so
//! callers can distinguish conflicts, missing records, and transient
//! outages.

use serde::Deserialize;

/// HTTP client for one destination store.
pub struct ShopwareApi {
    client: reqwest::Client,
    base_url: String,
    access_token: String,
}

/// The identifier a successful create or lookup resolved to.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedResource {
    pub id: String,
}

/// Errors from the Shopware REST layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The API returned a non-2xx status code.
    #[error("Shopware API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// A create/lookup response carried no recognizable identifier.
    #[error("Shopware response for {resource} contained no id")]
    MissingId { resource: String },
}

impl ApiError {
    /// The destination reported the record already exists.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Api { status, .. } if *status == 409 || *status == 400 && self.body_mentions_duplicate())
    }

    /// The requested resource does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Api { status, .. } if *status == 404)
    }

    /// Worth retrying: server-side failures, throttling, and transport
    /// errors.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Request(e) => e.is_timeout() || e.is_connect(),
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            Self::MissingId { .. } => false,
        }
    }

    fn body_mentions_duplicate(&self) -> bool {
        match self {
            Self::Api { body, .. } => {
                body.contains("CONTENT__DUPLICATE") || body.contains("already exists")
            }
            _ => false,
        }
    }
}

impl ShopwareApi {
    /// Create a new API client.
    ///
    /// * `base_url` - Admin API root, e.g. `https://shop.example/api`.
    /// * `access_token` - OAuth bearer token (acquisition is handled by
    ///   the caller's auth layer).
    pub fn new(base_url: String, access_token: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            access_token,
        }
    }

    /// Create an API client reusing an existing [`reqwest::Client`]
    /// (useful for connection pooling across concurrent batches).
    pub fn with_client(client: reqwest::Client, base_url: String, access_token: String) -> Self {
        Self {
            client,
            base_url,
            access_token,
        }
    }

    /// Fetch a single resource. Returns `None` on 404.
    pub async fn get(
        &self,
        resource: &str,
        id: &str,
    ) -> Result<Option<serde_json::Value>, ApiError> {
        let response = self
            .client
            .get(format!("{}/{resource}/{id}", self.base_url))
            .bearer_auth(&self.access_token)
            .send()
            .await?;

        if response.status().as_u16() == 404 {
            return Ok(None);
        }
        Self::parse_response(response).await.map(Some)
    }

    /// Create a resource. Returns the response body (the Admin API
    /// echoes the created record for `_response=detail` requests).
    pub async fn post(
        &self,
        resource: &str,
        payload: &serde_json::Value,
    ) -> Result<serde_json::Value, ApiError> {
        let response = self
            .client
            .post(format!("{}/{resource}", self.base_url))
            .query(&[("_response", "detail")])
            .bearer_auth(&self.access_token)
            .json(payload)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Replace a resource.
    pub async fn put(
        &self,
        resource: &str,
        id: &str,
        payload: &serde_json::Value,
    ) -> Result<serde_json::Value, ApiError> {
        let response = self
            .client
            .put(format!("{}/{resource}/{id}", self.base_url))
            .query(&[("_response", "detail")])
            .bearer_auth(&self.access_token)
            .json(payload)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Delete a resource.
    pub async fn delete(&self, resource: &str, id: &str) -> Result<(), ApiError> {
        let response = self
            .client
            .delete(format!("{}/{resource}/{id}", self.base_url))
            .bearer_auth(&self.access_token)
            .send()
            .await?;

        Self::check_status(response).await
    }

    /// Delete many resources through the sync endpoint.
    pub async fn batch_delete(&self, resource: &str, ids: &[String]) -> Result<(), ApiError> {
        let payload: Vec<serde_json::Value> =
            ids.iter().map(|id| serde_json::json!({ "id": id })).collect();
        let body = serde_json::json!({
            "delete-batch": {
                "entity": resource,
                "action": "delete",
                "payload": payload,
            }
        });

        let response = self
            .client
            .post(format!("{}/_action/sync", self.base_url))
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await?;

        Self::check_status(response).await
    }

    /// Look up a resource by a single field equality filter. Returns
    /// the first match, if any.
    pub async fn find_by(
        &self,
        resource: &str,
        field: &str,
        value: &str,
    ) -> Result<Option<serde_json::Value>, ApiError> {
        let body = serde_json::json!({
            "filter": [{ "type": "equals", "field": field, "value": value }],
            "limit": 1,
        });

        let response = self
            .client
            .post(format!("{}/search/{resource}", self.base_url))
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await?;

        let result = Self::parse_response(response).await?;
        Ok(result
            .get("data")
            .and_then(|d| d.as_array())
            .and_then(|a| a.first())
            .cloned())
    }

    /// Create a resource, falling back to a field lookup when the
    /// destination reports it already exists.
    ///
    /// This is the idempotent-create primitive the migration engine
    /// uses: at most one create reaches the destination per record, and
    /// re-running a create converges on the existing record's id.
    pub async fn create_or_find(
        &self,
        resource: &str,
        payload: &serde_json::Value,
        lookup_key: &str,
        lookup_value: &str,
    ) -> Result<CreatedResource, ApiError> {
        match self.post(resource, payload).await {
            Ok(body) => Self::extract_id(resource, &body),
            Err(err) if err.is_conflict() => {
                tracing::debug!(
                    resource,
                    lookup_key,
                    lookup_value,
                    "Create conflicted, falling back to lookup",
                );
                let found = self.find_by(resource, lookup_key, lookup_value).await?;
                match found {
                    Some(record) => Self::extract_id(resource, &record),
                    None => Err(err),
                }
            }
            Err(err) => Err(err),
        }
    }

    /// The destination record's modification timestamp, if the record
    /// exists. Used for conflict detection in delta mode.
    pub async fn modified_at(
        &self,
        resource: &str,
        id: &str,
    ) -> Result<Option<chrono::DateTime<chrono::Utc>>, ApiError> {
        let Some(record) = self.get(resource, id).await? else {
            return Ok(None);
        };
        let data = record.get("data").unwrap_or(&record);
        let raw = data
            .get("updatedAt")
            .or_else(|| data.get("createdAt"))
            .and_then(|v| v.as_str());
        Ok(raw
            .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&chrono::Utc)))
    }

    // ---- private helpers ----

    /// Pull the record id out of a create/search response body.
    fn extract_id(resource: &str, body: &serde_json::Value) -> Result<CreatedResource, ApiError> {
        let id = body
            .get("data")
            .and_then(|d| d.get("id"))
            .or_else(|| body.get("id"))
            .and_then(|v| v.as_str());
        match id {
            Some(id) => Ok(CreatedResource { id: id.to_string() }),
            None => Err(ApiError::MissingId {
                resource: resource.to_string(),
            }),
        }
    }

    /// Ensure a success status, discarding the body.
    async fn check_status(response: reqwest::Response) -> Result<(), ApiError> {
        Self::ensure_success(response).await?;
        Ok(())
    }

    /// Ensure a success status and decode the JSON body.
    async fn parse_response(response: reqwest::Response) -> Result<serde_json::Value, ApiError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json().await?)
    }

    /// Return the response unchanged on success, or an
    /// [`ApiError::Api`] containing the status and body on failure.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ApiError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}
