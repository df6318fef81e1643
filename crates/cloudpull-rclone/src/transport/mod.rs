//! Remote-control transport used to talk to a running `rclone rcd`.

#[cfg(test)]
pub(crate) mod stub;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use crate::error::RcloneError;

/// Abstraction over the RC API so the engine can be exercised without a daemon.
#[async_trait]
pub trait RcTransport: Send + Sync {
    /// Invoke `method` with a JSON body and return the decoded JSON response.
    async fn call(&self, method: &str, body: Value) -> Result<Value, RcloneError>;
}

/// RC transport posting JSON over HTTP.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    /// Build a transport targeting `base_url` (e.g. `http://127.0.0.1:5572`).
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, RcloneError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| RcloneError::Transport {
                method: "client".to_string(),
                source,
            })?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Base URL requests are posted to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl RcTransport for HttpTransport {
    async fn call(&self, method: &str, body: Value) -> Result<Value, RcloneError> {
        let url = format!("{}/{method}", self.base_url);
        debug!(method, "rclone rc call");
        let response = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|source| RcloneError::Transport {
                method: method.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(RcloneError::Rejected {
                method: method.to_string(),
                status: status.as_u16(),
                message: rc_error_message(&text),
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|source| RcloneError::Transport {
                method: method.to_string(),
                source,
            })
    }
}

/// rclone reports failures as `{"error": "...", "status": 500, ...}`; fall back to the raw body.
fn rc_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| value.get("error").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}
