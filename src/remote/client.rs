use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};
use reqwest::header::CONTENT_TYPE;
use tracing::debug;
use url::Url;

use super::protocol::{Envelope, Request};
use super::{RemoteError, RemoteStore};
use crate::config::ApiConfig;

/// HTTP client for the spreadsheet web app.
///
/// One POST per call, no retries and no timeout beyond reqwest's defaults.
#[derive(Clone)]
pub struct HttpRemote {
  client: reqwest::Client,
  endpoint: Option<Url>,
}

impl HttpRemote {
  pub fn new(config: &ApiConfig) -> Result<Self> {
    let endpoint = match config.url.as_deref().map(str::trim) {
      Some(url) if !url.is_empty() => {
        Some(Url::parse(url).map_err(|e| eyre!("Invalid API url {}: {}", url, e))?)
      }
      _ => None,
    };

    let client = reqwest::Client::builder()
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self { client, endpoint })
  }

  pub fn is_configured(&self) -> bool {
    self.endpoint.is_some()
  }
}

#[async_trait]
impl RemoteStore for HttpRemote {
  async fn call(&self, request: Request) -> Result<Envelope, RemoteError> {
    let endpoint = self.endpoint.as_ref().ok_or(RemoteError::Unavailable)?;
    let action = request.action();

    let body =
      serde_json::to_string(&request).map_err(|e| RemoteError::Malformed(e.to_string()))?;

    // text/plain keeps the web app from demanding a CORS preflight
    let response = self
      .client
      .post(endpoint.clone())
      .header(CONTENT_TYPE, "text/plain;charset=utf-8")
      .body(body)
      .send()
      .await?;

    let status = response.status();
    if !status.is_success() {
      debug!(action, status = status.as_u16(), "Remote call failed");
      return Err(RemoteError::Status(status.as_u16()));
    }

    let text = response.text().await?;
    serde_json::from_str(&text).map_err(|e| {
      debug!(action, body = %text, "Remote reply is not JSON");
      RemoteError::Malformed(e.to_string())
    })
  }
}
