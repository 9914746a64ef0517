// Slack Web API client — bearer-token GETs against https://slack.com/api.
//
// Slack reports most failures as HTTP 200 with `{"ok": false, "error": ...}`,
// so every response is checked for the `ok` flag before it is deserialized
// into the method's payload type.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use super::error::SlackError;
use super::traits::SlackApi;
use super::types::{HistoryPage, HistoryRequest, TeamInfoResponse};

/// Default Slack Web API endpoint.
pub const DEFAULT_SLACK_API_URL: &str = "https://slack.com/api";

/// Thin reqwest wrapper with a generic Web API GET helper.
pub struct SlackClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl SlackClient {
    /// Create a client for the given base URL and API token.
    pub fn new(base_url: &str, token: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("slack-bestof/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    /// Call a Web API method and deserialize the response.
    ///
    /// `method` is the Slack method name (e.g. "conversations.history").
    pub async fn api_get<T: DeserializeOwned>(
        &self,
        method: &str,
        params: &[(&str, &str)],
    ) -> Result<T> {
        let url = format!("{}/{}", self.base_url, method);

        debug!(method = method, "Slack API request");

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .query(params)
            .send()
            .await
            .with_context(|| format!("Slack request failed: {method}"))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok());
            return Err(SlackError::RateLimited {
                method: method.to_string(),
                retry_after,
            }
            .into());
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Slack {method} returned {status}: {body}");
        }

        let body: Value = response
            .json()
            .await
            .with_context(|| format!("Failed to read {method} response"))?;

        parse_response(method, body)
    }
}

/// Check Slack's `ok` envelope and deserialize the payload.
pub fn parse_response<T: DeserializeOwned>(method: &str, body: Value) -> Result<T> {
    if body.get("ok").and_then(Value::as_bool) != Some(true) {
        let error = body
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("unknown_error")
            .to_string();
        if error == "ratelimited" {
            return Err(SlackError::RateLimited {
                method: method.to_string(),
                retry_after: None,
            }
            .into());
        }
        return Err(SlackError::Api {
            method: method.to_string(),
            error,
        }
        .into());
    }

    serde_json::from_value(body).with_context(|| format!("Failed to deserialize {method} response"))
}

#[async_trait]
impl SlackApi for SlackClient {
    async fn history(&self, request: &HistoryRequest) -> Result<HistoryPage> {
        let limit = request.limit.to_string();
        let mut params: Vec<(&str, &str)> = vec![
            ("channel", request.channel.as_str()),
            ("oldest", request.oldest.as_str()),
            ("limit", limit.as_str()),
        ];
        if let Some(ref latest) = request.latest {
            params.push(("latest", latest.as_str()));
        }

        self.api_get("conversations.history", &params).await
    }

    async fn team_domain(&self) -> Result<String> {
        let resp: TeamInfoResponse = self
            .api_get("team.info", &[])
            .await
            .context("Failed to look up Slack team info")?;
        Ok(resp.team.domain)
    }
}
