//! Ranking oracle: free-text prompt in, free-text answer out.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use orgscout_shared::{OrgScoutError, RankingConfig, Result, validate_api_key};

/// An external judge that answers ranking prompts.
#[async_trait]
pub trait RankingOracle: Send + Sync {
    async fn rank(&self, prompt: &str) -> Result<String>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// [`RankingOracle`] backed by an OpenAI-compatible `/chat/completions` API.
#[derive(Debug, Clone)]
pub struct ChatCompletionsOracle {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl ChatCompletionsOracle {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| OrgScoutError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
        })
    }

    /// Build from config, reading the key from its env var.
    pub fn from_config(config: &RankingConfig, timeout: Duration) -> Result<Self> {
        let api_key = validate_api_key(&config.api_key_env)?;
        Self::new(&config.base_url, api_key, &config.model, timeout)
    }
}

#[async_trait]
impl RankingOracle for ChatCompletionsOracle {
    async fn rank(&self, prompt: &str) -> Result<String> {
        let start = Instant::now();
        let request = ChatRequest {
            model: &self.model,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
            temperature: 0.0,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "ranking request failed");
                OrgScoutError::Oracle(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OrgScoutError::Oracle(format!("HTTP {status}: {body}")));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| OrgScoutError::parse(format!("chat completion response: {e}")))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| OrgScoutError::Oracle("no choices in response".into()))?;

        debug!(
            model = %self.model,
            duration_ms = start.elapsed().as_millis() as u64,
            "ranking completion"
        );
        Ok(content)
    }
}
