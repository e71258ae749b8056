//! OpenAI-compatible chat-completions client.

use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use tracing::debug;

use crate::chat::{ChatRequest, ChatResponse};
use crate::error::OracleError;
use crate::ChatCompletion;

/// Connection and model settings for the oracle.
#[derive(Clone)]
pub struct OracleSettings {
    /// Base URL; `/chat/completions` is appended.
    pub endpoint: String,
    pub api_key: Option<String>,
    pub inference_model: String,
    pub synthesis_model: String,
    /// Whole-call budget.
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

impl OracleSettings {
    pub const DEFAULT_ENDPOINT: &'static str = "https://api.openai.com/v1";
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
    pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

    pub fn openai(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            ..Default::default()
        }
    }

    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.endpoint.trim_end_matches('/'))
    }
}

impl Default for OracleSettings {
    fn default() -> Self {
        Self {
            endpoint: Self::DEFAULT_ENDPOINT.to_string(),
            api_key: None,
            inference_model: "gpt-3.5-turbo".to_string(),
            synthesis_model: "gpt-4".to_string(),
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(Self::DEFAULT_CONNECT_TIMEOUT_SECS),
        }
    }
}

impl fmt::Debug for OracleSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OracleSettings")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "***redacted***"))
            .field("inference_model", &self.inference_model)
            .field("synthesis_model", &self.synthesis_model)
            .field("timeout", &self.timeout)
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

/// Chat-completions client over a blocking `ureq` agent.
#[derive(Clone)]
pub struct OpenAiClient {
    url: String,
    api_key: Option<String>,
    timeout: Duration,
    agent: ureq::Agent,
}

impl OpenAiClient {
    pub fn new(settings: &OracleSettings) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(settings.timeout)
            .timeout_connect(settings.connect_timeout)
            .build();
        Self {
            url: settings.completions_url(),
            api_key: settings.api_key.clone(),
            timeout: settings.timeout,
            agent,
        }
    }

    fn post_blocking(
        agent: &ureq::Agent,
        url: &str,
        api_key: Option<&str>,
        request: &ChatRequest,
    ) -> Result<ChatResponse, OracleError> {
        let mut call = agent.post(url).set("Content-Type", "application/json");
        if let Some(key) = api_key {
            call = call.set("Authorization", &format!("Bearer {}", key));
        }

        match call.send_json(request) {
            Ok(resp) => resp
                .into_json::<ChatResponse>()
                .map_err(|e| OracleError::Malformed(e.to_string())),
            Err(ureq::Error::Status(status, resp)) => {
                let body = resp.into_string().unwrap_or_default();
                Err(OracleError::Status { status, body })
            }
            Err(ureq::Error::Transport(t)) => Err(OracleError::Unavailable(t.to_string())),
        }
    }
}

#[async_trait]
impl ChatCompletion for OpenAiClient {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, OracleError> {
        debug!(
            url = %self.url,
            model = %request.model,
            messages = request.messages.len(),
            "sending chat completion request"
        );

        let agent = self.agent.clone();
        let url = self.url.clone();
        let api_key = self.api_key.clone();
        let request = request.clone();
        let call = tokio::task::spawn_blocking(move || {
            Self::post_blocking(&agent, &url, api_key.as_deref(), &request)
        });

        // The agent enforces the budget per request; this bounds the task too.
        match tokio::time::timeout(self.timeout + Duration::from_secs(1), call).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => Err(OracleError::Unavailable(format!(
                "oracle request task failed: {}",
                join_err
            ))),
            Err(_) => Err(OracleError::Unavailable(format!(
                "no response within {}s",
                self.timeout.as_secs()
            ))),
        }
    }
}
