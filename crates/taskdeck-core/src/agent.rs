use std::time::Duration;

use crate::config::AgentConfig;
use crate::error::{Result, TaskdeckError};
use crate::model::ChatMessage;

/// System instruction sent with every agent call.
const AGENT_INSTRUCTIONS: &str = "You are a helpful assistant for a task and project \
    manager. Use normal text for normal content, but format tables, bold, and other \
    rich content as Markdown. Be concise but informative. If you're unsure about \
    something, say so.";

/// Client for the external chat agent, reached over an OpenAI-style
/// chat-completions endpoint. One outbound call per user message, no
/// retries.
pub struct AgentService {
    endpoint: String,
    api_key: String,
    model: String,
    max_tokens: usize,
    client: reqwest::Client,
}

impl std::fmt::Debug for AgentService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentService")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .finish()
    }
}

impl AgentService {
    /// Create an agent service from configuration. Fails when the
    /// endpoint is missing or no API key can be resolved.
    pub fn from_config(config: &AgentConfig) -> Result<Self> {
        let endpoint = config.resolve_endpoint().ok_or_else(|| {
            TaskdeckError::Config(
                "agent endpoint not configured (set agent.endpoint or TASKDECK_AGENT_ENDPOINT)"
                    .into(),
            )
        })?;
        let api_key = config.resolve_api_key()?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| TaskdeckError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            client,
        })
    }

    /// Ask the agent for a reply to `message`, with the prior
    /// conversation passed as context in order.
    pub async fn reply(&self, history: &[ChatMessage], message: &str) -> Result<String> {
        let url = format!("{}/v1/chat/completions", self.endpoint);

        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(serde_json::json!({
            "role": "system",
            "content": AGENT_INSTRUCTIONS,
        }));
        for m in history {
            messages.push(serde_json::json!({
                "role": if m.is_bot { "assistant" } else { "user" },
                "content": m.message,
            }));
        }
        messages.push(serde_json::json!({"role": "user", "content": message}));

        let body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "max_tokens": self.max_tokens,
        });

        let resp = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| TaskdeckError::Agent(format!("agent request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(TaskdeckError::Agent(format!("agent error {status}: {text}")));
        }

        let json: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| TaskdeckError::Agent(format!("agent response parse error: {e}")))?;

        json["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| TaskdeckError::Agent("agent response missing content".into()))
    }
}
