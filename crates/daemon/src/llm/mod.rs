use anyhow::{Context, Result};
use serde_json::json;

use crate::config::Config;
use crate::retry::RetryPolicy;

pub mod parse;

/// Minimal chat-completions client.
pub struct ChatClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    retry: RetryPolicy,
}

impl ChatClient {
    pub fn new(http: reqwest::Client, config: &Config) -> Self {
        ChatClient {
            http,
            base_url: config.openai_base_url.trim_end_matches('/').to_string(),
            api_key: config.openai_api_key.clone(),
            model: config.openai_chat_model.clone(),
            retry: config.retry.clone(),
        }
    }

    pub(crate) fn api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("OPENAI_API_KEY environment variable not set"))
    }

    pub(crate) fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn retry(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Sends one system + user exchange and returns the trimmed reply text.
    pub async fn complete(
        &self,
        system: &str,
        user: &str,
        temperature: Option<f64>,
    ) -> Result<String> {
        let api_key = self.api_key()?;
        let mut request_body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user},
            ],
        });
        if let Some(t) = temperature {
            request_body["temperature"] = json!(t);
        }

        self.retry
            .run("chat completion", || async {
                let response = self
                    .http
                    .post(format!("{}/chat/completions", self.base_url))
                    .bearer_auth(api_key)
                    .json(&request_body)
                    .send()
                    .await?;

                let status = response.status();
                if !status.is_success() {
                    let error_text = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "Unknown error".to_string());
                    anyhow::bail!("chat completion returned error {}: {}", status, error_text);
                }

                let body: serde_json::Value = response.json().await?;
                body.pointer("/choices/0/message/content")
                    .and_then(|c| c.as_str())
                    .map(|c| c.trim().to_string())
                    .context("Invalid response format: missing choices[0].message.content")
            })
            .await
    }
}
