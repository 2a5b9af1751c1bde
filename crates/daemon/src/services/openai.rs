use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use engine::audio::Theme;

use crate::llm::parse::{parse_theme, parse_with, KEYWORD_STRATEGIES, SCRIPT_STRATEGIES};
use crate::llm::ChatClient;
use crate::media::ffmpeg::FFmpegWrapper;
use crate::services::{KeywordService, Narration, ScriptWriter, SpeechSynthesizer, ThemeClassifier};

const TTS_MODEL: &str = "tts-1";
const TTS_VOICE: &str = "alloy";

const KEYWORD_SYSTEM_PROMPT: &str =
    "You are a helpful assistant that generates specific video search terms.";

const THEME_SYSTEM_PROMPT: &str =
    "You are a theme analyzer that categorizes content into specific emotional themes.";

const SCRIPT_SYSTEM_PROMPT: &str = r#"You are a seasoned content writer for a YouTube Shorts channel, specializing in facts videos.
Your facts shorts are very concise, each lasting around 20 seconds (approximately 50-60 words).
They are incredibly engaging and original. When a user requests a specific type of facts short, you will create it.

Keep it very brief (20 seconds), highly interesting, and unique.

Strictly output the script in a JSON format like below, and only provide a parsable JSON object with the key 'script'.

# Output
{"script": "Here is the script ..."}"#;

/// OpenAI-backed speech, keyword, theme and script collaborators.
pub struct OpenAiServices {
    chat: Arc<ChatClient>,
    http: reqwest::Client,
}

impl OpenAiServices {
    pub fn new(chat: Arc<ChatClient>, http: reqwest::Client) -> Self {
        OpenAiServices { chat, http }
    }
}

fn keyword_prompt(text: &str) -> String {
    format!(
        "Generate 3 specific, visual search terms for video footage that would match this text: '{}'. \
         Format as a JSON array of strings. Example: [\"peaceful nature\", \"flowing water\", \"sunset view\"]",
        text
    )
}

fn theme_prompt(text: &str) -> String {
    let labels: Vec<&str> = Theme::ALL.iter().map(|t| t.as_str()).collect();
    format!(
        "Analyze the following text and determine its emotional theme.\n\
         Choose one of these themes: {}.\n\
         Consider the overall tone, emotional content, and purpose of the text.\n\n\
         Text: {}\n\n\
         Respond with just the theme name, nothing else.",
        labels.join(", "),
        text
    )
}

#[async_trait]
impl SpeechSynthesizer for OpenAiServices {
    async fn synthesize(&self, text: &str, output: &Path) -> Result<Narration> {
        let api_key = self.chat.api_key()?;
        let request_body = json!({
            "model": TTS_MODEL,
            "voice": TTS_VOICE,
            "input": text,
            "response_format": "wav",
        });

        let audio = self
            .chat
            .retry()
            .run("speech synthesis", || async {
                let response = self
                    .http
                    .post(format!("{}/audio/speech", self.chat.base_url()))
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
                    anyhow::bail!("speech endpoint returned error {}: {}", status, error_text);
                }
                Ok(response.bytes().await?)
            })
            .await?;

        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(output, &audio)
            .await
            .with_context(|| format!("Failed to write narration to {}", output.display()))?;

        let info = FFmpegWrapper::probe(output).await?;
        debug!(path = %output.display(), duration = info.duration_seconds, "narration synthesized");
        Ok(Narration {
            path: output.to_path_buf(),
            duration: info.duration_seconds,
        })
    }
}

#[async_trait]
impl KeywordService for OpenAiServices {
    async fn infer_keywords(&self, text: &str) -> Result<Option<Vec<String>>> {
        let reply = self
            .chat
            .complete(KEYWORD_SYSTEM_PROMPT, &keyword_prompt(text), None)
            .await?;
        Ok(parse_with(KEYWORD_STRATEGIES, &reply))
    }
}

#[async_trait]
impl ThemeClassifier for OpenAiServices {
    async fn infer_theme(&self, text: &str) -> Result<Theme> {
        let reply = self
            .chat
            .complete(THEME_SYSTEM_PROMPT, &theme_prompt(text), Some(0.3))
            .await?;
        Ok(parse_theme(&reply))
    }
}

#[async_trait]
impl ScriptWriter for OpenAiServices {
    async fn generate_script(&self, topic: &str) -> Result<String> {
        let reply = self.chat.complete(SCRIPT_SYSTEM_PROMPT, topic, None).await?;
        parse_with(SCRIPT_STRATEGIES, &reply).context("model returned an empty script")
    }
}
