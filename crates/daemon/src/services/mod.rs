use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use engine::audio::Theme;
use engine::Caption;

use crate::config::Config;
use crate::llm::ChatClient;

pub mod openai;
pub mod pexels;
pub mod transcribe;

/// A synthesized narration track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Narration {
    pub path: PathBuf,
    pub duration: f64,
}

/// A footage candidate returned by the stock provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetCandidate {
    pub url: String,
    pub width: i32,
    pub height: i32,
    pub duration: f64,
}

#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str, output: &Path) -> Result<Narration>;
}

#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio: &Path) -> Result<Vec<Caption>>;
}

#[async_trait]
pub trait KeywordService: Send + Sync {
    async fn infer_keywords(&self, text: &str) -> Result<Option<Vec<String>>>;
}

#[async_trait]
pub trait ThemeClassifier: Send + Sync {
    async fn infer_theme(&self, text: &str) -> Result<Theme>;
}

#[async_trait]
pub trait FootageProvider: Send + Sync {
    async fn search_asset(&self, keyword: &str) -> Result<Option<AssetCandidate>>;
}

#[async_trait]
pub trait ScriptWriter: Send + Sync {
    async fn generate_script(&self, topic: &str) -> Result<String>;
}

/// The external collaborators one render depends on.
#[derive(Clone)]
pub struct Collaborators {
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
    pub transcriber: Arc<dyn Transcriber>,
    pub keywords: Arc<dyn KeywordService>,
    pub themes: Arc<dyn ThemeClassifier>,
    pub footage: Arc<dyn FootageProvider>,
    pub scripts: Arc<dyn ScriptWriter>,
}

impl Collaborators {
    /// HTTP-backed collaborators sharing one client.
    pub fn from_config(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()?;
        let chat = Arc::new(ChatClient::new(http.clone(), config));
        let openai = Arc::new(openai::OpenAiServices::new(chat, http.clone()));

        Ok(Collaborators {
            synthesizer: openai.clone(),
            transcriber: Arc::new(transcribe::MlServiceTranscriber::new(http.clone(), config)),
            keywords: openai.clone(),
            themes: openai.clone(),
            footage: Arc::new(pexels::PexelsClient::new(http, config)),
            scripts: openai,
        })
    }
}
