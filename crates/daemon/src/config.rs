use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::retry::RetryPolicy;

/// What to do when a window with keywords still ends up without footage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingAssetPolicy {
    /// Fail the render with a resolution failure.
    Abort,
    /// Skip the window; the compositor loops the remaining footage.
    Drop,
}

impl FromStr for MissingAssetPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "abort" => Ok(MissingAssetPolicy::Abort),
            "drop" => Ok(MissingAssetPolicy::Drop),
            other => Err(anyhow::anyhow!("unknown missing asset policy '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStoreKind {
    Memory,
    Sqlite,
}

impl FromStr for JobStoreKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "memory" => Ok(JobStoreKind::Memory),
            "sqlite" => Ok(JobStoreKind::Sqlite),
            other => Err(anyhow::anyhow!("unknown job store '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub output_dir: PathBuf,
    pub scratch_dir: PathBuf,
    pub music_dir: PathBuf,
    pub db_path: PathBuf,
    pub job_store: JobStoreKind,
    pub ml_service_url: String,
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub openai_chat_model: String,
    pub pexels_api_key: Option<String>,
    pub segment_seconds: f64,
    pub missing_asset_policy: MissingAssetPolicy,
    pub http_timeout: Duration,
    pub retry: RetryPolicy,
    pub log_level: String,
    pub caption_font: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 5000)),
            output_dir: PathBuf::from("output"),
            scratch_dir: std::env::temp_dir(),
            music_dir: PathBuf::from("assets/music"),
            db_path: PathBuf::from(".cache/shortgen.db"),
            job_store: JobStoreKind::Memory,
            ml_service_url: "http://127.0.0.1:8001".to_string(),
            openai_api_key: None,
            openai_base_url: "https://api.openai.com/v1".to_string(),
            openai_chat_model: "gpt-3.5-turbo".to_string(),
            pexels_api_key: None,
            segment_seconds: engine::segmenter::DEFAULT_SEGMENT_SECONDS,
            missing_asset_policy: MissingAssetPolicy::Abort,
            http_timeout: Duration::from_secs(120),
            retry: RetryPolicy::default(),
            log_level: "info".to_string(),
            caption_font: "Arial".to_string(),
        }
    }
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env_string(name) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("invalid value for {}: {}", name, e)),
        None => Ok(None),
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let defaults = Config::default();

        let segment_seconds = env_parse::<f64>("SHORTGEN_SEGMENT_SECONDS")?
            .unwrap_or(defaults.segment_seconds);
        if segment_seconds <= 0.0 {
            anyhow::bail!("SHORTGEN_SEGMENT_SECONDS must be positive");
        }

        let mut retry = defaults.retry.clone();
        if let Some(attempts) = env_parse::<u32>("SHORTGEN_RETRY_ATTEMPTS")? {
            retry.attempts = attempts.max(1);
        }

        let missing_asset_policy = match env_string("SHORTGEN_MISSING_ASSET_POLICY") {
            Some(raw) => raw
                .parse()
                .context("invalid value for SHORTGEN_MISSING_ASSET_POLICY")?,
            None => defaults.missing_asset_policy,
        };
        let job_store = match env_string("SHORTGEN_JOB_STORE") {
            Some(raw) => raw.parse().context("invalid value for SHORTGEN_JOB_STORE")?,
            None => defaults.job_store,
        };

        Ok(Config {
            bind_addr: env_parse("SHORTGEN_BIND")?.unwrap_or(defaults.bind_addr),
            output_dir: env_string("SHORTGEN_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            scratch_dir: env_string("SHORTGEN_SCRATCH_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.scratch_dir),
            music_dir: env_string("SHORTGEN_MUSIC_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.music_dir),
            db_path: env_string("SHORTGEN_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.db_path),
            job_store,
            ml_service_url: env_string("ML_SERVICE_URL").unwrap_or(defaults.ml_service_url),
            openai_api_key: env_string("OPENAI_API_KEY"),
            openai_base_url: env_string("OPENAI_BASE_URL").unwrap_or(defaults.openai_base_url),
            openai_chat_model: env_string("OPENAI_CHAT_MODEL")
                .unwrap_or(defaults.openai_chat_model),
            pexels_api_key: env_string("PEXELS_API_KEY"),
            segment_seconds,
            missing_asset_policy,
            http_timeout: env_parse::<u64>("SHORTGEN_HTTP_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.http_timeout),
            retry,
            log_level: env_string("SHORTGEN_LOG_LEVEL").unwrap_or(defaults.log_level),
            caption_font: env_string("SHORTGEN_CAPTION_FONT").unwrap_or(defaults.caption_font),
        })
    }

    pub fn video_output_path(&self, job_id: &str) -> PathBuf {
        self.output_dir.join(format!("video_{}.mp4", job_id))
    }

    pub fn audio_output_path(&self, job_id: &str) -> PathBuf {
        self.output_dir.join(format!("audio_{}.wav", job_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_parsing() {
        assert_eq!("ABORT".parse::<MissingAssetPolicy>().unwrap(), MissingAssetPolicy::Abort);
        assert_eq!(" drop".parse::<MissingAssetPolicy>().unwrap(), MissingAssetPolicy::Drop);
        assert!("hold".parse::<MissingAssetPolicy>().is_err());
    }

    #[test]
    fn output_paths_are_deterministic() {
        let config = Config::default();
        assert_eq!(
            config.video_output_path("abc"),
            PathBuf::from("output/video_abc.mp4")
        );
        assert_eq!(
            config.audio_output_path("abc"),
            PathBuf::from("output/audio_abc.wav")
        );
    }
}
