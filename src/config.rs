// src/config.rs
use crate::models::Strictness;
use crate::services::OrchestratorConfig;
use crate::services::ergonomics::EngineConfig;
use anyhow::{Context, Result, anyhow, bail};
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub enum CredentialConfig {
    StaticKey(String),
    KeyEndpoint(String),
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub redis_url: String,
    pub vision_base_url: String,
    pub vision_model: String,
    pub credentials: CredentialConfig,
    pub max_attempts: u32,
    pub retry_delay: Duration,
    /// `None` when `ANALYSIS_TIMEOUT_SECS=0`.
    pub attempt_timeout: Option<Duration>,
    pub max_photo_bytes: usize,
    pub strictness: Strictness,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let string = |name: &str, default: &str| get(name).unwrap_or_else(|| default.to_string());

        let credentials = match (get("VISION_API_KEY"), get("VISION_KEY_ENDPOINT")) {
            (Some(key), _) => CredentialConfig::StaticKey(key),
            (None, Some(endpoint)) => CredentialConfig::KeyEndpoint(endpoint),
            (None, None) => bail!("either VISION_API_KEY or VISION_KEY_ENDPOINT must be set"),
        };

        let max_attempts: u32 = parse_or(&get, "ANALYSIS_MAX_ATTEMPTS", 3)?;
        if max_attempts == 0 {
            bail!("ANALYSIS_MAX_ATTEMPTS must be at least 1");
        }
        let retry_delay_ms: u64 = parse_or(&get, "ANALYSIS_RETRY_DELAY_MS", 1000)?;
        let timeout_secs: u64 = parse_or(&get, "ANALYSIS_TIMEOUT_SECS", 30)?;
        let max_photo_mb: usize = parse_or(&get, "ANALYSIS_MAX_PHOTO_MB", 20)?;

        let strictness = match get("ERGONOMIC_STRICTNESS") {
            Some(value) => Strictness::from_str(&value)
                .map_err(|e| anyhow!(e))
                .context("invalid ERGONOMIC_STRICTNESS")?,
            None => Strictness::default(),
        };

        Ok(Self {
            bind_addr: string("DESKSCOPE_BIND", "0.0.0.0:8080"),
            redis_url: string("REDIS_URL", "redis://127.0.0.1:6379"),
            vision_base_url: string("VISION_PROXY_URL", "https://api.openai.com/v1"),
            vision_model: string("VISION_MODEL", "gpt-4o"),
            credentials,
            max_attempts,
            retry_delay: Duration::from_millis(retry_delay_ms),
            attempt_timeout: (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs)),
            max_photo_bytes: max_photo_mb * 1024 * 1024,
            strictness,
        })
    }

    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            max_attempts: self.max_attempts,
            base_delay: self.retry_delay,
            attempt_timeout: self.attempt_timeout,
            max_photo_bytes: self.max_photo_bytes,
            ergonomics: EngineConfig {
                strictness: self.strictness,
                ..EngineConfig::default()
            },
            ..OrchestratorConfig::default()
        }
    }
}

fn parse_or<T>(get: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match get(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid value for {}: {:?}", name, raw)),
        None => Ok(default),
    }
}
