// src/config/ai.rs
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::{env, fs, path::Path, path::PathBuf};

pub const DEFAULT_AI_CONFIG_PATH: &str = "config/ai.json";
pub const ENV_AI_CONFIG_PATH: &str = "AI_CONFIG_PATH";

fn default_provider() -> String {
    "openai".into()
}
fn default_model() -> String {
    "gpt-4o-mini".into()
}
fn default_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_timeout_ms() -> u64 {
    20_000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    pub enabled: bool,
    /// Only "openai" (any OpenAI-compatible chat completions endpoint).
    #[serde(default = "default_provider")]
    pub provider: String,
    /// "ENV" means: read from OPENAI_API_KEY. Empty when unresolved.
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: default_provider(),
            api_key: String::new(),
            model: default_model(),
            base_url: default_base_url(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl AiConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading ai config from {}", path.display()))?;
        Self::from_json_str(&data)
    }

    pub fn from_json_str(data: &str) -> anyhow::Result<Self> {
        let mut cfg: AiConfig = serde_json::from_str(data).context("parsing ai config")?;

        cfg.provider = cfg.provider.trim().to_lowercase();
        if cfg.provider != "openai" {
            bail!("Unsupported provider in ai config: {}", cfg.provider);
        }

        // A missing key leaves the backend unconfigured rather than failing startup.
        if cfg.api_key.trim().eq_ignore_ascii_case("env") {
            cfg.api_key = env::var("OPENAI_API_KEY").unwrap_or_default();
        }
        if cfg.timeout_ms == 0 {
            cfg.timeout_ms = default_timeout_ms();
        }
        Ok(cfg)
    }

    /// `$AI_CONFIG_PATH` (must exist), else `config/ai.json`, else None.
    pub fn load_default() -> anyhow::Result<Option<Self>> {
        if let Ok(p) = env::var(ENV_AI_CONFIG_PATH) {
            let path = PathBuf::from(p);
            if !path.exists() {
                bail!("{ENV_AI_CONFIG_PATH} points to non-existent path {}", path.display());
            }
            return Self::load_from_file(&path).map(Some);
        }
        let path = Path::new(DEFAULT_AI_CONFIG_PATH);
        if path.exists() {
            return Self::load_from_file(path).map(Some);
        }
        Ok(None)
    }

    /// Enabled and holding a key.
    pub fn is_usable(&self) -> bool {
        self.enabled && !self.api_key.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_optional_fields() {
        let cfg = AiConfig::from_json_str(r#"{"enabled": true, "api_key": "sk-test"}"#).unwrap();
        assert_eq!(cfg.provider, "openai");
        assert_eq!(cfg.timeout_ms, 20_000);
        assert!(cfg.is_usable());
    }

    #[test]
    fn disabled_or_keyless_is_not_usable() {
        let off = AiConfig::from_json_str(r#"{"enabled": false, "api_key": "sk"}"#).unwrap();
        assert!(!off.is_usable());
        let keyless = AiConfig::from_json_str(r#"{"enabled": true}"#).unwrap();
        assert!(!keyless.is_usable());
    }

    #[test]
    fn unknown_provider_is_rejected() {
        assert!(AiConfig::from_json_str(r#"{"enabled": true, "provider": "claude"}"#).is_err());
    }
}
