// src/config/aggregator.rs
//! Aggregator settings loaded from TOML.
//!
//! Resolution order:
//! 1) `$AGGREGATOR_CONFIG_PATH` (must exist)
//! 2) `config/aggregator.toml`
//! 3) built-in defaults
//!
//! Env overrides (`DISPATCH_DEADLINE_MS`, `DISPATCH_MAX_IN_FLIGHT`,
//! `SELECTION_MODE`) are applied on top, then the result is validated.

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::types::SourceId;

pub const DEFAULT_AGGREGATOR_CONFIG_PATH: &str = "config/aggregator.toml";
pub const ENV_AGGREGATOR_CONFIG_PATH: &str = "AGGREGATOR_CONFIG_PATH";
pub const ENV_DISPATCH_DEADLINE_MS: &str = "DISPATCH_DEADLINE_MS";
pub const ENV_DISPATCH_MAX_IN_FLIGHT: &str = "DISPATCH_MAX_IN_FLIGHT";
pub const ENV_SELECTION_MODE: &str = "SELECTION_MODE";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregatorConfig {
    pub dispatch: DispatchConfig,
    pub selection: SelectionConfig,
    pub sources: SourcesConfig,
    pub render: RenderConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    pub global_deadline_ms: u64,
    pub per_call_timeout_ms: u64,
    pub max_in_flight: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            global_deadline_ms: 15_000,
            per_call_timeout_ms: 10_000,
            max_in_flight: 8,
        }
    }
}

/// Which sources a query fans out to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMode {
    /// The classifier's pick.
    #[default]
    Classified,
    /// Every registered source.
    All,
}

impl FromStr for SelectionMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "classified" => Ok(SelectionMode::Classified),
            "all" => Ok(SelectionMode::All),
            other => Err(anyhow!("unknown selection mode `{other}`")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    pub mode: SelectionMode,
    /// Cap on how many sources the classifier may pick.
    pub max_sources: usize,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            mode: SelectionMode::Classified,
            max_sources: 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub user_agent: String,
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
    pub result_limit: usize,
    pub text_cap: usize,
    /// Per-source overrides of `result_limit`.
    pub limits: BTreeMap<SourceId, usize>,
    /// Per-source overrides of `text_cap`.
    pub text_caps: BTreeMap<SourceId, usize>,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            user_agent: format!(
                "{}/{} (multi-source search)",
                env!("CARGO_PKG_NAME"),
                env!("CARGO_PKG_VERSION")
            ),
            connect_timeout_ms: 3_000,
            request_timeout_ms: 10_000,
            result_limit: 5,
            text_cap: 500,
            limits: BTreeMap::new(),
            text_caps: BTreeMap::from([(SourceId::Wikipedia, 1_000), (SourceId::Github, 200)]),
        }
    }
}

impl SourcesConfig {
    pub fn limit_for(&self, id: SourceId) -> usize {
        self.limits.get(&id).copied().unwrap_or(self.result_limit)
    }

    pub fn text_cap_for(&self, id: SourceId) -> usize {
        self.text_caps.get(&id).copied().unwrap_or(self.text_cap)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub max_items_per_source: usize,
    pub snippet_chars: usize,
    pub synthesis_char_cap: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            max_items_per_source: 3,
            snippet_chars: 200,
            synthesis_char_cap: 15_000,
        }
    }
}

impl AggregatorConfig {
    /// Resolve the config path, read it, apply env overrides and validate.
    pub fn load() -> Result<Self> {
        let mut cfg = match std::env::var(ENV_AGGREGATOR_CONFIG_PATH) {
            Ok(p) => {
                let path = PathBuf::from(p);
                if !path.exists() {
                    bail!(
                        "{ENV_AGGREGATOR_CONFIG_PATH} points to non-existent path {}",
                        path.display()
                    );
                }
                Self::read(&path)?
            }
            Err(_) => {
                let path = Path::new(DEFAULT_AGGREGATOR_CONFIG_PATH);
                if path.exists() {
                    Self::read(path)?
                } else {
                    tracing::info!("no {DEFAULT_AGGREGATOR_CONFIG_PATH}; using built-in defaults");
                    Self::default()
                }
            }
        };
        cfg.apply_env_overrides();
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).context("parsing aggregator config")
    }

    fn read(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading aggregator config from {}", path.display()))?;
        Self::from_toml_str(&content).with_context(|| format!("in {}", path.display()))
    }

    /// Invalid override values are ignored with a warning.
    pub fn apply_env_overrides(&mut self) {
        if let Some(ms) = parse_env::<u64>(ENV_DISPATCH_DEADLINE_MS) {
            self.dispatch.global_deadline_ms = ms;
        }
        if let Some(n) = parse_env::<usize>(ENV_DISPATCH_MAX_IN_FLIGHT) {
            self.dispatch.max_in_flight = n;
        }
        if let Some(mode) = parse_env::<SelectionMode>(ENV_SELECTION_MODE) {
            self.selection.mode = mode;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.dispatch.global_deadline_ms == 0 {
            bail!("dispatch.global_deadline_ms must be > 0");
        }
        if self.dispatch.per_call_timeout_ms == 0 {
            bail!("dispatch.per_call_timeout_ms must be > 0");
        }
        if self.dispatch.max_in_flight == 0 {
            bail!("dispatch.max_in_flight must be > 0");
        }
        if self.selection.max_sources == 0 {
            bail!("selection.max_sources must be > 0");
        }
        if self.sources.result_limit == 0 {
            bail!("sources.result_limit must be > 0");
        }
        if let Some((id, _)) = self.sources.limits.iter().find(|(_, n)| **n == 0) {
            bail!("sources.limits.{id} must be > 0");
        }
        if self.render.max_items_per_source == 0 {
            bail!("render.max_items_per_source must be > 0");
        }
        Ok(())
    }
}

fn parse_env<T>(key: &str) -> Option<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse::<T>() {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::warn!(key, value = %raw, error = %e, "ignoring invalid env override");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_gives_defaults() {
        let cfg = AggregatorConfig::from_toml_str("").unwrap();
        assert_eq!(cfg, AggregatorConfig::default());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn per_source_overrides_fall_back_to_globals() {
        let cfg = AggregatorConfig::from_toml_str(
            r#"
            [sources]
            result_limit = 4
            text_cap = 300

            [sources.limits]
            arxiv = 2

            [sources.text_caps]
            pubmed = 800
            "#,
        )
        .unwrap();
        assert_eq!(cfg.sources.limit_for(SourceId::Arxiv), 2);
        assert_eq!(cfg.sources.limit_for(SourceId::Books), 4);
        assert_eq!(cfg.sources.text_cap_for(SourceId::Pubmed), 800);
        assert_eq!(cfg.sources.text_cap_for(SourceId::Wikipedia), 300);
    }

    #[test]
    fn zero_deadline_is_rejected() {
        let cfg = AggregatorConfig::from_toml_str("[dispatch]\nglobal_deadline_ms = 0\n").unwrap();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn unknown_source_key_is_a_parse_error() {
        assert!(AggregatorConfig::from_toml_str("[sources.limits]\nmyspace = 3\n").is_err());
    }

    #[test]
    fn selection_mode_parses_case_insensitively() {
        assert_eq!("ALL".parse::<SelectionMode>().unwrap(), SelectionMode::All);
        assert!("some".parse::<SelectionMode>().is_err());
    }
}
