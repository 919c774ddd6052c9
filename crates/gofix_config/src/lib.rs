//! gofix configuration
//!
//! Settings come from built-in defaults, then an optional TOML file (with the
//! `toml-config` feature), then `GOFIX_*` environment variables. Command-line
//! flags are applied last by the binary.

use serde::{Deserialize, Serialize};
use std::path::Path;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Complete configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GofixConfig {
    pub inline: InlineConfig,
    pub analyzer: AnalyzerConfig,
    /// Log filter directive, e.g. `gofix=debug`
    pub log: Option<String>,
}

impl GofixConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::default().merge_with_env()
    }

    /// Load configuration from TOML file
    #[cfg(feature = "toml-config")]
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from TOML file (stub when toml feature is disabled)
    #[cfg(not(feature = "toml-config"))]
    pub fn from_file(_path: &Path) -> anyhow::Result<Self> {
        anyhow::bail!("TOML support not enabled. Enable the 'toml-config' feature.")
    }

    /// Save configuration to TOML file
    #[cfg(feature = "toml-config")]
    pub fn save_to_file(&self, path: &Path) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Save configuration to TOML file (stub when toml feature is disabled)
    #[cfg(not(feature = "toml-config"))]
    pub fn save_to_file(&self, _path: &Path) -> anyhow::Result<()> {
        anyhow::bail!("TOML support not enabled. Enable the 'toml-config' feature.")
    }

    /// Loads `path` when given, otherwise the defaults, then applies the
    /// environment on top.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let base = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        Ok(base.merge_with_env())
    }

    /// Merge with environment variables (env vars take precedence)
    #[must_use]
    pub fn merge_with_env(self) -> Self {
        self.merge_with(|key| std::env::var(key).ok())
    }

    fn merge_with(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(val) = var("GOFIX_ALLOW_LITERALIZE") {
            self.inline.allow_literalize = val.parse().unwrap_or(self.inline.allow_literalize);
        }
        if let Some(val) = var("GOFIX_MAX_CALLEE_STATEMENTS") {
            self.inline.max_callee_statements =
                val.parse().unwrap_or(self.inline.max_callee_statements);
        }
        if let Some(val) = var("GOFIX_BISECT") {
            self.analyzer.bisect = Some(val).filter(|pattern| !pattern.is_empty());
        }
        if let Some(val) = var("GOFIX_JOBS") {
            self.analyzer.jobs = val.parse().unwrap_or(self.analyzer.jobs);
        }
        if let Some(val) = var("GOFIX_LOG") {
            self.log = Some(val);
        }
        self
    }
}

/// Inlining engine settings for the interactive `inline` command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InlineConfig {
    /// Accept a literalized result (the callee body wrapped in an
    /// immediately invoked function literal)
    pub allow_literalize: bool,

    /// Callees with more top-level statements than this are declined
    /// (0 = unlimited)
    pub max_callee_statements: usize,
}

impl Default for InlineConfig {
    fn default() -> Self {
        Self {
            allow_literalize: true,
            max_callee_statements: 0,
        }
    }
}

/// Settings for the `//go:fix inline` analyzer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Bisect pattern gating which inlinings are enabled
    pub bisect: Option<String>,

    /// Number of worker threads (0 = auto-detect)
    pub jobs: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GofixConfig::default();
        assert!(config.inline.allow_literalize);
        assert_eq!(config.analyzer.bisect, None);
        assert_eq!(config.analyzer.jobs, 0);
    }

    #[test]
    fn test_env_overrides() {
        let env = |key: &str| match key {
            "GOFIX_ALLOW_LITERALIZE" => Some("false".to_string()),
            "GOFIX_BISECT" => Some("01+10".to_string()),
            "GOFIX_JOBS" => Some("not a number".to_string()),
            "GOFIX_LOG" => Some("gofix=debug".to_string()),
            _ => None,
        };
        let config = GofixConfig::default().merge_with(env);
        assert!(!config.inline.allow_literalize);
        assert_eq!(config.analyzer.bisect.as_deref(), Some("01+10"));
        assert_eq!(config.analyzer.jobs, 0);
        assert_eq!(config.log.as_deref(), Some("gofix=debug"));
    }

    #[test]
    fn test_empty_bisect_pattern_disables_bisection() {
        let env = |key: &str| (key == "GOFIX_BISECT").then(String::new);
        let config = GofixConfig::default().merge_with(env);
        assert_eq!(config.analyzer.bisect, None);
    }

    #[cfg(feature = "toml-config")]
    #[test]
    fn test_toml_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("gofix.toml");
        let mut config = GofixConfig::default();
        config.analyzer.bisect = Some("y".to_string());
        config.inline.max_callee_statements = 40;
        config.save_to_file(&path).expect("save");
        assert_eq!(GofixConfig::from_file(&path).expect("load"), config);
    }

    #[cfg(not(feature = "toml-config"))]
    #[test]
    fn test_from_file_requires_feature() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(GofixConfig::from_file(&dir.path().join("gofix.toml")).is_err());
    }
}
