// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! `closelint.toml` configuration.
//!
//! ```toml
//! [closeable-requires-use]
//! active = true
//! severity = "warning"
//! closing-functions = ["use"]
//! closeable-types = ["ConnectionPool"]
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use closelint_diagnostics::Severity;
use closelint_ownership::AnalysisOptions;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// File name looked up when no `--config` is given.
pub const CONFIG_FILE_NAME: &str = "closelint.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error("invalid configuration in {}: {source}", path.display())]
    Parse { path: PathBuf, source: toml::de::Error },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct LintConfig {
    pub closeable_requires_use: RuleConfig,
}

/// Settings of the `CloseableRequiresUse` rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct RuleConfig {
    pub active: bool,
    pub severity: Severity,
    /// Methods that close their receiver when given a single lambda
    pub closing_functions: Vec<String>,
    /// Extra type names to treat as closeable
    pub closeable_types: Vec<String>,
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            active: true,
            severity: Severity::Warning,
            closing_functions: AnalysisOptions::default().closing_functions,
            closeable_types: Vec::new(),
        }
    }
}

impl RuleConfig {
    pub fn analysis_options(&self) -> AnalysisOptions {
        AnalysisOptions { closing_functions: self.closing_functions.clone() }
    }
}

impl LintConfig {
    /// Read and validate a configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        let config: LintConfig =
            toml::from_str(&text).map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })?;
        config.validate()?;
        Ok(config)
    }

    /// `closelint.toml` in `dir` if present, defaults otherwise.
    pub fn discover(dir: &Path) -> Result<Self, ConfigError> {
        let candidate = dir.join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            Self::load(&candidate)
        } else {
            Ok(Self::default())
        }
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: LintConfig = toml::from_str(text)
            .map_err(|source| ConfigError::Parse { path: PathBuf::from("<inline>"), source })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let rule = &self.closeable_requires_use;
        if rule.closing_functions.is_empty() {
            return Err(ConfigError::Invalid("closing-functions must name at least one function".to_string()));
        }
        let mut names = rule.closing_functions.iter().chain(&rule.closeable_types);
        if let Some(bad) = names.find(|n| !is_identifier(n)) {
            return Err(ConfigError::Invalid(format!("`{}` is not an identifier", bad)));
        }
        Ok(())
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_empty() {
        let config = LintConfig::from_toml_str("").unwrap();
        assert_eq!(config, LintConfig::default());
        assert!(config.closeable_requires_use.active);
        assert_eq!(config.closeable_requires_use.closing_functions, vec!["use"]);
    }

    #[test]
    fn reads_rule_section() {
        let config = LintConfig::from_toml_str(
            "[closeable-requires-use]\nseverity = \"error\"\nclosing-functions = [\"use\", \"autoClose\"]\ncloseable-types = [\"ConnectionPool\"]\n",
        )
        .unwrap();
        let rule = &config.closeable_requires_use;
        assert_eq!(rule.severity, Severity::Error);
        assert!(rule.active);
        assert_eq!(rule.analysis_options().closing_functions.len(), 2);
        assert_eq!(rule.closeable_types, vec!["ConnectionPool"]);
    }

    #[test]
    fn rejects_unknown_keys_and_bad_names() {
        assert!(matches!(
            LintConfig::from_toml_str("[closeable-requires-use]\nactiv = false\n"),
            Err(ConfigError::Parse { .. })
        ));
        assert!(matches!(
            LintConfig::from_toml_str("[closeable-requires-use]\nclosing-functions = []\n"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            LintConfig::from_toml_str("[closeable-requires-use]\ncloseable-types = [\"a.b\"]\n"),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = LintConfig::load(Path::new("/nonexistent/closelint.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(LintConfig::discover(Path::new("/nonexistent")).is_ok());
    }
}
