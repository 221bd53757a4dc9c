//! Run configuration.
//!
//! Everything here is set before [`MSpec::process`](crate::runner::mspec::MSpec::process)
//! runs and only read while it runs. A config can come from a YAML file:
//!
//! ```yaml
//! files:
//!   - spec/core/array_spec.rs
//! tags_patterns:
//!   - ["spec/", "spec/tags/"]
//!   - ['_spec\.\w+$', "_tags.txt"]
//! mode: pretend
//! randomize: true
//! seed: 1234
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::errors::MSpecError;

/// How examples are treated during a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Run everything.
    #[default]
    Normal,
    /// Check that guarded examples pass and fail as expected.
    Verify,
    /// Report guarded examples instead of running them.
    Report,
    /// Dry run: dispatch every action but run no spec code.
    Pretend,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Spec files to process, in order.
    pub files: Vec<PathBuf>,
    /// Tag file rewrite rules. Empty means the defaults.
    pub tags_patterns: Vec<(String, String)>,
    pub mode: Mode,
    /// Shuffle the file order.
    pub randomize: bool,
    /// Seed for the shuffle. A fresh one is drawn when absent.
    pub seed: Option<u64>,
}

impl Config {
    /// Loads a YAML config file.
    pub fn load(path: &Path) -> Result<Self, MSpecError> {
        let content = fs::read_to_string(path).map_err(|e| MSpecError::io("read", path, e))?;
        Self::from_yaml(&content).map_err(|source| MSpecError::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        if content.trim().is_empty() {
            return Ok(Config::default());
        }
        serde_yaml::from_str(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_a_plain_run() {
        let config = Config::default();
        assert!(config.files.is_empty());
        assert!(config.tags_patterns.is_empty());
        assert_eq!(config.mode, Mode::Normal);
        assert!(!config.randomize);
        assert_eq!(config.seed, None);
    }

    #[test]
    fn parses_every_field() {
        let config = Config::from_yaml(
            r#"
files:
  - spec/a_spec.rs
  - spec/b_spec.rs
tags_patterns:
  - ["spec/", "tags/"]
mode: pretend
randomize: true
seed: 99
"#,
        )
        .unwrap();
        assert_eq!(
            config.files,
            vec![PathBuf::from("spec/a_spec.rs"), PathBuf::from("spec/b_spec.rs")]
        );
        assert_eq!(
            config.tags_patterns,
            vec![("spec/".to_string(), "tags/".to_string())]
        );
        assert_eq!(config.mode, Mode::Pretend);
        assert!(config.randomize);
        assert_eq!(config.seed, Some(99));
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config = Config::from_yaml("randomize: true\n").unwrap();
        assert!(config.randomize);
        assert_eq!(config.mode, Mode::Normal);
        assert_eq!(Config::from_yaml("").unwrap(), Config::default());
    }

    #[test]
    fn unknown_mode_is_rejected() {
        assert!(Config::from_yaml("mode: sideways\n").is_err());
    }

    #[test]
    fn load_reports_missing_file() {
        let err = Config::load(Path::new("/nonexistent/mspec.yml")).unwrap_err();
        assert!(matches!(err, MSpecError::Io { .. }));
    }
}
