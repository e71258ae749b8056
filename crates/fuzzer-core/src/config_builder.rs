//! Campaign configuration: default/override merge and the on-disk document.
//!
//! The document is written through a temp file in the destination directory
//! and renamed into place, so the engine either sees the complete document
//! or the build fails and nothing is launched.

use std::path::{Path, PathBuf};
use tracing::debug;

use invariant_fuzzer_types::{CampaignConfig, ConfigOverrides};

use crate::error::ConfigError;
use crate::workspace::write_atomic;

/// Merges caller overrides onto a fixed default config.
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    defaults: CampaignConfig,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defaults(defaults: CampaignConfig) -> Self {
        Self { defaults }
    }

    /// Defaults merged with `overrides`, validated.
    pub fn build(&self, overrides: &ConfigOverrides) -> Result<CampaignConfig, ConfigError> {
        let config = self.defaults.clone().merged(overrides);
        config.validate()?;
        Ok(config)
    }

    /// Resolve the corpus directory against `corpus_base`, create it, and
    /// write the document to `path`. Returns the config as written.
    pub fn materialize(
        &self,
        config: &CampaignConfig,
        path: &Path,
        corpus_base: &Path,
    ) -> Result<CampaignConfig, ConfigError> {
        config.validate()?;
        let mut resolved = config.clone();
        resolved.corpus_dir = resolve_corpus_dir(&config.corpus_dir, corpus_base)?;

        std::fs::create_dir_all(&resolved.corpus_dir).map_err(|source| ConfigError::CreateDir {
            path: resolved.corpus_dir.clone(),
            source,
        })?;

        write_document(&resolved, path)?;
        debug!(
            path = %path.display(),
            corpus_dir = %resolved.corpus_dir.display(),
            "wrote engine config"
        );
        Ok(resolved)
    }
}

/// Absolute corpus path; relative paths are taken against `base`.
pub fn resolve_corpus_dir(corpus_dir: &Path, base: &Path) -> Result<PathBuf, ConfigError> {
    let joined = if corpus_dir.is_absolute() {
        corpus_dir.to_path_buf()
    } else {
        base.join(corpus_dir)
    };
    std::path::absolute(&joined).map_err(|source| ConfigError::CreateDir {
        path: joined.clone(),
        source,
    })
}

pub fn render_document(config: &CampaignConfig) -> Result<String, ConfigError> {
    Ok(serde_yaml::to_string(config)?)
}

/// Read a config document; keys not present keep their defaults.
pub fn parse_document(text: &str) -> Result<CampaignConfig, serde_yaml::Error> {
    serde_yaml::from_str(text)
}

/// Atomically write the config document to `path`.
pub fn write_document(config: &CampaignConfig, path: &Path) -> Result<(), ConfigError> {
    let rendered = render_document(config)?;
    write_atomic(path, rendered.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_applies_overrides() {
        let builder = ConfigBuilder::new();
        let cfg = builder
            .build(&ConfigOverrides {
                test_limit: Some(1_000),
                coverage: Some(false),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(cfg.test_limit, 1_000);
        assert!(!cfg.coverage);
        assert_eq!(cfg.timeout, CampaignConfig::DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn test_build_rejects_zero_timeout() {
        let err = ConfigBuilder::new()
            .build(&ConfigOverrides {
                timeout: Some(0),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(ref v) if v.field == "timeout"));
    }

    #[test]
    fn test_document_round_trip() {
        let cfg = ConfigBuilder::new()
            .build(&ConfigOverrides {
                corpus_dir: Some(PathBuf::from("/var/corpus")),
                test_mode: Some("assertion".into()),
                test_limit: Some(123),
                timeout: Some(45),
                seq_len: Some(7),
                shrink_limit: Some(5_000),
                coverage: Some(false),
                format: Some("json".into()),
                crytic_args: Some(vec!["--solc-remaps".into(), "@oz=lib/oz".into()]),
                filter_functions: Some(vec!["echidna_invariant_1".into()]),
            })
            .unwrap();
        let text = render_document(&cfg).unwrap();
        assert_eq!(parse_document(&text).unwrap(), cfg);
    }

    #[test]
    fn test_partial_document_keeps_defaults() {
        let cfg = parse_document("testLimit: 10\ncoverage: false\n").unwrap();
        assert_eq!(cfg.test_limit, 10);
        assert!(!cfg.coverage);
        assert_eq!(cfg.seq_len, CampaignConfig::DEFAULT_SEQ_LEN);
    }

    #[test]
    fn test_materialize_creates_corpus_and_writes_document() {
        let dir = tempfile::tempdir().unwrap();
        let cfg_path = dir.path().join("run/echidna.yaml");
        let written = ConfigBuilder::new()
            .materialize(&CampaignConfig::default(), &cfg_path, dir.path())
            .unwrap();

        assert!(written.corpus_dir.is_absolute());
        assert!(written.corpus_dir.ends_with("corpus"));
        assert!(written.corpus_dir.is_dir());

        let on_disk = std::fs::read_to_string(&cfg_path).unwrap();
        assert_eq!(parse_document(&on_disk).unwrap(), written);
        // No temp files left next to the document.
        let entries: Vec<_> = std::fs::read_dir(cfg_path.parent().unwrap())
            .unwrap()
            .collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_uncreatable_corpus_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"file, not a directory").unwrap();
        let cfg = CampaignConfig {
            corpus_dir: blocker.join("corpus"),
            ..Default::default()
        };
        let cfg_path = dir.path().join("echidna.yaml");
        let err = ConfigBuilder::new()
            .materialize(&cfg, &cfg_path, dir.path())
            .unwrap_err();
        assert!(matches!(err, ConfigError::CreateDir { .. }));
        assert!(!cfg_path.exists());
    }
}
