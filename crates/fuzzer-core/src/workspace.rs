//! Campaign scratch directory.
//!
//! Layout of one campaign:
//!
//! ```text
//! <root>/campaigns/<Contract>_<YYYYmmddHHMMSS>_<id>/
//!     Contract.sol
//!     invariant_1_test.sol
//!     invariant_1_echidna.yaml
//!     ...
//! ```
//!
//! Every file belongs to exactly one invocation, so concurrent runs never
//! share a scratch file.

use chrono::Utc;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

use invariant_fuzzer_types::{ContractSource, HarnessUnit, Invariant};

use crate::error::ConfigError;

/// File name the harnesses import the contract under test from.
pub const CONTRACT_FILE: &str = "Contract.sol";

#[derive(Debug)]
pub struct CampaignWorkspace {
    dir: PathBuf,
}

impl CampaignWorkspace {
    /// Create a fresh, uniquely named campaign directory under `root`.
    pub fn create(root: &Path, source: &ContractSource) -> Result<Self, ConfigError> {
        let id = Uuid::new_v4().simple().to_string();
        let name = format!(
            "{}_{}_{}",
            source.name(),
            Utc::now().format("%Y%m%d%H%M%S"),
            &id[..8]
        );
        let dir = root.join("campaigns").join(name);
        std::fs::create_dir_all(&dir).map_err(|source| ConfigError::CreateDir {
            path: dir.clone(),
            source,
        })?;
        debug!(dir = %dir.display(), "created campaign workspace");
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn write_contract(&self, source: &ContractSource) -> Result<PathBuf, ConfigError> {
        let path = self.dir.join(CONTRACT_FILE);
        write_atomic(&path, source.as_bytes())?;
        Ok(path)
    }

    pub fn write_harness(&self, unit: &HarnessUnit) -> Result<PathBuf, ConfigError> {
        let path = self.harness_path(&unit.invariant);
        write_atomic(&path, unit.source.as_bytes())?;
        Ok(path)
    }

    pub fn harness_path(&self, invariant: &Invariant) -> PathBuf {
        self.dir.join(invariant.harness_file_name())
    }

    pub fn config_path(&self, invariant: &Invariant) -> PathBuf {
        self.dir.join(invariant.config_file_name())
    }

    /// Remove the directory. Failure is logged, never propagated.
    pub fn cleanup(&self) {
        if let Err(e) = std::fs::remove_dir_all(&self.dir) {
            warn!(dir = %self.dir.display(), error = %e, "failed to remove campaign workspace");
        }
    }
}

/// Write through a temp file in the same directory, then rename into place.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), ConfigError> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent).map_err(|source| ConfigError::CreateDir {
        path: parent.to_path_buf(),
        source,
    })?;

    let write_err = |source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    };
    let mut tmp = tempfile::NamedTempFile::new_in(parent).map_err(write_err)?;
    tmp.write_all(bytes).map_err(write_err)?;
    tmp.as_file().sync_all().map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workspace_layout() {
        let root = tempfile::tempdir().unwrap();
        let source = ContractSource::new("contract Vault {}").unwrap();
        let ws = CampaignWorkspace::create(root.path(), &source).unwrap();

        let dir_name = ws.dir().file_name().unwrap().to_string_lossy().to_string();
        assert!(dir_name.starts_with("Vault_"));
        assert!(ws.dir().starts_with(root.path().join("campaigns")));

        let contract = ws.write_contract(&source).unwrap();
        assert_eq!(contract.file_name().unwrap(), CONTRACT_FILE);
        assert_eq!(std::fs::read_to_string(&contract).unwrap(), "contract Vault {}");

        let unit = HarnessUnit::new(Invariant::new(2, "x").unwrap(), "contract EchidnaTest_2 {}");
        let harness = ws.write_harness(&unit).unwrap();
        assert!(harness.ends_with("invariant_2_test.sol"));
        assert!(ws
            .config_path(&unit.invariant)
            .ends_with("invariant_2_echidna.yaml"));

        ws.cleanup();
        assert!(!ws.dir().exists());
    }

    #[test]
    fn test_two_campaigns_never_share_a_directory() {
        let root = tempfile::tempdir().unwrap();
        let source = ContractSource::new("contract A {}").unwrap();
        let a = CampaignWorkspace::create(root.path(), &source).unwrap();
        let b = CampaignWorkspace::create(root.path(), &source).unwrap();
        assert_ne!(a.dir(), b.dir());
    }

    #[test]
    fn test_cleanup_of_missing_directory_does_not_panic() {
        let root = tempfile::tempdir().unwrap();
        let source = ContractSource::new("contract A {}").unwrap();
        let ws = CampaignWorkspace::create(root.path(), &source).unwrap();
        std::fs::remove_dir_all(ws.dir()).unwrap();
        ws.cleanup();
    }
}
