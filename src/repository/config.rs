// src/repository/config.rs

//! Repository descriptor file (`repo.yaml`)
//!
//! ```yaml
//! repositories:
//!   - name: fedora
//!     arch: x86_64
//!     metalink: https://mirrors.fedoraproject.org/metalink?repo=fedora-40&arch=x86_64
//!     mirrors:
//!       - https://dl.fedoraproject.org/pub/fedora/linux/releases/40/Everything/x86_64/os/
//!     gpgkey: https://example.com/RPM-GPG-KEY-fedora-40
//!     priority: 10
//! ```

use super::Repository;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Top-level shape of a repository descriptor file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryConfig {
    #[serde(default)]
    pub repositories: Vec<Repository>,
}

impl RepositoryConfig {
    /// Load a descriptor file from disk
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Reading repository descriptors from {}", path.display());
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse a descriptor document
    pub fn parse(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Repositories that are not disabled, in file order
    pub fn enabled(&self) -> Vec<Arc<Repository>> {
        self.repositories
            .iter()
            .filter(|repo| !repo.disabled)
            .cloned()
            .map(Arc::new)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::DEFAULT_PRIORITY;

    const SAMPLE: &str = r#"
repositories:
  - name: fedora
    arch: x86_64
    baseurl: https://example.com/fedora/
    mirrors:
      - https://m1.example.com/fedora/
    priority: 10
  - name: updates
    arch: x86_64
    disabled: true
  - name: extras
    arch: noarch
"#;

    #[test]
    fn test_parse_descriptor() {
        let config = RepositoryConfig::parse(SAMPLE).unwrap();
        assert_eq!(config.repositories.len(), 3);

        let fedora = &config.repositories[0];
        assert_eq!(fedora.name, "fedora");
        assert_eq!(fedora.priority, 10);
        assert_eq!(fedora.mirrors, vec!["https://m1.example.com/fedora/"]);

        let extras = &config.repositories[2];
        assert_eq!(extras.priority, DEFAULT_PRIORITY);
        assert!(extras.mirrors.is_empty());
        assert!(!extras.disabled);
    }

    #[test]
    fn test_enabled_skips_disabled() {
        let config = RepositoryConfig::parse(SAMPLE).unwrap();
        let names: Vec<_> = config.enabled().iter().map(|r| r.name.clone()).collect();
        assert_eq!(names, vec!["fedora", "extras"]);
    }

    #[test]
    fn test_parse_invalid_yaml() {
        assert!(RepositoryConfig::parse("repositories: [name: ").is_err());
    }
}
