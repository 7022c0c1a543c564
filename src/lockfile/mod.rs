// src/lockfile/mod.rs

//! Lock file for reproducible image builds
//!
//! The lock file captures a solve outcome: which packages to fetch, where
//! from, how to verify them and how they depend on each other. Everything in
//! it is sorted so identical resolutions produce byte-identical files.
//!
//! # Example
//!
//! ```json
//! {
//!   "cli-arguments": ["resolve", "bash"],
//!   "repositories": {
//!     "fedora": ["https://mirror.example.com/fedora/"]
//!   },
//!   "packages": [
//!     {
//!       "name": "bash",
//!       "integrity": "sha256-3q2+7w==",
//!       "urls": ["https://mirror.example.com/fedora/Packages/b/bash.rpm"],
//!       "repository": "fedora",
//!       "dependencies": ["glibc"]
//!     }
//!   ],
//!   "targets": ["bash"]
//! }
//! ```

pub mod graph;

pub use graph::DependencyGraph;

use crate::error::{Error, Result};
use crate::repository::Package;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use tracing::info;

/// Lock file root structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct LockFile {
    /// Arguments the lock file was generated with
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cli_arguments: Vec<String>,

    /// Repositories contributing at least one package → base URLs
    #[serde(default)]
    pub repositories: BTreeMap<String, Vec<String>>,

    /// Installed packages, sorted by name
    #[serde(default)]
    pub packages: Vec<LockedPackage>,

    /// Requested package names
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub targets: Vec<String>,

    /// Packages acting only as providers
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ignored: Vec<String>,
}

/// A locked package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockedPackage {
    pub name: String,

    /// SRI digest, `<algo>-<base64 digest>`
    pub integrity: String,

    /// Download locations
    #[serde(default)]
    pub urls: Vec<String>,

    /// Repository the package comes from
    pub repository: String,

    /// Names of the packages this one depends on, sorted
    #[serde(default)]
    pub dependencies: Vec<String>,
}

impl LockFile {
    /// Project an install set into a lock file
    ///
    /// `install` is what the solver selected, `force_ignored` are packages
    /// that may satisfy requirements without being locked themselves and
    /// `targets` are the requested names, which alone carry dependency lists.
    pub fn project(
        install: &[Package],
        force_ignored: &[Package],
        targets: &[String],
        cli_arguments: Vec<String>,
    ) -> Result<Self> {
        let graph = DependencyGraph::build(install, force_ignored)?;

        let installed: BTreeSet<&str> = install.iter().map(|p| p.name.as_str()).collect();
        let targets: BTreeSet<String> = targets
            .iter()
            .filter(|t| installed.contains(t.as_str()))
            .cloned()
            .collect();
        let mut dependencies = graph.project(&targets);

        let mut sorted: Vec<&Package> = install.iter().collect();
        sorted.sort_by(|a, b| a.name.cmp(&b.name));

        let mut lock = LockFile {
            cli_arguments,
            targets: targets.iter().cloned().collect(),
            ..Default::default()
        };

        for pkg in sorted {
            let repo = &pkg.repository;
            lock.repositories
                .entry(repo.name.clone())
                .or_insert_with(|| repo.base_urls());

            lock.packages.push(LockedPackage {
                name: pkg.name.clone(),
                integrity: integrity(pkg)?,
                urls: urls(pkg),
                repository: repo.name.clone(),
                dependencies: dependencies.remove(&pkg.name).unwrap_or_default(),
            });
        }

        let ignored: BTreeSet<String> = force_ignored.iter().map(|p| p.name.clone()).collect();
        lock.ignored = ignored.into_iter().collect();

        info!(
            "Locked {} packages from {} repositories",
            lock.packages.len(),
            lock.repositories.len()
        );
        Ok(lock)
    }

    /// Load a lock file from a path
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parse a lock file from JSON
    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Serialize to pretty JSON with a trailing newline
    pub fn to_json(&self) -> Result<String> {
        let mut out = serde_json::to_string_pretty(self)?;
        out.push('\n');
        Ok(out)
    }

    /// Write the lock file to a path
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Get a locked package by name
    pub fn get_package(&self, name: &str) -> Option<&LockedPackage> {
        self.packages.iter().find(|p| p.name == name)
    }
}

/// SRI integrity string for a package checksum
///
/// The published checksum is a hex digest; SRI wants the raw digest bytes in
/// base64.
pub fn integrity(pkg: &Package) -> Result<String> {
    let invalid = || Error::InvalidChecksum {
        package: pkg.to_string(),
        checksum: pkg.checksum.value.clone(),
    };

    if pkg.checksum.value.is_empty() || pkg.checksum.algorithm.is_empty() {
        return Err(invalid());
    }
    let digest = hex::decode(&pkg.checksum.value).map_err(|_| invalid())?;
    Ok(format!("{}-{}", pkg.checksum.algorithm, STANDARD.encode(digest)))
}

/// Download URLs of a package, one per repository base URL
fn urls(pkg: &Package) -> Vec<String> {
    let href = pkg.location.href.trim_start_matches('/');
    pkg.repository
        .base_urls()
        .iter()
        .map(|base| format!("{}/{}", base.trim_end_matches('/'), href))
        .collect()
}
