// src/repository/mod.rs

//! Repository and package model
//!
//! This module provides:
//! - The repository descriptor (`Repository`) and repo.yaml loading
//! - The immutable package descriptor decoded from primary metadata
//! - Native `primary.xml` parsing
//! - The cached-primaries collaborator (`RepoCache`)
//! - The loader that filters, fixes up and indexes packages

mod cache;
mod config;
mod loader;
mod primary;

pub use cache::{DirRepoCache, RepoCache};
pub use config::RepositoryConfig;
pub use loader::{Loader, ProvidesIndex, Universe};
pub use primary::{parse_primary, read_primary};

use crate::version::{Entry, Version};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// Priority given to repositories that do not declare one (dnf's default)
pub const DEFAULT_PRIORITY: i32 = 99;

fn default_priority() -> i32 {
    DEFAULT_PRIORITY
}

/// A configured RPM repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub name: String,
    #[serde(default)]
    pub arch: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baseurl: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metalink: Option<String>,
    #[serde(default)]
    pub mirrors: Vec<String>,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gpgkey: Option<String>,
    /// Lower values win
    #[serde(default = "default_priority")]
    pub priority: i32,
}

impl Repository {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arch: String::new(),
            baseurl: None,
            metalink: None,
            mirrors: Vec::new(),
            disabled: false,
            gpgkey: None,
            priority: DEFAULT_PRIORITY,
        }
    }

    /// Base URLs packages of this repository can be fetched from
    pub fn base_urls(&self) -> Vec<String> {
        if !self.mirrors.is_empty() {
            return self.mirrors.clone();
        }
        self.baseurl.iter().cloned().collect()
    }
}

/// Package checksum as published in primary metadata
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Checksum {
    /// Hex digest
    pub value: String,
    /// Digest algorithm (`sha256`, `sha512`, ...)
    pub algorithm: String,
    pub pkgid: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Location {
    pub href: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Size {
    pub package: u64,
    pub installed: u64,
    pub archive: u64,
}

/// A file shipped by a package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvidedFile {
    pub text: String,
    /// `dir`, `ghost`, or `None` for regular files
    pub kind: Option<String>,
}

impl ProvidedFile {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: None,
        }
    }
}

/// Dependency information of a package
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Format {
    pub provides: Vec<Entry>,
    pub requires: Vec<Entry>,
    pub conflicts: Vec<Entry>,
    pub obsoletes: Vec<Entry>,
    pub recommends: Vec<Entry>,
    pub suggests: Vec<Entry>,
    pub enhances: Vec<Entry>,
    pub supplements: Vec<Entry>,
    pub files: Vec<ProvidedFile>,
}

/// An RPM available in a repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    pub name: String,
    pub arch: String,
    pub version: Version,
    pub location: Location,
    pub checksum: Checksum,
    pub size: Size,
    pub repository: Arc<Repository>,
    pub format: Format,
}

impl Package {
    /// Create a package with empty metadata
    pub fn new(
        name: impl Into<String>,
        arch: impl Into<String>,
        version: Version,
        repository: Arc<Repository>,
    ) -> Self {
        Self {
            name: name.into(),
            arch: arch.into(),
            version,
            location: Location::default(),
            checksum: Checksum::default(),
            size: Size::default(),
            repository,
            format: Format::default(),
        }
    }

    /// The implicit `name = epoch:ver-rel` provide every package carries
    pub fn self_provide(&self) -> Entry {
        Entry::versioned(
            self.name.clone(),
            crate::version::Flags::Eq,
            self.version.clone(),
        )
    }

    /// Total order used to pick the best candidate
    ///
    /// Higher versions win; on equal versions the repository with the lower
    /// priority value wins; the package string breaks remaining ties.
    pub fn compare(&self, other: &Package) -> Ordering {
        self.version
            .compare(&other.version)
            .then_with(|| other.repository.priority.cmp(&self.repository.priority))
            .then_with(|| self.to_string().cmp(&other.to_string()))
    }
}

impl fmt::Display for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}.{}", self.name, self.version, self.arch)
    }
}
