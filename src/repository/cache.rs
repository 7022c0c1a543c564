// src/repository/cache.rs

//! Cached repository metadata
//!
//! Fetching and verifying remote repository indexes happens outside this
//! crate. Whatever does the fetching leaves the decompressed or gzipped
//! `primary.xml` of each repository in a cache; the loader only needs to find
//! those files again.

use super::Repository;
use crate::error::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Source of already-fetched primary metadata files
pub trait RepoCache {
    /// Return the cached primary file of every repository that has one
    fn primaries(&self, repositories: &[Arc<Repository>]) -> Result<Vec<(Arc<Repository>, PathBuf)>>;
}

/// Directory-backed cache: `<root>/<repo-name>/primary.xml[.gz]`
#[derive(Debug, Clone)]
pub struct DirRepoCache {
    root: PathBuf,
}

/// File names probed inside a repository's cache directory, in order
const PRIMARY_NAMES: [&str; 2] = ["primary.xml", "primary.xml.gz"];

impl DirRepoCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory holding the cached files of one repository
    pub fn repository_dir(&self, repository: &Repository) -> PathBuf {
        self.root.join(&repository.name)
    }
}

impl RepoCache for DirRepoCache {
    fn primaries(&self, repositories: &[Arc<Repository>]) -> Result<Vec<(Arc<Repository>, PathBuf)>> {
        let mut found = Vec::new();

        for repo in repositories {
            let dir = self.repository_dir(repo);
            let primary = PRIMARY_NAMES
                .iter()
                .map(|name| dir.join(name))
                .find(|path| path.is_file());

            match primary {
                Some(path) => {
                    debug!("Using cached primary {} for {}", path.display(), repo.name);
                    found.push((repo.clone(), path));
                }
                None => debug!("No cached primary for repository {}", repo.name),
            }
        }

        Ok(found)
    }
}
