// src/repository/loader.rs

//! Loading repository metadata into a package universe
//!
//! The loader decodes every configured primary file, drops packages built
//! for a foreign architecture, applies a few metadata fix-ups and builds the
//! provides index the reducer walks.

use super::{read_primary, Package, RepoCache, Repository};
use crate::error::Result;
use crate::version::Entry;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// Interpreter path that `platform-python` provides but never declares
const PLATFORM_PYTHON: &str = "platform-python";
const PLATFORM_PYTHON_PATH: &str = "/usr/libexec/platform-python";

/// Capability name → indices of the packages exposing it
///
/// Both explicit provide entries and shipped file paths are indexed. The
/// index is append-only; consumers sort whatever they take out of it.
#[derive(Debug, Clone, Default)]
pub struct ProvidesIndex {
    entries: HashMap<String, Vec<usize>>,
}

impl ProvidesIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that package `index` provides `name`
    pub fn insert(&mut self, name: &str, index: usize) {
        let providers = self.entries.entry(name.to_string()).or_default();
        if providers.last() != Some(&index) {
            providers.push(index);
        }
    }

    /// Indices of the packages providing `name`
    pub fn providers(&self, name: &str) -> &[usize] {
        self.entries.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Every package known for one run, with its provides index
#[derive(Debug, Clone, Default)]
pub struct Universe {
    pub repositories: Vec<Arc<Repository>>,
    pub packages: Vec<Package>,
    pub provides: ProvidesIndex,
}

impl Universe {
    /// Packages providing `name`, in load order
    pub fn providers<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a Package> + 'a {
        self.provides
            .providers(name)
            .iter()
            .map(move |&index| &self.packages[index])
    }
}

/// Loads and normalizes packages for one target architecture
#[derive(Debug, Clone)]
pub struct Loader {
    arch: String,
}

impl Loader {
    pub fn new(arch: impl Into<String>) -> Self {
        Self { arch: arch.into() }
    }

    /// Whether packages built for `arch` can be installed on the target
    pub fn is_arch_allowed(&self, arch: &str) -> bool {
        arch == "noarch" || arch == self.arch
    }

    /// Load explicitly listed primary files
    pub fn load(&self, repo_files: &[(Arc<Repository>, PathBuf)]) -> Result<Universe> {
        let mut packages = Vec::new();
        for (repo, path) in repo_files {
            packages.extend(read_primary(path, repo.clone())?);
        }
        Ok(self.build(packages))
    }

    /// Load explicitly listed primary files plus whatever the cache holds
    /// for `repositories`
    pub fn load_with_cache(
        &self,
        repo_files: &[(Arc<Repository>, PathBuf)],
        cache: &dyn RepoCache,
        repositories: &[Arc<Repository>],
    ) -> Result<Universe> {
        let mut sources = repo_files.to_vec();
        sources.extend(cache.primaries(repositories)?);
        self.load(&sources)
    }

    /// Filter, fix up and index already decoded packages
    pub fn build(&self, decoded: Vec<Package>) -> Universe {
        let total = decoded.len();
        let mut universe = Universe::default();

        for mut pkg in decoded {
            if !self.is_arch_allowed(&pkg.arch) {
                continue;
            }
            apply_fixups(&mut pkg);

            if !universe
                .repositories
                .iter()
                .any(|repo| repo.name == pkg.repository.name)
            {
                universe.repositories.push(pkg.repository.clone());
            }
            universe.packages.push(pkg);
        }

        for (index, pkg) in universe.packages.iter().enumerate() {
            for provide in &pkg.format.provides {
                universe.provides.insert(&provide.name, index);
            }
            for file in &pkg.format.files {
                universe.provides.insert(&file.text, index);
            }
        }

        info!(
            "Loaded {} of {} packages for {} ({} provided names)",
            universe.packages.len(),
            total,
            self.arch,
            universe.provides.len()
        );
        universe
    }
}

/// Metadata rewrites applied to every loaded package
fn apply_fixups(pkg: &mut Package) {
    let self_provide = pkg.self_provide();
    pkg.format.provides.retain(|entry| *entry != self_provide);
    pkg.format.provides.insert(0, self_provide);

    if pkg.name == PLATFORM_PYTHON {
        pkg.format.provides.push(Entry::new(PLATFORM_PYTHON_PATH));
        pkg.format
            .requires
            .retain(|entry| entry.name != PLATFORM_PYTHON_PATH);
    }

    // Boolean (rich) dependencies are not understood here
    pkg.format.requires.retain(|entry| {
        let rich = entry.name.starts_with('(');
        if rich {
            debug!("Dropping rich dependency {} of {}", entry.name, pkg.name);
        }
        !rich
    });
}
