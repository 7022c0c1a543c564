// src/lockfile/graph.rs

//! Dependency graph over an install set
//!
//! Edges connect package names: `a -> b` when `a` requires something that
//! `b` provides. Requirements met by an ignored package produce no edge, and
//! neither do requirements a package satisfies by itself.

use crate::error::{Error, Result};
use crate::repository::Package;
use crate::version::{Entry, Version};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::debug;

/// A provider of some capability
#[derive(Debug, Clone)]
struct Provider {
    package: String,
    version: Version,
    ignored: bool,
}

/// Direct dependency edges between installed packages
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// Map from package name to the names it directly depends on
    edges: BTreeMap<String, BTreeSet<String>>,
}

impl DependencyGraph {
    /// Resolve the requires of every installed package to provider names
    ///
    /// Both `install` and `ignored` packages count as providers, but only
    /// installed packages get edges.
    pub fn build(install: &[Package], ignored: &[Package]) -> Result<Self> {
        let mut providers: BTreeMap<&str, Vec<Provider>> = BTreeMap::new();
        let sources = install
            .iter()
            .map(|pkg| (pkg, false))
            .chain(ignored.iter().map(|pkg| (pkg, true)));
        for (pkg, is_ignored) in sources {
            for provide in &pkg.format.provides {
                providers.entry(&provide.name).or_default().push(Provider {
                    package: pkg.name.clone(),
                    version: provide.version.clone(),
                    ignored: is_ignored,
                });
            }
            for file in &pkg.format.files {
                providers.entry(&file.text).or_default().push(Provider {
                    package: pkg.name.clone(),
                    version: Version::default(),
                    ignored: is_ignored,
                });
            }
        }

        let mut sorted: Vec<&Package> = install.iter().collect();
        sorted.sort_by(|a, b| a.name.cmp(&b.name));

        let mut graph = Self::default();
        for pkg in sorted {
            let deps = graph.edges.entry(pkg.name.clone()).or_default();
            for require in &pkg.format.requires {
                let candidates = providers.get(require.name.as_str()).map(Vec::as_slice).unwrap_or_default();
                for name in resolve_requirement(pkg, require, candidates)? {
                    deps.insert(name);
                }
            }
        }

        Ok(graph)
    }

    /// Add an edge directly
    pub fn add_edge(&mut self, from: &str, to: &str) {
        self.edges
            .entry(from.to_string())
            .or_default()
            .insert(to.to_string());
        self.edges.entry(to.to_string()).or_default();
    }

    /// Every package name in the graph, sorted
    pub fn nodes(&self) -> impl Iterator<Item = &String> {
        self.edges.keys()
    }

    /// Direct dependencies of `name`, sorted
    pub fn get_dependencies(&self, name: &str) -> Vec<&String> {
        self.edges
            .get(name)
            .map(|deps| deps.iter().collect())
            .unwrap_or_default()
    }

    /// Depth-first spanning tree of everything reachable from `root`
    ///
    /// Edges into a node already on the recursion stack close a cycle and are
    /// cut; edges into a node visited earlier under this root are redundant
    /// and dropped as well. The returned tree edges are acyclic by
    /// construction.
    pub fn spanning_tree(&self, root: &str) -> Vec<(String, String)> {
        let mut visited = HashSet::new();
        let mut rec_stack = HashSet::new();
        let mut tree = Vec::new();
        self.dfs_tree(root, root, &mut visited, &mut rec_stack, &mut tree);
        tree
    }

    fn dfs_tree(
        &self,
        root: &str,
        name: &str,
        visited: &mut HashSet<String>,
        rec_stack: &mut HashSet<String>,
        tree: &mut Vec<(String, String)>,
    ) {
        visited.insert(name.to_string());
        rec_stack.insert(name.to_string());

        if let Some(deps) = self.edges.get(name) {
            for dep in deps {
                if rec_stack.contains(dep) {
                    debug!("Cutting cyclic edge {} -> {} under {}", name, dep, root);
                } else if !visited.contains(dep) {
                    tree.push((name.to_string(), dep.clone()));
                    self.dfs_tree(root, dep, visited, rec_stack, tree);
                }
            }
        }

        rec_stack.remove(name);
    }

    /// Everything reachable from `root` through the spanning tree, minus
    /// `root` itself, sorted
    pub fn closure(&self, root: &str) -> Vec<String> {
        let reached: BTreeSet<String> = self
            .spanning_tree(root)
            .into_iter()
            .map(|(_, to)| to)
            .filter(|to| to != root)
            .collect();
        reached.into_iter().collect()
    }

    /// Final dependency lists: targets carry their closure, every other
    /// package carries nothing
    pub fn project(&self, targets: &BTreeSet<String>) -> BTreeMap<String, Vec<String>> {
        self.edges
            .keys()
            .map(|name| {
                let deps = if targets.contains(name) {
                    self.closure(name)
                } else {
                    Vec::new()
                };
                (name.clone(), deps)
            })
            .collect()
    }
}

/// Provider names for one requirement of `pkg`
///
/// Returns nothing when the requirement is met by `pkg` itself or by an
/// ignored package.
fn resolve_requirement(pkg: &Package, require: &Entry, candidates: &[Provider]) -> Result<Vec<String>> {
    let satisfying: Vec<&Provider> = candidates
        .iter()
        .filter(|p| require.satisfies(&p.version))
        .collect();

    if let Some(ignored) = satisfying.iter().find(|p| p.ignored) {
        debug!(
            "Skipping {} of {}: provided by ignored package {}",
            require, pkg.name, ignored.package
        );
        return Ok(Vec::new());
    }

    if satisfying.iter().any(|p| p.package == pkg.name) {
        debug!("Dropping self-dependency {} of {}", require, pkg.name);
        return Ok(Vec::new());
    }

    if satisfying.is_empty() {
        return Err(Error::MissingProvider {
            requirement: require.to_string(),
            package: pkg.name.clone(),
        });
    }

    let names: BTreeSet<String> = satisfying.iter().map(|p| p.package.clone()).collect();
    Ok(names.into_iter().collect())
}
