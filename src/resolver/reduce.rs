// src/resolver/reduce.rs

//! Candidate pruning ahead of SAT encoding
//!
//! Starting from the requested roots, the reducer follows requires through
//! the provides index to a fixed point. Anything never reached cannot take
//! part in a solution and is left out of the formula.

use crate::error::{Error, Result};
use crate::repository::{Package, Universe};
use crate::version::{Entry, Flags, Version};
use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};
use tracing::{debug, info, warn};

/// Output of [`reduce`]
#[derive(Debug, Clone, Default)]
pub struct Reduction {
    /// Candidates chosen for the requested roots
    pub matched: Vec<Package>,
    /// Every package that may participate, with trimmed provides and files
    pub involved: Vec<Package>,
}

impl Reduction {
    /// Distinct names of the matched packages, sorted
    pub fn matched_names(&self) -> Vec<String> {
        let names: BTreeSet<&str> = self.matched.iter().map(|p| p.name.as_str()).collect();
        names.into_iter().map(str::to_string).collect()
    }
}

/// Reduce `universe` to the packages reachable from `packages` and `implicit`
pub fn reduce(
    universe: &Universe,
    packages: &[String],
    implicit: &[String],
    ignore_missing: bool,
) -> Result<Reduction> {
    let mut roots: Vec<&str> = Vec::new();
    for root in packages.iter().chain(implicit) {
        if !roots.contains(&root.as_str()) {
            roots.push(root);
        }
    }

    let mut pinned: BTreeMap<String, BTreeSet<usize>> = BTreeMap::new();
    let mut matched: BTreeSet<usize> = BTreeSet::new();

    for root in roots {
        let candidates = match_root(universe, root);
        if candidates.is_empty() {
            let err = missing_root_error(universe, root);
            if ignore_missing {
                warn!("Ignoring missing package: {}", err);
                continue;
            }
            return Err(err);
        }

        let name = universe.packages[candidates[0]].name.clone();
        debug!(
            "Request {} bound to {} ({} candidates)",
            root,
            name,
            candidates.len()
        );
        pinned.entry(name).or_default().extend(&candidates);
        matched.extend(candidates);
    }

    let mut discovered: BTreeSet<usize> = matched.clone();
    let mut queue: VecDeque<usize> = matched.iter().copied().collect();

    while let Some(index) = queue.pop_front() {
        let pkg = &universe.packages[index];
        for require in &pkg.format.requires {
            for &provider in universe.provides.providers(&require.name) {
                let provider_name = &universe.packages[provider].name;
                if let Some(allowed) = pinned.get(provider_name) {
                    if !allowed.contains(&provider) {
                        continue;
                    }
                }
                if discovered.insert(provider) {
                    queue.push_back(provider);
                }
            }
        }
    }

    // Names some discovered package asks for; anything else a package
    // provides cannot influence the solution
    let mut wanted: HashSet<&str> = HashSet::new();
    for &index in &discovered {
        let format = &universe.packages[index].format;
        wanted.extend(format.requires.iter().map(|e| e.name.as_str()));
        wanted.extend(format.conflicts.iter().map(|e| e.name.as_str()));
    }

    let mut reduction = Reduction::default();
    for &index in &discovered {
        let mut pkg = universe.packages[index].clone();
        let own_name = pkg.name.clone();
        pkg.format
            .provides
            .retain(|e| e.name == own_name || wanted.contains(e.name.as_str()));
        pkg.format
            .files
            .retain(|file| wanted.contains(file.text.as_str()));

        if matched.contains(&index) {
            reduction.matched.push(pkg.clone());
        }
        reduction.involved.push(pkg);
    }

    info!(
        "Reduced {} packages to {} involved ({} matched)",
        universe.packages.len(),
        reduction.involved.len(),
        reduction.matched.len()
    );
    Ok(reduction)
}

/// Indices of the candidates a single root binds to
///
/// A root is either a bare package name or `name-[epoch:]ver[-rel][.arch]`.
/// The shortest matching name wins, and among its candidates only those from
/// the best-priority repository are kept.
fn match_root(universe: &Universe, root: &str) -> Vec<usize> {
    let candidates: Vec<usize> = universe
        .packages
        .iter()
        .enumerate()
        .filter(|(_, pkg)| root_matches(pkg, root))
        .map(|(index, _)| index)
        .collect();

    let Some(shortest) = candidates
        .iter()
        .map(|&i| universe.packages[i].name.len())
        .min()
    else {
        return Vec::new();
    };

    let candidates: Vec<usize> = candidates
        .into_iter()
        .filter(|&i| universe.packages[i].name.len() == shortest)
        .collect();

    let best_priority = candidates
        .iter()
        .map(|&i| universe.packages[i].repository.priority)
        .min()
        .unwrap_or_default();

    candidates
        .into_iter()
        .filter(|&i| universe.packages[i].repository.priority == best_priority)
        .collect()
}

fn root_matches(pkg: &Package, root: &str) -> bool {
    let Some(rest) = root.strip_prefix(pkg.name.as_str()) else {
        return false;
    };
    if rest.is_empty() {
        return true;
    }
    let Some(suffix) = rest.strip_prefix('-') else {
        return false;
    };

    let arch_suffix = format!(".{}", pkg.arch);
    let suffix = suffix.strip_suffix(arch_suffix.as_str()).unwrap_or(suffix);

    match Version::parse(suffix) {
        Ok(mut wanted) => {
            // A request without an epoch accepts any epoch
            if wanted.epoch.is_empty() {
                wanted.epoch = pkg.version.epoch.clone();
            }
            Entry::versioned(pkg.name.clone(), Flags::Eq, wanted).satisfies(&pkg.version)
        }
        Err(_) => false,
    }
}

fn missing_root_error(universe: &Universe, root: &str) -> Error {
    let name = universe
        .packages
        .iter()
        .map(|pkg| pkg.name.as_str())
        .filter(|name| {
            root.strip_prefix(*name)
                .is_some_and(|rest| rest.starts_with('-'))
        })
        .min_by_key(|name| name.len());

    match name {
        Some(name) => Error::AmbiguousVersionRequest {
            name: name.to_string(),
            request: root.to_string(),
        },
        None => Error::UnknownRoot(root.to_string()),
    }
}
