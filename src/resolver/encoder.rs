// src/resolver/encoder.rs

//! Translation of the involved package set into a Boolean formula
//!
//! Every package is exploded into one variable per thing it offers: a
//! `Package` variable for its own name, a `Resource` variable per further
//! provide and a `File` variable per shipped path. An equivalence clause ties
//! those together, so a capability cannot be selected without installing the
//! package behind it.
//!
//! The formula is built in five passes:
//!
//! 1. Deduplicate by package string and apply the allow/ignore policy
//! 2. Keep only the best version per name unless `nobest` is set
//! 3. Mint variables and index them by provided name
//! 4. Emit equivalence, requires and conflicts clauses
//! 5. Assert the newest candidate of every requested name
//!
//! All iteration feeding the output goes through ordered collections, so
//! identical input always yields an identical formula.

use super::formula::{Formula, VarId};
use super::options::PackageFilter;
use crate::error::{Error, Result};
use crate::repository::Package;
use crate::version::{Entry, Version};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt::Write as _;
use tracing::{debug, info};

/// What a variable stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum VarType {
    /// The package itself (its self-provide)
    Package,
    /// A further provide entry
    Resource,
    /// A shipped file path
    File,
}

/// Identifies the capability behind a variable
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VarContext {
    /// Package string of the owner
    pub package: String,
    /// Provided name or file path
    pub provides: String,
    /// Provided version, empty for nominal provides and files
    pub version: String,
}

/// One SAT variable and what it means
#[derive(Debug, Clone)]
pub struct Variable {
    pub id: VarId,
    pub kind: VarType,
    pub context: VarContext,
    /// Index of the owning package in [`Model::candidates`]
    pub package: usize,
    /// Version the capability is offered at
    pub resource_version: Version,
}

/// Encoder output
#[derive(Debug, Clone, Default)]
pub struct Model {
    /// Packages that received variables, sorted by name then version
    pub candidates: Vec<Package>,
    /// Package name → `Package` variables in ascending version order
    pub packages: BTreeMap<String, Vec<VarId>>,
    pub vars: BTreeMap<VarId, Variable>,
    /// Best candidate per name, computed before any `nobest` decision
    pub best_packages: BTreeMap<String, Package>,
    /// Package string → packages whose requires were blanked by policy
    pub force_ignored: BTreeMap<String, Package>,
    /// Provided name → every variable offering it, in minting order
    pub provides: BTreeMap<String, Vec<VarId>>,
    /// Hard constraints
    pub clauses: Vec<Formula>,
    /// Requested name → asserted variable
    pub assertions: Vec<(String, VarId)>,
}

impl Model {
    pub fn var_count(&self) -> usize {
        self.vars.len()
    }

    /// Clauses followed by the asserted unit clauses
    pub fn formula(&self) -> Vec<Formula> {
        self.clauses
            .iter()
            .cloned()
            .chain(self.assertions.iter().map(|(_, id)| Formula::var(*id)))
            .collect()
    }

    /// Textual form of the whole formula, one clause per line
    pub fn render(&self) -> String {
        let mut out = String::new();
        for clause in self.formula() {
            let _ = writeln!(out, "{}", clause);
        }
        out
    }
}

/// Builds a [`Model`] from reduced packages
pub struct Encoder<'a> {
    filter: &'a PackageFilter,
    nobest: bool,
}

impl<'a> Encoder<'a> {
    pub fn new(filter: &'a PackageFilter, nobest: bool) -> Self {
        Self { filter, nobest }
    }

    /// Encode `involved`, asserting one candidate for each `matched` name
    pub fn encode(&self, involved: &[Package], matched: &[String]) -> Result<Model> {
        let mut model = Model::default();

        let unique = self.deduplicate(involved, &mut model);
        model.candidates = self.select(unique, &mut model);

        let groups = Self::mint_variables(&mut model);
        self.emit_clauses(&mut model, &groups);
        Self::assert_requested(&mut model, matched)?;

        info!(
            "Encoded {} candidates into {} variables and {} clauses",
            model.candidates.len(),
            model.vars.len(),
            model.clauses.len()
        );
        Ok(model)
    }

    fn deduplicate(&self, involved: &[Package], model: &mut Model) -> Vec<Package> {
        let mut unique: Vec<Package> = Vec::new();
        let mut seen: HashMap<String, usize> = HashMap::new();

        for pkg in involved {
            let key = pkg.to_string();
            let slot = match seen.get(&key) {
                Some(&index) if pkg.repository.priority < unique[index].repository.priority => {
                    debug!(
                        "Preferring {} from {} over {}",
                        key, pkg.repository.name, unique[index].repository.name
                    );
                    index
                }
                Some(_) => continue,
                None => {
                    seen.insert(key.clone(), unique.len());
                    unique.push(pkg.clone());
                    unique.len() - 1
                }
            };

            let mut pkg = pkg.clone();
            let allowed = self.filter.is_allowed(&pkg.name);
            let ignored = self.filter.is_ignored(&pkg.name);
            if !allowed || ignored {
                debug!(
                    "Ignoring requirements of {} ({})",
                    key,
                    if ignored { "ignore regex" } else { "not allowed" }
                );
                pkg.format.requires.clear();
                model.force_ignored.insert(key, pkg.clone());
            }
            unique[slot] = pkg;
        }
        unique
    }

    fn select(&self, unique: Vec<Package>, model: &mut Model) -> Vec<Package> {
        for pkg in &unique {
            let better = match model.best_packages.get(&pkg.name) {
                Some(best) => pkg.compare(best).is_gt(),
                None => true,
            };
            if better {
                model.best_packages.insert(pkg.name.clone(), pkg.clone());
            }
        }

        if !self.nobest {
            return model.best_packages.values().cloned().collect();
        }

        let mut all = unique;
        all.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.compare(b)));
        all
    }

    /// Mint variables for every candidate; returns the variables per candidate
    fn mint_variables(model: &mut Model) -> Vec<Vec<VarId>> {
        let mut next = 0u32;
        let mut groups = Vec::with_capacity(model.candidates.len());

        for (index, pkg) in model.candidates.iter().enumerate() {
            let package = pkg.to_string();
            let mut group = Vec::new();
            let mut mint = |kind: VarType, provides: &str, version: Version| {
                let id = VarId(next);
                next += 1;
                let variable = Variable {
                    id,
                    kind,
                    context: VarContext {
                        package: package.clone(),
                        provides: provides.to_string(),
                        version: if version.is_empty() {
                            String::new()
                        } else {
                            version.to_string()
                        },
                    },
                    package: index,
                    resource_version: version,
                };
                model.vars.insert(id, variable);
                model
                    .provides
                    .entry(provides.to_string())
                    .or_default()
                    .push(id);
                group.push(id);
                id
            };

            let own = pkg.format.provides.iter().position(|e| e.name == pkg.name);
            let package_var = match own {
                Some(position) => {
                    let entry = &pkg.format.provides[position];
                    mint(VarType::Package, &entry.name, entry.version.clone())
                }
                None => mint(VarType::Package, &pkg.name, pkg.version.clone()),
            };

            for (position, entry) in pkg.format.provides.iter().enumerate() {
                if Some(position) != own {
                    mint(VarType::Resource, &entry.name, entry.version.clone());
                }
            }
            for file in &pkg.format.files {
                mint(VarType::File, &file.text, Version::default());
            }

            model
                .packages
                .entry(pkg.name.clone())
                .or_default()
                .push(package_var);
            groups.push(group);
        }
        groups
    }

    fn emit_clauses(&self, model: &mut Model, groups: &[Vec<VarId>]) {
        let mut clauses = Vec::new();

        for (index, pkg) in model.candidates.iter().enumerate() {
            let group = &groups[index];
            let package_var = group[0];
            let all: Vec<Formula> = group.iter().copied().map(Formula::var).collect();

            for &id in group {
                clauses.push(Formula::implies(Formula::var(id), Formula::and(all.clone())));
            }

            let mut uniques = Vec::with_capacity(pkg.format.requires.len());
            let mut satisfiable = true;
            for require in &pkg.format.requires {
                let chosen = satisfiers(model, require, None);
                if chosen.is_empty() {
                    debug!(
                        "Nothing provides {} needed by {}, forbidding it",
                        require, pkg
                    );
                    satisfiable = false;
                    break;
                }
                uniques.push(Formula::exactly_one(
                    chosen.into_iter().map(Formula::var).collect(),
                ));
            }
            if !satisfiable {
                clauses.push(Formula::implies(
                    Formula::var(package_var),
                    Formula::not(Formula::var(package_var)),
                ));
            } else if !uniques.is_empty() {
                clauses.push(Formula::implies(
                    Formula::var(package_var),
                    Formula::and(uniques),
                ));
            }

            let conflicting: BTreeSet<VarId> = pkg
                .format
                .conflicts
                .iter()
                .flat_map(|conflict| satisfiers(model, conflict, Some(index)))
                .collect();
            if !conflicting.is_empty() {
                clauses.push(Formula::implies(
                    Formula::var(package_var),
                    Formula::not(Formula::or(
                        conflicting.into_iter().map(Formula::var).collect(),
                    )),
                ));
            }
        }

        // Two builds of one name never share a root
        if self.nobest {
            for versions in model.packages.values().filter(|v| v.len() > 1) {
                for &id in versions {
                    let others: Vec<Formula> = versions
                        .iter()
                        .filter(|&&other| other != id)
                        .copied()
                        .map(Formula::var)
                        .collect();
                    clauses.push(Formula::implies(
                        Formula::var(id),
                        Formula::not(Formula::or(others)),
                    ));
                }
            }
        }

        model.clauses = clauses;
    }

    fn assert_requested(model: &mut Model, matched: &[String]) -> Result<()> {
        let names: BTreeSet<&String> = matched.iter().collect();

        for name in names {
            let providers = model.provides.get(name.as_str()).cloned().unwrap_or_default();
            let newest = providers
                .iter()
                .copied()
                .filter(|id| model.candidates[model.vars[id].package].name == *name)
                .max_by(|a, b| {
                    let pa = &model.candidates[model.vars[a].package];
                    let pb = &model.candidates[model.vars[b].package];
                    pa.compare(pb)
                })
                .ok_or_else(|| Error::UnknownRoot(name.clone()))?;

            debug!("Asserting {} ({}) for {}", newest, model.vars[&newest].context.package, name);
            model.assertions.push((name.clone(), newest));
        }
        Ok(())
    }
}

/// Variables satisfying `entry`, at most one per candidate package
///
/// Provider variables are bucketed by owning package; the first variable of
/// each bucket whose version satisfies the entry is chosen. The bucket of
/// `exclude` is skipped.
fn satisfiers(model: &Model, entry: &Entry, exclude: Option<usize>) -> Vec<VarId> {
    let Some(providers) = model.provides.get(&entry.name) else {
        return Vec::new();
    };

    let mut buckets: BTreeMap<usize, Vec<&Variable>> = BTreeMap::new();
    for id in providers {
        let var = &model.vars[id];
        buckets.entry(var.package).or_default().push(var);
    }

    buckets
        .into_iter()
        .filter(|(package, _)| Some(*package) != exclude)
        .filter_map(|(_, vars)| {
            vars.into_iter()
                .find(|var| entry.satisfies(&var.resource_version))
                .map(|var| var.id)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{ProvidedFile, Repository};
    use crate::version::Flags;
    use std::sync::Arc;

    fn pkg(name: &str, version: &str) -> Package {
        let mut pkg = Package::new(
            name,
            "x86_64",
            Version::parse(version).unwrap(),
            Arc::new(Repository::new("test")),
        );
        pkg.format.provides.push(pkg.self_provide());
        pkg
    }

    fn encode(packages: &[Package], matched: &[&str], nobest: bool) -> Model {
        let filter = PackageFilter::default();
        let matched: Vec<String> = matched.iter().map(|s| s.to_string()).collect();
        Encoder::new(&filter, nobest).encode(packages, &matched).unwrap()
    }

    #[test]
    fn test_variables_per_provide_and_file() {
        let mut a = pkg("a", "1-1");
        a.format.provides.push(Entry::new("virtual"));
        a.format.files.push(ProvidedFile::new("/usr/bin/a"));

        let model = encode(&[a], &["a"], false);
        let kinds: Vec<VarType> = model.vars.values().map(|v| v.kind).collect();
        assert_eq!(kinds, vec![VarType::Package, VarType::Resource, VarType::File]);
        assert_eq!(model.packages["a"], vec![VarId(0)]);
        assert_eq!(model.provides["/usr/bin/a"], vec![VarId(2)]);
        assert_eq!(model.vars[&VarId(0)].context.version, "0:1-1");
        assert_eq!(model.vars[&VarId(1)].context.version, "");
    }

    #[test]
    fn test_render_equivalence_and_assertion() {
        let mut a = pkg("a", "1-1");
        a.format.provides.push(Entry::new("virtual"));

        let model = encode(&[a], &["a"], false);
        assert_eq!(
            model.render(),
            "(x0 -> (x0 & x1))\n(x1 -> (x0 & x1))\nx0\n"
        );
    }

    #[test]
    fn test_requires_choose_one_provider_per_package() {
        let mut a = pkg("a", "1-1");
        a.format.requires.push(Entry::new("cap"));
        let mut b = pkg("b", "1-1");
        b.format.provides.push(Entry::new("cap"));
        let mut c = pkg("c", "1-1");
        c.format.provides.push(Entry::new("cap"));

        let model = encode(&[a, b, c], &["a"], false);
        // a: x0, b: x1 x2, c: x3 x4
        assert!(model
            .clauses
            .iter()
            .any(|f| f.to_string() == "(x0 -> (one(x2, x4)))"));
    }

    #[test]
    fn test_unsatisfied_require_forbids_package() {
        let mut a = pkg("a", "1-1");
        a.format.requires.push(Entry::new("missing"));

        let model = encode(&[a], &["a"], false);
        assert!(model.clauses.iter().any(|f| f.to_string() == "(x0 -> !x0)"));
    }

    #[test]
    fn test_versioned_require_filters_providers() {
        let mut a = pkg("a", "1-1");
        a.format.requires.push(Entry::versioned(
            "lib",
            Flags::Ge,
            Version::new("", "2", ""),
        ));
        let lib1 = pkg("lib", "1-1");
        let lib2 = pkg("lib", "2-1");

        let model = encode(&[a, lib1, lib2], &["a"], true);
        // a: x0, lib-1: x1, lib-2: x2
        assert!(model
            .clauses
            .iter()
            .any(|f| f.to_string() == "(x0 -> (one(x2)))"));
    }

    #[test]
    fn test_conflicts_skip_own_package() {
        let mut a = pkg("a", "1-1");
        a.format.provides.push(Entry::new("cap"));
        a.format.conflicts.push(Entry::new("cap"));
        let mut b = pkg("b", "1-1");
        b.format.provides.push(Entry::new("cap"));

        let model = encode(&[a, b], &["a"], false);
        // a: x0 x1, b: x2 x3
        assert!(model
            .clauses
            .iter()
            .any(|f| f.to_string() == "(x0 -> !(x3))"));
        assert!(!model.clauses.iter().any(|f| f.to_string().contains("!(x1")));
    }

    #[test]
    fn test_best_filter_keeps_newest() {
        let model = encode(&[pkg("b", "1-1"), pkg("b", "2-1")], &["b"], false);
        assert_eq!(model.candidates.len(), 1);
        assert_eq!(model.candidates[0].to_string(), "b-0:2-1.x86_64");
        assert_eq!(model.best_packages["b"].version, Version::new("", "2", "1"));
    }

    #[test]
    fn test_nobest_keeps_all_and_adds_exclusivity() {
        let model = encode(&[pkg("b", "2-1"), pkg("b", "1-1")], &["b"], true);
        let names: Vec<String> = model.candidates.iter().map(|p| p.to_string()).collect();
        assert_eq!(names, vec!["b-0:1-1.x86_64", "b-0:2-1.x86_64"]);
        assert_eq!(model.packages["b"], vec![VarId(0), VarId(1)]);
        assert!(model.clauses.iter().any(|f| f.to_string() == "(x0 -> !(x1))"));
        // newest version is asserted
        assert_eq!(model.assertions, vec![("b".to_string(), VarId(1))]);
    }

    #[test]
    fn test_ignore_regex_blanks_requires() {
        let mut a = pkg("a", "1-1");
        a.format.requires.push(Entry::new("b"));
        let mut b = pkg("b", "1-1");
        b.format.requires.push(Entry::new("c"));
        let c = pkg("c", "1-1");

        let filter = PackageFilter::new(&[], &["^b$".to_string()]).unwrap();
        let model = Encoder::new(&filter, false)
            .encode(&[a, b, c], &["a".to_string()])
            .unwrap();

        assert_eq!(
            model.force_ignored.keys().collect::<Vec<_>>(),
            vec!["b-0:1-1.x86_64"]
        );
        let b = model.candidates.iter().find(|p| p.name == "b").unwrap();
        assert!(b.format.requires.is_empty());
    }

    #[test]
    fn test_duplicate_prefers_better_priority() {
        let a = pkg("a", "1-1");
        let mut preferred = Repository::new("preferred");
        preferred.priority = 10;
        let mut a_preferred = a.clone();
        a_preferred.repository = Arc::new(preferred);

        let model = encode(&[a, a_preferred], &["a"], false);
        assert_eq!(model.candidates.len(), 1);
        assert_eq!(model.candidates[0].repository.name, "preferred");
    }

    #[test]
    fn test_unknown_matched_name() {
        let filter = PackageFilter::default();
        let err = Encoder::new(&filter, false)
            .encode(&[pkg("a", "1-1")], &["zzz".to_string()])
            .unwrap_err();
        assert!(matches!(err, Error::UnknownRoot(ref n) if n == "zzz"));
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let build = || {
            let mut a = pkg("a", "1-1");
            a.format.requires.push(Entry::new("cap"));
            let mut b = pkg("b", "1-1");
            b.format.provides.push(Entry::new("cap"));
            let mut c = pkg("c", "1-1");
            c.format.provides.push(Entry::new("cap"));
            vec![a, c, b]
        };
        assert_eq!(
            encode(&build(), &["a"], false).render(),
            encode(&build(), &["a"], false).render()
        );
    }
}
