// src/resolver/sat.rs

//! Solving an encoded [`Model`] with varisat
//!
//! The requested-root assertions are handed to the solver as assumptions
//! rather than unit clauses. When the problem is unsatisfiable the failed
//! core then names exactly the roots that could not be met.
//!
//! A satisfying assignment may switch on packages nothing needs. After the
//! first model is found, every selected package is tentatively switched off
//! in candidate order and kept off whenever the problem stays satisfiable,
//! which leaves a subset-minimal install set.

use super::cnf::CnfBuilder;
use super::encoder::{Model, VarType};
use crate::error::{Error, Result};
use crate::repository::Package;
use std::collections::HashSet;
use tracing::{debug, info};
use varisat::{Lit, Solver};

/// Classified solver outcome
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    /// Packages to install, sorted by name
    pub install: Vec<Package>,
    /// Encoded candidates the solver left out, sorted by name
    pub excluded: Vec<Package>,
    /// Packages whose requires were dropped by the allow/ignore policy
    pub force_ignored: Vec<Package>,
}

impl Resolution {
    pub fn install_names(&self) -> Vec<String> {
        self.install.iter().map(|p| p.name.clone()).collect()
    }
}

/// Solve `model` and classify every candidate
pub fn solve(model: &Model) -> Result<Resolution> {
    let mut builder = CnfBuilder::new(model.var_count());
    for clause in &model.clauses {
        builder.assert(clause);
    }
    debug!(
        "Lowered {} formulas to {} CNF clauses",
        model.clauses.len(),
        builder.clause_count()
    );

    let mut solver = Solver::new();
    solver.add_formula(&builder.finish());

    let assumptions: Vec<Lit> = model
        .assertions
        .iter()
        .map(|(_, id)| CnfBuilder::literal(*id))
        .collect();
    solver.assume(&assumptions);

    let satisfiable = solver
        .solve()
        .map_err(|e| Error::SolverError(format!("{:?}", e)))?;

    if !satisfiable {
        let core: HashSet<Lit> = solver
            .failed_core()
            .map(|core| core.iter().copied().collect())
            .unwrap_or_default();
        return Err(Error::Unsatisfiable {
            roots: failed_roots(model, &core),
        });
    }

    let chosen = minimize(&mut solver, model, assumptions)?;

    let mut resolution = Resolution::default();
    for var in model.vars.values().filter(|v| v.kind == VarType::Package) {
        let pkg = &model.candidates[var.package];
        if !chosen.contains(&var.id.index()) {
            resolution.excluded.push(pkg.clone());
        } else if model.force_ignored.contains_key(&pkg.to_string()) {
            debug!("{} is provided by ignored package {}", var.context.provides, pkg);
        } else {
            resolution.install.push(pkg.clone());
        }
    }
    resolution.force_ignored = model.force_ignored.values().cloned().collect();

    let by_name = |a: &Package, b: &Package| {
        a.name
            .cmp(&b.name)
            .then_with(|| a.to_string().cmp(&b.to_string()))
    };
    resolution.install.sort_by(by_name);
    resolution.excluded.sort_by(by_name);
    resolution.force_ignored.sort_by(by_name);

    info!(
        "Solved: {} to install, {} excluded, {} ignored",
        resolution.install.len(),
        resolution.excluded.len(),
        resolution.force_ignored.len()
    );
    Ok(resolution)
}

/// Variable indices set to true in the current model
fn true_vars(solver: &Solver) -> Result<HashSet<usize>> {
    let assignment = solver
        .model()
        .ok_or_else(|| Error::SolverError("satisfiable problem without a model".to_string()))?;
    Ok(assignment
        .iter()
        .filter(|lit| lit.is_positive())
        .map(|lit| lit.var().index())
        .collect())
}

/// Switch off every package the assumptions do not force on
fn minimize(solver: &mut Solver, model: &Model, mut assumptions: Vec<Lit>) -> Result<HashSet<usize>> {
    let mut chosen = true_vars(solver)?;
    let mut dropped = 0usize;

    for var in model.vars.values().filter(|v| v.kind == VarType::Package) {
        let lit = CnfBuilder::literal(var.id);
        if assumptions.contains(&lit) {
            continue;
        }

        // Visited packages stay off, or a later solve could switch them back on
        assumptions.push(!lit);
        if !chosen.contains(&var.id.index()) {
            continue;
        }

        solver.assume(&assumptions);
        let satisfiable = solver
            .solve()
            .map_err(|e| Error::SolverError(format!("{:?}", e)))?;
        if satisfiable {
            chosen = true_vars(solver)?;
            dropped += 1;
        } else if let Some(last) = assumptions.last_mut() {
            *last = lit;
        }
    }

    debug!("Minimization dropped {} optional packages", dropped);
    Ok(chosen)
}

/// Requested names whose assertion appears in the failed core
///
/// An empty core means the hard clauses alone conflict; every root is
/// reported in that case.
fn failed_roots(model: &Model, core: &HashSet<Lit>) -> Vec<String> {
    let mut roots: Vec<String> = model
        .assertions
        .iter()
        .filter(|(_, id)| core.contains(&CnfBuilder::literal(*id)))
        .map(|(name, _)| name.clone())
        .collect();
    if roots.is_empty() {
        roots = model.assertions.iter().map(|(name, _)| name.clone()).collect();
    }
    roots
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::encoder::Encoder;
    use crate::resolver::options::PackageFilter;
    use crate::repository::Repository;
    use crate::version::{Entry, Version};
    use std::sync::Arc;

    fn pkg(name: &str, version: &str, provides: &[&str], requires: &[&str]) -> Package {
        let mut pkg = Package::new(
            name,
            "x86_64",
            Version::parse(version).unwrap(),
            Arc::new(Repository::new("test")),
        );
        pkg.format.provides.push(pkg.self_provide());
        pkg.format.provides.extend(provides.iter().map(|p| Entry::new(*p)));
        pkg.format.requires = requires.iter().map(|r| Entry::new(*r)).collect();
        pkg
    }

    fn solve_for(packages: &[Package], matched: &[&str]) -> Result<Resolution> {
        let filter = PackageFilter::default();
        let matched: Vec<String> = matched.iter().map(|s| s.to_string()).collect();
        let model = Encoder::new(&filter, false).encode(packages, &matched)?;
        solve(&model)
    }

    #[test]
    fn test_solve_installs_dependencies() {
        let packages = vec![
            pkg("a", "1-1", &[], &["cap"]),
            pkg("b", "1-1", &["cap"], &[]),
            pkg("c", "1-1", &[], &[]),
        ];
        let resolution = solve_for(&packages, &["a"]).unwrap();
        assert_eq!(resolution.install_names(), vec!["a", "b"]);
        let excluded: Vec<_> = resolution.excluded.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(excluded, vec!["c"]);
    }

    #[test]
    fn test_solve_result_is_subset_minimal() {
        // p03 is an alternative cap5 provider that drags in p05; p09 is optional
        let packages = vec![
            pkg("p00", "1-1", &[], &["cap5"]),
            pkg("p03", "1-1", &["cap5"], &["cap0"]),
            pkg("p05", "1-1", &["cap0", "cap1"], &[]),
            pkg("p07", "1-1", &["cap5"], &["cap5"]),
            pkg("p09", "1-1", &[], &["cap1"]),
        ];
        let resolution = solve_for(&packages, &["p00"]).unwrap();
        assert_eq!(resolution.install_names(), vec!["p00", "p07"]);
        let excluded: Vec<_> = resolution.excluded.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(excluded, vec!["p03", "p05", "p09"]);
    }

    #[test]
    fn test_solve_unsatisfiable_reports_root() {
        let packages = vec![
            pkg("a", "1-1", &[], &["missing"]),
            pkg("b", "1-1", &[], &[]),
        ];
        let err = solve_for(&packages, &["a", "b"]).unwrap_err();
        match err {
            Error::Unsatisfiable { roots } => assert_eq!(roots, vec!["a"]),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_solve_conflict_between_roots() {
        let mut a = pkg("a", "1-1", &[], &[]);
        a.format.conflicts.push(Entry::new("b"));
        let b = pkg("b", "1-1", &[], &[]);

        let err = solve_for(&[a, b], &["a", "b"]).unwrap_err();
        match err {
            Error::Unsatisfiable { roots } => assert_eq!(roots, vec!["a", "b"]),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_solve_force_ignored_not_installed() {
        let packages = vec![
            pkg("a", "1-1", &[], &["b"]),
            pkg("b", "1-1", &[], &["c"]),
            pkg("c", "1-1", &[], &[]),
        ];
        let filter = PackageFilter::new(&[], &["^b$".to_string()]).unwrap();
        let model = Encoder::new(&filter, false)
            .encode(&packages, &["a".to_string()])
            .unwrap();
        let resolution = solve(&model).unwrap();

        assert_eq!(resolution.install_names(), vec!["a"]);
        assert_eq!(resolution.force_ignored.len(), 1);
        assert_eq!(resolution.force_ignored[0].name, "b");
    }
}
