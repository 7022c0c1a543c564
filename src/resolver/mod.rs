// src/resolver/mod.rs

//! Dependency resolution over a loaded package universe
//!
//! Resolution runs as three sequential stages, each consuming the previous
//! stage's output by value:
//!
//! - [`reduce`] prunes the universe to packages reachable from the request
//! - [`Encoder`] turns the involved packages into a Boolean formula
//! - [`sat::solve`] finds a model and classifies every candidate
//!
//! [`Resolver`] wires the three together for callers that only want the
//! outcome.

pub mod cnf;
pub mod encoder;
pub mod formula;
pub mod options;
pub mod reduce;
pub mod sat;

pub use encoder::{Encoder, Model, VarContext, VarType, Variable};
pub use formula::{Formula, VarId};
pub use options::{PackageFilter, ResolveOptions};
pub use reduce::{reduce, Reduction};
pub use sat::{solve, Resolution};

use crate::error::Result;
use crate::repository::Universe;
use tracing::info;

/// Everything a resolution run produced
#[derive(Debug, Clone)]
pub struct Outcome {
    /// Requested names after binding to the universe, sorted
    pub targets: Vec<String>,
    pub model: Model,
    pub resolution: Resolution,
}

/// Runs reduce, encode and solve with one set of options
#[derive(Debug, Clone)]
pub struct Resolver {
    options: ResolveOptions,
    filter: PackageFilter,
}

impl Resolver {
    /// Compile the policy expressions in `options`
    pub fn new(options: ResolveOptions) -> Result<Self> {
        let filter = PackageFilter::from_options(&options)?;
        Ok(Self { options, filter })
    }

    /// Resolve `packages` (plus the implicit roots) against `universe`
    pub fn resolve(&self, universe: &Universe, packages: &[String]) -> Result<Outcome> {
        info!("Resolving {} requested packages", packages.len());

        let reduction = reduce(
            universe,
            packages,
            &self.options.implicit_roots,
            self.options.ignore_missing,
        )?;
        let targets = reduction.matched_names();

        let model = Encoder::new(&self.filter, self.options.nobest)
            .encode(&reduction.involved, &targets)?;
        let resolution = solve(&model)?;

        Ok(Outcome {
            targets,
            model,
            resolution,
        })
    }
}
