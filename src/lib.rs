// src/lib.rs

//! rpmclosure: deterministic RPM dependency closure for container images
//!
//! Given RPM repository metadata and a list of requested packages, compute a
//! minimal, conflict-free closed set of packages and record it in a lock
//! file.
//!
//! # Architecture
//!
//! - Loader: decodes `primary.xml` metadata into a package universe
//! - Reducer: prunes the universe to what the request can reach
//! - Encoder: turns RPM semantics into a Boolean formula
//! - SAT driver: solves the formula and classifies every candidate
//! - Lock file: projects the install set into a sorted, acyclic document

mod error;
pub mod lockfile;
pub mod repository;
pub mod resolver;
pub mod version;

pub use error::{Error, Result};
pub use lockfile::{LockFile, LockedPackage};
pub use repository::{Loader, Package, Repository, RepositoryConfig, Universe};
pub use resolver::{Outcome, ResolveOptions, Resolver};
pub use version::{Entry, Flags, Version};
