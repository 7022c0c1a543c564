// src/resolver/options.rs

//! Resolution options and the allow/ignore package policy

use crate::error::Result;
use regex::Regex;

/// Knobs controlling a single resolution run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Target architecture; `noarch` is always accepted as well
    pub arch: String,
    /// Keep every candidate version instead of only the best one per name
    pub nobest: bool,
    /// Skip requested roots that match nothing instead of failing
    pub ignore_missing: bool,
    /// When non-empty, only package names matching one of these may pull in
    /// their own requirements
    pub allow_regex: Vec<String>,
    /// Package names matching any of these never pull in their requirements
    pub ignore_regex: Vec<String>,
    /// Roots resolved in addition to the requested packages (base system)
    pub implicit_roots: Vec<String>,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            arch: "x86_64".to_string(),
            nobest: false,
            ignore_missing: false,
            allow_regex: Vec::new(),
            ignore_regex: Vec::new(),
            implicit_roots: Vec::new(),
        }
    }
}

/// Compiled allow/ignore expressions
#[derive(Debug, Clone, Default)]
pub struct PackageFilter {
    allow: Vec<Regex>,
    ignore: Vec<Regex>,
}

impl PackageFilter {
    pub fn new(allow: &[String], ignore: &[String]) -> Result<Self> {
        Ok(Self {
            allow: compile(allow)?,
            ignore: compile(ignore)?,
        })
    }

    pub fn from_options(options: &ResolveOptions) -> Result<Self> {
        Self::new(&options.allow_regex, &options.ignore_regex)
    }

    /// False when an allow list exists and `name` matches none of it
    pub fn is_allowed(&self, name: &str) -> bool {
        self.allow.is_empty() || self.allow.iter().any(|re| re.is_match(name))
    }

    pub fn is_ignored(&self, name: &str) -> bool {
        self.ignore.iter().any(|re| re.is_match(name))
    }
}

fn compile(patterns: &[String]) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|pattern| Ok(Regex::new(pattern)?))
        .collect()
}
