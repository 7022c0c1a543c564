// src/error.rs

//! Error types shared by every stage of the resolution pipeline

use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced while loading, reducing, solving or projecting
#[derive(Error, Debug)]
pub enum Error {
    /// Unreadable file or failed write
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Malformed repository XML
    #[error("Failed to decode repository metadata {path}: {reason}")]
    XmlError { path: String, reason: String },

    /// Malformed value inside otherwise well-formed input
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Malformed repository descriptor file
    #[error("Failed to parse repository descriptor: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// Malformed or unserializable lock file
    #[error("Lock file error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// A requested package matches nothing in the universe
    #[error("package {0} does not exist")]
    UnknownRoot(String),

    /// A version-qualified request matches no candidate version
    #[error("no version of {name} matches the request {request}")]
    AmbiguousVersionRequest { name: String, request: String },

    /// An entry carries a comparison flag outside EQ/LT/LE/GT/GE
    #[error("unsupported comparison flag '{flag}' on entry {entry}")]
    UnsupportedFlag { flag: String, entry: String },

    /// An installed package requires something nothing provides
    #[error("could not find provider for {requirement} (required by {package})")]
    MissingProvider { requirement: String, package: String },

    /// The SAT solver proved the request cannot be met
    #[error("could not satisfy the requested packages: {}", roots.join(", "))]
    Unsatisfiable { roots: Vec<String> },

    /// Invalid allow or ignore expression
    #[error("invalid package regex: {0}")]
    RegexError(#[from] regex::Error),

    /// Package checksum is not a hex digest
    #[error("invalid checksum '{checksum}' for package {package}")]
    InvalidChecksum { package: String, checksum: String },

    /// The SAT backend failed for a reason other than unsatisfiability
    #[error("SAT solver failure: {0}")]
    SolverError(String),
}

impl Error {
    /// Build an [`Error::XmlError`] from anything displayable
    pub(crate) fn xml(path: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Error::XmlError {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
