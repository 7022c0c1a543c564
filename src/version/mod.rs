// src/version/mod.rs

//! Version handling and constraint satisfaction for package dependencies
//!
//! This module provides RPM-style version comparison (`rpmvercmp`) and the
//! provide/require entry algebra used by the reducer, the SAT encoder and the
//! lock file projector.

use crate::error::{Error, Result};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// An RPM version triple
///
/// Components are kept as the raw strings found in repository metadata. An
/// all-empty version denotes a purely nominal provide (`Provides: foo`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Version {
    pub epoch: String,
    pub ver: String,
    pub rel: String,
}

impl Version {
    pub fn new(epoch: impl Into<String>, ver: impl Into<String>, rel: impl Into<String>) -> Self {
        Self {
            epoch: epoch.into(),
            ver: ver.into(),
            rel: rel.into(),
        }
    }

    /// Parse an RPM version string
    ///
    /// Format: [epoch:]version[-release]
    /// Examples:
    /// - "1.2.3" → epoch="", ver="1.2.3", rel=""
    /// - "2:1.2.3" → epoch="2", ver="1.2.3", rel=""
    /// - "1:2.3.4-5.el8" → epoch="1", ver="2.3.4", rel="5.el8"
    pub fn parse(s: &str) -> Result<Self> {
        let (epoch, rest) = match s.split_once(':') {
            Some((e, r)) => (e, r),
            None => ("", s),
        };

        if !epoch.is_empty() && !epoch.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::ParseError(format!(
                "Invalid epoch in version '{}'",
                s
            )));
        }

        let (ver, rel) = rest.split_once('-').unwrap_or((rest, ""));
        if ver.is_empty() {
            return Err(Error::ParseError(format!(
                "Empty version component in '{}'",
                s
            )));
        }

        Ok(Self::new(epoch, ver, rel))
    }

    /// True for a nominal (unversioned) provide
    pub fn is_empty(&self) -> bool {
        self.epoch.is_empty() && self.ver.is_empty() && self.rel.is_empty()
    }

    /// Compare epoch numerically, then version and release with `rpmvercmp`
    pub fn compare(&self, other: &Version) -> Ordering {
        let epoch = match (epoch_number(&self.epoch), epoch_number(&other.epoch)) {
            (Some(a), Some(b)) => a.cmp(&b),
            _ => rpmvercmp(&self.epoch, &other.epoch),
        };

        epoch
            .then_with(|| rpmvercmp(&self.ver, &other.ver))
            .then_with(|| rpmvercmp(&self.rel, &other.rel))
    }
}

fn epoch_number(epoch: &str) -> Option<u128> {
    if epoch.is_empty() {
        return Some(0);
    }
    epoch.parse().ok()
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let epoch = if self.epoch.is_empty() { "0" } else { &self.epoch };
        write!(f, "{}:{}", epoch, self.ver)?;
        if !self.rel.is_empty() {
            write!(f, "-{}", self.rel)?;
        }
        Ok(())
    }
}

/// Compare two version or release strings the way rpm does
///
/// Strings are split into alternating runs of digits and ASCII letters; any
/// other character only separates segments. `~` sorts before everything
/// (even the end of the string), `^` sorts after the end of the string but
/// before any further segment.
pub fn rpmvercmp(a: &str, b: &str) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }

    let mut one = a.as_bytes();
    let mut two = b.as_bytes();

    while !one.is_empty() || !two.is_empty() {
        one = skip_separators(one);
        two = skip_separators(two);

        if one.first() == Some(&b'~') || two.first() == Some(&b'~') {
            if one.first() != Some(&b'~') {
                return Ordering::Greater;
            }
            if two.first() != Some(&b'~') {
                return Ordering::Less;
            }
            one = &one[1..];
            two = &two[1..];
            continue;
        }

        if one.first() == Some(&b'^') || two.first() == Some(&b'^') {
            if one.is_empty() {
                return Ordering::Less;
            }
            if two.is_empty() {
                return Ordering::Greater;
            }
            if one[0] != b'^' {
                return Ordering::Greater;
            }
            if two[0] != b'^' {
                return Ordering::Less;
            }
            one = &one[1..];
            two = &two[1..];
            continue;
        }

        if one.is_empty() || two.is_empty() {
            break;
        }

        let numeric = one[0].is_ascii_digit();
        let (seg1, rest1) = split_segment(one, numeric);
        let (seg2, rest2) = split_segment(two, numeric);
        one = rest1;
        two = rest2;

        // Segments of different kinds: numbers are newer than letters
        if seg2.is_empty() {
            return if numeric {
                Ordering::Greater
            } else {
                Ordering::Less
            };
        }

        let ord = if numeric {
            compare_numeric(seg1, seg2)
        } else {
            seg1.cmp(seg2)
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }

    match (one.is_empty(), two.is_empty()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        _ => Ordering::Greater,
    }
}

fn skip_separators(s: &[u8]) -> &[u8] {
    let start = s
        .iter()
        .position(|&c| c.is_ascii_alphanumeric() || c == b'~' || c == b'^')
        .unwrap_or(s.len());
    &s[start..]
}

fn split_segment(s: &[u8], numeric: bool) -> (&[u8], &[u8]) {
    let end = s
        .iter()
        .position(|c| {
            if numeric {
                !c.is_ascii_digit()
            } else {
                !c.is_ascii_alphabetic()
            }
        })
        .unwrap_or(s.len());
    s.split_at(end)
}

fn compare_numeric(a: &[u8], b: &[u8]) -> Ordering {
    let a = strip_leading_zeros(a);
    let b = strip_leading_zeros(b);
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

fn strip_leading_zeros(s: &[u8]) -> &[u8] {
    let start = s.iter().position(|&c| c != b'0').unwrap_or(s.len());
    &s[start..]
}

/// Comparison operator attached to a provide, require or conflict entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Flags {
    /// No version constraint
    #[default]
    Any,
    Eq,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Flags {
    pub fn as_str(&self) -> &'static str {
        match self {
            Flags::Any => "",
            Flags::Eq => "EQ",
            Flags::Lt => "LT",
            Flags::Le => "LE",
            Flags::Gt => "GT",
            Flags::Ge => "GE",
        }
    }
}

impl fmt::Display for Flags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Flags {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "" => Ok(Flags::Any),
            "EQ" => Ok(Flags::Eq),
            "LT" => Ok(Flags::Lt),
            "LE" => Ok(Flags::Le),
            "GT" => Ok(Flags::Gt),
            "GE" => Ok(Flags::Ge),
            other => Err(other.to_string()),
        }
    }
}

/// A provide, require or conflict entry
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Entry {
    pub name: String,
    pub flags: Flags,
    pub version: Version,
}

impl Entry {
    /// An unversioned entry
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            flags: Flags::Any,
            version: Version::default(),
        }
    }

    pub fn versioned(name: impl Into<String>, flags: Flags, version: Version) -> Self {
        Self {
            name: name.into(),
            flags,
            version,
        }
    }

    /// Build an entry from the raw attribute strings of repository metadata
    pub fn from_raw(name: &str, flags: &str, epoch: &str, ver: &str, rel: &str) -> Result<Self> {
        let version = Version::new(epoch, ver, rel);
        let flags = flags.parse::<Flags>().map_err(|flag| Error::UnsupportedFlag {
            flag,
            entry: name.to_string(),
        })?;
        Ok(Self::versioned(name, flags, version))
    }

    /// Check whether a provider at version `provided` satisfies this entry
    pub fn satisfies(&self, provided: &Version) -> bool {
        if provided.is_empty() || self.flags == Flags::Any {
            return true;
        }

        let mut wanted = self.version.clone();
        let mut have = provided.clone();
        if have.rel.is_empty() {
            wanted.rel.clear();
        }
        if wanted.rel.is_empty() {
            have.rel.clear();
        }

        let cmp = have.compare(&wanted);
        match self.flags {
            Flags::Any => true,
            Flags::Eq => cmp == Ordering::Equal,
            Flags::Le => cmp != Ordering::Greater,
            Flags::Ge => cmp != Ordering::Less,
            Flags::Lt => cmp == Ordering::Less,
            Flags::Gt => cmp == Ordering::Greater,
        }
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.flags == Flags::Any {
            return f.write_str(&self.name);
        }
        write!(
            f,
            "{}-{}-{}:{}-{}",
            self.name, self.flags, self.version.epoch, self.version.ver, self.version.rel
        )
    }
}
