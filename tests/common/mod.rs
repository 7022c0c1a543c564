// tests/common/mod.rs

//! Shared test utilities and helpers for integration tests.

#![allow(dead_code)]

use rpmclosure::repository::{Checksum, ProvidedFile};
use rpmclosure::{
    Entry, Flags, Loader, LockFile, Outcome, Package, Repository, ResolveOptions, Resolver,
    Result, Universe, Version,
};
use std::fmt::Write as _;
use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Repository with a single mirror, default priority
pub fn repo(name: &str) -> Arc<Repository> {
    let mut repo = Repository::new(name);
    repo.mirrors = vec![format!("https://mirror.example.com/{}/", name)];
    Arc::new(repo)
}

/// Fluent package construction for fixtures
pub struct PackageBuilder {
    pkg: Package,
}

impl PackageBuilder {
    pub fn new(name: &str, version: &str) -> Self {
        let mut pkg = Package::new(name, "x86_64", Version::parse(version).unwrap(), repo("test"));
        pkg.location.href = format!("Packages/{}-{}.x86_64.rpm", name, version);
        pkg.checksum = Checksum {
            value: fake_digest(name, version),
            algorithm: "sha256".to_string(),
            pkgid: true,
        };
        Self { pkg }
    }

    pub fn arch(mut self, arch: &str) -> Self {
        self.pkg.arch = arch.to_string();
        self
    }

    pub fn repository(mut self, repository: Arc<Repository>) -> Self {
        self.pkg.repository = repository;
        self
    }

    pub fn provides(mut self, names: &[&str]) -> Self {
        self.pkg
            .format
            .provides
            .extend(names.iter().map(|n| Entry::new(*n)));
        self
    }

    pub fn provides_versioned(mut self, name: &str, version: &str) -> Self {
        self.pkg.format.provides.push(Entry::versioned(
            name,
            Flags::Eq,
            Version::parse(version).unwrap(),
        ));
        self
    }

    pub fn requires(mut self, names: &[&str]) -> Self {
        self.pkg
            .format
            .requires
            .extend(names.iter().map(|n| Entry::new(*n)));
        self
    }

    pub fn requires_versioned(mut self, name: &str, flags: Flags, version: &str) -> Self {
        self.pkg.format.requires.push(Entry::versioned(
            name,
            flags,
            Version::parse(version).unwrap(),
        ));
        self
    }

    pub fn conflicts(mut self, names: &[&str]) -> Self {
        self.pkg
            .format
            .conflicts
            .extend(names.iter().map(|n| Entry::new(*n)));
        self
    }

    pub fn files(mut self, paths: &[&str]) -> Self {
        self.pkg
            .format
            .files
            .extend(paths.iter().map(|p| ProvidedFile::new(*p)));
        self
    }

    pub fn build(self) -> Package {
        self.pkg
    }
}

pub fn pkg(name: &str, version: &str) -> PackageBuilder {
    PackageBuilder::new(name, version)
}

/// 32-byte hex digest derived from the package identity
fn fake_digest(name: &str, version: &str) -> String {
    let seed: u32 = name
        .bytes()
        .chain(version.bytes())
        .fold(17u32, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u32));
    (0..32u32)
        .map(|i| format!("{:02x}", (seed.wrapping_add(i * 7) & 0xff) as u8))
        .collect()
}

/// Index packages the way the loader does
pub fn universe(packages: Vec<Package>) -> Universe {
    Loader::new("x86_64").build(packages)
}

pub fn names(packages: &[Package]) -> Vec<String> {
    packages.iter().map(|p| p.name.clone()).collect()
}

pub fn resolve(universe: &Universe, request: &[&str], options: ResolveOptions) -> Result<Outcome> {
    let request: Vec<String> = request.iter().map(|s| s.to_string()).collect();
    Resolver::new(options)?.resolve(universe, &request)
}

pub fn resolve_default(universe: &Universe, request: &[&str]) -> Result<Outcome> {
    resolve(universe, request, ResolveOptions::default())
}

pub fn lock(outcome: &Outcome) -> Result<LockFile> {
    LockFile::project(
        &outcome.resolution.install,
        &outcome.resolution.force_ignored,
        &outcome.targets,
        Vec::new(),
    )
}

/// Scenario fixture: `testa` reaches `testc`, `testd` and `teste`; `testb`
/// is unrelated
pub fn indirect_fixture() -> Vec<Package> {
    vec![
        pkg("testa", "1").provides(&["a", "b"]).requires(&["d", "g"]).build(),
        pkg("testb", "1").provides(&["c"]).build(),
        pkg("testc", "1").provides(&["d"]).build(),
        pkg("testd", "1").provides(&["e", "f", "g"]).requires(&["h"]).build(),
        pkg("teste", "1").provides(&["h"]).build(),
    ]
}

/// Same as [`indirect_fixture`] with `teste` requiring back into `testa`
pub fn circular_fixture() -> Vec<Package> {
    vec![
        pkg("testa", "1").provides(&["a", "b"]).requires(&["d", "g"]).build(),
        pkg("testb", "1").provides(&["c"]).build(),
        pkg("testc", "1").provides(&["d"]).build(),
        pkg("testd", "1").provides(&["e", "f", "g"]).requires(&["h"]).build(),
        pkg("teste", "1").provides(&["h"]).requires(&["a"]).build(),
    ]
}

/// Render packages as an rpm-md `primary.xml` document
pub fn primary_xml(packages: &[Package]) -> String {
    let mut out = String::new();
    writeln!(out, r#"<?xml version="1.0" encoding="UTF-8"?>"#).unwrap();
    writeln!(
        out,
        r#"<metadata xmlns="http://linux.duke.edu/metadata/common" xmlns:rpm="http://linux.duke.edu/metadata/rpm" packages="{}">"#,
        packages.len()
    )
    .unwrap();

    for p in packages {
        writeln!(out, r#"<package type="rpm">"#).unwrap();
        writeln!(out, "  <name>{}</name>", p.name).unwrap();
        writeln!(out, "  <arch>{}</arch>", p.arch).unwrap();
        writeln!(
            out,
            r#"  <version epoch="{}" ver="{}" rel="{}"/>"#,
            p.version.epoch, p.version.ver, p.version.rel
        )
        .unwrap();
        writeln!(
            out,
            r#"  <checksum type="{}" pkgid="YES">{}</checksum>"#,
            p.checksum.algorithm, p.checksum.value
        )
        .unwrap();
        writeln!(out, r#"  <location href="{}"/>"#, p.location.href).unwrap();
        writeln!(out, r#"  <size package="1000" installed="4000" archive="4100"/>"#).unwrap();
        writeln!(out, "  <format>").unwrap();
        write_entries(&mut out, "provides", &p.format.provides);
        write_entries(&mut out, "requires", &p.format.requires);
        write_entries(&mut out, "conflicts", &p.format.conflicts);
        for file in &p.format.files {
            writeln!(out, "    <file>{}</file>", file.text).unwrap();
        }
        writeln!(out, "  </format>").unwrap();
        writeln!(out, "</package>").unwrap();
    }

    writeln!(out, "</metadata>").unwrap();
    out
}

fn write_entries(out: &mut String, list: &str, entries: &[Entry]) {
    if entries.is_empty() {
        return;
    }
    writeln!(out, "    <rpm:{}>", list).unwrap();
    for e in entries {
        if e.flags == Flags::Any {
            writeln!(out, r#"      <rpm:entry name="{}"/>"#, e.name).unwrap();
        } else {
            writeln!(
                out,
                r#"      <rpm:entry name="{}" flags="{}" epoch="{}" ver="{}" rel="{}"/>"#,
                e.name, e.flags, e.version.epoch, e.version.ver, e.version.rel
            )
            .unwrap();
        }
    }
    writeln!(out, "    </rpm:{}>", list).unwrap();
}

/// Write `xml` to `<dir>/<file>`, gzipping when the name ends in `.gz`
pub fn write_primary(dir: &Path, file: &str, xml: &str) -> PathBuf {
    let path = dir.join(file);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }

    if file.ends_with(".gz") {
        let out = fs::File::create(&path).unwrap();
        let mut encoder = flate2::write::GzEncoder::new(out, flate2::Compression::default());
        encoder.write_all(xml.as_bytes()).unwrap();
        encoder.finish().unwrap();
    } else {
        fs::write(&path, xml).unwrap();
    }
    path
}
