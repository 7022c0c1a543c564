// src/repository/primary.rs

//! Parser for rpm-md `primary.xml` repository metadata
//!
//! Only the fields dependency resolution needs are decoded. Namespace
//! prefixes (`rpm:entry`, `rpm:provides`, ...) are matched by local name.

use super::{Checksum, Package, ProvidedFile, Repository};
use crate::error::{Error, Result};
use crate::version::{Entry, Version};
use flate2::read::GzDecoder;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Read a `primary.xml` (optionally `.gz` compressed) file from disk
pub fn read_primary(path: &Path, repository: Arc<Repository>) -> Result<Vec<Package>> {
    let source = path.display().to_string();
    let file = File::open(path)?;

    let packages = if path.extension().is_some_and(|ext| ext == "gz") {
        parse_reader(BufReader::new(GzDecoder::new(file)), &source, repository)?
    } else {
        parse_reader(BufReader::new(file), &source, repository)?
    };

    debug!("Decoded {} packages from {}", packages.len(), source);
    Ok(packages)
}

/// Parse an in-memory `primary.xml` document
pub fn parse_primary(xml: &str, repository: Arc<Repository>) -> Result<Vec<Package>> {
    parse_reader(xml.as_bytes(), "<memory>", repository)
}

/// Dependency list currently being filled
#[derive(Debug, Clone, Copy)]
enum EntryList {
    Provides,
    Requires,
    Conflicts,
    Obsoletes,
    Recommends,
    Suggests,
    Enhances,
    Supplements,
}

impl EntryList {
    fn from_tag(tag: &[u8]) -> Option<Self> {
        match tag {
            b"provides" => Some(Self::Provides),
            b"requires" => Some(Self::Requires),
            b"conflicts" => Some(Self::Conflicts),
            b"obsoletes" => Some(Self::Obsoletes),
            b"recommends" => Some(Self::Recommends),
            b"suggests" => Some(Self::Suggests),
            b"enhances" => Some(Self::Enhances),
            b"supplements" => Some(Self::Supplements),
            _ => None,
        }
    }

    fn target<'a>(&self, pkg: &'a mut Package) -> &'a mut Vec<Entry> {
        let format = &mut pkg.format;
        match self {
            Self::Provides => &mut format.provides,
            Self::Requires => &mut format.requires,
            Self::Conflicts => &mut format.conflicts,
            Self::Obsoletes => &mut format.obsoletes,
            Self::Recommends => &mut format.recommends,
            Self::Suggests => &mut format.suggests,
            Self::Enhances => &mut format.enhances,
            Self::Supplements => &mut format.supplements,
        }
    }
}

/// Element whose text content is being collected
#[derive(Debug, Clone)]
enum TextField {
    Name,
    Arch,
    Checksum,
    File(Option<String>),
}

/// Package under construction plus whether it is an rpm at all
struct PackageState {
    package: Package,
    is_rpm: bool,
}

fn parse_reader<R: BufRead>(
    input: R,
    source: &str,
    repository: Arc<Repository>,
) -> Result<Vec<Package>> {
    let mut reader = Reader::from_reader(input);
    reader.config_mut().trim_text(true);

    let mut packages = Vec::new();
    let mut current: Option<PackageState> = None;
    let mut list: Option<EntryList> = None;
    let mut field: Option<TextField> = None;
    let mut text = String::new();
    let mut buf = Vec::new();

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| Error::xml(source, e))?;

        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let is_empty = matches!(event, Event::Empty(_));
                let tag = e.local_name();
                let tag = tag.as_ref();

                if tag == b"package" {
                    let kind = attribute(e, b"type", source)?;
                    current = Some(PackageState {
                        package: Package::new("", "", Version::default(), repository.clone()),
                        is_rpm: kind.as_deref().is_none_or(|k| k == "rpm"),
                    });
                } else if let Some(state) = current.as_mut() {
                    let cursor = Cursor {
                        list: &mut list,
                        field: &mut field,
                    };
                    handle_start(&mut state.package, tag, e, is_empty, cursor, source)?;
                }
            }
            Event::Text(ref t) => {
                if field.is_some() {
                    let value = t.unescape().map_err(|e| Error::xml(source, e))?;
                    text.push_str(&value);
                }
            }
            Event::CData(ref t) => {
                if field.is_some() {
                    text.push_str(&String::from_utf8_lossy(t.as_ref()));
                }
            }
            Event::End(ref e) => {
                let tag = e.local_name();
                let tag = tag.as_ref();

                if tag == b"package" {
                    if let Some(state) = current.take() {
                        if state.is_rpm {
                            packages.push(state.package);
                        } else {
                            debug!("Skipping non-rpm package {}", state.package.name);
                        }
                    }
                    list = None;
                    field = None;
                    text.clear();
                } else if EntryList::from_tag(tag).is_some() {
                    list = None;
                } else if let Some(done) = field.take() {
                    let value = std::mem::take(&mut text);
                    if let Some(state) = current.as_mut() {
                        let pkg = &mut state.package;
                        match done {
                            TextField::Name => pkg.name = value,
                            TextField::Arch => pkg.arch = value,
                            TextField::Checksum => pkg.checksum.value = value,
                            TextField::File(kind) => pkg.format.files.push(ProvidedFile {
                                text: value,
                                kind,
                            }),
                        }
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if current.is_some() {
        return Err(Error::xml(source, "unexpected end of document inside <package>"));
    }

    Ok(packages)
}

/// Parser position inside the current `<package>`
struct Cursor<'a> {
    list: &'a mut Option<EntryList>,
    field: &'a mut Option<TextField>,
}

fn handle_start(
    pkg: &mut Package,
    tag: &[u8],
    e: &BytesStart,
    is_empty: bool,
    cursor: Cursor<'_>,
    source: &str,
) -> Result<()> {
    match tag {
        b"name" if !is_empty => *cursor.field = Some(TextField::Name),
        b"arch" if !is_empty => *cursor.field = Some(TextField::Arch),
        b"checksum" => {
            pkg.checksum = Checksum {
                value: String::new(),
                algorithm: attribute(e, b"type", source)?.unwrap_or_default(),
                pkgid: attribute(e, b"pkgid", source)?.as_deref() == Some("YES"),
            };
            if !is_empty {
                *cursor.field = Some(TextField::Checksum);
            }
        }
        b"file" if !is_empty => {
            *cursor.field = Some(TextField::File(attribute(e, b"type", source)?));
        }
        b"version" => {
            pkg.version = Version::new(
                attribute(e, b"epoch", source)?.unwrap_or_default(),
                attribute(e, b"ver", source)?.unwrap_or_default(),
                attribute(e, b"rel", source)?.unwrap_or_default(),
            );
        }
        b"location" => {
            pkg.location.href = attribute(e, b"href", source)?.unwrap_or_default();
        }
        b"size" => {
            pkg.size.package = size_attribute(e, b"package", source)?;
            pkg.size.installed = size_attribute(e, b"installed", source)?;
            pkg.size.archive = size_attribute(e, b"archive", source)?;
        }
        b"entry" => {
            // Entries outside a dependency list (e.g. filelists) carry nothing we need
            if let Some(target) = *cursor.list {
                let name = attribute(e, b"name", source)?.unwrap_or_default();
                let entry = Entry::from_raw(
                    &name,
                    &attribute(e, b"flags", source)?.unwrap_or_default(),
                    &attribute(e, b"epoch", source)?.unwrap_or_default(),
                    &attribute(e, b"ver", source)?.unwrap_or_default(),
                    &attribute(e, b"rel", source)?.unwrap_or_default(),
                )?;
                target.target(pkg).push(entry);
            }
        }
        other => {
            if !is_empty {
                if let Some(target) = EntryList::from_tag(other) {
                    *cursor.list = Some(target);
                }
            }
        }
    }
    Ok(())
}

/// Look up an attribute by local name
fn attribute(e: &BytesStart, key: &[u8], source: &str) -> Result<Option<String>> {
    for attr in e.attributes() {
        let attr = attr.map_err(|err| Error::xml(source, err))?;
        if attr.key.local_name().as_ref() == key {
            let value = attr.unescape_value().map_err(|err| Error::xml(source, err))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

fn size_attribute(e: &BytesStart, key: &[u8], source: &str) -> Result<u64> {
    match attribute(e, key, source)? {
        None => Ok(0),
        Some(value) if value.is_empty() => Ok(0),
        Some(value) => value.parse().map_err(|_| {
            Error::xml(
                source,
                format!(
                    "invalid {} size '{}'",
                    String::from_utf8_lossy(key),
                    value
                ),
            )
        }),
    }
}
