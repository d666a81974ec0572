//! Reading and writing corpora on disk.
//!
//! Two layouts are understood:
//!
//! - **Jars**: every `*.jar` is one unit named after its file stem, so
//!   `app.jar!/a/B.class` becomes `/app/a/B.class`.
//! - **Exploded**: a directory whose immediate subdirectories are units,
//!   `<root>/<unit>/a/B.class`. Files directly under the root are kept as
//!   [`EntryKind::Other`].

use anyhow::{Context, Result, bail};
use ignore::WalkBuilder;
use memmap2::Mmap;
use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};
use zip::ZipArchive;
use zip::write::{FileOptions, ZipWriter};

use crate::pool::{EntryKind, ResourceEntry, unit_name};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    Jars,
    Exploded,
}

pub fn detect_layout(inputs: &[PathBuf]) -> Result<Layout> {
    let mut layout = None;
    for input in inputs {
        let this = if input.is_dir() {
            Layout::Exploded
        } else if input.extension().is_some_and(|e| e == "jar") {
            Layout::Jars
        } else {
            bail!("Input is neither a jar nor a directory: {}", input.display());
        };
        match layout {
            Some(seen) if seen != this => {
                bail!("Cannot mix jar and directory inputs in one run")
            }
            _ => layout = Some(this),
        }
    }
    layout.context("No inputs given")
}

pub fn load_inputs(inputs: &[PathBuf]) -> Result<Vec<ResourceEntry>> {
    let mut entries = Vec::new();
    for input in inputs {
        if input.is_dir() {
            entries.extend(load_exploded(input)?);
        } else {
            entries.extend(load_jar(input)?);
        }
    }

    let mut seen = HashSet::new();
    for entry in &entries {
        if !seen.insert(entry.path.as_str()) {
            bail!("Duplicate entry in corpus: {}", entry.path);
        }
    }
    Ok(entries)
}

pub fn load_jar(jar_path: &Path) -> Result<Vec<ResourceEntry>> {
    let unit = jar_path
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .with_context(|| format!("Jar name is not a valid unit name: {}", jar_path.display()))?;

    let file = File::open(jar_path)
        .with_context(|| format!("Failed to open jar: {}", jar_path.display()))?;
    // SAFETY: The file is opened read-only and outlives the mapping.
    let mmap = unsafe { Mmap::map(&file) }
        .with_context(|| format!("Failed to mmap jar: {}", jar_path.display()))?;
    let mut archive = ZipArchive::new(Cursor::new(&mmap[..]))
        .with_context(|| format!("Failed to read zip structure: {}", jar_path.display()))?;

    let mut entries = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let mut zipped = archive.by_index(i)?;
        if zipped.is_dir() {
            continue;
        }
        let name = zipped.name().trim_start_matches('/').to_string();
        let mut bytes = Vec::with_capacity(zipped.size() as usize);
        zipped
            .read_to_end(&mut bytes)
            .with_context(|| format!("Failed to read {name} from {}", jar_path.display()))?;
        entries.push(ResourceEntry::class_or_resource(format!("/{unit}/{name}"), bytes));
    }
    Ok(entries)
}

pub fn load_exploded(root: &Path) -> Result<Vec<ResourceEntry>> {
    let walker = WalkBuilder::new(root)
        .hidden(false)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .ignore(false)
        .parents(false)
        .sort_by_file_path(|a, b| a.cmp(b))
        .build();

    let mut entries = Vec::new();
    for item in walker {
        let item = item.with_context(|| format!("Failed to walk {}", root.display()))?;
        if !item.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        let path = item.path();
        let relative = path
            .strip_prefix(root)
            .with_context(|| format!("Path escapes corpus root: {}", path.display()))?;
        let segments: Vec<&str> = relative
            .components()
            .map(|c| c.as_os_str().to_str())
            .collect::<Option<_>>()
            .with_context(|| format!("Path is not valid UTF-8: {}", path.display()))?;

        let kind = if segments.len() > 1 {
            EntryKind::ClassOrResource
        } else {
            EntryKind::Other
        };
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        entries.push(ResourceEntry::new(format!("/{}", segments.join("/")), kind, bytes));
    }
    Ok(entries)
}

/// Writes one jar per unit into `out_dir`; returns the jars written.
pub fn write_jars(out_dir: &Path, entries: &[ResourceEntry]) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create output directory: {}", out_dir.display()))?;

    let mut by_unit: BTreeMap<&str, Vec<&ResourceEntry>> = BTreeMap::new();
    for entry in entries {
        match entry.kind {
            EntryKind::ClassOrResource => {
                by_unit
                    .entry(unit_name(&entry.path)?)
                    .or_default()
                    .push(entry);
            }
            EntryKind::Other => write_file(out_dir, entry)?,
        }
    }

    let options = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    let mut written = Vec::with_capacity(by_unit.len());
    for (unit, unit_entries) in by_unit {
        let jar_path = out_dir.join(format!("{unit}.jar"));
        let file = File::create(&jar_path)
            .with_context(|| format!("Failed to create jar: {}", jar_path.display()))?;
        let mut zip = ZipWriter::new(file);
        let prefix = format!("/{unit}/");
        for entry in unit_entries {
            let name = entry.path.strip_prefix(&prefix).unwrap_or(&entry.path);
            zip.start_file(name, options)?;
            zip.write_all(&entry.bytes)?;
        }
        zip.finish()
            .with_context(|| format!("Failed to finish jar: {}", jar_path.display()))?;
        written.push(jar_path);
    }
    Ok(written)
}

pub fn write_exploded(out_dir: &Path, entries: &[ResourceEntry]) -> Result<()> {
    for entry in entries {
        write_file(out_dir, entry)?;
    }
    Ok(())
}

fn write_file(out_dir: &Path, entry: &ResourceEntry) -> Result<()> {
    let relative = entry.path.trim_start_matches('/');
    if relative.split('/').any(|s| s == "..") {
        bail!("Refusing to write outside the output directory: {}", entry.path);
    }
    let target = out_dir.join(relative);
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    std::fs::write(&target, &entry.bytes)
        .with_context(|| format!("Failed to write {}", target.display()))
}
