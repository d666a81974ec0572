//! Corpus entries and the `/<unit>/<binary-name>.class` path convention.

use anyhow::{Context, Result};
use serde::Serialize;
use thiserror::Error;

use crate::classfile::ClassFile;

const CLASS_SUFFIX: &str = ".class";
const MODULE_INFO: &str = "module-info.class";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    ClassOrResource,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceEntry {
    pub path: String,
    pub kind: EntryKind,
    pub bytes: Vec<u8>,
}

impl ResourceEntry {
    pub fn new(path: impl Into<String>, kind: EntryKind, bytes: Vec<u8>) -> Self {
        Self {
            path: path.into(),
            kind,
            bytes,
        }
    }

    pub fn class_or_resource(path: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self::new(path, EntryKind::ClassOrResource, bytes)
    }

    /// Whether this entry declares a type that takes part in the analysis.
    ///
    /// Unit metadata (`module-info.class`) and versioned/metadata classes
    /// under `META-INF/` are not types of the link set.
    pub fn is_class(&self) -> bool {
        self.kind == EntryKind::ClassOrResource
            && self.path.ends_with(CLASS_SUFFIX)
            && !self.path.ends_with(MODULE_INFO)
            && !unit_relative(&self.path).is_some_and(|rest| rest.starts_with("META-INF/"))
    }

    pub fn unit(&self) -> Result<&str, PathError> {
        unit_name(&self.path)
    }

    pub fn with_content(&self, bytes: Vec<u8>) -> Self {
        Self::new(self.path.clone(), self.kind, bytes)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathError {
    #[error("entry path {0:?} does not start with /<unit>/")]
    MissingUnit(String),
    #[error("entry path {0:?} does not name a .class file")]
    NotAClass(String),
    #[error("entry path {0:?} has an empty type name")]
    EmptyName(String),
}

fn unit_relative(path: &str) -> Option<&str> {
    let (_, rest) = path.strip_prefix('/')?.split_once('/')?;
    Some(rest)
}

pub fn unit_name(path: &str) -> Result<&str, PathError> {
    match path.strip_prefix('/').and_then(|rest| rest.split_once('/')) {
        Some((unit, rest)) if !unit.is_empty() && !rest.is_empty() => Ok(unit),
        _ => Err(PathError::MissingUnit(path.to_string())),
    }
}

/// Strips the unit segment and the `.class` extension.
pub fn internal_class_name(path: &str) -> Result<&str, PathError> {
    let rest = unit_relative(path)
        .filter(|rest| !rest.is_empty())
        .ok_or_else(|| PathError::MissingUnit(path.to_string()))?;
    let name = rest
        .strip_suffix(CLASS_SUFFIX)
        .ok_or_else(|| PathError::NotAClass(path.to_string()))?;
    if name.is_empty() || name.ends_with('/') {
        return Err(PathError::EmptyName(path.to_string()));
    }
    Ok(name)
}

pub fn class_path(unit: &str, name: &str) -> String {
    format!("/{unit}/{name}{CLASS_SUFFIX}")
}

pub fn package_of(name: &str) -> &str {
    name.rsplit_once('/').map(|(pkg, _)| pkg).unwrap_or("")
}

pub fn is_nested(name: &str) -> bool {
    name.contains('$')
}

/// One type of the corpus: where it lives and what its class file says.
#[derive(Debug, Clone)]
pub struct TypeDescriptor {
    pub path: String,
    pub unit: String,
    pub name: String,
    pub class: ClassFile,
}

impl TypeDescriptor {
    pub fn read(entry: &ResourceEntry) -> Result<Self> {
        let unit = entry.unit()?.to_string();
        let name = internal_class_name(&entry.path)?.to_string();
        let class = ClassFile::parse(&entry.bytes)
            .with_context(|| format!("Failed to parse class file: {}", entry.path))?;
        Ok(Self {
            path: entry.path.clone(),
            unit,
            name,
            class,
        })
    }
}
