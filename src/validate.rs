//! Presence and filesystem-existence checks for parsed values.
//!
//! Validators are built once at spec-compilation time and run during the
//! post-processing phase of a parse, after env fallback and defaults have
//! been applied.

use crate::model::{OptionArg, Positional, ScalarType, TypeSpec};
use serde_json::Value;
use std::path::Path;
use thiserror::Error;

/// A validation failure, carrying a human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ValidationError(String);

impl ValidationError {
    fn new(message: impl Into<String>) -> Self {
        ValidationError(message.into())
    }
}

/// The filesystem predicate behind a `must_exist` constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsKind {
    File,
    Dir,
    Path,
}

impl FsKind {
    fn from_scalar(ty: ScalarType) -> Option<FsKind> {
        match ty {
            ScalarType::File => Some(FsKind::File),
            ScalarType::Dir => Some(FsKind::Dir),
            ScalarType::Path => Some(FsKind::Path),
            _ => None,
        }
    }

    fn check(self, name: &str, path: &str) -> Result<(), ValidationError> {
        match self {
            FsKind::File if !Path::new(path).is_file() => Err(ValidationError::new(format!(
                "{name}: {path} is not a regular file"
            ))),
            FsKind::Dir if !Path::new(path).is_dir() => Err(ValidationError::new(format!(
                "{name}: {path} is not a directory"
            ))),
            FsKind::Path if !Path::new(path).exists() => {
                Err(ValidationError::new(format!("{name}: {path} does not exist")))
            }
            _ => Ok(()),
        }
    }

    fn description(self) -> &'static str {
        match self {
            FsKind::File => "must_exist(file)",
            FsKind::Dir => "must_exist(dir)",
            FsKind::Path => "must_exist(path)",
        }
    }
}

/// A composable check over one argument's (possibly absent) value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validator {
    /// Runs every sub-validator, stopping at the first failure. An empty
    /// list passes everything.
    AllOf(Vec<Validator>),
    /// Fails iff the value is absent; an explicit null counts as present.
    Required,
    /// Checks the filesystem predicate against a scalar value.
    Exists(FsKind),
    /// Checks every element of a list value, tagging errors with the index.
    EachExists(FsKind),
    /// Checks the filesystem-typed components of a pair or triple.
    ComponentsExist(Vec<Option<FsKind>>),
}

impl Validator {
    pub fn check(&self, name: &str, value: Option<&Value>) -> Result<(), ValidationError> {
        match self {
            Validator::AllOf(parts) => {
                for part in parts {
                    part.check(name, value)?;
                }
                Ok(())
            }
            Validator::Required => {
                if value.is_none() {
                    return Err(ValidationError::new(format!("{name} is required")));
                }
                Ok(())
            }
            Validator::Exists(kind) => {
                if let Some(path) = value.and_then(Value::as_str) {
                    kind.check(name, path)?;
                }
                Ok(())
            }
            Validator::EachExists(kind) => {
                if let Some(Value::Array(items)) = value {
                    for (i, item) in items.iter().enumerate() {
                        if let Some(path) = item.as_str() {
                            kind.check(&format!("{name}[{i}]"), path)?;
                        }
                    }
                }
                Ok(())
            }
            Validator::ComponentsExist(kinds) => {
                if let Some(Value::Array(items)) = value {
                    for (i, kind) in kinds.iter().enumerate() {
                        let component = items.get(i).and_then(Value::as_str);
                        if let (Some(kind), Some(path)) = (kind, component) {
                            kind.check(&format!("{name}[{i}]"), path)?;
                        }
                    }
                }
                Ok(())
            }
        }
    }

    pub fn description(&self) -> String {
        match self {
            Validator::AllOf(parts) if parts.is_empty() => "none".to_string(),
            Validator::AllOf(parts) => parts
                .iter()
                .map(Validator::description)
                .collect::<Vec<_>>()
                .join(" + "),
            Validator::Required => "required".to_string(),
            Validator::Exists(kind) | Validator::EachExists(kind) => {
                kind.description().to_string()
            }
            Validator::ComponentsExist(kinds) if kinds.len() == 2 => {
                "must_exist(pair)".to_string()
            }
            Validator::ComponentsExist(_) => "must_exist(triple)".to_string(),
        }
    }
}

pub fn required() -> Validator {
    Validator::Required
}

pub fn must_exist_file() -> Validator {
    Validator::Exists(FsKind::File)
}

pub fn must_exist_dir() -> Validator {
    Validator::Exists(FsKind::Dir)
}

pub fn must_exist_path() -> Validator {
    Validator::Exists(FsKind::Path)
}

pub fn all_of(parts: Vec<Validator>) -> Validator {
    Validator::AllOf(parts)
}

/// The type-aware existence check for a type specification, or `None`
/// when no component is a filesystem type.
fn must_exist_for_type(spec: &TypeSpec) -> Option<Validator> {
    match spec {
        TypeSpec::Scalar(ty) => FsKind::from_scalar(*ty).map(Validator::Exists),
        TypeSpec::List(list) => FsKind::from_scalar(list.element).map(Validator::EachExists),
        TypeSpec::Pair(pair) => {
            let kinds = vec![
                FsKind::from_scalar(pair.first),
                FsKind::from_scalar(pair.second),
            ];
            if kinds.iter().all(Option::is_none) {
                None
            } else {
                Some(Validator::ComponentsExist(kinds))
            }
        }
        TypeSpec::Triple(triple) => {
            let kinds = vec![
                FsKind::from_scalar(triple.first),
                FsKind::from_scalar(triple.second),
                FsKind::from_scalar(triple.third),
            ];
            if kinds.iter().all(Option::is_none) {
                None
            } else {
                Some(Validator::ComponentsExist(kinds))
            }
        }
    }
}

/// Compose the validator for an option from its constraints.
pub fn from_option(opt: &OptionArg) -> Validator {
    let mut parts = Vec::new();
    if opt.required.unwrap_or(false) {
        parts.push(required());
    }
    if opt.must_exist.unwrap_or(false) {
        if let Some(validator) = must_exist_for_type(&opt.value_type) {
            parts.push(validator);
        }
    }
    all_of(parts)
}

/// Compose the validator for a positional from its constraints.
pub fn from_positional(pos: &Positional) -> Validator {
    let mut parts = Vec::new();
    if pos.required.unwrap_or(false) {
        parts.push(required());
    }
    if pos.must_exist.unwrap_or(false) {
        if let Some(validator) = must_exist_for_type(&pos.value_type) {
            parts.push(validator);
        }
    }
    all_of(parts)
}
