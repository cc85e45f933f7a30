//! Validators: constraint checks over resolved values.
//!
//! Validators run after env fallback and defaulting, so a value from any
//! source satisfies `required`. Absent values pass every check except
//! `required` — a `must_exist` on an optional argument only fires when a
//! value is actually present.

use cmdspec_model::{ListType, OptionArg, PairType, Positional, ScalarType, TripleType, TypeSpec};
use serde_json::Value;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct Error {
    message: String,
}

impl Error {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for Error {}

type CheckFn = Arc<dyn Fn(&str, Option<&Value>) -> Result<(), Error> + Send + Sync>;

#[derive(Clone)]
pub struct Validator {
    check_fn: CheckFn,
    pub description: String,
}

impl Validator {
    pub fn new<C>(description: impl Into<String>, check: C) -> Self
    where
        C: Fn(&str, Option<&Value>) -> Result<(), Error> + Send + Sync + 'static,
    {
        Self {
            check_fn: Arc::new(check),
            description: description.into(),
        }
    }

    /// Check the resolved value (or its absence) for the argument `name`.
    pub fn check(&self, name: &str, value: Option<&Value>) -> Result<(), Error> {
        (self.check_fn)(name, value)
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validator")
            .field("description", &self.description)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Constraint validators
// ---------------------------------------------------------------------------

pub fn required() -> Validator {
    Validator::new("required", |name, value| {
        if value.is_none() {
            return Err(Error::new(format!("{name} is required")));
        }
        Ok(())
    })
}

pub fn must_exist_file() -> Validator {
    Validator::new("must_exist(file)", |name, value| {
        let Some(path) = value.and_then(Value::as_str) else {
            return Ok(());
        };
        if !Path::new(path).is_file() {
            return Err(Error::new(format!("{name}: {path} is not a regular file")));
        }
        Ok(())
    })
}

pub fn must_exist_dir() -> Validator {
    Validator::new("must_exist(dir)", |name, value| {
        let Some(path) = value.and_then(Value::as_str) else {
            return Ok(());
        };
        if !Path::new(path).is_dir() {
            return Err(Error::new(format!("{name}: {path} is not a directory")));
        }
        Ok(())
    })
}

pub fn must_exist_path() -> Validator {
    Validator::new("must_exist(path)", |name, value| {
        let Some(path) = value.and_then(Value::as_str) else {
            return Ok(());
        };
        if !Path::new(path).exists() {
            return Err(Error::new(format!("{name}: {path} does not exist")));
        }
        Ok(())
    })
}

/// Compose validators; all must pass. An empty list always passes.
pub fn all_of(validators: Vec<Validator>) -> Validator {
    if validators.is_empty() {
        return Validator::new("none", |_, _| Ok(()));
    }
    let description = validators
        .iter()
        .map(|v| v.description.as_str())
        .collect::<Vec<_>>()
        .join(" + ");
    Validator::new(description, move |name, value| {
        for validator in &validators {
            validator.check(name, value)?;
        }
        Ok(())
    })
}

// ---------------------------------------------------------------------------
// Type-directed must_exist
// ---------------------------------------------------------------------------

fn must_exist_for_scalar(ty: ScalarType) -> Option<Validator> {
    match ty {
        ScalarType::File => Some(must_exist_file()),
        ScalarType::Dir => Some(must_exist_dir()),
        ScalarType::Path => Some(must_exist_path()),
        _ => None,
    }
}

fn must_exist_for_list(lt: &ListType) -> Option<Validator> {
    let inner = must_exist_for_scalar(lt.element)?;
    let description = inner.description.clone();
    Some(Validator::new(description, move |name, value| {
        let Some(items) = value.and_then(Value::as_array) else {
            return Ok(());
        };
        for (i, item) in items.iter().enumerate() {
            inner.check(&format!("{name}[{i}]"), Some(item))?;
        }
        Ok(())
    }))
}

fn check_element_at(name: &str, items: &[Value], index: usize, ty: ScalarType) -> Result<(), Error> {
    let Some(validator) = must_exist_for_scalar(ty) else {
        return Ok(());
    };
    validator.check(&format!("{name}[{index}]"), items.get(index))
}

fn must_exist_for_pair(pt: &PairType) -> Option<Validator> {
    if !pt.first.is_filesystem() && !pt.second.is_filesystem() {
        return None;
    }
    let pt = pt.clone();
    Some(Validator::new("must_exist(pair)", move |name, value| {
        let Some(items) = value.and_then(Value::as_array) else {
            return Ok(());
        };
        check_element_at(name, items, 0, pt.first)?;
        check_element_at(name, items, 1, pt.second)
    }))
}

fn must_exist_for_triple(tt: &TripleType) -> Option<Validator> {
    if !tt.first.is_filesystem() && !tt.second.is_filesystem() && !tt.third.is_filesystem() {
        return None;
    }
    let tt = tt.clone();
    Some(Validator::new("must_exist(triple)", move |name, value| {
        let Some(items) = value.and_then(Value::as_array) else {
            return Ok(());
        };
        check_element_at(name, items, 0, tt.first)?;
        check_element_at(name, items, 1, tt.second)?;
        check_element_at(name, items, 2, tt.third)
    }))
}

fn must_exist_for_type(ty: &TypeSpec) -> Option<Validator> {
    match ty {
        TypeSpec::Scalar(scalar) => must_exist_for_scalar(*scalar),
        TypeSpec::List { list } => must_exist_for_list(list),
        TypeSpec::Pair { pair } => must_exist_for_pair(pair),
        TypeSpec::Triple { triple } => must_exist_for_triple(triple),
    }
}

// ---------------------------------------------------------------------------
// Factory: declared constraints → composed validator
// ---------------------------------------------------------------------------

pub fn for_option(opt: &OptionArg) -> Validator {
    let mut parts = Vec::new();
    if opt.required.unwrap_or(false) {
        parts.push(required());
    }
    if opt.must_exist.unwrap_or(false) {
        if let Some(validator) = must_exist_for_type(&opt.ty) {
            parts.push(validator);
        }
    }
    all_of(parts)
}

pub fn for_positional(pos: &Positional) -> Validator {
    let mut parts = Vec::new();
    if pos.required.unwrap_or(false) {
        parts.push(required());
    }
    if pos.must_exist.unwrap_or(false) {
        if let Some(validator) = must_exist_for_type(&pos.ty) {
            parts.push(validator);
        }
    }
    all_of(parts)
}
