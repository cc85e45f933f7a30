//! Value converters: raw token string ↔ typed JSON value.
//!
//! Each option/positional in a compiled tree owns one `Converter`, chosen
//! from the declared value type at compile time. The parser only ever calls
//! `Converter::parse`; `format` is the reverse direction used when a resolved
//! value has to be rendered back to text (e.g. default values in docs).

use cmdspec_model::{ScalarType, TypeSpec};
use serde_json::{Number, Value};
use std::fmt;
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

type ParseFn = Arc<dyn Fn(&str) -> Result<Value, Error> + Send + Sync>;
type FormatFn = Arc<dyn Fn(&Value) -> String + Send + Sync>;

/// A string↔value conversion pair plus the placeholder text (`docv`) shown
/// for the value in usage lines.
#[derive(Clone)]
pub struct Converter {
    parse_fn: ParseFn,
    format_fn: FormatFn,
    pub docv: String,
}

impl Converter {
    pub fn new<P, F>(docv: impl Into<String>, parse: P, format: F) -> Self
    where
        P: Fn(&str) -> Result<Value, Error> + Send + Sync + 'static,
        F: Fn(&Value) -> String + Send + Sync + 'static,
    {
        Self {
            parse_fn: Arc::new(parse),
            format_fn: Arc::new(format),
            docv: docv.into(),
        }
    }

    pub fn parse(&self, raw: &str) -> Result<Value, Error> {
        (self.parse_fn)(raw)
    }

    pub fn format(&self, value: &Value) -> String {
        (self.format_fn)(value)
    }
}

impl fmt::Debug for Converter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Converter").field("docv", &self.docv).finish()
    }
}

/// The boolean spellings accepted everywhere a boolean is read from text:
/// the `bool` converter and the env-fallback path share this single table.
pub fn parse_bool_spelling(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

fn format_as_string(value: &Value) -> String {
    match value.as_str() {
        Some(s) => s.to_string(),
        None => value.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Scalar converters
// ---------------------------------------------------------------------------

pub fn string() -> Converter {
    Converter::new(
        "STRING",
        |s| Ok(Value::String(s.to_string())),
        format_as_string,
    )
}

pub fn integer() -> Converter {
    Converter::new(
        "INT",
        |s| {
            if s.is_empty() {
                return Err(Error::new("expected integer, got empty string"));
            }
            s.parse::<i64>()
                .map(Value::from)
                .map_err(|_| Error::new(format!("expected integer, got '{s}'")))
        },
        |v| v.as_i64().map_or_else(|| v.to_string(), |n| n.to_string()),
    )
}

pub fn float() -> Converter {
    Converter::new(
        "FLOAT",
        |s| {
            if s.is_empty() {
                return Err(Error::new("expected float, got empty string"));
            }
            let parsed = s
                .parse::<f64>()
                .map_err(|_| Error::new(format!("expected float, got '{s}'")))?;
            let number = Number::from_f64(parsed)
                .ok_or_else(|| Error::new(format!("expected float, got '{s}'")))?;
            Ok(Value::Number(number))
        },
        |v| v.to_string(),
    )
}

pub fn boolean() -> Converter {
    Converter::new(
        "BOOL",
        |s| {
            parse_bool_spelling(s)
                .map(Value::Bool)
                .ok_or_else(|| Error::new(format!("expected boolean value, got '{s}'")))
        },
        |v| {
            if v.as_bool().unwrap_or(false) {
                "true".to_string()
            } else {
                "false".to_string()
            }
        },
    )
}

pub fn choice(choices: Vec<String>) -> Converter {
    Converter::new(
        "ENUM",
        move |s| {
            if choices.iter().any(|c| c == s) {
                return Ok(Value::String(s.to_string()));
            }
            Err(Error::new(format!(
                "invalid choice '{s}', expected one of: {}",
                choices.join(" ")
            )))
        },
        format_as_string,
    )
}

pub fn file() -> Converter {
    Converter::new("FILE", |s| Ok(Value::String(s.to_string())), format_as_string)
}

pub fn dir() -> Converter {
    Converter::new("DIR", |s| Ok(Value::String(s.to_string())), format_as_string)
}

pub fn path() -> Converter {
    Converter::new("PATH", |s| Ok(Value::String(s.to_string())), format_as_string)
}

// ---------------------------------------------------------------------------
// Compound converters
// ---------------------------------------------------------------------------

pub fn list(element: Converter, separator: &str) -> Converter {
    let docv = format!("{}{separator}...", element.docv);
    let sep = separator.to_string();
    let parse_elem = element.clone();
    let format_elem = element;
    let format_sep = sep.clone();
    Converter::new(
        docv,
        move |s| {
            if s.is_empty() {
                return Ok(Value::Array(Vec::new()));
            }
            let mut items = Vec::new();
            for part in s.split(sep.as_str()) {
                items.push(parse_elem.parse(part)?);
            }
            Ok(Value::Array(items))
        },
        move |v| match v.as_array() {
            Some(items) => items
                .iter()
                .map(|item| format_elem.format(item))
                .collect::<Vec<_>>()
                .join(&format_sep),
            None => v.to_string(),
        },
    )
}

pub fn pair(first: Converter, second: Converter, separator: &str) -> Converter {
    let docv = format!("{}{separator}{}", first.docv, second.docv);
    let sep = separator.to_string();
    let parse_pair = (first.clone(), second.clone());
    let format_pair = (first, second);
    let format_sep = sep.clone();
    Converter::new(
        docv,
        move |s| {
            let Some((a, b)) = s.split_once(sep.as_str()) else {
                return Err(Error::new(format!(
                    "expected pair separated by '{sep}', got '{s}'"
                )));
            };
            Ok(Value::Array(vec![
                parse_pair.0.parse(a)?,
                parse_pair.1.parse(b)?,
            ]))
        },
        move |v| match v.as_array() {
            Some(items) if items.len() == 2 => format!(
                "{}{format_sep}{}",
                format_pair.0.format(&items[0]),
                format_pair.1.format(&items[1])
            ),
            _ => v.to_string(),
        },
    )
}

pub fn triple(first: Converter, second: Converter, third: Converter, separator: &str) -> Converter {
    let docv = format!(
        "{}{separator}{}{separator}{}",
        first.docv, second.docv, third.docv
    );
    let sep = separator.to_string();
    let parse_triple = (first.clone(), second.clone(), third.clone());
    let format_triple = (first, second, third);
    let format_sep = sep.clone();
    Converter::new(
        docv,
        move |s| {
            let err = || Error::new(format!("expected triple separated by '{sep}', got '{s}'"));
            let Some((a, rest)) = s.split_once(sep.as_str()) else {
                return Err(err());
            };
            let Some((b, c)) = rest.split_once(sep.as_str()) else {
                return Err(err());
            };
            Ok(Value::Array(vec![
                parse_triple.0.parse(a)?,
                parse_triple.1.parse(b)?,
                parse_triple.2.parse(c)?,
            ]))
        },
        move |v| match v.as_array() {
            Some(items) if items.len() == 3 => format!(
                "{}{format_sep}{}{format_sep}{}",
                format_triple.0.format(&items[0]),
                format_triple.1.format(&items[1]),
                format_triple.2.format(&items[2])
            ),
            _ => v.to_string(),
        },
    )
}

// ---------------------------------------------------------------------------
// Factory: declared type → converter
// ---------------------------------------------------------------------------

pub fn for_scalar(ty: ScalarType) -> Converter {
    match ty {
        ScalarType::String => string(),
        ScalarType::Int => integer(),
        ScalarType::Float => float(),
        ScalarType::Bool => boolean(),
        // Choices are wired in by `for_type`; a bare enum degrades to string.
        ScalarType::Enum => string(),
        ScalarType::File => file(),
        ScalarType::Dir => dir(),
        ScalarType::Path => path(),
    }
}

const DEFAULT_SEPARATOR: &str = ",";

pub fn for_type(ty: &TypeSpec, choices: Option<&[String]>) -> Converter {
    match ty {
        TypeSpec::Scalar(scalar) => match (scalar, choices) {
            (ScalarType::Enum, Some(choices)) => choice(choices.to_vec()),
            _ => for_scalar(*scalar),
        },
        TypeSpec::List { list: lt } => {
            let sep = lt.separator.as_deref().unwrap_or(DEFAULT_SEPARATOR);
            list(for_scalar(lt.element), sep)
        }
        TypeSpec::Pair { pair: pt } => {
            let sep = pt.separator.as_deref().unwrap_or(DEFAULT_SEPARATOR);
            pair(for_scalar(pt.first), for_scalar(pt.second), sep)
        }
        TypeSpec::Triple { triple: tt } => {
            let sep = tt.separator.as_deref().unwrap_or(DEFAULT_SEPARATOR);
            triple(
                for_scalar(tt.first),
                for_scalar(tt.second),
                for_scalar(tt.third),
                sep,
            )
        }
    }
}
