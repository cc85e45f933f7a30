//! Declarative command-definition model.
//!
//! These types mirror the JSON document a tool author writes to describe
//! their CLI: a root command with arguments, nested subcommands, an optional
//! version string, and an optional config-file section. The engine crate
//! (`cmdspec`) compiles this model into a statically-typed tree before
//! parsing argv against it.
//!
//! The wire format is stable:
//! - arguments are discriminated by a `"kind"` field
//!   (`flag`/`flag_group`/`option`/`positional`)
//! - value types are either a bare scalar name (`"int"`) or a single-key
//!   wrapper object (`{"list": {...}}`, `{"pair": {...}}`, `{"triple": {...}}`)
//! - env bindings are either a bare variable name or `{var, doc}`

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Documentation text, one entry per paragraph/line.
pub type DocString = Vec<String>;

/// The names an argument answers to, without `-`/`--` prefixes.
///
/// Single-character names become short options (`-v`), longer names become
/// long options (`--verbose`).
pub type ArgNames = Vec<String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarType {
    String,
    Int,
    Float,
    Bool,
    Enum,
    File,
    Dir,
    Path,
}

impl ScalarType {
    /// Filesystem-backed types are eligible for `must_exist` checks.
    pub fn is_filesystem(self) -> bool {
        matches!(self, Self::File | Self::Dir | Self::Path)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListType {
    pub element: ScalarType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub separator: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairType {
    pub first: ScalarType,
    pub second: ScalarType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub separator: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripleType {
    pub first: ScalarType,
    pub second: ScalarType,
    pub third: ScalarType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub separator: Option<String>,
}

/// The value type of an option or positional.
///
/// Serialized untagged: a bare string selects a scalar, while compound types
/// are single-key objects (`{"list": ...}` etc.).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TypeSpec {
    Scalar(ScalarType),
    List { list: ListType },
    Pair { pair: PairType },
    Triple { triple: TripleType },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvBindingObj {
    pub var: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<DocString>,
}

/// Environment-variable binding: a bare variable name or `{var, doc}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EnvBinding {
    Var(String),
    Obj(EnvBindingObj),
}

impl EnvBinding {
    pub fn var(&self) -> &str {
        match self {
            Self::Var(var) => var,
            Self::Obj(obj) => &obj.var,
        }
    }
}

// ---------------------------------------------------------------------------
// Arguments
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flag {
    pub names: ArgNames,
    pub doc: DocString,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dest: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<EnvBinding>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeated: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deprecated: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docs: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlagGroupEntry {
    pub names: ArgNames,
    pub doc: DocString,
    /// The fixed value this entry selects for the group's `dest`.
    pub value: Value,
}

/// A set of mutually-exclusive flags writing distinct fixed values into one
/// destination (e.g. `--json`/`--yaml` selecting an output format).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlagGroup {
    pub dest: String,
    pub doc: DocString,
    #[serde(rename = "default")]
    pub default_value: Value,
    pub flags: Vec<FlagGroupEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeated: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docs: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionArg {
    pub names: ArgNames,
    pub doc: DocString,
    #[serde(rename = "type")]
    pub ty: TypeSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docv: Option<String>,
    #[serde(rename = "default", default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeated: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub must_exist: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dest: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<EnvBinding>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docs: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Positional {
    pub name: String,
    pub doc: DocString,
    #[serde(rename = "type")]
    pub ty: TypeSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docv: Option<String>,
    #[serde(rename = "default", default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeated: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub must_exist: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docs: Option<String>,
}

/// One argument declaration, discriminated by `"kind"` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Argument {
    Flag(Flag),
    FlagGroup(FlagGroup),
    Option(OptionArg),
    Positional(Positional),
}

// ---------------------------------------------------------------------------
// Config-file section
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigPaths {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigSection {
    pub format: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paths: Option<ConfigPaths>,
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub name: String,
    pub doc: DocString,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<Argument>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub commands: Vec<Command>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Root {
    pub name: String,
    pub doc: DocString,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<Argument>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub commands: Vec<Command>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<ConfigSection>,
}

impl Root {
    /// Deserialize a root definition from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Deserialize a root definition from an already-parsed JSON value.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn flag_round_trips_through_kind_tag() {
        let j = json!({
            "kind": "flag",
            "names": ["verbose", "v"],
            "doc": ["Print more output."],
            "env": "APP_VERBOSE",
            "repeated": true
        });
        let arg: Argument = serde_json::from_value(j.clone()).unwrap();
        let Argument::Flag(flag) = &arg else {
            panic!("expected flag, got: {arg:?}");
        };
        assert_eq!(flag.names, vec!["verbose", "v"]);
        assert_eq!(flag.env.as_ref().map(|e| e.var()), Some("APP_VERBOSE"));
        assert_eq!(flag.repeated, Some(true));
        assert_eq!(serde_json::to_value(&arg).unwrap(), j);
    }

    #[test]
    fn option_default_key_maps_to_default_value() {
        let j = json!({
            "kind": "option",
            "names": ["output", "o"],
            "doc": [],
            "type": "string",
            "default": "stdout"
        });
        let arg: Argument = serde_json::from_value(j).unwrap();
        let Argument::Option(opt) = arg else {
            panic!("expected option");
        };
        assert_eq!(opt.default_value, Some(json!("stdout")));
        assert_eq!(opt.ty, TypeSpec::Scalar(ScalarType::String));
    }

    #[test]
    fn absent_default_stays_none() {
        let j = json!({
            "kind": "positional",
            "name": "file",
            "doc": [],
            "type": "file",
            "required": true
        });
        let arg: Argument = serde_json::from_value(j).unwrap();
        let Argument::Positional(pos) = arg else {
            panic!("expected positional");
        };
        assert!(pos.default_value.is_none());
        assert_eq!(pos.required, Some(true));
    }

    #[test]
    fn type_spec_accepts_bare_scalar_and_wrappers() {
        let scalar: TypeSpec = serde_json::from_value(json!("int")).unwrap();
        assert_eq!(scalar, TypeSpec::Scalar(ScalarType::Int));

        let list: TypeSpec =
            serde_json::from_value(json!({"list": {"element": "file", "separator": ":"}})).unwrap();
        let TypeSpec::List { list } = list else {
            panic!("expected list");
        };
        assert_eq!(list.element, ScalarType::File);
        assert_eq!(list.separator.as_deref(), Some(":"));

        let pair: TypeSpec =
            serde_json::from_value(json!({"pair": {"first": "string", "second": "int"}})).unwrap();
        let TypeSpec::Pair { pair } = pair else {
            panic!("expected pair");
        };
        assert_eq!(pair.first, ScalarType::String);
        assert!(pair.separator.is_none());

        let triple: TypeSpec = serde_json::from_value(
            json!({"triple": {"first": "int", "second": "int", "third": "int"}}),
        )
        .unwrap();
        assert!(matches!(triple, TypeSpec::Triple { .. }));
    }

    #[test]
    fn env_binding_accepts_string_and_object() {
        let bare: EnvBinding = serde_json::from_value(json!("HOME")).unwrap();
        assert_eq!(bare.var(), "HOME");

        let obj: EnvBinding =
            serde_json::from_value(json!({"var": "APP_OUT", "doc": ["Output override."]})).unwrap();
        assert_eq!(obj.var(), "APP_OUT");
        let EnvBinding::Obj(obj) = obj else {
            panic!("expected object binding");
        };
        assert_eq!(obj.doc.as_deref(), Some(&["Output override.".to_string()][..]));
    }

    #[test]
    fn flag_group_carries_entries_and_default() {
        let j = json!({
            "kind": "flag_group",
            "dest": "format",
            "doc": ["Output format."],
            "default": "plain",
            "flags": [
                {"names": ["json", "j"], "doc": [], "value": "json"},
                {"names": ["yaml"], "doc": [], "value": "yaml"}
            ]
        });
        let arg: Argument = serde_json::from_value(j).unwrap();
        let Argument::FlagGroup(group) = arg else {
            panic!("expected flag group");
        };
        assert_eq!(group.default_value, json!("plain"));
        assert_eq!(group.flags.len(), 2);
        assert_eq!(group.flags[0].value, json!("json"));
    }

    #[test]
    fn root_parses_full_definition() {
        let text = r#"{
            "name": "fake-git",
            "doc": ["A git-shaped demo."],
            "version": "1.2.3",
            "args": [
                {"kind": "flag", "names": ["verbose", "v"], "doc": []}
            ],
            "commands": [
                {
                    "name": "commit",
                    "doc": [],
                    "args": [
                        {"kind": "option", "names": ["message", "m"], "doc": [], "type": "string"},
                        {"kind": "flag", "names": ["all", "a"], "doc": []}
                    ]
                }
            ],
            "config": {"format": "toml", "paths": {"user": "~/.fake-git.toml"}}
        }"#;
        let root = Root::from_json_str(text).unwrap();
        assert_eq!(root.name, "fake-git");
        assert_eq!(root.version.as_deref(), Some("1.2.3"));
        assert_eq!(root.commands.len(), 1);
        assert_eq!(root.commands[0].args.len(), 2);
        let config = root.config.as_ref().unwrap();
        assert_eq!(config.format, "toml");
        assert_eq!(
            config.paths.as_ref().unwrap().user.as_deref(),
            Some("~/.fake-git.toml")
        );
    }

    #[test]
    fn unknown_argument_kind_is_rejected() {
        let j = json!({"kind": "toggle", "names": ["x"], "doc": []});
        assert!(serde_json::from_value::<Argument>(j).is_err());
    }
}
