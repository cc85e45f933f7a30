//! The compiled command tree.
//!
//! Compilation turns the declarative model into a statically-typed tree the
//! parser can walk without re-deriving anything: every option/positional is
//! bound to its converter and validator up front, `dest` names and `repeated`
//! flags are resolved, and env bindings are flattened to `{var, doc}`.
//!
//! The tree is owned top-down (a parent owns its children outright) and is
//! immutable for the lifetime of a parse call.

use crate::conv::{self, Converter};
use crate::validate::{self, Validator};
use cmdspec_model as model;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct EnvSpec {
    pub var: String,
    pub doc: Option<model::DocString>,
}

#[derive(Debug, Clone)]
pub struct FlagSpec {
    pub names: Vec<String>,
    pub dest: String,
    pub repeated: bool,
    pub env: Option<EnvSpec>,
    pub deprecated: Option<String>,
}

#[derive(Debug, Clone)]
pub struct FlagGroupEntrySpec {
    pub names: Vec<String>,
    pub value: Value,
}

#[derive(Debug, Clone)]
pub struct FlagGroupSpec {
    pub dest: String,
    pub default_value: Value,
    pub entries: Vec<FlagGroupEntrySpec>,
    pub repeated: bool,
}

#[derive(Debug, Clone)]
pub struct OptionSpec {
    pub names: Vec<String>,
    pub dest: String,
    pub converter: Converter,
    pub validator: Validator,
    pub default: Option<Value>,
    pub repeated: bool,
    pub env: Option<EnvSpec>,
}

#[derive(Debug, Clone)]
pub struct PositionalSpec {
    pub name: String,
    pub dest: String,
    pub converter: Converter,
    pub validator: Validator,
    pub default: Option<Value>,
    pub repeated: bool,
}

/// One compiled argument. Closed: the parser matches exhaustively.
#[derive(Debug, Clone)]
pub enum ArgSpec {
    Flag(FlagSpec),
    FlagGroup(FlagGroupSpec),
    Option(OptionSpec),
    Positional(PositionalSpec),
}

#[derive(Debug, Clone)]
pub struct CommandSpec {
    pub name: String,
    pub doc: model::DocString,
    pub args: Vec<ArgSpec>,
    pub commands: Vec<CommandSpec>,
}

#[derive(Debug, Clone)]
pub struct RootSpec {
    pub name: String,
    pub doc: model::DocString,
    pub args: Vec<ArgSpec>,
    pub commands: Vec<CommandSpec>,
    pub version: Option<String>,
    pub config: Option<model::ConfigSection>,
}

// ---------------------------------------------------------------------------
// Compilation
// ---------------------------------------------------------------------------

/// Pick the storage key for an argument without an explicit `dest`: the
/// first multi-character name, falling back to the first name.
fn resolve_dest(names: &[String]) -> String {
    names
        .iter()
        .find(|name| name.chars().count() > 1)
        .or_else(|| names.first())
        .cloned()
        .unwrap_or_default()
}

fn resolve_env(binding: &model::EnvBinding) -> EnvSpec {
    match binding {
        model::EnvBinding::Var(var) => EnvSpec {
            var: var.clone(),
            doc: None,
        },
        model::EnvBinding::Obj(obj) => EnvSpec {
            var: obj.var.clone(),
            doc: obj.doc.clone(),
        },
    }
}

impl FlagSpec {
    pub fn compile(flag: &model::Flag) -> Self {
        Self {
            names: flag.names.clone(),
            dest: flag
                .dest
                .clone()
                .unwrap_or_else(|| resolve_dest(&flag.names)),
            repeated: flag.repeated.unwrap_or(false),
            env: flag.env.as_ref().map(resolve_env),
            deprecated: flag.deprecated.clone(),
        }
    }
}

impl FlagGroupSpec {
    pub fn compile(group: &model::FlagGroup) -> Self {
        Self {
            dest: group.dest.clone(),
            default_value: group.default_value.clone(),
            entries: group
                .flags
                .iter()
                .map(|entry| FlagGroupEntrySpec {
                    names: entry.names.clone(),
                    value: entry.value.clone(),
                })
                .collect(),
            repeated: group.repeated.unwrap_or(false),
        }
    }
}

impl OptionSpec {
    pub fn compile(opt: &model::OptionArg) -> Self {
        Self {
            names: opt.names.clone(),
            dest: opt.dest.clone().unwrap_or_else(|| resolve_dest(&opt.names)),
            converter: conv::for_type(&opt.ty, opt.choices.as_deref()),
            validator: validate::for_option(opt),
            default: opt.default_value.clone(),
            repeated: opt.repeated.unwrap_or(false),
            env: opt.env.as_ref().map(resolve_env),
        }
    }
}

impl PositionalSpec {
    pub fn compile(pos: &model::Positional) -> Self {
        Self {
            name: pos.name.clone(),
            dest: pos.name.clone(),
            converter: conv::for_type(&pos.ty, None),
            validator: validate::for_positional(pos),
            default: pos.default_value.clone(),
            repeated: pos.repeated.unwrap_or(false),
        }
    }
}

impl ArgSpec {
    pub fn compile(argument: &model::Argument) -> Self {
        match argument {
            model::Argument::Flag(flag) => Self::Flag(FlagSpec::compile(flag)),
            model::Argument::FlagGroup(group) => Self::FlagGroup(FlagGroupSpec::compile(group)),
            model::Argument::Option(opt) => Self::Option(OptionSpec::compile(opt)),
            model::Argument::Positional(pos) => Self::Positional(PositionalSpec::compile(pos)),
        }
    }

    pub fn compile_all(arguments: &[model::Argument]) -> Vec<Self> {
        arguments.iter().map(Self::compile).collect()
    }
}

impl CommandSpec {
    pub fn compile(command: &model::Command) -> Self {
        Self {
            name: command.name.clone(),
            doc: command.doc.clone(),
            args: ArgSpec::compile_all(&command.args),
            commands: command.commands.iter().map(Self::compile).collect(),
        }
    }
}

impl RootSpec {
    pub fn compile(root: &model::Root) -> Self {
        Self {
            name: root.name.clone(),
            doc: root.doc.clone(),
            args: ArgSpec::compile_all(&root.args),
            commands: root.commands.iter().map(CommandSpec::compile).collect(),
            version: root.version.clone(),
            config: root.config.clone(),
        }
    }
}
