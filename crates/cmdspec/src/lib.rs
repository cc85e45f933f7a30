//! Declarative command-line parsing over a compiled command tree.
//!
//! A [`cmdspec_model::Root`] describes a CLI — flags, options, positionals,
//! flag groups, nested subcommands — as plain data, typically loaded from
//! JSON. [`tree::RootSpec::compile`] turns that model into an executable
//! tree with converters and validators attached, and [`parse`] runs argv
//! tokens against it:
//!
//! ```
//! use cmdspec::{parse_with_env, ParseOutcome, RootSpec};
//!
//! let model = cmdspec_model::Root::from_json_str(r#"{
//!     "name": "greet",
//!     "doc": ["Say hello."],
//!     "args": [
//!         { "kind": "flag", "names": ["loud", "l"], "doc": ["Shout."] },
//!         { "kind": "positional", "name": "who", "type": "string",
//!           "default": "world", "doc": ["Whom to greet."] }
//!     ]
//! }"#).unwrap();
//! let spec = RootSpec::compile(&model);
//!
//! let outcome = parse_with_env(&spec, &["--loud".to_string()], &|_| None).unwrap();
//! let ParseOutcome::Parsed { config, .. } = outcome else { unreachable!() };
//! assert_eq!(config["loud"], serde_json::json!(true));
//! assert_eq!(config["who"], serde_json::json!("world"));
//! ```
//!
//! Resolution order for every argument is CLI token, then bound environment
//! variable, then declared default. `--help`, `--help-man`, and root-level
//! `--version` short-circuit into their own [`ParseOutcome`] variants without
//! running validation.

pub mod conv;
pub mod parse;
pub mod tree;
pub mod validate;

pub use parse::{parse, parse_with_env, Config, EnvLookup, Error, ParseOutcome};
pub use tree::{ArgSpec, CommandSpec, RootSpec};

pub use cmdspec_model as model;
