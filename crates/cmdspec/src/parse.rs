//! The parsing core: argv tokens against a compiled command tree.
//!
//! One recursive descent per command level. Each level consumes tokens until
//! it either exhausts them, hands off to a child subcommand, or short-circuits
//! on a reserved token (`--help`, `--help-man`, root-only `--version`).
//! A fully successful parse is then post-processed level by level down the
//! resolved command path: env fallback, then defaults, then validators —
//! which is what makes CLI > env > default the observable precedence.
//!
//! `parse` is a pure function of `(tree, tokens, env lookup)`; the name index
//! and config are rebuilt per invocation and nothing is shared across calls.

use crate::conv;
use crate::tree::{ArgSpec, CommandSpec, FlagSpec, PositionalSpec, RootSpec};
use indexmap::IndexMap;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// The resolved configuration: `dest` → value, insertion-ordered.
pub type Config = IndexMap<String, Value>;

/// Injected environment access, swappable for testing.
pub type EnvLookup<'a> = dyn Fn(&str) -> Option<String> + 'a;

#[derive(Debug, Clone)]
pub struct Error {
    message: String,
}

impl Error {
    fn new(message: impl Into<String>) -> Self {
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

/// The outcome of a parse. Help/Version/Manpage are successful alternate
/// outcomes, not errors; they bypass post-processing entirely so `--help`
/// works even on an otherwise-invalid invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    Parsed {
        config: Config,
        command_path: Vec<String>,
    },
    Help {
        command_path: Vec<String>,
    },
    Version,
    Manpage {
        command_path: Vec<String>,
    },
}

// ---------------------------------------------------------------------------
// Name index
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MatchKind {
    Flag,
    Option,
    FlagGroup,
}

#[derive(Debug, Clone, Copy)]
struct Matched {
    arg_index: usize,
    kind: MatchKind,
    entry_index: usize,
}

/// `-x` for single-character names, `--xxx` otherwise.
fn cli_name(name: &str) -> String {
    if name.chars().count() == 1 {
        format!("-{name}")
    } else {
        format!("--{name}")
    }
}

/// Per-level lookup table from CLI-formatted names to the argument they
/// select. Last registration wins on collision. Positionals are not indexed.
fn build_index(args: &[ArgSpec]) -> HashMap<String, Matched> {
    let mut index = HashMap::new();
    for (i, arg) in args.iter().enumerate() {
        match arg {
            ArgSpec::Flag(flag) => {
                for name in &flag.names {
                    index.insert(
                        cli_name(name),
                        Matched {
                            arg_index: i,
                            kind: MatchKind::Flag,
                            entry_index: 0,
                        },
                    );
                }
            }
            ArgSpec::Option(opt) => {
                for name in &opt.names {
                    index.insert(
                        cli_name(name),
                        Matched {
                            arg_index: i,
                            kind: MatchKind::Option,
                            entry_index: 0,
                        },
                    );
                }
            }
            ArgSpec::FlagGroup(group) => {
                for (e, entry) in group.entries.iter().enumerate() {
                    for name in &entry.names {
                        index.insert(
                            cli_name(name),
                            Matched {
                                arg_index: i,
                                kind: MatchKind::FlagGroup,
                                entry_index: e,
                            },
                        );
                    }
                }
            }
            ArgSpec::Positional(_) => {}
        }
    }
    index
}

// ---------------------------------------------------------------------------
// Token classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenKind {
    LongOption,
    ShortGroup,
    DoubleDash,
    Positional,
}

fn classify_token(token: &str) -> TokenKind {
    if token == "--" {
        TokenKind::DoubleDash
    } else if token.len() >= 3 && token.starts_with("--") {
        TokenKind::LongOption
    } else if token.len() >= 2 && token.starts_with('-') && !token.starts_with("--") {
        TokenKind::ShortGroup
    } else {
        // Bare `-` and the empty string are positionals.
        TokenKind::Positional
    }
}

/// Strip the `--` prefix and split on the first `=`. `--x` gives
/// `("x", None)`; `--x=` gives `("x", Some(""))`.
fn split_long_option(token: &str) -> (&str, Option<&str>) {
    let stripped = &token[2..];
    match stripped.split_once('=') {
        Some((name, value)) => (name, Some(value)),
        None => (stripped, None),
    }
}

// ---------------------------------------------------------------------------
// Level parsing
// ---------------------------------------------------------------------------

/// Private intermediate result of one level; distinct from the public
/// outcome so recursion doesn't re-wrap variants at each boundary.
struct LevelOk {
    config: Config,
    command_path: Vec<String>,
    next_pos: usize,
}

enum LevelResult {
    Done(LevelOk),
    Help { command_path: Vec<String> },
    Version,
    Manpage { command_path: Vec<String> },
}

/// Store a converted value under `dest`: append into an array when the
/// argument is repeated, overwrite otherwise.
fn store_value(config: &mut Config, dest: &str, value: Value, repeated: bool) {
    if repeated {
        let slot = config
            .entry(dest.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        if let Value::Array(items) = slot {
            items.push(value);
        }
    } else {
        config.insert(dest.to_string(), value);
    }
}

/// A repeated flag resolves to its occurrence count, a plain flag to `true`.
fn apply_flag(config: &mut Config, flag: &FlagSpec, count: i64) {
    if flag.repeated {
        config.insert(flag.dest.clone(), Value::from(count));
    } else {
        config.insert(flag.dest.clone(), Value::Bool(true));
    }
}

fn parse_level(
    args: &[ArgSpec],
    commands: &[CommandSpec],
    tokens: &[String],
    start: usize,
    is_root: bool,
    version: Option<&str>,
) -> Result<LevelResult, Error> {
    let index = build_index(args);
    let mut config = Config::new();
    let mut command_path: Vec<String> = Vec::new();

    // Occurrence counters for repeated flags and flag groups.
    let mut counts = vec![0i64; args.len()];

    let positionals: Vec<&PositionalSpec> = args
        .iter()
        .filter_map(|arg| match arg {
            ArgSpec::Positional(pos) => Some(pos),
            _ => None,
        })
        .collect();
    let mut pos_cursor = 0usize;

    let mut options_terminated = false;
    let mut i = start;

    while i < tokens.len() {
        let token = tokens[i].as_str();

        if !options_terminated {
            let kind = classify_token(token);

            if kind == TokenKind::DoubleDash {
                options_terminated = true;
                i += 1;
                continue;
            }

            // Reserved tokens run before any index lookup, so a user-declared
            // argument with the same name is unreachable.
            if token == "--help" {
                return Ok(LevelResult::Help { command_path });
            }
            if token == "--help-man" {
                return Ok(LevelResult::Manpage { command_path });
            }
            if is_root && token == "--version" {
                if version.is_none() {
                    return Err(Error::new("--version: no version defined"));
                }
                return Ok(LevelResult::Version);
            }

            if kind == TokenKind::LongOption {
                let (name, eq_value) = split_long_option(token);
                let Some(matched) = index.get(&format!("--{name}")).copied() else {
                    return Err(Error::new(format!("unknown option: --{name}")));
                };

                match (&args[matched.arg_index], matched.kind) {
                    (ArgSpec::Flag(flag), MatchKind::Flag) => {
                        counts[matched.arg_index] += 1;
                        apply_flag(&mut config, flag, counts[matched.arg_index]);
                        i += 1;
                        continue;
                    }
                    (ArgSpec::Option(opt), MatchKind::Option) => {
                        let raw_value = match eq_value {
                            Some(value) => value,
                            None => {
                                i += 1;
                                let Some(next) = tokens.get(i) else {
                                    return Err(Error::new(format!(
                                        "option --{name} requires a value"
                                    )));
                                };
                                next.as_str()
                            }
                        };
                        let converted = opt
                            .converter
                            .parse(raw_value)
                            .map_err(|e| Error::new(format!("option --{name}: {e}")))?;
                        store_value(&mut config, &opt.dest, converted, opt.repeated);
                        i += 1;
                        continue;
                    }
                    (ArgSpec::FlagGroup(group), MatchKind::FlagGroup) => {
                        counts[matched.arg_index] += 1;
                        let value = group.entries[matched.entry_index].value.clone();
                        store_value(&mut config, &group.dest, value, group.repeated);
                        i += 1;
                        continue;
                    }
                    _ => unreachable!("index entry disagrees with arg list"),
                }
            }

            if kind == TokenKind::ShortGroup {
                let chars: Vec<char> = token.chars().skip(1).collect();
                for (c, ch) in chars.iter().enumerate() {
                    let short_name = format!("-{ch}");
                    let Some(matched) = index.get(&short_name).copied() else {
                        return Err(Error::new(format!("unknown option: {short_name}")));
                    };

                    match (&args[matched.arg_index], matched.kind) {
                        (ArgSpec::Flag(flag), MatchKind::Flag) => {
                            counts[matched.arg_index] += 1;
                            apply_flag(&mut config, flag, counts[matched.arg_index]);
                        }
                        (ArgSpec::Option(opt), MatchKind::Option) => {
                            if c != chars.len() - 1 {
                                return Err(Error::new(format!(
                                    "option {short_name} requires a value and must be last in a short group"
                                )));
                            }
                            i += 1;
                            let Some(raw_value) = tokens.get(i) else {
                                return Err(Error::new(format!(
                                    "option {short_name} requires a value"
                                )));
                            };
                            let converted = opt
                                .converter
                                .parse(raw_value)
                                .map_err(|e| Error::new(format!("option {short_name}: {e}")))?;
                            store_value(&mut config, &opt.dest, converted, opt.repeated);
                        }
                        (ArgSpec::FlagGroup(group), MatchKind::FlagGroup) => {
                            counts[matched.arg_index] += 1;
                            let value = group.entries[matched.entry_index].value.clone();
                            store_value(&mut config, &group.dest, value, group.repeated);
                        }
                        _ => unreachable!("index entry disagrees with arg list"),
                    }
                }
                i += 1;
                continue;
            }
        }

        // Subcommand boundary: only checked while options are live.
        if !options_terminated {
            if let Some(cmd) = commands.iter().find(|cmd| cmd.name == token) {
                command_path.push(cmd.name.clone());
                let sub = parse_level(&cmd.args, &cmd.commands, tokens, i + 1, false, None)?;
                match sub {
                    LevelResult::Help {
                        command_path: sub_path,
                    } => {
                        command_path.extend(sub_path);
                        return Ok(LevelResult::Help { command_path });
                    }
                    LevelResult::Manpage {
                        command_path: sub_path,
                    } => {
                        command_path.extend(sub_path);
                        return Ok(LevelResult::Manpage { command_path });
                    }
                    LevelResult::Version => return Ok(LevelResult::Version),
                    LevelResult::Done(sub_ok) => {
                        // Flat merge: a child's key silently wins over the
                        // parent's on collision.
                        for (key, value) in sub_ok.config {
                            config.insert(key, value);
                        }
                        command_path.extend(sub_ok.command_path);
                        i = sub_ok.next_pos;
                        continue;
                    }
                }
            }
        }

        // Positional. Also where unrecognized subcommand names end up.
        let Some(pos) = positionals.get(pos_cursor) else {
            return Err(Error::new(format!(
                "unexpected positional argument: {token}"
            )));
        };
        let converted = pos
            .converter
            .parse(token)
            .map_err(|e| Error::new(format!("positional {}: {e}", pos.name)))?;
        if pos.repeated {
            // A repeated slot never advances the cursor: it absorbs every
            // remaining positional token.
            store_value(&mut config, &pos.dest, converted, true);
        } else {
            config.insert(pos.dest.clone(), converted);
            pos_cursor += 1;
        }
        i += 1;
    }

    Ok(LevelResult::Done(LevelOk {
        config,
        command_path,
        next_pos: i,
    }))
}

// ---------------------------------------------------------------------------
// Post-processing: env fallback, defaults, validation
// ---------------------------------------------------------------------------

fn apply_env(config: &mut Config, args: &[ArgSpec], env: &EnvLookup) -> Result<(), Error> {
    for arg in args {
        match arg {
            ArgSpec::Flag(flag) => {
                // Absent or explicitly false: the env may still speak.
                let truthy = matches!(config.get(&flag.dest), Some(v) if *v != Value::Bool(false));
                if truthy {
                    continue;
                }
                let Some(binding) = &flag.env else { continue };
                let Some(raw) = env(&binding.var) else {
                    continue;
                };
                match conv::parse_bool_spelling(&raw) {
                    Some(b) => {
                        config.insert(flag.dest.clone(), Value::Bool(b));
                    }
                    None => {
                        return Err(Error::new(format!(
                            "env {}: expected boolean value, got '{raw}'",
                            binding.var
                        )));
                    }
                }
            }
            ArgSpec::Option(opt) => {
                if config.contains_key(&opt.dest) {
                    continue;
                }
                let Some(binding) = &opt.env else { continue };
                let Some(raw) = env(&binding.var) else {
                    continue;
                };
                let converted = opt
                    .converter
                    .parse(&raw)
                    .map_err(|e| Error::new(format!("env {}: {e}", binding.var)))?;
                config.insert(opt.dest.clone(), converted);
            }
            // Flag groups and positionals have no env binding.
            ArgSpec::FlagGroup(_) | ArgSpec::Positional(_) => {}
        }
    }
    Ok(())
}

fn apply_defaults(config: &mut Config, args: &[ArgSpec]) {
    for arg in args {
        match arg {
            ArgSpec::Flag(flag) => {
                if !config.contains_key(&flag.dest) {
                    config.insert(flag.dest.clone(), Value::Bool(false));
                }
            }
            ArgSpec::Option(opt) => {
                if !config.contains_key(&opt.dest) {
                    if let Some(default) = &opt.default {
                        config.insert(opt.dest.clone(), default.clone());
                    }
                }
            }
            ArgSpec::Positional(pos) => {
                if !config.contains_key(&pos.dest) {
                    if let Some(default) = &pos.default {
                        config.insert(pos.dest.clone(), default.clone());
                    }
                }
            }
            ArgSpec::FlagGroup(group) => {
                // A group always resolves; "absent" is never observable.
                if !config.contains_key(&group.dest) {
                    config.insert(group.dest.clone(), group.default_value.clone());
                }
            }
        }
    }
}

fn run_validators(config: &Config, args: &[ArgSpec]) -> Result<(), Error> {
    for arg in args {
        match arg {
            ArgSpec::Option(opt) => {
                opt.validator
                    .check(&opt.dest, config.get(&opt.dest))
                    .map_err(|e| Error::new(e.message()))?;
            }
            ArgSpec::Positional(pos) => {
                pos.validator
                    .check(&pos.dest, config.get(&pos.dest))
                    .map_err(|e| Error::new(e.message()))?;
            }
            // Flags and groups carry no validator.
            ArgSpec::Flag(_) | ArgSpec::FlagGroup(_) => {}
        }
    }
    Ok(())
}

fn post_process(
    config: &mut Config,
    args: &[ArgSpec],
    commands: &[CommandSpec],
    command_path: &[String],
    path_index: usize,
    env: &EnvLookup,
) -> Result<(), Error> {
    apply_env(config, args, env)?;
    apply_defaults(config, args);
    run_validators(config, args)?;

    if let Some(segment) = command_path.get(path_index) {
        if let Some(cmd) = commands.iter().find(|cmd| cmd.name == *segment) {
            post_process(
                config,
                &cmd.args,
                &cmd.commands,
                command_path,
                path_index + 1,
                env,
            )?;
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Parse `tokens` (argv minus the program name) against a compiled tree,
/// reading environment fallbacks from the process environment.
pub fn parse(root: &RootSpec, tokens: &[String]) -> Result<ParseOutcome, Error> {
    parse_with_env(root, tokens, &|var| std::env::var(var).ok())
}

/// Parse with an injected environment lookup.
///
/// The first failure aborts the whole parse; there is no partial output.
pub fn parse_with_env(
    root: &RootSpec,
    tokens: &[String],
    env: &EnvLookup,
) -> Result<ParseOutcome, Error> {
    let level = parse_level(
        &root.args,
        &root.commands,
        tokens,
        0,
        true,
        root.version.as_deref(),
    )?;

    let ok = match level {
        LevelResult::Help { command_path } => return Ok(ParseOutcome::Help { command_path }),
        LevelResult::Manpage { command_path } => return Ok(ParseOutcome::Manpage { command_path }),
        LevelResult::Version => return Ok(ParseOutcome::Version),
        LevelResult::Done(ok) => ok,
    };

    let mut config = ok.config;
    post_process(
        &mut config,
        &root.args,
        &root.commands,
        &ok.command_path,
        0,
        env,
    )?;

    Ok(ParseOutcome::Parsed {
        config,
        command_path: ok.command_path,
    })
}
