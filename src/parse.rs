//! The parsing engine: an argument vector in, a structured configuration out.
//!
//! Parsing walks the token list once per command level: options are resolved
//! through a per-level name index, subcommand tokens recurse into the child
//! level, and everything else fills positional slots. After a successful
//! scan, a post-processing pass walks the resolved command path and applies,
//! per level and in this order: environment fallback, defaults, validation.
//! `--help`, `--help-man` and the root-only `--version` short-circuit the
//! scan and skip post-processing entirely.

use crate::conv::ConvError;
use crate::spec::{ArgSpec, CommandSpec, FlagGroupSpec, FlagSpec, OptionSpec, PositionalSpec, RootSpec};
use crate::validate::ValidationError;
use serde_json::{Map, Value};
use std::collections::HashMap;
use thiserror::Error;

/// A parsed configuration: destination key to typed value.
pub type Config = Map<String, Value>;

/// Errors that can occur during parsing. All are terminal: a failing parse
/// yields no configuration at all.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("unknown option: {0}")]
    UnknownOption(String),

    #[error("option {0} requires a value")]
    MissingValue(String),

    #[error("option {0} requires a value and must be last in a short group")]
    OptionNotLast(String),

    #[error("option {name}: {source}")]
    InvalidValue { name: String, source: ConvError },

    #[error("positional {name}: {source}")]
    InvalidPositional { name: String, source: ConvError },

    #[error("unexpected positional argument: {0}")]
    UnexpectedPositional(String),

    #[error("unknown subcommand: {0}")]
    UnknownSubcommand(String),

    #[error("--version: no version defined")]
    NoVersion,

    #[error("env {var}: expected boolean value, got '{value}'")]
    EnvNotBool { var: String, value: String },

    #[error("env {var}: {source}")]
    EnvInvalid { var: String, source: ConvError },

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Outcome of parsing an argument vector against a compiled spec.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    /// Parsed configuration plus the resolved subcommand path.
    Success {
        config: Config,
        command_path: Vec<String>,
    },
    /// `--help` was seen; carries the command path accumulated so far.
    Help { command_path: Vec<String> },
    /// `--version` was seen at the root.
    Version,
    /// `--help-man` was seen.
    Manpage { command_path: Vec<String> },
}

/// Environment lookup backed by the process environment.
pub fn process_env(var: &str) -> Option<String> {
    std::env::var(var).ok()
}

/// Environment lookup that never resolves anything.
pub fn no_env(_var: &str) -> Option<String> {
    None
}

// ---------------------------------------------------------------------------
// Tokenization
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenKind {
    LongOption,
    ShortGroup,
    DoubleDash,
    Positional,
}

fn classify_token(token: &str) -> TokenKind {
    let bytes = token.as_bytes();
    if token == "--" {
        TokenKind::DoubleDash
    } else if bytes.len() >= 3 && bytes[0] == b'-' && bytes[1] == b'-' {
        TokenKind::LongOption
    } else if bytes.len() >= 2 && bytes[0] == b'-' && bytes[1] != b'-' {
        TokenKind::ShortGroup
    } else {
        TokenKind::Positional
    }
}

/// Strip the leading `--` and split on the first `=` only, so
/// `--foo=bar=baz` yields (`foo`, `bar=baz`).
fn split_long_option(token: &str) -> (&str, Option<&str>) {
    let stripped = &token[2..];
    match stripped.split_once('=') {
        Some((name, value)) => (name, Some(value)),
        None => (stripped, None),
    }
}

// ---------------------------------------------------------------------------
// Name index
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct NameMatch {
    arg_index: usize,
    entry_index: usize,
}

/// The canonical CLI form of a declared name: `-x` or `--xxx`.
fn cli_name(name: &str) -> String {
    if name.chars().count() == 1 {
        format!("-{name}")
    } else {
        format!("--{name}")
    }
}

/// Build the per-level lookup from canonical CLI tokens to arguments.
/// Positionals are never indexed by name.
fn build_index(args: &[ArgSpec]) -> HashMap<String, NameMatch> {
    let mut index = HashMap::new();
    for (arg_index, arg) in args.iter().enumerate() {
        match arg {
            ArgSpec::Flag(flag) => {
                for name in &flag.names {
                    index.entry(cli_name(name)).or_insert(NameMatch {
                        arg_index,
                        entry_index: 0,
                    });
                }
            }
            ArgSpec::Option(opt) => {
                for name in &opt.names {
                    index.entry(cli_name(name)).or_insert(NameMatch {
                        arg_index,
                        entry_index: 0,
                    });
                }
            }
            ArgSpec::FlagGroup(group) => {
                for (entry_index, entry) in group.entries.iter().enumerate() {
                    for name in &entry.names {
                        index.entry(cli_name(name)).or_insert(NameMatch {
                            arg_index,
                            entry_index,
                        });
                    }
                }
            }
            ArgSpec::Positional(_) => {}
        }
    }
    index
}

// ---------------------------------------------------------------------------
// Level parsing
// ---------------------------------------------------------------------------

#[derive(Debug)]
enum LevelOutcome {
    Done {
        config: Config,
        command_path: Vec<String>,
        next_pos: usize,
    },
    Help {
        command_path: Vec<String>,
    },
    Version,
    Manpage {
        command_path: Vec<String>,
    },
}

fn record_flag(config: &mut Config, flag: &FlagSpec, count: &mut i64) {
    *count += 1;
    let value = if flag.repeated {
        Value::from(*count)
    } else {
        Value::Bool(true)
    };
    config.insert(flag.dest.clone(), value);
}

fn record_option(
    config: &mut Config,
    opt: &OptionSpec,
    display: &str,
    raw: &str,
) -> Result<(), ParseError> {
    let converted = opt.converter.parse(raw).map_err(|source| ParseError::InvalidValue {
        name: display.to_string(),
        source,
    })?;
    push_or_set(config, &opt.dest, opt.repeated, converted);
    Ok(())
}

fn record_group_entry(config: &mut Config, group: &FlagGroupSpec, entry_index: usize) {
    let value = group.entries[entry_index].value.clone();
    push_or_set(config, &group.dest, group.repeated, value);
}

/// Repeated arguments accumulate into an array; singular ones overwrite
/// (last occurrence wins).
fn push_or_set(config: &mut Config, dest: &str, repeated: bool, value: Value) {
    if !repeated {
        config.insert(dest.to_string(), value);
        return;
    }
    match config.get_mut(dest) {
        Some(Value::Array(items)) => items.push(value),
        _ => {
            config.insert(dest.to_string(), Value::Array(vec![value]));
        }
    }
}

fn parse_level(
    args: &[ArgSpec],
    commands: &[CommandSpec],
    tokens: &[String],
    start: usize,
    is_root: bool,
    version: Option<&str>,
) -> Result<LevelOutcome, ParseError> {
    let index = build_index(args);
    let mut config = Config::new();
    let mut command_path: Vec<String> = Vec::new();
    let mut flag_counts = vec![0i64; args.len()];

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
        let token = &tokens[i];

        if !options_terminated {
            let kind = classify_token(token);

            if kind == TokenKind::DoubleDash {
                options_terminated = true;
                i += 1;
                continue;
            }

            // Reserved tokens win over schema-declared names.
            if token == "--help" {
                return Ok(LevelOutcome::Help { command_path });
            }
            if token == "--help-man" {
                return Ok(LevelOutcome::Manpage { command_path });
            }
            if is_root && token == "--version" {
                if version.is_none() {
                    return Err(ParseError::NoVersion);
                }
                return Ok(LevelOutcome::Version);
            }

            if kind == TokenKind::LongOption {
                let (name, inline_value) = split_long_option(token);
                let display = format!("--{name}");
                let Some(&found) = index.get(display.as_str()) else {
                    return Err(ParseError::UnknownOption(display));
                };
                match &args[found.arg_index] {
                    ArgSpec::Flag(flag) => {
                        record_flag(&mut config, flag, &mut flag_counts[found.arg_index]);
                    }
                    ArgSpec::Option(opt) => {
                        let raw = match inline_value {
                            Some(value) => value.to_string(),
                            None => {
                                i += 1;
                                tokens
                                    .get(i)
                                    .cloned()
                                    .ok_or_else(|| ParseError::MissingValue(display.clone()))?
                            }
                        };
                        record_option(&mut config, opt, &display, &raw)?;
                    }
                    ArgSpec::FlagGroup(group) => {
                        record_group_entry(&mut config, group, found.entry_index);
                    }
                    ArgSpec::Positional(_) => {
                        return Err(ParseError::UnknownOption(display));
                    }
                }
                i += 1;
                continue;
            }

            if kind == TokenKind::ShortGroup {
                let chars: Vec<char> = token.chars().skip(1).collect();
                for (char_pos, c) in chars.iter().enumerate() {
                    let display = format!("-{c}");
                    let Some(&found) = index.get(display.as_str()) else {
                        return Err(ParseError::UnknownOption(display));
                    };
                    match &args[found.arg_index] {
                        ArgSpec::Flag(flag) => {
                            record_flag(&mut config, flag, &mut flag_counts[found.arg_index]);
                        }
                        ArgSpec::Option(opt) => {
                            if char_pos != chars.len() - 1 {
                                return Err(ParseError::OptionNotLast(display));
                            }
                            i += 1;
                            let raw = tokens
                                .get(i)
                                .ok_or_else(|| ParseError::MissingValue(display.clone()))?;
                            record_option(&mut config, opt, &display, raw)?;
                        }
                        ArgSpec::FlagGroup(group) => {
                            record_group_entry(&mut config, group, found.entry_index);
                        }
                        ArgSpec::Positional(_) => {
                            return Err(ParseError::UnknownOption(display));
                        }
                    }
                }
                i += 1;
                continue;
            }
        }

        // Subcommand dispatch, only while options are live.
        if !options_terminated {
            if let Some(command) = commands.iter().find(|command| &command.name == token) {
                command_path.push(command.name.clone());
                match parse_level(&command.args, &command.commands, tokens, i + 1, false, None)? {
                    LevelOutcome::Help {
                        command_path: sub_path,
                    } => {
                        command_path.extend(sub_path);
                        return Ok(LevelOutcome::Help { command_path });
                    }
                    LevelOutcome::Manpage {
                        command_path: sub_path,
                    } => {
                        command_path.extend(sub_path);
                        return Ok(LevelOutcome::Manpage { command_path });
                    }
                    LevelOutcome::Version => return Ok(LevelOutcome::Version),
                    LevelOutcome::Done {
                        config: sub_config,
                        command_path: sub_path,
                        next_pos,
                    } => {
                        // Inner entries overwrite on key collision.
                        for (key, value) in sub_config {
                            config.insert(key, value);
                        }
                        command_path.extend(sub_path);
                        i = next_pos;
                    }
                }
                continue;
            }
        }

        // Everything else fills positional slots in declared order.
        let Some(pos) = positionals.get(pos_cursor) else {
            if !options_terminated && !commands.is_empty() {
                return Err(ParseError::UnknownSubcommand(token.clone()));
            }
            return Err(ParseError::UnexpectedPositional(token.clone()));
        };
        let converted = pos
            .converter
            .parse(token)
            .map_err(|source| ParseError::InvalidPositional {
                name: pos.name.clone(),
                source,
            })?;
        if pos.repeated {
            push_or_set(&mut config, &pos.dest, true, converted);
        } else {
            config.insert(pos.dest.clone(), converted);
            pos_cursor += 1;
        }
        i += 1;
    }

    Ok(LevelOutcome::Done {
        config,
        command_path,
        next_pos: i,
    })
}

// ---------------------------------------------------------------------------
// Post-processing
// ---------------------------------------------------------------------------

fn apply_env<E>(config: &mut Config, args: &[ArgSpec], env: &E) -> Result<(), ParseError>
where
    E: Fn(&str) -> Option<String>,
{
    for arg in args {
        match arg {
            ArgSpec::Flag(flag) => {
                // A CLI-supplied flag value wins over the environment.
                if config
                    .get(&flag.dest)
                    .is_some_and(|value| value != &Value::Bool(false))
                {
                    continue;
                }
                let Some(binding) = &flag.env else { continue };
                let Some(raw) = env(&binding.var) else { continue };
                let value = match raw.to_ascii_lowercase().as_str() {
                    "true" | "1" => true,
                    "false" | "0" => false,
                    _ => {
                        return Err(ParseError::EnvNotBool {
                            var: binding.var.clone(),
                            value: raw,
                        })
                    }
                };
                config.insert(flag.dest.clone(), Value::Bool(value));
            }
            ArgSpec::Option(opt) => {
                if config.contains_key(&opt.dest) {
                    continue;
                }
                let Some(binding) = &opt.env else { continue };
                let Some(raw) = env(&binding.var) else { continue };
                let converted =
                    opt.converter
                        .parse(&raw)
                        .map_err(|source| ParseError::EnvInvalid {
                            var: binding.var.clone(),
                            source,
                        })?;
                config.insert(opt.dest.clone(), converted);
            }
            // Flag groups and positionals carry no environment binding.
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
                if !config.contains_key(&group.dest) {
                    config.insert(group.dest.clone(), group.default.clone());
                }
            }
        }
    }
}

fn run_validators(config: &Config, args: &[ArgSpec]) -> Result<(), ParseError> {
    for arg in args {
        match arg {
            ArgSpec::Option(opt) => {
                opt.validator.check(&opt.dest, config.get(&opt.dest))?;
            }
            ArgSpec::Positional(pos) => {
                pos.validator.check(&pos.dest, config.get(&pos.dest))?;
            }
            ArgSpec::Flag(_) | ArgSpec::FlagGroup(_) => {}
        }
    }
    Ok(())
}

fn post_process<E>(
    config: &mut Config,
    args: &[ArgSpec],
    commands: &[CommandSpec],
    command_path: &[String],
    env: &E,
) -> Result<(), ParseError>
where
    E: Fn(&str) -> Option<String>,
{
    apply_env(config, args, env)?;
    apply_defaults(config, args);
    run_validators(config, args)?;

    if let Some((segment, rest)) = command_path.split_first() {
        if let Some(command) = commands.iter().find(|command| &command.name == segment) {
            post_process(config, &command.args, &command.commands, rest, env)?;
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Parse an argument vector against a compiled spec.
///
/// `env` supplies environment-variable lookups; pass [`process_env`] for
/// the real environment or [`no_env`] (or an in-memory closure) in tests.
pub fn parse<E>(root: &RootSpec, tokens: &[String], env: E) -> Result<ParseOutcome, ParseError>
where
    E: Fn(&str) -> Option<String>,
{
    match parse_level(
        &root.args,
        &root.commands,
        tokens,
        0,
        true,
        root.version.as_deref(),
    )? {
        LevelOutcome::Help { command_path } => Ok(ParseOutcome::Help { command_path }),
        LevelOutcome::Manpage { command_path } => Ok(ParseOutcome::Manpage { command_path }),
        LevelOutcome::Version => Ok(ParseOutcome::Version),
        LevelOutcome::Done {
            mut config,
            command_path,
            ..
        } => {
            post_process(&mut config, &root.args, &root.commands, &command_path, &env)?;
            Ok(ParseOutcome::Success {
                config,
                command_path,
            })
        }
    }
}
