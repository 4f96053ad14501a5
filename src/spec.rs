//! Compilation of schema trees into immutable, parse-ready specs.
//!
//! Compilation resolves destination keys, binds converters and validators,
//! and recursively compiles the subcommand tree. A compiled [`RootSpec`] is
//! never mutated by parsing, so one instance can serve any number of parse
//! invocations.

use crate::conv::{self, Converter};
use crate::model::{
    Argument, Command, DocString, EnvBinding, Flag, FlagGroup, OptionArg, Positional, Root,
    RuntimeConfig,
};
use crate::validate::{self, Validator};
use serde_json::Value;

/// A resolved environment binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvSpec {
    pub var: String,
    pub doc: Option<DocString>,
}

/// A compiled flag.
#[derive(Debug, Clone, PartialEq)]
pub struct FlagSpec {
    pub names: Vec<String>,
    pub dest: String,
    pub repeated: bool,
    pub env: Option<EnvSpec>,
    pub deprecated: Option<String>,
}

/// One compiled flag-group entry.
#[derive(Debug, Clone, PartialEq)]
pub struct FlagGroupEntrySpec {
    pub names: Vec<String>,
    pub value: Value,
}

/// A compiled flag group.
#[derive(Debug, Clone, PartialEq)]
pub struct FlagGroupSpec {
    pub dest: String,
    pub default: Value,
    pub entries: Vec<FlagGroupEntrySpec>,
    pub repeated: bool,
}

/// A compiled option with its bound converter and validator.
#[derive(Debug, Clone, PartialEq)]
pub struct OptionSpec {
    pub names: Vec<String>,
    pub dest: String,
    pub converter: Converter,
    pub validator: Validator,
    pub docv: String,
    pub default: Option<Value>,
    pub repeated: bool,
    pub env: Option<EnvSpec>,
}

/// A compiled positional with its bound converter and validator.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionalSpec {
    pub name: String,
    pub dest: String,
    pub converter: Converter,
    pub validator: Validator,
    pub docv: String,
    pub default: Option<Value>,
    pub repeated: bool,
}

/// One compiled argument.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgSpec {
    Flag(FlagSpec),
    FlagGroup(FlagGroupSpec),
    Option(OptionSpec),
    Positional(PositionalSpec),
}

/// A compiled subcommand level.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandSpec {
    pub name: String,
    pub doc: DocString,
    pub args: Vec<ArgSpec>,
    pub commands: Vec<CommandSpec>,
}

/// The compiled root of a schema.
#[derive(Debug, Clone, PartialEq)]
pub struct RootSpec {
    pub name: String,
    pub doc: DocString,
    pub args: Vec<ArgSpec>,
    pub commands: Vec<CommandSpec>,
    pub version: Option<String>,
    pub config: Option<RuntimeConfig>,
}

/// The first long name, or the first name overall when no long name exists.
fn resolve_dest(names: &[String]) -> String {
    names
        .iter()
        .find(|name| name.chars().count() > 1)
        .or_else(|| names.first())
        .cloned()
        .unwrap_or_default()
}

fn resolve_env(binding: &EnvBinding) -> EnvSpec {
    match binding {
        EnvBinding::Var(var) => EnvSpec {
            var: var.clone(),
            doc: None,
        },
        EnvBinding::Full { var, doc } => EnvSpec {
            var: var.clone(),
            doc: doc.clone(),
        },
    }
}

fn resolve_env_opt(binding: Option<&EnvBinding>) -> Option<EnvSpec> {
    binding.map(resolve_env)
}

fn compile_flag(flag: &Flag) -> FlagSpec {
    FlagSpec {
        names: flag.names.clone(),
        dest: flag
            .dest
            .clone()
            .unwrap_or_else(|| resolve_dest(&flag.names)),
        repeated: flag.repeated.unwrap_or(false),
        env: resolve_env_opt(flag.env.as_ref()),
        deprecated: flag.deprecated.clone(),
    }
}

fn compile_flag_group(group: &FlagGroup) -> FlagGroupSpec {
    FlagGroupSpec {
        dest: group.dest.clone(),
        default: group.default.clone(),
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

fn compile_option(opt: &OptionArg) -> OptionSpec {
    let converter = conv::for_type(&opt.value_type, opt.choices.as_deref());
    let docv = opt.docv.clone().unwrap_or_else(|| converter.docv());
    OptionSpec {
        names: opt.names.clone(),
        dest: opt.dest.clone().unwrap_or_else(|| resolve_dest(&opt.names)),
        validator: validate::from_option(opt),
        converter,
        docv,
        default: opt.default.clone(),
        repeated: opt.repeated.unwrap_or(false),
        env: resolve_env_opt(opt.env.as_ref()),
    }
}

fn compile_positional(pos: &Positional) -> PositionalSpec {
    let converter = conv::for_type(&pos.value_type, None);
    let docv = pos.docv.clone().unwrap_or_else(|| converter.docv());
    PositionalSpec {
        name: pos.name.clone(),
        dest: pos.name.clone(),
        validator: validate::from_positional(pos),
        converter,
        docv,
        default: pos.default.clone(),
        repeated: pos.repeated.unwrap_or(false),
    }
}

/// Compile a single argument.
pub fn compile_arg(argument: &Argument) -> ArgSpec {
    match argument {
        Argument::Flag(flag) => ArgSpec::Flag(compile_flag(flag)),
        Argument::FlagGroup(group) => ArgSpec::FlagGroup(compile_flag_group(group)),
        Argument::Option(opt) => ArgSpec::Option(compile_option(opt)),
        Argument::Positional(pos) => ArgSpec::Positional(compile_positional(pos)),
    }
}

/// Compile a list of arguments, preserving declaration order.
pub fn compile_args(arguments: &[Argument]) -> Vec<ArgSpec> {
    arguments.iter().map(compile_arg).collect()
}

/// Compile a command and its subtree, depth first.
pub fn compile_command(command: &Command) -> CommandSpec {
    CommandSpec {
        name: command.name.clone(),
        doc: command.doc.clone(),
        args: command.args.as_deref().map(compile_args).unwrap_or_default(),
        commands: command
            .commands
            .as_deref()
            .map(|commands| commands.iter().map(compile_command).collect())
            .unwrap_or_default(),
    }
}

/// Compile a schema root into its executable spec.
pub fn compile(root: &Root) -> RootSpec {
    RootSpec {
        name: root.name.clone(),
        doc: root.doc.clone(),
        args: root.args.as_deref().map(compile_args).unwrap_or_default(),
        commands: root
            .commands
            .as_deref()
            .map(|commands| commands.iter().map(compile_command).collect())
            .unwrap_or_default(),
        version: root.version.clone(),
        config: root.config.clone(),
    }
}
