//! declap - declarative command-line parsing driven by JSON schemas.
//!
//! A schema describes a program's flags, options, positionals and nested
//! subcommands as data. The library deserializes the schema, compiles it
//! into a parse-ready form with converters and validators bound up front,
//! and parses argument vectors into typed JSON configurations.

pub mod conv;
pub mod model;
pub mod parse;
pub mod spec;
pub mod validate;

pub use conv::{ConvError, Converter};
pub use model::{Argument, Command, Root, SchemaError};
pub use parse::{no_env, parse, process_env, Config, ParseError, ParseOutcome};
pub use spec::{compile, ArgSpec, CommandSpec, RootSpec};
pub use validate::{ValidationError, Validator};
