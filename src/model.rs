//! Schema types describing a command-line interface.
//!
//! A [`Root`] is the declarative description of a program: its arguments,
//! its subcommand tree, and an optional version string. It is typically
//! loaded from JSON with [`Root::from_json`], then compiled into an
//! executable spec by the [`crate::spec`] module.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Errors that can occur while loading a schema.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("failed to parse JSON schema: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Documentation text, one string per line.
pub type DocString = Vec<String>;

/// Ordered list of CLI names for an argument.
///
/// Single-character names are short forms (`-v`), longer names are long
/// forms (`--verbose`). A list may mix both and must not be empty.
pub type ArgNames = Vec<String>;

/// The scalar value types an option or positional can carry.
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

/// A homogeneous list of scalar elements, split on a separator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListType {
    pub element: ScalarType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub separator: Option<String>,
}

/// Two scalar components split at the first separator occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairType {
    pub first: ScalarType,
    pub second: ScalarType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub separator: Option<String>,
}

/// Three scalar components split at the first two separator occurrences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripleType {
    pub first: ScalarType,
    pub second: ScalarType,
    pub third: ScalarType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub separator: Option<String>,
}

/// The type of an option or positional value.
///
/// Compound variants only contain scalar elements; nesting of
/// List/Pair/Triple is not representable. In JSON, a scalar is a bare
/// string (`"int"`) and compounds are tagged objects (`{"list": {...}}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeSpec {
    List(ListType),
    Pair(PairType),
    Triple(TripleType),
    #[serde(untagged)]
    Scalar(ScalarType),
}

/// An environment-variable binding: a bare variable name, or a variable
/// name with documentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EnvBinding {
    Var(String),
    Full {
        var: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        doc: Option<DocString>,
    },
}

impl EnvBinding {
    /// The bound variable name.
    pub fn var(&self) -> &str {
        match self {
            EnvBinding::Var(var) => var,
            EnvBinding::Full { var, .. } => var,
        }
    }
}

/// Keeps a present-but-null JSON default distinct from an absent one.
fn some_value<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// A boolean flag (`--verbose`, `-v`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flag {
    pub names: ArgNames,
    #[serde(default)]
    pub doc: DocString,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dest: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<EnvBinding>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeated: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deprecated: Option<String>,
}

/// One member of a flag group: its names and the fixed value it writes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlagGroupEntry {
    pub names: ArgNames,
    #[serde(default)]
    pub doc: DocString,
    pub value: Value,
}

/// A set of mutually exclusive flags writing fixed values into one
/// shared destination key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlagGroup {
    pub dest: String,
    #[serde(default)]
    pub doc: DocString,
    #[serde(rename = "default")]
    pub default: Value,
    pub flags: Vec<FlagGroupEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeated: Option<bool>,
}

/// A named argument that takes a typed value (`--output FILE`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionArg {
    pub names: ArgNames,
    #[serde(default)]
    pub doc: DocString,
    #[serde(rename = "type")]
    pub value_type: TypeSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docv: Option<String>,
    #[serde(
        default,
        deserialize_with = "some_value",
        skip_serializing_if = "Option::is_none"
    )]
    pub default: Option<Value>,
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
}

/// A positional argument; its name doubles as its destination key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Positional {
    pub name: String,
    #[serde(default)]
    pub doc: DocString,
    #[serde(rename = "type")]
    pub value_type: TypeSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docv: Option<String>,
    #[serde(
        default,
        deserialize_with = "some_value",
        skip_serializing_if = "Option::is_none"
    )]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeated: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub must_exist: Option<bool>,
}

/// One declared argument, tagged by `"kind"` in JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Argument {
    Flag(Flag),
    FlagGroup(FlagGroup),
    Option(OptionArg),
    Positional(Positional),
}

/// A subcommand: its own arguments plus nested subcommands.
///
/// Commands form a strict tree; every child is exclusively owned by its
/// parent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub name: String,
    #[serde(default)]
    pub doc: DocString,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<Argument>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commands: Option<Vec<Command>>,
}

/// Well-known locations of a runtime configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigPaths {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local: Option<String>,
}

/// Description of the runtime configuration file a program reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    pub format: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paths: Option<ConfigPaths>,
}

/// The root of a schema: the program itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Root {
    pub name: String,
    #[serde(default)]
    pub doc: DocString,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<Argument>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commands: Option<Vec<Command>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<RuntimeConfig>,
}

impl Root {
    /// Parse a JSON string into a schema root.
    ///
    /// Structural validation beyond what the types enforce (for example
    /// metaschema checks) is not performed here.
    pub fn from_json(json: &str) -> Result<Root, SchemaError> {
        let root: Root = serde_json::from_str(json)?;
        Ok(root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalar_type_spec_from_bare_string() {
        let spec: TypeSpec = serde_json::from_value(json!("int")).unwrap();
        assert_eq!(spec, TypeSpec::Scalar(ScalarType::Int));
    }

    #[test]
    fn test_list_type_spec_from_tagged_object() {
        let spec: TypeSpec =
            serde_json::from_value(json!({"list": {"element": "file"}})).unwrap();
        assert_eq!(
            spec,
            TypeSpec::List(ListType {
                element: ScalarType::File,
                separator: None,
            })
        );
    }

    #[test]
    fn test_pair_type_spec_with_separator() {
        let spec: TypeSpec = serde_json::from_value(
            json!({"pair": {"first": "string", "second": "int", "separator": "="}}),
        )
        .unwrap();
        assert_eq!(
            spec,
            TypeSpec::Pair(PairType {
                first: ScalarType::String,
                second: ScalarType::Int,
                separator: Some("=".to_string()),
            })
        );
    }

    #[test]
    fn test_type_spec_round_trip() {
        let spec = TypeSpec::Triple(TripleType {
            first: ScalarType::Int,
            second: ScalarType::Float,
            third: ScalarType::Path,
            separator: Some(":".to_string()),
        });
        let encoded = serde_json::to_value(&spec).unwrap();
        assert_eq!(
            encoded,
            json!({"triple": {"first": "int", "second": "float", "third": "path", "separator": ":"}})
        );
        let decoded: TypeSpec = serde_json::from_value(encoded).unwrap();
        assert_eq!(decoded, spec);
    }

    #[test]
    fn test_argument_kind_dispatch() {
        let arg: Argument = serde_json::from_value(json!({
            "kind": "flag",
            "names": ["verbose", "v"]
        }))
        .unwrap();
        match arg {
            Argument::Flag(flag) => assert_eq!(flag.names, vec!["verbose", "v"]),
            other => panic!("expected flag, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_argument_kind_is_rejected() {
        let result: Result<Argument, _> =
            serde_json::from_value(json!({"kind": "toggle", "names": ["x"]}));
        assert!(result.is_err());
    }

    #[test]
    fn test_env_binding_bare_string() {
        let binding: EnvBinding = serde_json::from_value(json!("MY_VAR")).unwrap();
        assert_eq!(binding.var(), "MY_VAR");
    }

    #[test]
    fn test_env_binding_object_with_doc() {
        let binding: EnvBinding =
            serde_json::from_value(json!({"var": "MY_VAR", "doc": ["overrides the default"]}))
                .unwrap();
        assert_eq!(binding.var(), "MY_VAR");
        match binding {
            EnvBinding::Full { doc, .. } => {
                assert_eq!(doc, Some(vec!["overrides the default".to_string()]))
            }
            other => panic!("expected full binding, got {:?}", other),
        }
    }

    #[test]
    fn test_null_default_is_distinct_from_absent() {
        let with_null: OptionArg = serde_json::from_value(json!({
            "names": ["out"],
            "type": "string",
            "default": null
        }))
        .unwrap();
        assert_eq!(with_null.default, Some(Value::Null));

        let without: OptionArg = serde_json::from_value(json!({
            "names": ["out"],
            "type": "string"
        }))
        .unwrap();
        assert_eq!(without.default, None);
    }

    #[test]
    fn test_null_default_survives_round_trip() {
        let arg: OptionArg = serde_json::from_value(json!({
            "names": ["out"],
            "type": "string",
            "default": null
        }))
        .unwrap();
        let encoded = serde_json::to_value(&arg).unwrap();
        assert_eq!(encoded.get("default"), Some(&Value::Null));
    }

    #[test]
    fn test_root_from_json_with_nested_commands() {
        let root = Root::from_json(
            r#"{
                "name": "tool",
                "version": "1.2.3",
                "commands": [
                    {"name": "config", "commands": [
                        {"name": "set", "args": [
                            {"kind": "positional", "name": "key", "type": "string"},
                            {"kind": "positional", "name": "value", "type": "string"}
                        ]}
                    ]}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(root.name, "tool");
        assert_eq!(root.version.as_deref(), Some("1.2.3"));
        let commands = root.commands.unwrap();
        assert_eq!(commands.len(), 1);
        let nested = commands[0].commands.as_ref().unwrap();
        assert_eq!(nested[0].name, "set");
        assert_eq!(nested[0].args.as_ref().unwrap().len(), 2);
    }

    #[test]
    fn test_root_from_json_rejects_malformed_input() {
        assert!(matches!(
            Root::from_json("{not json"),
            Err(SchemaError::Parse(_))
        ));
    }

    #[test]
    fn test_flag_group_requires_default() {
        let result: Result<FlagGroup, _> = serde_json::from_value(json!({
            "dest": "level",
            "flags": [{"names": ["quiet"], "value": "quiet"}]
        }));
        assert!(result.is_err());
    }
}
