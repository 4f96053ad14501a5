//! String-to-value converters derived from type specifications.
//!
//! Every option and positional gets a [`Converter`] bound at compile time.
//! `parse` turns a raw CLI string into a JSON value, `format` is its
//! inverse, and `docv` is the placeholder shown in generated documentation.

use crate::model::{ScalarType, TypeSpec};
use serde_json::Value;
use thiserror::Error;

/// The separator used by compound converters when the schema declares none.
pub const DEFAULT_SEPARATOR: &str = ",";

/// A conversion failure, carrying a human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ConvError(String);

impl ConvError {
    fn new(message: impl Into<String>) -> Self {
        ConvError(message.into())
    }
}

/// A bidirectional string/value converter for one type specification.
#[derive(Debug, Clone, PartialEq)]
pub enum Converter {
    Str,
    Int,
    Float,
    Bool,
    Choice(Vec<String>),
    File,
    Dir,
    Path,
    List {
        element: Box<Converter>,
        separator: String,
    },
    Pair {
        first: Box<Converter>,
        second: Box<Converter>,
        separator: String,
    },
    Triple {
        first: Box<Converter>,
        second: Box<Converter>,
        third: Box<Converter>,
        separator: String,
    },
}

/// Build the converter for a scalar type.
///
/// An enum without a choice list behaves as a plain string; choice
/// checking is attached by [`for_type`] when choices are declared.
pub fn scalar(ty: ScalarType) -> Converter {
    match ty {
        ScalarType::String | ScalarType::Enum => Converter::Str,
        ScalarType::Int => Converter::Int,
        ScalarType::Float => Converter::Float,
        ScalarType::Bool => Converter::Bool,
        ScalarType::File => Converter::File,
        ScalarType::Dir => Converter::Dir,
        ScalarType::Path => Converter::Path,
    }
}

/// Build the converter for a full type specification.
pub fn for_type(spec: &TypeSpec, choices: Option<&[String]>) -> Converter {
    let sep = |separator: &Option<String>| {
        separator
            .clone()
            .unwrap_or_else(|| DEFAULT_SEPARATOR.to_string())
    };

    match spec {
        TypeSpec::Scalar(ty) => {
            if *ty == ScalarType::Enum {
                if let Some(choices) = choices {
                    return Converter::Choice(choices.to_vec());
                }
            }
            scalar(*ty)
        }
        TypeSpec::List(list) => Converter::List {
            element: Box::new(scalar(list.element)),
            separator: sep(&list.separator),
        },
        TypeSpec::Pair(pair) => Converter::Pair {
            first: Box::new(scalar(pair.first)),
            second: Box::new(scalar(pair.second)),
            separator: sep(&pair.separator),
        },
        TypeSpec::Triple(triple) => Converter::Triple {
            first: Box::new(scalar(triple.first)),
            second: Box::new(scalar(triple.second)),
            third: Box::new(scalar(triple.third)),
            separator: sep(&triple.separator),
        },
    }
}

impl Converter {
    /// Convert a raw CLI string into a typed JSON value.
    pub fn parse(&self, raw: &str) -> Result<Value, ConvError> {
        match self {
            Converter::Str | Converter::File | Converter::Dir | Converter::Path => {
                Ok(Value::String(raw.to_string()))
            }
            Converter::Int => {
                if raw.is_empty() {
                    return Err(ConvError::new("expected integer, got empty string"));
                }
                raw.parse::<i64>()
                    .map(Value::from)
                    .map_err(|_| ConvError::new(format!("expected integer, got '{raw}'")))
            }
            Converter::Float => {
                if raw.is_empty() {
                    return Err(ConvError::new("expected float, got empty string"));
                }
                let parsed: f64 = raw
                    .parse()
                    .map_err(|_| ConvError::new(format!("expected float, got '{raw}'")))?;
                serde_json::Number::from_f64(parsed)
                    .map(Value::Number)
                    .ok_or_else(|| ConvError::new(format!("expected float, got '{raw}'")))
            }
            Converter::Bool => {
                if raw.eq_ignore_ascii_case("true") {
                    Ok(Value::Bool(true))
                } else if raw.eq_ignore_ascii_case("false") {
                    Ok(Value::Bool(false))
                } else {
                    Err(ConvError::new(format!(
                        "expected 'true' or 'false', got '{raw}'"
                    )))
                }
            }
            Converter::Choice(choices) => {
                if choices.iter().any(|choice| choice == raw) {
                    Ok(Value::String(raw.to_string()))
                } else {
                    Err(ConvError::new(format!(
                        "invalid choice '{raw}', expected one of: {}",
                        choices.join(" ")
                    )))
                }
            }
            Converter::List { element, separator } => {
                if raw.is_empty() {
                    return Ok(Value::Array(Vec::new()));
                }
                let mut items = Vec::new();
                for part in raw.split(separator.as_str()) {
                    items.push(element.parse(part)?);
                }
                Ok(Value::Array(items))
            }
            Converter::Pair {
                first,
                second,
                separator,
            } => {
                let Some((a, b)) = raw.split_once(separator.as_str()) else {
                    return Err(ConvError::new(format!(
                        "expected pair separated by '{separator}', got '{raw}'"
                    )));
                };
                Ok(Value::Array(vec![first.parse(a)?, second.parse(b)?]))
            }
            Converter::Triple {
                first,
                second,
                third,
                separator,
            } => {
                let parts = raw
                    .split_once(separator.as_str())
                    .and_then(|(a, rest)| {
                        rest.split_once(separator.as_str()).map(|(b, c)| (a, b, c))
                    })
                    .ok_or_else(|| {
                        ConvError::new(format!(
                            "expected triple separated by '{separator}', got '{raw}'"
                        ))
                    })?;
                let (a, b, c) = parts;
                Ok(Value::Array(vec![
                    first.parse(a)?,
                    second.parse(b)?,
                    third.parse(c)?,
                ]))
            }
        }
    }

    /// Render a value this converter produced back into its string form.
    ///
    /// Assumes the value came from [`Converter::parse`]; it is not
    /// re-validated.
    pub fn format(&self, value: &Value) -> String {
        match self {
            Converter::Str
            | Converter::Choice(_)
            | Converter::File
            | Converter::Dir
            | Converter::Path => value
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| value.to_string()),
            Converter::Int | Converter::Float | Converter::Bool => value.to_string(),
            Converter::List { element, separator } => match value {
                Value::Array(items) => items
                    .iter()
                    .map(|item| element.format(item))
                    .collect::<Vec<_>>()
                    .join(separator),
                _ => value.to_string(),
            },
            Converter::Pair {
                first,
                second,
                separator,
            } => match value {
                Value::Array(items) if items.len() == 2 => format!(
                    "{}{separator}{}",
                    first.format(&items[0]),
                    second.format(&items[1])
                ),
                _ => value.to_string(),
            },
            Converter::Triple {
                first,
                second,
                third,
                separator,
            } => match value {
                Value::Array(items) if items.len() == 3 => format!(
                    "{}{separator}{}{separator}{}",
                    first.format(&items[0]),
                    second.format(&items[1]),
                    third.format(&items[2])
                ),
                _ => value.to_string(),
            },
        }
    }

    /// The placeholder name shown in documentation (`FILE`, `INT,...`).
    pub fn docv(&self) -> String {
        match self {
            Converter::Str => "STRING".to_string(),
            Converter::Int => "INT".to_string(),
            Converter::Float => "FLOAT".to_string(),
            Converter::Bool => "BOOL".to_string(),
            Converter::Choice(_) => "ENUM".to_string(),
            Converter::File => "FILE".to_string(),
            Converter::Dir => "DIR".to_string(),
            Converter::Path => "PATH".to_string(),
            Converter::List { element, separator } => {
                format!("{}{separator}...", element.docv())
            }
            Converter::Pair {
                first,
                second,
                separator,
            } => format!("{}{separator}{}", first.docv(), second.docv()),
            Converter::Triple {
                first,
                second,
                third,
                separator,
            } => format!(
                "{}{separator}{}{separator}{}",
                first.docv(),
                second.docv(),
                third.docv()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ListType, PairType, TripleType};
    use serde_json::json;

    fn list_of(element: ScalarType, separator: Option<&str>) -> Converter {
        for_type(
            &TypeSpec::List(ListType {
                element,
                separator: separator.map(str::to_string),
            }),
            None,
        )
    }

    #[test]
    fn test_string_passes_through() {
        assert_eq!(Converter::Str.parse("hello").unwrap(), json!("hello"));
        assert_eq!(Converter::Str.parse("").unwrap(), json!(""));
    }

    #[test]
    fn test_int_parses_whole_string() {
        assert_eq!(Converter::Int.parse("42").unwrap(), json!(42));
        assert_eq!(Converter::Int.parse("-7").unwrap(), json!(-7));
    }

    #[test]
    fn test_int_rejects_trailing_garbage() {
        let err = Converter::Int.parse("12abc").unwrap_err();
        assert_eq!(err.to_string(), "expected integer, got '12abc'");
    }

    #[test]
    fn test_int_rejects_empty_string() {
        let err = Converter::Int.parse("").unwrap_err();
        assert_eq!(err.to_string(), "expected integer, got empty string");
    }

    #[test]
    fn test_float_parses_and_rejects() {
        assert_eq!(Converter::Float.parse("1.5").unwrap(), json!(1.5));
        assert!(Converter::Float.parse("1.5x").is_err());
        assert!(Converter::Float.parse("").is_err());
        assert!(Converter::Float.parse("nan").is_err());
    }

    #[test]
    fn test_bool_is_case_insensitive() {
        assert_eq!(Converter::Bool.parse("true").unwrap(), json!(true));
        assert_eq!(Converter::Bool.parse("FALSE").unwrap(), json!(false));
        let err = Converter::Bool.parse("yes").unwrap_err();
        assert_eq!(err.to_string(), "expected 'true' or 'false', got 'yes'");
    }

    #[test]
    fn test_enum_without_choices_behaves_as_string() {
        let conv = for_type(&TypeSpec::Scalar(ScalarType::Enum), None);
        assert_eq!(conv.parse("anything").unwrap(), json!("anything"));
    }

    #[test]
    fn test_enum_with_choices_checks_membership() {
        let choices = vec!["red".to_string(), "green".to_string(), "blue".to_string()];
        let conv = for_type(&TypeSpec::Scalar(ScalarType::Enum), Some(&choices));
        assert_eq!(conv.parse("green").unwrap(), json!("green"));
        let err = conv.parse("mauve").unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid choice 'mauve', expected one of: red green blue"
        );
    }

    #[test]
    fn test_list_splits_on_default_separator() {
        let conv = list_of(ScalarType::Int, None);
        assert_eq!(conv.parse("1,2,3").unwrap(), json!([1, 2, 3]));
    }

    #[test]
    fn test_empty_list_input_is_empty_array() {
        let conv = list_of(ScalarType::String, None);
        assert_eq!(conv.parse("").unwrap(), json!([]));
    }

    #[test]
    fn test_list_custom_separator() {
        let conv = list_of(ScalarType::String, Some(":"));
        assert_eq!(conv.parse("a:b").unwrap(), json!(["a", "b"]));
    }

    #[test]
    fn test_list_first_element_failure_wins() {
        let conv = list_of(ScalarType::Int, None);
        let err = conv.parse("1,x,y").unwrap_err();
        assert_eq!(err.to_string(), "expected integer, got 'x'");
    }

    #[test]
    fn test_pair_splits_at_first_separator() {
        let conv = for_type(
            &TypeSpec::Pair(PairType {
                first: ScalarType::String,
                second: ScalarType::String,
                separator: Some("=".to_string()),
            }),
            None,
        );
        assert_eq!(conv.parse("a=b=c").unwrap(), json!(["a", "b=c"]));
    }

    #[test]
    fn test_pair_missing_separator_is_error() {
        let conv = for_type(
            &TypeSpec::Pair(PairType {
                first: ScalarType::String,
                second: ScalarType::Int,
                separator: None,
            }),
            None,
        );
        let err = conv.parse("lonely").unwrap_err();
        assert_eq!(
            err.to_string(),
            "expected pair separated by ',', got 'lonely'"
        );
    }

    #[test]
    fn test_triple_splits_left_to_right() {
        let conv = for_type(
            &TypeSpec::Triple(TripleType {
                first: ScalarType::String,
                second: ScalarType::String,
                third: ScalarType::String,
                separator: None,
            }),
            None,
        );
        assert_eq!(conv.parse("a,b,c,d").unwrap(), json!(["a", "b", "c,d"]));
    }

    #[test]
    fn test_triple_with_one_separator_is_error() {
        let conv = for_type(
            &TypeSpec::Triple(TripleType {
                first: ScalarType::Int,
                second: ScalarType::Int,
                third: ScalarType::Int,
                separator: None,
            }),
            None,
        );
        assert!(conv.parse("1,2").is_err());
    }

    #[test]
    fn test_docv_composition() {
        assert_eq!(Converter::Int.docv(), "INT");
        assert_eq!(list_of(ScalarType::File, None).docv(), "FILE,...");
        let conv = for_type(
            &TypeSpec::Pair(PairType {
                first: ScalarType::String,
                second: ScalarType::Int,
                separator: Some("=".to_string()),
            }),
            None,
        );
        assert_eq!(conv.docv(), "STRING=INT");
    }

    #[test]
    fn test_scalar_round_trips() {
        for (conv, raw) in [
            (Converter::Str, "hello"),
            (Converter::Int, "42"),
            (Converter::Float, "1.5"),
            (Converter::Bool, "true"),
            (Converter::File, "/tmp/x"),
        ] {
            let value = conv.parse(raw).unwrap();
            assert_eq!(conv.format(&value), raw);
        }
    }

    #[test]
    fn test_compound_round_trips() {
        let list = list_of(ScalarType::Int, None);
        let value = list.parse("1,2,3").unwrap();
        assert_eq!(list.format(&value), "1,2,3");

        let pair = for_type(
            &TypeSpec::Pair(PairType {
                first: ScalarType::String,
                second: ScalarType::Int,
                separator: Some("=".to_string()),
            }),
            None,
        );
        let value = pair.parse("depth=3").unwrap();
        assert_eq!(pair.format(&value), "depth=3");
    }
}
