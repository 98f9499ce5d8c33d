//! Generation-parameter validation and coercion.
//!
//! Session options are set with `/set parameter <name> <values...>`. Each
//! parameter has a declared kind; values are validated and coerced into JSON
//! values before they reach the options map, so the server never sees a
//! malformed parameter and an unknown name is rejected at dispatch time.

use serde_json::Value;

use crate::error::{Error, Result};

/// The expected value type of a generation parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterKind {
    /// A single integer.
    Int,
    /// A single finite float.
    Float,
    /// A single boolean (`true` or `false`).
    Bool,
    /// One or more strings (e.g. stop sequences).
    StringList,
}

/// Looks up the kind of a known generation parameter.
///
/// Returns `None` for names the server does not understand.
pub fn parameter_kind(name: &str) -> Option<ParameterKind> {
    match name {
        "seed" | "num_predict" | "top_k" | "num_ctx" | "repeat_last_n" | "num_gpu"
        | "num_thread" | "num_keep" | "num_batch" | "mirostat" => Some(ParameterKind::Int),
        "temperature" | "top_p" | "repeat_penalty" | "tfs_z" | "typical_p"
        | "presence_penalty" | "frequency_penalty" | "mirostat_tau" | "mirostat_eta" => {
            Some(ParameterKind::Float)
        }
        "numa" | "use_mmap" | "use_mlock" | "f16_kv" | "vocab_only" | "embedding_only"
        | "low_vram" | "penalize_newline" => Some(ParameterKind::Bool),
        "stop" => Some(ParameterKind::StringList),
        _ => None,
    }
}

/// Validates and coerces raw argument strings into the parameter's JSON value.
///
/// # Errors
///
/// Returns a validation error for unknown names, missing or surplus values,
/// and values that do not parse as the declared kind. On error the caller's
/// options map must be left unchanged.
pub fn coerce_parameter(name: &str, values: &[String]) -> Result<Value> {
    let Some(kind) = parameter_kind(name) else {
        return Err(Error::validation(
            format!("unknown parameter '{name}'"),
            Some(name.to_string()),
        ));
    };
    if values.is_empty() {
        return Err(Error::validation(
            "requires a value",
            Some(name.to_string()),
        ));
    }
    match kind {
        ParameterKind::Int => {
            let value = single(name, values)?;
            let parsed: i64 = value.parse().map_err(|_| {
                Error::validation("expects an integer", Some(name.to_string()))
            })?;
            Ok(Value::from(parsed))
        }
        ParameterKind::Float => {
            let value = single(name, values)?;
            let parsed: f64 = value.parse().map_err(|_| {
                Error::validation("expects a number", Some(name.to_string()))
            })?;
            if !parsed.is_finite() {
                return Err(Error::validation(
                    "expects a finite number",
                    Some(name.to_string()),
                ));
            }
            Ok(Value::from(parsed))
        }
        ParameterKind::Bool => match single(name, values)? {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            _ => Err(Error::validation(
                "expects 'true' or 'false'",
                Some(name.to_string()),
            )),
        },
        ParameterKind::StringList => Ok(Value::Array(
            values.iter().map(|v| Value::from(v.as_str())).collect(),
        )),
    }
}

fn single<'a>(name: &str, values: &'a [String]) -> Result<&'a str> {
    if values.len() != 1 {
        return Err(Error::validation(
            "expects a single value",
            Some(name.to_string()),
        ));
    }
    Ok(&values[0])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn coerce_float() {
        let value = coerce_parameter("temperature", &args(&["0.7"])).unwrap();
        assert_eq!(value, Value::from(0.7));
    }

    #[test]
    fn coerce_int() {
        let value = coerce_parameter("top_k", &args(&["40"])).unwrap();
        assert_eq!(value, Value::from(40));
    }

    #[test]
    fn coerce_bool() {
        assert_eq!(
            coerce_parameter("penalize_newline", &args(&["true"])).unwrap(),
            Value::Bool(true)
        );
        assert!(coerce_parameter("penalize_newline", &args(&["yes"])).is_err());
    }

    #[test]
    fn coerce_stop_sequences() {
        let value = coerce_parameter("stop", &args(&["END", "STOP"])).unwrap();
        assert_eq!(value, Value::Array(vec!["END".into(), "STOP".into()]));
    }

    #[test]
    fn rejects_unknown_parameter() {
        let err = coerce_parameter("creativity", &args(&["11"])).unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("unknown parameter"));
    }

    #[test]
    fn rejects_bad_values() {
        assert!(coerce_parameter("temperature", &args(&["warm"])).is_err());
        assert!(coerce_parameter("seed", &args(&["1.5"])).is_err());
        assert!(coerce_parameter("temperature", &args(&["0.1", "0.2"])).is_err());
        assert!(coerce_parameter("temperature", &[]).is_err());
    }
}
