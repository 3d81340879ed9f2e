use crate::foundation::error::ProgramError;
use crate::program::random::DeterministicRandom;
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;

/// Variables and inherited group metadata visible to a template.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    /// Bound variables, including `windowWidth` and `windowHeight`.
    pub vars: BTreeMap<String, Value>,
    /// Metadata inherited from enclosing groups.
    pub metadata: Map<String, Value>,
}

/// Resolve every expression inside `value`.
///
/// Objects with a single `$`-prefixed key are operators, the string `"$uuid"` draws an
/// identifier, and everything else is copied with its children resolved.
pub fn resolve(
    value: &Value,
    scope: &Scope,
    rng: &mut DeterministicRandom,
    path: &str,
) -> Result<Value, ProgramError> {
    match value {
        Value::String(s) if s == "$uuid" => Ok(Value::String(rng.uuid())),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, v)| resolve(v, scope, rng, &format!("{path}[{i}]")))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Value::Object(map) => {
            if map.len() == 1
                && let Some((op, arg)) = map.iter().next()
                && op.starts_with('$')
            {
                return operator(op, arg, scope, rng, &format!("{path}.{op}"));
            }
            let mut out = Map::with_capacity(map.len());
            for (k, v) in map {
                out.insert(k.clone(), resolve(v, scope, rng, &format!("{path}.{k}"))?);
            }
            Ok(Value::Object(out))
        }
        other => Ok(other.clone()),
    }
}

fn operator(
    op: &str,
    arg: &Value,
    scope: &Scope,
    rng: &mut DeterministicRandom,
    path: &str,
) -> Result<Value, ProgramError> {
    match op {
        "$var" => {
            let Value::String(name) = arg else {
                return Err(type_error("$var expects a variable name", path));
            };
            scope.vars.get(name).cloned().ok_or_else(|| {
                ProgramError::new("ReferenceError", format!("{name} is not defined"), path)
            })
        }
        "$choice" => {
            let options = match resolve(arg, scope, rng, path)? {
                Value::Array(options) if !options.is_empty() => options,
                _ => return Err(type_error("$choice expects a non-empty array", path)),
            };
            let i = rng.uniform_int(0, options.len() as i64).map_err(|e| at(e, path))?;
            Ok(options[i as usize].clone())
        }
        "$uniform" => {
            let [lo, hi] = pair(arg, scope, rng, path)?;
            if lo > hi {
                return Err(ProgramError::new(
                    "RangeError",
                    format!("$uniform requires lo <= hi (got [{lo}, {hi}])"),
                    path,
                ));
            }
            number(lo + (hi - lo) * rng.uniform01(), path)
        }
        "$randi" => {
            let [lo, hi] = pair(arg, scope, rng, path)?;
            if lo.fract() != 0.0 || hi.fract() != 0.0 {
                return Err(type_error("$randi expects integer bounds", path));
            }
            let v = rng
                .uniform_int(lo as i64, hi as i64)
                .map_err(|e| at(e, path))?;
            Ok(Value::from(v))
        }
        "$add" => {
            let [a, b] = pair(arg, scope, rng, path)?;
            number(a + b, path)
        }
        "$mul" => {
            let [a, b] = pair(arg, scope, rng, path)?;
            number(a * b, path)
        }
        "$div" => {
            let [a, b] = pair(arg, scope, rng, path)?;
            if b == 0.0 {
                return Err(ProgramError::new("RangeError", "division by zero", path));
            }
            number(a / b, path)
        }
        other => Err(ProgramError::new(
            "SyntaxError",
            format!("unknown operator {other}"),
            path,
        )),
    }
}

fn pair(
    arg: &Value,
    scope: &Scope,
    rng: &mut DeterministicRandom,
    path: &str,
) -> Result<[f64; 2], ProgramError> {
    let resolved = resolve(arg, scope, rng, path)?;
    match resolved.as_array().map(Vec::as_slice) {
        Some([a, b]) => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => Ok([a, b]),
            _ => Err(type_error("operands must be numbers", path)),
        },
        _ => Err(type_error("expected a two-element array", path)),
    }
}

fn number(v: f64, path: &str) -> Result<Value, ProgramError> {
    if v.fract() == 0.0 && v.abs() < 9.0e15 {
        return Ok(Value::from(v as i64));
    }
    Number::from_f64(v)
        .map(Value::Number)
        .ok_or_else(|| ProgramError::new("RangeError", format!("{v} is not a finite number"), path))
}

fn type_error(msg: &str, path: &str) -> ProgramError {
    ProgramError::new("TypeError", msg, path)
}

fn at(mut e: ProgramError, path: &str) -> ProgramError {
    e.stack = path.to_owned();
    e
}
