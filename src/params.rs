//! Parameter resolution: turns declared parameter rules into concrete values.

use serde_json::{Map, Value};

use crate::error::ParameterResolutionError;
use crate::metadata::ParamRule;
use crate::resource::Resource;

/// Resolved parameters, in declaration order
pub type Parameters = Map<String, Value>;

/// Derives parameter values from a source object.
///
/// `document` is the source's document form, rendered once by the caller
/// (`Value::Null` when no rule reads properties). Implementations must not
/// mutate the source and must return the same result for the same input.
pub trait ParameterResolver: Send + Sync {
    fn resolve(
        &self,
        source: &dyn Resource,
        document: &Value,
        params: &[(String, ParamRule)],
    ) -> Result<Parameters, ParameterResolutionError>;
}

/// True when any rule reads from the source's document form
pub fn reads_properties(params: &[(String, ParamRule)]) -> bool {
    params.iter().any(|(_, rule)| matches!(rule, ParamRule::Property(_)))
}

/// Reads property paths (`author.id`, `tags.0`) from the object's document form.
#[derive(Debug, Clone, Copy, Default)]
pub struct PropertyPathResolver;

impl ParameterResolver for PropertyPathResolver {
    fn resolve(
        &self,
        source: &dyn Resource,
        document: &Value,
        params: &[(String, ParamRule)],
    ) -> Result<Parameters, ParameterResolutionError> {
        let mut resolved = Parameters::new();
        for (name, rule) in params {
            let value = match rule {
                ParamRule::Literal(value) => value.clone(),
                ParamRule::Property(path) => {
                    read_path(document, path).map_err(|reason| failure(name, source, reason))?
                }
            };
            resolved.insert(name.clone(), value);
        }

        Ok(resolved)
    }
}

fn failure(rule: &str, source: &dyn Resource, reason: String) -> ParameterResolutionError {
    ParameterResolutionError {
        rule: rule.to_string(),
        class: source.class_name().to_string(),
        reason,
    }
}

/// Walk `path` through `root`, returning the scalar found at the end.
fn read_path(root: &Value, path: &str) -> Result<Value, String> {
    if path.is_empty() {
        return Err("empty property path".to_string());
    }

    let mut current = root;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map
                .get(segment)
                .ok_or_else(|| format!("property '{}' not found", path))?,
            Value::Array(items) => segment
                .parse::<usize>()
                .ok()
                .and_then(|index| items.get(index))
                .ok_or_else(|| format!("index '{}' of '{}' not found", segment, path))?,
            _ => return Err(format!("cannot read '{}' of a scalar in '{}'", segment, path)),
        };
    }

    match current {
        Value::Null => Err(format!("property '{}' is null", path)),
        Value::Object(_) | Value::Array(_) => Err(format!("property '{}' is not a scalar", path)),
        scalar => Ok(scalar.clone()),
    }
}
