use serde_yaml_ng::{Mapping, Value as YamlValue};

use super::{ContentOptions, ContentProviderRef, ParamRule, RelationDeclaration};
use crate::error::{EmbedError, Result};

/// Parse a metadata document into `(class name, declarations)` pairs, in document order.
///
/// Expected layout:
///
/// ```yaml
/// App\Entity\Article:
///   relations:
///     - rel: self
///       route: article_show
///       params: { id: .id }
///     - rel: comments
///       route: article_comments
///       content_provider: { id: comment.provider, method: forArticle }
///       content: { serializer_xml_element_name: comments }
/// ```
pub(super) fn parse_document(content: &str, file: &str) -> Result<Vec<(String, Vec<RelationDeclaration>)>> {
    let document: YamlValue = serde_yaml_ng::from_str(content)
        .map_err(|e| EmbedError::metadata(file, format!("YAML parse error: {}", e)))?;

    let classes = match document {
        YamlValue::Null => return Ok(Vec::new()),
        YamlValue::Mapping(map) => map,
        _ => {
            return Err(EmbedError::metadata(
                file,
                "expected a mapping of class names to relation metadata",
            ))
        }
    };

    let mut parsed = Vec::with_capacity(classes.len());
    for (key, config) in classes {
        let class_name = match key {
            YamlValue::String(s) => s,
            other => {
                return Err(EmbedError::metadata(
                    file,
                    format!("class name must be a string, got {:?}", other),
                ))
            }
        };

        let relations = match config {
            YamlValue::Null => Vec::new(),
            YamlValue::Mapping(map) => parse_relations(&map, &class_name, file)?,
            _ => {
                return Err(EmbedError::metadata(
                    file,
                    format!("class {}: expected a mapping", class_name),
                ))
            }
        };
        parsed.push((class_name, relations));
    }

    Ok(parsed)
}

fn parse_relations(config: &Mapping, class_name: &str, file: &str) -> Result<Vec<RelationDeclaration>> {
    let entries = match config.get("relations") {
        None | Some(YamlValue::Null) => return Ok(Vec::new()),
        Some(YamlValue::Sequence(entries)) => entries,
        Some(_) => {
            return Err(EmbedError::metadata(
                file,
                format!("class {}: 'relations' must be a list", class_name),
            ))
        }
    };

    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            let context = format!("class {}, relation #{}", class_name, index + 1);
            match entry {
                YamlValue::Mapping(map) => parse_relation(map, &context, file),
                _ => Err(EmbedError::metadata(file, format!("{}: expected a mapping", context))),
            }
        })
        .collect()
}

fn parse_relation(map: &Mapping, context: &str, file: &str) -> Result<RelationDeclaration> {
    let rel = required_str(map, "rel", context, file)?;
    let route = required_str(map, "route", context, file)?;
    let context = format!("{} ('{}')", context, rel);

    let mut declaration = RelationDeclaration::new(rel, route);

    match map.get("params") {
        None | Some(YamlValue::Null) => {}
        Some(YamlValue::Mapping(params)) => {
            for (name, rule) in params {
                let name = match name {
                    YamlValue::String(s) => s.clone(),
                    other => {
                        return Err(EmbedError::metadata(
                            file,
                            format!("{}: parameter name must be a string, got {:?}", context, other),
                        ))
                    }
                };
                let rule = parse_param_rule(rule, &name, &context, file)?;
                declaration.params.push((name, rule));
            }
        }
        Some(_) => {
            return Err(EmbedError::metadata(
                file,
                format!("{}: 'params' must be a mapping", context),
            ))
        }
    }

    match map.get("content_provider") {
        None | Some(YamlValue::Null) => {}
        Some(YamlValue::Mapping(provider)) if provider.is_empty() => {}
        Some(YamlValue::Mapping(provider)) => {
            declaration.content_provider = Some(ContentProviderRef {
                id: required_str(provider, "id", &format!("{} content_provider", context), file)?,
                method: required_str(provider, "method", &format!("{} content_provider", context), file)?,
            });
        }
        Some(_) => {
            return Err(EmbedError::metadata(
                file,
                format!("{}: 'content_provider' must be a mapping", context),
            ))
        }
    }

    match map.get("content") {
        None | Some(YamlValue::Null) => {}
        Some(YamlValue::Mapping(content)) => {
            declaration.content = parse_content_options(content, &context, file)?;
        }
        Some(_) => {
            return Err(EmbedError::metadata(
                file,
                format!("{}: 'content' must be a mapping", context),
            ))
        }
    }

    Ok(declaration)
}

fn parse_param_rule(rule: &YamlValue, name: &str, context: &str, file: &str) -> Result<ParamRule> {
    match rule {
        YamlValue::String(path) => Ok(ParamRule::property(path.as_str())),
        YamlValue::Number(_) | YamlValue::Bool(_) | YamlValue::Null => Ok(ParamRule::Literal(to_json(rule, context, file)?)),
        YamlValue::Mapping(map) => match map.get("value") {
            Some(value) if map.len() == 1 => Ok(ParamRule::Literal(to_json(value, context, file)?)),
            _ => Err(EmbedError::metadata(
                file,
                format!("{}: parameter '{}' mapping must be {{ value: ... }}", context, name),
            )),
        },
        _ => Err(EmbedError::metadata(
            file,
            format!("{}: unsupported rule for parameter '{}'", context, name),
        )),
    }
}

fn parse_content_options(content: &Mapping, context: &str, file: &str) -> Result<ContentOptions> {
    let xml_element_name = match content.get("serializer_xml_element_name") {
        None | Some(YamlValue::Null) => None,
        Some(YamlValue::String(name)) => Some(name.clone()),
        Some(_) => {
            return Err(EmbedError::metadata(
                file,
                format!("{}: 'serializer_xml_element_name' must be a string", context),
            ))
        }
    };

    let xml_element_root_name = match content.get("serializer_xml_element_root_name") {
        None | Some(YamlValue::Null) => false,
        Some(YamlValue::Bool(flag)) => *flag,
        Some(_) => {
            return Err(EmbedError::metadata(
                file,
                format!("{}: 'serializer_xml_element_root_name' must be a boolean", context),
            ))
        }
    };

    Ok(ContentOptions {
        xml_element_name,
        xml_element_root_name,
    })
}

fn required_str(map: &Mapping, key: &str, context: &str, file: &str) -> Result<String> {
    match map.get(key) {
        Some(YamlValue::String(s)) => Ok(s.clone()),
        Some(YamlValue::Number(n)) => Ok(n.to_string()),
        Some(_) => Err(EmbedError::metadata(
            file,
            format!("{}: '{}' must be a string", context, key),
        )),
        None => Err(EmbedError::metadata(
            file,
            format!("{}: missing required field '{}'", context, key),
        )),
    }
}

fn to_json(value: &YamlValue, context: &str, file: &str) -> Result<serde_json::Value> {
    serde_json::to_value(value)
        .map_err(|e| EmbedError::metadata(file, format!("{}: unsupported literal: {}", context, e)))
}
