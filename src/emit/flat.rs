use serde_json::{Map, Value};

use super::RelationEmitter;
use crate::engine::{EmbeddedContent, RelationSet};
use crate::error::Result;
use crate::serializer::FlatVisitor;

/// Adds relations to JSON / YAML output as one keyed map.
///
/// Single content becomes `rel -> content`; provider item lists become
/// `rel -> [content, ...]`. Nested relations sit under the same key inside
/// each content map.
#[derive(Debug, Clone)]
pub struct FlatEmitter {
    relations_key: String,
}

impl FlatEmitter {
    pub fn new(relations_key: impl Into<String>) -> Self {
        Self {
            relations_key: relations_key.into(),
        }
    }

    pub fn relations_key(&self) -> &str {
        &self.relations_key
    }

    /// The `rel -> content` map for `relations`, in declaration order
    pub fn render(&self, relations: &RelationSet) -> Result<Map<String, Value>> {
        let mut data = Map::new();
        for entry in relations.iter() {
            let mut rendered = entry
                .items
                .iter()
                .map(|item| self.render_item(item))
                .collect::<Result<Vec<_>>>()?;

            let value = if entry.many {
                Value::Array(rendered)
            } else {
                match rendered.pop() {
                    Some(value) => value,
                    None => continue,
                }
            };
            data.insert(entry.declaration.rel.clone(), value);
        }
        Ok(data)
    }

    fn render_item(&self, item: &EmbeddedContent) -> Result<Value> {
        let value = item.content.to_value()?;
        if item.relations.is_empty() {
            return Ok(value);
        }
        if !value.is_object() {
            log::debug!(
                "Content is not an object, skipping {} nested relation(s)",
                item.relations.len()
            );
            return Ok(value);
        }

        let mut nested = FlatVisitor::new(value);
        self.emit(&item.relations, &mut nested)?;
        Ok(nested.into_value())
    }
}

impl RelationEmitter for FlatEmitter {
    type Visitor = FlatVisitor;

    fn emit(&self, relations: &RelationSet, visitor: &mut FlatVisitor) -> Result<()> {
        if relations.is_empty() {
            return Ok(());
        }
        let data = self.render(relations)?;
        visitor.add_data(&self.relations_key, Value::Object(data))
    }
}
