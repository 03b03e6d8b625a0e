use serde_json::Value;

use crate::error::{EmbedError, Result};

/// Output cursor for keyed formats (JSON, YAML): the object's map being built.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatVisitor {
    root: Value,
}

impl FlatVisitor {
    pub fn new(root: Value) -> Self {
        Self { root }
    }

    pub fn value(&self) -> &Value {
        &self.root
    }

    pub fn into_value(self) -> Value {
        self.root
    }

    /// Add `key` to the serialized object. Keys are never overwritten.
    pub fn add_data(&mut self, key: &str, value: Value) -> Result<()> {
        let Value::Object(map) = &mut self.root else {
            return Err(EmbedError::Serialization(format!(
                "cannot add '{}' to a document that is not an object",
                key
            )));
        };

        if map.contains_key(key) {
            return Err(EmbedError::Serialization(format!(
                "key '{}' is already set on the serialized object",
                key
            )));
        }

        map.insert(key.to_string(), value);
        Ok(())
    }
}
