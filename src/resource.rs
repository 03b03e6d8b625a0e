//! Objects the serializer knows how to render and the engine knows how to relate.

use serde::Serialize;
use serde_json::Value;

use crate::error::Result;

/// Structural shape of a value, used to pick XML element names for embedded content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContentShape {
    #[default]
    Object,
    /// A paginated collection (page of items plus paging data)
    Collection,
    /// A rendered form view
    Form,
}

/// A serializable object with a stable class identifier.
///
/// `class_name` is the key relation metadata is declared under, so it must be
/// stable across builds (usually the fully qualified domain name of the type).
/// `to_value` is the host's type-to-document mapping for the object.
pub trait Resource: Send + Sync {
    fn class_name(&self) -> &str;

    fn to_value(&self) -> Result<Value>;

    /// Root element name from the serializer's class metadata, if any
    fn xml_root_name(&self) -> Option<&str> {
        None
    }

    fn shape(&self) -> ContentShape {
        ContentShape::Object
    }
}

/// Render any `Serialize` value into its document form.
///
/// Convenience for `Resource::to_value` implementations.
pub fn to_document<T: Serialize + ?Sized>(value: &T) -> Result<Value> {
    Ok(serde_json::to_value(value)?)
}
