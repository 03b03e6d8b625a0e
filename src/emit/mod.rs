//! Emission strategies: write a resolved relation set into the active document.

mod flat;
mod xml;

pub use flat::FlatEmitter;
pub use xml::{element_name, XmlEmitter};

use crate::engine::RelationSet;
use crate::error::Result;

/// Writes a relation set through one kind of visitor
pub trait RelationEmitter {
    type Visitor;

    fn emit(&self, relations: &RelationSet, visitor: &mut Self::Visitor) -> Result<()>;
}
