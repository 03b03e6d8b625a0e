use super::RelationEmitter;
use crate::content::ResolvedContent;
use crate::engine::{EmbeddedContent, RelationSet};
use crate::error::Result;
use crate::metadata::{is_valid_element_name, RelationDeclaration};
use crate::resource::ContentShape;
use crate::serializer::XmlVisitor;

/// Adds relations to XML output as child elements carrying a `rel` attribute.
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlEmitter;

impl XmlEmitter {
    fn write_item(&self, item: &EmbeddedContent, visitor: &mut XmlVisitor) -> Result<()> {
        let value = item.content.to_value()?;
        visitor.append_value(&value);
        self.emit(&item.relations, visitor)
    }
}

impl RelationEmitter for XmlEmitter {
    type Visitor = XmlVisitor;

    fn emit(&self, relations: &RelationSet, visitor: &mut XmlVisitor) -> Result<()> {
        for entry in relations.iter() {
            for item in &entry.items {
                visitor.open_element(element_name(&entry.declaration, &item.content));
                visitor.set_attribute("rel", &entry.declaration.rel);

                let written = self.write_item(item, visitor);
                visitor.revert_current_node()?;
                written?;
            }
        }
        Ok(())
    }
}

/// Element name for embedded content, first match wins:
/// explicit name, root name from class metadata (when requested and a
/// valid element name), `collection`, `form`, then `relation`.
pub fn element_name<'a>(declaration: &'a RelationDeclaration, content: &'a ResolvedContent) -> &'a str {
    if let Some(name) = declaration.content.xml_element_name.as_deref() {
        return name;
    }
    if declaration.content.xml_element_root_name {
        match content.xml_root_name() {
            Some(root_name) if is_valid_element_name(root_name) => return root_name,
            Some(root_name) => log::warn!(
                "Ignoring invalid XML root name '{}' for relation '{}'",
                root_name,
                declaration.rel
            ),
            None => {}
        }
    }

    match content.shape() {
        ContentShape::Collection => "collection",
        ContentShape::Form => "form",
        ContentShape::Object => "relation",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::Link;
    use crate::params::Parameters;
    use crate::resource::{to_document, Resource};
    use serde::Serialize;
    use serde_json::Value;
    use std::sync::Arc;

    #[derive(Serialize)]
    struct Page {
        page: u32,
    }

    impl Resource for Page {
        fn class_name(&self) -> &str {
            "Page"
        }

        fn to_value(&self) -> Result<Value> {
            to_document(self)
        }

        fn xml_root_name(&self) -> Option<&str> {
            Some("users")
        }

        fn shape(&self) -> ContentShape {
            ContentShape::Collection
        }
    }

    #[derive(Serialize)]
    struct FormView;

    impl Resource for FormView {
        fn class_name(&self) -> &str {
            "FormView"
        }

        fn to_value(&self) -> Result<Value> {
            to_document(self)
        }

        fn shape(&self) -> ContentShape {
            ContentShape::Form
        }
    }

    fn link() -> ResolvedContent {
        ResolvedContent::Link(Link {
            href: None,
            route: "r".to_string(),
            params: Parameters::new(),
        })
    }

    #[test]
    fn test_element_name_priority() {
        let page = ResolvedContent::Resource(Arc::new(Page { page: 1 }));
        let form = ResolvedContent::Resource(Arc::new(FormView));

        let explicit = RelationDeclaration::new("users", "r")
            .xml_element_name("members")
            .xml_element_root_name();
        assert_eq!(element_name(&explicit, &page), "members");

        let root = RelationDeclaration::new("users", "r").xml_element_root_name();
        assert_eq!(element_name(&root, &page), "users");
        assert_eq!(element_name(&root, &form), "form");

        let plain = RelationDeclaration::new("users", "r");
        assert_eq!(element_name(&plain, &page), "collection");
        assert_eq!(element_name(&plain, &form), "form");
        assert_eq!(element_name(&plain, &link()), "relation");
        assert_eq!(element_name(&root, &link()), "relation");
    }

    #[derive(Serialize)]
    struct Author {
        id: u32,
    }

    impl Resource for Author {
        fn class_name(&self) -> &str {
            "Author"
        }

        fn to_value(&self) -> Result<Value> {
            to_document(self)
        }

        fn xml_root_name(&self) -> Option<&str> {
            Some("my author")
        }
    }

    #[test]
    fn test_invalid_root_name_falls_through() {
        let author = ResolvedContent::Resource(Arc::new(Author { id: 1 }));
        let root = RelationDeclaration::new("author", "r").xml_element_root_name();
        assert_eq!(element_name(&root, &author), "relation");
    }

    #[test]
    fn test_element_name_is_deterministic() {
        let page = ResolvedContent::Resource(Arc::new(Page { page: 1 }));
        let root = RelationDeclaration::new("users", "r").xml_element_root_name();
        let first = element_name(&root, &page).to_string();
        for _ in 0..10 {
            assert_eq!(element_name(&root, &page), first);
        }
    }
}
