//! Embedding engine: resolves the relations of a serialized object and hands
//! them to the emitter for the active format.
//!
//! For every object reaching the post-serialize hook the engine:
//!
//! 1. looks up the declarations of the object's class (a miss is a no-op),
//! 2. resolves content for each declaration, skipping empty content,
//! 3. resolves the relations of each content item, one nested level deep;
//!    provider content also gets a `self` link to the declaring relation's
//!    route, ahead of its own relations,
//! 4. emits the result as a keyed map (JSON / YAML) or as elements (XML).
//!
//! A parameter that cannot be resolved drops only the relation it belongs to.
//! Provider and serialization errors propagate to the caller.

use std::sync::Arc;

use serde_json::Value;

use crate::content::{ContentResolver, ContentSet, Link, ResolvedContent, UrlGenerator};
use crate::emit::{FlatEmitter, RelationEmitter, XmlEmitter};
use crate::error::{EmbedError, Result};
use crate::metadata::{MetadataStore, RelationDeclaration};
use crate::params::{reads_properties, ParameterResolver};
use crate::provider::ProviderRegistry;
use crate::resource::Resource;
use crate::serializer::{PostSerializeEvent, PostSerializeHook, Visitor};

/// Default relations key for flat formats
pub const DEFAULT_RELATIONS_KEY: &str = "relations";

/// Depth of relation expansion: the object's relations, then the relations of their content
pub const MAX_RELATION_DEPTH: usize = 2;

/// Relation linking embedded provider content back to its route
pub const SELF_REL: &str = "self";

/// Relations resolved for one object, in declaration order
#[derive(Debug, Clone, Default)]
pub struct RelationSet {
    entries: Vec<RelationEntry>,
}

impl RelationSet {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RelationEntry> {
        self.entries.iter()
    }

    pub fn get(&self, rel: &str) -> Option<&RelationEntry> {
        self.entries.iter().find(|entry| entry.declaration.rel == rel)
    }

    pub fn rels(&self) -> Vec<&str> {
        self.entries
            .iter()
            .map(|entry| entry.declaration.rel.as_str())
            .collect()
    }

    /// Put a `self` link first, unless the set already declares one
    fn prepend_self_link(&mut self, declaration: &Arc<RelationDeclaration>, link: &Link) {
        if self.get(SELF_REL).is_some() {
            return;
        }
        self.entries.insert(
            0,
            RelationEntry {
                declaration: Arc::clone(declaration),
                items: vec![EmbeddedContent {
                    content: ResolvedContent::Link(link.clone()),
                    relations: RelationSet::default(),
                }],
                many: false,
            },
        );
    }
}

/// One declaration with the content it produced
#[derive(Debug, Clone)]
pub struct RelationEntry {
    pub declaration: Arc<RelationDeclaration>,
    pub items: Vec<EmbeddedContent>,
    /// The provider yielded an item list
    pub many: bool,
}

/// A content item and its own (nested) relations
#[derive(Debug, Clone)]
pub struct EmbeddedContent {
    pub content: ResolvedContent,
    pub relations: RelationSet,
}

/// Resolves and embeds declared relations. Immutable once built and safe to
/// share between concurrent serializations.
#[derive(Debug)]
pub struct RelationEngine {
    store: Arc<MetadataStore>,
    content: ContentResolver,
    flat: FlatEmitter,
    xml: XmlEmitter,
}

impl RelationEngine {
    pub fn builder(store: Arc<MetadataStore>) -> RelationEngineBuilder {
        RelationEngineBuilder::new(store)
    }

    pub fn store(&self) -> &MetadataStore {
        &self.store
    }

    pub fn relations_key(&self) -> &str {
        self.flat.relations_key()
    }

    /// Resolve the relations of `object`, including one nested level.
    pub fn relations(&self, object: &dyn Resource) -> Result<RelationSet> {
        self.collect(object, 1)
    }

    fn collect(&self, object: &dyn Resource, depth: usize) -> Result<RelationSet> {
        let declarations = self.store.declarations(object.class_name());
        if declarations.is_empty() {
            return Ok(RelationSet::default());
        }

        // Rendered once for every property rule of this object
        let document = if declarations.iter().any(|d| reads_properties(&d.params)) {
            object.to_value()?
        } else {
            Value::Null
        };

        let mut relations = RelationSet::default();
        for declaration in declarations {
            let content = match self.content.create_content(object, &document, declaration) {
                Ok(Some(content)) => content,
                Ok(None) => {
                    log::debug!(
                        "Relation '{}' of {} has no content",
                        declaration.rel,
                        object.class_name()
                    );
                    continue;
                }
                Err(EmbedError::ParameterResolution(err)) => {
                    log::warn!("Dropping relation '{}': {}", declaration.rel, err);
                    continue;
                }
                Err(err) => return Err(err),
            };

            let ContentSet { items, many, self_link } = content;
            let self_declaration = self_link
                .as_ref()
                .map(|link| Arc::new(RelationDeclaration::new(SELF_REL, link.route.clone())));

            let mut embedded = Vec::with_capacity(items.len());
            for item in items {
                let nested = match item.as_resource() {
                    Some(resource) if depth < MAX_RELATION_DEPTH => {
                        let mut nested = self.collect(resource, depth + 1)?;
                        if let (Some(self_rel), Some(link)) = (&self_declaration, &self_link) {
                            nested.prepend_self_link(self_rel, link);
                        }
                        nested
                    }
                    _ => RelationSet::default(),
                };
                embedded.push(EmbeddedContent {
                    content: item,
                    relations: nested,
                });
            }

            relations.entries.push(RelationEntry {
                declaration: Arc::clone(declaration),
                items: embedded,
                many,
            });
        }

        log::debug!(
            "Resolved {} relation(s) for {} at depth {}",
            relations.len(),
            object.class_name(),
            depth
        );
        Ok(relations)
    }
}

impl PostSerializeHook for RelationEngine {
    fn on_post_serialize(&self, event: &mut PostSerializeEvent<'_>) -> Result<()> {
        let relations = self.relations(event.object())?;
        if relations.is_empty() {
            return Ok(());
        }

        match event.visitor_mut() {
            Visitor::Flat(visitor) => self.flat.emit(&relations, visitor),
            Visitor::Xml(visitor) => self.xml.emit(&relations, visitor),
        }
    }
}

/// Wires an engine together and checks provider references up front.
pub struct RelationEngineBuilder {
    store: Arc<MetadataStore>,
    providers: ProviderRegistry,
    parameters: Option<Box<dyn ParameterResolver>>,
    urls: Option<Arc<dyn UrlGenerator>>,
    relations_key: String,
}

impl RelationEngineBuilder {
    pub fn new(store: Arc<MetadataStore>) -> Self {
        Self {
            store,
            providers: ProviderRegistry::new(),
            parameters: None,
            urls: None,
            relations_key: DEFAULT_RELATIONS_KEY.to_string(),
        }
    }

    pub fn providers(mut self, providers: ProviderRegistry) -> Self {
        self.providers = providers;
        self
    }

    pub fn parameter_resolver(mut self, resolver: impl ParameterResolver + 'static) -> Self {
        self.parameters = Some(Box::new(resolver));
        self
    }

    pub fn url_generator(mut self, urls: Arc<dyn UrlGenerator>) -> Self {
        self.urls = Some(urls);
        self
    }

    pub fn relations_key(mut self, key: impl Into<String>) -> Self {
        self.relations_key = key.into();
        self
    }

    /// Build the engine. Fails when the relations key is blank or a declared
    /// content provider is not registered.
    pub fn build(self) -> Result<RelationEngine> {
        if self.relations_key.trim().is_empty() {
            return Err(EmbedError::Config("relations key must not be empty".to_string()));
        }

        for provider in self.store.provider_refs() {
            self.providers.lookup(&provider.id, &provider.method)?;
        }

        let mut content = ContentResolver::new(self.providers);
        if let Some(parameters) = self.parameters {
            content = content.with_parameter_resolver(parameters);
        }
        if let Some(urls) = self.urls {
            content = content.with_url_generator(urls);
        }

        log::debug!(
            "Relation engine ready: {} class(es), {} provider handler(s)",
            self.store.len(),
            content.providers().len()
        );

        Ok(RelationEngine {
            store: self.store,
            content,
            flat: FlatEmitter::new(self.relations_key),
            xml: XmlEmitter,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::ParamRule;
    use crate::provider::Provided;
    use crate::resource::to_document;
    use serde::Serialize;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Serialize)]
    struct Node {
        #[serde(skip)]
        class: &'static str,
        id: u32,
    }

    impl Resource for Node {
        fn class_name(&self) -> &str {
            self.class
        }

        fn to_value(&self) -> Result<Value> {
            to_document(self)
        }
    }

    fn store() -> Arc<MetadataStore> {
        let mut builder = MetadataStore::builder();
        builder
            .add_class(
                "test",
                "A",
                vec![
                    RelationDeclaration::new("self", "a_show").param("id", ParamRule::property("id")),
                    RelationDeclaration::new("child", "b_show").provider("graph", "child"),
                ],
            )
            .unwrap()
            .add_class(
                "test",
                "B",
                vec![RelationDeclaration::new("child", "c_show").provider("graph", "child")],
            )
            .unwrap()
            .add_class(
                "test",
                "C",
                vec![RelationDeclaration::new("child", "d_show").provider("graph", "child")],
            )
            .unwrap();
        Arc::new(builder.build())
    }

    fn providers() -> ProviderRegistry {
        let mut providers = ProviderRegistry::new();
        providers.register("graph", "child", |source, _| {
            let next = match source.class_name() {
                "A" => "B",
                "B" => "C",
                _ => "D",
            };
            Ok(Provided::one(Node { class: next, id: 1 }))
        });
        providers
    }

    #[test]
    fn test_expansion_stops_after_one_nested_level() {
        let engine = RelationEngine::builder(store()).providers(providers()).build().unwrap();
        let relations = engine.relations(&Node { class: "A", id: 1 }).unwrap();
        assert_eq!(relations.rels(), vec!["self", "child"]);

        let b = &relations.get("child").unwrap().items[0];
        assert_eq!(b.content.as_resource().unwrap().class_name(), "B");
        assert_eq!(b.relations.rels(), vec!["self", "child"]);
        match &b.relations.get("self").unwrap().items[0].content {
            ResolvedContent::Link(link) => assert_eq!(link.route, "b_show"),
            other => panic!("expected a link, got {:?}", other),
        }

        let c = &b.relations.get("child").unwrap().items[0];
        assert_eq!(c.content.as_resource().unwrap().class_name(), "C");
        assert!(c.relations.is_empty());
    }

    #[test]
    fn test_declared_self_wins_over_route_link() {
        let mut builder = MetadataStore::builder();
        builder
            .add_class(
                "test",
                "A",
                vec![RelationDeclaration::new("child", "b_show").provider("graph", "child")],
            )
            .unwrap()
            .add_class(
                "test",
                "B",
                vec![RelationDeclaration::new("self", "b_canonical").param("id", ParamRule::property("id"))],
            )
            .unwrap();
        let engine = RelationEngine::builder(Arc::new(builder.build()))
            .providers(providers())
            .build()
            .unwrap();

        let relations = engine.relations(&Node { class: "A", id: 1 }).unwrap();
        let b = &relations.get("child").unwrap().items[0];
        assert_eq!(b.relations.rels(), vec!["self"]);
        assert_eq!(b.relations.get("self").unwrap().declaration.route, "b_canonical");
    }

    struct Counted {
        renders: AtomicUsize,
        fail: bool,
    }

    impl Resource for Counted {
        fn class_name(&self) -> &str {
            "Counted"
        }

        fn to_value(&self) -> Result<Value> {
            self.renders.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(EmbedError::Serialization("cannot render Counted".to_string()));
            }
            Ok(serde_json::json!({"id": 5, "slug": "five"}))
        }
    }

    fn counted_engine() -> RelationEngine {
        let mut builder = MetadataStore::builder();
        builder
            .add_class(
                "test",
                "Counted",
                vec![
                    RelationDeclaration::new("self", "c_show").param("id", ParamRule::property("id")),
                    RelationDeclaration::new("slug", "c_slug").param("slug", ParamRule::property("slug")),
                    RelationDeclaration::new("list", "c_list").param("page", ParamRule::literal(1)),
                ],
            )
            .unwrap();
        RelationEngine::builder(Arc::new(builder.build())).build().unwrap()
    }

    #[test]
    fn test_source_rendered_once_per_object() {
        let object = Counted {
            renders: AtomicUsize::new(0),
            fail: false,
        };
        let relations = counted_engine().relations(&object).unwrap();
        assert_eq!(relations.rels(), vec!["self", "slug", "list"]);
        assert_eq!(object.renders.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_render_failure_propagates() {
        let object = Counted {
            renders: AtomicUsize::new(0),
            fail: true,
        };
        let err = counted_engine().relations(&object).unwrap_err();
        assert!(matches!(err, EmbedError::Serialization(_)));
    }

    #[test]
    fn test_unregistered_provider_fails_build() {
        let err = RelationEngine::builder(store()).build().unwrap_err();
        assert!(matches!(err, EmbedError::ContentProvider(_)));
    }

    #[test]
    fn test_blank_relations_key_fails_build() {
        let err = RelationEngine::builder(store())
            .providers(providers())
            .relations_key("  ")
            .build()
            .unwrap_err();
        assert!(matches!(err, EmbedError::Config(_)));
    }

    #[test]
    fn test_unknown_class_has_no_relations() {
        let engine = RelationEngine::builder(store()).providers(providers()).build().unwrap();
        assert!(engine.relations(&Node { class: "Z", id: 1 }).unwrap().is_empty());
        assert_eq!(engine.relations_key(), DEFAULT_RELATIONS_KEY);
    }
}
