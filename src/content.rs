//! Content resolution: what a single relation points at for a given object.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::error::{EmbedError, Result};
use crate::metadata::RelationDeclaration;
use crate::params::{Parameters, ParameterResolver, PropertyPathResolver};
use crate::provider::{Provided, ProviderRegistry};
use crate::resource::{to_document, ContentShape, Resource};

/// Host-supplied URL generation for link content
pub trait UrlGenerator: Send + Sync {
    /// Build a URL for `route`, or `None` if the route is unknown
    fn generate(&self, route: &str, params: &Parameters) -> Option<String>;
}

/// Link-only content: route identifier plus resolved parameters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Link {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    pub route: String,
    pub params: Parameters,
}

/// The content of one relation, alive for a single serialization pass.
#[derive(Clone)]
pub enum ResolvedContent {
    Link(Link),
    Resource(Arc<dyn Resource>),
}

impl ResolvedContent {
    /// Document form of the content, through the host type mapping
    pub fn to_value(&self) -> Result<Value> {
        match self {
            ResolvedContent::Link(link) => to_document(link),
            ResolvedContent::Resource(resource) => resource.to_value(),
        }
    }

    /// The content as an object that may carry relations of its own
    pub fn as_resource(&self) -> Option<&dyn Resource> {
        match self {
            ResolvedContent::Link(_) => None,
            ResolvedContent::Resource(resource) => Some(resource.as_ref()),
        }
    }

    pub fn xml_root_name(&self) -> Option<&str> {
        self.as_resource().and_then(|resource| resource.xml_root_name())
    }

    pub fn shape(&self) -> ContentShape {
        self.as_resource()
            .map(|resource| resource.shape())
            .unwrap_or_default()
    }
}

impl fmt::Debug for ResolvedContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolvedContent::Link(link) => f.debug_tuple("Link").field(link).finish(),
            ResolvedContent::Resource(resource) => {
                f.debug_tuple("Resource").field(&resource.class_name()).finish()
            }
        }
    }
}

/// Content items produced for one declaration
#[derive(Debug, Clone)]
pub struct ContentSet {
    pub items: Vec<ResolvedContent>,
    /// True when a provider yielded an item list rather than a single value
    pub many: bool,
    /// Link to the declaration's route, set for provider content; embedded
    /// items carry it as their `self` relation
    pub self_link: Option<Link>,
}

/// Builds relation content from declarations.
pub struct ContentResolver {
    parameters: Box<dyn ParameterResolver>,
    providers: ProviderRegistry,
    urls: Option<Arc<dyn UrlGenerator>>,
}

impl ContentResolver {
    pub fn new(providers: ProviderRegistry) -> Self {
        Self {
            parameters: Box::new(PropertyPathResolver),
            providers,
            urls: None,
        }
    }

    pub fn with_parameter_resolver(mut self, resolver: Box<dyn ParameterResolver>) -> Self {
        self.parameters = resolver;
        self
    }

    pub fn with_url_generator(mut self, urls: Arc<dyn UrlGenerator>) -> Self {
        self.urls = Some(urls);
        self
    }

    pub fn providers(&self) -> &ProviderRegistry {
        &self.providers
    }

    /// Content of `declaration` for `source`, whose document form is `document`.
    ///
    /// `Ok(None)` means the relation does not apply (empty provider output).
    /// Parameter failures come back as `EmbedError::ParameterResolution`,
    /// provider wiring or invocation failures as `EmbedError::ContentProvider`.
    pub fn create_content(
        &self,
        source: &dyn Resource,
        document: &Value,
        declaration: &RelationDeclaration,
    ) -> Result<Option<ContentSet>> {
        let params = self.parameters.resolve(source, document, &declaration.params)?;

        let Some(provider) = &declaration.content_provider else {
            return Ok(Some(ContentSet {
                items: vec![ResolvedContent::Link(self.link(&declaration.route, params))],
                many: false,
                self_link: None,
            }));
        };

        let provided = self
            .providers
            .invoke(&provider.id, &provider.method, source, &params)
            .map_err(EmbedError::from)?;

        let (items, many) = match provided {
            Provided::Nothing => return Ok(None),
            Provided::One(item) => (vec![ResolvedContent::Resource(item)], false),
            Provided::Many(items) if items.is_empty() => return Ok(None),
            Provided::Many(items) => (items.into_iter().map(ResolvedContent::Resource).collect(), true),
        };

        Ok(Some(ContentSet {
            items,
            many,
            self_link: Some(self.link(&declaration.route, params)),
        }))
    }

    fn link(&self, route: &str, params: Parameters) -> Link {
        let href = self.urls.as_ref().and_then(|urls| urls.generate(route, &params));
        Link {
            href,
            route: route.to_string(),
            params,
        }
    }
}

impl fmt::Debug for ContentResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentResolver")
            .field("providers", &self.providers)
            .field("urls", &self.urls.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::ParamRule;
    use serde_json::json;

    #[derive(Serialize)]
    struct Article {
        id: u32,
    }

    impl Resource for Article {
        fn class_name(&self) -> &str {
            "Article"
        }

        fn to_value(&self) -> Result<Value> {
            to_document(self)
        }
    }

    struct PathUrls;

    impl UrlGenerator for PathUrls {
        fn generate(&self, route: &str, params: &Parameters) -> Option<String> {
            match route {
                "article_show" => Some(format!("/articles/{}", params.get("id")?)),
                _ => None,
            }
        }
    }

    fn self_link() -> RelationDeclaration {
        RelationDeclaration::new("self", "article_show").param("id", ParamRule::property("id"))
    }

    #[test]
    fn test_link_without_provider() {
        let resolver = ContentResolver::new(ProviderRegistry::new());
        let set = resolver
            .create_content(&Article { id: 42 }, &json!({"id": 42}), &self_link())
            .unwrap()
            .unwrap();
        assert!(!set.many);
        assert!(set.self_link.is_none());
        assert_eq!(set.items.len(), 1);
        assert_eq!(
            set.items[0].to_value().unwrap(),
            json!({"route": "article_show", "params": {"id": 42}})
        );
        assert!(set.items[0].as_resource().is_none());
    }

    #[test]
    fn test_link_href_from_generator() {
        let resolver = ContentResolver::new(ProviderRegistry::new()).with_url_generator(Arc::new(PathUrls));
        let set = resolver
            .create_content(&Article { id: 42 }, &json!({"id": 42}), &self_link())
            .unwrap()
            .unwrap();
        match &set.items[0] {
            ResolvedContent::Link(link) => assert_eq!(link.href.as_deref(), Some("/articles/42")),
            other => panic!("expected a link, got {:?}", other),
        }
    }

    #[test]
    fn test_provider_content() {
        let mut providers = ProviderRegistry::new();
        providers
            .register("article.related", "one", |_, params| {
                let id = params["id"].as_u64().unwrap_or(0) as u32;
                Ok(Provided::one(Article { id: id + 1 }))
            })
            .register("article.related", "none", |_, _| Ok(Provided::Nothing))
            .register("article.related", "empty", |_, _| Ok(Provided::Many(Vec::new())))
            .register("article.related", "many", |_, _| {
                Ok(Provided::many(vec![Article { id: 1 }, Article { id: 2 }]))
            });
        let resolver = ContentResolver::new(providers);
        let source = Article { id: 42 };
        let document = source.to_value().unwrap();

        let one = self_link().provider("article.related", "one");
        let set = resolver.create_content(&source, &document, &one).unwrap().unwrap();
        assert_eq!(set.items[0].to_value().unwrap(), json!({"id": 43}));
        assert!(!set.many);
        let link = set.self_link.unwrap();
        assert_eq!(link.route, "article_show");
        assert_eq!(Value::Object(link.params), json!({"id": 42}));

        let none = self_link().provider("article.related", "none");
        assert!(resolver.create_content(&source, &document, &none).unwrap().is_none());

        let empty = self_link().provider("article.related", "empty");
        assert!(resolver.create_content(&source, &document, &empty).unwrap().is_none());

        let many = self_link().provider("article.related", "many");
        let set = resolver.create_content(&source, &document, &many).unwrap().unwrap();
        assert!(set.many);
        assert_eq!(set.items.len(), 2);
    }

    #[test]
    fn test_parameter_failure_propagates() {
        let resolver = ContentResolver::new(ProviderRegistry::new());
        let declaration = RelationDeclaration::new("self", "article_show").param("id", ParamRule::property("uuid"));
        let err = resolver
            .create_content(&Article { id: 1 }, &json!({"id": 1}), &declaration)
            .unwrap_err();
        assert!(matches!(err, EmbedError::ParameterResolution(_)));
    }

    #[test]
    fn test_unknown_provider_is_an_error() {
        let resolver = ContentResolver::new(ProviderRegistry::new());
        let declaration = self_link().provider("missing", "method");
        let err = resolver
            .create_content(&Article { id: 1 }, &json!({"id": 1}), &declaration)
            .unwrap_err();
        assert!(matches!(err, EmbedError::ContentProvider(_)));
    }
}
