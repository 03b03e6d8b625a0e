//! Content provider registry.
//!
//! Providers are registered once at startup under `(service id, method)` and
//! invoked by direct call while relations are resolved.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{BoxError, ContentProviderError};
use crate::params::Parameters;
use crate::resource::Resource;

/// What a provider returned for one source object
#[derive(Clone, Default)]
pub enum Provided {
    /// No content; the relation is left out of the output
    #[default]
    Nothing,
    One(Arc<dyn Resource>),
    /// Ordered items, each embedded under the same relation
    Many(Vec<Arc<dyn Resource>>),
}

impl Provided {
    pub fn one(resource: impl Resource + 'static) -> Self {
        Provided::One(Arc::new(resource))
    }

    pub fn many<R: Resource + 'static>(resources: impl IntoIterator<Item = R>) -> Self {
        Provided::Many(
            resources
                .into_iter()
                .map(|r| Arc::new(r) as Arc<dyn Resource>)
                .collect(),
        )
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Provided::Nothing => true,
            Provided::One(_) => false,
            Provided::Many(items) => items.is_empty(),
        }
    }
}

impl From<Option<Arc<dyn Resource>>> for Provided {
    fn from(value: Option<Arc<dyn Resource>>) -> Self {
        value.map(Provided::One).unwrap_or(Provided::Nothing)
    }
}

impl fmt::Debug for Provided {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provided::Nothing => write!(f, "Nothing"),
            Provided::One(item) => write!(f, "One({})", item.class_name()),
            Provided::Many(items) => write!(f, "Many({} items)", items.len()),
        }
    }
}

/// Handler signature: source object and resolved parameters in, content out
pub type ProviderFn = dyn Fn(&dyn Resource, &Parameters) -> Result<Provided, BoxError> + Send + Sync;

/// Maps `(service id, method)` to provider handlers
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    services: HashMap<String, HashMap<String, Arc<ProviderFn>>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` as `id::method`, replacing any previous handler
    pub fn register<F>(&mut self, id: impl Into<String>, method: impl Into<String>, handler: F) -> &mut Self
    where
        F: Fn(&dyn Resource, &Parameters) -> Result<Provided, BoxError> + Send + Sync + 'static,
    {
        self.services
            .entry(id.into())
            .or_default()
            .insert(method.into(), Arc::new(handler));
        self
    }

    pub fn lookup(&self, id: &str, method: &str) -> Result<&ProviderFn, ContentProviderError> {
        let methods = self
            .services
            .get(id)
            .ok_or_else(|| ContentProviderError::UnknownService { id: id.to_string() })?;
        methods
            .get(method)
            .map(|handler| handler.as_ref())
            .ok_or_else(|| ContentProviderError::UnknownMethod {
                id: id.to_string(),
                method: method.to_string(),
            })
    }

    /// Invoke `id::method`, wrapping handler failures
    pub fn invoke(
        &self,
        id: &str,
        method: &str,
        source: &dyn Resource,
        params: &Parameters,
    ) -> Result<Provided, ContentProviderError> {
        let handler = self.lookup(id, method)?;
        handler(source, params).map_err(|source| ContentProviderError::Invocation {
            id: id.to_string(),
            method: method.to_string(),
            source,
        })
    }

    pub fn len(&self) -> usize {
        self.services.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<String> = self
            .services
            .iter()
            .flat_map(|(id, methods)| methods.keys().map(move |m| format!("{}::{}", id, m)))
            .collect();
        names.sort();
        f.debug_struct("ProviderRegistry").field("handlers", &names).finish()
    }
}
