pub mod config;
pub mod error;
pub mod resource;
pub mod metadata;
pub mod params;
pub mod provider;
pub mod content;
pub mod serializer;
pub mod emit;
pub mod engine;

pub use config::Config;
pub use error::{EmbedError, Result};
pub use content::{ContentResolver, Link, ResolvedContent, UrlGenerator};
pub use engine::{RelationEngine, RelationSet};
pub use metadata::{MetadataStore, ParamRule, RelationDeclaration};
pub use provider::{Provided, ProviderRegistry};
pub use resource::{ContentShape, Resource};
pub use serializer::{Format, PostSerializeHook, Serializer};
