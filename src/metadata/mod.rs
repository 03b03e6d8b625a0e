//! Relation metadata: per-class relation declarations and the read-only store.
//!
//! The store is populated once (from YAML files or programmatically) and then
//! only read. Every validation happens while loading so serialization never
//! sees a malformed declaration.

mod yaml;

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, OnceLock};

use regex::Regex;
use serde_json::Value;
use walkdir::WalkDir;

use crate::error::{EmbedError, Result};

/// How one named parameter is derived from the source object.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamRule {
    /// Dot-separated property path read from the object's document form
    Property(String),
    /// Fixed value
    Literal(Value),
}

impl ParamRule {
    pub fn property(path: impl Into<String>) -> Self {
        let path = path.into();
        match path.strip_prefix('.') {
            Some(stripped) => ParamRule::Property(stripped.to_string()),
            None => ParamRule::Property(path),
        }
    }

    pub fn literal(value: impl Into<Value>) -> Self {
        ParamRule::Literal(value.into())
    }
}

/// Reference to a registered content provider method
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentProviderRef {
    pub id: String,
    pub method: String,
}

/// Serializer hints for embedded content
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentOptions {
    /// Explicit XML element name for the embedded content
    pub xml_element_name: Option<String>,
    /// Use the content's root name from serializer class metadata
    pub xml_element_root_name: bool,
}

/// One declared relation of a class. Immutable once stored.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationDeclaration {
    pub rel: String,
    pub route: String,
    pub params: Vec<(String, ParamRule)>,
    pub content_provider: Option<ContentProviderRef>,
    pub content: ContentOptions,
}

impl RelationDeclaration {
    pub fn new(rel: impl Into<String>, route: impl Into<String>) -> Self {
        Self {
            rel: rel.into(),
            route: route.into(),
            params: Vec::new(),
            content_provider: None,
            content: ContentOptions::default(),
        }
    }

    pub fn param(mut self, name: impl Into<String>, rule: ParamRule) -> Self {
        self.params.push((name.into(), rule));
        self
    }

    pub fn provider(mut self, id: impl Into<String>, method: impl Into<String>) -> Self {
        self.content_provider = Some(ContentProviderRef {
            id: id.into(),
            method: method.into(),
        });
        self
    }

    pub fn xml_element_name(mut self, name: impl Into<String>) -> Self {
        self.content.xml_element_name = Some(name.into());
        self
    }

    pub fn xml_element_root_name(mut self) -> Self {
        self.content.xml_element_root_name = true;
        self
    }
}

/// Check that `name` can be used as an XML element name.
pub fn is_valid_element_name(name: &str) -> bool {
    static ELEMENT_NAME: OnceLock<Regex> = OnceLock::new();
    ELEMENT_NAME
        .get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_.\-]*$").expect("Invalid regex pattern"))
        .is_match(name)
}

/// Read-only relation metadata, keyed by class name.
#[derive(Debug, Default)]
pub struct MetadataStore {
    classes: HashMap<String, Arc<[Arc<RelationDeclaration>]>>,
}

impl MetadataStore {
    pub fn builder() -> MetadataStoreBuilder {
        MetadataStoreBuilder::default()
    }

    /// Declarations of `class_name` in declaration order; empty when the class has none.
    pub fn declarations(&self, class_name: &str) -> &[Arc<RelationDeclaration>] {
        self.classes
            .get(class_name)
            .map(|declarations| &declarations[..])
            .unwrap_or(&[])
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.classes.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Every content provider referenced by any declaration
    pub fn provider_refs(&self) -> impl Iterator<Item = &ContentProviderRef> {
        self.classes
            .values()
            .flat_map(|declarations| declarations.iter())
            .filter_map(|declaration| declaration.content_provider.as_ref())
    }

    /// Load a single YAML metadata file
    pub fn load_file(path: &Path) -> Result<Self> {
        let mut builder = Self::builder();
        builder.add_file(path)?;
        Ok(builder.build())
    }

    /// Load and merge several YAML metadata files
    pub fn load_files<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        let mut builder = Self::builder();
        for path in paths {
            builder.add_file(path.as_ref())?;
        }
        Ok(builder.build())
    }

    /// Load every `.yml` / `.yaml` file below `root`
    pub fn load_dir(root: &Path) -> Result<Self> {
        let mut builder = Self::builder();
        builder.add_dir(root)?;
        Ok(builder.build())
    }

    /// Parse metadata from an in-memory YAML document; `source` names it in errors.
    pub fn from_yaml_str(content: &str, source: &str) -> Result<Self> {
        let mut builder = Self::builder();
        builder.add_yaml(content, source)?;
        Ok(builder.build())
    }
}

/// Accumulates class declarations, validating each class as it is added.
#[derive(Debug, Default)]
pub struct MetadataStoreBuilder {
    classes: HashMap<String, (String, Vec<Arc<RelationDeclaration>>)>,
}

impl MetadataStoreBuilder {
    /// Declare the relations of `class_name`. `source` names the origin in errors.
    pub fn add_class(
        &mut self,
        source: &str,
        class_name: &str,
        declarations: Vec<RelationDeclaration>,
    ) -> Result<&mut Self> {
        if let Some((previous, _)) = self.classes.get(class_name) {
            return Err(EmbedError::metadata(
                source,
                format!("class {} is already declared in {}", class_name, previous),
            ));
        }

        let mut seen: Vec<&str> = Vec::with_capacity(declarations.len());
        for declaration in &declarations {
            validate_declaration(source, class_name, declaration)?;
            if seen.contains(&declaration.rel.as_str()) {
                return Err(EmbedError::metadata(
                    source,
                    format!("class {}: duplicate relation '{}'", class_name, declaration.rel),
                ));
            }
            seen.push(&declaration.rel);
        }

        self.classes.insert(
            class_name.to_string(),
            (
                source.to_string(),
                declarations.into_iter().map(Arc::new).collect(),
            ),
        );
        Ok(self)
    }

    pub fn add_yaml(&mut self, content: &str, source: &str) -> Result<&mut Self> {
        for (class_name, declarations) in yaml::parse_document(content, source)? {
            self.add_class(source, &class_name, declarations)?;
        }
        Ok(self)
    }

    pub fn add_file(&mut self, path: &Path) -> Result<&mut Self> {
        let source = path.display().to_string();
        let content = std::fs::read_to_string(path)
            .map_err(|e| EmbedError::metadata(&source, format!("cannot read file: {}", e)))?;
        log::debug!("Loading relation metadata from {}", source);
        self.add_yaml(&content, &source)
    }

    /// Add every `.yml` / `.yaml` file below `root`, in path order.
    pub fn add_dir(&mut self, root: &Path) -> Result<&mut Self> {
        if !root.is_dir() {
            return Err(EmbedError::metadata(
                root.display().to_string(),
                "metadata path is not a directory",
            ));
        }

        for entry in WalkDir::new(root)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
        {
            let entry = entry.map_err(|e| {
                EmbedError::metadata(root.display().to_string(), format!("cannot walk directory: {}", e))
            })?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }

            let extension = path
                .extension()
                .and_then(|s| s.to_str())
                .unwrap_or("")
                .to_lowercase();
            if matches!(extension.as_str(), "yml" | "yaml") {
                self.add_file(path)?;
            }
        }
        Ok(self)
    }

    pub fn build(self) -> MetadataStore {
        MetadataStore {
            classes: self
                .classes
                .into_iter()
                .map(|(class_name, (_, declarations))| (class_name, declarations.into()))
                .collect(),
        }
    }
}

fn validate_declaration(source: &str, class_name: &str, declaration: &RelationDeclaration) -> Result<()> {
    if declaration.rel.trim().is_empty() {
        return Err(EmbedError::metadata(
            source,
            format!("class {}: relation has an empty 'rel'", class_name),
        ));
    }
    if declaration.route.trim().is_empty() {
        return Err(EmbedError::metadata(
            source,
            format!("class {}: relation '{}' has an empty 'route'", class_name, declaration.rel),
        ));
    }
    if let Some(provider) = &declaration.content_provider {
        if provider.id.is_empty() || provider.method.is_empty() {
            return Err(EmbedError::metadata(
                source,
                format!(
                    "class {}: relation '{}' needs both content_provider id and method",
                    class_name, declaration.rel
                ),
            ));
        }
    }
    for (name, rule) in &declaration.params {
        if let ParamRule::Property(path) = rule {
            if path.split('.').any(str::is_empty) {
                return Err(EmbedError::metadata(
                    source,
                    format!(
                        "class {}: relation '{}' parameter '{}' has a malformed property path '{}'",
                        class_name, declaration.rel, name, path
                    ),
                ));
            }
        }
    }
    if let Some(name) = &declaration.content.xml_element_name {
        if !is_valid_element_name(name) {
            return Err(EmbedError::metadata(
                source,
                format!(
                    "class {}: relation '{}' has an invalid XML element name '{}'",
                    class_name, declaration.rel, name
                ),
            ));
        }
    }
    Ok(())
}
