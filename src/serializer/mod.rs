//! Host serializer.
//!
//! Renders a `Resource` through its document form into JSON, YAML or XML and
//! fires the registered post-serialize hooks once per object, after the
//! object's own fields are written and before the document is rendered.

mod flat;
mod xml;

pub use flat::FlatVisitor;
pub use xml::{XmlElement, XmlNode, XmlVisitor};

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::{EmbedError, Result};
use crate::metadata::is_valid_element_name;
use crate::resource::Resource;

/// Default XML root element when the object declares none
pub const DEFAULT_XML_ROOT_NAME: &str = "result";

/// Output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Json,
    Yaml,
    Xml,
}

impl Format {
    /// JSON and YAML are keyed maps; XML is an element tree
    pub fn is_flat(self) -> bool {
        !matches!(self, Format::Xml)
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Format::Json => "json",
            Format::Yaml => "yml",
            Format::Xml => "xml",
        };
        f.write_str(name)
    }
}

impl FromStr for Format {
    type Err = EmbedError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Format::Json),
            "yml" | "yaml" => Ok(Format::Yaml),
            "xml" => Ok(Format::Xml),
            other => Err(EmbedError::Config(format!("Unsupported format: {}", other))),
        }
    }
}

/// The active output cursor for the object being serialized
pub enum Visitor<'a> {
    Flat(&'a mut FlatVisitor),
    Xml(&'a mut XmlVisitor),
}

/// Fired once per serialized object per format
pub struct PostSerializeEvent<'a> {
    object: &'a dyn Resource,
    format: Format,
    visitor: Visitor<'a>,
}

impl<'a> PostSerializeEvent<'a> {
    pub fn new(object: &'a dyn Resource, format: Format, visitor: Visitor<'a>) -> Self {
        Self {
            object,
            format,
            visitor,
        }
    }

    pub fn object(&self) -> &'a dyn Resource {
        self.object
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn visitor_mut(&mut self) -> &mut Visitor<'a> {
        &mut self.visitor
    }
}

/// Extension point invoked synchronously at the end of each object's serialization.
pub trait PostSerializeHook: Send + Sync {
    fn on_post_serialize(&self, event: &mut PostSerializeEvent<'_>) -> Result<()>;
}

/// Minimal serializer driving JSON, YAML and XML output.
#[derive(Clone)]
pub struct Serializer {
    hooks: Vec<Arc<dyn PostSerializeHook>>,
    xml_root_name: String,
    pretty: bool,
}

impl Default for Serializer {
    fn default() -> Self {
        Self::new()
    }
}

impl Serializer {
    pub fn new() -> Self {
        Self {
            hooks: Vec::new(),
            xml_root_name: DEFAULT_XML_ROOT_NAME.to_string(),
            pretty: false,
        }
    }

    pub fn with_hook(mut self, hook: Arc<dyn PostSerializeHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    pub fn with_xml_root_name(mut self, name: impl Into<String>) -> Self {
        self.xml_root_name = name.into();
        self
    }

    /// Pretty-print JSON output
    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn serialize(&self, object: &dyn Resource, format: Format) -> Result<String> {
        let value = object.to_value()?;
        log::debug!("Serializing {} as {}", object.class_name(), format);

        match format {
            Format::Json | Format::Yaml => {
                let mut visitor = FlatVisitor::new(value);
                for hook in &self.hooks {
                    let mut event = PostSerializeEvent::new(object, format, Visitor::Flat(&mut visitor));
                    hook.on_post_serialize(&mut event)?;
                }
                let value = visitor.into_value();

                if format == Format::Yaml {
                    Ok(serde_yaml_ng::to_string(&value)?)
                } else if self.pretty {
                    Ok(serde_json::to_string_pretty(&value)?)
                } else {
                    Ok(serde_json::to_string(&value)?)
                }
            }
            Format::Xml => {
                let root_name = object.xml_root_name().unwrap_or(self.xml_root_name.as_str());
                if !is_valid_element_name(root_name) {
                    return Err(EmbedError::Serialization(format!(
                        "invalid XML root element name '{}' for {}",
                        root_name,
                        object.class_name()
                    )));
                }
                let mut visitor = XmlVisitor::new(root_name);
                visitor.append_value(&value);
                for hook in &self.hooks {
                    let mut event = PostSerializeEvent::new(object, format, Visitor::Xml(&mut visitor));
                    hook.on_post_serialize(&mut event)?;
                }
                visitor.render()
            }
        }
    }
}

impl fmt::Debug for Serializer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Serializer")
            .field("hooks", &self.hooks.len())
            .field("xml_root_name", &self.xml_root_name)
            .field("pretty", &self.pretty)
            .finish()
    }
}
