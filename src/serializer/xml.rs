use std::fmt::Display;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use serde_json::Value;

use crate::error::{EmbedError, Result};
use crate::metadata::is_valid_element_name;

/// Element used for sequence items and for keys that are not valid element names
const ENTRY_ELEMENT: &str = "entry";

#[derive(Debug, Clone, PartialEq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|node| match node {
            XmlNode::Element(element) => Some(element),
            XmlNode::Text(_) => None,
        })
    }
}

/// Output cursor for XML: a document tree with a current node.
///
/// `open_element` appends a child to the current node and makes it current;
/// `revert_current_node` closes it and returns to the parent. The root stays
/// open for the whole pass.
#[derive(Debug, Clone)]
pub struct XmlVisitor {
    root: XmlElement,
    open: Vec<XmlElement>,
}

impl XmlVisitor {
    pub fn new(root_name: &str) -> Self {
        Self {
            root: XmlElement::new(root_name),
            open: Vec::new(),
        }
    }

    pub fn current_node(&self) -> &XmlElement {
        self.open.last().unwrap_or(&self.root)
    }

    fn current_node_mut(&mut self) -> &mut XmlElement {
        self.open.last_mut().unwrap_or(&mut self.root)
    }

    /// Number of elements opened above the root
    pub fn depth(&self) -> usize {
        self.open.len()
    }

    pub fn open_element(&mut self, name: &str) {
        self.open.push(XmlElement::new(name));
    }

    pub fn revert_current_node(&mut self) -> Result<()> {
        let element = self
            .open
            .pop()
            .ok_or_else(|| EmbedError::Serialization("no open element to close".to_string()))?;
        self.current_node_mut().children.push(XmlNode::Element(element));
        Ok(())
    }

    pub fn set_attribute(&mut self, name: &str, value: &str) {
        let node = self.current_node_mut();
        match node.attributes.iter_mut().find(|(key, _)| key == name) {
            Some((_, existing)) => *existing = value.to_string(),
            None => node.attributes.push((name.to_string(), value.to_string())),
        }
    }

    /// Write `value` as children of the current node
    pub fn append_value(&mut self, value: &Value) {
        write_value(self.current_node_mut(), value);
    }

    pub fn root(&self) -> &XmlElement {
        &self.root
    }

    pub fn render(&self) -> Result<String> {
        if !self.open.is_empty() {
            return Err(EmbedError::Serialization(format!(
                "{} XML element(s) left open",
                self.open.len()
            )));
        }

        let mut writer = Writer::new(Vec::new());
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(xml_error)?;
        write_element(&mut writer, &self.root)?;

        String::from_utf8(writer.into_inner()).map_err(xml_error)
    }
}

fn write_value(node: &mut XmlElement, value: &Value) {
    match value {
        Value::Null => {}
        Value::Bool(flag) => node.children.push(XmlNode::Text(flag.to_string())),
        Value::Number(number) => node.children.push(XmlNode::Text(number.to_string())),
        Value::String(text) => node.children.push(XmlNode::Text(text.clone())),
        Value::Array(items) => {
            for item in items {
                let mut child = XmlElement::new(ENTRY_ELEMENT);
                write_value(&mut child, item);
                node.children.push(XmlNode::Element(child));
            }
        }
        Value::Object(map) => {
            for (key, item) in map {
                if item.is_null() {
                    continue;
                }
                let mut child = if is_valid_element_name(key) {
                    XmlElement::new(key.as_str())
                } else {
                    let mut entry = XmlElement::new(ENTRY_ELEMENT);
                    entry.attributes.push(("key".to_string(), key.clone()));
                    entry
                };
                write_value(&mut child, item);
                node.children.push(XmlNode::Element(child));
            }
        }
    }
}

fn write_element(writer: &mut Writer<Vec<u8>>, element: &XmlElement) -> Result<()> {
    let mut start = BytesStart::new(element.name.as_str());
    for (key, value) in &element.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    if element.children.is_empty() {
        return writer.write_event(Event::Empty(start)).map_err(xml_error);
    }

    writer.write_event(Event::Start(start)).map_err(xml_error)?;
    for child in &element.children {
        match child {
            XmlNode::Element(child) => write_element(writer, child)?,
            XmlNode::Text(text) => writer
                .write_event(Event::Text(BytesText::new(text)))
                .map_err(xml_error)?,
        }
    }
    writer
        .write_event(Event::End(BytesEnd::new(element.name.as_str())))
        .map_err(xml_error)
}

fn xml_error(e: impl Display) -> EmbedError {
    EmbedError::Serialization(format!("XML write error: {}", e))
}
