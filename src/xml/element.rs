use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use crate::error::{CreditError, Result};

/// Child of an element under construction
#[derive(Debug, Clone, PartialEq)]
enum XmlNode {
    Element(XmlElement),
    Text(String),
}

/// Owned element tree used to assemble outbound documents.
///
/// Names are written exactly as given, so namespace prefixes are part of the
/// name (`P3:REQUEST_EQUIFAX_SCORE`). Text and attribute values are escaped
/// when rendered.
#[derive(Debug, Clone, PartialEq)]
pub struct XmlElement {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<XmlNode>,
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Leaf element holding a single text value
    pub fn leaf(name: impl Into<String>, value: impl Into<String>) -> Self {
        let mut element = Self::new(name);
        element.children.push(XmlNode::Text(value.into()));
        element
    }

    /// Leaf element holding `true` or `false`
    pub fn flag(name: impl Into<String>, value: bool) -> Self {
        Self::leaf(name, if value { "true" } else { "false" })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    pub fn child(mut self, child: XmlElement) -> Self {
        self.children.push(XmlNode::Element(child));
        self
    }

    /// Append `child` only when it is `Some`
    pub fn opt_child(mut self, child: Option<XmlElement>) -> Self {
        if let Some(child) = child {
            self.children.push(XmlNode::Element(child));
        }
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = XmlElement>) -> Self {
        self.children
            .extend(children.into_iter().map(XmlNode::Element));
        self
    }

    /// Append a leaf only when `value` is present and non-empty
    pub fn opt_leaf(self, name: &str, value: Option<&str>) -> Self {
        match value {
            Some(value) if !value.is_empty() => self.child(XmlElement::leaf(name, value)),
            _ => self,
        }
    }

    pub fn push(&mut self, child: XmlElement) {
        self.children.push(XmlNode::Element(child));
    }

    pub fn push_text(&mut self, text: impl Into<String>) {
        self.children.push(XmlNode::Text(text.into()));
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// First direct child element with the given name
    pub fn find(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find_map(|child| match child {
            XmlNode::Element(element) if element.name == name => Some(element),
            _ => None,
        })
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Concatenated text of direct text children
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|child| match child {
                XmlNode::Text(text) => Some(text.as_str()),
                XmlNode::Element(_) => None,
            })
            .collect()
    }

    /// Render as a complete document with an XML declaration
    pub fn to_document_string(&self) -> Result<String> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))
            .map_err(|e| CreditError::XmlWrite(e.to_string()))?;
        self.write_to(&mut writer)?;
        String::from_utf8(writer.into_inner()).map_err(|e| CreditError::XmlWrite(e.to_string()))
    }

    /// Render as a fragment without declaration
    pub fn to_fragment_string(&self) -> Result<String> {
        let mut writer = Writer::new(Vec::new());
        self.write_to(&mut writer)?;
        String::from_utf8(writer.into_inner()).map_err(|e| CreditError::XmlWrite(e.to_string()))
    }

    fn write_to(&self, writer: &mut Writer<Vec<u8>>) -> Result<()> {
        let start = BytesStart::new(self.name.as_str()).with_attributes(
            self.attributes
                .iter()
                .map(|(key, value)| (key.as_str(), value.as_str())),
        );

        if self.children.is_empty() {
            return writer
                .write_event(Event::Empty(start))
                .map_err(|e| CreditError::XmlWrite(e.to_string()));
        }

        writer
            .write_event(Event::Start(start))
            .map_err(|e| CreditError::XmlWrite(e.to_string()))?;
        for child in &self.children {
            match child {
                XmlNode::Element(element) => element.write_to(writer)?,
                XmlNode::Text(text) => writer
                    .write_event(Event::Text(BytesText::new(text)))
                    .map_err(|e| CreditError::XmlWrite(e.to_string()))?,
            }
        }
        writer
            .write_event(Event::End(BytesEnd::new(self.name.as_str())))
            .map_err(|e| CreditError::XmlWrite(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leaf_and_flag() {
        let leaf = XmlElement::leaf("CityName", "Denver");
        assert_eq!(leaf.text(), "Denver");

        let flag = XmlElement::flag("CreditRepositoryIncludedEquifaxIndicator", false);
        assert_eq!(flag.text(), "false");
    }

    #[test]
    fn test_opt_leaf_skips_empty_values() {
        let name = XmlElement::new("NAME")
            .opt_leaf("FirstName", Some("Ann"))
            .opt_leaf("MiddleName", Some(""))
            .opt_leaf("SuffixName", None);

        assert!(name.find("FirstName").is_some());
        assert!(name.find("MiddleName").is_none());
        assert!(name.find("SuffixName").is_none());
    }

    #[test]
    fn test_fragment_escapes_text_and_attributes() {
        let element = XmlElement::new("PARTY")
            .attr("P2:label", "A&B")
            .child(XmlElement::leaf("FullName", "Smith <Jr>"));

        let xml = element.to_fragment_string().unwrap();
        assert_eq!(
            xml,
            r#"<PARTY P2:label="A&amp;B"><FullName>Smith &lt;Jr&gt;</FullName></PARTY>"#
        );
    }

    #[test]
    fn test_empty_element_is_self_closing() {
        let xml = XmlElement::new("RELATIONSHIP")
            .attr("P2:from", "Party1")
            .to_fragment_string()
            .unwrap();
        assert_eq!(xml, r#"<RELATIONSHIP P2:from="Party1"/>"#);
    }

    #[test]
    fn test_document_has_declaration() {
        let xml = XmlElement::new("MESSAGE").to_document_string().unwrap();
        assert!(xml.starts_with(r#"<?xml version="1.0" encoding="utf-8"?>"#));
        assert!(xml.contains("<MESSAGE/>"));
    }
}
