use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;
use quick_xml::reader::NsReader;

use crate::error::{CreditError, Result};
use crate::xml::XmlElement;

/// Index of an element inside a [`Document`]
pub type NodeId = usize;

#[derive(Debug, Clone)]
struct Attribute {
    namespace: Option<String>,
    local_name: String,
    value: String,
}

#[derive(Debug, Clone)]
struct Node {
    namespace: Option<String>,
    local_name: String,
    attributes: Vec<Attribute>,
    children: Vec<NodeId>,
    text: String,
}

/// Immutable, namespace-resolved element tree.
///
/// Elements are stored in document order, so a node's id is also its
/// position in a pre-order walk. Path queries match on local names, which
/// keeps them independent of whatever prefixes the server chose.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
}

impl Document {
    /// Parse a complete document
    pub fn parse(xml: &str) -> Result<Self> {
        let mut reader = NsReader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut nodes: Vec<Node> = Vec::new();
        let mut stack: Vec<NodeId> = Vec::new();
        let mut saw_root = false;

        loop {
            let (namespace, event) = reader.read_resolved_event()?;
            let namespace = match namespace {
                ResolveResult::Bound(ns) => Some(String::from_utf8_lossy(ns.as_ref()).into_owned()),
                _ => None,
            };

            match event {
                Event::Start(start) | Event::Empty(start) if saw_root && stack.is_empty() => {
                    return Err(CreditError::malformed(format!(
                        "unexpected second root element <{}>",
                        String::from_utf8_lossy(start.local_name().as_ref())
                    )));
                }
                Event::Start(start) => {
                    let id = Self::push_node(&reader, &mut nodes, &stack, namespace, &start)?;
                    stack.push(id);
                    saw_root = true;
                }
                Event::Empty(start) => {
                    Self::push_node(&reader, &mut nodes, &stack, namespace, &start)?;
                    saw_root = true;
                }
                Event::End(_) => {
                    stack.pop();
                }
                Event::Text(text) => {
                    if let Some(&current) = stack.last() {
                        nodes[current].text.push_str(&text.unescape()?);
                    }
                }
                Event::CData(data) => {
                    if let Some(&current) = stack.last() {
                        nodes[current]
                            .text
                            .push_str(&String::from_utf8_lossy(&data.into_inner()));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !stack.is_empty() {
            return Err(CreditError::malformed("document ended inside an open element"));
        }
        if nodes.is_empty() {
            return Err(CreditError::malformed("document has no root element"));
        }

        Ok(Self { nodes })
    }

    fn push_node(
        reader: &NsReader<&[u8]>,
        nodes: &mut Vec<Node>,
        stack: &[NodeId],
        namespace: Option<String>,
        start: &BytesStart<'_>,
    ) -> Result<NodeId> {
        let mut attributes = Vec::new();
        for attribute in start.attributes() {
            let attribute = attribute?;
            let (attr_ns, local) = reader.resolve_attribute(attribute.key);
            let attr_ns = match attr_ns {
                ResolveResult::Bound(ns) => Some(String::from_utf8_lossy(ns.as_ref()).into_owned()),
                _ => None,
            };
            attributes.push(Attribute {
                namespace: attr_ns,
                local_name: String::from_utf8_lossy(local.as_ref()).into_owned(),
                value: attribute.unescape_value()?.into_owned(),
            });
        }

        let id = nodes.len();
        nodes.push(Node {
            namespace,
            local_name: String::from_utf8_lossy(start.local_name().as_ref()).into_owned(),
            attributes,
            children: Vec::new(),
            text: String::new(),
        });
        if let Some(&parent) = stack.last() {
            nodes[parent].children.push(id);
        }
        Ok(id)
    }

    pub fn root(&self) -> NodeId {
        0
    }

    pub fn name(&self, id: NodeId) -> &str {
        &self.nodes[id].local_name
    }

    pub fn namespace(&self, id: NodeId) -> Option<&str> {
        self.nodes[id].namespace.as_deref()
    }

    /// Trimmed text content of the element itself (not of its descendants)
    pub fn text(&self, id: NodeId) -> &str {
        self.nodes[id].text.trim()
    }

    /// Attribute value by namespace URI and local name
    pub fn attr_ns(&self, id: NodeId, namespace: &str, local_name: &str) -> Option<&str> {
        self.nodes[id]
            .attributes
            .iter()
            .find(|attr| attr.local_name == local_name && attr.namespace.as_deref() == Some(namespace))
            .map(|attr| attr.value.as_str())
    }

    /// Unqualified attribute value by local name
    pub fn attr(&self, id: NodeId, local_name: &str) -> Option<&str> {
        self.nodes[id]
            .attributes
            .iter()
            .find(|attr| attr.local_name == local_name && attr.namespace.is_none())
            .map(|attr| attr.value.as_str())
    }

    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes[id].children.iter().copied()
    }

    pub fn children_named<'a>(
        &'a self,
        id: NodeId,
        name: &'a str,
    ) -> impl Iterator<Item = NodeId> + 'a {
        self.children(id).filter(move |&child| self.name(child) == name)
    }

    /// First element reached by following a `/`-separated path of local names
    pub fn find(&self, id: NodeId, path: &str) -> Option<NodeId> {
        self.find_all(id, path).into_iter().next()
    }

    /// Every element reached by following a `/`-separated path, in document order
    pub fn find_all(&self, id: NodeId, path: &str) -> Vec<NodeId> {
        let mut current = vec![id];
        for segment in path.split('/').filter(|segment| !segment.is_empty()) {
            current = current
                .into_iter()
                .flat_map(|node| self.children_named(node, segment).collect::<Vec<_>>())
                .collect();
            if current.is_empty() {
                break;
            }
        }
        current
    }

    /// Text of the first element at `path`, if that element exists
    pub fn find_text(&self, id: NodeId, path: &str) -> Option<&str> {
        self.find(id, path).map(|node| self.text(node))
    }

    /// Text at `path`, or an empty string when the element is absent
    pub fn text_or_empty(&self, id: NodeId, path: &str) -> String {
        self.find_text(id, path).unwrap_or_default().to_string()
    }

    /// Markup of the element's children, rendered by local name.
    ///
    /// Falls back to the element's text when it has no child elements. Text
    /// inside a child is written ahead of that child's own elements.
    pub fn inner_markup(&self, id: NodeId) -> Result<String> {
        if self.nodes[id].children.is_empty() {
            return Ok(self.text(id).to_string());
        }
        self.children(id)
            .map(|child| self.to_element(child).to_fragment_string())
            .collect()
    }

    /// Owned copy of the subtree rooted at `id`
    pub fn to_element(&self, id: NodeId) -> XmlElement {
        let node = &self.nodes[id];
        let mut element = node
            .attributes
            .iter()
            .fold(XmlElement::new(node.local_name.as_str()), |element, attr| {
                element.attr(attr.local_name.as_str(), attr.value.as_str())
            });
        let text = self.text(id);
        if !text.is_empty() {
            element.push_text(text);
        }
        for child in self.children(id) {
            element.push(self.to_element(child));
        }
        element
    }

    /// Every element with the given local name, in document order
    pub fn descendants_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = NodeId> + 'a {
        (0..self.nodes.len()).filter(move |&id| self.nodes[id].local_name == name)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::{MISMO_NS, XLINK_NS};

    const SAMPLE: &str = r#"<?xml version="1.0"?>
<MESSAGE xmlns="http://www.mismo.org/residential/2009/schemas" xmlns:xl="http://www.w3.org/1999/xlink">
  <PARTIES>
    <PARTY xl:label="Party1" SequenceNumber="1">
      <NAME><FirstName>Ann &amp; Co</FirstName></NAME>
    </PARTY>
    <PARTY xl:label="Party2" SequenceNumber="2"/>
  </PARTIES>
  <NOTE><![CDATA[<b>raw</b>]]></NOTE>
</MESSAGE>"#;

    #[test]
    fn test_parse_resolves_namespaces() {
        let doc = Document::parse(SAMPLE).unwrap();
        let root = doc.root();
        assert_eq!(doc.name(root), "MESSAGE");
        assert_eq!(doc.namespace(root), Some(MISMO_NS));

        let parties = doc.find_all(root, "PARTIES/PARTY");
        assert_eq!(parties.len(), 2);
        assert_eq!(doc.attr_ns(parties[0], XLINK_NS, "label"), Some("Party1"));
        assert_eq!(doc.attr(parties[1], "SequenceNumber"), Some("2"));
        assert_eq!(doc.attr(parties[1], "label"), None);
    }

    #[test]
    fn test_text_is_unescaped() {
        let doc = Document::parse(SAMPLE).unwrap();
        assert_eq!(
            doc.find_text(doc.root(), "PARTIES/PARTY/NAME/FirstName"),
            Some("Ann & Co")
        );
        assert_eq!(doc.find_text(doc.root(), "NOTE"), Some("<b>raw</b>"));
    }

    #[test]
    fn test_missing_path_yields_empty() {
        let doc = Document::parse(SAMPLE).unwrap();
        assert!(doc.find(doc.root(), "PARTIES/PARTY/ADDRESS").is_none());
        assert_eq!(doc.text_or_empty(doc.root(), "DEAL_SETS/DEAL_SET"), "");
    }

    #[test]
    fn test_descendants_in_document_order() {
        let doc = Document::parse(SAMPLE).unwrap();
        let labels: Vec<_> = doc
            .descendants_named("PARTY")
            .filter_map(|id| doc.attr_ns(id, XLINK_NS, "label"))
            .collect();
        assert_eq!(labels, vec!["Party1", "Party2"]);
    }

    #[test]
    fn test_rejects_mismatched_tags() {
        assert!(Document::parse("<MESSAGE><A></B></MESSAGE>").is_err());
    }

    #[test]
    fn test_rejects_unclosed_document() {
        let err = Document::parse("<MESSAGE><A>").unwrap_err();
        assert!(matches!(err, CreditError::MalformedResponse { .. }));
    }

    #[test]
    fn test_rejects_text_only() {
        assert!(Document::parse("not xml at all").is_err());
    }

    #[test]
    fn test_inner_markup_renders_child_elements() {
        let doc = Document::parse(
            r#"<EmbeddedContentXML><html lang="en"><body>Report &amp; scores<br/></body></html></EmbeddedContentXML>"#,
        )
        .unwrap();
        assert_eq!(
            doc.inner_markup(doc.root()).unwrap(),
            r#"<html lang="en"><body>Report &amp; scores<br/></body></html>"#
        );

        let plain = Document::parse("<EmbeddedContentXML> JVBERi0x </EmbeddedContentXML>").unwrap();
        assert_eq!(plain.inner_markup(plain.root()).unwrap(), "JVBERi0x");
    }
}
