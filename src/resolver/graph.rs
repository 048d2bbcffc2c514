use std::collections::HashMap;

use crate::xml::{Document, NodeId, XLINK_NS};

type Edges = HashMap<String, HashMap<String, Vec<String>>>;

/// Adjacency index over the `RELATIONSHIP` edges of a response.
///
/// Built once per document. Lookups are keyed by arcrole first, then by the
/// label at the known end of the edge.
#[derive(Debug, Default, Clone)]
pub struct RelationshipIndex {
    /// arcrole -> to -> [from]
    inbound: Edges,
    /// arcrole -> from -> [to]
    outbound: Edges,
    /// label -> element carrying it (first occurrence wins)
    labels: HashMap<String, NodeId>,
}

impl RelationshipIndex {
    pub fn build(doc: &Document) -> Self {
        let mut index = Self::default();

        for id in 0..doc.len() {
            if let Some(label) = doc.attr_ns(id, XLINK_NS, "label") {
                index.labels.entry(label.to_string()).or_insert(id);
            }
        }

        for id in doc.descendants_named("RELATIONSHIP") {
            let (Some(arcrole), Some(from), Some(to)) = (
                doc.attr_ns(id, XLINK_NS, "arcrole"),
                doc.attr_ns(id, XLINK_NS, "from"),
                doc.attr_ns(id, XLINK_NS, "to"),
            ) else {
                continue;
            };

            index
                .inbound
                .entry(arcrole.to_string())
                .or_default()
                .entry(to.to_string())
                .or_default()
                .push(from.to_string());
            index
                .outbound
                .entry(arcrole.to_string())
                .or_default()
                .entry(from.to_string())
                .or_default()
                .push(to.to_string());
        }

        index
    }

    /// `from` labels of every `arcrole` edge ending at `to`, in edge order
    pub fn sources(&self, arcrole: &str, to: &str) -> &[String] {
        lookup(&self.inbound, arcrole, to)
    }

    /// `to` labels of every `arcrole` edge starting at `from`, in edge order
    pub fn targets(&self, arcrole: &str, from: &str) -> &[String] {
        lookup(&self.outbound, arcrole, from)
    }

    pub fn node(&self, label: &str) -> Option<NodeId> {
        self.labels.get(label).copied()
    }

    /// Resolve labels to elements, sorted into document order.
    ///
    /// Duplicate labels collapse and labels with no element are dropped.
    pub fn in_document_order<'a>(
        &self,
        labels: impl IntoIterator<Item = &'a String>,
    ) -> Vec<(&'a str, NodeId)> {
        let mut resolved: Vec<(&str, NodeId)> = labels
            .into_iter()
            .filter_map(|label| self.node(label).map(|id| (label.as_str(), id)))
            .collect();
        resolved.sort_by_key(|&(_, id)| id);
        resolved.dedup_by_key(|&mut (_, id)| id);
        resolved
    }

    pub fn edge_count(&self) -> usize {
        self.inbound
            .values()
            .flat_map(|by_label| by_label.values())
            .map(Vec::len)
            .sum()
    }
}

fn lookup<'a>(edges: &'a Edges, arcrole: &str, label: &str) -> &'a [String] {
    edges
        .get(arcrole)
        .and_then(|by_label| by_label.get(label))
        .map(Vec::as_slice)
        .unwrap_or(&[])
}
