//! Data shapes returned by the store.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One result row: column name → value, in the column order of the statement.
pub type Row = Map<String, Value>;

/// A stored question close to the live question, with the sample query that
/// answers it and the output group that query feeds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleMatch {
    pub question: String,
    pub query: String,
    /// Output group name (grouping key).
    pub output: String,
    /// Raw visualization kind as stored, e.g. `text-answer`.
    #[serde(default)]
    pub visualization: Option<String>,
    #[serde(default)]
    pub order: i64,
    /// Cosine similarity against the live question embedding.
    pub score: f32,
}

/// A property and its Neo4j type names (`STRING`, `INTEGER`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PropertyInfo {
    pub name: String,
    pub kind: String,
}

/// Properties seen on a node label (or relationship type).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelProperties {
    pub label: String,
    pub properties: Vec<PropertyInfo>,
}

/// `(:start)-[:rel_type]->(:end)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelationshipPattern {
    pub start: String,
    pub rel_type: String,
    pub end: String,
}

/// Structural description of the graph, used to prompt for queries without samples.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GraphSchema {
    pub node_properties: Vec<LabelProperties>,
    pub relationship_properties: Vec<LabelProperties>,
    pub relationships: Vec<RelationshipPattern>,
}

impl GraphSchema {
    /// Drops node labels matching `hide`, and every relationship touching them.
    ///
    /// Relationship-type properties are dropped when the type itself matches
    /// `hide`, or when it was only ever seen between hidden labels. Types
    /// missing from the sampled patterns are kept.
    pub fn without_labels(mut self, hide: impl Fn(&str) -> bool) -> Self {
        self.node_properties
            .retain(|n| !n.label.split(':').any(|l| hide(l)));

        let (kept, dropped): (Vec<_>, Vec<_>) = self
            .relationships
            .into_iter()
            .partition(|r| !hide(&r.start) && !hide(&r.end));
        let internal_only = |rel: &str| {
            dropped.iter().any(|r| r.rel_type == rel) && !kept.iter().any(|r| r.rel_type == rel)
        };
        self.relationship_properties
            .retain(|p| !hide(&p.label) && !internal_only(&p.label));
        self.relationships = kept;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.node_properties.is_empty() && self.relationships.is_empty()
    }

    /// Prompt-friendly text rendering.
    ///
    /// ```text
    /// Node properties:
    /// Person {name: STRING, born: INTEGER}
    /// Relationship properties:
    /// ACTED_IN {roles: LIST<STRING>}
    /// The relationships:
    /// (:Person)-[:ACTED_IN]->(:Movie)
    /// ```
    pub fn render(&self) -> String {
        let mut out = String::from("Node properties:\n");
        for n in &self.node_properties {
            out.push_str(&render_props(n));
            out.push('\n');
        }
        out.push_str("Relationship properties:\n");
        for r in &self.relationship_properties {
            out.push_str(&render_props(r));
            out.push('\n');
        }
        out.push_str("The relationships:\n");
        for r in &self.relationships {
            out.push_str(&format!("(:{})-[:{}]->(:{})\n", r.start, r.rel_type, r.end));
        }
        out
    }
}

fn render_props(lp: &LabelProperties) -> String {
    let props = lp
        .properties
        .iter()
        .map(|p| format!("{}: {}", p.name, p.kind))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{} {{{}}}", lp.label, props)
}
