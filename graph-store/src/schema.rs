//! Structural schema description built from `db.schema.*` procedures.

use std::collections::BTreeMap;

use serde_json::{Value, json};
use tracing::debug;

use crate::client::Neo4jClient;
use crate::errors::GraphError;
use crate::model::{GraphSchema, LabelProperties, PropertyInfo, RelationshipPattern, Row};

const NODE_PROPERTIES: &str = "
CALL db.schema.nodeTypeProperties()
YIELD nodeLabels, propertyName, propertyTypes
RETURN nodeLabels, propertyName, propertyTypes";

const REL_PROPERTIES: &str = "
CALL db.schema.relTypeProperties()
YIELD relType, propertyName, propertyTypes
RETURN relType, propertyName, propertyTypes";

const REL_PATTERNS: &str = "
MATCH (a)-[r]->(b)
WITH a, r, b LIMIT $sample
RETURN DISTINCT head(labels(a)) AS source, type(r) AS rel, head(labels(b)) AS target";

impl Neo4jClient {
    /// Describes labels, relationship types and their properties.
    ///
    /// Relationship patterns are sampled from the first `schema_sample`
    /// relationships to bound the cost on large graphs.
    pub async fn describe_schema(&self) -> Result<GraphSchema, GraphError> {
        let nodes = self.execute(NODE_PROPERTIES).await?;
        let rels = self.execute(REL_PROPERTIES).await?;
        let patterns = self
            .run(REL_PATTERNS, json!({ "sample": self.config().schema_sample }))
            .await?;

        let schema = GraphSchema {
            node_properties: group_properties(&nodes, |row| {
                let labels: Vec<&str> = row
                    .get("nodeLabels")?
                    .as_array()?
                    .iter()
                    .filter_map(Value::as_str)
                    .collect();
                (!labels.is_empty()).then(|| labels.join(":"))
            }),
            relationship_properties: group_properties(&rels, |row| {
                row.get("relType")?.as_str().map(strip_type_marker)
            }),
            relationships: patterns.iter().filter_map(pattern_from_row).collect(),
        };

        debug!(
            labels = schema.node_properties.len(),
            rel_types = schema.relationship_properties.len(),
            patterns = schema.relationships.len(),
            "schema: described"
        );
        Ok(schema)
    }
}

/// `` :`ACTED_IN` `` → `ACTED_IN`
fn strip_type_marker(raw: &str) -> String {
    raw.trim_start_matches(':').trim_matches('`').to_string()
}

fn group_properties(
    rows: &[Row],
    label_of: impl Fn(&Row) -> Option<String>,
) -> Vec<LabelProperties> {
    let mut grouped: BTreeMap<String, Vec<PropertyInfo>> = BTreeMap::new();
    for row in rows {
        let Some(label) = label_of(row) else { continue };
        let props = grouped.entry(label).or_default();
        let Some(name) = row.get("propertyName").and_then(Value::as_str) else {
            continue;
        };
        let kind = row
            .get("propertyTypes")
            .and_then(Value::as_array)
            .map(|types| {
                types
                    .iter()
                    .filter_map(Value::as_str)
                    .map(normalize_type)
                    .collect::<Vec<_>>()
                    .join(" | ")
            })
            .filter(|k| !k.is_empty())
            .unwrap_or_else(|| "ANY".to_string());
        props.push(PropertyInfo {
            name: name.to_string(),
            kind,
        });
    }
    grouped
        .into_iter()
        .map(|(label, properties)| LabelProperties { label, properties })
        .collect()
}

/// `String` / `StringArray` (Neo4j 4) and `STRING NOT NULL` (Neo4j 5) → `STRING` / `LIST<STRING>`.
fn normalize_type(raw: &str) -> String {
    let t = raw.trim().trim_end_matches(" NOT NULL").to_ascii_uppercase();
    match t.strip_suffix("ARRAY") {
        Some(inner) => format!("LIST<{inner}>"),
        None => t,
    }
}

fn pattern_from_row(row: &Row) -> Option<RelationshipPattern> {
    Some(RelationshipPattern {
        start: row.get("source")?.as_str()?.to_string(),
        rel_type: row.get("rel")?.as_str()?.to_string(),
        end: row.get("target")?.as_str()?.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(v: Value) -> Row {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn groups_node_properties_by_label() {
        let rows = vec![
            row(json!({"nodeLabels": ["Person"], "propertyName": "name", "propertyTypes": ["String"]})),
            row(json!({"nodeLabels": ["Person"], "propertyName": "born", "propertyTypes": ["Long"]})),
            row(json!({"nodeLabels": ["Genre"], "propertyName": null, "propertyTypes": null})),
        ];
        let grouped = group_properties(&rows, |r| {
            let l = r.get("nodeLabels")?.as_array()?.first()?.as_str()?;
            Some(l.to_string())
        });
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[0].label, "Genre");
        assert!(grouped[0].properties.is_empty());
        assert_eq!(grouped[1].properties[0].kind, "STRING");
        assert_eq!(grouped[1].properties[1].name, "born");
    }

    #[test]
    fn normalizes_type_names() {
        assert_eq!(normalize_type("StringArray"), "LIST<STRING>");
        assert_eq!(normalize_type("INTEGER NOT NULL"), "INTEGER");
        assert_eq!(strip_type_marker(":`ACTED_IN`"), "ACTED_IN");
    }

    #[test]
    fn skips_patterns_with_unlabeled_nodes() {
        let ok = row(json!({"source": "Person", "rel": "ACTED_IN", "target": "Movie"}));
        let unlabeled = row(json!({"source": null, "rel": "LINKS", "target": "Movie"}));
        assert!(pattern_from_row(&ok).is_some());
        assert!(pattern_from_row(&unlabeled).is_none());
    }
}
