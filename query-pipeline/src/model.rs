//! Request-scoped data shapes of the pipeline.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use graph_store::Row;

/// Presentation shape of an output; decides how rows are shaped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VisualizationKind {
    #[default]
    TextAnswer,
    Table,
    BarChart,
    LineChart,
    PieChart,
}

impl VisualizationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            VisualizationKind::TextAnswer => "text-answer",
            VisualizationKind::Table => "table",
            VisualizationKind::BarChart => "bar-chart",
            VisualizationKind::LineChart => "line-chart",
            VisualizationKind::PieChart => "pie-chart",
        }
    }

    /// Chart kinds bind the first two columns to the x and y axes.
    pub fn is_chart(&self) -> bool {
        matches!(
            self,
            VisualizationKind::BarChart | VisualizationKind::LineChart | VisualizationKind::PieChart
        )
    }
}

impl fmt::Display for VisualizationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown visualization kind `{0}`")]
pub struct UnknownVisualization(pub String);

impl FromStr for VisualizationKind {
    type Err = UnknownVisualization;

    /// Accepts `text-answer` as well as `text_answer` / `TEXT_ANSWER`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "text-answer" => Ok(VisualizationKind::TextAnswer),
            "table" => Ok(VisualizationKind::Table),
            "bar-chart" => Ok(VisualizationKind::BarChart),
            "line-chart" => Ok(VisualizationKind::LineChart),
            "pie-chart" => Ok(VisualizationKind::PieChart),
            _ => Err(UnknownVisualization(s.to_string())),
        }
    }
}

/// A previously answered question and the query that answered it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleQuery {
    pub question: String,
    pub query: String,
    /// Cosine similarity against the live question.
    pub score: f32,
}

/// A named output group with the samples that feed it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputCandidate {
    pub name: String,
    pub visualization: VisualizationKind,
    pub order: i64,
    pub samples: Vec<SampleQuery>,
}

/// The executed statement and its raw rows as JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryAudit {
    pub query: String,
    pub result: String,
}

/// Column bindings of a chart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Axes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub z: Option<String>,
}

/// One shaped, executed answer.
///
/// `fields` is never empty and names the keys of every `data` row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultItem {
    /// Output group that produced the item.
    pub output: String,
    pub data: Vec<Row>,
    pub queries: Vec<QueryAudit>,
    pub visualization: VisualizationKind,
    pub fields: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub axes: Option<Axes>,
    pub order: i64,
}

/// Items sorted by `order`, ascending. Empty is a valid answer.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchResult {
    pub data: Vec<ResultItem>,
}

impl SearchResult {
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }
}
