//! Turns executed rows into a presentation-specific [`ResultItem`].

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{DropReason, PipelineError, Stage};
use crate::model::{Axes, QueryAudit, ResultItem, Row, VisualizationKind};
use crate::ports::TextOracle;
use crate::prompt::ANSWER_SUMMARY;

/// Column holding the summarized answer of a text result.
pub const ANSWER_FIELD: &str = "answer";

/// Where a result comes from: the output group and its declared position.
#[derive(Debug, Clone, Copy)]
pub struct ShapeTarget<'a> {
    pub output: &'a str,
    pub visualization: VisualizationKind,
    pub order: i64,
}

/// Shapes non-empty `rows` returned by `query`.
///
/// Text answers go through the summarization oracle; tables keep the rows;
/// charts bind the first two columns to x and y.
pub async fn shape(
    summarizer: &dyn TextOracle,
    question: &str,
    query: &str,
    rows: Vec<Row>,
    target: ShapeTarget<'_>,
) -> Result<Stage<ResultItem>, PipelineError> {
    let audit = QueryAudit {
        query: query.to_string(),
        result: serde_json::to_string_pretty(&rows)?,
    };
    let columns: Vec<String> = rows.first().map(|r| r.keys().cloned().collect()).unwrap_or_default();
    if columns.is_empty() {
        return Ok(Err(DropReason::InsufficientColumns));
    }

    let (data, fields, axes) = match target.visualization {
        VisualizationKind::TextAnswer => {
            let context = serde_json::to_string(&rows)?;
            let prompt = ANSWER_SUMMARY.render(&[
                ("question", question),
                ("query", query),
                ("data", context.as_str()),
            ]);
            let answer = summarizer.complete(&prompt).await?;
            let answer = answer.trim();
            if answer.is_empty() {
                warn!(output = target.output, "shape: empty summary");
                return Ok(Err(DropReason::OracleContractViolation));
            }
            let mut row = Row::new();
            row.insert(ANSWER_FIELD.to_string(), Value::String(answer.to_string()));
            (vec![row], vec![ANSWER_FIELD.to_string()], None)
        }
        VisualizationKind::Table => (rows, columns, None),
        VisualizationKind::BarChart | VisualizationKind::LineChart | VisualizationKind::PieChart => {
            if columns.len() < 2 {
                return Ok(Err(DropReason::InsufficientColumns));
            }
            let axes = Axes {
                x: Some(columns[0].clone()),
                y: Some(columns[1].clone()),
                z: None,
            };
            (rows, columns, Some(axes))
        }
    };

    debug!(
        output = target.output,
        visualization = %target.visualization,
        rows = data.len(),
        "shape: result ready"
    );
    Ok(Ok(ResultItem {
        output: target.output.to_string(),
        data,
        queries: vec![audit],
        visualization: target.visualization,
        fields,
        axes,
        order: target.order,
    }))
}
