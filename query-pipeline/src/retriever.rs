//! Groups the stored samples nearest to a question into output candidates.

use graph_store::SampleMatch;
use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::error::PipelineError;
use crate::model::{OutputCandidate, SampleQuery, VisualizationKind};
use crate::ports::SampleIndex;

/// Looks up the `top_k` nearest stored questions scoring above
/// `min_score` and groups them by output, sorted by `order`.
///
/// No match is not an error: the result is simply empty.
pub async fn find_candidates(
    index: &dyn SampleIndex,
    embedding: &[f32],
    top_k: usize,
    min_score: f32,
) -> Result<Vec<OutputCandidate>, PipelineError> {
    let matches = index.nearest_samples(embedding, top_k, min_score).await?;
    let found = matches.len();
    let candidates = group_matches(matches.into_iter().filter(|m| m.score > min_score));
    debug!(matches = found, candidates = candidates.len(), "retrieve: grouped samples");
    Ok(candidates)
}

/// Groups matches by output name in first-seen order, then sorts stably by
/// `order`. Visualization and order are taken from the first match of a group.
pub fn group_matches(matches: impl IntoIterator<Item = SampleMatch>) -> Vec<OutputCandidate> {
    let mut groups: IndexMap<String, OutputCandidate> = IndexMap::new();

    for m in matches {
        let visualization = match m.visualization.as_deref() {
            None | Some("") => VisualizationKind::default(),
            Some(raw) => match raw.parse() {
                Ok(kind) => kind,
                Err(e) => {
                    warn!(output = %m.output, "retrieve: skipping sample: {e}");
                    continue;
                }
            },
        };

        let group = groups
            .entry(m.output.clone())
            .or_insert_with(|| OutputCandidate {
                name: m.output.clone(),
                visualization,
                order: m.order,
                samples: Vec::new(),
            });

        let duplicate = group
            .samples
            .iter()
            .any(|s| s.question == m.question && s.query == m.query);
        if !duplicate {
            group.samples.push(SampleQuery {
                question: m.question,
                query: m.query,
                score: m.score,
            });
        }
    }

    let mut candidates: Vec<OutputCandidate> = groups.into_values().collect();
    candidates.sort_by_key(|c| c.order);
    candidates
}
