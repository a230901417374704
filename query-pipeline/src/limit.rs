//! Result-size policy for synthesized queries.
//!
//! The last `LIMIT` clause of a statement decides how many rows it returns.
//! A missing clause is appended; a literal bound within the policy is left
//! alone; anything else goes through a narrow oracle rewrite, with a
//! deterministic rewrite as backstop.

use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, warn};

use crate::error::PipelineError;
use crate::ports::TextOracle;
use crate::prompt::LIMIT_REWRITE;
use crate::statement::{accept_statement, mask_literals, trim_terminators};

lazy_static! {
    static ref LIMIT_CLAUSE: Regex =
        Regex::new(r"(?i)(?:^|[^.\w])LIMIT\s+(\$\w+|\d+|[A-Za-z_][\w.]*\s*\([^()]*\)|[^\s;]+)")
            .unwrap();
}

/// Bound of the last limiting clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LimitBound {
    Missing,
    Literal(u64),
    /// Parameter or expression; cannot be verified statically.
    Opaque(String),
}

/// Finds the bound of the last `LIMIT` outside literals and line or block comments.
pub fn last_limit(query: &str) -> LimitBound {
    match last_bound_span(query) {
        None => LimitBound::Missing,
        Some((start, end)) => {
            let raw = &query[start..end];
            raw.parse::<u64>()
                .map(LimitBound::Literal)
                .unwrap_or_else(|_| LimitBound::Opaque(raw.to_string()))
        }
    }
}

fn last_bound_span(query: &str) -> Option<(usize, usize)> {
    let masked = mask_literals(query);
    LIMIT_CLAUSE
        .captures_iter(&masked)
        .filter_map(|c| c.get(1))
        .last()
        .map(|m| (m.start(), m.end()))
}

/// Replaces the bound of the last `LIMIT` with `limit`, or appends a clause.
pub fn rewrite_last_limit(query: &str, limit: u64) -> String {
    let query = trim_terminators(query);
    match last_bound_span(query) {
        Some((start, end)) => format!("{}{}{}", &query[..start], limit, &query[end..]),
        None => format!("{query}\nLIMIT {limit}"),
    }
}

/// Bounds `query` to at most `result_limit` rows.
///
/// Never touches a literal bound that already fits, so applying it twice
/// yields the same statement.
///
/// # Errors
/// Oracle failures during an escalated rewrite.
pub async fn enforce_limit(
    oracle: &dyn TextOracle,
    query: &str,
    result_limit: u64,
) -> Result<String, PipelineError> {
    let query = trim_terminators(query);
    match last_limit(query) {
        LimitBound::Missing => {
            debug!(result_limit, "limit: appending clause");
            Ok(format!("{query}\nLIMIT {result_limit}"))
        }
        LimitBound::Literal(n) if n <= result_limit => Ok(query.to_string()),
        bound => {
            let limit = result_limit.to_string();
            let prompt = LIMIT_REWRITE.render(&[("query", query), ("result_limit", limit.as_str())]);
            let reply = oracle.complete(&prompt).await?;

            if let Some(rewritten) = accept_statement(&reply) {
                if let LimitBound::Literal(n) = last_limit(&rewritten) {
                    if n <= result_limit {
                        debug!(old = ?bound, new = n, "limit: rewritten by oracle");
                        return Ok(rewritten);
                    }
                }
            }

            warn!(old = ?bound, new = result_limit, "limit: oracle rewrite unusable, rewriting bound in place");
            Ok(rewrite_last_limit(query, result_limit))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::ScriptedOracle;

    #[test]
    fn last_clause_wins() {
        let q = "MATCH (m:Movie) WITH m LIMIT 100 RETURN m.title LIMIT 10";
        assert_eq!(last_limit(q), LimitBound::Literal(10));
        assert_eq!(last_limit("MATCH (n) RETURN n"), LimitBound::Missing);
        assert_eq!(
            last_limit("MATCH (n) RETURN n LIMIT $n"),
            LimitBound::Opaque("$n".into())
        );
    }

    #[test]
    fn limit_inside_literals_or_properties_is_ignored() {
        assert_eq!(
            last_limit("MATCH (n) WHERE n.note = 'LIMIT 500' RETURN n.limit AS l"),
            LimitBound::Missing
        );
    }

    #[test]
    fn rewrite_replaces_only_last_bound() {
        assert_eq!(
            rewrite_last_limit("MATCH (n) WITH n LIMIT 5 RETURN n LIMIT 500;", 20),
            "MATCH (n) WITH n LIMIT 5 RETURN n LIMIT 20"
        );
        assert_eq!(
            rewrite_last_limit("MATCH (n) RETURN n LIMIT toInteger($x)", 20),
            "MATCH (n) RETURN n LIMIT 20"
        );
    }

    #[tokio::test]
    async fn appends_clause_when_missing() {
        let oracle = ScriptedOracle::new();
        let q = enforce_limit(&oracle, "MATCH (n) RETURN n;", 20).await.unwrap();
        assert_eq!(q, "MATCH (n) RETURN n\nLIMIT 20");
        assert_eq!(oracle.calls(), 0);
    }

    #[tokio::test]
    async fn limit_in_block_comment_is_not_a_bound() {
        let oracle = ScriptedOracle::new();
        let q = enforce_limit(&oracle, "MATCH (n) RETURN n /* LIMIT 500 */", 20).await.unwrap();
        assert_eq!(q, "MATCH (n) RETURN n /* LIMIT 500 */\nLIMIT 20");
        assert_eq!(last_limit(&q), LimitBound::Literal(20));

        let kept = enforce_limit(&oracle, "MATCH (n) RETURN n LIMIT 5 /* LIMIT 500 */", 20).await.unwrap();
        assert_eq!(kept, "MATCH (n) RETURN n LIMIT 5 /* LIMIT 500 */");
        assert_eq!(oracle.calls(), 0);
    }

    #[tokio::test]
    async fn idempotent_for_bounds_within_policy() {
        let oracle = ScriptedOracle::new();
        for q in [
            "MATCH (n) RETURN n LIMIT 5",
            "MATCH (n) RETURN n LIMIT 20",
            "MATCH (n) RETURN n",
        ] {
            let once = enforce_limit(&oracle, q, 20).await.unwrap();
            let twice = enforce_limit(&oracle, &once, 20).await.unwrap();
            assert_eq!(once, twice);
        }
        assert_eq!(
            enforce_limit(&oracle, "MATCH (n) RETURN n LIMIT 5", 20).await.unwrap(),
            "MATCH (n) RETURN n LIMIT 5"
        );
        assert_eq!(oracle.calls(), 0);
    }

    #[tokio::test]
    async fn oversized_bound_adopts_oracle_rewrite() {
        let oracle = ScriptedOracle::new().on("Replace the LIMIT", "```cypher\nMATCH (n) RETURN n LIMIT 20\n```");
        let q = enforce_limit(&oracle, "MATCH (n) RETURN n LIMIT 1000", 20).await.unwrap();
        assert_eq!(q, "MATCH (n) RETURN n LIMIT 20");
        assert_eq!(oracle.calls(), 1);
        assert!(oracle.prompts()[0].system.contains("LIMIT 20"));
    }

    #[tokio::test]
    async fn bad_oracle_rewrite_falls_back_to_in_place() {
        for reply in ["MATCH (n) RETURN n LIMIT 50", "Sure! Here it is.", "MATCH (n) DELETE n"] {
            let oracle = ScriptedOracle::new().on("Replace the LIMIT", reply);
            let q = enforce_limit(&oracle, "MATCH (n) RETURN n LIMIT 1000", 20).await.unwrap();
            assert_eq!(q, "MATCH (n) RETURN n LIMIT 20");
        }
    }

    #[tokio::test]
    async fn post_condition_holds_for_parameter_bounds() {
        let oracle = ScriptedOracle::new();
        let q = enforce_limit(&oracle, "MATCH (n) RETURN n LIMIT $count", 20).await.unwrap();
        match last_limit(&q) {
            LimitBound::Literal(n) => assert!(n <= 20),
            other => panic!("unexpected bound {other:?}"),
        }
    }
}
