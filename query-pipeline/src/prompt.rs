//! Prompt templates for the generation and summarization oracles.
//!
//! Templates are `{system, user}` pairs with `{name}` placeholders. Rendering
//! is a single left-to-right pass: substituted values are never scanned again,
//! so Cypher map literals such as `{name: $name}` inside samples survive.

use crate::model::SampleQuery;

/// Reply meaning "none of the examples applies".
pub const NO_MATCH_SENTINEL: &str = "IDONOTKNOW";

/// A rendered prompt, ready for an oracle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

/// A `{system, user}` template with `{name}` placeholders.
#[derive(Debug, Clone, Copy)]
pub struct PromptTemplate {
    pub system: &'static str,
    pub user: &'static str,
}

impl PromptTemplate {
    /// Substitutes `vars` into both halves. Unknown placeholders stay as written.
    pub fn render(&self, vars: &[(&str, &str)]) -> Prompt {
        Prompt {
            system: render_text(self.system, vars),
            user: render_text(self.user, vars),
        }
    }
}

fn render_text(tpl: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(tpl.len());
    let mut rest = tpl;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let value = after.find('}').and_then(|close| {
            let name = &after[..close];
            vars.iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| (*v, close))
        });
        match value {
            Some((v, close)) => {
                out.push_str(v);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Formats samples as in-context examples, most similar first.
pub fn format_examples(samples: &[SampleQuery]) -> String {
    samples
        .iter()
        .map(|s| format!("Question: {}\nQuery: {}", s.question.trim(), s.query.trim()))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Reuse the logic of the closest example; vars: `examples`, `question`,
/// `result_limit`, `sentinel`.
pub const SAMPLE_SYNTHESIS: PromptTemplate = PromptTemplate {
    system: "You write Neo4j Cypher queries that answer user questions.\n\
\n\
1. Among the examples below, find the question most similar to the user's question.\n\
2. If no example is similar, reply with exactly {sentinel} and nothing else.\n\
3. Otherwise adapt that example's query to the user's question. The example query is \
already correct: change only parameters and literal values, keep its logic and its \
number of relationship hops.\n\
4. The query must not return more than {result_limit} rows.\n\
\n\
Rules:\n\
- Reply with the Cypher statement only, without explanations or apologies.\n\
- Never write queries that create, update, delete or drop data or metadata.\n\
- Use case-insensitive matching for string comparisons.\n\
\n\
Examples:\n\
{examples}",
    user: "{question}",
};

/// Narrow rewrite of the limiting clause; vars: `query`, `result_limit`.
pub const LIMIT_REWRITE: PromptTemplate = PromptTemplate {
    system: "Replace the LIMIT clause of the Cypher query given by the user with LIMIT \
{result_limit}. Change nothing else. Reply with the Cypher statement only.",
    user: "{query}",
};

/// Repair from the engine's error message; vars: `query`, `error`.
pub const SYNTAX_REPAIR: PromptTemplate = PromptTemplate {
    system: "You fix Neo4j Cypher queries.\n\
\n\
1. Read the query and the error message reported by the database.\n\
2. Write a corrected query that keeps the intent of the original.\n\
\n\
Rules:\n\
- Reply with the Cypher statement only, without explanations or apologies.\n\
- Never write queries that create, update, delete or drop data or metadata.",
    user: "Query: {query}\n\nError message: {error}",
};

/// Unguided generation from the structural schema; vars: `schema`,
/// `question`, `result_limit`, `sentinel`.
pub const SCHEMA_SYNTHESIS: PromptTemplate = PromptTemplate {
    system: "You write Neo4j Cypher queries that answer user questions.\n\
Use only the node labels, relationship types and properties listed in the schema.\n\
\n\
Rules:\n\
- Reply with the Cypher statement only, without explanations or apologies.\n\
- Never write queries that create, update, delete or drop data or metadata.\n\
- The query must not return more than {result_limit} rows.\n\
- If the schema cannot answer the question, reply with exactly {sentinel}.\n\
\n\
Schema:\n\
{schema}",
    user: "{question}",
};

/// Free-text answer from executed rows; vars: `question`, `query`, `data`.
pub const ANSWER_SUMMARY: PromptTemplate = PromptTemplate {
    system: "You answer questions from the data given to you.\n\
\n\
1. Read the question and the context rows.\n\
2. Answer the question using only what the context contains.\n\
\n\
Rules:\n\
- Reply with the answer only, without explanations or apologies.\n\
- If the context does not contain a likely answer, say that you are unable to answer.",
    user: "Question: {question}\nContext query: {query}\nContext:\n{data}",
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substituted_values_are_not_rescanned() {
        let tpl = PromptTemplate {
            system: "Examples:\n{examples}",
            user: "{question}",
        };
        let p = tpl.render(&[
            ("examples", "MATCH (p:Person {name: '{question}'}) RETURN p"),
            ("question", "Who?"),
        ]);
        assert_eq!(
            p.system,
            "Examples:\nMATCH (p:Person {name: '{question}'}) RETURN p"
        );
        assert_eq!(p.user, "Who?");
    }

    #[test]
    fn unknown_placeholders_and_stray_braces_stay() {
        let out = render_text("a {b} {x} } {", &[("x", "1")]);
        assert_eq!(out, "a {b} 1 } {");
    }

    #[test]
    fn sample_synthesis_carries_limit_and_sentinel() {
        let examples = format_examples(&[SampleQuery {
            question: "How many movies?".into(),
            query: "MATCH (m:Movie) RETURN count(m)".into(),
            score: 0.97,
        }]);
        let p = SAMPLE_SYNTHESIS.render(&[
            ("examples", examples.as_str()),
            ("question", "How many people?"),
            ("result_limit", "20"),
            ("sentinel", NO_MATCH_SENTINEL),
        ]);
        assert!(p.system.contains("more than 20 rows"));
        assert!(p.system.contains("exactly IDONOTKNOW"));
        assert!(p.system.ends_with("Question: How many movies?\nQuery: MATCH (m:Movie) RETURN count(m)"));
        assert_eq!(p.user, "How many people?");
    }
}
