//! Free-text questions answered by the explanation service, grounded in
//! lookup results when the question names a gene.

use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::entities::alias::AliasTables;
use crate::entities::interaction::InteractionRow;
use crate::entities::lookup::{LookupRows, Resolution, Resolver};
use crate::entities::EntityType;
use crate::error::DgitError;
use crate::sources::gemini::Explainer;
use crate::sources::ncbi_gene::GeneSummary;

const CONTEXT_INTERACTIONS: usize = 5;
const IGNORED_TOKENS: &[&str] = &["MDD"];

fn symbol_token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b[A-Z0-9]{2,10}\b").expect("valid regex"))
}

/// Picks the gene a question is about, if any.
///
/// Alias keys win over the default gene list, which wins over any
/// letter+digit token that looks like a symbol (`TP53`, `HTR2A`).
pub(crate) fn extract_gene_from_question(question: &str, aliases: &AliasTables) -> Option<String> {
    let text = question.trim().to_uppercase();
    if text.is_empty() {
        return None;
    }

    if let Some(symbol) = aliases.table(EntityType::Gene).find_in(&text) {
        return Some(symbol.to_string());
    }
    if let Some(gene) = EntityType::Gene
        .defaults()
        .iter()
        .find(|gene| text.contains(&gene.to_uppercase()))
    {
        return Some(gene.to_uppercase());
    }

    symbol_token_re()
        .find_iter(&text)
        .map(|m| m.as_str())
        .filter(|token| !IGNORED_TOKENS.contains(token))
        .find(|token| {
            token.chars().any(|c| c.is_ascii_alphabetic()) && token.chars().any(|c| c.is_ascii_digit())
        })
        .map(str::to_string)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Answer {
    pub question: String,
    pub gene: Option<String>,
    pub answer: String,
}

fn focus_lists() -> serde_json::Value {
    json!({
        "genes": EntityType::Gene.defaults(),
        "proteins": EntityType::Protein.defaults(),
        "drugs": EntityType::Drug.defaults(),
    })
}

async fn gene_interactions(resolver: &Resolver, gene: &str) -> Option<Vec<InteractionRow>> {
    match resolver.resolve_entity(EntityType::Gene, gene).await {
        Ok(Resolution::Rows {
            rows: LookupRows::Interactions(rows),
            ..
        }) => Some(rows.into_iter().take(CONTEXT_INTERACTIONS).collect()),
        Ok(_) => None,
        Err(err) => {
            warn!(gene, error = %err, "interaction lookup failed; answering without it");
            None
        }
    }
}

/// Answers `question`, attaching interactions and the NCBI summary of the
/// gene it mentions.
pub(crate) async fn ask(
    resolver: &Resolver,
    summaries: &dyn GeneSummary,
    explainer: &dyn Explainer,
    question: &str,
) -> Result<Answer, DgitError> {
    let question = question.trim();
    if question.is_empty() {
        return Err(DgitError::InvalidArgument("Question is required".into()));
    }

    let gene = extract_gene_from_question(question, resolver.aliases());
    debug!(question, gene = ?gene, "ask");

    let (interactions, ncbi_summary) = match gene.as_deref() {
        Some(gene) => (
            gene_interactions(resolver, gene).await,
            summaries.gene_summary(gene).await,
        ),
        None => (None, None),
    };

    let context = json!({
        "gene": gene,
        "interactions": interactions,
        "ncbi_summary": ncbi_summary,
        "focus": focus_lists(),
    });
    let answer = explainer.explain(question, Some(&context)).await?;
    Ok(Answer {
        question: question.to_string(),
        gene,
        answer,
    })
}

/// Explains a free-text query with only the focus lists as context.
pub(crate) async fn explain_query(explainer: &dyn Explainer, query: &str) -> Result<Answer, DgitError> {
    let query = query.trim();
    if query.is_empty() {
        return Err(DgitError::InvalidArgument("No query provided".into()));
    }
    let context = json!({ "focus": focus_lists() });
    let answer = explainer.explain(query, Some(&context)).await?;
    Ok(Answer {
        question: query.to_string(),
        gene: None,
        answer,
    })
}
