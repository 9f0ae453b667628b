//! Retrieval-augmented question answering over the corpus.

use serde::Serialize;
use tracing::{info, warn};

use crate::llm_client::prompts::render;
use crate::llm_client::{Completion, CompletionRequest};
use crate::retrieval::prompts::{ANSWER_PROMPT_TEMPLATE, ANSWER_SYSTEM};
use crate::retrieval::{HybridRetriever, MatchType, SearchMatch};

pub const NO_MATCHES_ANSWER: &str = "No matching resumes found. Try different search terms.";

#[derive(Debug, Clone, Serialize)]
pub struct AnswerSource {
    pub id: String,
    pub score: f32,
    pub match_type: MatchType,
    pub matched_keywords: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub answer: String,
    pub sources: Vec<AnswerSource>,
    pub num_results: usize,
}

/// Builds the context block handed to the model, one section per match.
pub fn build_context(matches: &[SearchMatch]) -> String {
    matches
        .iter()
        .enumerate()
        .map(|(i, m)| {
            let tag = match m.match_type {
                MatchType::Exact => format!("[MATCHED: {}]", m.matched_keywords.join(", ")),
                MatchType::Semantic => "[SEMANTIC MATCH]".to_string(),
            };
            format!("--- Resume {} (ID: {}) {tag} ---\n{}", i + 1, m.id, m.content)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Answers `question` from the top `n` retrieved resumes.
///
/// A model failure is reported inside the answer text, never as an error.
pub async fn answer_question(
    retriever: &HybridRetriever<'_>,
    llm: &dyn Completion,
    question: &str,
    n: usize,
) -> Answer {
    let matches = retriever.search(question, n).await;
    if matches.is_empty() {
        return Answer {
            answer: NO_MATCHES_ANSWER.to_string(),
            sources: Vec::new(),
            num_results: 0,
        };
    }

    let context = build_context(&matches);
    let user = render(
        ANSWER_PROMPT_TEMPLATE,
        &[("question", question), ("context", context.as_str())],
    );
    let request = CompletionRequest {
        system: ANSWER_SYSTEM,
        user: &user,
        temperature: 0.3,
        max_tokens: 1000,
    };

    let answer = match llm.complete(&request).await {
        Ok(text) => text,
        Err(e) => {
            warn!(error = %e, "question answering failed");
            format!("Error getting AI response: {e}")
        }
    };
    info!(results = matches.len(), "question answered");

    Answer {
        answer,
        num_results: matches.len(),
        sources: matches
            .into_iter()
            .map(|m| AnswerSource {
                id: m.id,
                score: m.score,
                match_type: m.match_type,
                matched_keywords: m.matched_keywords,
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::testing::ScriptedCompletion;
    use crate::models::resume::{ResumeRecord, SectionContent, Sections, SegmenterKind};
    use crate::retrieval::testing::FixedIndex;

    fn corpus() -> Vec<ResumeRecord> {
        vec![ResumeRecord::new(
            "alice",
            "alice.txt",
            SegmenterKind::Llm,
            Sections {
                skills: Some(SectionContent::Items(vec!["Rust".into()])),
                ..Default::default()
            },
        )]
    }

    #[test]
    fn test_context_tags_match_type() {
        let matches = vec![
            SearchMatch {
                id: "a".into(),
                content: "SKILLS: Rust".into(),
                match_type: MatchType::Exact,
                matched_keywords: vec!["rust".into(), "go".into()],
                score: 1.0,
                metadata: None,
            },
            SearchMatch {
                id: "b".into(),
                content: "SKILLS: Go".into(),
                match_type: MatchType::Semantic,
                matched_keywords: Vec::new(),
                score: 0.5,
                metadata: None,
            },
        ];
        assert_eq!(
            build_context(&matches),
            "--- Resume 1 (ID: a) [MATCHED: rust, go] ---\nSKILLS: Rust\n\n\
             --- Resume 2 (ID: b) [SEMANTIC MATCH] ---\nSKILLS: Go"
        );
    }

    #[tokio::test]
    async fn test_answer_with_sources() {
        let corpus = corpus();
        let index = FixedIndex(vec![("bob", 0.0)]);
        let retriever = HybridRetriever::new(&corpus, Some(&index));
        let llm = ScriptedCompletion::always("alice knows Rust.");

        let answer = answer_question(&retriever, &llm, "who knows rust?", 5).await;
        assert_eq!(answer.answer, "alice knows Rust.");
        assert_eq!(answer.num_results, 2);
        assert_eq!(answer.sources[0].id, "alice");
        assert_eq!(answer.sources[0].matched_keywords, vec!["rust"]);
        assert_eq!(answer.sources[1].match_type, MatchType::Semantic);

        let calls = llm.calls.lock().unwrap();
        assert!(calls[0].1.contains("QUESTION: who knows rust?"));
        assert!(calls[0].1.contains("(ID: alice) [MATCHED: rust]"));
    }

    #[tokio::test]
    async fn test_no_matches_skips_llm() {
        let corpus = corpus();
        let retriever = HybridRetriever::new(&corpus, None);
        let llm = ScriptedCompletion::always("unused");
        let answer = answer_question(&retriever, &llm, "cobol", 5).await;
        assert_eq!(answer.answer, NO_MATCHES_ANSWER);
        assert!(answer.sources.is_empty());
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_llm_failure_becomes_answer_text() {
        let corpus = corpus();
        let retriever = HybridRetriever::new(&corpus, None);
        let llm = ScriptedCompletion::new(vec![Err("provider down")]);
        let answer = answer_question(&retriever, &llm, "rust", 5).await;
        assert!(answer.answer.starts_with("Error getting AI response:"));
        assert_eq!(answer.num_results, 1);
    }
}
