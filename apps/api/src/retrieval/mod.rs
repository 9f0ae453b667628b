//! Hybrid retrieval: exact keyword containment first, vector similarity to fill.
//!
//! Exact matches always rank above semantic ones, and a record found by both
//! passes is reported once, as exact. An unavailable index degrades retrieval
//! to exact-only; it is never an error.

pub mod answer;
pub mod compose;
pub mod embedding;
pub mod handlers;
pub mod index;
pub mod keywords;
mod prompts;

use std::collections::HashSet;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::models::resume::ResumeRecord;
use crate::retrieval::compose::{compose, ComposeOptions};
use crate::retrieval::index::VectorIndex;
use crate::retrieval::keywords::extract_keywords;

/// The semantic pass asks the index for this many neighbors per wanted result.
const SEMANTIC_OVERFETCH: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    Exact,
    Semantic,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchMatch {
    pub id: String,
    pub content: String,
    pub match_type: MatchType,
    /// Non-empty for exact matches only.
    pub matched_keywords: Vec<String>,
    /// Exact: matched / total keywords. Semantic: `1 / (1 + distance)`.
    pub score: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

pub struct HybridRetriever<'a> {
    corpus: &'a [ResumeRecord],
    index: Option<&'a dyn VectorIndex>,
}

impl<'a> HybridRetriever<'a> {
    pub fn new(corpus: &'a [ResumeRecord], index: Option<&'a dyn VectorIndex>) -> Self {
        Self { corpus, index }
    }

    /// Up to `k` matches: exact group first, each group by descending score.
    pub async fn search(&self, query: &str, k: usize) -> Vec<SearchMatch> {
        if k == 0 {
            return Vec::new();
        }
        let keywords = extract_keywords(query);
        let mut results = self.exact_matches(&keywords, k);
        debug!(?keywords, exact = results.len(), k, "exact pass complete");

        if results.len() < k {
            self.fill_semantic(query, k, &mut results).await;
        }

        results.sort_by(|a, b| {
            (a.match_type != MatchType::Exact)
                .cmp(&(b.match_type != MatchType::Exact))
                .then(b.score.total_cmp(&a.score))
        });
        results
    }

    /// Exact pass. A keyword hits a record when it is contained in (or
    /// contains) one of its skills, or appears in its composed text.
    pub fn exact_matches(&self, keywords: &[String], k: usize) -> Vec<SearchMatch> {
        if keywords.is_empty() {
            return Vec::new();
        }

        let mut matches: Vec<SearchMatch> = self
            .corpus
            .iter()
            .filter_map(|record| {
                let content = compose(&record.sections, ComposeOptions::RETRIEVAL);
                let text = content.to_lowercase();
                let skills: Vec<String> = record
                    .sections
                    .skills_list()
                    .iter()
                    .map(|s| s.to_lowercase())
                    .collect();

                let matched: Vec<String> = keywords
                    .iter()
                    .filter(|kw| {
                        skills
                            .iter()
                            .any(|skill| skill.contains(kw.as_str()) || kw.contains(skill.as_str()))
                            || text.contains(kw.as_str())
                    })
                    .cloned()
                    .collect();

                if matched.is_empty() {
                    return None;
                }
                Some(SearchMatch {
                    id: record.id.clone(),
                    content,
                    match_type: MatchType::Exact,
                    score: matched.len() as f32 / keywords.len() as f32,
                    matched_keywords: matched,
                    metadata: None,
                })
            })
            .collect();

        matches.sort_by(|a, b| b.score.total_cmp(&a.score));
        matches.truncate(k);
        matches
    }

    async fn fill_semantic(&self, query: &str, k: usize, results: &mut Vec<SearchMatch>) {
        let Some(index) = self.index else {
            debug!("no vector index configured, semantic pass skipped");
            return;
        };

        let hits = match index.query(query, k * SEMANTIC_OVERFETCH).await {
            Ok(hits) => hits,
            Err(e) => {
                warn!(error = %e, "vector index unavailable, returning exact matches only");
                return;
            }
        };

        let mut seen: HashSet<String> = results.iter().map(|m| m.id.clone()).collect();
        for hit in hits {
            if results.len() >= k {
                break;
            }
            let Some(id) = hit.record_id() else {
                continue;
            };
            if !seen.insert(id.clone()) {
                continue;
            }
            results.push(SearchMatch {
                id,
                content: hit.text,
                match_type: MatchType::Semantic,
                matched_keywords: Vec::new(),
                score: 1.0 / (1.0 + hit.distance),
                metadata: Some(hit.metadata),
            });
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{FixedIndex, MissingIndex};
    use super::*;
    use crate::models::resume::{SectionContent, Sections, SegmenterKind};

    fn record(id: &str, skills: &[&str], summary: &str) -> ResumeRecord {
        ResumeRecord::new(
            id,
            format!("{id}.txt"),
            SegmenterKind::Llm,
            Sections {
                summary: Some(SectionContent::Text(summary.to_string())),
                skills: Some(SectionContent::Items(
                    skills.iter().map(|s| s.to_string()).collect(),
                )),
                ..Default::default()
            },
        )
    }

    fn corpus() -> Vec<ResumeRecord> {
        vec![
            record("alice", &["Python", "AWS"], "Cloud engineer."),
            record("bob", &["Java"], "Backend developer who loves python scripting."),
            record("carol", &["Figma"], "Product designer."),
        ]
    }

    #[tokio::test]
    async fn test_exact_scores_are_keyword_ratios() {
        let corpus = corpus();
        let retriever = HybridRetriever::new(&corpus, None);
        let results = retriever.search("python aws", 5).await;

        let ids: Vec<_> = results.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["alice", "bob"]);
        assert_eq!(results[0].score, 1.0);
        assert_eq!(results[0].matched_keywords, vec!["python", "aws"]);
        assert_eq!(results[1].score, 0.5);
        assert!(results.iter().all(|m| m.match_type == MatchType::Exact));
    }

    #[tokio::test]
    async fn test_skill_match_is_bidirectional() {
        let corpus = vec![record("dan", &["Machine Learning"], "")];
        let retriever = HybridRetriever::new(&corpus, None);
        // keyword inside skill
        assert_eq!(retriever.search("learning", 5).await.len(), 1);
        // skill inside keyword
        let corpus = vec![record("eve", &["SQL"], "")];
        let retriever = HybridRetriever::new(&corpus, None);
        assert_eq!(retriever.exact_matches(&["postgresql".to_string()], 5).len(), 1);
    }

    #[tokio::test]
    async fn test_exact_match_never_duplicated_as_semantic() {
        let corpus = corpus();
        let index = FixedIndex(vec![("alice", 0.0), ("carol", 1.0), ("ghost", 2.0), ("bob", 3.0)]);
        let retriever = HybridRetriever::new(&corpus, Some(&index));
        let results = retriever.search("aws", 3).await;

        let summary: Vec<_> = results.iter().map(|m| (m.id.as_str(), m.match_type)).collect();
        assert_eq!(
            summary,
            vec![
                ("alice", MatchType::Exact),
                ("carol", MatchType::Semantic),
                ("ghost", MatchType::Semantic)
            ]
        );
        assert_eq!(results[1].score, 0.5);
        assert!(results[1].matched_keywords.is_empty());
    }

    #[tokio::test]
    async fn test_exact_ranks_above_higher_scoring_semantic() {
        let corpus = corpus();
        let index = FixedIndex(vec![("carol", 0.0)]);
        let retriever = HybridRetriever::new(&corpus, Some(&index));
        let results = retriever.search("java python", 5).await;

        assert_eq!(results.len(), 3);
        assert_eq!(results[2].id, "carol");
        assert_eq!(results[2].score, 1.0);
        assert!(results[0].score <= 1.0 && results[0].match_type == MatchType::Exact);
    }

    #[tokio::test]
    async fn test_semantic_pass_skipped_when_k_filled() {
        let corpus = corpus();
        let index = FixedIndex(vec![("carol", 0.0)]);
        let retriever = HybridRetriever::new(&corpus, Some(&index));
        let results = retriever.search("python", 2).await;
        assert!(results.iter().all(|m| m.match_type == MatchType::Exact));
        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_query_goes_straight_to_index() {
        let corpus = corpus();
        let index = FixedIndex(vec![("bob", 1.0), ("carol", 3.0)]);
        let retriever = HybridRetriever::new(&corpus, Some(&index));
        let results = retriever.search("", 5).await;

        let ids: Vec<_> = results.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["bob", "carol"]);
        assert!(results.iter().all(|m| m.match_type == MatchType::Semantic));
    }

    #[tokio::test]
    async fn test_empty_query_without_index_is_empty() {
        let corpus = corpus();
        assert!(HybridRetriever::new(&corpus, None).search("", 5).await.is_empty());
        let missing = MissingIndex;
        assert!(HybridRetriever::new(&corpus, Some(&missing))
            .search("show me the candidates", 5)
            .await
            .is_empty());
    }

    #[tokio::test]
    async fn test_unavailable_index_degrades_to_exact() {
        let corpus = corpus();
        let missing = MissingIndex;
        let results = HybridRetriever::new(&corpus, Some(&missing)).search("figma", 5).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "carol");
    }

    #[tokio::test]
    async fn test_zero_k_is_empty() {
        let corpus = corpus();
        assert!(HybridRetriever::new(&corpus, None).search("python", 0).await.is_empty());
    }
}
