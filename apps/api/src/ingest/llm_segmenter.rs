//! LLM-assisted segmentation.
//!
//! The text is flattened with [`clean_for_llm`] and sent with a fixed schema
//! prompt. The reply must parse into [`Sections`]; malformed JSON is retried up
//! to the policy bound, then surfaces as [`IngestError::LlmProcessing`].

use std::time::Duration;

use tracing::debug;

use crate::ingest::normalize::clean_for_llm;
use crate::ingest::prompts::SEGMENT_SYSTEM;
use crate::ingest::IngestError;
use crate::llm_client::prompts::JSON_ONLY_RULES;
use crate::llm_client::retry::RetryPolicy;
use crate::llm_client::{complete_json, Completion, CompletionRequest};
use crate::models::resume::Sections;

const SEGMENT_MAX_TOKENS: u32 = 1500;

/// Two attempts, one second apart.
pub fn default_segment_retry() -> RetryPolicy {
    RetryPolicy::new(2, vec![Duration::from_secs(1)])
}

pub async fn segment_with_llm(
    llm: &dyn Completion,
    text: &str,
    policy: &RetryPolicy,
) -> Result<Sections, IngestError> {
    let cleaned = clean_for_llm(text);
    if cleaned.is_empty() {
        return Err(IngestError::EmptyText);
    }

    let system = format!("{SEGMENT_SYSTEM}\n\n{JSON_ONLY_RULES}");
    let request = CompletionRequest {
        system: &system,
        user: &cleaned,
        temperature: 0.0,
        max_tokens: SEGMENT_MAX_TOKENS,
    };

    let sections: Sections = complete_json(llm, &request, policy)
        .await
        .map_err(IngestError::LlmProcessing)?;
    let sections = sections.prune();
    debug!(present = ?sections.present(), "LLM segmentation complete");
    Ok(sections)
}
