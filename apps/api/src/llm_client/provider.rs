//! LLM providers and the fallback chain between them.
//!
//! A [`ProviderSelector`] is plain session state: the ordered chain plus the
//! index of the provider currently in use. Switching is decided by the pure
//! [`next_state`] transition; nothing here is process-global.

use serde::{Deserialize, Serialize};

/// Wire protocol spoken by a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Anthropic Messages API.
    Anthropic,
    /// `/chat/completions` (OpenRouter, Groq, Ollama, OpenAI).
    OpenAiCompatible,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provider {
    pub name: String,
    pub kind: ProviderKind,
    /// Base URL without a trailing slash, e.g. `https://openrouter.ai/api/v1`.
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
}

impl Provider {
    pub fn openai_compatible(
        name: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind: ProviderKind::OpenAiCompatible,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key,
        }
    }
}

/// Coarse classification of a failed call, as far as provider switching cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    RateLimited,
    Transport,
    Format,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectorState {
    Active(usize),
    Exhausted,
}

/// Rate limits move to the next provider; every other error keeps the current one.
pub fn next_state(state: SelectorState, kind: ErrorKind, chain_len: usize) -> SelectorState {
    match (state, kind) {
        (SelectorState::Active(i), ErrorKind::RateLimited) if i + 1 < chain_len => {
            SelectorState::Active(i + 1)
        }
        (SelectorState::Active(_), ErrorKind::RateLimited) => SelectorState::Exhausted,
        (state, _) => state,
    }
}

#[derive(Debug, Clone)]
pub struct ProviderSelector {
    chain: Vec<Provider>,
    state: SelectorState,
}

impl ProviderSelector {
    pub fn new(chain: Vec<Provider>) -> Self {
        let state = if chain.is_empty() {
            SelectorState::Exhausted
        } else {
            SelectorState::Active(0)
        };
        Self { chain, state }
    }

    pub fn state(&self) -> SelectorState {
        self.state
    }

    pub fn current(&self) -> Option<&Provider> {
        match self.state {
            SelectorState::Active(i) => self.chain.get(i),
            SelectorState::Exhausted => None,
        }
    }

    pub fn chain(&self) -> &[Provider] {
        &self.chain
    }

    /// Applies [`next_state`] and reports whether the active provider changed.
    pub fn on_error(&mut self, kind: ErrorKind) -> bool {
        let next = next_state(self.state, kind, self.chain.len());
        let switched = next != self.state;
        self.state = next;
        switched
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> Vec<Provider> {
        vec![
            Provider::openai_compatible("openrouter", "https://openrouter.ai/api/v1/", "deepseek", None),
            Provider::openai_compatible("groq", "https://api.groq.com/openai/v1", "llama", None),
            Provider::openai_compatible("ollama", "http://localhost:11434/v1", "llama3.1", None),
        ]
    }

    #[test]
    fn test_rate_limit_advances_through_chain() {
        assert_eq!(
            next_state(SelectorState::Active(0), ErrorKind::RateLimited, 3),
            SelectorState::Active(1)
        );
        assert_eq!(
            next_state(SelectorState::Active(2), ErrorKind::RateLimited, 3),
            SelectorState::Exhausted
        );
    }

    #[test]
    fn test_other_errors_keep_provider() {
        for kind in [ErrorKind::Transport, ErrorKind::Format, ErrorKind::Other] {
            assert_eq!(
                next_state(SelectorState::Active(1), kind, 3),
                SelectorState::Active(1)
            );
        }
        assert_eq!(
            next_state(SelectorState::Exhausted, ErrorKind::RateLimited, 3),
            SelectorState::Exhausted
        );
    }

    #[test]
    fn test_selector_walks_chain() {
        let mut selector = ProviderSelector::new(chain());
        assert_eq!(selector.current().map(|p| p.name.as_str()), Some("openrouter"));
        assert!(!selector.on_error(ErrorKind::Format));
        assert!(selector.on_error(ErrorKind::RateLimited));
        assert_eq!(selector.current().map(|p| p.name.as_str()), Some("groq"));
        assert!(selector.on_error(ErrorKind::RateLimited));
        assert!(selector.on_error(ErrorKind::RateLimited));
        assert!(selector.current().is_none());
    }

    #[test]
    fn test_empty_chain_is_exhausted() {
        let selector = ProviderSelector::new(Vec::new());
        assert_eq!(selector.state(), SelectorState::Exhausted);
        assert!(selector.current().is_none());
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        assert_eq!(chain()[0].base_url, "https://openrouter.ai/api/v1");
    }
}
