/// LLM Client: the single point of entry for all chat-completion calls in SmartHire.
///
/// ARCHITECTURAL RULE: No other module may call a provider API directly.
/// Segmentation, scoring and question answering all go through [`Completion`].
///
/// A call walks the configured provider chain: rate limits switch to the next
/// provider, transient 5xx/network failures are retried on the same one.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, warn};

pub mod prompts;
pub mod provider;
pub mod retry;

use provider::{ErrorKind, Provider, ProviderKind, ProviderSelector};
use retry::{call_with_retry, retry_when, RetryPolicy};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
const TRANSPORT_ATTEMPTS: u32 = 3;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Rate limited by provider '{provider}'")]
    RateLimited { provider: String },

    #[error("LLM returned empty content")]
    EmptyContent,

    #[error("No LLM provider available")]
    NoProvider,
}

impl LlmError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LlmError::RateLimited { .. } => ErrorKind::RateLimited,
            LlmError::Http(_) => ErrorKind::Transport,
            LlmError::Api { status, .. } if *status >= 500 => ErrorKind::Transport,
            LlmError::Parse(_) | LlmError::EmptyContent => ErrorKind::Format,
            LlmError::Api { .. } | LlmError::NoProvider => ErrorKind::Other,
        }
    }

    fn is_transient(&self) -> bool {
        self.kind() == ErrorKind::Transport
    }
}

/// One chat-completion request: a system prompt plus a single user turn.
#[derive(Debug, Clone, Copy)]
pub struct CompletionRequest<'a> {
    pub system: &'a str,
    pub user: &'a str,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// The chat-completion collaborator. Returns the raw text of the reply.
#[async_trait]
pub trait Completion: Send + Sync {
    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<String, LlmError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Wire formats
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Transport
// ────────────────────────────────────────────────────────────────────────────

/// HTTP transport plus the configured provider chain. Cheap to clone.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    providers: Vec<Provider>,
    transport_retry: RetryPolicy,
}

impl LlmClient {
    pub fn new(providers: Vec<Provider>) -> Result<Self, LlmError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            providers,
            transport_retry: RetryPolicy::exponential(TRANSPORT_ATTEMPTS, Duration::from_secs(1)),
        })
    }

    pub fn providers(&self) -> &[Provider] {
        &self.providers
    }

    /// Starts a fresh fallback session at the head of the provider chain.
    pub fn session(&self) -> ProviderChain {
        ProviderChain {
            client: self.clone(),
            selector: Mutex::new(ProviderSelector::new(self.providers.clone())),
        }
    }

    /// Calls one provider, retrying 5xx and network failures with backoff.
    /// A 429 is returned as [`LlmError::RateLimited`] without retrying.
    pub async fn call(
        &self,
        provider: &Provider,
        request: &CompletionRequest<'_>,
    ) -> Result<String, LlmError> {
        retry_when(&self.transport_retry, LlmError::is_transient, |_| {
            self.send_once(provider, request)
        })
        .await
    }

    async fn send_once(
        &self,
        provider: &Provider,
        request: &CompletionRequest<'_>,
    ) -> Result<String, LlmError> {
        let builder = match provider.kind {
            ProviderKind::Anthropic => self
                .client
                .post(format!("{}/messages", provider.base_url))
                .header("x-api-key", provider.api_key.as_deref().unwrap_or_default())
                .header("anthropic-version", ANTHROPIC_VERSION)
                .json(&AnthropicRequest {
                    model: &provider.model,
                    max_tokens: request.max_tokens,
                    temperature: request.temperature,
                    system: request.system,
                    messages: vec![ChatMessage {
                        role: "user",
                        content: request.user,
                    }],
                }),
            ProviderKind::OpenAiCompatible => {
                let builder = self
                    .client
                    .post(format!("{}/chat/completions", provider.base_url))
                    .json(&ChatRequest {
                        model: &provider.model,
                        max_tokens: request.max_tokens,
                        temperature: request.temperature,
                        messages: vec![
                            ChatMessage {
                                role: "system",
                                content: request.system,
                            },
                            ChatMessage {
                                role: "user",
                                content: request.user,
                            },
                        ],
                    });
                match provider.api_key.as_deref() {
                    Some(key) => builder.bearer_auth(key),
                    None => builder,
                }
            }
        };

        let response = builder.send().await?;
        let status = response.status();

        if status.as_u16() == 429 {
            warn!(provider = %provider.name, "LLM provider rate limited the request");
            return Err(LlmError::RateLimited {
                provider: provider.name.clone(),
            });
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            warn!(provider = %provider.name, %status, "LLM API returned an error");
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let text = match provider.kind {
            ProviderKind::Anthropic => {
                let parsed: AnthropicResponse = response.json().await?;
                parsed
                    .content
                    .into_iter()
                    .find(|b| b.block_type == "text")
                    .and_then(|b| b.text)
            }
            ProviderKind::OpenAiCompatible => {
                let parsed: ChatResponse = response.json().await?;
                parsed
                    .choices
                    .into_iter()
                    .next()
                    .and_then(|c| c.message.content)
            }
        };

        let text = text
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or(LlmError::EmptyContent)?;

        debug!(
            provider = %provider.name,
            model = %provider.model,
            chars = text.len(),
            "LLM call succeeded"
        );
        Ok(text)
    }
}

/// A fallback session over the provider chain.
///
/// The selector is owned by the session, so a provider that rate-limited one
/// batch is skipped for the rest of that batch and nowhere else.
pub struct ProviderChain {
    client: LlmClient,
    selector: Mutex<ProviderSelector>,
}

impl ProviderChain {
    pub async fn current_provider(&self) -> Option<String> {
        self.selector.lock().await.current().map(|p| p.name.clone())
    }
}

#[async_trait]
impl Completion for ProviderChain {
    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<String, LlmError> {
        loop {
            let provider = self
                .selector
                .lock()
                .await
                .current()
                .cloned()
                .ok_or(LlmError::NoProvider)?;

            match self.client.call(&provider, request).await {
                Ok(text) => return Ok(text),
                Err(e) => {
                    let mut selector = self.selector.lock().await;
                    if selector.on_error(e.kind()) {
                        match selector.current() {
                            Some(next) => {
                                warn!(from = %provider.name, to = %next.name, "switching LLM provider");
                                continue;
                            }
                            None => return Err(e),
                        }
                    }
                    return Err(e);
                }
            }
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// JSON helpers
// ────────────────────────────────────────────────────────────────────────────

/// Deserializes a model reply as JSON, tolerating markdown code fences.
pub fn parse_json<T: DeserializeOwned>(text: &str) -> Result<T, LlmError> {
    serde_json::from_str(strip_json_fences(text)).map_err(LlmError::Parse)
}

/// Calls the collaborator and parses its reply, retrying the pair on any failure.
pub async fn complete_json<T: DeserializeOwned>(
    llm: &dyn Completion,
    request: &CompletionRequest<'_>,
    policy: &RetryPolicy,
) -> Result<T, LlmError> {
    call_with_retry(policy, |_| async {
        let text = llm.complete(request).await?;
        parse_json(&text)
    })
    .await
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted [`Completion`] fakes shared by the segmentation, scoring and
    //! question-answering tests.
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;

    /// Replies with queued responses in order; repeats the last one when drained.
    pub struct ScriptedCompletion {
        replies: StdMutex<VecDeque<Result<String, String>>>,
        last: StdMutex<Option<Result<String, String>>>,
        pub calls: StdMutex<Vec<(String, String)>>,
    }

    impl ScriptedCompletion {
        pub fn new(replies: Vec<Result<&str, &str>>) -> Self {
            Self {
                replies: StdMutex::new(
                    replies
                        .into_iter()
                        .map(|r| r.map(String::from).map_err(String::from))
                        .collect(),
                ),
                last: StdMutex::new(None),
                calls: StdMutex::new(Vec::new()),
            }
        }

        pub fn always(reply: &str) -> Self {
            Self::new(vec![Ok(reply)])
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Completion for ScriptedCompletion {
        async fn complete(&self, request: &CompletionRequest<'_>) -> Result<String, LlmError> {
            self.calls
                .lock()
                .unwrap()
                .push((request.system.to_string(), request.user.to_string()));
            let next = self.replies.lock().unwrap().pop_front();
            let reply = match next {
                Some(reply) => {
                    *self.last.lock().unwrap() = Some(reply.clone());
                    reply
                }
                None => self
                    .last
                    .lock()
                    .unwrap()
                    .clone()
                    .unwrap_or_else(|| Err("no scripted reply".to_string())),
            };
            reply.map_err(|message| LlmError::Api {
                status: 400,
                message,
            })
        }
    }
}
