use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::llm_client::provider::{Provider, ProviderKind};

const OPENROUTER_URL: &str = "https://openrouter.ai/api/v1";
const GROQ_URL: &str = "https://api.groq.com/openai/v1";
const ANTHROPIC_URL: &str = "https://api.anthropic.com/v1";
const OLLAMA_URL: &str = "http://localhost:11434/v1";

/// Application configuration loaded from environment variables.
/// Every key has a default; only malformed values fail startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub raw_dir: PathBuf,
    pub text_dir: PathBuf,
    pub structured_dir: PathBuf,
    pub index_path: PathBuf,
    pub uploads_dir: PathBuf,
    /// LLM providers in fallback order.
    pub providers: Vec<Provider>,
    pub embedding_url: String,
    pub embedding_model: String,
    pub embedding_api_key: Option<String>,
    pub match_pacing: Duration,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let data_dir = PathBuf::from(env_or("DATA_DIR", "data"));
        let dir = |key: &str, default: &str| {
            optional_env(key)
                .map(PathBuf::from)
                .unwrap_or_else(|| data_dir.join(default))
        };

        Ok(Config {
            raw_dir: dir("RAW_DIR", "raw"),
            text_dir: dir("TEXT_DIR", "text"),
            structured_dir: dir("STRUCTURED_DIR", "structured"),
            index_path: dir("INDEX_PATH", "index/resumes.json"),
            uploads_dir: dir("UPLOADS_DIR", "uploads"),
            providers: provider_chain(),
            embedding_url: env_or("EMBEDDING_URL", OLLAMA_URL)
                .trim_end_matches('/')
                .to_string(),
            embedding_model: env_or("EMBEDDING_MODEL", "all-minilm"),
            embedding_api_key: optional_env("EMBEDDING_API_KEY"),
            match_pacing: Duration::from_millis(
                env_or("MATCH_PACING_MS", "500")
                    .parse::<u64>()
                    .context("MATCH_PACING_MS must be a non-negative integer")?,
            ),
            port: env_or("PORT", "8080")
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: env_or("RUST_LOG", "info"),
        })
    }
}

/// OpenRouter, Groq and Anthropic join the chain when their key is set;
/// the local Ollama server is always last unless disabled.
fn provider_chain() -> Vec<Provider> {
    let mut chain = Vec::new();

    if let Some(key) = optional_env("OPENROUTER_API_KEY") {
        chain.push(Provider::openai_compatible(
            "openrouter",
            OPENROUTER_URL,
            env_or("OPENROUTER_MODEL", "deepseek/deepseek-chat"),
            Some(key),
        ));
    }
    if let Some(key) = optional_env("GROQ_API_KEY") {
        chain.push(Provider::openai_compatible(
            "groq",
            GROQ_URL,
            env_or("GROQ_MODEL", "llama-3.3-70b-versatile"),
            Some(key),
        ));
    }
    if let Some(key) = optional_env("ANTHROPIC_API_KEY") {
        chain.push(Provider {
            name: "anthropic".to_string(),
            kind: ProviderKind::Anthropic,
            base_url: ANTHROPIC_URL.to_string(),
            model: env_or("ANTHROPIC_MODEL", "claude-3-5-haiku-latest"),
            api_key: Some(key),
        });
    }
    if optional_env("OLLAMA_DISABLED").as_deref() != Some("1") {
        chain.push(Provider::openai_compatible(
            "ollama",
            env_or("OLLAMA_URL", OLLAMA_URL),
            env_or("OLLAMA_MODEL", "llama3.1"),
            None,
        ));
    }

    chain
}

fn env_or(key: &str, default: &str) -> String {
    optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Unset and blank variables are both treated as absent.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
