//! # SmartHire CLI (`smarthire`)
//!
//! Batch and interactive access to the same pipeline the HTTP server exposes.
//!
//! | Command | Description |
//! |---------|-------------|
//! | `smarthire extract` | Extract text from every raw PDF/TXT document |
//! | `smarthire process` | Segment extracted texts into structured records |
//! | `smarthire index` | Rebuild the vector index from the structured records |
//! | `smarthire search "<query>"` | Hybrid keyword + semantic search |
//! | `smarthire ask "<question>"` | Answer a question from the top matching resumes |
//! | `smarthire match --jd-file jd.txt` | Score the best candidates for a job description |

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use smarthire_api::config::Config;
use smarthire_api::corpus::ResumeStore;
use smarthire_api::ingest::pipeline::{extract_all, process_all, BatchReport, Segmentation};
use smarthire_api::llm_client::LlmClient;
use smarthire_api::matching::matcher::match_top_candidates;
use smarthire_api::matching::scorer::LlmResumeScorer;
use smarthire_api::retrieval::answer::answer_question;
use smarthire_api::retrieval::embedding::OpenAiEmbedder;
use smarthire_api::retrieval::index::{build_index, FileVectorIndex, DEFAULT_INDEX_LIMIT};
use smarthire_api::retrieval::{HybridRetriever, MatchType};
use smarthire_api::telemetry;

/// SmartHire: resume ingestion, search, and candidate matching.
///
/// Paths, LLM providers and the embedding endpoint come from the
/// environment (or a `.env` file), exactly like the API server.
#[derive(Parser)]
#[command(name = "smarthire", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract text from raw documents. Existing text files are kept.
    Extract,

    /// Segment extracted texts into structured records.
    Process {
        /// Use the LLM segmenter instead of the rule-based one.
        #[arg(long)]
        llm: bool,

        /// Re-segment documents that already have a record.
        #[arg(long)]
        reprocess: bool,
    },

    /// Rebuild the vector index.
    Index {
        /// Maximum number of records to index, in canonical order.
        #[arg(long, default_value_t = DEFAULT_INDEX_LIMIT)]
        limit: usize,
    },

    /// Hybrid search over the structured records.
    Search {
        query: String,

        #[arg(short, default_value_t = 5)]
        k: usize,
    },

    /// Answer a question using the top matching resumes as context.
    Ask {
        question: String,

        #[arg(short, default_value_t = 5)]
        n: usize,
    },

    /// Rank candidates against a job description.
    Match {
        /// Job description text.
        #[arg(long, conflicts_with = "jd_file", required_unless_present = "jd_file")]
        jd: Option<String>,

        /// File containing the job description.
        #[arg(long)]
        jd_file: Option<PathBuf>,

        #[arg(short, default_value_t = 10)]
        n: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;
    telemetry::init(&config.rust_log);

    let store = ResumeStore::new(config.structured_dir.clone());

    match cli.command {
        Commands::Extract => {
            let report = extract_all(&config.raw_dir, &config.text_dir).await?;
            print_report("Extracted", &report);
        }

        Commands::Process { llm, reprocess } => {
            let client = LlmClient::new(config.providers.clone())?;
            let session = client.session();
            let segmentation = if llm {
                if client.providers().is_empty() {
                    bail!("--llm requires at least one configured LLM provider");
                }
                Segmentation::llm(&session)
            } else {
                Segmentation::rule_based()
            };
            let report = process_all(&config.text_dir, &store, &segmentation, reprocess).await?;
            print_report("Processed", &report);
        }

        Commands::Index { limit } => {
            let index = vector_index(&config)?;
            let records = store.load_all()?;
            let count = build_index(&records, &index, limit).await?;
            println!("Indexed {count} resumes into {}", index.path().display());
        }

        Commands::Search { query, k } => {
            let index = vector_index(&config)?;
            let corpus = store.load_all()?;
            let retriever = HybridRetriever::new(&corpus, Some(&index));
            let results = retriever.search(&query, k).await;
            if results.is_empty() {
                println!("No matches.");
            }
            for (rank, m) in results.iter().enumerate() {
                let how = match m.match_type {
                    MatchType::Exact => format!("exact [{}]", m.matched_keywords.join(", ")),
                    MatchType::Semantic => "semantic".to_string(),
                };
                println!("{:>2}. {} ({how}, score {:.3})", rank + 1, m.id, m.score);
            }
        }

        Commands::Ask { question, n } => {
            let index = vector_index(&config)?;
            let client = LlmClient::new(config.providers.clone())?;
            let session = client.session();
            let corpus = store.load_all()?;
            let retriever = HybridRetriever::new(&corpus, Some(&index));
            let answer = answer_question(&retriever, &session, &question, n).await;
            println!("{}", answer.answer);
            if !answer.sources.is_empty() {
                let ids: Vec<&str> = answer.sources.iter().map(|s| s.id.as_str()).collect();
                println!("\nSources: {}", ids.join(", "));
            }
        }

        Commands::Match { jd, jd_file, n } => {
            let job_description = match (jd, jd_file) {
                (Some(text), _) => text,
                (None, Some(path)) => std::fs::read_to_string(&path)
                    .with_context(|| format!("reading job description {}", path.display()))?,
                (None, None) => bail!("either --jd or --jd-file is required"),
            };
            if job_description.trim().is_empty() {
                bail!("job description is empty");
            }

            let index = vector_index(&config)?;
            let client = LlmClient::new(config.providers.clone())?;
            let session = client.session();
            let scorer = LlmResumeScorer::new(&session);
            let corpus = store.load_all()?;
            let retriever = HybridRetriever::new(&corpus, Some(&index));

            let results = match_top_candidates(
                &corpus,
                Some(&retriever),
                &scorer,
                &job_description,
                n,
                config.match_pacing,
                |done, total| eprintln!("Scored {done}/{total}"),
            )
            .await?;

            if let Some(provider) = session.current_provider().await {
                info!(provider = %provider, "matching finished");
            }
            println!("{}", serde_json::to_string_pretty(&results)?);
        }
    }

    Ok(())
}

fn vector_index(config: &Config) -> Result<FileVectorIndex> {
    let embedder = OpenAiEmbedder::new(
        config.embedding_url.clone(),
        config.embedding_model.clone(),
        config.embedding_api_key.clone(),
    )
    .context("building embedding client")?;
    Ok(FileVectorIndex::new(
        config.index_path.clone(),
        Arc::new(embedder),
    ))
}

fn print_report(label: &str, report: &BatchReport) {
    println!(
        "{label} {}, skipped {}, failed {}",
        report.processed,
        report.skipped,
        report.failed.len()
    );
    for failure in &report.failed {
        println!("  {}: {}", failure.id, failure.error);
    }
}
