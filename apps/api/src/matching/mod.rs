pub mod handlers;
pub mod matcher;
mod prompts;
pub mod scorer;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MatchError {
    #[error("No processed resumes available for matching")]
    EmptyCorpus,
}
