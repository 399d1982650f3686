//! Summary generation for movies.
//!
//! A summary is produced by one synchronous call to a hosted language model.
//! The prompt is built from the movie's metadata; the model is instructed by a
//! fixed system prompt and capped to a fixed output length.

#[cfg(feature = "aws")]
pub mod bedrock;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::Movie;

#[cfg(feature = "aws")]
pub use bedrock::BedrockSummaryGenerator;

/// System instruction sent with every summary request.
pub const SYSTEM_PROMPT: &str = "You are a helpful AI assistant that specializes in movie summaries in 100 words. Just return the summary.";

/// Generates a natural-language summary for a movie.
#[async_trait]
pub trait SummaryGenerator: Send + Sync {
    async fn generate(&self, movie: &Movie) -> Result<String>;
}

/// Format the user prompt for a movie.
pub fn build_prompt(movie: &Movie) -> String {
    format!(
        "Summarize the movie \"{}\" released in {}. Genre: {}.",
        movie.title.trim(),
        movie.release_year,
        movie.genre.trim()
    )
}
