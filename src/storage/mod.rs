//! Storage abstractions for movie records and cover images.
//!
//! Two adapters sit behind traits so the service never touches an SDK directly:
//! - [`MovieStore`]: the key-value table holding one item per movie
//! - [`CoverStore`]: the object store holding cover images
//!
//! ## Layout
//!
//! ```text
//! table  Movies            # keyed by movieId
//! bucket movies-api-data/
//! └── images/
//!     └── <movieId>.<ext>  # one cover per movie
//! ```

#[cfg(feature = "aws")]
pub mod dynamo;
pub mod local;
#[cfg(feature = "aws")]
pub mod s3;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Movie, MovieUpdate};

// Re-export for convenience
#[cfg(feature = "aws")]
pub use dynamo::DynamoMovieStore;
pub use local::{LocalCoverStore, LocalMovieStore};
#[cfg(feature = "aws")]
pub use s3::S3CoverStore;

/// Record store for movie items.
#[async_trait]
pub trait MovieStore: Send + Sync {
    /// All stored movies.
    async fn list(&self) -> Result<Vec<Movie>>;

    /// Movies whose release year equals `year`.
    async fn list_by_year(&self, year: u16) -> Result<Vec<Movie>>;

    /// Movie by id, `None` when absent.
    async fn get(&self, movie_id: &str) -> Result<Option<Movie>>;

    /// First movie whose normalized title matches the normalized `title`.
    async fn find_by_title(&self, title: &str) -> Result<Option<Movie>>;

    /// Insert or replace a movie.
    async fn put(&self, movie: &Movie) -> Result<()>;

    /// Insert or replace many movies at once.
    async fn put_many(&self, movies: &[Movie]) -> Result<()>;

    /// Update the editable fields of an existing movie and return it.
    ///
    /// Fails with `NotFound` when the movie does not exist.
    async fn update_fields(&self, movie_id: &str, update: &MovieUpdate) -> Result<Movie>;

    /// Store a summary unless one is already present.
    ///
    /// Returns the summary held by the record afterwards, which is the
    /// existing one when another writer got there first.
    async fn save_summary(&self, movie_id: &str, summary: &str) -> Result<String>;

    /// Delete a movie and return its last stored state.
    ///
    /// Fails with `NotFound` when the movie does not exist.
    async fn delete(&self, movie_id: &str) -> Result<Movie>;
}

/// Object store for cover images.
#[async_trait]
pub trait CoverStore: Send + Sync {
    /// Store a cover under `key` and return its public URL once readable.
    async fn put_cover(&self, key: &str, content_type: &str, bytes: Vec<u8>) -> Result<String>;

    /// Delete the cover stored under `key`.
    async fn delete_cover(&self, key: &str) -> Result<()>;
}
