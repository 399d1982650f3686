//! Local filesystem storage implementation.
//!
//! Keeps the whole table in one JSON file and covers as plain files, for
//! development and testing. Production deployments use the AWS backends.
//!
//! ## Storage Layout
//!
//! ```text
//! {root}/
//! ├── movies.json           # Table: every movie record
//! └── images/               # Covers: <movieId>.<ext>
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::{AppError, Result};
use crate::models::{Movie, MovieUpdate, normalize_title};
use crate::storage::{CoverStore, MovieStore};

const TABLE_FILE: &str = "movies.json";

/// Write bytes atomically (write to temp, then rename).
async fn write_bytes(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let tmp = path.with_extension("tmp");
    let mut file = tokio::fs::File::create(&tmp).await?;
    file.write_all(bytes).await?;
    file.flush().await?;
    drop(file);

    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

/// Read JSON data, returning None if the file doesn't exist.
async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(AppError::Io(e)),
    }
}

async fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(value)?;
    write_bytes(path, &bytes).await
}

/// Movie table backed by a single JSON file.
#[derive(Clone)]
pub struct LocalMovieStore {
    root_dir: PathBuf,
    // Serializes read-modify-write cycles on the table file
    lock: Arc<Mutex<()>>,
}

impl LocalMovieStore {
    /// Create a new store rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            lock: Arc::new(Mutex::new(())),
        }
    }

    fn table_path(&self) -> PathBuf {
        self.root_dir.join(TABLE_FILE)
    }

    async fn load(&self) -> Result<Vec<Movie>> {
        Ok(read_json(&self.table_path()).await?.unwrap_or_default())
    }

    async fn save(&self, movies: &[Movie]) -> Result<()> {
        write_json(&self.table_path(), movies).await
    }
}

#[async_trait]
impl MovieStore for LocalMovieStore {
    async fn list(&self) -> Result<Vec<Movie>> {
        let _guard = self.lock.lock().await;
        self.load().await
    }

    async fn list_by_year(&self, year: u16) -> Result<Vec<Movie>> {
        let _guard = self.lock.lock().await;
        Ok(self
            .load()
            .await?
            .into_iter()
            .filter(|m| m.release_year == year)
            .collect())
    }

    async fn get(&self, movie_id: &str) -> Result<Option<Movie>> {
        let _guard = self.lock.lock().await;
        Ok(self
            .load()
            .await?
            .into_iter()
            .find(|m| m.movie_id == movie_id))
    }

    async fn find_by_title(&self, title: &str) -> Result<Option<Movie>> {
        let _guard = self.lock.lock().await;
        let wanted = normalize_title(title);
        Ok(self
            .load()
            .await?
            .into_iter()
            .find(|m| m.title_key() == wanted))
    }

    async fn put(&self, movie: &Movie) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut movies = self.load().await?;

        match movies.iter_mut().find(|m| m.movie_id == movie.movie_id) {
            Some(existing) => *existing = movie.clone(),
            None => movies.push(movie.clone()),
        }

        self.save(&movies).await?;
        log::info!("Stored movie {} in {}", movie.movie_id, self.table_path().display());
        Ok(())
    }

    async fn put_many(&self, batch: &[Movie]) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut movies = self.load().await?;

        for movie in batch {
            match movies.iter_mut().find(|m| m.movie_id == movie.movie_id) {
                Some(existing) => *existing = movie.clone(),
                None => movies.push(movie.clone()),
            }
        }

        self.save(&movies).await?;
        log::info!("Stored {} movies in {}", batch.len(), self.table_path().display());
        Ok(())
    }

    async fn update_fields(&self, movie_id: &str, update: &MovieUpdate) -> Result<Movie> {
        let _guard = self.lock.lock().await;
        let mut movies = self.load().await?;

        let movie = movies
            .iter_mut()
            .find(|m| m.movie_id == movie_id)
            .ok_or_else(|| AppError::not_found("No movie found"))?;

        movie.title = update.fields.title.clone();
        movie.release_year = update.fields.release_year;
        movie.genre = update.fields.genre.clone();
        if let Some(url) = &update.cover_url {
            movie.cover_url = Some(url.clone());
        }
        let updated = movie.clone();

        self.save(&movies).await?;
        Ok(updated)
    }

    async fn save_summary(&self, movie_id: &str, summary: &str) -> Result<String> {
        let _guard = self.lock.lock().await;
        let mut movies = self.load().await?;

        let movie = movies
            .iter_mut()
            .find(|m| m.movie_id == movie_id)
            .ok_or_else(|| AppError::not_found("No movie found"))?;

        if let Some(existing) = movie.generated_summary.as_ref().filter(|s| !s.is_empty()) {
            return Ok(existing.clone());
        }
        movie.generated_summary = Some(summary.to_string());

        self.save(&movies).await?;
        Ok(summary.to_string())
    }

    async fn delete(&self, movie_id: &str) -> Result<Movie> {
        let _guard = self.lock.lock().await;
        let mut movies = self.load().await?;

        let position = movies
            .iter()
            .position(|m| m.movie_id == movie_id)
            .ok_or_else(|| AppError::not_found("No movie found"))?;
        let removed = movies.remove(position);

        self.save(&movies).await?;
        Ok(removed)
    }
}

/// Cover images stored as files under `{root}/{prefix}/`.
#[derive(Clone)]
pub struct LocalCoverStore {
    root_dir: PathBuf,
    prefix: String,
}

impl LocalCoverStore {
    /// Create a new cover store rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            root_dir: root_dir.into(),
            prefix: prefix.into(),
        }
    }

    fn path(&self, key: &str) -> PathBuf {
        self.root_dir.join(&self.prefix).join(key)
    }
}

#[async_trait]
impl CoverStore for LocalCoverStore {
    async fn put_cover(&self, key: &str, content_type: &str, bytes: Vec<u8>) -> Result<String> {
        let path = self.path(key);
        write_bytes(&path, &bytes).await?;

        let absolute = tokio::fs::canonicalize(&path).await?;
        log::info!(
            "Wrote cover {} ({}, {} bytes)",
            absolute.display(),
            content_type,
            bytes.len()
        );
        Ok(format!("file://{}", absolute.display()))
    }

    async fn delete_cover(&self, key: &str) -> Result<()> {
        tokio::fs::remove_file(self.path(key)).await?;
        log::info!("Deleted cover {}", key);
        Ok(())
    }
}
