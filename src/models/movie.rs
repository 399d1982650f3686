//! Movie record and the helpers derived from it.

use std::path::Path;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AppError, Result};

/// A movie stored in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Movie {
    /// Primary key, minted at creation and never changed
    pub movie_id: String,

    /// Display title
    pub title: String,

    /// Release year
    pub release_year: u16,

    /// Free-text genre label
    pub genre: String,

    /// Public URL of the uploaded cover image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,

    /// Cached model-generated summary
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_summary: Option<String>,
}

impl Movie {
    /// Create a new movie without cover or summary.
    pub fn new(movie_id: impl Into<String>, fields: MovieFields) -> Self {
        Self {
            movie_id: movie_id.into(),
            title: fields.title,
            release_year: fields.release_year,
            genre: fields.genre,
            cover_url: None,
            generated_summary: None,
        }
    }

    /// Normalized form of this movie's title.
    pub fn title_key(&self) -> String {
        normalize_title(&self.title)
    }

    /// Object key of the stored cover, if any.
    pub fn cover_key(&self) -> Option<String> {
        self.cover_url.as_deref().and_then(cover_key_from_url)
    }
}

/// Validated user-editable fields of a movie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovieFields {
    pub title: String,
    pub release_year: u16,
    pub genre: String,
}

impl MovieFields {
    /// Build validated fields: text is trimmed and must not be empty, and the
    /// release year must be positive.
    pub fn new(title: &str, release_year: u16, genre: &str) -> Result<Self> {
        let (title, genre) = (title.trim(), genre.trim());
        if title.is_empty() || genre.is_empty() {
            return Err(AppError::validation(
                "'title' or 'releaseYear' or 'genre' field cannot be empty",
            ));
        }
        if release_year == 0 {
            return Err(AppError::validation(
                "releaseYear must be a positive integer",
            ));
        }

        Ok(Self {
            title: title.to_string(),
            release_year,
            genre: genre.to_string(),
        })
    }

    /// Re-check fields that were built without [`MovieFields::new`].
    pub fn validated(self) -> Result<Self> {
        Self::new(&self.title, self.release_year, &self.genre)
    }
}

/// Catalog entry loaded in bulk; ids are minted on load.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedMovie {
    pub title: String,
    pub release_year: u16,
    pub genre: String,

    /// Cover already hosted elsewhere
    #[serde(default)]
    pub cover_url: Option<String>,
}

/// Partial update applied to an existing record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovieUpdate {
    pub fields: MovieFields,

    /// New cover URL; `None` leaves the stored cover untouched
    pub cover_url: Option<String>,
}

/// Cover image supplied with a write request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverUpload {
    /// Original file name, used for the key's extension
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl CoverUpload {
    /// Object key of this upload for the given movie.
    pub fn key_for(&self, movie_id: &str) -> String {
        cover_key(movie_id, &self.file_name)
    }
}

/// Normalize a title for duplicate detection.
pub fn normalize_title(title: &str) -> String {
    title.trim().to_lowercase()
}

/// Build the object key for a cover: `<movie id><.ext>`.
///
/// The extension comes from the uploaded file name and is empty when the
/// file has none.
pub fn cover_key(movie_id: &str, file_name: &str) -> String {
    match Path::new(file_name).extension().and_then(|e| e.to_str()) {
        Some(ext) if !ext.is_empty() => format!("{movie_id}.{ext}"),
        _ => movie_id.to_string(),
    }
}

/// Recover the object key from a stored cover URL (its last path segment).
pub fn cover_key_from_url(cover_url: &str) -> Option<String> {
    let last = match Url::parse(cover_url) {
        Ok(url) => url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .map(str::to_string),
        Err(_) => cover_url.rsplit('/').next().map(str::to_string),
    };
    last.filter(|key| !key.is_empty())
}
