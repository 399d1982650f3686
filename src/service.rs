// src/service.rs

//! Movie catalog operations.
//!
//! `MovieService` composes the record store, the cover store and the summary
//! generator. It owns the application rules (title uniqueness, cover keys,
//! best-effort cover cleanup, write-through summaries) and knows nothing about
//! HTTP.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{
    AppConfig, CoverUpload, Movie, MovieFields, MovieUpdate, SeedMovie, normalize_title,
};
use crate::storage::{CoverStore, LocalCoverStore, LocalMovieStore, MovieStore};
use crate::summary::SummaryGenerator;

/// Service implementing every catalog operation.
#[derive(Clone)]
pub struct MovieService {
    store: Arc<dyn MovieStore>,
    covers: Arc<dyn CoverStore>,
    summaries: Arc<dyn SummaryGenerator>,
}

impl MovieService {
    /// Create a service from explicitly constructed backends.
    pub fn new(
        store: Arc<dyn MovieStore>,
        covers: Arc<dyn CoverStore>,
        summaries: Arc<dyn SummaryGenerator>,
    ) -> Self {
        Self {
            store,
            covers,
            summaries,
        }
    }

    /// Create a service over the local filesystem backends rooted at `root_dir`.
    pub fn local(
        root_dir: impl Into<PathBuf>,
        config: &AppConfig,
        summaries: Arc<dyn SummaryGenerator>,
    ) -> Self {
        let root_dir = root_dir.into();
        Self::new(
            Arc::new(LocalMovieStore::new(&root_dir)),
            Arc::new(LocalCoverStore::new(&root_dir, &config.covers.prefix)),
            summaries,
        )
    }

    /// Create a service over DynamoDB, S3 and Bedrock.
    #[cfg(feature = "aws")]
    pub async fn from_aws(config: &AppConfig) -> Self {
        use crate::storage::{DynamoMovieStore, S3CoverStore};
        use crate::summary::BedrockSummaryGenerator;

        let sdk_config = crate::config::aws_sdk_config(&config.aws).await;
        log::info!(
            "AWS clients ready: table={}, bucket={}, model={}",
            config.table.name,
            config.covers.bucket,
            config.summary.model_id
        );

        Self::new(
            Arc::new(DynamoMovieStore::new(
                aws_sdk_dynamodb::Client::new(&sdk_config),
                &config.table,
            )),
            Arc::new(S3CoverStore::new(
                aws_sdk_s3::Client::new(&sdk_config),
                &config.covers,
                &config.aws.region,
            )),
            Arc::new(BedrockSummaryGenerator::new(
                aws_sdk_bedrockruntime::Client::new(&sdk_config),
                &config.summary,
            )),
        )
    }

    /// List every movie.
    pub async fn list_movies(&self) -> Result<Vec<Movie>> {
        let movies = self.store.list().await?;
        if movies.is_empty() {
            return Err(AppError::not_found("No movies found"));
        }
        Ok(movies)
    }

    /// List movies released in `year`.
    pub async fn movies_by_year(&self, year: u16) -> Result<Vec<Movie>> {
        let movies = self.store.list_by_year(year).await?;
        if movies.is_empty() {
            return Err(AppError::not_found("No movies found"));
        }
        Ok(movies)
    }

    /// Fetch one movie.
    pub async fn get_movie(&self, movie_id: &str) -> Result<Movie> {
        self.store
            .get(movie_id)
            .await?
            .ok_or_else(|| AppError::not_found("No movie found"))
    }

    /// Create a movie, uploading its cover first when one is supplied.
    pub async fn add_movie(&self, fields: MovieFields, cover: Option<CoverUpload>) -> Result<Movie> {
        let fields = fields.validated()?;
        self.ensure_title_free(&fields.title, None).await?;

        let movie_id = Uuid::now_v7().to_string();
        let mut movie = Movie::new(&movie_id, fields);

        let cover_key = match cover {
            Some(upload) => {
                let key = upload.key_for(&movie_id);
                log::info!("Uploading cover {} ({})", key, upload.file_name);
                let url = self
                    .covers
                    .put_cover(&key, &upload.content_type, upload.bytes)
                    .await?;
                movie.cover_url = Some(url);
                Some(key)
            }
            None => None,
        };

        if let Err(e) = self.store.put(&movie).await {
            if let Some(key) = cover_key {
                self.discard_cover(&key).await;
            }
            return Err(e);
        }

        log::info!("Added movie {} ({})", movie.movie_id, movie.title);
        Ok(movie)
    }

    /// Replace the editable fields of a movie, and its cover when supplied.
    pub async fn update_movie(
        &self,
        movie_id: &str,
        fields: MovieFields,
        cover: Option<CoverUpload>,
    ) -> Result<Movie> {
        let fields = fields.validated()?;
        let existing = self.get_movie(movie_id).await?;

        if existing.title_key() != normalize_title(&fields.title) {
            self.ensure_title_free(&fields.title, Some(movie_id)).await?;
        }

        let old_key = existing.cover_key();
        let mut new_key = None;
        let mut cover_url = None;
        if let Some(upload) = cover {
            let key = upload.key_for(&existing.movie_id);
            log::info!("Replacing cover of {} with {}", movie_id, key);
            cover_url = Some(
                self.covers
                    .put_cover(&key, &upload.content_type, upload.bytes)
                    .await?,
            );
            new_key = Some(key);
        }

        let update = MovieUpdate { fields, cover_url };
        let updated = match self.store.update_fields(movie_id, &update).await {
            Ok(updated) => updated,
            Err(e) => {
                // Same key means the old cover was already overwritten
                let orphan = new_key.as_deref().filter(|new| old_key.as_deref() != Some(*new));
                if let Some(key) = orphan {
                    self.discard_cover(key).await;
                }
                return Err(e);
            }
        };

        // A cover with a different extension lands under a new key
        if let (Some(old), Some(new)) = (old_key, new_key) {
            if old != new {
                self.discard_cover(&old).await;
            }
        }

        log::info!("Updated movie {}", movie_id);
        Ok(updated)
    }

    /// Delete a movie and, best-effort, its cover.
    pub async fn delete_movie(&self, movie_id: &str) -> Result<Movie> {
        let removed = self.store.delete(movie_id).await?;

        if let Some(key) = removed.cover_key() {
            self.discard_cover(&key).await;
        }

        log::info!("Deleted movie {}", movie_id);
        Ok(removed)
    }

    /// Return the stored summary, generating and persisting it on first use.
    pub async fn movie_summary(&self, movie_id: &str) -> Result<String> {
        let movie = self.get_movie(movie_id).await?;

        if let Some(summary) = movie.generated_summary.as_deref().filter(|s| !s.is_empty()) {
            return Ok(summary.to_string());
        }

        log::info!("No summary stored for {}; generating", movie_id);
        let generated = self.summaries.generate(&movie).await?;
        self.store.save_summary(movie_id, &generated).await
    }

    /// Load a batch of movies, minting an id for each.
    ///
    /// Entries whose normalized title is already stored, or appears earlier in
    /// the batch, are skipped. Returns the movies written.
    pub async fn seed_movies(&self, entries: Vec<SeedMovie>) -> Result<Vec<Movie>> {
        let mut taken: HashSet<String> = self
            .store
            .list()
            .await?
            .iter()
            .map(Movie::title_key)
            .collect();

        let mut movies = Vec::with_capacity(entries.len());
        for entry in entries {
            let fields = MovieFields::new(&entry.title, entry.release_year, &entry.genre)?;
            if !taken.insert(normalize_title(&fields.title)) {
                log::warn!("Skipping '{}': title already present", fields.title);
                continue;
            }

            let mut movie = Movie::new(Uuid::now_v7().to_string(), fields);
            movie.cover_url = entry.cover_url.filter(|url| !url.trim().is_empty());
            movies.push(movie);
        }

        if !movies.is_empty() {
            self.store.put_many(&movies).await?;
        }
        log::info!("Seeded {} movies", movies.len());
        Ok(movies)
    }

    /// Reject `title` when another movie already uses its normalized form.
    async fn ensure_title_free(&self, title: &str, own_id: Option<&str>) -> Result<()> {
        match self.store.find_by_title(title).await? {
            Some(other) if Some(other.movie_id.as_str()) != own_id => {
                log::info!("Title '{}' already used by {}", title, other.movie_id);
                Err(AppError::Duplicate)
            }
            _ => Ok(()),
        }
    }

    /// Delete a cover, logging instead of failing.
    async fn discard_cover(&self, key: &str) {
        if let Err(e) = self.covers.delete_cover(key).await {
            log::warn!("Error while deleting cover {}: {}", key, e);
        }
    }
}


#[cfg(test)]
mod tests {
    use super::fakes::{CountingSummaries, FailingWrites, RecordingCovers};
    use super::*;
    use tempfile::TempDir;

    struct Harness {
        _tmp: TempDir,
        service: MovieService,
        covers: Arc<RecordingCovers>,
        summaries: Arc<CountingSummaries>,
    }

    fn harness_with(covers: RecordingCovers) -> Harness {
        let tmp = TempDir::new().unwrap();
        let covers = Arc::new(covers);
        let summaries = Arc::new(CountingSummaries::default());
        let service = MovieService::new(
            Arc::new(LocalMovieStore::new(tmp.path())),
            covers.clone(),
            summaries.clone(),
        );
        Harness {
            _tmp: tmp,
            service,
            covers,
            summaries,
        }
    }

    /// Service whose record writes fail, over a store pre-filled with `existing`.
    async fn failing_service(
        tmp: &TempDir,
        existing: &[Movie],
        covers: Arc<RecordingCovers>,
    ) -> MovieService {
        let inner = LocalMovieStore::new(tmp.path());
        inner.put_many(existing).await.unwrap();
        MovieService::new(
            Arc::new(FailingWrites { inner }),
            covers,
            Arc::new(CountingSummaries::default()),
        )
    }

    fn harness() -> Harness {
        harness_with(RecordingCovers::default())
    }

    fn fields(title: &str, year: u16) -> MovieFields {
        MovieFields {
            title: title.to_string(),
            release_year: year,
            genre: "Drama".to_string(),
        }
    }

    fn jpeg(name: &str) -> CoverUpload {
        CoverUpload {
            file_name: name.to_string(),
            content_type: "image/jpeg".to_string(),
            bytes: vec![0xFF, 0xD8, 0xFF],
        }
    }

    #[tokio::test]
    async fn test_add_then_get_by_minted_id() {
        let h = harness();

        let added = h.service.add_movie(fields("Heat", 1995), None).await.unwrap();
        assert!(Uuid::parse_str(&added.movie_id).is_ok());

        let fetched = h.service.get_movie(&added.movie_id).await.unwrap();
        assert_eq!(fetched, added);
        assert_eq!(h.service.list_movies().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_add_rejects_normalized_duplicate() {
        let h = harness();
        h.service.add_movie(fields("Heat", 1995), None).await.unwrap();

        let err = h
            .service
            .add_movie(fields("  hEAT ", 2020), Some(jpeg("heat.jpg")))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Duplicate));
        assert_eq!(h.service.list_movies().await.unwrap().len(), 1);
        assert!(h.covers.puts().is_empty());
    }

    #[tokio::test]
    async fn test_add_with_cover_uses_id_and_extension() {
        let h = harness();

        let added = h
            .service
            .add_movie(fields("Alien", 1979), Some(jpeg("poster.jpg")))
            .await
            .unwrap();

        let expected_key = format!("{}.jpg", added.movie_id);
        assert_eq!(h.covers.puts(), vec![expected_key.clone()]);
        assert_eq!(added.cover_key(), Some(expected_key));
    }

    #[tokio::test]
    async fn test_empty_catalog_is_not_found() {
        let h = harness();
        assert!(matches!(
            h.service.list_movies().await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            h.service.get_movie("missing").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_movies_by_year_only_matching() {
        let h = harness();
        for (title, year) in [("Heat", 1995), ("Alien", 1979), ("Se7en", 1995), ("Ran", 1985)] {
            h.service.add_movie(fields(title, year), None).await.unwrap();
        }

        let found = h.service.movies_by_year(1995).await.unwrap();
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|m| m.release_year == 1995));

        assert!(matches!(
            h.service.movies_by_year(2000).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_summary_generated_once_then_cached() {
        let h = harness();
        let movie = h.service.add_movie(fields("Heat", 1995), None).await.unwrap();

        let first = h.service.movie_summary(&movie.movie_id).await.unwrap();
        assert_eq!(h.summaries.calls(), 1);

        let second = h.service.movie_summary(&movie.movie_id).await.unwrap();
        assert_eq!(h.summaries.calls(), 1);
        assert_eq!(first, second);

        let stored = h.service.get_movie(&movie.movie_id).await.unwrap();
        assert_eq!(stored.generated_summary, Some(first));
    }

    #[tokio::test]
    async fn test_summary_for_missing_movie_skips_generation() {
        let h = harness();
        assert!(matches!(
            h.service.movie_summary("missing").await,
            Err(AppError::NotFound(_))
        ));
        assert_eq!(h.summaries.calls(), 0);
    }

    #[tokio::test]
    async fn test_delete_missing_touches_no_objects() {
        let h = harness();

        let err = h.service.delete_movie("missing").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert!(h.covers.deletes().is_empty());
        assert!(h.covers.puts().is_empty());
    }

    #[tokio::test]
    async fn test_delete_removes_cover() {
        let h = harness();
        let movie = h
            .service
            .add_movie(fields("Alien", 1979), Some(jpeg("a.png")))
            .await
            .unwrap();

        let removed = h.service.delete_movie(&movie.movie_id).await.unwrap();
        assert_eq!(removed.movie_id, movie.movie_id);
        assert_eq!(h.covers.deletes(), vec![format!("{}.png", movie.movie_id)]);
        assert!(matches!(
            h.service.get_movie(&movie.movie_id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_succeeds_when_cover_delete_fails() {
        let h = harness_with(RecordingCovers::failing_deletes());
        let movie = h
            .service
            .add_movie(fields("Alien", 1979), Some(jpeg("a.jpg")))
            .await
            .unwrap();

        assert!(h.service.delete_movie(&movie.movie_id).await.is_ok());
        assert_eq!(h.covers.deletes().len(), 1);
    }

    #[tokio::test]
    async fn test_update_keeps_own_title_and_summary() {
        let h = harness();
        let movie = h.service.add_movie(fields("Heat", 1995), None).await.unwrap();
        let summary = h.service.movie_summary(&movie.movie_id).await.unwrap();

        let updated = h
            .service
            .update_movie(&movie.movie_id, fields(" HEAT", 1996), None)
            .await
            .unwrap();

        assert_eq!(updated.release_year, 1996);
        assert_eq!(updated.generated_summary, Some(summary));
    }

    #[tokio::test]
    async fn test_update_rejects_other_movies_title() {
        let h = harness();
        h.service.add_movie(fields("Heat", 1995), None).await.unwrap();
        let alien = h.service.add_movie(fields("Alien", 1979), None).await.unwrap();

        let err = h
            .service
            .update_movie(&alien.movie_id, fields("heat", 1979), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Duplicate));
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let h = harness();
        let err = h
            .service
            .update_movie("missing", fields("Heat", 1995), Some(jpeg("a.jpg")))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert!(h.covers.puts().is_empty());
    }

    #[tokio::test]
    async fn test_update_cover_with_new_extension_discards_old() {
        let h = harness();
        let movie = h
            .service
            .add_movie(fields("Alien", 1979), Some(jpeg("a.jpg")))
            .await
            .unwrap();

        let updated = h
            .service
            .update_movie(&movie.movie_id, fields("Alien", 1979), Some(jpeg("b.png")))
            .await
            .unwrap();

        assert_eq!(updated.cover_key(), Some(format!("{}.png", movie.movie_id)));
        assert_eq!(h.covers.deletes(), vec![format!("{}.jpg", movie.movie_id)]);
    }

    #[tokio::test]
    async fn test_add_rejects_invalid_fields() {
        let h = harness();

        let blank = MovieFields {
            title: "   ".to_string(),
            release_year: 0,
            genre: String::new(),
        };
        let err = h.service.add_movie(blank, None).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let zero_year = MovieFields {
            release_year: 0,
            ..fields("Heat", 1995)
        };
        assert!(matches!(
            h.service.add_movie(zero_year, None).await,
            Err(AppError::Validation(_))
        ));
        assert!(h.service.list_movies().await.is_err());
    }

    #[tokio::test]
    async fn test_add_trims_title() {
        let h = harness();
        let added = h
            .service
            .add_movie(fields("  Heat  ", 1995), None)
            .await
            .unwrap();

        let stored = h.service.get_movie(&added.movie_id).await.unwrap();
        assert_eq!(stored.title, "Heat");
    }

    #[tokio::test]
    async fn test_update_rejects_invalid_fields() {
        let h = harness();
        let movie = h.service.add_movie(fields("Heat", 1995), None).await.unwrap();

        let err = h
            .service
            .update_movie(&movie.movie_id, fields("", 1995), Some(jpeg("a.jpg")))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(h.covers.puts().is_empty());
    }

    #[tokio::test]
    async fn test_add_discards_cover_when_put_fails() {
        let tmp = TempDir::new().unwrap();
        let covers = Arc::new(RecordingCovers::default());
        let service = failing_service(&tmp, &[], covers.clone()).await;

        let err = service
            .add_movie(fields("Alien", 1979), Some(jpeg("poster.jpg")))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Store(_)));
        let puts = covers.puts();
        assert_eq!(puts.len(), 1);
        assert!(puts[0].ends_with(".jpg"));
        assert_eq!(covers.deletes(), puts);
    }

    #[tokio::test]
    async fn test_update_discards_new_cover_when_update_fails() {
        let tmp = TempDir::new().unwrap();
        let covers = Arc::new(RecordingCovers::default());
        let mut existing = Movie::new("m1", fields("Alien", 1979));
        existing.cover_url =
            Some("https://movies-api-data.s3.ap-south-1.amazonaws.com/images/m1.jpg".to_string());
        let service = failing_service(&tmp, &[existing], covers.clone()).await;

        let err = service
            .update_movie("m1", fields("Alien", 1979), Some(jpeg("b.png")))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Store(_)));
        assert_eq!(covers.puts(), vec!["m1.png".to_string()]);
        assert_eq!(covers.deletes(), vec!["m1.png".to_string()]);
    }

    #[tokio::test]
    async fn test_update_failure_keeps_cover_under_same_key() {
        let tmp = TempDir::new().unwrap();
        let covers = Arc::new(RecordingCovers::default());
        let mut existing = Movie::new("m1", fields("Alien", 1979));
        existing.cover_url =
            Some("https://movies-api-data.s3.ap-south-1.amazonaws.com/images/m1.jpg".to_string());
        let service = failing_service(&tmp, &[existing], covers.clone()).await;

        assert!(
            service
                .update_movie("m1", fields("Alien", 1979), Some(jpeg("c.jpg")))
                .await
                .is_err()
        );
        assert!(covers.deletes().is_empty());
    }

    #[tokio::test]
    async fn test_seed_mints_ids_and_skips_known_titles() {
        let h = harness();
        h.service.add_movie(fields("Titanic", 1997), None).await.unwrap();

        let entries: Vec<SeedMovie> = serde_json::from_str(
            r#"[
                {"title": "Pulp Fiction", "releaseYear": 1994, "genre": "Crime, Drama",
                 "coverUrl": "https://movies-api-data.s3.ap-south-1.amazonaws.com/images/pulp-fiction-1994.jpg"},
                {"title": "titanic", "releaseYear": 1997, "genre": "Romance, Drama"},
                {"title": " PULP FICTION", "releaseYear": 1994, "genre": "Crime"},
                {"title": "Parasite", "releaseYear": 2019, "genre": "Thriller, Drama"}
            ]"#,
        )
        .unwrap();

        let seeded = h.service.seed_movies(entries).await.unwrap();
        let titles: Vec<&str> = seeded.iter().map(|m| m.title.as_str()).collect();
        assert_eq!(titles, vec!["Pulp Fiction", "Parasite"]);
        assert!(seeded.iter().all(|m| Uuid::parse_str(&m.movie_id).is_ok()));
        assert_eq!(
            seeded[0].cover_key(),
            Some("pulp-fiction-1994.jpg".to_string())
        );
        assert_eq!(h.service.list_movies().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_seed_rejects_invalid_entry() {
        let h = harness();
        let entries = vec![SeedMovie {
            title: "Heat".to_string(),
            release_year: 0,
            genre: "Crime".to_string(),
            cover_url: None,
        }];

        assert!(matches!(
            h.service.seed_movies(entries).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_seed_bundled_catalog() {
        let h = harness();
        let entries: Vec<SeedMovie> =
            serde_json::from_str(include_str!("../data/movies.json")).unwrap();

        let seeded = h.service.seed_movies(entries).await.unwrap();
        assert_eq!(seeded.len(), 20);
        assert_eq!(h.service.movies_by_year(1994).await.unwrap().len(), 3);

        // Loading the same file again adds nothing
        let entries: Vec<SeedMovie> =
            serde_json::from_str(include_str!("../data/movies.json")).unwrap();
        assert!(h.service.seed_movies(entries).await.unwrap().is_empty());
    }
}
