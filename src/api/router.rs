//! Request routing.
//!
//! | Method | Path                 | Query                 |
//! |--------|----------------------|-----------------------|
//! | GET    | `/api/movies`        | `year` or `movieId`   |
//! | POST   | `/api/movies`        |                       |
//! | PUT    | `/api/movies`        | `movieId`             |
//! | DELETE | `/api/movies`        | `movieId`             |
//! | GET    | `/api/movies/summary`| `movieId`             |

use std::collections::BTreeMap;

use crate::api::form::{parse_movie_form, parse_year};
use crate::api::{ApiRequest, ApiResponse};
use crate::error::{AppError, Result};
use crate::models::UploadConfig;
use crate::service::MovieService;

pub const MOVIES_PATH: &str = "/api/movies";
pub const SUMMARY_PATH: &str = "/api/movies/summary";

/// Stateless dispatcher from requests to catalog operations.
#[derive(Clone)]
pub struct Router {
    service: MovieService,
    max_upload_bytes: u64,
}

impl Router {
    pub fn new(service: MovieService, upload: &UploadConfig) -> Self {
        Self {
            service,
            max_upload_bytes: upload.max_bytes,
        }
    }

    /// Handle one request. Never fails: errors become envelope responses.
    pub async fn handle(&self, request: ApiRequest) -> ApiResponse {
        log::info!(
            "{} {} query={:?}",
            request.method,
            request.path,
            request.query
        );

        match self.dispatch(request).await {
            Ok(response) => response,
            Err(e) => {
                log::warn!("Request failed: {}", e);
                ApiResponse::from_error(&e)
            }
        }
    }

    async fn dispatch(&self, request: ApiRequest) -> Result<ApiResponse> {
        let method = request.method.to_ascii_uppercase();
        let path = match request.path.trim_end_matches('/') {
            "" => "/",
            trimmed => trimmed,
        };

        match (method.as_str(), path) {
            ("GET", MOVIES_PATH) => self.get_movies(&request).await,
            ("POST", MOVIES_PATH) => self.add_movie(request).await,
            ("PUT", MOVIES_PATH) => self.update_movie(request).await,
            ("DELETE", MOVIES_PATH) => self.delete_movie(&request).await,
            ("GET", SUMMARY_PATH) => self.movie_summary(&request).await,
            _ => Ok(ApiResponse::failure(404, "Wrong path provided")),
        }
    }

    /// GET /api/movies with optional `year` or `movieId`.
    async fn get_movies(&self, request: &ApiRequest) -> Result<ApiResponse> {
        match (request.query_param("year"), request.query_param("movieId")) {
            (Some(_), Some(_)) => Err(AppError::validation(
                "'year' and 'movieId' query params cannot be combined",
            )),
            (Some(year), None) => {
                if year.trim().is_empty() {
                    return Err(AppError::validation("year cannot be empty"));
                }
                let year = parse_year(year)
                    .ok_or_else(|| AppError::validation("year must be a positive integer"))?;
                let movies = self.service.movies_by_year(year).await?;
                Ok(ApiResponse::ok("Movies fetched successfully.", movies))
            }
            (None, Some(movie_id)) => {
                let movie_id = non_empty_id(movie_id)?;
                let movie = self.service.get_movie(movie_id).await?;
                Ok(ApiResponse::ok("Movie fetched successfully", movie))
            }
            (None, None) => {
                let movies = self.service.list_movies().await?;
                Ok(ApiResponse::ok("Movies fetched successfully.", movies))
            }
        }
    }

    /// POST /api/movies
    async fn add_movie(&self, request: ApiRequest) -> Result<ApiResponse> {
        let content_type = request.header("Content-Type").map(str::to_string);
        let form =
            parse_movie_form(content_type.as_deref(), request.body, self.max_upload_bytes).await?;
        let (fields, cover) = form.into_fields()?;

        let movie = self.service.add_movie(fields, cover).await?;
        let data = BTreeMap::from([("movieId", movie.movie_id)]);
        Ok(ApiResponse::ok("Movie added successfully", data))
    }

    /// PUT /api/movies?movieId=
    async fn update_movie(&self, request: ApiRequest) -> Result<ApiResponse> {
        let movie_id = required_movie_id(&request)?.to_string();
        let content_type = request.header("Content-Type").map(str::to_string);
        let form =
            parse_movie_form(content_type.as_deref(), request.body, self.max_upload_bytes).await?;
        let (fields, cover) = form.into_fields()?;

        let movie = self.service.update_movie(&movie_id, fields, cover).await?;
        Ok(ApiResponse::ok("Movie updated successfully", movie))
    }

    /// DELETE /api/movies?movieId=
    async fn delete_movie(&self, request: &ApiRequest) -> Result<ApiResponse> {
        let movie_id = required_movie_id(request)?;
        let movie = self.service.delete_movie(movie_id).await?;
        Ok(ApiResponse::ok("Movie deleted successfully", movie))
    }

    /// GET /api/movies/summary?movieId=
    async fn movie_summary(&self, request: &ApiRequest) -> Result<ApiResponse> {
        let movie_id = required_movie_id(request)?;
        let summary = self.service.movie_summary(movie_id).await?;
        let data = BTreeMap::from([("summary", summary)]);
        Ok(ApiResponse::ok("Movie summary fetched.", data))
    }
}

fn required_movie_id(request: &ApiRequest) -> Result<&str> {
    let movie_id = request
        .query_param("movieId")
        .ok_or_else(|| AppError::validation("movieId query param missing"))?;
    non_empty_id(movie_id)
}

fn non_empty_id(movie_id: &str) -> Result<&str> {
    let movie_id = movie_id.trim();
    if movie_id.is_empty() {
        return Err(AppError::validation("movieId cannot be empty"));
    }
    Ok(movie_id)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::Value;
    use tempfile::TempDir;

    use super::*;
    use crate::api::form::tests::{content_type, multipart_body};
    use crate::service::fakes::{CountingSummaries, RecordingCovers};
    use crate::storage::LocalMovieStore;

    struct Harness {
        _tmp: TempDir,
        router: Router,
        covers: Arc<RecordingCovers>,
        summaries: Arc<CountingSummaries>,
    }

    fn harness() -> Harness {
        let tmp = TempDir::new().unwrap();
        let covers = Arc::new(RecordingCovers::default());
        let summaries = Arc::new(CountingSummaries::default());
        let service = MovieService::new(
            Arc::new(LocalMovieStore::new(tmp.path())),
            covers.clone(),
            summaries.clone(),
        );
        Harness {
            _tmp: tmp,
            router: Router::new(service, &UploadConfig::default()),
            covers,
            summaries,
        }
    }

    fn body(response: &ApiResponse) -> Value {
        serde_json::from_str(&response.body).unwrap()
    }

    fn create_request(title: &str, year: &str, cover: Option<(&str, &str, &[u8])>) -> ApiRequest {
        ApiRequest::new("POST", MOVIES_PATH)
            .with_header("content-type", content_type())
            .with_body(multipart_body(
                &[("title", title), ("releaseYear", year), ("genre", "Drama")],
                cover,
            ))
    }

    async fn create(h: &Harness, title: &str, year: &str) -> String {
        let response = h.router.handle(create_request(title, year, None)).await;
        assert_eq!(response.status_code, 200, "{}", response.body);
        body(&response)["data"]["movieId"]
            .as_str()
            .unwrap()
            .to_string()
    }

    #[tokio::test]
    async fn test_create_then_fetch_by_id() {
        let h = harness();
        let movie_id = create(&h, "Heat", "1995").await;

        let response = h
            .router
            .handle(ApiRequest::new("GET", MOVIES_PATH).with_query("movieId", &movie_id))
            .await;
        let json = body(&response);

        assert_eq!(response.status_code, 200);
        assert_eq!(json["status"], true);
        assert_eq!(json["statusCode"], 200);
        assert_eq!(json["data"]["movieId"], movie_id.as_str());
        assert_eq!(json["data"]["title"], "Heat");
        assert_eq!(json["data"]["releaseYear"], 1995);
    }

    #[tokio::test]
    async fn test_duplicate_title_rejected() {
        let h = harness();
        create(&h, "Heat", "1995").await;

        let response = h.router.handle(create_request(" HEAT ", "1995", None)).await;
        let json = body(&response);

        assert_eq!(response.status_code, 400);
        assert_eq!(json["status"], false);
        assert_eq!(json["message"], "movie with same title already exists");
    }

    #[tokio::test]
    async fn test_create_without_content_type() {
        let h = harness();
        let response = h
            .router
            .handle(ApiRequest::new("POST", MOVIES_PATH).with_body(b"title=Heat".to_vec()))
            .await;

        assert_eq!(response.status_code, 400);
        assert_eq!(body(&response)["message"], "Missing Content-Type header");
    }

    #[tokio::test]
    async fn test_create_with_bad_year() {
        let h = harness();
        let response = h.router.handle(create_request("Heat", "soon", None)).await;

        assert_eq!(response.status_code, 400);
        assert_eq!(body(&response)["message"], "releaseYear must be a positive integer");
    }

    #[tokio::test]
    async fn test_list_by_year_only_matching() {
        let h = harness();
        for (title, year) in [("Heat", "1995"), ("Alien", "1979"), ("Se7en", "1995")] {
            create(&h, title, year).await;
        }

        let response = h
            .router
            .handle(ApiRequest::new("GET", MOVIES_PATH).with_query("year", "1995"))
            .await;
        let json = body(&response);
        let movies = json["data"].as_array().unwrap();

        assert_eq!(response.status_code, 200);
        assert_eq!(movies.len(), 2);
        assert!(movies.iter().all(|m| m["releaseYear"] == 1995));
    }

    #[tokio::test]
    async fn test_year_and_movie_id_are_exclusive() {
        let h = harness();
        let response = h
            .router
            .handle(
                ApiRequest::new("GET", MOVIES_PATH)
                    .with_query("year", "1995")
                    .with_query("movieId", "abc"),
            )
            .await;
        assert_eq!(response.status_code, 400);
    }

    #[tokio::test]
    async fn test_empty_catalog_is_404() {
        let h = harness();
        let response = h.router.handle(ApiRequest::new("GET", MOVIES_PATH)).await;

        assert_eq!(response.status_code, 404);
        assert_eq!(body(&response)["message"], "No movies found");
    }

    #[tokio::test]
    async fn test_summary_generated_once() {
        let h = harness();
        let movie_id = create(&h, "Heat", "1995").await;
        let request = ApiRequest::new("GET", SUMMARY_PATH).with_query("movieId", &movie_id);

        let first = h.router.handle(request.clone()).await;
        let second = h.router.handle(request).await;

        assert_eq!(first.status_code, 200);
        assert_eq!(body(&first)["data"]["summary"], "Heat summary #1");
        assert_eq!(body(&second)["data"]["summary"], "Heat summary #1");
        assert_eq!(h.summaries.calls(), 1);
    }

    #[tokio::test]
    async fn test_summary_requires_movie_id() {
        let h = harness();
        let response = h.router.handle(ApiRequest::new("GET", SUMMARY_PATH)).await;

        assert_eq!(response.status_code, 400);
        assert_eq!(body(&response)["message"], "movieId query param missing");
    }

    #[tokio::test]
    async fn test_update_replaces_fields() {
        let h = harness();
        let movie_id = create(&h, "Heat", "1995").await;

        let request = ApiRequest::new("PUT", MOVIES_PATH)
            .with_query("movieId", &movie_id)
            .with_header("Content-Type", content_type())
            .with_body(multipart_body(
                &[("title", "Heat"), ("releaseYear", "1996"), ("genre", "Crime")],
                Some(("cover.webp", "image/webp", &b"webp"[..])),
            ));
        let response = h.router.handle(request).await;
        let json = body(&response);

        assert_eq!(response.status_code, 200, "{}", response.body);
        assert_eq!(json["data"]["releaseYear"], 1996);
        assert_eq!(json["data"]["genre"], "Crime");
        assert_eq!(h.covers.puts(), vec![format!("{movie_id}.webp")]);
    }

    #[tokio::test]
    async fn test_delete_missing_is_404_without_object_calls() {
        let h = harness();
        let response = h
            .router
            .handle(ApiRequest::new("DELETE", MOVIES_PATH).with_query("movieId", "missing"))
            .await;

        assert_eq!(response.status_code, 404);
        assert_eq!(body(&response)["message"], "No movie found");
        assert!(h.covers.deletes().is_empty());
    }

    #[tokio::test]
    async fn test_delete_returns_record_and_removes_cover() {
        let h = harness();
        let created = h
            .router
            .handle(create_request("Alien", "1979", Some(("a.jpg", "image/jpeg", &b"jpg"[..]))))
            .await;
        let movie_id = body(&created)["data"]["movieId"].as_str().unwrap().to_string();

        let response = h
            .router
            .handle(ApiRequest::new("DELETE", MOVIES_PATH).with_query("movieId", &movie_id))
            .await;

        assert_eq!(response.status_code, 200);
        assert_eq!(body(&response)["data"]["title"], "Alien");
        assert_eq!(h.covers.deletes(), vec![format!("{movie_id}.jpg")]);
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let h = harness();
        let response = h
            .router
            .handle(ApiRequest::new("PATCH", MOVIES_PATH))
            .await;

        assert_eq!(response.status_code, 404);
        assert_eq!(body(&response)["message"], "Wrong path provided");
    }
}
