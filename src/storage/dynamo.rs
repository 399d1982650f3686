//! DynamoDB record store implementation.
//!
//! One item per movie keyed by `movieId`. Year and title lookups use a
//! secondary index when one is configured and fall back to a filtered scan
//! otherwise. Scans and queries follow continuation keys to the last page.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_dynamodb::Client;
use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::types::{AttributeValue, PutRequest, ReturnValue, WriteRequest};
use tokio::time::sleep;

use crate::error::{AppError, Result};
use crate::models::{Movie, MovieUpdate, TableConfig, normalize_title};
use crate::storage::MovieStore;

type Item = HashMap<String, AttributeValue>;

const MOVIE_ID: &str = "movieId";
const TITLE: &str = "title";
const TITLE_KEY: &str = "titleKey";
const RELEASE_YEAR: &str = "releaseYear";
const GENRE: &str = "genre";
const COVER_URL: &str = "coverUrl";
const GENERATED_SUMMARY: &str = "generatedSummary";

/// Maximum put requests per BatchWriteItem call.
const BATCH_WRITE_LIMIT: usize = 25;
const BATCH_WRITE_ATTEMPTS: usize = 3;
const UNPROCESSED_BACKOFF: Duration = Duration::from_millis(200);

/// Equality condition on a single attribute.
struct Equals {
    attribute: &'static str,
    value: AttributeValue,
}

/// DynamoDB-backed movie table.
pub struct DynamoMovieStore {
    client: Client,
    table: String,
    year_index: Option<String>,
    title_index: Option<String>,
}

impl DynamoMovieStore {
    /// Create a new store for the configured table.
    pub fn new(client: Client, config: &TableConfig) -> Self {
        Self {
            client,
            table: config.name.clone(),
            year_index: config.year_index.clone(),
            title_index: config.title_index.clone(),
        }
    }

    fn key(movie_id: &str) -> Item {
        HashMap::from([(MOVIE_ID.to_string(), AttributeValue::S(movie_id.to_string()))])
    }

    /// Scan the table, optionally filtered by one equality condition.
    async fn scan(&self, filter: Option<Equals>) -> Result<Vec<Movie>> {
        let mut movies = Vec::new();
        let mut start_key: Option<Item> = None;

        loop {
            let mut request = self
                .client
                .scan()
                .table_name(&self.table)
                .set_exclusive_start_key(start_key.take());

            if let Some(filter) = &filter {
                request = request
                    .filter_expression("#attr = :value")
                    .expression_attribute_names("#attr", filter.attribute)
                    .expression_attribute_values(":value", filter.value.clone());
            }

            let output = request
                .send()
                .await
                .map_err(|e| AppError::store(DisplayErrorContext(e)))?;

            for item in output.items() {
                movies.push(from_item(item)?);
            }

            match output.last_evaluated_key() {
                Some(key) if !key.is_empty() => start_key = Some(key.clone()),
                _ => break,
            }
        }

        log::debug!("Scanned {} movies from {}", movies.len(), self.table);
        Ok(movies)
    }

    /// Query a secondary index keyed by the condition's attribute.
    async fn query_index(&self, index: &str, key: Equals) -> Result<Vec<Movie>> {
        let mut movies = Vec::new();
        let mut start_key: Option<Item> = None;

        loop {
            let output = self
                .client
                .query()
                .table_name(&self.table)
                .index_name(index)
                .key_condition_expression("#attr = :value")
                .expression_attribute_names("#attr", key.attribute)
                .expression_attribute_values(":value", key.value.clone())
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .map_err(|e| AppError::store(DisplayErrorContext(e)))?;

            for item in output.items() {
                movies.push(from_item(item)?);
            }

            match output.last_evaluated_key() {
                Some(key) if !key.is_empty() => start_key = Some(key.clone()),
                _ => break,
            }
        }

        Ok(movies)
    }
}

#[async_trait]
impl MovieStore for DynamoMovieStore {
    async fn list(&self) -> Result<Vec<Movie>> {
        self.scan(None).await
    }

    async fn list_by_year(&self, year: u16) -> Result<Vec<Movie>> {
        let condition = Equals {
            attribute: RELEASE_YEAR,
            value: AttributeValue::N(year.to_string()),
        };
        match &self.year_index {
            Some(index) => self.query_index(index, condition).await,
            None => self.scan(Some(condition)).await,
        }
    }

    async fn get(&self, movie_id: &str) -> Result<Option<Movie>> {
        let output = self
            .client
            .get_item()
            .table_name(&self.table)
            .set_key(Some(Self::key(movie_id)))
            .send()
            .await
            .map_err(|e| AppError::store(DisplayErrorContext(e)))?;

        match output.item() {
            Some(item) if !item.is_empty() => Ok(Some(from_item(item)?)),
            _ => Ok(None),
        }
    }

    async fn find_by_title(&self, title: &str) -> Result<Option<Movie>> {
        match &self.title_index {
            Some(index) => {
                let condition = Equals {
                    attribute: TITLE_KEY,
                    value: AttributeValue::S(normalize_title(title)),
                };
                Ok(self.query_index(index, condition).await?.into_iter().next())
            }
            // Items written by other tools may lack titleKey, so compare titles here
            None => Ok(first_with_title(self.scan(None).await?, title)),
        }
    }

    async fn put(&self, movie: &Movie) -> Result<()> {
        self.client
            .put_item()
            .table_name(&self.table)
            .set_item(Some(to_item(movie)))
            .send()
            .await
            .map_err(|e| AppError::store(DisplayErrorContext(e)))?;

        log::info!("Put movie {} into {}", movie.movie_id, self.table);
        Ok(())
    }

    async fn put_many(&self, movies: &[Movie]) -> Result<()> {
        for chunk in movies.chunks(BATCH_WRITE_LIMIT) {
            let mut requests = chunk.iter().map(put_request).collect::<Result<Vec<_>>>()?;

            let mut attempt = 0;
            while !requests.is_empty() {
                attempt += 1;
                if attempt > BATCH_WRITE_ATTEMPTS {
                    return Err(AppError::store(format!(
                        "{} items unprocessed after {} batch writes",
                        requests.len(),
                        BATCH_WRITE_ATTEMPTS
                    )));
                }
                if attempt > 1 {
                    log::warn!("Resending {} unprocessed items", requests.len());
                    sleep(UNPROCESSED_BACKOFF * attempt as u32).await;
                }

                let output = self
                    .client
                    .batch_write_item()
                    .request_items(&self.table, requests)
                    .send()
                    .await
                    .map_err(|e| AppError::store(DisplayErrorContext(e)))?;

                requests = output
                    .unprocessed_items()
                    .and_then(|items| items.get(&self.table))
                    .cloned()
                    .unwrap_or_default();
            }
        }

        log::info!("Batch wrote {} movies into {}", movies.len(), self.table);
        Ok(())
    }

    async fn update_fields(&self, movie_id: &str, update: &MovieUpdate) -> Result<Movie> {
        let mut assignments = vec![
            (TITLE, AttributeValue::S(update.fields.title.clone())),
            (TITLE_KEY, AttributeValue::S(normalize_title(&update.fields.title))),
            (
                RELEASE_YEAR,
                AttributeValue::N(update.fields.release_year.to_string()),
            ),
            (GENRE, AttributeValue::S(update.fields.genre.clone())),
        ];
        if let Some(url) = &update.cover_url {
            assignments.push((COVER_URL, AttributeValue::S(url.clone())));
        }

        let expression = format!(
            "SET {}",
            assignments
                .iter()
                .map(|(name, _)| format!("#{name} = :{name}"))
                .collect::<Vec<_>>()
                .join(", ")
        );

        let mut request = self
            .client
            .update_item()
            .table_name(&self.table)
            .set_key(Some(Self::key(movie_id)))
            .update_expression(expression)
            .condition_expression("attribute_exists(#movieId)")
            .expression_attribute_names("#movieId", MOVIE_ID)
            .return_values(ReturnValue::AllNew);
        for (name, value) in assignments {
            request = request
                .expression_attribute_names(format!("#{name}"), name)
                .expression_attribute_values(format!(":{name}"), value);
        }

        let output = match request.send().await {
            Ok(output) => output,
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.is_conditional_check_failed_exception() {
                    return Err(AppError::not_found("No movie found"));
                }
                return Err(AppError::store(DisplayErrorContext(service_err)));
            }
        };

        let movie = output
            .attributes()
            .map(from_item)
            .transpose()?
            .ok_or_else(|| AppError::store("update returned no attributes"))?;
        log::info!("Updated movie {}", movie.movie_id);
        Ok(movie)
    }

    async fn save_summary(&self, movie_id: &str, summary: &str) -> Result<String> {
        let result = self
            .client
            .update_item()
            .table_name(&self.table)
            .set_key(Some(Self::key(movie_id)))
            .update_expression("SET #summary = :summary")
            .condition_expression("attribute_exists(#movieId) AND attribute_not_exists(#summary)")
            .expression_attribute_names("#movieId", MOVIE_ID)
            .expression_attribute_names("#summary", GENERATED_SUMMARY)
            .expression_attribute_values(":summary", AttributeValue::S(summary.to_string()))
            .send()
            .await;

        match result {
            Ok(_) => Ok(summary.to_string()),
            Err(err) => {
                let service_err = err.into_service_error();
                if !service_err.is_conditional_check_failed_exception() {
                    return Err(AppError::store(DisplayErrorContext(service_err)));
                }

                // Either the movie is gone or another writer stored a summary first
                let movie = self
                    .get(movie_id)
                    .await?
                    .ok_or_else(|| AppError::not_found("No movie found"))?;
                log::info!("Summary for {} was already stored; keeping it", movie_id);
                movie
                    .generated_summary
                    .ok_or_else(|| AppError::store("summary write rejected without a stored summary"))
            }
        }
    }

    async fn delete(&self, movie_id: &str) -> Result<Movie> {
        let result = self
            .client
            .delete_item()
            .table_name(&self.table)
            .set_key(Some(Self::key(movie_id)))
            .condition_expression("attribute_exists(#movieId)")
            .expression_attribute_names("#movieId", MOVIE_ID)
            .return_values(ReturnValue::AllOld)
            .send()
            .await;

        let output = match result {
            Ok(output) => output,
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.is_conditional_check_failed_exception() {
                    return Err(AppError::not_found("No movie found"));
                }
                return Err(AppError::store(DisplayErrorContext(service_err)));
            }
        };

        let movie = output
            .attributes()
            .map(from_item)
            .transpose()?
            .ok_or_else(|| AppError::store("delete returned no attributes"))?;
        log::info!("Deleted movie {} from {}", movie_id, self.table);
        Ok(movie)
    }
}

/// First movie whose normalized title equals the normalized `title`.
fn first_with_title(movies: Vec<Movie>, title: &str) -> Option<Movie> {
    let wanted = normalize_title(title);
    movies.into_iter().find(|m| m.title_key() == wanted)
}

fn put_request(movie: &Movie) -> Result<WriteRequest> {
    let put = PutRequest::builder()
        .set_item(Some(to_item(movie)))
        .build()
        .map_err(AppError::store)?;
    Ok(WriteRequest::builder().put_request(put).build())
}

/// Convert a movie into a DynamoDB item.
pub fn to_item(movie: &Movie) -> Item {
    let mut item = HashMap::from([
        (MOVIE_ID.to_string(), AttributeValue::S(movie.movie_id.clone())),
        (TITLE.to_string(), AttributeValue::S(movie.title.clone())),
        (TITLE_KEY.to_string(), AttributeValue::S(movie.title_key())),
        (
            RELEASE_YEAR.to_string(),
            AttributeValue::N(movie.release_year.to_string()),
        ),
        (GENRE.to_string(), AttributeValue::S(movie.genre.clone())),
    ]);
    if let Some(url) = &movie.cover_url {
        item.insert(COVER_URL.to_string(), AttributeValue::S(url.clone()));
    }
    if let Some(summary) = &movie.generated_summary {
        item.insert(
            GENERATED_SUMMARY.to_string(),
            AttributeValue::S(summary.clone()),
        );
    }
    item
}

/// Convert a DynamoDB item into a movie.
pub fn from_item(item: &Item) -> Result<Movie> {
    let release_year = required_string(item, RELEASE_YEAR, AttributeValue::as_n)?;
    let release_year = release_year.parse::<u16>().map_err(|e| {
        AppError::store(format!("attribute {RELEASE_YEAR} is not a year: {e}"))
    })?;

    Ok(Movie {
        movie_id: required_string(item, MOVIE_ID, AttributeValue::as_s)?,
        title: required_string(item, TITLE, AttributeValue::as_s)?,
        release_year,
        genre: required_string(item, GENRE, AttributeValue::as_s)?,
        cover_url: optional_string(item, COVER_URL),
        generated_summary: optional_string(item, GENERATED_SUMMARY),
    })
}

fn required_string(
    item: &Item,
    name: &str,
    read: fn(&AttributeValue) -> std::result::Result<&String, &AttributeValue>,
) -> Result<String> {
    item.get(name)
        .and_then(|value| read(value).ok())
        .cloned()
        .ok_or_else(|| AppError::store(format!("item is missing attribute {name}")))
}

fn optional_string(item: &Item, name: &str) -> Option<String> {
    item.get(name)
        .and_then(|value| value.as_s().ok())
        .filter(|s| !s.is_empty())
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MovieFields;

    fn sample() -> Movie {
        let mut movie = Movie::new(
            "0190a1b2-0000-7000-8000-000000000001",
            MovieFields {
                title: " Blade Runner".to_string(),
                release_year: 1982,
                genre: "Sci-Fi".to_string(),
            },
        );
        movie.cover_url = Some("https://bucket.s3.ap-south-1.amazonaws.com/images/x.jpg".into());
        movie
    }

    #[test]
    fn test_item_carries_title_key() {
        let item = to_item(&sample());
        assert_eq!(
            item.get(TITLE_KEY),
            Some(&AttributeValue::S("blade runner".to_string()))
        );
        assert_eq!(
            item.get(RELEASE_YEAR),
            Some(&AttributeValue::N("1982".to_string()))
        );
        assert!(!item.contains_key(GENERATED_SUMMARY));
    }

    #[test]
    fn test_item_conversion_preserves_movie() {
        let movie = sample();
        assert_eq!(from_item(&to_item(&movie)).unwrap(), movie);
    }

    #[test]
    fn test_empty_optional_attributes_are_absent() {
        let mut item = to_item(&sample());
        item.insert(COVER_URL.to_string(), AttributeValue::S(String::new()));
        item.insert(GENERATED_SUMMARY.to_string(), AttributeValue::S(String::new()));

        let movie = from_item(&item).unwrap();
        assert!(movie.cover_url.is_none());
        assert!(movie.generated_summary.is_none());
    }

    #[test]
    fn test_missing_required_attribute_is_error() {
        let mut item = to_item(&sample());
        item.remove(GENRE);
        assert!(matches!(from_item(&item), Err(AppError::Store(_))));
    }

    #[test]
    fn test_title_match_ignores_missing_title_key() {
        let mut legacy = to_item(&sample());
        legacy.remove(TITLE_KEY);
        let movies = vec![from_item(&legacy).unwrap()];

        let found = first_with_title(movies.clone(), "blade RUNNER ");
        assert_eq!(found.map(|m| m.title), Some(" Blade Runner".to_string()));
        assert!(first_with_title(movies, "Alien").is_none());
    }

    #[test]
    fn test_put_request_carries_item() {
        let request = put_request(&sample()).unwrap();
        let item = request.put_request().unwrap().item();
        assert_eq!(
            item.get(MOVIE_ID),
            Some(&AttributeValue::S(
                "0190a1b2-0000-7000-8000-000000000001".to_string()
            ))
        );
    }

    #[test]
    fn test_bad_year_is_error() {
        let mut item = to_item(&sample());
        item.insert(RELEASE_YEAR.to_string(), AttributeValue::N("99999".to_string()));
        assert!(from_item(&item).is_err());
    }
}
