//! Multipart form parsing for write requests.

use std::convert::Infallible;

use bytes::Bytes;
use multer::{Constraints, Multipart, SizeLimit};

use crate::error::{AppError, Result};
use crate::models::{CoverUpload, MovieFields};

const FORM_DATA: &str = "multipart/form-data";
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Raw movie form as submitted, before validation.
#[derive(Debug, Default)]
pub struct MovieForm {
    pub title: Option<String>,
    pub release_year: Option<String>,
    pub genre: Option<String>,
    pub cover: Option<CoverUpload>,
}

impl MovieForm {
    /// Validate required fields and split off the optional cover.
    pub fn into_fields(self) -> Result<(MovieFields, Option<CoverUpload>)> {
        let (Some(title), Some(release_year), Some(genre)) =
            (self.title, self.release_year, self.genre)
        else {
            return Err(AppError::validation(
                "'title' and 'releaseYear' and 'genre' fields are required",
            ));
        };

        let (title, release_year, genre) = (title.trim(), release_year.trim(), genre.trim());
        if title.is_empty() || release_year.is_empty() || genre.is_empty() {
            return Err(AppError::validation(
                "'title' or 'releaseYear' or 'genre' field cannot be empty",
            ));
        }

        let release_year = parse_year(release_year)
            .ok_or_else(|| AppError::validation("releaseYear must be a positive integer"))?;
        let fields = MovieFields::new(title, release_year, genre)?;
        Ok((fields, self.cover))
    }
}

/// Parse a release year: a positive integer that fits in `u16`.
pub fn parse_year(value: &str) -> Option<u16> {
    value.trim().parse::<u16>().ok().filter(|year| *year > 0)
}

/// Extract the multipart boundary from a Content-Type header value.
pub fn boundary(content_type: Option<&str>) -> Result<String> {
    let content_type = content_type
        .map(str::trim)
        .filter(|ct| !ct.is_empty())
        .ok_or_else(|| AppError::multipart("Missing Content-Type header"))?;

    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    if essence != FORM_DATA {
        return Err(AppError::multipart("Invalid or unsupported Content-Type"));
    }

    multer::parse_boundary(content_type)
        .map_err(|_| AppError::multipart("Missing boundary in Content-Type header"))
}

/// Parse a multipart body into a movie form.
///
/// Only the first value of each field is kept; unknown fields are ignored.
/// A `coverImage` part without content counts as no cover.
pub async fn parse_movie_form(
    content_type: Option<&str>,
    body: Vec<u8>,
    max_bytes: u64,
) -> Result<MovieForm> {
    let boundary = boundary(content_type)?;
    log::debug!("Parsing multipart body of {} bytes", body.len());

    let stream = futures::stream::once(async move { Ok::<Bytes, Infallible>(Bytes::from(body)) });
    let constraints = Constraints::new().size_limit(SizeLimit::new().whole_stream(max_bytes));
    let mut multipart = Multipart::with_constraints(stream, boundary, constraints);

    let mut form = MovieForm::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::multipart(format!("Error parsing form data: {e}")))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "title" | "releaseYear" | "genre" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::multipart(format!("Error parsing form data: {e}")))?;
                let slot = match name.as_str() {
                    "title" => &mut form.title,
                    "releaseYear" => &mut form.release_year,
                    _ => &mut form.genre,
                };
                if slot.is_none() {
                    *slot = Some(text);
                }
            }
            "coverImage" => {
                let file_name = field.file_name().unwrap_or("").to_string();
                let content_type = field
                    .content_type()
                    .map(|mime| mime.to_string())
                    .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::multipart(format!("Error parsing form data: {e}")))?;

                if form.cover.is_none() && !bytes.is_empty() {
                    log::info!("Cover image provided: {} ({} bytes)", file_name, bytes.len());
                    form.cover = Some(CoverUpload {
                        file_name,
                        content_type,
                        bytes: bytes.to_vec(),
                    });
                }
            }
            _ => {} // ignore unknown fields
        }
    }

    Ok(form)
}
