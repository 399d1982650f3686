// src/models/mod.rs

//! Domain models for the movies API.

mod config;
mod movie;

// Re-export all public types
pub use config::{AppConfig, AwsConfig, CoverConfig, SummaryConfig, TableConfig, UploadConfig};
pub use movie::{
    CoverUpload, Movie, MovieFields, MovieUpdate, SeedMovie, cover_key, cover_key_from_url, normalize_title,
};
