//! Movies API CLI
//!
//! Runs catalog operations from a terminal. For AWS Lambda, use `movies-lambda`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use movies_api::{
    config,
    error::{AppError, Result},
    models::{AppConfig, CoverUpload, MovieFields, SeedMovie},
    service::MovieService,
    summary::BedrockSummaryGenerator,
};
use serde::Serialize;

/// movies - movie catalog with covers and generated summaries
#[derive(Parser, Debug)]
#[command(
    name = "movies",
    version,
    about = "Movie catalog backed by DynamoDB, S3 and Bedrock"
)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Keep records and covers in this directory instead of DynamoDB and S3
    #[arg(short, long)]
    storage_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List movies, optionally only those released in a year
    List {
        #[arg(long)]
        year: Option<u16>,
    },

    /// Show one movie
    Get { movie_id: String },

    /// Add a movie
    Add {
        #[command(flatten)]
        fields: FieldArgs,
    },

    /// Replace a movie's fields and optionally its cover
    Update {
        movie_id: String,

        #[command(flatten)]
        fields: FieldArgs,
    },

    /// Delete a movie and its cover
    Delete { movie_id: String },

    /// Show a movie's summary, generating it on first use
    Summary { movie_id: String },

    /// Load movies from a JSON array of `{title, releaseYear, genre, coverUrl?}`
    Seed { file: PathBuf },

    /// Validate configuration
    Validate,
}

#[derive(clap::Args, Debug)]
struct FieldArgs {
    #[arg(long)]
    title: String,

    #[arg(long)]
    year: u16,

    #[arg(long)]
    genre: String,

    /// Cover image file to upload
    #[arg(long)]
    cover: Option<PathBuf>,
}

impl FieldArgs {
    async fn into_parts(self) -> Result<(MovieFields, Option<CoverUpload>)> {
        let fields = MovieFields::new(&self.title, self.year, &self.genre)?;
        let cover = match self.cover {
            Some(path) => Some(read_cover(&path).await?),
            None => None,
        };
        Ok((fields, cover))
    }
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Read a cover file, guessing its content type from the extension.
async fn read_cover(path: &Path) -> Result<CoverUpload> {
    let bytes = tokio::fs::read(path).await?;
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| AppError::validation(format!("Invalid cover path: {}", path.display())))?
        .to_string();

    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    let content_type = match extension.as_deref() {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    };

    Ok(CoverUpload {
        file_name,
        content_type: content_type.to_string(),
        bytes,
    })
}

async fn build_service(config: &AppConfig, storage_dir: Option<&Path>) -> MovieService {
    match storage_dir {
        Some(dir) => {
            log::info!("Using local storage at {}", dir.display());
            let sdk_config = config::aws_sdk_config(&config.aws).await;
            let summaries = BedrockSummaryGenerator::new(
                aws_sdk_bedrockruntime::Client::new(&sdk_config),
                &config.summary,
            );
            MovieService::local(dir, config, Arc::new(summaries))
        }
        None => MovieService::from_aws(config).await,
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = config::load_with_env(&cli.config)?;
    log::debug!("Loaded configuration: {:?}", config);

    if let Command::Validate = cli.command {
        log::info!(
            "Config OK: region={}, table={}, bucket={}, model={}",
            config.aws.region,
            config.table.name,
            config.covers.bucket,
            config.summary.model_id
        );
        return Ok(());
    }

    let service = build_service(&config, cli.storage_dir.as_deref()).await;

    match cli.command {
        Command::List { year } => {
            let movies = match year {
                Some(year) => service.movies_by_year(year).await?,
                None => service.list_movies().await?,
            };
            log::info!("Fetched {} movies", movies.len());
            print_json(&movies)?;
        }

        Command::Get { movie_id } => {
            print_json(&service.get_movie(&movie_id).await?)?;
        }

        Command::Add { fields } => {
            let (fields, cover) = fields.into_parts().await?;
            print_json(&service.add_movie(fields, cover).await?)?;
        }

        Command::Update { movie_id, fields } => {
            let (fields, cover) = fields.into_parts().await?;
            print_json(&service.update_movie(&movie_id, fields, cover).await?)?;
        }

        Command::Delete { movie_id } => {
            print_json(&service.delete_movie(&movie_id).await?)?;
        }

        Command::Summary { movie_id } => {
            println!("{}", service.movie_summary(&movie_id).await?);
        }

        Command::Seed { file } => {
            let content = tokio::fs::read_to_string(&file).await?;
            let entries: Vec<SeedMovie> = serde_json::from_str(&content)?;
            log::info!("Seeding {} entries from {}", entries.len(), file.display());
            print_json(&service.seed_movies(entries).await?)?;
        }

        Command::Validate => {}
    }

    Ok(())
}
