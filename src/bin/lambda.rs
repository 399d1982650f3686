//! AWS Lambda entry point for the movies API.
//!
//! Deploy with `cargo lambda build --release --features lambda`
//! behind an API Gateway proxy integration.

use lambda_http::{Error as LambdaError, Request, service_fn};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use movies_api::api::Router;
use movies_api::config;
use movies_api::lambda::handler;
use movies_api::service::MovieService;

/// Main entry point for the AWS Lambda function.
#[tokio::main]
async fn main() -> Result<(), LambdaError> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    let config = config::from_env()?;
    let service = MovieService::from_aws(&config).await;
    let router = Router::new(service, &config.upload);

    info!("Movies API Lambda starting...");
    let router = &router;
    lambda_http::run(service_fn(move |event: Request| async move {
        handler(router, event).await
    }))
    .await
}
