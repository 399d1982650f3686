// src/lambda/mod.rs

//! AWS Lambda adapter.
//!
//! Converts API Gateway proxy events into `ApiRequest`s and `ApiResponse`s
//! back into HTTP responses. Routing and all catalog rules stay in `api`.

use std::collections::HashMap;

use lambda_http::http::header::CONTENT_TYPE;
use lambda_http::{Body, Error as LambdaError, Request, RequestExt, Response};
use tracing::{info, instrument};

use crate::api::{ApiRequest, ApiResponse, Router};

/// Convert a Lambda HTTP event into a transport-neutral request.
pub fn to_api_request(request: &Request) -> ApiRequest {
    let query: HashMap<String, String> = request
        .query_string_parameters()
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect();

    let headers: HashMap<String, String> = request
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|value| (name.as_str().to_string(), value.to_string()))
        })
        .collect();

    // The raw path is only set on events decoded from API Gateway
    let path = match request.raw_http_path() {
        "" => request.uri().path().to_string(),
        raw => raw.to_string(),
    };

    ApiRequest {
        method: request.method().as_str().to_string(),
        path,
        query,
        headers,
        body: request.body().as_ref().to_vec(),
    }
}

/// Convert an envelope response into a Lambda HTTP response.
pub fn to_http_response(response: ApiResponse) -> Result<Response<Body>, LambdaError> {
    let http = Response::builder()
        .status(response.status_code)
        .header(CONTENT_TYPE, ApiResponse::CONTENT_TYPE)
        .body(Body::from(response.body))?;
    Ok(http)
}

/// Main Lambda handler function.
#[instrument(skip(router, event), fields(method = %event.method(), path = %event.uri().path()))]
pub async fn handler(router: &Router, event: Request) -> Result<Response<Body>, LambdaError> {
    let request = to_api_request(&event);
    let response = router.handle(request).await;
    info!("Responding with status {}", response.status_code);
    to_http_response(response)
}
