//! Health probes.
//!
//! - `/live`: process liveness only
//! - `/health`: build details plus a check that the question resource loads

use crate::{quiz::QuestionSource, GIT_COMMIT_HASH};
use axum::{
    body::Body,
    extract::Extension,
    http::{HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::time::{timeout, Duration};
use tracing::{debug, warn};
use utoipa::ToSchema;

const HEALTH_QUESTIONS_TIMEOUT_SECONDS: u64 = 2;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct Health {
    commit: String,
    name: String,
    version: String,
    questions: String,
}

#[utoipa::path(
    get,
    path= "/_internal/live",
    responses (
        (status = 200, description = "Process is alive")
    ),
    tag = "health",
)]
pub async fn live() -> impl IntoResponse {
    StatusCode::OK
}

#[utoipa::path(
    get,
    path= "/_internal/health",
    responses (
        (status = 200, description = "Question resource loads", body = Health),
        (status = 503, description = "Question resource is unavailable or invalid", body = Health)
    ),
    tag = "health",
)]
/// Report build details and whether the default question resource loads.
pub async fn health(method: Method, source: Extension<Arc<QuestionSource>>) -> impl IntoResponse {
    let questions_ok = probe_questions(&source.0).await;

    let health = Health {
        commit: GIT_COMMIT_HASH.to_string(),
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        questions: if questions_ok {
            "ok".to_string()
        } else {
            "error".to_string()
        },
    };

    let body = if method == Method::GET {
        Json(&health).into_response()
    } else {
        Body::empty().into_response()
    };

    let short_hash = if health.commit.len() > 7 {
        &health.commit[0..7]
    } else {
        ""
    };

    let headers = format!("{}:{}:{}", health.name, health.version, short_hash)
        .parse::<HeaderValue>()
        .map(|x_app_header_value| {
            debug!("X-App header: {:?}", x_app_header_value);

            let mut headers = HeaderMap::new();
            headers.insert("X-App", x_app_header_value);
            headers
        })
        .map_err(|err| {
            debug!("Failed to parse X-App header: {}", err);
        })
        .unwrap_or_else(|()| HeaderMap::new());

    if questions_ok {
        (StatusCode::OK, headers, body)
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, headers, body)
    }
}

async fn probe_questions(source: &QuestionSource) -> bool {
    match timeout(
        Duration::from_secs(HEALTH_QUESTIONS_TIMEOUT_SECONDS),
        source.load(),
    )
    .await
    {
        Ok(Ok(_)) => true,
        Ok(Err(err)) => {
            warn!("question resource {source} failed to load: {err}");
            false
        }
        Err(_) => {
            warn!("question resource {source} timed out");
            false
        }
    }
}
