//! HTTP surface: quiz API, question resource, health probes and API docs,
//! all behind the password gate. The probes live under the gate's bypass
//! prefix, which is the only way past the gate without the password.

pub mod handlers;
pub mod openapi;
pub mod sessions;

use crate::{
    gate::{require_password, GateConfig, DEFAULT_BYPASS_PREFIX},
    quiz::QuestionSource,
};
use anyhow::{Context, Result};
use axum::{
    body::Body,
    http::{HeaderName, HeaderValue, Request},
    middleware,
    routing::{get, post},
    Extension, Router,
};
use handlers::{health, questions, quiz};
use openapi::ApiDoc;
use sessions::QuizSessions;
use std::{path::PathBuf, sync::Arc};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, services::ServeDir, set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{debug_span, error, info, Span};
use ulid::Ulid;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Build the application router.
///
/// Every request passes through the gate first, including the probes, the
/// static fallback and unknown paths.
pub fn router(gate: GateConfig, source: QuestionSource, static_dir: Option<PathBuf>) -> Router {
    let probes = probe_prefix(&gate);
    let gate = Arc::new(gate);
    let source = Arc::new(source);
    let sessions = Arc::new(QuizSessions::new());

    let mut gated = Router::new()
        .route("/questions.json", get(questions::questions))
        .route("/api/quiz", get(quiz::state))
        .route("/api/quiz/start", post(quiz::start))
        .route("/api/quiz/answer", post(quiz::answer))
        .route("/api/quiz/next", post(quiz::next))
        .route("/api/quiz/restart", post(quiz::restart))
        .route("/api/quiz/summary", get(quiz::summary))
        .route(
            &format!("{probes}/health"),
            get(health::health).options(health::health),
        )
        .route(&format!("{probes}/live"), get(health::live))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    gated = match static_dir {
        Some(dir) => gated.fallback_service(ServeDir::new(dir)),
        None => gated.fallback(handlers::not_found),
    };

    gated
        .layer(Extension(sessions))
        .layer(middleware::from_fn_with_state(gate, require_password))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(Extension(source)),
        )
}

/// Path prefix of `/health` and `/live`: the bypass prefix, or the default one
/// (still gated) when bypassing is disabled.
fn probe_prefix(gate: &GateConfig) -> String {
    match gate.bypass_prefix().trim_matches('/') {
        "" => DEFAULT_BYPASS_PREFIX.to_string(),
        prefix => format!("/{prefix}"),
    }
}

/// Serve the application until ctrl-c.
/// # Errors
/// Returns an error if the server fails to start
pub async fn new(
    port: u16,
    gate: GateConfig,
    source: QuestionSource,
    static_dir: Option<PathBuf>,
) -> Result<()> {
    let app = router(gate, source, static_dir);

    let listener = TcpListener::bind(format!("::0:{port}"))
        .await
        .with_context(|| format!("Failed to bind port {port}"))?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {err}");
            }
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

// span
fn make_span(request: &Request<Body>) -> Span {
    let method = request.method();
    let path = request.uri().path();
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");

    debug_span!("http-request", %method, path, request_id)
}
