use crate::quiz::{Question, QuestionSource};
use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;
use tracing::{error, instrument};

use super::{error_response, ErrorBody};

#[utoipa::path(
    get,
    path= "/questions.json",
    responses (
        (status = 200, description = "Default question set", body = [Question], content_type = "application/json"),
        (status = 500, description = "Default question set is invalid", body = ErrorBody),
        (status = 502, description = "Default question set could not be fetched", body = ErrorBody),
    ),
    tag= "quiz"
)]
/// Serve the default question set after validating it.
#[instrument(skip_all)]
pub async fn questions(source: Extension<Arc<QuestionSource>>) -> Response {
    match source.load().await {
        Ok(set) => Json(set).into_response(),
        Err(err) if err.is_transport() => err.into_response(),
        Err(err) => {
            error!("default question set at {} is invalid: {err}", source.0);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Invalid question file: {err}"),
            )
        }
    }
}
