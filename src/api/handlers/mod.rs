pub mod health;
pub mod questions;
pub mod quiz;

// common responses for the handlers
use crate::{api::sessions::SessionError, quiz::FlowError, quiz::QuestionSetError, speech};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use tracing::error;
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ErrorBody {
    pub error: String,
}

#[must_use]
pub fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
        .into_response()
}

pub async fn not_found() -> Response {
    error_response(StatusCode::NOT_FOUND, "not found")
}

impl IntoResponse for SessionError {
    fn into_response(self) -> Response {
        match self {
            Self::Flow(FlowError::NoSpeech) => {
                error_response(StatusCode::UNPROCESSABLE_ENTITY, speech::NO_SPEECH_MESSAGE)
            }
            Self::Flow(err) => error_response(StatusCode::CONFLICT, err.to_string()),
            Self::Missing => error_response(StatusCode::NOT_FOUND, self.to_string()),
            Self::Poisoned => {
                error!("{self}");
                error_response(StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
        }
    }
}

impl IntoResponse for QuestionSetError {
    fn into_response(self) -> Response {
        if self.is_transport() {
            error!("failed to load questions: {self}");
            error_response(
                StatusCode::BAD_GATEWAY,
                format!("Could not load questions.json: {self}"),
            )
        } else {
            error_response(
                StatusCode::UNPROCESSABLE_ENTITY,
                format!("Invalid question file: {self}"),
            )
        }
    }
}
