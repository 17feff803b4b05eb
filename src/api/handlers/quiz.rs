//! Quiz API: one flow per browser session.

use crate::{
    api::sessions::{QuizSessions, SessionError, SessionKey},
    quiz::{
        AnswerResult, FlowError, Phase, Progress, Question, QuestionSet, QuestionSource,
        QuizEvent, QuizState, Summary,
    },
};
use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    response::{Json, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;

use super::{error_response, ErrorBody};

/// What a client needs to render the current screen.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct QuizView {
    pub phase: Phase,
    pub progress: Progress,
    pub score: usize,
    /// Text of the question being asked, quiz phase only.
    pub question: Option<String>,
    /// Result for the current question once it has been answered.
    pub result: Option<AnswerResult>,
    pub last_question: bool,
}

impl From<&QuizState> for QuizView {
    fn from(state: &QuizState) -> Self {
        Self {
            phase: state.phase(),
            progress: state.progress(),
            score: state.score(),
            question: state.current_question().map(|q| q.question.clone()),
            result: state.current_result().cloned(),
            last_question: state.is_last_question(),
        }
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct StartRequest {
    #[serde(default = "default_shuffle")]
    pub shuffle: bool,
    /// Custom question set; the default resource is used when absent.
    #[serde(default)]
    #[schema(value_type = Option<Vec<Question>>)]
    pub questions: Option<serde_json::Value>,
}

impl Default for StartRequest {
    fn default() -> Self {
        Self {
            shuffle: default_shuffle(),
            questions: None,
        }
    }
}

fn default_shuffle() -> bool {
    true
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone)]
pub struct AnswerRequest {
    pub transcript: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AnswerView {
    pub result: AnswerResult,
    pub score: usize,
    pub progress: Progress,
    pub last_question: bool,
}

#[utoipa::path(
    get,
    path= "/api/quiz",
    responses (
        (status = 200, description = "Current quiz state", body = QuizView),
    ),
    tag= "quiz"
)]
#[instrument(skip_all)]
pub async fn state(headers: HeaderMap, sessions: Extension<Arc<QuizSessions>>) -> Response {
    let key = SessionKey::from_headers(&headers);
    match sessions.snapshot(key.id) {
        Ok(state) => key.respond(Json(QuizView::from(&state))),
        Err(err) => key.respond(err),
    }
}

#[utoipa::path(
    post,
    path= "/api/quiz/start",
    request_body = StartRequest,
    responses (
        (status = 200, description = "Quiz started at the first question", body = QuizView),
        (status = 409, description = "A quiz is already running", body = ErrorBody),
        (status = 415, description = "Body is not JSON", body = ErrorBody),
        (status = 422, description = "Question set or request body is invalid", body = ErrorBody),
        (status = 502, description = "Default question set could not be loaded", body = ErrorBody),
    ),
    tag= "quiz"
)]
/// Start a quiz with the default question set or the one in the body.
#[instrument(skip_all)]
pub async fn start(
    headers: HeaderMap,
    sessions: Extension<Arc<QuizSessions>>,
    source: Extension<Arc<QuestionSource>>,
    payload: Result<Json<StartRequest>, JsonRejection>,
) -> Response {
    let key = SessionKey::from_headers(&headers);
    let StartRequest { shuffle, questions } = match start_request(&headers, payload) {
        Ok(request) => request,
        Err(response) => return key.respond(response),
    };

    let questions = match questions {
        Some(value) => QuestionSet::from_value(value),
        None => source.load().await,
    };
    let questions = match questions {
        Ok(questions) => questions,
        Err(err) => {
            warn!("cannot start quiz: {err}");
            return key.respond(err);
        }
    };

    let total = questions.len();
    match sessions.apply(key.id, QuizEvent::Begin { questions, shuffle }) {
        Ok(state) => {
            info!("quiz started with {total} questions");
            key.respond(Json(QuizView::from(&state)))
        }
        Err(err) => key.respond(err),
    }
}

// A request without a body or content type starts the default set; anything
// that claims to be a body must parse.
fn start_request(
    headers: &HeaderMap,
    payload: Result<Json<StartRequest>, JsonRejection>,
) -> Result<StartRequest, Response> {
    match payload {
        Ok(Json(request)) => Ok(request),
        Err(JsonRejection::MissingJsonContentType(_)) if !headers.contains_key(CONTENT_TYPE) => {
            Ok(StartRequest::default())
        }
        Err(rejection @ (JsonRejection::JsonSyntaxError(_) | JsonRejection::JsonDataError(_))) => {
            warn!("malformed start request: {rejection}");
            Err(error_response(
                StatusCode::UNPROCESSABLE_ENTITY,
                format!("Invalid question file: {}", rejection.body_text()),
            ))
        }
        Err(rejection) => {
            warn!("unreadable start request: {rejection}");
            Err(error_response(rejection.status(), rejection.body_text()))
        }
    }
}

#[utoipa::path(
    post,
    path= "/api/quiz/answer",
    request_body = AnswerRequest,
    responses (
        (status = 200, description = "Answer evaluated", body = AnswerView),
        (status = 404, description = "No quiz in progress", body = ErrorBody),
        (status = 409, description = "Not in the quiz phase or already answered", body = ErrorBody),
        (status = 422, description = "No speech detected", body = ErrorBody),
    ),
    tag= "quiz"
)]
/// Evaluate a transcript against the current question.
#[instrument(skip_all)]
pub async fn answer(
    headers: HeaderMap,
    sessions: Extension<Arc<QuizSessions>>,
    Json(payload): Json<AnswerRequest>,
) -> Response {
    let key = SessionKey::from_headers(&headers);
    let event = QuizEvent::Answer {
        spoken: payload.transcript,
    };

    let state = match sessions.apply(key.id, event) {
        Ok(state) => state,
        Err(err) => return key.respond(err),
    };

    match state.current_result().cloned() {
        Some(result) => key.respond(Json(AnswerView {
            result,
            score: state.score(),
            progress: state.progress(),
            last_question: state.is_last_question(),
        })),
        None => key.respond(SessionError::Flow(FlowError::NotAnswered(
            state.current_index(),
        ))),
    }
}

#[utoipa::path(
    post,
    path= "/api/quiz/next",
    responses (
        (status = 200, description = "Moved to the next question or to the result", body = QuizView),
        (status = 404, description = "No quiz in progress", body = ErrorBody),
        (status = 409, description = "Current question not answered yet", body = ErrorBody),
    ),
    tag= "quiz"
)]
#[instrument(skip_all)]
pub async fn next(headers: HeaderMap, sessions: Extension<Arc<QuizSessions>>) -> Response {
    let key = SessionKey::from_headers(&headers);
    match sessions.apply(key.id, QuizEvent::Advance) {
        Ok(state) => key.respond(Json(QuizView::from(&state))),
        Err(err) => key.respond(err),
    }
}

#[utoipa::path(
    post,
    path= "/api/quiz/restart",
    responses (
        (status = 200, description = "Back at the start screen", body = QuizView),
    ),
    tag= "quiz"
)]
#[instrument(skip_all)]
pub async fn restart(headers: HeaderMap, sessions: Extension<Arc<QuizSessions>>) -> Response {
    let key = SessionKey::from_headers(&headers);
    match sessions.apply(key.id, QuizEvent::Restart) {
        Ok(state) => key.respond(Json(QuizView::from(&state))),
        Err(err) => key.respond(err),
    }
}

#[utoipa::path(
    get,
    path= "/api/quiz/summary",
    responses (
        (status = 200, description = "Final score", body = Summary),
        (status = 404, description = "No quiz in progress", body = ErrorBody),
        (status = 409, description = "Quiz has not finished", body = ErrorBody),
    ),
    tag= "quiz"
)]
#[instrument(skip_all)]
pub async fn summary(headers: HeaderMap, sessions: Extension<Arc<QuizSessions>>) -> Response {
    let key = SessionKey::from_headers(&headers);
    let state = match sessions.get(key.id) {
        Ok(Some(state)) => state,
        Ok(None) => return key.respond(SessionError::Missing),
        Err(err) => return key.respond(err),
    };

    match Summary::from_state(&state) {
        Some(summary) => key.respond(Json(summary)),
        None => key.respond(SessionError::Flow(FlowError::WrongPhase {
            phase: state.phase(),
            action: "summarize",
        })),
    }
}
