use crate::api::handlers::{self, health, questions, quiz};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        health::live,
        questions::questions,
        quiz::state,
        quiz::start,
        quiz::answer,
        quiz::next,
        quiz::restart,
        quiz::summary,
    ),
    components(schemas(handlers::ErrorBody)),
    tags(
        (name = "quiz", description = "Spoken-answer quiz flow"),
        (name = "health", description = "Liveness and health probes"),
    )
)]
pub struct ApiDoc;
