use anyhow::{Context, Result};
use axum::{
    body::{to_bytes, Body},
    http::{
        header::{CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE},
        Method, Request, StatusCode,
    },
    response::Response,
    Router,
};
use secrecy::SecretString;
use serde_json::{json, Value};
use speech_quiz::{
    api,
    gate::GateConfig,
    quiz::QuestionSource,
    speech::NO_SPEECH_MESSAGE,
};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tower::ServiceExt;
use ulid::Ulid;

const QUESTIONS: &str = r#"[
  {"question": "What is 2 + 2?", "answer": "four", "keywords": ["four", "4"]},
  {"question": "Capital of France?", "answer": "Paris"}
]"#;

struct TempDir(PathBuf);

impl TempDir {
    fn new() -> Result<Self> {
        let path = std::env::temp_dir().join(format!("speech-quiz-it-{}", Ulid::new()));
        fs::create_dir_all(&path)?;
        Ok(Self(path))
    }

    fn write(&self, name: &str, contents: &str) -> Result<PathBuf> {
        let path = self.0.join(name);
        fs::write(&path, contents)?;
        Ok(path)
    }

    fn path(&self) -> &Path {
        &self.0
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.0);
    }
}

fn gated_router(dir: &TempDir, static_dir: Option<PathBuf>) -> Result<Router> {
    let questions = dir.write("questions.json", QUESTIONS)?;
    let gate = GateConfig::new(Some(SecretString::from("letmein".to_string())), "/_internal");
    Ok(api::router(gate, QuestionSource::File(questions), static_dir))
}

fn set_cookie(response: &Response, name: &str) -> Option<String> {
    let prefix = format!("{name}=");
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|value| value.split(';').next())
        .find(|pair| pair.starts_with(&prefix))
        .map(str::to_string)
}

async fn json_body(response: Response) -> Result<Value> {
    let body = to_bytes(response.into_body(), usize::MAX).await?;
    Ok(serde_json::from_slice(&body)?)
}

async fn text_body(response: Response) -> Result<String> {
    let body = to_bytes(response.into_body(), usize::MAX).await?;
    Ok(String::from_utf8(body.to_vec())?)
}

/// Browser stand-in that keeps the cookies the server sets.
struct Client {
    app: Router,
    cookies: Vec<String>,
}

impl Client {
    fn new(app: Router) -> Self {
        Self {
            app,
            cookies: Vec::new(),
        }
    }

    async fn send(&mut self, method: Method, uri: &str, body: Option<Value>) -> Result<Response> {
        match body {
            Some(body) => {
                self.send_raw(method, uri, Some("application/json"), body.to_string())
                    .await
            }
            None => self.send_raw(method, uri, None, String::new()).await,
        }
    }

    async fn send_raw(
        &mut self,
        method: Method,
        uri: &str,
        content_type: Option<&str>,
        body: String,
    ) -> Result<Response> {
        let mut request = Request::builder().method(method).uri(uri);
        if !self.cookies.is_empty() {
            request = request.header(COOKIE, self.cookies.join("; "));
        }
        if let Some(content_type) = content_type {
            request = request.header(CONTENT_TYPE, content_type);
        }
        let request = request.body(Body::from(body))?;

        let response = self.app.clone().oneshot(request).await?;
        for name in ["quiz_auth", "quiz_session"] {
            if let Some(cookie) = set_cookie(&response, name) {
                self.cookies.retain(|c| !c.starts_with(&format!("{name}=")));
                self.cookies.push(cookie);
            }
        }
        Ok(response)
    }

    async fn login(&mut self, password: &str) -> Result<Response> {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/_auth?redirect=%2F")
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(format!("password={password}")))?;
        let response = self.app.clone().oneshot(request).await?;
        if let Some(cookie) = set_cookie(&response, "quiz_auth") {
            self.cookies.push(cookie);
        }
        Ok(response)
    }
}

#[tokio::test]
async fn full_quiz_through_the_gate() -> Result<()> {
    let dir = TempDir::new()?;
    let mut client = Client::new(gated_router(&dir, None)?);

    // Locked out: the login form replaces the API response.
    let response = client.send(Method::GET, "/api/quiz", None).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let page = text_body(response).await?;
    assert!(page.contains(r#"action="/_auth?redirect=%2Fapi%2Fquiz""#));

    let response = client.login("wrong").await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(client.cookies.is_empty());

    let response = client.login("letmein").await?;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        response.headers().get(LOCATION).map(|v| v.as_bytes()),
        Some(&b"/"[..])
    );
    assert_eq!(client.cookies, vec!["quiz_auth=bGV0bWVpbg==".to_string()]);

    let response = client.send(Method::GET, "/api/quiz", None).await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(set_cookie(&response, "quiz_session").is_some());
    let view = json_body(response).await?;
    assert_eq!(view["phase"], "start");

    let response = client
        .send(Method::POST, "/api/quiz/start", Some(json!({"shuffle": false})))
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let view = json_body(response).await?;
    assert_eq!(view["phase"], "quiz");
    assert_eq!(view["question"], "What is 2 + 2?");
    assert_eq!(view["progress"], json!({"current": 0, "total": 2}));
    assert_eq!(view["result"], Value::Null);

    let response = client.send(Method::POST, "/api/quiz/next", None).await?;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = client
        .send(Method::POST, "/api/quiz/answer", Some(json!({"transcript": "   "})))
        .await?;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json_body(response).await?["error"], NO_SPEECH_MESSAGE);

    let response = client
        .send(
            Method::POST,
            "/api/quiz/answer",
            Some(json!({"transcript": "I think it's four"})),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let answer = json_body(response).await?;
    assert_eq!(answer["result"]["correct"], true);
    assert_eq!(answer["score"], 1);
    assert_eq!(answer["last_question"], false);

    let response = client
        .send(Method::POST, "/api/quiz/answer", Some(json!({"transcript": "4"})))
        .await?;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = client.send(Method::GET, "/api/quiz/summary", None).await?;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = client.send(Method::POST, "/api/quiz/next", None).await?;
    let view = json_body(response).await?;
    assert_eq!(view["question"], "Capital of France?");
    assert_eq!(view["last_question"], true);

    let response = client
        .send(Method::POST, "/api/quiz/answer", Some(json!({"transcript": "Berlin"})))
        .await?;
    let answer = json_body(response).await?;
    assert_eq!(answer["result"]["correct"], false);
    assert_eq!(answer["result"]["answer"], "Paris");

    let response = client.send(Method::POST, "/api/quiz/next", None).await?;
    let view = json_body(response).await?;
    assert_eq!(view["phase"], "result");
    assert_eq!(view["progress"], json!({"current": 2, "total": 2}));

    let response = client.send(Method::GET, "/api/quiz/summary", None).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let summary = json_body(response).await?;
    assert_eq!(summary["score"], 1);
    assert_eq!(summary["total"], 2);
    assert_eq!(summary["percent"], 50);
    assert_eq!(summary["grade"], "not_bad");
    assert_eq!(summary["heading"], "Not bad!");
    assert_eq!(summary["missed"][0]["spoken"], "Berlin");

    let response = client.send(Method::POST, "/api/quiz/restart", None).await?;
    assert_eq!(json_body(response).await?["phase"], "start");

    let response = client.send(Method::GET, "/api/quiz/summary", None).await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn sessions_do_not_share_progress() -> Result<()> {
    let dir = TempDir::new()?;
    let app = gated_router(&dir, None)?;

    let mut alice = Client::new(app.clone());
    let mut bob = Client::new(app);
    alice.login("letmein").await?;
    bob.login("letmein").await?;

    alice
        .send(Method::POST, "/api/quiz/start", Some(json!({"shuffle": false})))
        .await?;

    let response = bob.send(Method::GET, "/api/quiz", None).await?;
    assert_eq!(json_body(response).await?["phase"], "start");

    let response = bob
        .send(Method::POST, "/api/quiz/answer", Some(json!({"transcript": "four"})))
        .await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn custom_question_sets_are_validated() -> Result<()> {
    let dir = TempDir::new()?;
    let mut client = Client::new(gated_router(&dir, None)?);
    client.login("letmein").await?;

    for questions in [
        json!([]),
        json!({"question": "not a list", "answer": "x"}),
        json!([{"question": "", "answer": "x"}]),
        json!([{"answer": "x"}]),
    ] {
        let response = client
            .send(
                Method::POST,
                "/api/quiz/start",
                Some(json!({"questions": questions})),
            )
            .await?;
        assert_eq!(
            response.status(),
            StatusCode::UNPROCESSABLE_ENTITY,
            "{questions} should be rejected"
        );
    }

    let response = client
        .send(
            Method::POST,
            "/api/quiz/start",
            Some(json!({
                "shuffle": false,
                "questions": [{"question": "Largest ocean?", "answer": "Pacific"}]
            })),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let view = json_body(response).await?;
    assert_eq!(view["question"], "Largest ocean?");
    assert_eq!(view["progress"]["total"], 1);

    // A running quiz cannot be started again.
    let response = client
        .send(Method::POST, "/api/quiz/start", Some(json!({})))
        .await?;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    Ok(())
}

#[tokio::test]
async fn malformed_start_bodies_are_rejected() -> Result<()> {
    let dir = TempDir::new()?;
    let mut client = Client::new(gated_router(&dir, None)?);
    client.login("letmein").await?;

    let truncated = r#"{"shuffle": false, "questions": [{"question": "Mine?", "answer": "x"}"#;
    for (content_type, body, status) in [
        (
            Some("application/json"),
            truncated,
            StatusCode::UNPROCESSABLE_ENTITY,
        ),
        (
            Some("application/json"),
            r#"{"shuffle": "sometimes"}"#,
            StatusCode::UNPROCESSABLE_ENTITY,
        ),
        (
            Some("text/plain"),
            r#"{"shuffle": false}"#,
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
        ),
    ] {
        let response = client
            .send_raw(Method::POST, "/api/quiz/start", content_type, body.to_string())
            .await?;
        assert_eq!(response.status(), status, "{body} should be rejected");
        if status == StatusCode::UNPROCESSABLE_ENTITY {
            let error = json_body(response).await?;
            let message = error["error"].as_str().context("error message")?;
            assert!(message.starts_with("Invalid question file"), "{message}");
        }
    }

    // Nothing was started by the rejected requests.
    let response = client.send(Method::GET, "/api/quiz", None).await?;
    assert_eq!(json_body(response).await?["phase"], "start");

    // No body at all still starts the default set.
    let response = client.send(Method::POST, "/api/quiz/start", None).await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await?["progress"]["total"], 2);
    Ok(())
}

#[tokio::test]
async fn missing_default_questions_fail_the_start() -> Result<()> {
    let dir = TempDir::new()?;
    let missing = dir.path().join("nope.json");
    let app = api::router(GateConfig::open(), QuestionSource::File(missing), None);
    let mut client = Client::new(app);

    let response = client.send(Method::POST, "/api/quiz/start", None).await?;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let error = json_body(response).await?;
    let message = error["error"].as_str().context("error message")?;
    assert!(message.starts_with("Could not load questions.json"));

    let response = client.send(Method::GET, "/questions.json", None).await?;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    Ok(())
}

#[tokio::test]
async fn question_resource_is_served_behind_the_gate() -> Result<()> {
    let dir = TempDir::new()?;
    let mut client = Client::new(gated_router(&dir, None)?);

    let response = client.send(Method::GET, "/questions.json", None).await?;
    assert!(text_body(response).await?.contains(r#"name="password""#));

    client.login("letmein").await?;
    let response = client.send(Method::GET, "/questions.json", None).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let questions = json_body(response).await?;
    assert_eq!(questions[1]["question"], "Capital of France?");
    assert_eq!(questions.as_array().map(Vec::len), Some(2));
    Ok(())
}

#[tokio::test]
async fn probes_live_under_the_bypass_prefix() -> Result<()> {
    let dir = TempDir::new()?;
    let mut client = Client::new(gated_router(&dir, None)?);

    let response = client.send(Method::GET, "/_internal/health", None).await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    assert!(response.headers().contains_key("X-App"));
    assert_eq!(json_body(response).await?["questions"], "ok");

    let response = client.send(Method::GET, "/_internal/live", None).await?;
    assert_eq!(response.status(), StatusCode::OK);

    // Outside the prefix nothing about the build leaks before login.
    let response = client.send(Method::GET, "/health", None).await?;
    assert!(!response.headers().contains_key("X-App"));
    assert!(text_body(response).await?.contains(r#"name="password""#));
    Ok(())
}

#[tokio::test]
async fn probes_are_gated_without_a_bypass_prefix() -> Result<()> {
    let dir = TempDir::new()?;
    let questions = dir.write("questions.json", QUESTIONS)?;
    let gate = GateConfig::new(Some(SecretString::from("letmein".to_string())), "");
    let mut client = Client::new(api::router(gate, QuestionSource::File(questions), None));

    let response = client.send(Method::GET, "/_internal/health", None).await?;
    assert!(!response.headers().contains_key("X-App"));
    assert!(text_body(response).await?.contains(r#"name="password""#));

    client.login("letmein").await?;
    let response = client.send(Method::GET, "/_internal/health", None).await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await?["questions"], "ok");
    Ok(())
}

#[tokio::test]
async fn request_id_is_kept_when_supplied() -> Result<()> {
    let dir = TempDir::new()?;
    let app = gated_router(&dir, None)?;

    let request = Request::builder()
        .uri("/_internal/live")
        .header("x-request-id", "01J0000000000000000000TEST")
        .body(Body::empty())?;
    let response = app.oneshot(request).await?;
    assert_eq!(
        response
            .headers()
            .get("x-request-id")
            .map(|v| v.as_bytes()),
        Some(&b"01J0000000000000000000TEST"[..])
    );
    Ok(())
}

#[tokio::test]
async fn bypass_prefix_reaches_the_router() -> Result<()> {
    let dir = TempDir::new()?;
    let mut client = Client::new(gated_router(&dir, None)?);

    let response = client.send(Method::GET, "/_internal/status", None).await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(response).await?["error"], "not found");
    Ok(())
}

#[tokio::test]
async fn static_assets_are_gated() -> Result<()> {
    let dir = TempDir::new()?;
    let assets = TempDir::new()?;
    assets.write("index.html", "<h1>quiz front-end</h1>")?;
    let mut client = Client::new(gated_router(&dir, Some(assets.path().to_path_buf()))?);

    let response = client.send(Method::GET, "/", None).await?;
    assert!(!text_body(response).await?.contains("quiz front-end"));

    client.login("letmein").await?;
    let response = client.send(Method::GET, "/", None).await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(text_body(response).await?.contains("quiz front-end"));
    Ok(())
}

#[tokio::test]
async fn open_mode_serves_everything() -> Result<()> {
    let dir = TempDir::new()?;
    let questions = dir.write("questions.json", QUESTIONS)?;
    let mut client = Client::new(api::router(
        GateConfig::open(),
        QuestionSource::File(questions),
        None,
    ));

    let response = client.send(Method::GET, "/api/quiz", None).await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await?["phase"], "start");

    let response = client.send(Method::GET, "/api-docs/openapi.json", None).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let doc = json_body(response).await?;
    assert!(doc["paths"]["/api/quiz/answer"].is_object());
    Ok(())
}

#[tokio::test]
async fn serves_over_tcp() -> Result<()> {
    let dir = TempDir::new()?;
    let app = gated_router(&dir, None)?;

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let server = tokio::spawn(async move { axum::serve(listener, app).await });

    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()?;

    let response = client.get(format!("http://{addr}/_internal/live")).send().await?;
    assert_eq!(response.status(), reqwest::StatusCode::OK);

    let response = client
        .post(format!("http://{addr}/_auth?redirect=%2Fapi%2Fquiz"))
        .header(CONTENT_TYPE.as_str(), "application/x-www-form-urlencoded")
        .body("password=letmein")
        .send()
        .await?;
    assert_eq!(response.status(), reqwest::StatusCode::FOUND);
    assert_eq!(
        response
            .headers()
            .get("location")
            .and_then(|v| v.to_str().ok()),
        Some("/api/quiz")
    );

    server.abort();
    Ok(())
}
