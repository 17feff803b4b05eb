//! # Speech Quiz
//!
//! A spoken-answer quiz. Questions are read from a JSON resource, the user
//! answers out loud, a speech-recognition capability turns the audio into a
//! transcript and the transcript is checked against the accepted keywords of
//! the question.
//!
//! ## Layout
//!
//! - [`quiz`]: answer normalization, evaluation, the flow state machine and
//!   the final summary. Everything in here is pure and synchronous.
//! - [`speech`]: the capture adapter around an external recognition engine,
//!   finalizing a transcript after a silence timeout.
//! - [`gate`]: a shared-password gate that protects every HTTP route with a
//!   `quiz_auth` cookie.
//! - [`api`]: the axum server exposing the quiz to a browser.
//! - [`cli`]: argument parsing, telemetry and the `server` / `play` actions.
//!
//! ## Access gate
//!
//! The cookie value is the base64 encoding of the configured password. It is
//! obfuscation, not protection: anyone holding the cookie can decode it. The
//! gate only exists to keep casual visitors out of a private deployment.

pub mod api;
pub mod cli;
pub mod gate;
pub mod quiz;
pub mod speech;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
