//! Question resource: parsing, validation and loading.
//!
//! The resource is a JSON array of `{question, answer, keywords?}` objects. It
//! comes either from a local file or from an `http(s)` URL. Loading is all or
//! nothing: any invalid entry rejects the whole set.

use crate::APP_USER_AGENT;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{fmt, path::PathBuf};
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub question: String,
    pub answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<Vec<String>>,
}

impl Question {
    /// Keywords accepted as a correct answer.
    ///
    /// Falls back to the answer itself when no keywords (or an empty list)
    /// were given. An explicit `keywords: []` deliberately counts as missing
    /// rather than as "nothing matches", so every question stays answerable.
    #[must_use]
    pub fn accepted_keywords(&self) -> Vec<&str> {
        match &self.keywords {
            Some(keywords) if !keywords.is_empty() => keywords.iter().map(String::as_str).collect(),
            _ => vec![self.answer.as_str()],
        }
    }
}

#[derive(Debug, Error)]
pub enum QuestionSetError {
    #[error("invalid JSON, expected [{{question, answer, keywords?}}]: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid JSON, expected an array of questions")]
    NotAnArray,
    #[error("the question list is empty")]
    Empty,
    #[error("invalid JSON, the first entry has no question text")]
    MissingQuestion,
    #[error("could not read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("could not fetch {url}: {source}")]
    Fetch { url: String, source: reqwest::Error },
    #[error("could not fetch {url}: HTTP {status}")]
    Status { url: String, status: u16 },
}

impl QuestionSetError {
    /// True when the resource could not be reached, as opposed to being invalid.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Read { .. } | Self::Fetch { .. } | Self::Status { .. }
        )
    }
}

/// Ordered, non-empty list of questions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct QuestionSet(Vec<Question>);

impl QuestionSet {
    /// Parse and validate a JSON question resource.
    ///
    /// # Errors
    /// Returns an error if the document is not a non-empty array of questions.
    pub fn from_json(raw: &str) -> Result<Self, QuestionSetError> {
        let value: Value = serde_json::from_str(raw)?;
        Self::from_value(value)
    }

    /// Validate an already decoded JSON value.
    ///
    /// # Errors
    /// Returns an error if the value is not a non-empty array of questions.
    pub fn from_value(value: Value) -> Result<Self, QuestionSetError> {
        let Value::Array(entries) = &value else {
            return Err(QuestionSetError::NotAnArray);
        };

        let Some(first) = entries.first() else {
            return Err(QuestionSetError::Empty);
        };

        let has_question = first
            .get("question")
            .and_then(Value::as_str)
            .is_some_and(|text| !text.trim().is_empty());
        if !has_question {
            return Err(QuestionSetError::MissingQuestion);
        }

        let questions: Vec<Question> = serde_json::from_value(value)?;
        Ok(Self(questions))
    }

    /// Build a set from questions that were validated elsewhere.
    ///
    /// # Errors
    /// Returns [`QuestionSetError::Empty`] for an empty list.
    pub fn new(questions: Vec<Question>) -> Result<Self, QuestionSetError> {
        if questions.is_empty() {
            return Err(QuestionSetError::Empty);
        }
        Ok(Self(questions))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Question] {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> Vec<Question> {
        self.0
    }
}

/// Where the default question resource lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuestionSource {
    File(PathBuf),
    Remote(Url),
}

impl QuestionSource {
    /// `http://` and `https://` values are fetched, anything else is a path.
    ///
    /// # Errors
    /// Returns an error if an `http(s)` value is not a valid URL.
    pub fn parse(value: &str) -> Result<Self, url::ParseError> {
        if value.starts_with("http://") || value.starts_with("https://") {
            Ok(Self::Remote(Url::parse(value)?))
        } else {
            Ok(Self::File(PathBuf::from(value)))
        }
    }

    /// Read the raw resource without validating it.
    ///
    /// # Errors
    /// Returns a transport error if the file or URL cannot be read.
    #[instrument]
    pub async fn fetch(&self) -> Result<String, QuestionSetError> {
        match self {
            Self::File(path) => {
                tokio::fs::read_to_string(path)
                    .await
                    .map_err(|source| QuestionSetError::Read {
                        path: path.display().to_string(),
                        source,
                    })
            }
            Self::Remote(url) => {
                let fetch_error = |source| QuestionSetError::Fetch {
                    url: url.to_string(),
                    source,
                };

                let client = Client::builder()
                    .user_agent(APP_USER_AGENT)
                    .build()
                    .map_err(fetch_error)?;

                let response = client
                    .get(url.clone())
                    .send()
                    .await
                    .map_err(fetch_error)?;

                if !response.status().is_success() {
                    return Err(QuestionSetError::Status {
                        url: url.to_string(),
                        status: response.status().as_u16(),
                    });
                }

                response.text().await.map_err(fetch_error)
            }
        }
    }

    /// Fetch and validate the question set.
    ///
    /// # Errors
    /// Returns an error if the resource cannot be read or is invalid.
    pub async fn load(&self) -> Result<QuestionSet, QuestionSetError> {
        let raw = self.fetch().await?;
        let set = QuestionSet::from_json(&raw)?;
        debug!("loaded {} questions from {}", set.len(), self);
        Ok(set)
    }
}

impl fmt::Display for QuestionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Remote(url) => write!(f, "{url}"),
        }
    }
}
