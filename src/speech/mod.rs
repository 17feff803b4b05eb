//! Speech capture adapter.
//!
//! Speech recognition itself is an external capability. This module only
//! drives it: an engine streams [`RecognitionEvent`]s, [`SpeechCapture`]
//! collects the final fragments and decides when the user has finished
//! speaking (silence timeout, manual stop, engine end), and reports a single
//! [`CaptureOutcome`].
//!
//! Whether a capability exists at all is decided by the caller and passed in
//! as a [`Capability`], so tests can substitute a scripted engine.

pub mod capture;
pub mod line;

pub use self::capture::{
    CaptureConfig, CaptureController, CaptureHandle, CaptureSlot, SlotRequest, SpeechCapture,
};
pub use self::line::LineEngine;

use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;

/// Shown instead of the microphone when no recognition capability exists.
pub const UNSUPPORTED_MESSAGE: &str = "Speech recognition not supported.";

/// Shown when a capture ended without any recognized speech.
pub const NO_SPEECH_MESSAGE: &str = "(no speech detected, try again)";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionEvent {
    /// A piece of recognized text. Interim fragments may still change;
    /// final fragments are appended to the transcript.
    Fragment { text: String, is_final: bool },
    /// The engine gave up waiting for speech.
    NoSpeech,
    /// The engine failed.
    Error(String),
    /// The engine finished the recognition.
    End,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SpeechError {
    #[error("{UNSUPPORTED_MESSAGE} {0}")]
    Unavailable(String),
    #[error("speech engine error: {0}")]
    Engine(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// Trimmed concatenation of the final fragments.
    Transcript(String),
    NoSpeech,
    Cancelled,
    Failed(String),
}

/// One running recognition inside an engine.
pub trait RecognitionSession: Send {
    /// Ask the engine to finish; anything recognized so far is kept.
    fn stop(&mut self);
    /// Stop immediately and drop whatever was recognized.
    fn abort(&mut self);
}

/// A speech recognition backend.
pub trait RecognitionEngine: Send + Sync {
    /// Start a recognition that pushes its events into `events`.
    ///
    /// # Errors
    /// Returns an error if the engine cannot start listening.
    fn recognize(
        &self,
        events: mpsc::UnboundedSender<RecognitionEvent>,
    ) -> Result<Box<dyn RecognitionSession>, SpeechError>;
}

/// Result of capability detection, injected into whoever captures speech.
#[derive(Debug, Clone)]
pub enum Capability {
    Available(SpeechCapture),
    Unavailable { reason: String },
}

impl Capability {
    #[must_use]
    pub fn detect(engine: Option<Arc<dyn RecognitionEngine>>, config: CaptureConfig) -> Self {
        match engine {
            Some(engine) => Self::Available(SpeechCapture::new(engine, config)),
            None => Self::Unavailable {
                reason: "no recognition engine in this environment".to_string(),
            },
        }
    }

    #[must_use]
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available(_))
    }

    /// The capture adapter, or the explanatory error when there is none.
    ///
    /// # Errors
    /// Returns [`SpeechError::Unavailable`] when no engine was detected.
    pub fn capture(&self) -> Result<&SpeechCapture, SpeechError> {
        match self {
            Self::Available(capture) => Ok(capture),
            Self::Unavailable { reason } => Err(SpeechError::Unavailable(reason.clone())),
        }
    }
}
