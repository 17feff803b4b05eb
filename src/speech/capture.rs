use super::{CaptureOutcome, RecognitionEngine, RecognitionEvent, RecognitionSession, SpeechError};
use std::{fmt, sync::Arc, time::Duration};
use tokio::{
    sync::{mpsc, oneshot, watch},
    time::{sleep, Instant},
};
use tracing::{debug, instrument, warn};

pub const DEFAULT_SILENCE_TIMEOUT: Duration = Duration::from_millis(1500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureConfig {
    /// Quiet period after the last final fragment that ends the capture.
    pub silence_timeout: Duration,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            silence_timeout: DEFAULT_SILENCE_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Control {
    Stop,
    Cancel,
}

/// Starts captures on a recognition engine.
#[derive(Clone)]
pub struct SpeechCapture {
    engine: Arc<dyn RecognitionEngine>,
    config: CaptureConfig,
}

impl fmt::Debug for SpeechCapture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpeechCapture")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SpeechCapture {
    #[must_use]
    pub fn new(engine: Arc<dyn RecognitionEngine>, config: CaptureConfig) -> Self {
        Self { engine, config }
    }

    #[must_use]
    pub fn config(&self) -> CaptureConfig {
        self.config
    }

    /// Start listening. The returned handle yields exactly one outcome.
    ///
    /// # Errors
    /// Returns an error if the engine refuses to start.
    #[instrument(skip(self), fields(silence_timeout = ?self.config.silence_timeout))]
    pub fn start(&self) -> Result<CaptureHandle, SpeechError> {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let session = self.engine.recognize(events_tx)?;

        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let (outcome_tx, outcome_rx) = oneshot::channel();
        let (live_tx, live_rx) = watch::channel(String::new());

        let timeout = self.config.silence_timeout;
        tokio::spawn(async move {
            let outcome = run(session, events_rx, control_rx, live_tx, timeout).await;
            debug!("capture finished: {:?}", outcome);
            let _ = outcome_tx.send(outcome);
        });

        Ok(CaptureHandle {
            controller: CaptureController { control: control_tx },
            outcome: outcome_rx,
            live: live_rx,
        })
    }
}

/// Cloneable remote for a running capture.
#[derive(Debug, Clone)]
pub struct CaptureController {
    control: mpsc::UnboundedSender<Control>,
}

impl CaptureController {
    /// Finish now and keep what was recognized.
    pub fn stop(&self) {
        let _ = self.control.send(Control::Stop);
    }

    /// Finish now and discard the partial transcript.
    pub fn cancel(&self) {
        let _ = self.control.send(Control::Cancel);
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.control.is_closed()
    }
}

#[derive(Debug)]
pub struct CaptureHandle {
    controller: CaptureController,
    outcome: oneshot::Receiver<CaptureOutcome>,
    live: watch::Receiver<String>,
}

impl CaptureHandle {
    #[must_use]
    pub fn controller(&self) -> CaptureController {
        self.controller.clone()
    }

    pub fn stop(&self) {
        self.controller.stop();
    }

    pub fn cancel(&self) {
        self.controller.cancel();
    }

    /// Final fragments followed by the latest interim fragment, for display.
    #[must_use]
    pub fn live(&self) -> watch::Receiver<String> {
        self.live.clone()
    }

    /// Wait for the capture to finish.
    pub async fn outcome(self) -> CaptureOutcome {
        self.outcome
            .await
            .unwrap_or_else(|_| CaptureOutcome::Failed("capture task ended unexpectedly".to_string()))
    }
}

async fn run(
    mut session: Box<dyn RecognitionSession>,
    mut events: mpsc::UnboundedReceiver<RecognitionEvent>,
    mut control: mpsc::UnboundedReceiver<Control>,
    live: watch::Sender<String>,
    timeout: Duration,
) -> CaptureOutcome {
    let mut finals = String::new();
    let silence = sleep(timeout);
    tokio::pin!(silence);
    let mut armed = false;

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(RecognitionEvent::Fragment { text, is_final }) => {
                    let interim = if is_final {
                        finals.push_str(&text);
                        ""
                    } else {
                        text.as_str()
                    };
                    let _ = live.send(format!("{finals}{interim}"));

                    armed = !finals.is_empty();
                    if armed {
                        silence.as_mut().reset(Instant::now() + timeout);
                    }
                }
                Some(RecognitionEvent::NoSpeech) => return CaptureOutcome::NoSpeech,
                Some(RecognitionEvent::Error(message)) => {
                    warn!("speech engine error: {message}");
                    return match finalize(&finals) {
                        CaptureOutcome::NoSpeech => CaptureOutcome::Failed(message),
                        outcome => outcome,
                    };
                }
                Some(RecognitionEvent::End) | None => return finalize(&finals),
            },

            () = &mut silence, if armed => {
                debug!("silence timeout reached");
                session.stop();
                return finalize(&finals);
            }

            request = control.recv() => match request {
                Some(Control::Stop) => {
                    session.stop();
                    return finalize(&finals);
                }
                Some(Control::Cancel) | None => {
                    session.abort();
                    return CaptureOutcome::Cancelled;
                }
            },
        }
    }
}

fn finalize(finals: &str) -> CaptureOutcome {
    let spoken = finals.trim();
    if spoken.is_empty() {
        CaptureOutcome::NoSpeech
    } else {
        CaptureOutcome::Transcript(spoken.to_string())
    }
}

/// What happened when a capture was requested on a [`CaptureSlot`].
#[derive(Debug)]
pub enum SlotRequest {
    Started(CaptureHandle),
    /// A capture was already running and has been asked to stop.
    StoppedActive,
}

/// At most one capture at a time. Requesting a capture while one is running
/// stops the running one instead of starting a second.
#[derive(Debug, Default)]
pub struct CaptureSlot {
    active: Option<CaptureController>,
}

impl CaptureSlot {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// # Errors
    /// Returns an error if a new capture cannot be started.
    pub fn request(&mut self, capture: &SpeechCapture) -> Result<SlotRequest, SpeechError> {
        if let Some(active) = self.active.as_ref().filter(|active| !active.is_finished()) {
            active.stop();
            self.active = None;
            return Ok(SlotRequest::StoppedActive);
        }

        let handle = capture.start()?;
        self.active = Some(handle.controller());
        Ok(SlotRequest::Started(handle))
    }

    /// Cancel the running capture, if any.
    pub fn cancel(&mut self) {
        if let Some(active) = self.active.take() {
            active.cancel();
        }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.as_ref().is_some_and(|active| !active.is_finished())
    }
}
