//! Line-based recognition engine for terminals.
//!
//! Every non-blank line typed by the user is treated as a final fragment of
//! speech. A blank line ends the recognition, as does end of input. When
//! nothing is typed for `no_speech_after`, the engine reports no speech.

use super::{RecognitionEngine, RecognitionEvent, RecognitionSession, SpeechError};
use std::{io::BufRead, sync::Arc, thread, time::Duration};
use tokio::{
    sync::{mpsc, Mutex},
    task::JoinHandle,
    time::timeout,
};
use tracing::debug;

pub const DEFAULT_NO_SPEECH_AFTER: Duration = Duration::from_secs(8);

pub struct LineEngine {
    lines: Arc<Mutex<mpsc::UnboundedReceiver<String>>>,
    no_speech_after: Duration,
}

impl LineEngine {
    #[must_use]
    pub fn new(lines: mpsc::UnboundedReceiver<String>, no_speech_after: Duration) -> Self {
        Self {
            lines: Arc::new(Mutex::new(lines)),
            no_speech_after,
        }
    }

    /// Read lines from the process standard input.
    ///
    /// Reading happens on a plain thread so a pending read never holds the
    /// runtime open at exit.
    #[must_use]
    pub fn stdin(no_speech_after: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        thread::spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
            debug!("stdin closed");
        });
        Self::new(rx, no_speech_after)
    }
}

struct LineSession {
    task: JoinHandle<()>,
}

impl RecognitionSession for LineSession {
    fn stop(&mut self) {
        self.task.abort();
    }

    fn abort(&mut self) {
        self.task.abort();
    }
}

impl RecognitionEngine for LineEngine {
    fn recognize(
        &self,
        events: mpsc::UnboundedSender<RecognitionEvent>,
    ) -> Result<Box<dyn RecognitionSession>, SpeechError> {
        let lines = self.lines.clone();
        let no_speech_after = self.no_speech_after;

        let task = tokio::spawn(async move {
            let mut lines = lines.lock().await;
            let mut heard = false;

            loop {
                let next = if heard {
                    lines.recv().await
                } else {
                    match timeout(no_speech_after, lines.recv()).await {
                        Ok(line) => line,
                        Err(_) => {
                            let _ = events.send(RecognitionEvent::NoSpeech);
                            return;
                        }
                    }
                };

                let Some(line) = next else {
                    let _ = events.send(RecognitionEvent::End);
                    return;
                };

                let text = line.trim();
                if text.is_empty() {
                    let _ = events.send(RecognitionEvent::End);
                    return;
                }

                heard = true;
                let fragment = RecognitionEvent::Fragment {
                    text: format!("{text} "),
                    is_final: true,
                };
                if events.send(fragment).is_err() {
                    return;
                }
            }
        });

        Ok(Box::new(LineSession { task }))
    }
}
