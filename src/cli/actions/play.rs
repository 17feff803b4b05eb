//! Terminal quiz: typed lines stand in for speech.

use crate::{
    cli::actions::server::startup_message,
    quiz::{FlowError, Phase, QuestionSet, QuestionSource, QuizEvent, QuizState, Summary},
    speech::{
        Capability, CaptureConfig, CaptureOutcome, CaptureSlot, LineEngine, RecognitionEngine,
        SlotRequest, SpeechCapture, NO_SPEECH_MESSAGE, UNSUPPORTED_MESSAGE,
    },
};
use anyhow::{anyhow, bail, Context, Result};
use std::{future::Future, io::Write, sync::Arc, time::Duration};
use tracing::{debug, info, warn};

/// Consecutive captures without a transcript before a question is given up.
const MAX_ATTEMPTS: usize = 3;

#[derive(Debug)]
pub struct Args {
    pub questions: QuestionSource,
    pub shuffle: bool,
    pub silence_timeout: Duration,
    pub no_speech_after: Duration,
}

/// Execute the play action.
/// # Errors
/// Returns an error if the questions cannot be loaded or no answer can be captured.
pub async fn execute(args: Args) -> Result<()> {
    info!(
        "{}",
        startup_message(
            "Terminal quiz",
            &[
                ("questions", args.questions.to_string()),
                ("shuffle", args.shuffle.to_string()),
                (
                    "silence_timeout",
                    format!("{}ms", args.silence_timeout.as_millis())
                ),
            ],
        )
    );

    let questions = args
        .questions
        .load()
        .await
        .with_context(|| format!("Could not load questions from {}", args.questions))?;

    let engine: Arc<dyn RecognitionEngine> = Arc::new(LineEngine::stdin(args.no_speech_after));
    let capability = Capability::detect(
        Some(engine),
        CaptureConfig {
            silence_timeout: args.silence_timeout,
        },
    );

    let mut out = std::io::stdout();
    let interrupt = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for ctrl-c: {err}");
            std::future::pending::<()>().await;
        }
    };
    play_until(&mut out, &capability, questions, args.shuffle, interrupt)
        .await
        .map(|_| ())
}

/// Run [`play`] until `interrupt` resolves.
///
/// Dropping the quiz drops the running capture, which cancels it.
///
/// # Errors
/// Returns an error when the quiz fails or is interrupted.
pub async fn play_until<W, F>(
    out: &mut W,
    capability: &Capability,
    questions: QuestionSet,
    shuffle: bool,
    interrupt: F,
) -> Result<Summary>
where
    W: Write,
    F: Future<Output = ()>,
{
    let finished = tokio::select! {
        summary = play(&mut *out, capability, questions, shuffle) => Some(summary),
        () = interrupt => None,
    };

    match finished {
        Some(summary) => summary,
        None => {
            writeln!(out)?;
            info!("quiz interrupted");
            bail!("quiz interrupted")
        }
    }
}

/// Run one full quiz, writing the screens to `out`.
///
/// Every question is asked until a transcript is captured, at most
/// [`MAX_ATTEMPTS`] times in a row. The answer is evaluated, shown, and the
/// quiz moves on; the summary is printed once the last question is done.
///
/// # Errors
/// Returns an error when speech capture is unavailable, when writing fails, or
/// when a question gets no transcript.
pub async fn play<W: Write>(
    out: &mut W,
    capability: &Capability,
    questions: QuestionSet,
    shuffle: bool,
) -> Result<Summary> {
    let capture = match capability.capture() {
        Ok(capture) => capture,
        Err(err) => {
            writeln!(out, "{UNSUPPORTED_MESSAGE}")?;
            return Err(err.into());
        }
    };

    writeln!(
        out,
        "Speech Quiz: {} questions. Type your answer; a blank line or a pause submits it.",
        questions.len()
    )?;

    let mut slot = CaptureSlot::new();
    let mut state = QuizState::new().apply(QuizEvent::Begin { questions, shuffle })?;

    while state.phase() == Phase::Quiz {
        let progress = state.progress();
        let question = state
            .current_question()
            .map(|question| question.question.clone())
            .ok_or_else(|| anyhow!("no question at index {}", state.current_index()))?;

        writeln!(out, "\nQuestion {} of {}", progress.current + 1, progress.total)?;
        writeln!(out, "{question}")?;
        out.flush()?;

        state = answer(out, &mut slot, capture, &state).await?;

        if let Some(result) = state.current_result() {
            if result.correct {
                writeln!(out, "Correct! You said: \"{}\"", result.spoken)?;
            } else {
                writeln!(
                    out,
                    "Incorrect. You said: \"{}\". The answer is: {}",
                    result.spoken, result.answer
                )?;
            }
        }

        state = state.apply(QuizEvent::Advance)?;
    }

    let summary = Summary::from_state(&state)
        .ok_or_else(|| anyhow!("quiz ended outside the result phase"))?;
    write_summary(out, &summary)?;
    Ok(summary)
}

async fn answer<W: Write>(
    out: &mut W,
    slot: &mut CaptureSlot,
    capture: &SpeechCapture,
    state: &QuizState,
) -> Result<QuizState> {
    for attempt in 1..=MAX_ATTEMPTS {
        write!(out, "> ")?;
        out.flush()?;

        let handle = match slot.request(capture)? {
            SlotRequest::Started(handle) => handle,
            SlotRequest::StoppedActive => {
                debug!("stopped a capture left running");
                continue;
            }
        };

        match handle.outcome().await {
            CaptureOutcome::Transcript(spoken) => {
                match state.apply(QuizEvent::Answer { spoken }) {
                    Ok(next) => return Ok(next),
                    Err(FlowError::NoSpeech) => writeln!(out, "{NO_SPEECH_MESSAGE}")?,
                    Err(err) => return Err(err.into()),
                }
            }
            CaptureOutcome::NoSpeech => writeln!(out, "{NO_SPEECH_MESSAGE}")?,
            CaptureOutcome::Cancelled => writeln!(out, "(cancelled, try again)")?,
            CaptureOutcome::Failed(reason) => {
                warn!("speech capture failed on attempt {attempt}: {reason}");
                writeln!(out, "Speech recognition error: {reason}")?;
            }
        }
    }

    bail!(
        "no answer captured for question {} after {MAX_ATTEMPTS} attempts",
        state.current_index() + 1
    )
}

fn write_summary<W: Write>(out: &mut W, summary: &Summary) -> Result<()> {
    writeln!(out, "\n{}", summary.heading)?;
    writeln!(
        out,
        "You scored {} / {} ({}%)",
        summary.score, summary.total, summary.percent
    )?;

    if !summary.missed.is_empty() {
        writeln!(out, "\nMissed:")?;
        for missed in &summary.missed {
            writeln!(
                out,
                "  {} -> {} (you said \"{}\")",
                missed.question, missed.answer, missed.spoken
            )?;
        }
    }
    out.flush()?;
    Ok(())
}
