//! Quiz flow state machine.
//!
//! A quiz run moves through three phases:
//!
//! ```text
//!   start --Begin--> quiz --Advance (last question)--> result
//!     ^               |  \__Answer / Advance__/          |
//!     |               |                                  |
//!     +----Restart----+------------Restart---------------+
//! ```
//!
//! [`QuizState::apply`] is a pure transition: it never mutates the current
//! state and returns either the next state or the reason the event was
//! rejected. Callers keep the previous state on error.

use super::{evaluate::is_correct, question::Question, QuestionSet};
use rand::{seq::SliceRandom, Rng};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Start,
    Quiz,
    Result,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Start => "start",
            Self::Quiz => "quiz",
            Self::Result => "result",
        };
        f.write_str(name)
    }
}

/// Outcome of one answered question. Never changed once recorded.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AnswerResult {
    pub question: String,
    pub answer: String,
    pub spoken: String,
    pub correct: bool,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub current: usize,
    pub total: usize,
}

#[derive(Debug, Clone)]
pub enum QuizEvent {
    Begin { questions: QuestionSet, shuffle: bool },
    Answer { spoken: String },
    Advance,
    Restart,
}

impl QuizEvent {
    fn action(&self) -> &'static str {
        match self {
            Self::Begin { .. } => "begin",
            Self::Answer { .. } => "answer",
            Self::Advance => "advance",
            Self::Restart => "restart",
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FlowError {
    #[error("cannot {action} while in the {phase} phase")]
    WrongPhase { phase: Phase, action: &'static str },
    #[error("no speech detected, try again")]
    NoSpeech,
    #[error("question {0} was already answered")]
    AlreadyAnswered(usize),
    #[error("question {0} has not been answered yet")]
    NotAnswered(usize),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuizState {
    phase: Phase,
    questions: Vec<Question>,
    current_index: usize,
    score: usize,
    results: Vec<AnswerResult>,
}

impl QuizState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply an event using the thread-local random source for shuffling.
    ///
    /// # Errors
    /// Returns a [`FlowError`] when the event is not valid in the current state.
    pub fn apply(&self, event: QuizEvent) -> Result<Self, FlowError> {
        self.apply_with_rng(event, &mut rand::thread_rng())
    }

    /// Apply an event with an explicit random source.
    ///
    /// # Errors
    /// Returns a [`FlowError`] when the event is not valid in the current state.
    pub fn apply_with_rng<R: Rng + ?Sized>(
        &self,
        event: QuizEvent,
        rng: &mut R,
    ) -> Result<Self, FlowError> {
        match (self.phase, event) {
            (Phase::Start, QuizEvent::Begin { questions, shuffle }) => {
                let mut questions = questions.into_inner();
                if shuffle {
                    questions.shuffle(rng);
                }
                Ok(Self {
                    phase: Phase::Quiz,
                    questions,
                    current_index: 0,
                    score: 0,
                    results: Vec::new(),
                })
            }

            (Phase::Quiz, QuizEvent::Answer { spoken }) => {
                if self.is_answered() {
                    return Err(FlowError::AlreadyAnswered(self.current_index));
                }

                let spoken = spoken.trim();
                if spoken.is_empty() {
                    return Err(FlowError::NoSpeech);
                }

                let Some(question) = self.current_question() else {
                    return Err(FlowError::WrongPhase {
                        phase: self.phase,
                        action: "answer",
                    });
                };

                let correct = is_correct(spoken, &question.accepted_keywords());
                let result = AnswerResult {
                    question: question.question.clone(),
                    answer: question.answer.clone(),
                    spoken: spoken.to_string(),
                    correct,
                };

                let mut next = self.clone();
                next.results.push(result);
                if correct {
                    next.score += 1;
                }
                Ok(next)
            }

            (Phase::Quiz, QuizEvent::Advance) => {
                if !self.is_answered() {
                    return Err(FlowError::NotAnswered(self.current_index));
                }

                let mut next = self.clone();
                if self.current_index + 1 < self.questions.len() {
                    next.current_index += 1;
                } else {
                    next.phase = Phase::Result;
                }
                Ok(next)
            }

            (_, QuizEvent::Restart) => Ok(Self::new()),

            (phase, event) => Err(FlowError::WrongPhase {
                phase,
                action: event.action(),
            }),
        }
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    #[must_use]
    pub fn score(&self) -> usize {
        self.score
    }

    #[must_use]
    pub fn results(&self) -> &[AnswerResult] {
        &self.results
    }

    /// The question being asked, only during the quiz phase.
    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        if self.phase == Phase::Quiz {
            self.questions.get(self.current_index)
        } else {
            None
        }
    }

    /// Whether the current question already has a recorded result.
    #[must_use]
    pub fn is_answered(&self) -> bool {
        self.results.len() > self.current_index
    }

    /// Result recorded for the current question, if any.
    #[must_use]
    pub fn current_result(&self) -> Option<&AnswerResult> {
        if self.phase == Phase::Quiz {
            self.results.get(self.current_index)
        } else {
            None
        }
    }

    #[must_use]
    pub fn is_last_question(&self) -> bool {
        self.current_index + 1 >= self.questions.len()
    }

    #[must_use]
    pub fn progress(&self) -> Progress {
        match self.phase {
            Phase::Start => Progress {
                current: 0,
                total: 0,
            },
            Phase::Quiz => Progress {
                current: self.current_index,
                total: self.questions.len(),
            },
            Phase::Result => Progress {
                current: self.questions.len(),
                total: self.questions.len(),
            },
        }
    }
}
