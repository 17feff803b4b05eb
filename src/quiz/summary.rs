use super::flow::{AnswerResult, Phase, QuizState};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Grade {
    Excellent,
    NotBad,
    KeepPractising,
}

impl Grade {
    #[must_use]
    pub fn from_percent(percent: usize) -> Self {
        if percent >= 80 {
            Self::Excellent
        } else if percent >= 50 {
            Self::NotBad
        } else {
            Self::KeepPractising
        }
    }

    #[must_use]
    pub fn heading(self) -> &'static str {
        match self {
            Self::Excellent => "Excellent work!",
            Self::NotBad => "Not bad!",
            Self::KeepPractising => "Keep practising!",
        }
    }
}

/// Final score of a finished run.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub score: usize,
    pub total: usize,
    pub percent: usize,
    pub grade: Grade,
    pub heading: String,
    pub missed: Vec<AnswerResult>,
}

impl Summary {
    /// Summarize a run; `None` until the result phase is reached.
    #[must_use]
    pub fn from_state(state: &QuizState) -> Option<Self> {
        if state.phase() != Phase::Result {
            return None;
        }

        let total = state.questions().len();
        let score = state.score();
        let percent = rounded_percent(score, total);
        let grade = Grade::from_percent(percent);

        Some(Self {
            score,
            total,
            percent,
            grade,
            heading: grade.heading().to_string(),
            missed: state
                .results()
                .iter()
                .filter(|result| !result.correct)
                .cloned()
                .collect(),
        })
    }
}

// Half-up rounding of score / total * 100 without floats.
fn rounded_percent(score: usize, total: usize) -> usize {
    if total == 0 {
        return 0;
    }
    (200 * score + total) / (2 * total)
}
