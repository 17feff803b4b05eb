//! Quiz core: pure functions and the flow state machine.

pub mod evaluate;
pub mod flow;
pub mod normalize;
pub mod question;
pub mod summary;

pub use self::evaluate::is_correct;
pub use self::flow::{AnswerResult, FlowError, Phase, Progress, QuizEvent, QuizState};
pub use self::normalize::normalize;
pub use self::question::{Question, QuestionSet, QuestionSetError, QuestionSource};
pub use self::summary::{Grade, Summary};
