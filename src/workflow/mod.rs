pub mod answer_tracker;
pub mod input_form;
pub mod quiz_flow;
pub mod quiz_session;

pub use answer_tracker::AnswerTracker;
pub use input_form::{InputForm, InputMode};
pub use quiz_flow::QuizFlow;
pub use quiz_session::{
    ActiveQuiz, FinishedQuiz, GenerationOutcome, GenerationTicket, QuizSession, QuizState,
};
