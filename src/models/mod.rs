pub mod document;
pub mod history;
pub mod question;

pub use document::DocumentKind;
pub use history::{HistoryEntry, NewHistoryEntry};
pub use question::{score, Question, RawQuestion, OPTION_COUNT};
