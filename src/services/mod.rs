pub mod extractor;
pub mod history_store;
pub mod llm_service;
pub mod quiz_parser;

pub use extractor::{extract_document, extract_file};
pub use history_store::{FileStore, HistoryStore, KeyValueStore, MemoryStore};
pub use llm_service::{LlmService, QuizGenerator};
