//! 测验流程 - 流程层
//!
//! 核心职责：把状态机、生成能力和历史记录串起来
//!
//! 流程顺序：
//! 1. submit → LLM 生成 → active / configuring
//! 2. 答题 → finish → 写入历史记录
//! 3. restart 或打开历史记录

use std::future::Future;

use tracing::{debug, warn};

use crate::error::{GenerationError, SessionError};
use crate::models::history::HistoryEntry;
use crate::services::history_store::{HistoryStore, KeyValueStore, MAX_HISTORY_ENTRIES};
use crate::services::llm_service::QuizGenerator;
use crate::workflow::quiz_session::{GenerationOutcome, QuizSession};

/// 测验流程
///
/// - 持有会话状态机、生成能力和历史记录
/// - 交卷是唯一写入历史记录的地方
/// - 打开历史记录不会重复写入
/// - 历史记录只在创建时读取一次，之后由追加和清空同步维护
pub struct QuizFlow<G: QuizGenerator, S: KeyValueStore> {
    generator: G,
    history: HistoryStore<S>,
    entries: Vec<HistoryEntry>,
    session: QuizSession,
}

impl<G: QuizGenerator, S: KeyValueStore> QuizFlow<G, S> {
    /// 创建新的测验流程
    pub fn new(generator: G, history: HistoryStore<S>) -> Self {
        let entries = history.read();
        debug!("已加载 {} 条历史记录", entries.len());
        Self {
            generator,
            history,
            entries,
            session: QuizSession::new(),
        }
    }

    /// 会话状态机
    pub fn session(&self) -> &QuizSession {
        &self.session
    }

    /// 会话状态机（答题操作）
    pub fn session_mut(&mut self) -> &mut QuizSession {
        &mut self.session
    }

    /// 生成能力
    pub fn generator(&self) -> &G {
        &self.generator
    }

    /// 提交输入并等待生成完成
    pub async fn generate(
        &mut self,
        context: &str,
        num_questions: usize,
    ) -> Result<GenerationOutcome, SessionError> {
        self.generate_until(context, num_questions, std::future::pending())
            .await
    }

    /// 提交输入并等待生成完成，`cancel` 先完成时取消本次生成
    pub async fn generate_until<C>(
        &mut self,
        context: &str,
        num_questions: usize,
        cancel: C,
    ) -> Result<GenerationOutcome, SessionError>
    where
        C: Future<Output = ()>,
    {
        let ticket = self.session.submit(context, num_questions)?;

        let result = tokio::select! {
            result = self.generator.generate(context, num_questions) => result,
            _ = cancel => {
                warn!("用户取消了生成");
                Err(GenerationError::Cancelled)
            }
        };

        Ok(self.session.complete_generation(ticket, result))
    }

    /// 交卷并保存历史记录
    pub fn finish(&mut self) -> Result<HistoryEntry, SessionError> {
        let data = self.session.finish()?;
        let entry = self.history.append(data);
        self.entries.insert(0, entry.clone());
        self.entries.truncate(MAX_HISTORY_ENTRIES);
        Ok(entry)
    }

    /// 重新开始
    pub fn restart(&mut self) -> Result<(), SessionError> {
        self.session.restart()
    }

    /// 历史记录（新的在前）
    pub fn history(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// 打开 `history()` 中第 `index` 条记录（从 0 开始）
    pub fn open_history(&mut self, index: usize) -> Result<(), SessionError> {
        let entry = self
            .entries
            .get(index)
            .ok_or(SessionError::HistoryEntryNotFound(index + 1))?;
        self.session.open_history(entry)
    }

    /// 清空历史记录
    pub fn clear_history(&mut self) {
        debug!("清空历史记录");
        self.history.clear();
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::question::Question;
    use crate::error::HistoryError;
    use crate::services::history_store::MemoryStore;
    use crate::workflow::quiz_session::QuizState;
    use futures::future::BoxFuture;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// 记录调用参数并返回固定结果的生成器
    struct MockGenerator {
        calls: Mutex<Vec<(String, usize)>>,
        result: Result<Vec<Question>, GenerationError>,
    }

    impl MockGenerator {
        fn returning(result: Result<Vec<Question>, GenerationError>) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                result,
            }
        }

        fn calls(&self) -> Vec<(String, usize)> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl QuizGenerator for MockGenerator {
        fn generate<'a>(
            &'a self,
            context: &'a str,
            num_questions: usize,
        ) -> BoxFuture<'a, Result<Vec<Question>, GenerationError>> {
            self.calls
                .lock()
                .unwrap()
                .push((context.to_string(), num_questions));
            let result = self.result.clone();
            Box::pin(async move { result })
        }
    }

    /// 永远不会完成的生成器
    struct HangingGenerator;

    impl QuizGenerator for HangingGenerator {
        fn generate<'a>(
            &'a self,
            _context: &'a str,
            _num_questions: usize,
        ) -> BoxFuture<'a, Result<Vec<Question>, GenerationError>> {
            Box::pin(std::future::pending())
        }
    }

    /// 统计读取次数的内存存储，写入可以被关闭
    struct CountingStore {
        inner: MemoryStore,
        reads: Arc<AtomicUsize>,
        writable: bool,
    }

    impl KeyValueStore for CountingStore {
        fn get(&self, key: &str) -> Result<Option<String>, HistoryError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<(), HistoryError> {
            if !self.writable {
                return Err(HistoryError::WriteFailed {
                    key: key.to_string(),
                    source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
                });
            }
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> Result<(), HistoryError> {
            self.inner.remove(key)
        }
    }

    async fn finish_quiz<S: KeyValueStore>(flow: &mut QuizFlow<MockGenerator, S>, topic: &str) {
        flow.generate(topic, 3).await.unwrap();
        flow.session_mut().advance().unwrap();
        flow.session_mut().advance().unwrap();
        flow.finish().unwrap();
        flow.restart().unwrap();
    }

    fn three_questions() -> Vec<Question> {
        vec![
            Question::new(
                "What do plants need for photosynthesis?",
                vec!["Sunlight".into(), "Darkness".into(), "Salt".into(), "Sand".into()],
                "Sunlight",
            )
            .unwrap(),
            Question::new(
                "Which pigment is green?",
                vec!["Melanin".into(), "Chlorophyll".into(), "Keratin".into(), "Heme".into()],
                "Chlorophyll",
            )
            .unwrap(),
            Question::new(
                "Which gas is released?",
                vec!["CO2".into(), "N2".into(), "O2".into(), "He".into()],
                "O2",
            )
            .unwrap(),
        ]
    }

    fn flow_with(result: Result<Vec<Question>, GenerationError>) -> QuizFlow<MockGenerator, MemoryStore> {
        QuizFlow::new(
            MockGenerator::returning(result),
            HistoryStore::new(MemoryStore::new()),
        )
    }

    #[tokio::test]
    async fn test_generator_receives_exact_context_and_count() {
        let mut flow = flow_with(Ok(three_questions()));

        let outcome = flow.generate("Photosynthesis", 3).await.unwrap();

        assert_eq!(outcome, GenerationOutcome::Ready { count: 3 });
        assert_eq!(flow.generator().calls(), vec![("Photosynthesis".to_string(), 3)]);
        match flow.session().state() {
            QuizState::Active(active) => assert_eq!(active.tracker().answers(), &[None, None, None]),
            other => panic!("unexpected state: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_all_correct_is_saved_as_newest_entry() {
        let mut flow = flow_with(Ok(three_questions()));
        flow.generate("Photosynthesis", 3).await.unwrap();

        // 正确答案分别是 A、B、C
        for (i, option) in [0, 1, 2].into_iter().enumerate() {
            flow.session_mut().select_option(option).unwrap();
            if i < 2 {
                flow.session_mut().advance().unwrap();
            }
        }

        let saved = flow.finish().unwrap();
        assert_eq!(saved.score, 3);

        let history = flow.history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].id, saved.id);
        assert_eq!(history[0].score, 3);
        assert_eq!(history[0].context_topic, "Photosynthesis");
    }

    #[tokio::test]
    async fn test_generation_error_returns_to_configuring() {
        let mut flow = flow_with(Err(GenerationError::EmptyQuiz));
        let outcome = flow.generate("Obscure topic", 2).await.unwrap();

        assert!(matches!(outcome, GenerationOutcome::Failed { .. }));
        assert_eq!(
            flow.session().error(),
            Some("The generated quiz is empty. Please try a different topic.")
        );
    }

    #[tokio::test]
    async fn test_invalid_input_never_calls_generator() {
        let mut flow = flow_with(Ok(three_questions()));
        assert!(flow.generate("", 3).await.is_err());
        assert!(flow.generator().calls().is_empty());
        assert_eq!(flow.session().state().name(), "configuring");
    }

    #[tokio::test]
    async fn test_cancel_returns_to_configuring() {
        let mut flow = QuizFlow::new(HangingGenerator, HistoryStore::new(MemoryStore::new()));
        let outcome = flow
            .generate_until("topic", 3, async {})
            .await
            .unwrap();

        assert_eq!(
            outcome,
            GenerationOutcome::Failed {
                message: "Quiz generation was cancelled.".to_string()
            }
        );
        assert_eq!(flow.session().state().name(), "configuring");
    }

    #[test]
    fn test_hanging_generation_stays_pending() {
        let mut flow = QuizFlow::new(HangingGenerator, HistoryStore::new(MemoryStore::new()));
        {
            let mut generation = tokio_test::task::spawn(flow.generate("topic", 3));
            tokio_test::assert_pending!(generation.poll());
        }
        assert_eq!(flow.session().state().name(), "generating");
    }

    #[tokio::test]
    async fn test_replay_does_not_append() {
        let mut flow = flow_with(Ok(three_questions()));
        flow.generate("Photosynthesis", 3).await.unwrap();
        flow.session_mut().advance().unwrap();
        flow.session_mut().advance().unwrap();
        flow.finish().unwrap();

        flow.open_history(0).unwrap();
        flow.open_history(0).unwrap();
        assert_eq!(flow.history().len(), 1);

        match flow.session().state() {
            QuizState::Finished(finished) => {
                assert_eq!(finished.score, 0);
                assert!(finished.history_id.is_some());
            }
            other => panic!("unexpected state: {:?}", other),
        }

        assert_eq!(
            flow.open_history(5).unwrap_err(),
            SessionError::HistoryEntryNotFound(6)
        );
    }

    #[tokio::test]
    async fn test_restart_and_clear_history() {
        let mut flow = flow_with(Ok(three_questions()));
        flow.generate("Photosynthesis", 3).await.unwrap();
        flow.session_mut().advance().unwrap();
        flow.session_mut().advance().unwrap();
        flow.finish().unwrap();

        flow.restart().unwrap();
        assert_eq!(flow.session().state().name(), "configuring");

        flow.clear_history();
        assert!(flow.history().is_empty());
    }

    #[tokio::test]
    async fn test_history_is_read_once_and_indexed_as_listed() {
        let reads = Arc::new(AtomicUsize::new(0));
        let store = CountingStore {
            inner: MemoryStore::new(),
            reads: reads.clone(),
            writable: true,
        };
        let mut flow = QuizFlow::new(
            MockGenerator::returning(Ok(three_questions())),
            HistoryStore::new(store),
        );
        assert_eq!(reads.load(Ordering::SeqCst), 1);

        finish_quiz(&mut flow, "older").await;
        finish_quiz(&mut flow, "newer").await;
        let reads_after_saves = reads.load(Ordering::SeqCst);

        let listed: Vec<&str> = flow.history().iter().map(|e| e.context_topic.as_str()).collect();
        assert_eq!(listed, vec!["newer", "older"]);

        flow.open_history(1).unwrap();
        match flow.session().state() {
            QuizState::Finished(finished) => assert_eq!(finished.context, "older"),
            other => panic!("unexpected state: {:?}", other),
        }
        assert_eq!(reads.load(Ordering::SeqCst), reads_after_saves);

        flow.clear_history();
        assert!(flow.history().is_empty());
        assert_eq!(
            flow.open_history(0).unwrap_err(),
            SessionError::HistoryEntryNotFound(1)
        );
    }

    #[tokio::test]
    async fn test_unsaved_entry_still_listed_for_session() {
        let store = CountingStore {
            inner: MemoryStore::new(),
            reads: Arc::new(AtomicUsize::new(0)),
            writable: false,
        };
        let mut flow = QuizFlow::new(
            MockGenerator::returning(Ok(three_questions())),
            HistoryStore::new(store),
        );

        finish_quiz(&mut flow, "not persisted").await;
        assert_eq!(flow.history().len(), 1);
        assert_eq!(flow.history()[0].context_topic, "not persisted");
    }
}
