//! 测验生命周期状态机
//!
//! ```text
//! configuring ──submit──▶ generating ──成功──▶ active ──finish──▶ finished
//!      ▲                     │  ▲                                   │
//!      └──────失败/取消───────┘  └─submit(取代旧请求)                 │
//!      └─────────────────────────restart────────────────────────────┘
//! configuring / finished ──open_history──▶ finished
//! ```
//!
//! 状态机本身不做 IO：生成请求由调用方发起，结果通过 `complete_generation` 回传；
//! `finish` 返回待保存的历史记录，由流程层写入

use tracing::{debug, info, warn};

use crate::config::{MAX_QUESTIONS, MIN_QUESTIONS};
use crate::error::{GenerationError, InputError, SessionError};
use crate::models::history::{HistoryEntry, NewHistoryEntry};
use crate::models::question::{score, Question};
use crate::workflow::answer_tracker::AnswerTracker;

/// 生成请求的票据
///
/// 每次 submit 都会签发新票据，只有最新票据的结果会被接受
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GenerationTicket(u64);

/// 答题中的测验
///
/// 答题记录的数量始终等于题目数量，只能通过 `new` 构造
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveQuiz {
    context: String,
    questions: Vec<Question>,
    tracker: AnswerTracker,
}

impl ActiveQuiz {
    /// 创建答题状态，题目列表为空时返回 `None`
    pub fn new(context: impl Into<String>, questions: Vec<Question>) -> Option<Self> {
        if questions.is_empty() {
            return None;
        }
        Some(Self {
            context: context.into(),
            tracker: AnswerTracker::new(questions.len()),
            questions,
        })
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    /// 当前位置和答案
    pub fn tracker(&self) -> &AnswerTracker {
        &self.tracker
    }

    /// 当前题目
    pub fn current_question(&self) -> &Question {
        &self.questions[self.tracker.current_index()]
    }

    /// 为当前题目选择第 `index` 个选项（0 对应 A）
    pub fn select_option(&mut self, index: usize) -> Result<(), SessionError> {
        let options = self.current_question().options();
        let option = options
            .get(index)
            .cloned()
            .ok_or(SessionError::OptionOutOfRange {
                index,
                count: options.len(),
            })?;
        self.tracker.select(option);
        Ok(())
    }
}

/// 已完成的测验（刚交卷或从历史记录打开）
#[derive(Debug, Clone, PartialEq)]
pub struct FinishedQuiz {
    pub context: String,
    pub questions: Vec<Question>,
    pub answers: Vec<Option<String>>,
    pub score: usize,
    /// 从历史记录打开时为对应记录的 id
    pub history_id: Option<String>,
}

impl FinishedQuiz {
    /// 得分百分比（四舍五入）
    pub fn percentage(&self) -> u32 {
        if self.questions.is_empty() {
            return 0;
        }
        (self.score as f64 / self.questions.len() as f64 * 100.0).round() as u32
    }
}

/// 生命周期状态
#[derive(Debug, Clone, PartialEq)]
pub enum QuizState {
    /// 配置输入（初始状态），可能带有上一次生成失败的错误信息
    Configuring { error: Option<String> },
    /// 等待 LLM 生成
    Generating {
        ticket: GenerationTicket,
        context: String,
        requested: usize,
    },
    /// 答题中
    Active(ActiveQuiz),
    /// 查看结果
    Finished(FinishedQuiz),
}

impl QuizState {
    /// 状态名称（用于日志和错误信息）
    pub fn name(&self) -> &'static str {
        match self {
            QuizState::Configuring { .. } => "configuring",
            QuizState::Generating { .. } => "generating",
            QuizState::Active(_) => "active",
            QuizState::Finished(_) => "finished",
        }
    }
}

/// 生成结果回传后的处理结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    /// 进入答题状态
    Ready { count: usize },
    /// 回到配置状态并显示错误
    Failed { message: String },
    /// 票据已过期（被新请求取代），结果被丢弃
    Stale,
}

/// 测验会话
#[derive(Debug, Clone, PartialEq)]
pub struct QuizSession {
    state: QuizState,
    next_ticket: u64,
}

impl Default for QuizSession {
    fn default() -> Self {
        Self::new()
    }
}

impl QuizSession {
    /// 创建新会话，初始为 configuring
    pub fn new() -> Self {
        Self {
            state: QuizState::Configuring { error: None },
            next_ticket: 0,
        }
    }

    /// 当前状态
    pub fn state(&self) -> &QuizState {
        &self.state
    }

    /// 配置状态下的错误信息
    pub fn error(&self) -> Option<&str> {
        match &self.state {
            QuizState::Configuring { error } => error.as_deref(),
            _ => None,
        }
    }

    fn invalid(&self, action: &'static str) -> SessionError {
        SessionError::invalid_transition(self.state.name(), action)
    }

    fn active_mut(&mut self, action: &'static str) -> Result<&mut ActiveQuiz, SessionError> {
        let state_name = self.state.name();
        match &mut self.state {
            QuizState::Active(active) => Ok(active),
            _ => Err(SessionError::invalid_transition(state_name, action)),
        }
    }

    // ========== configuring → generating ==========

    /// 提交输入，开始生成
    ///
    /// 在 generating 状态下再次提交会取代旧请求，旧票据的结果之后会被丢弃
    pub fn submit(&mut self, context: &str, count: usize) -> Result<GenerationTicket, SessionError> {
        match &self.state {
            QuizState::Configuring { .. } => {}
            QuizState::Generating { ticket, .. } => {
                warn!("生成请求 {:?} 尚未完成，新的请求将取代它", ticket);
            }
            _ => return Err(self.invalid("submit")),
        }

        if context.trim().is_empty() {
            return Err(InputError::EmptyContext.into());
        }
        if !(MIN_QUESTIONS..=MAX_QUESTIONS).contains(&count) {
            return Err(InputError::QuestionCountOutOfRange {
                got: count,
                min: MIN_QUESTIONS,
                max: MAX_QUESTIONS,
            }
            .into());
        }

        self.next_ticket += 1;
        let ticket = GenerationTicket(self.next_ticket);
        self.state = QuizState::Generating {
            ticket,
            context: context.to_string(),
            requested: count,
        };
        debug!("签发生成票据 {:?}，题目数量 {}", ticket, count);
        Ok(ticket)
    }

    // ========== generating → active / configuring ==========

    /// 回传生成结果
    ///
    /// - 至少 1 道题：进入 active，答案全部为空
    /// - 失败或 0 道题：回到 configuring 并记录错误
    /// - 票据不是当前票据：忽略
    pub fn complete_generation(
        &mut self,
        ticket: GenerationTicket,
        result: Result<Vec<Question>, GenerationError>,
    ) -> GenerationOutcome {
        let context = match &self.state {
            QuizState::Generating {
                ticket: current,
                context,
                ..
            } if *current == ticket => context.clone(),
            _ => {
                debug!("丢弃过期的生成结果 {:?}", ticket);
                return GenerationOutcome::Stale;
            }
        };

        match result {
            Ok(questions) => match ActiveQuiz::new(context, questions) {
                Some(active) => {
                    let count = active.questions().len();
                    self.state = QuizState::Active(active);
                    info!("✓ 测验就绪，共 {} 道题", count);
                    GenerationOutcome::Ready { count }
                }
                None => self.fail_generation(GenerationError::EmptyQuiz),
            },
            Err(e) => self.fail_generation(e),
        }
    }

    /// 取消当前生成请求
    pub fn cancel_generation(&mut self, ticket: GenerationTicket) -> GenerationOutcome {
        self.complete_generation(ticket, Err(GenerationError::Cancelled))
    }

    fn fail_generation(&mut self, error: GenerationError) -> GenerationOutcome {
        warn!("生成失败: {}", error);
        let message = error.to_string();
        self.state = QuizState::Configuring {
            error: Some(message.clone()),
        };
        GenerationOutcome::Failed { message }
    }

    // ========== active ==========

    /// 为当前题目选择第 `index` 个选项（0 对应 A）
    pub fn select_option(&mut self, index: usize) -> Result<(), SessionError> {
        self.active_mut("select_option")?.select_option(index)
    }

    /// 前进到下一题
    pub fn advance(&mut self) -> Result<usize, SessionError> {
        self.active_mut("advance")?.tracker.advance()
    }

    // ========== active → finished ==========

    /// 交卷
    ///
    /// 计算得分并进入 finished，返回待保存的历史记录
    pub fn finish(&mut self) -> Result<NewHistoryEntry, SessionError> {
        let active = self.active_mut("finish")?;
        let answers = active.tracker.finish()?;
        let score = score(&active.questions, &answers);
        let context = active.context.clone();
        let questions = active.questions.clone();

        info!("🏁 交卷，得分 {}/{}", score, questions.len());

        self.state = QuizState::Finished(FinishedQuiz {
            context: context.clone(),
            questions: questions.clone(),
            answers: answers.clone(),
            score,
            history_id: None,
        });

        Ok(NewHistoryEntry {
            mcqs: questions,
            user_answers: answers,
            context_topic: context,
            score,
        })
    }

    // ========== finished → configuring ==========

    /// 重新开始，清空题目、答案、上下文和错误
    pub fn restart(&mut self) -> Result<(), SessionError> {
        match self.state {
            QuizState::Finished(_) => {
                self.state = QuizState::Configuring { error: None };
                Ok(())
            }
            _ => Err(self.invalid("restart")),
        }
    }

    // ========== configuring / finished → finished ==========

    /// 打开一条历史记录
    ///
    /// 直接使用记录中保存的题目、答案和得分，不重新计分，也不会再次保存
    pub fn open_history(&mut self, entry: &HistoryEntry) -> Result<(), SessionError> {
        match self.state {
            QuizState::Configuring { .. } | QuizState::Finished(_) => {
                debug!("打开历史记录 {}", entry.id);
                self.state = QuizState::Finished(FinishedQuiz {
                    context: entry.context_topic.clone(),
                    questions: entry.mcqs.clone(),
                    answers: entry.user_answers.clone(),
                    score: entry.score,
                    history_id: Some(entry.id.clone()),
                });
                Ok(())
            }
            _ => Err(self.invalid("open_history")),
        }
    }
}
