//! # MCQ Quiz
//!
//! 根据主题或学习资料，调用 LLM 生成单选题测验的终端应用
//!
//! ## 架构设计
//!
//! 本系统采用四层架构：
//!
//! ### ① 数据层（Models）
//! - `models/` - 题目、历史记录、文档类型
//! - `Question` - 4 个选项、正确答案必须是其中之一
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"
//! - `extractor` - 从 .txt / .docx / .pptx 提取文本
//! - `LlmService` - 调用 LLM 生成题目
//! - `quiz_parser` - 校验 LLM 返回的 JSON
//! - `HistoryStore` - 最近 50 次测验的历史记录
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一次测验"的完整生命周期
//! - `QuizSession` - 状态机（configuring → generating → active → finished）
//! - `AnswerTracker` - 当前题目和答案
//! - `InputForm` - 配置界面的输入状态
//! - `QuizFlow` - 流程编排（submit → generate → answer → finish → save）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/app` - 终端命令循环
//! - `orchestrator/views` - 各界面的渲染
//!
//! ## 模块结构

pub mod config;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::{HistoryEntry, Question};
pub use orchestrator::App;
pub use services::{HistoryStore, LlmService, QuizGenerator};
pub use workflow::{InputForm, QuizFlow, QuizSession, QuizState};
