//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责终端交互和界面调度，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `app` - 终端应用
//! - 管理应用生命周期（初始化、运行）
//! - 逐行读取命令，按当前界面分发
//! - 生成期间监听 Ctrl-C 取消请求
//! - 持有输入表单和测验流程
//!
//! ### `views` - 界面渲染
//! - 配置 / 生成中 / 答题 / 结果 / 历史记录面板
//! - 纯函数，只负责把状态变成文本
//!
//! ## 层次关系
//!
//! ```text
//! app (命令循环)
//!     ↓
//! workflow::QuizFlow / InputForm (一次测验)
//!     ↓
//! services (能力层：extractor / llm / history_store)
//! ```
//!
//! ## 设计原则
//!
//! 1. **向下依赖**：编排层 → workflow → services → models
//! 2. **无业务逻辑**：只做调度和显示，状态转换由 workflow 决定

pub mod app;
pub mod views;

// 重新导出主要类型
pub use app::App;
