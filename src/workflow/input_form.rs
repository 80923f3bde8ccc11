//! 输入表单状态
//!
//! 对应配置界面：主题 / 文件两种输入方式、题目数量、行内错误提示

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::config::{MAX_QUESTIONS, MIN_QUESTIONS};
use crate::error::{ExtractError, InputError};
use crate::services::extractor;

/// 输入方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    /// 输入主题或粘贴文本
    Topic,
    /// 上传文件
    File,
}

/// 输入表单
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputForm {
    mode: InputMode,
    topic: String,
    file_name: Option<String>,
    file_content: String,
    /// 当前选中的文件；硬错误时清空，保证同一个文件可以重新选择
    selection: Option<PathBuf>,
    num_questions: usize,
    error: Option<String>,
}

impl InputForm {
    /// 创建表单，题目数量会被限制在 1..=10
    pub fn new(num_questions: usize) -> Self {
        Self {
            mode: InputMode::Topic,
            topic: String::new(),
            file_name: None,
            file_content: String::new(),
            selection: None,
            num_questions: clamp_count(num_questions),
            error: None,
        }
    }

    pub fn mode(&self) -> InputMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: InputMode) {
        self.mode = mode;
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn set_topic(&mut self, topic: impl Into<String>) {
        self.topic = topic.into();
    }

    /// 已选择文件的文件名（软错误时保留）
    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    /// 从文件提取的文本
    pub fn file_content(&self) -> &str {
        &self.file_content
    }

    pub fn selection(&self) -> Option<&Path> {
        self.selection.as_deref()
    }

    pub fn num_questions(&self) -> usize {
        self.num_questions
    }

    /// 设置题目数量，超出范围时取最近的合法值
    pub fn set_num_questions(&mut self, count: usize) -> usize {
        self.num_questions = clamp_count(count);
        self.num_questions
    }

    /// 行内错误提示
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// 开始选择文件：记录文件名，清空上一次的内容和错误
    pub fn begin_file_selection(&mut self, path: &Path) {
        self.file_name = path.file_name().map(|n| n.to_string_lossy().into_owned());
        self.selection = Some(path.to_path_buf());
        self.file_content.clear();
        self.error = None;
    }

    /// 应用提取结果
    ///
    /// - 成功：保存文本
    /// - 软错误：保留文件名，清空内容，显示错误
    /// - 硬错误：文件名、内容和文件选择全部重置
    pub fn apply_extraction(&mut self, result: Result<String, ExtractError>) {
        match result {
            Ok(text) => {
                debug!("文件内容已加载，共 {} 个字符", text.chars().count());
                self.file_content = text;
            }
            Err(e) if e.is_soft() => {
                warn!("文件没有可用文本: {}", e);
                self.file_content.clear();
                self.error = Some(e.to_string());
            }
            Err(e) => {
                warn!("文件无法使用: {}", e);
                self.file_name = None;
                self.file_content.clear();
                self.selection = None;
                self.error = Some(e.to_string());
            }
        }
    }

    /// 选择文件并提取文本
    pub async fn select_file(&mut self, path: &Path) {
        self.mode = InputMode::File;
        self.begin_file_selection(path);
        let result = extractor::extract_file(path).await;
        self.apply_extraction(result);
    }

    /// 当前输入方式下的上下文文本
    pub fn context(&self) -> &str {
        match self.mode {
            InputMode::Topic => &self.topic,
            InputMode::File => &self.file_content,
        }
    }

    /// 是否允许提交
    pub fn can_submit(&self) -> bool {
        !self.context().trim().is_empty()
    }

    /// 提交表单
    ///
    /// 返回 `(context, num_questions)`；没有内容时设置错误并拒绝提交
    pub fn submit(&mut self) -> Result<(String, usize), InputError> {
        self.error = None;
        if !self.can_submit() {
            let err = InputError::EmptyContext;
            self.error = Some(err.to_string());
            return Err(err);
        }
        Ok((self.context().to_string(), self.num_questions))
    }
}

fn clamp_count(count: usize) -> usize {
    count.clamp(MIN_QUESTIONS, MAX_QUESTIONS)
}
