//! 答题进度
//!
//! 记录每道题选择的答案和当前题号，只能逐题向前

use crate::error::SessionError;

/// 答题进度跟踪
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerTracker {
    answers: Vec<Option<String>>,
    current_index: usize,
}

impl AnswerTracker {
    /// 为 `count` 道题创建跟踪器，所有答案为空，从第 0 题开始
    pub fn new(count: usize) -> Self {
        Self {
            answers: vec![None; count],
            current_index: 0,
        }
    }

    /// 当前题号（从 0 开始）
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    /// 题目总数
    pub fn count(&self) -> usize {
        self.answers.len()
    }

    /// 全部答案，与题目按下标对齐
    pub fn answers(&self) -> &[Option<String>] {
        &self.answers
    }

    /// 当前题目已选的答案
    pub fn selected(&self) -> Option<&str> {
        self.answers
            .get(self.current_index)
            .and_then(|a| a.as_deref())
    }

    /// 为当前题目选择答案，只覆盖当前下标
    pub fn select(&mut self, option: impl Into<String>) {
        if let Some(slot) = self.answers.get_mut(self.current_index) {
            *slot = Some(option.into());
        }
    }

    /// 是否为最后一题
    pub fn is_last(&self) -> bool {
        self.current_index + 1 >= self.answers.len()
    }

    /// 前进到下一题
    pub fn advance(&mut self) -> Result<usize, SessionError> {
        if self.is_last() {
            return Err(SessionError::AtLastQuestion);
        }
        self.current_index += 1;
        Ok(self.current_index)
    }

    /// 进度 `(current_index + 1) / count`
    pub fn progress(&self) -> f64 {
        if self.answers.is_empty() {
            return 0.0;
        }
        (self.current_index + 1) as f64 / self.answers.len() as f64
    }

    /// 交卷，只能在最后一题执行
    pub fn finish(&self) -> Result<Vec<Option<String>>, SessionError> {
        if !self.is_last() {
            return Err(SessionError::NotAtLastQuestion {
                current: self.current_index + 1,
                count: self.answers.len(),
            });
        }
        Ok(self.answers.clone())
    }
}
