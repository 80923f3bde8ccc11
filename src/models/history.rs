use serde::{Deserialize, Serialize};

use crate::models::question::Question;

/// 历史记录中的一次答题
///
/// 写入后不再修改；题目和答案都是从会话中复制过来的
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    /// 唯一标识（时间戳 + 随机数）
    pub id: String,
    /// 人类可读的本地时间
    pub date: String,
    pub mcqs: Vec<Question>,
    pub user_answers: Vec<Option<String>>,
    /// 原始输入（主题或文档文本），用于列表显示
    pub context_topic: String,
    pub score: usize,
}

impl HistoryEntry {
    /// 题目总数
    pub fn total(&self) -> usize {
        self.mcqs.len()
    }
}

/// 待写入的历史记录，`id` 和 `date` 由存储层生成
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewHistoryEntry {
    pub mcqs: Vec<Question>,
    pub user_answers: Vec<Option<String>>,
    pub context_topic: String,
    pub score: usize,
}

impl NewHistoryEntry {
    /// 补全 `id` 和 `date`
    pub fn into_entry(self, id: String, date: String) -> HistoryEntry {
        HistoryEntry {
            id,
            date,
            mcqs: self.mcqs,
            user_answers: self.user_answers,
            context_topic: self.context_topic,
            score: self.score,
        }
    }
}
