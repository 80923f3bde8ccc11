use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// 每道题固定的选项数量
pub const OPTION_COUNT: usize = 4;

/// 单选题（MCQ）
///
/// 只能通过 `TryFrom<RawQuestion>` 构造，保证：
/// - 恰好 4 个互不相同的选项
/// - `correct_answer` 等于其中一个选项
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawQuestion", rename_all = "camelCase")]
pub struct Question {
    question: String,
    options: Vec<String>,
    correct_answer: String,
}

impl Question {
    /// 校验并创建题目
    pub fn new(
        question: impl Into<String>,
        options: Vec<String>,
        correct_answer: impl Into<String>,
    ) -> Result<Self, String> {
        Self::try_from(RawQuestion {
            question: Some(question.into()),
            options: Some(options),
            correct_answer: Some(correct_answer.into()),
        })
    }

    /// 题干
    pub fn question(&self) -> &str {
        &self.question
    }

    /// 按顺序排列的 4 个选项
    pub fn options(&self) -> &[String] {
        &self.options
    }

    /// 正确答案文本
    pub fn correct_answer(&self) -> &str {
        &self.correct_answer
    }

    /// 判断答案是否正确（严格文本相等，未作答视为错误）
    pub fn is_correct(&self, answer: Option<&str>) -> bool {
        answer == Some(self.correct_answer.as_str())
    }
}

/// 未校验的题目
///
/// LLM 返回的数据先解析成这个宽松结构，再由 `TryFrom` 做约束校验
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawQuestion {
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub options: Option<Vec<String>>,
    #[serde(default)]
    pub correct_answer: Option<String>,
}

impl TryFrom<RawQuestion> for Question {
    type Error = String;

    fn try_from(raw: RawQuestion) -> Result<Self, Self::Error> {
        let question = raw
            .question
            .filter(|q| !q.trim().is_empty())
            .ok_or_else(|| "missing question text".to_string())?;

        let options = raw.options.unwrap_or_default();
        if options.len() != OPTION_COUNT {
            return Err(format!(
                "expected {} options, got {}",
                OPTION_COUNT,
                options.len()
            ));
        }

        let distinct: HashSet<&str> = options.iter().map(String::as_str).collect();
        if distinct.len() != options.len() {
            return Err("options must be distinct".to_string());
        }

        let correct_answer = raw
            .correct_answer
            .ok_or_else(|| "missing correctAnswer".to_string())?;
        if !options.contains(&correct_answer) {
            return Err(format!(
                "correctAnswer \"{}\" is not one of the options",
                correct_answer
            ));
        }

        Ok(Self {
            question,
            options,
            correct_answer,
        })
    }
}

/// 计算得分
///
/// 逐题比较，`answers[i]` 与 `questions[i]` 的正确答案严格相等才计分
pub fn score(questions: &[Question], answers: &[Option<String>]) -> usize {
    questions
        .iter()
        .zip(answers)
        .filter(|(q, a)| q.is_correct(a.as_deref()))
        .count()
}
