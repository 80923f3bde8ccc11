//! LLM 返回结果解析
//!
//! 先按宽松结构解码，再逐题校验，最后才构造强类型的 `Question`

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::GenerationError;
use crate::models::question::{Question, RawQuestion};

/// 解析 LLM 返回的测验 JSON
///
/// # 参数
/// - `response`: LLM 返回的原始文本
/// - `requested`: 请求的题目数量，多出来的题目会被截掉
///
/// # 返回
/// 校验通过的题目列表（至少 1 道）
pub fn parse_quiz_response(response: &str, requested: usize) -> Result<Vec<Question>, GenerationError> {
    let json_text = strip_code_fence(response.trim());

    let value: Value = serde_json::from_str(json_text).map_err(|e| {
        warn!("LLM 返回内容不是合法 JSON: {}", e);
        GenerationError::InvalidFormat {
            detail: e.to_string(),
        }
    })?;

    let items = match value.get("quiz").and_then(Value::as_array) {
        Some(items) if !items.is_empty() => items,
        _ => {
            warn!("LLM 返回的 quiz 字段缺失或为空");
            return Err(GenerationError::EmptyQuiz);
        }
    };

    if items.len() > requested {
        debug!("LLM 返回了 {} 道题，只取前 {} 道", items.len(), requested);
    }

    let mut questions = Vec::with_capacity(items.len().min(requested));
    for (index, item) in items.iter().take(requested).enumerate() {
        let raw: RawQuestion = serde_json::from_value(item.clone()).map_err(|e| {
            GenerationError::invalid_question(index, format!("unexpected shape: {}", e))
        })?;
        let question = Question::try_from(raw)
            .map_err(|reason| GenerationError::invalid_question(index, reason))?;
        questions.push(question);
    }

    Ok(questions)
}

/// 去掉 ```json ... ``` 代码块包裹
fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
