//! LLM 服务 - 业务能力层
//!
//! 只负责"根据一段上下文生成单选题"能力，不关心答题流程
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用
//! - 支持自定义 API 端点和模型
//! - 兼容 OpenAI API 的服务（默认使用 Gemini 的 OpenAI 兼容端点）
//! - 通过 `response_format = json_schema` 要求严格的结构化输出

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs, ResponseFormat,
        ResponseFormatJsonSchema,
    },
    Client,
};
use futures::future::BoxFuture;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::GenerationError;
use crate::models::question::{Question, OPTION_COUNT};
use crate::services::quiz_parser::parse_quiz_response;
use crate::utils::truncate_text;

/// 系统消息
const SYSTEM_MESSAGE: &str = "You are a helpful assistant that writes multiple-choice quiz questions. \
                              Every question must have exactly 4 distinct options, and correctAnswer \
                              must be copied verbatim from the options array.";

/// 测验生成能力
///
/// 状态机和流程层只依赖这个 trait，测试时可以替换成 mock
pub trait QuizGenerator: Send + Sync {
    /// 基于 `context` 生成 `num_questions` 道单选题
    fn generate<'a>(
        &'a self,
        context: &'a str,
        num_questions: usize,
    ) -> BoxFuture<'a, Result<Vec<Question>, GenerationError>>;
}

/// LLM 服务
///
/// 职责：
/// - 调用 LLM API 生成题目
/// - 声明结构化输出的 JSON Schema
/// - 把返回文本交给 `quiz_parser` 校验
pub struct LlmService {
    client: Client<OpenAIConfig>,
    model_name: String,
}

impl LlmService {
    /// 创建新的 LLM 服务
    pub fn new(config: &Config) -> Self {
        // 配置 OpenAI 客户端（兼容 OpenAI API 的服务）
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.llm_api_key)
            .with_api_base(&config.llm_api_base_url);

        let client = Client::with_config(openai_config);

        Self {
            client,
            model_name: config.llm_model_name.clone(),
        }
    }

    /// 通用的 LLM 调用函数
    ///
    /// # 参数
    /// - `user_message`: 用户消息内容
    /// - `system_message`: 系统消息（可选）
    /// - `response_format`: 结构化输出格式（可选）
    ///
    /// # 返回
    /// 返回 LLM 的响应内容（已去掉首尾空白）
    pub async fn send_to_llm(
        &self,
        user_message: &str,
        system_message: Option<&str>,
        response_format: Option<ResponseFormat>,
    ) -> Result<String, GenerationError> {
        debug!("调用 LLM API，模型: {}", self.model_name);
        debug!("用户消息长度: {} 字符", user_message.len());

        let mut messages = Vec::new();

        if let Some(sys_msg) = system_message {
            let system_msg = ChatCompletionRequestSystemMessageArgs::default()
                .content(sys_msg)
                .build()
                .map_err(GenerationError::upstream)?;
            messages.push(ChatCompletionRequestMessage::System(system_msg));
        }

        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(user_message)
            .build()
            .map_err(GenerationError::upstream)?;
        messages.push(ChatCompletionRequestMessage::User(user_msg));

        let mut request = CreateChatCompletionRequestArgs::default();
        request
            .model(&self.model_name)
            .messages(messages)
            .temperature(0.7)
            .max_completion_tokens(4096u32);
        if let Some(format) = response_format {
            request.response_format(format);
        }
        let request = request.build().map_err(GenerationError::upstream)?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            warn!("LLM API 调用失败: {}", e);
            GenerationError::upstream(e)
        })?;

        debug!("LLM API 调用成功");

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| GenerationError::upstream("LLM 返回内容为空"))?;

        Ok(content.trim().to_string())
    }

    /// 生成测验题目
    ///
    /// 基于 `send_to_llm` 实现，声明 quiz JSON Schema 并校验返回结果
    pub async fn generate_quiz(
        &self,
        context: &str,
        num_questions: usize,
    ) -> Result<Vec<Question>, GenerationError> {
        info!(
            "🤖 正在生成 {} 道题目，上下文: {}",
            num_questions,
            truncate_text(context, 40)
        );

        let prompt = build_quiz_prompt(context, num_questions);
        let response = self
            .send_to_llm(&prompt, Some(SYSTEM_MESSAGE), Some(quiz_response_format()))
            .await?;

        let questions = parse_quiz_response(&response, num_questions)?;
        info!("✓ 生成完成，共 {} 道题目", questions.len());
        Ok(questions)
    }
}

impl QuizGenerator for LlmService {
    fn generate<'a>(
        &'a self,
        context: &'a str,
        num_questions: usize,
    ) -> BoxFuture<'a, Result<Vec<Question>, GenerationError>> {
        Box::pin(self.generate_quiz(context, num_questions))
    }
}

/// 构建生成题目的用户消息
pub fn build_quiz_prompt(context: &str, num_questions: usize) -> String {
    format!(
        "Based on the following context, generate {} multiple-choice questions. \
         Each question should have exactly {} options. The context is: \"{}\"",
        num_questions, OPTION_COUNT, context
    )
}

/// quiz 的 JSON Schema
///
/// `{ quiz: [{ question: string, options: string[4], correctAnswer: string }] }`
pub fn quiz_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "quiz": {
                "type": "array",
                "description": "An array of Multiple Choice Questions.",
                "items": {
                    "type": "object",
                    "properties": {
                        "question": {
                            "type": "string",
                            "description": "The question text."
                        },
                        "options": {
                            "type": "array",
                            "items": { "type": "string" },
                            "minItems": OPTION_COUNT,
                            "maxItems": OPTION_COUNT,
                            "description": "An array of 4 possible answers."
                        },
                        "correctAnswer": {
                            "type": "string",
                            "description": "The correct answer from the options array."
                        }
                    },
                    "required": ["question", "options", "correctAnswer"],
                    "additionalProperties": false
                }
            }
        },
        "required": ["quiz"],
        "additionalProperties": false
    })
}

/// 严格模式的结构化输出声明
pub fn quiz_response_format() -> ResponseFormat {
    ResponseFormat::JsonSchema {
        json_schema: ResponseFormatJsonSchema {
            description: Some("A multiple-choice quiz.".to_string()),
            name: "quiz".to_string(),
            schema: Some(quiz_schema()),
            strict: Some(true),
        },
    }
}
