use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 输入错误（未提供内容、题目数量越界）
    #[error("输入错误: {0}")]
    Input(#[from] InputError),
    /// 文档解析错误
    #[error("文档错误: {0}")]
    Extract(#[from] ExtractError),
    /// 题目生成错误
    #[error("生成错误: {0}")]
    Generation(#[from] GenerationError),
    /// 历史记录存储错误
    #[error("历史记录错误: {0}")]
    History(#[from] HistoryError),
    /// 生命周期状态错误
    #[error("状态错误: {0}")]
    Session(#[from] SessionError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 其他错误（用于包装第三方库错误）
    #[error("错误: {0}")]
    Other(String),
}

/// 输入错误
///
/// 显示在输入框附近，不改变生命周期状态
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    /// 没有题目主题，或上传的文件没有文本
    #[error("Please enter a topic or upload a file with text content.")]
    EmptyContext,
    /// 题目数量超出 1..=10
    #[error("Number of questions must be between {min} and {max}, got {got}.")]
    QuestionCountOutOfRange { got: usize, min: usize, max: usize },
}

/// 文档解析错误
///
/// `is_soft()` 为 true 的错误表示解析本身成功，但没有得到可用文本
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    /// docx 解析成功但内容为空（可能只有图片）
    #[error("The document appears to be empty or contains only images.")]
    EmptyDocument,
    /// pptx 没有提取到任何文字
    #[error("No text could be extracted. The PowerPoint might be image-based.")]
    NoSlideText,
    /// 旧版二进制格式（.doc / .ppt）
    #[error("Legacy .{extension} files are not supported. Please save it as a .{extension}x file and try again.")]
    LegacyFormat { extension: String },
    /// 不支持的扩展名
    #[error("File type \".{extension}\" is not supported. Please upload a .txt, .docx, or .pptx file.")]
    Unsupported { extension: String },
    /// 读取、解压或解析失败
    #[error("Could not read the .{extension} file. It might be corrupted or password-protected.")]
    Unreadable { extension: String, detail: String },
}

impl ExtractError {
    /// 软错误：保留文件名，只清空内容
    pub fn is_soft(&self) -> bool {
        matches!(self, ExtractError::EmptyDocument | ExtractError::NoSlideText)
    }
}

/// 题目生成错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    /// 上游服务调用失败（网络、鉴权、配额）
    #[error("Failed to generate quiz. API error: {0}")]
    Upstream(String),
    /// 返回内容无法按 JSON 结构解析
    #[error("Failed to generate quiz. Invalid response format from the API.")]
    InvalidFormat { detail: String },
    /// 返回的 quiz 数组缺失或为空
    #[error("The generated quiz is empty. Please try a different topic.")]
    EmptyQuiz,
    /// 某道题不满足 4 个选项 / 正确答案在选项中 的约束
    #[error("Failed to generate quiz. Question {} is invalid: {reason}", .index + 1)]
    InvalidQuestion { index: usize, reason: String },
    /// 用户取消了生成
    #[error("Quiz generation was cancelled.")]
    Cancelled,
}

/// 历史记录存储错误
///
/// 只在存储层内部流转，`HistoryStore` 记录日志后吞掉
#[derive(Debug, Error)]
pub enum HistoryError {
    /// 读取存储失败
    #[error("读取键 {key} 失败: {source}")]
    ReadFailed {
        key: String,
        #[source]
        source: std::io::Error,
    },
    /// 写入存储失败（例如磁盘已满）
    #[error("写入键 {key} 失败: {source}")]
    WriteFailed {
        key: String,
        #[source]
        source: std::io::Error,
    },
    /// 删除键失败
    #[error("删除键 {key} 失败: {source}")]
    RemoveFailed {
        key: String,
        #[source]
        source: std::io::Error,
    },
    /// 存储内容不是合法的历史记录 JSON
    #[error("历史记录 JSON 解析失败: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// 生命周期状态错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// 当前状态不允许该操作
    #[error("无法在 {state} 状态下执行 {action}")]
    InvalidTransition {
        state: &'static str,
        action: &'static str,
    },
    /// 选项索引越界
    #[error("选项 {index} 不存在，当前题目共有 {count} 个选项")]
    OptionOutOfRange { index: usize, count: usize },
    /// 已经是最后一题，不能继续前进
    #[error("已经是最后一题")]
    AtLastQuestion,
    /// 还没有到最后一题，不能交卷
    #[error("还没有到最后一题 (当前第 {current} 题，共 {count} 题)")]
    NotAtLastQuestion { current: usize, count: usize },
    /// 历史记录编号不存在
    #[error("历史记录 {0} 不存在")]
    HistoryEntryNotFound(usize),
    /// 提交的输入不合法
    #[error(transparent)]
    Input(#[from] InputError),
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// 必需的环境变量不存在
    #[error("环境变量 {var_name} 不存在")]
    EnvVarNotFound { var_name: String },
    /// 配置文件读取失败
    #[error("读取配置文件失败 ({path}): {source}")]
    FileReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// TOML 解析失败
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    /// 配置值不合法
    #[error("配置项 {field} 不合法: {reason}")]
    InvalidValue { field: String, reason: String },
}

// ========== 便捷构造函数 ==========

impl ExtractError {
    /// 创建文件读取失败错误
    pub fn unreadable(extension: impl Into<String>, detail: impl std::fmt::Display) -> Self {
        ExtractError::Unreadable {
            extension: extension.into(),
            detail: detail.to_string(),
        }
    }
}

impl GenerationError {
    /// 包装上游服务错误
    pub fn upstream(source: impl std::fmt::Display) -> Self {
        GenerationError::Upstream(source.to_string())
    }

    /// 创建题目校验失败错误
    pub fn invalid_question(index: usize, reason: impl Into<String>) -> Self {
        GenerationError::InvalidQuestion {
            index,
            reason: reason.into(),
        }
    }
}

impl SessionError {
    /// 创建非法状态转换错误
    pub fn invalid_transition(state: &'static str, action: &'static str) -> Self {
        SessionError::InvalidTransition { state, action }
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
