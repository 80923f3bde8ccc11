use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;

/// 默认配置文件名
pub const DEFAULT_CONFIG_FILE: &str = "mcq_quiz.toml";

/// 允许的题目数量范围
pub const MIN_QUESTIONS: usize = 1;
pub const MAX_QUESTIONS: usize = 10;

/// 程序配置文件
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 历史记录存放目录
    pub history_dir: String,
    /// 默认题目数量
    pub default_question_count: usize,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    // --- LLM 配置 ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            history_dir: ".mcq_quiz".to_string(),
            default_question_count: 5,
            verbose_logging: false,
            llm_api_key: String::new(),
            llm_api_base_url: "https://generativelanguage.googleapis.com/v1beta/openai".to_string(),
            llm_model_name: "gemini-2.5-flash".to_string(),
        }
    }
}

impl Config {
    /// 加载配置：配置文件 → 环境变量覆盖 → 校验
    ///
    /// 配置文件路径取 `MCQ_QUIZ_CONFIG`，默认 `mcq_quiz.toml`，文件不存在时使用默认值
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("MCQ_QUIZ_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        let base = if Path::new(&path).exists() {
            Self::from_file(&path)?
        } else {
            Self::default()
        };
        let config = base.with_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// 从 TOML 文件读取配置
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::FileReadFailed {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content).map_err(|source| ConfigError::TomlParseFailed {
            path: path.display().to_string(),
            source,
        })
    }

    /// 解析 TOML 字符串
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// 用环境变量覆盖配置
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        Ok(Self {
            history_dir: std::env::var("HISTORY_DIR").unwrap_or(self.history_dir),
            default_question_count: parse_env("DEFAULT_QUESTION_COUNT", "usize")?
                .unwrap_or(self.default_question_count),
            verbose_logging: parse_env("VERBOSE_LOGGING", "bool")?.unwrap_or(self.verbose_logging),
            llm_api_key: std::env::var("LLM_API_KEY")
                .or_else(|_| std::env::var("API_KEY"))
                .unwrap_or(self.llm_api_key),
            llm_api_base_url: std::env::var("LLM_API_BASE_URL").unwrap_or(self.llm_api_base_url),
            llm_model_name: std::env::var("LLM_MODEL_NAME").unwrap_or(self.llm_model_name),
        })
    }

    /// 校验配置，缺少 API Key 属于启动失败
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.llm_api_key.trim().is_empty() {
            return Err(ConfigError::EnvVarNotFound {
                var_name: "LLM_API_KEY".to_string(),
            });
        }
        if !(MIN_QUESTIONS..=MAX_QUESTIONS).contains(&self.default_question_count) {
            return Err(ConfigError::InvalidValue {
                field: "default_question_count".to_string(),
                reason: format!(
                    "必须在 {} 到 {} 之间，当前为 {}",
                    MIN_QUESTIONS, MAX_QUESTIONS, self.default_question_count
                ),
            });
        }
        Ok(())
    }

    /// 历史记录目录
    pub fn history_path(&self) -> PathBuf {
        PathBuf::from(&self.history_dir)
    }
}

fn parse_env<T: std::str::FromStr>(var_name: &str, expected_type: &str) -> Result<Option<T>, ConfigError> {
    match std::env::var(var_name) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::EnvVarParseFailed {
                var_name: var_name.to_string(),
                value,
                expected_type: expected_type.to_string(),
            }),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml_str(
            r#"
            llm_model_name = "gemini-2.0-flash"
            default_question_count = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.llm_model_name, "gemini-2.0-flash");
        assert_eq!(config.default_question_count, 3);
        assert_eq!(config.history_dir, Config::default().history_dir);
    }

    #[test]
    fn test_missing_api_key_is_fatal() {
        let config = Config::default();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::EnvVarNotFound { .. })
        ));
    }

    #[test]
    fn test_question_count_out_of_range() {
        let config = Config {
            llm_api_key: "key".to_string(),
            default_question_count: 11,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_valid_config() {
        let config = Config {
            llm_api_key: "key".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }
}
