//! 历史记录服务 - 业务能力层
//!
//! 只负责"保存 / 读取 / 清空答题历史"能力
//!
//! 历史记录是尽力而为的功能：所有存储错误都只记录日志，不会向上传播，
//! 也不会阻塞答题流程

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{Local, Utc};
use tracing::{debug, error, info, warn};

use crate::error::HistoryError;
use crate::models::history::{HistoryEntry, NewHistoryEntry};

/// 历史记录使用的固定键
pub const HISTORY_KEY: &str = "mcqQuizHistory";

/// 最多保留的历史记录数量
pub const MAX_HISTORY_ENTRIES: usize = 50;

/// 键值存储
///
/// 历史记录服务只通过这个接口访问存储介质，方便替换后端
pub trait KeyValueStore: Send + Sync {
    /// 读取键，不存在时返回 `None`
    fn get(&self, key: &str) -> Result<Option<String>, HistoryError>;
    /// 写入键
    fn set(&self, key: &str, value: &str) -> Result<(), HistoryError>;
    /// 删除键，不存在时视为成功
    fn remove(&self, key: &str) -> Result<(), HistoryError>;
}

/// 文件存储：每个键对应目录下的一个 `<key>.json`
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// 创建文件存储，目录在第一次写入时创建
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, HistoryError> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(HistoryError::ReadFailed {
                key: key.to_string(),
                source,
            }),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), HistoryError> {
        let write_failed = |source| HistoryError::WriteFailed {
            key: key.to_string(),
            source,
        };
        std::fs::create_dir_all(&self.dir).map_err(write_failed)?;

        // 先写临时文件再改名
        let path = self.path_for(key);
        let tmp_path = path.with_extension("json.tmp");
        std::fs::write(&tmp_path, value).map_err(write_failed)?;
        std::fs::rename(&tmp_path, &path).map_err(write_failed)
    }

    fn remove(&self, key: &str) -> Result<(), HistoryError> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(HistoryError::RemoveFailed {
                key: key.to_string(),
                source,
            }),
        }
    }
}

/// 内存存储，用于测试
#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, HistoryError> {
        let values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), HistoryError> {
        let mut values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), HistoryError> {
        let mut values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        values.remove(key);
        Ok(())
    }
}

/// 历史记录服务
///
/// 职责：
/// - 读取历史（新的在前）
/// - 追加一条记录并截断到 50 条
/// - 清空历史
/// - 吞掉并记录所有存储错误
pub struct HistoryStore<S: KeyValueStore> {
    store: S,
}

impl<S: KeyValueStore> HistoryStore<S> {
    /// 创建历史记录服务
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// 底层存储
    pub fn backend(&self) -> &S {
        &self.store
    }

    /// 读取全部历史记录（新的在前）
    ///
    /// 键不存在、读取失败或内容损坏时都返回空列表
    pub fn read(&self) -> Vec<HistoryEntry> {
        match self.try_read() {
            Ok(entries) => entries,
            Err(e) => {
                error!("读取答题历史失败: {}", e);
                Vec::new()
            }
        }
    }

    /// 逐条解码，单条记录不合法时跳过，其余记录保留
    fn try_read(&self) -> Result<Vec<HistoryEntry>, HistoryError> {
        let Some(json) = self.store.get(HISTORY_KEY)? else {
            return Ok(Vec::new());
        };

        let values: Vec<serde_json::Value> = serde_json::from_str(&json)?;
        let total = values.len();
        let entries: Vec<HistoryEntry> = values
            .into_iter()
            .enumerate()
            .filter_map(|(index, value)| match serde_json::from_value(value) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!("跳过第 {} 条无法解析的历史记录: {}", index + 1, e);
                    None
                }
            })
            .collect();

        if entries.len() < total {
            warn!("历史记录共 {} 条，其中 {} 条被跳过", total, total - entries.len());
        }
        Ok(entries)
    }

    /// 追加一条历史记录
    ///
    /// 生成 `id` 和 `date`，插入到最前面并截断到 50 条。
    /// 写入失败只记录日志，返回的记录仍可在内存中使用
    pub fn append(&self, data: NewHistoryEntry) -> HistoryEntry {
        let entry = data.into_entry(generate_id(), current_date());

        let mut history = self.read();
        history.insert(0, entry.clone());
        history.truncate(MAX_HISTORY_ENTRIES);

        match self.write(&history) {
            Ok(()) => info!(
                "💾 已保存答题记录 (得分 {}/{}，共 {} 条历史)",
                entry.score,
                entry.total(),
                history.len()
            ),
            Err(e) => error!("保存答题记录失败: {}", e),
        }

        entry
    }

    fn write(&self, history: &[HistoryEntry]) -> Result<(), HistoryError> {
        let json = serde_json::to_string(history)?;
        self.store.set(HISTORY_KEY, &json)
    }

    /// 清空历史记录
    pub fn clear(&self) {
        match self.store.remove(HISTORY_KEY) {
            Ok(()) => info!("🗑️ 已清空答题历史"),
            Err(e) => error!("清空答题历史失败: {}", e),
        }
    }
}

impl HistoryStore<FileStore> {
    /// 使用文件存储创建历史记录服务
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        debug!("历史记录目录: {}", dir.display());
        Self::new(FileStore::new(dir))
    }
}

/// 时间戳 + 随机数，只保证在本存储内唯一
fn generate_id() -> String {
    format!("{}{}", Utc::now().to_rfc3339(), rand::random::<f64>())
}

/// 本地时间，人类可读
fn current_date() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}
