//! JSON 文件存储
//!
//! 整个记录列表保存在一个 JSON 文档中。写入先落到临时文件再原子替换；
//! 读-改-写序列由进程内互斥锁和（Unix 上）`flock` 文件锁共同串行化，
//! 使常驻服务与一次性 CLI 进程之间不会互相覆盖。

use crate::error::StoreError;
use crate::store::record::{MonitoredUrl, StatusUpdate};
use crate::validation::NewRecord;
use chrono::NaiveDateTime;
use std::collections::HashMap;
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

#[cfg(unix)]
use nix::fcntl::{Flock, FlockArg};

/// 新增记录的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// 已追加到末尾
    Added,
    /// URL 已存在，存储未改变
    AlreadyExists,
}

/// 删除记录的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// 已删除匹配的记录
    Deleted,
    /// 没有匹配的记录，存储未改变
    NotFound,
}

/// 持有期间独占存储文件的跨进程锁
struct FileLockGuard {
    #[cfg(unix)]
    _lock: Flock<File>,
    #[cfg(not(unix))]
    _file: File,
}

/// JSON 文件存储
#[derive(Debug, Clone)]
pub struct FileStore {
    /// 存储文件路径
    path: PathBuf,
    /// 进程内读-改-写互斥锁
    guard: Arc<Mutex<()>>,
}

impl FileStore {
    /// 创建新的文件存储
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            guard: Arc::new(Mutex::new(())),
        }
    }

    /// 存储文件路径
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 读取全部记录，文件不存在时创建空文档
    pub fn load(&self) -> Result<Vec<MonitoredUrl>, StoreError> {
        self.with_lock(|store| store.load_unlocked())
    }

    /// 按存储顺序列出全部记录
    pub fn list(&self) -> Result<Vec<MonitoredUrl>, StoreError> {
        self.load()
    }

    /// 用给定记录整体覆盖存储文件
    pub fn save(&self, records: &[MonitoredUrl]) -> Result<(), StoreError> {
        self.with_lock(|store| store.save_unlocked(records))
    }

    /// 在锁内执行一次读-改-写
    ///
    /// 只有记录发生变化时才写回文件
    pub fn update<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut Vec<MonitoredUrl>) -> T,
    {
        self.with_lock(|store| {
            let mut records = store.load_unlocked()?;
            let before = records.clone();
            let result = f(&mut records);
            if records != before {
                store.save_unlocked(&records)?;
            }
            Ok(result)
        })
    }

    /// 追加一条新记录，URL 已存在时不做任何修改
    pub fn add(&self, record: NewRecord) -> Result<AddOutcome, StoreError> {
        let outcome = self.update(|records| {
            if records.iter().any(|entry| entry.url == record.url()) {
                AddOutcome::AlreadyExists
            } else {
                records.push(record.clone().into_record());
                AddOutcome::Added
            }
        })?;

        match outcome {
            AddOutcome::Added => info!("已添加 URL: {}", record.url()),
            AddOutcome::AlreadyExists => info!("URL 已存在: {}", record.url()),
        }
        Ok(outcome)
    }

    /// 按 URL 精确匹配删除记录
    pub fn delete(&self, url: &str) -> Result<DeleteOutcome, StoreError> {
        let outcome = self.update(|records| {
            let initial_len = records.len();
            records.retain(|entry| entry.url != url);
            if records.len() < initial_len {
                DeleteOutcome::Deleted
            } else {
                DeleteOutcome::NotFound
            }
        })?;

        match outcome {
            DeleteOutcome::Deleted => info!("已删除 URL: {}", url),
            DeleteOutcome::NotFound => info!("未找到 URL: {}", url),
        }
        Ok(outcome)
    }

    /// 写回一次检测的结果
    ///
    /// 只更新与检测快照完全一致的记录：检测期间被删除的记录不会被恢复，
    /// 检测期间新增（包括删除后重新添加）的记录保持原状，等待下一个周期。
    ///
    /// # 返回
    /// * `usize` - 被更新的记录数量
    pub fn apply_results(
        &self,
        updates: &[StatusUpdate],
        timestamp: NaiveDateTime,
    ) -> Result<usize, StoreError> {
        let by_url: HashMap<&str, &StatusUpdate> = updates
            .iter()
            .map(|update| (update.snapshot.url.as_str(), update))
            .collect();

        self.update(|records| {
            let mut updated = 0;
            for record in records.iter_mut() {
                let Some(update) = by_url.get(record.url.as_str()) else {
                    continue;
                };
                if update.snapshot != *record {
                    debug!("记录在检测期间被修改，跳过写回: {}", record.url);
                    continue;
                }
                record.last_status = Some(update.status);
                record.last_time = Some(timestamp);
                updated += 1;
            }
            updated
        })
    }

    /// 在阻塞线程池中执行存储操作，供异步上下文调用
    pub async fn blocking<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&FileStore) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let store = self.clone();
        tokio::task::spawn_blocking(move || f(&store))
            .await
            .map_err(|e| StoreError::Task(e.to_string()))?
    }

    fn with_lock<T>(
        &self,
        f: impl FnOnce(&Self) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        // 锁本身不保护数据，中毒后可以直接继续使用
        let _guard = self.guard.lock().unwrap_or_else(|e| e.into_inner());
        let _file_lock = self.acquire_file_lock()?;
        f(self)
    }

    fn acquire_file_lock(&self) -> Result<FileLockGuard, StoreError> {
        self.ensure_parent_dir()?;
        let lock_path = sibling_path(&self.path, ".lock");

        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
            .map_err(|source| StoreError::Io {
                path: lock_path.clone(),
                source,
            })?;

        #[cfg(unix)]
        {
            let lock = Flock::lock(file, FlockArg::LockExclusive).map_err(|(_, errno)| {
                StoreError::Lock {
                    path: lock_path,
                    reason: errno.to_string(),
                }
            })?;
            Ok(FileLockGuard { _lock: lock })
        }

        #[cfg(not(unix))]
        {
            Ok(FileLockGuard { _file: file })
        }
    }

    fn load_unlocked(&self) -> Result<Vec<MonitoredUrl>, StoreError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("存储文件不存在，创建空文档: {}", self.path.display());
                self.save_unlocked(&[])?;
                return Ok(Vec::new());
            }
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        serde_json::from_str(&content).map_err(|source| StoreError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    fn save_unlocked(&self, records: &[MonitoredUrl]) -> Result<(), StoreError> {
        self.ensure_parent_dir()?;
        let content = serde_json::to_string_pretty(records).map_err(StoreError::Serialize)?;
        let tmp_path = sibling_path(&self.path, ".tmp");

        let io_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source: std::io::Error| StoreError::Io { path, source }
        };

        let mut file = File::create(&tmp_path).map_err(io_err(&tmp_path))?;
        file.write_all(content.as_bytes())
            .map_err(io_err(&tmp_path))?;
        file.sync_all().map_err(io_err(&tmp_path))?;
        drop(file);

        fs::rename(&tmp_path, &self.path).map_err(io_err(&self.path))?;
        debug!("已写入 {} 条记录到 {}", records.len(), self.path.display());
        Ok(())
    }

    fn ensure_parent_dir(&self) -> Result<(), StoreError> {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() && !parent.exists() => {
                fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                    path: parent.to_path_buf(),
                    source,
                })
            }
            _ => Ok(()),
        }
    }
}

/// 在文件名后追加后缀，得到同目录下的辅助文件路径
fn sibling_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("urls.json"));
    name.push(suffix);
    path.with_file_name(name)
}
