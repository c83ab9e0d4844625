use std::path::{Path, PathBuf};
use uuid::Uuid;

use super::models::UploadedFile;
use crate::config::{TriageConfig, UploadNaming, UploadRetention};
use crate::error::TriageError;

/// 上传文件工作目录
#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
    retention: UploadRetention,
    naming: UploadNaming,
}

/// 已落盘的上传文件
#[derive(Debug)]
pub struct StoredUpload {
    pub path: PathBuf,
    retention: UploadRetention,
}

impl UploadStore {
    pub fn new(dir: impl Into<PathBuf>, retention: UploadRetention, naming: UploadNaming) -> Self {
        Self {
            dir: dir.into(),
            retention,
            naming,
        }
    }

    pub fn from_config(cfg: &TriageConfig) -> Self {
        Self::new(cfg.upload_path(), cfg.retention, cfg.naming)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// 确保目录存在
    pub async fn ensure_dir(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await
    }

    /// 落盘路径。`Delete` 策略下总是按请求加前缀：
    /// 同名上传若共用路径，先结束的请求会删掉后一个请求尚未读回的文件。
    fn target_path(&self, filename: &str) -> PathBuf {
        match (self.naming, self.retention) {
            (UploadNaming::Original, UploadRetention::Keep) => self.dir.join(filename),
            _ => self.dir.join(format!("{}_{}", Uuid::new_v4().simple(), filename)),
        }
    }

    /// 写入工作目录。`Original` + `Keep` 下同名文件直接覆盖（后写者生效）。
    pub async fn persist(&self, file: &UploadedFile) -> Result<StoredUpload, TriageError> {
        let path = self.target_path(&file.filename);
        tokio::fs::write(&path, &file.bytes).await?;
        tracing::debug!(path = %path.display(), bytes = file.bytes.len(), "上传文件已落盘");
        Ok(StoredUpload {
            path,
            retention: self.retention,
        })
    }
}

impl StoredUpload {
    /// 从磁盘读回文件内容
    pub async fn read_back(&self) -> Result<Vec<u8>, TriageError> {
        Ok(tokio::fs::read(&self.path).await?)
    }

    /// 按保留策略处理文件；删除失败只记录告警
    pub async fn release(self) {
        if self.retention == UploadRetention::Keep {
            return;
        }
        if let Err(e) = tokio::fs::remove_file(&self.path).await {
            tracing::warn!(path = %self.path.display(), "删除上传文件失败: {}", e);
        }
    }
}
