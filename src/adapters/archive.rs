//! 归档管理：全量备份 / 还原、工作流导出 / 导入、日志尾部读取、目录清空
//!
//! tar.gz 的打包与解包在 spawn_blocking 中执行；还原位置由 RestoreMode 决定：
//! - Mapped（默认）：n8n_data/ → data_dir，n8n_logs/ → log_dir，其他条目、绝对路径、`..`、链接一律跳过
//! - FilesystemRoot：旧行为，相对 `/` 解包，不做路径约束（tar 自身仍拒绝 `..`）

use std::fs::File;
use std::io::Read;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::adapters::{ContainerControl, Workflow, WorkflowRegistry};
use crate::config::RestoreMode;
use crate::core::{BotError, BotResult};

/// 归档内数据目录的条目名
pub const DATA_ARCNAME: &str = "n8n_data";
/// 归档内日志目录的条目名
pub const LOG_ARCNAME: &str = "n8n_logs";
/// 日志目录下的 n8n 日志文件
pub const LOG_FILE_NAME: &str = "n8n.log";

pub const NO_LOGS_PLACEHOLDER: &str = "No logs available.";
pub const LOG_READ_FAILED_PLACEHOLDER: &str = "Failed to read log file.";

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// 备份涉及的三个目录
#[derive(Debug, Clone)]
pub struct ArchivePaths {
    pub data_dir: PathBuf,
    pub backup_dir: PathBuf,
    pub log_dir: PathBuf,
}

/// 一次全量还原的结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestoreReport {
    pub extracted: usize,
    /// 因路径不安全 / 不在映射范围内而跳过的条目数
    pub skipped: usize,
}

pub struct ArchiveManager {
    paths: ArchivePaths,
    restore_mode: RestoreMode,
    /// FilesystemRoot 模式下的解包根目录（生产为 `/`）
    extract_root: PathBuf,
    container: Arc<dyn ContainerControl>,
    registry: Arc<dyn WorkflowRegistry>,
}

/// 秒级时间戳：YYYYMMDD_HHMMSS
pub fn timestamp() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}

impl ArchiveManager {
    pub fn new(
        paths: ArchivePaths,
        restore_mode: RestoreMode,
        container: Arc<dyn ContainerControl>,
        registry: Arc<dyn WorkflowRegistry>,
    ) -> Self {
        Self {
            paths,
            restore_mode,
            extract_root: PathBuf::from("/"),
            container,
            registry,
        }
    }

    pub fn with_extract_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.extract_root = root.into();
        self
    }

    pub fn paths(&self) -> &ArchivePaths {
        &self.paths
    }

    /// 打包数据目录与日志目录（各自存在时才加入）为 n8n_backup_<timestamp>.tar.gz
    pub async fn create_full_backup(&self) -> BotResult<PathBuf> {
        let paths = self.paths.clone();
        let stamp = timestamp();
        let path = tokio::task::spawn_blocking(move || write_full_backup(&paths, &stamp))
            .await
            .map_err(|e| BotError::Io(format!("backup task failed: {e}")))??;
        tracing::info!(path = %path.display(), "full backup created");
        Ok(path)
    }

    /// 将工作流快照写为 workflow_<id>_<timestamp>.json
    pub async fn export_workflow_to_file(&self, workflow: &Workflow) -> BotResult<PathBuf> {
        let id = workflow
            .id()
            .ok_or_else(|| BotError::UnsupportedInput("workflow has no id".to_string()))?;
        tokio::fs::create_dir_all(&self.paths.backup_dir).await?;
        let path = self.paths.backup_dir.join(format!(
            "workflow_{}_{}.json",
            file_safe(&id),
            timestamp()
        ));
        let body = serde_json::to_vec_pretty(workflow.raw())?;
        tokio::fs::write(&path, body).await?;
        tracing::info!(workflow = %id, path = %path.display(), "workflow exported");
        Ok(path)
    }

    /// 还原全量备份；先校验 gzip 魔数
    pub async fn restore_full_backup(&self, archive: &Path) -> BotResult<RestoreReport> {
        let archive = archive.to_path_buf();
        let target = match self.restore_mode {
            RestoreMode::Mapped => ExtractTarget::Mapped {
                data_dir: self.paths.data_dir.clone(),
                log_dir: self.paths.log_dir.clone(),
            },
            RestoreMode::FilesystemRoot => {
                tracing::warn!(
                    root = %self.extract_root.display(),
                    "restoring backup relative to filesystem root (restore.mode = filesystem_root)"
                );
                ExtractTarget::Root(self.extract_root.clone())
            }
        };
        let report = tokio::task::spawn_blocking(move || extract_backup(&archive, &target))
            .await
            .map_err(|e| BotError::Io(format!("restore task failed: {e}")))??;
        tracing::info!(
            extracted = report.extracted,
            skipped = report.skipped,
            "full backup restored"
        );
        Ok(report)
    }

    /// 校验 JSON 后交给注册表导入（恰好一次）
    pub async fn restore_workflow_from_file(&self, path: &Path) -> BotResult<()> {
        let bytes = tokio::fs::read(path).await?;
        serde_json::from_slice::<serde_json::Value>(&bytes)?;
        self.registry.import(bytes).await
    }

    /// 日志文件最后 n 行；文件不存在时取容器输出；任何失败返回占位文本
    pub async fn tail_log(&self, lines: usize) -> String {
        let log_file = self.paths.log_dir.join(LOG_FILE_NAME);
        if !tokio::fs::try_exists(&log_file).await.unwrap_or(false) {
            return match self.container.logs(lines).await {
                Ok(output) => output,
                Err(e) => {
                    tracing::debug!(error = %e, "container logs unavailable");
                    NO_LOGS_PLACEHOLDER.to_string()
                }
            };
        }
        match tokio::fs::read(&log_file).await {
            Ok(bytes) => last_lines(&String::from_utf8_lossy(&bytes), lines),
            Err(e) => {
                tracing::warn!(path = %log_file.display(), error = %e, "log file read failed");
                LOG_READ_FAILED_PLACEHOLDER.to_string()
            }
        }
    }

    /// 删除目录下的普通文件（不含子目录），目录不存在时什么也不做；返回删除数量
    pub async fn delete_all_in(&self, dir: &Path) -> BotResult<usize> {
        if !tokio::fs::try_exists(dir).await.unwrap_or(false) {
            return Ok(0);
        }
        let mut removed = 0;
        let mut entries = tokio::fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_file = tokio::fs::metadata(&path)
                .await
                .map(|m| m.is_file())
                .unwrap_or(false);
            if is_file {
                tokio::fs::remove_file(&path).await?;
                removed += 1;
            }
        }
        tracing::info!(dir = %dir.display(), removed, "directory emptied");
        Ok(removed)
    }
}

/// readlines()[-n:] 语义：保留行尾换行
pub fn last_lines(text: &str, n: usize) -> String {
    let lines: Vec<&str> = text.split_inclusive('\n').collect();
    lines[lines.len().saturating_sub(n)..].concat()
}

fn file_safe(id: &str) -> String {
    id.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

fn write_full_backup(paths: &ArchivePaths, stamp: &str) -> BotResult<PathBuf> {
    std::fs::create_dir_all(&paths.backup_dir)?;
    let path = paths.backup_dir.join(format!("n8n_backup_{stamp}.tar.gz"));

    let result = (|| -> BotResult<()> {
        let file = File::create(&path)?;
        let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
        append_if_exists(&mut builder, &paths.data_dir, DATA_ARCNAME)?;
        append_if_exists(&mut builder, &paths.log_dir, LOG_ARCNAME)?;
        builder.into_inner()?.finish()?;
        Ok(())
    })();

    if let Err(e) = result {
        let _ = std::fs::remove_file(&path);
        return Err(e);
    }
    Ok(path)
}

fn append_if_exists<W: std::io::Write>(
    builder: &mut tar::Builder<W>,
    source: &Path,
    arcname: &str,
) -> BotResult<()> {
    if source.is_dir() {
        builder.append_dir_all(arcname, source)?;
    } else if source.is_file() {
        builder.append_path_with_name(source, arcname)?;
    }
    Ok(())
}

enum ExtractTarget {
    Mapped { data_dir: PathBuf, log_dir: PathBuf },
    Root(PathBuf),
}

fn extract_backup(archive: &Path, target: &ExtractTarget) -> BotResult<RestoreReport> {
    let mut magic = [0u8; 2];
    File::open(archive)?
        .read_exact(&mut magic)
        .map_err(|_| BotError::UnsupportedInput("archive is too short".to_string()))?;
    if magic != GZIP_MAGIC {
        return Err(BotError::UnsupportedInput("not a gzip archive".to_string()));
    }

    let mut tar = tar::Archive::new(GzDecoder::new(File::open(archive)?));
    tar.set_preserve_permissions(true);
    let mut report = RestoreReport::default();

    for entry in tar.entries()? {
        let mut entry = entry?;
        match target {
            ExtractTarget::Root(root) => {
                if entry.unpack_in(root)? {
                    report.extracted += 1;
                } else {
                    report.skipped += 1;
                }
            }
            ExtractTarget::Mapped { data_dir, log_dir } => {
                let kind = entry.header().entry_type();
                let dest = if kind.is_symlink() || kind.is_hard_link() {
                    None
                } else {
                    map_entry(&entry.path()?, data_dir, log_dir)
                };
                let Some(dest) = dest else {
                    tracing::warn!(entry = ?entry.path().ok(), "skipping archive entry outside restore mapping");
                    report.skipped += 1;
                    continue;
                };
                if let Some(parent) = dest.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                entry.unpack(&dest)?;
                report.extracted += 1;
            }
        }
    }
    Ok(report)
}

/// 将归档内路径映射到还原目标；不安全或不在 n8n_data/n8n_logs 下的返回 None
pub fn map_entry(entry: &Path, data_dir: &Path, log_dir: &Path) -> Option<PathBuf> {
    let mut parts = Vec::new();
    for component in entry.components() {
        match component {
            Component::Normal(part) => parts.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    let (first, rest) = parts.split_first()?;
    let mut dest = if *first == DATA_ARCNAME {
        data_dir.to_path_buf()
    } else if *first == LOG_ARCNAME {
        log_dir.to_path_buf()
    } else {
        return None;
    };
    for part in rest {
        dest.push(part);
    }
    Some(dest)
}
