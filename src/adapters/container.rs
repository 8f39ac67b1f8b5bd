//! 容器控制：n8n 容器的状态查询与启停
//!
//! ContainerControl 为注入点（测试可替换为假实现）；生产实现 DockerCli 通过 `docker` 命令行执行，
//! 每次调用带超时，失败不重试，交由运维处理。

use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use crate::core::{BotError, BotResult};

/// 容器运行状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerStatus {
    Running,
    /// 非 running 的其他 docker 状态（created / exited / paused / dead ...），保留原始字符串用于展示
    Stopped(String),
    NotFound,
    Error(String),
}

impl std::fmt::Display for ContainerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContainerStatus::Running => write!(f, "running"),
            ContainerStatus::Stopped(state) => write!(f, "{state}"),
            ContainerStatus::NotFound => write!(f, "not found"),
            ContainerStatus::Error(_) => write!(f, "error"),
        }
    }
}

impl ContainerStatus {
    /// 由 `docker inspect` 输出的 State.Status 解析
    pub fn from_docker_state(state: &str) -> Self {
        match state.trim() {
            "running" => ContainerStatus::Running,
            "" => ContainerStatus::Error("empty state".to_string()),
            other => ContainerStatus::Stopped(other.to_string()),
        }
    }
}

/// 容器控制 trait：目标为单个已命名容器
#[async_trait]
pub trait ContainerControl: Send + Sync {
    async fn status(&self) -> ContainerStatus;

    async fn start(&self) -> BotResult<()>;

    async fn stop(&self) -> BotResult<()>;

    async fn restart(&self) -> BotResult<()>;

    /// 容器自身最近 tail 行输出（stdout + stderr）
    async fn logs(&self, tail: usize) -> BotResult<String>;
}

/// 基于 docker CLI 的实现
pub struct DockerCli {
    container: String,
    timeout: Duration,
}

impl DockerCli {
    pub fn new(container: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            container: container.into(),
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    async fn docker(&self, args: &[&str]) -> BotResult<(String, String)> {
        tracing::debug!(container = %self.container, args = ?args, "docker");

        let output = tokio::time::timeout(self.timeout, Command::new("docker").args(args).output())
            .await
            .map_err(|_| BotError::Timeout(format!("docker {}", args.join(" "))))?
            .map_err(|e| BotError::ExternalCallFailed(format!("docker not available: {e}")))?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        if output.status.success() {
            return Ok((stdout, stderr));
        }
        Err(classify_docker_failure(&self.container, stderr.trim()))
    }
}

/// docker 失败时根据 stderr 区分「不存在」与一般错误
fn classify_docker_failure(container: &str, stderr: &str) -> BotError {
    let lower = stderr.to_lowercase();
    if lower.contains("no such container") || lower.contains("no such object") {
        BotError::NotFound(format!("container {container}"))
    } else {
        BotError::ExternalCallFailed(stderr.to_string())
    }
}

#[async_trait]
impl ContainerControl for DockerCli {
    async fn status(&self) -> ContainerStatus {
        match self
            .docker(&["inspect", "--format", "{{.State.Status}}", &self.container])
            .await
        {
            Ok((stdout, _)) => ContainerStatus::from_docker_state(&stdout),
            Err(BotError::NotFound(_)) => ContainerStatus::NotFound,
            Err(e) => ContainerStatus::Error(e.to_string()),
        }
    }

    async fn start(&self) -> BotResult<()> {
        self.docker(&["start", &self.container]).await.map(|_| ())
    }

    async fn stop(&self) -> BotResult<()> {
        self.docker(&["stop", &self.container]).await.map(|_| ())
    }

    async fn restart(&self) -> BotResult<()> {
        self.docker(&["restart", &self.container]).await.map(|_| ())
    }

    async fn logs(&self, tail: usize) -> BotResult<String> {
        let tail = tail.to_string();
        let (stdout, stderr) = self
            .docker(&["logs", "--tail", &tail, &self.container])
            .await?;
        // docker logs 将容器 stderr 写到自身 stderr，二者合并展示
        Ok(if stderr.is_empty() {
            stdout
        } else if stdout.is_empty() {
            stderr
        } else {
            format!("{stdout}{stderr}")
        })
    }
}
