//! 机器人错误类型
//!
//! 适配器（容器 / n8n API / 文件系统）统一返回 BotError，由 Dispatcher 渲染为用户可见文本，
//! 不会向传输层抛出。

use thiserror::Error;

/// 处理一次事件过程中可能出现的错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BotError {
    #[error("Unauthorized")]
    Unauthorized,

    /// 外部调用失败（HTTP 非 2xx、docker 返回非零、传输错误等）
    #[error("External call failed: {0}")]
    ExternalCallFailed(String),

    /// 容器或工作流不存在
    #[error("Not found: {0}")]
    NotFound(String),

    /// 不支持的输入（文件扩展名、非法 token、内容校验失败）
    #[error("Unsupported input: {0}")]
    UnsupportedInput(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Config error: {0}")]
    Config(String),
}

impl BotError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, BotError::NotFound(_))
    }
}

impl From<std::io::Error> for BotError {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::NotFound {
            BotError::NotFound(e.to_string())
        } else {
            BotError::Io(e.to_string())
        }
    }
}

impl From<reqwest::Error> for BotError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            BotError::Timeout(e.to_string())
        } else {
            BotError::ExternalCallFailed(e.to_string())
        }
    }
}

impl From<serde_json::Error> for BotError {
    fn from(e: serde_json::Error) -> Self {
        BotError::UnsupportedInput(format!("invalid JSON: {e}"))
    }
}

pub type BotResult<T> = Result<T, BotError>;
