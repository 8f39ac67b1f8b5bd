//! 动作 Verb 与按钮 Action Token
//!
//! Token 语法（与旧版按钮 callback_data 兼容）：
//!
//! ```text
//! token    := static | targeted
//! static   := "backup_n8n" | "restore_n8n" | "delete_logs" | "delete_backups"
//!           | "list_workflows" | "status" | "menu"
//! targeted := prefix "_" id        ; 在第一个下划线处切分，id 非空，可再含下划线
//! prefix   := "run" | "enable" | "disable" | "backup" | "delete"
//! ```
//!
//! 静态 token 优先匹配，因此 `backup_n8n` 永远是全量备份；编码时拒绝任何解码后不等于自身的 token
//! （如 ID 为 `backups` 的工作流，其删除按钮会变成 `delete_backups`）。

use std::fmt;
use std::path::PathBuf;

use crate::core::{BotError, BotResult};

/// Telegram callback_data 上限（字节）
pub const MAX_TOKEN_BYTES: usize = 64;

/// Dispatcher 可执行的封闭动作集合
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verb {
    Menu,
    Help,
    Status,
    ContainerStart,
    ContainerStop,
    ContainerRestart,
    /// lines 为 None 时使用配置的默认行数
    LogsTail { lines: Option<usize> },
    BackupCreate,
    RestorePrompt,
    WorkflowsList,
    WorkflowRun(String),
    WorkflowEnable(String),
    WorkflowDisable(String),
    WorkflowBackup(String),
    WorkflowDelete(String),
    LogsDeleteAll,
    BackupsDeleteAll,
    FileUploaded { path: PathBuf, file_name: String },
}

impl Verb {
    /// 用于日志的稳定名称
    pub fn name(&self) -> &'static str {
        match self {
            Verb::Menu => "menu",
            Verb::Help => "help",
            Verb::Status => "status",
            Verb::ContainerStart => "container.start",
            Verb::ContainerStop => "container.stop",
            Verb::ContainerRestart => "container.restart",
            Verb::LogsTail { .. } => "logs.tail",
            Verb::BackupCreate => "backup.create",
            Verb::RestorePrompt => "restore.prompt",
            Verb::WorkflowsList => "workflows.list",
            Verb::WorkflowRun(_) => "workflows.run",
            Verb::WorkflowEnable(_) => "workflows.enable",
            Verb::WorkflowDisable(_) => "workflows.disable",
            Verb::WorkflowBackup(_) => "workflows.backup",
            Verb::WorkflowDelete(_) => "workflows.delete",
            Verb::LogsDeleteAll => "logs.delete_all",
            Verb::BackupsDeleteAll => "backups.delete_all",
            Verb::FileUploaded { .. } => "file.uploaded",
        }
    }
}

/// 按钮携带的动作：动作种类 + 可选目标工作流 ID
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionToken {
    BackupN8n,
    RestoreN8n,
    DeleteLogs,
    DeleteBackups,
    ListWorkflows,
    Status,
    Menu,
    Run(String),
    Enable(String),
    Disable(String),
    Backup(String),
    Delete(String),
}

const STATIC_TOKENS: &[(&str, ActionToken)] = &[
    ("backup_n8n", ActionToken::BackupN8n),
    ("restore_n8n", ActionToken::RestoreN8n),
    ("delete_logs", ActionToken::DeleteLogs),
    ("delete_backups", ActionToken::DeleteBackups),
    ("list_workflows", ActionToken::ListWorkflows),
    ("status", ActionToken::Status),
    ("menu", ActionToken::Menu),
];

impl ActionToken {
    /// 编码为 callback_data；ID 为空、超过 64 字节或无法原样解码回来时报错
    pub fn encode(&self) -> BotResult<String> {
        if let Some(id) = self.target() {
            if id.is_empty() {
                return Err(BotError::UnsupportedInput("empty workflow id".to_string()));
            }
        }
        let token = self.to_string();
        if token.len() > MAX_TOKEN_BYTES {
            return Err(BotError::UnsupportedInput(format!(
                "action token longer than {MAX_TOKEN_BYTES} bytes: {token}"
            )));
        }
        if Self::decode(&token)? != *self {
            return Err(BotError::UnsupportedInput(format!(
                "action token {token} collides with another action"
            )));
        }
        Ok(token)
    }

    pub fn decode(raw: &str) -> BotResult<Self> {
        if let Some((_, token)) = STATIC_TOKENS.iter().find(|(name, _)| *name == raw) {
            return Ok(token.clone());
        }

        let unknown = || BotError::UnsupportedInput(format!("unknown action token: {raw}"));
        let (prefix, id) = raw.split_once('_').ok_or_else(unknown)?;
        if id.is_empty() {
            return Err(unknown());
        }
        let id = id.to_string();
        match prefix {
            "run" => Ok(ActionToken::Run(id)),
            "enable" => Ok(ActionToken::Enable(id)),
            "disable" => Ok(ActionToken::Disable(id)),
            "backup" => Ok(ActionToken::Backup(id)),
            "delete" => Ok(ActionToken::Delete(id)),
            _ => Err(unknown()),
        }
    }

    pub fn target(&self) -> Option<&str> {
        match self {
            ActionToken::Run(id)
            | ActionToken::Enable(id)
            | ActionToken::Disable(id)
            | ActionToken::Backup(id)
            | ActionToken::Delete(id) => Some(id),
            _ => None,
        }
    }

    pub fn into_verb(self) -> Verb {
        match self {
            ActionToken::BackupN8n => Verb::BackupCreate,
            ActionToken::RestoreN8n => Verb::RestorePrompt,
            ActionToken::DeleteLogs => Verb::LogsDeleteAll,
            ActionToken::DeleteBackups => Verb::BackupsDeleteAll,
            ActionToken::ListWorkflows => Verb::WorkflowsList,
            ActionToken::Status => Verb::Status,
            ActionToken::Menu => Verb::Menu,
            ActionToken::Run(id) => Verb::WorkflowRun(id),
            ActionToken::Enable(id) => Verb::WorkflowEnable(id),
            ActionToken::Disable(id) => Verb::WorkflowDisable(id),
            ActionToken::Backup(id) => Verb::WorkflowBackup(id),
            ActionToken::Delete(id) => Verb::WorkflowDelete(id),
        }
    }
}

impl fmt::Display for ActionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionToken::BackupN8n => f.write_str("backup_n8n"),
            ActionToken::RestoreN8n => f.write_str("restore_n8n"),
            ActionToken::DeleteLogs => f.write_str("delete_logs"),
            ActionToken::DeleteBackups => f.write_str("delete_backups"),
            ActionToken::ListWorkflows => f.write_str("list_workflows"),
            ActionToken::Status => f.write_str("status"),
            ActionToken::Menu => f.write_str("menu"),
            ActionToken::Run(id) => write!(f, "run_{id}"),
            ActionToken::Enable(id) => write!(f, "enable_{id}"),
            ActionToken::Disable(id) => write!(f, "disable_{id}"),
            ActionToken::Backup(id) => write!(f, "backup_{id}"),
            ActionToken::Delete(id) => write!(f, "delete_{id}"),
        }
    }
}
