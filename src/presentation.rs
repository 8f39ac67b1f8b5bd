//! 按钮布局：主菜单与工作流菜单
//!
//! 键盘为纯数据，序列化后即为 Telegram 的 `reply_markup`（inline_keyboard）。

use serde::Serialize;

use crate::adapters::Workflow;
use crate::dispatch::ActionToken;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Button {
    pub text: String,
    pub callback_data: String,
}

impl Button {
    fn new(text: impl Into<String>, callback_data: String) -> Self {
        Self {
            text: text.into(),
            callback_data,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InlineKeyboard {
    pub inline_keyboard: Vec<Vec<Button>>,
}

impl InlineKeyboard {
    pub fn rows(&self) -> &[Vec<Button>] {
        &self.inline_keyboard
    }
}

/// 主菜单：固定 4 行
pub fn main_menu() -> InlineKeyboard {
    let button = |text: &str, token: ActionToken| Button::new(text, token.to_string());
    InlineKeyboard {
        inline_keyboard: vec![
            vec![
                button("Backup n8n", ActionToken::BackupN8n),
                button("Restore n8n", ActionToken::RestoreN8n),
            ],
            vec![
                button("Delete Logs", ActionToken::DeleteLogs),
                button("Delete Backups", ActionToken::DeleteBackups),
            ],
            vec![button("List Workflows", ActionToken::ListWorkflows)],
            vec![button("Status", ActionToken::Status)],
        ],
    }
}

/// 工作流菜单：每个工作流一行（保持服务端顺序），五个按钮
///
/// 没有 ID、ID 过长无法放进 token、或 token 与菜单动作重名的工作流会被跳过。
pub fn workflow_menu(workflows: &[Workflow]) -> InlineKeyboard {
    let rows = workflows.iter().filter_map(workflow_row).collect();
    InlineKeyboard {
        inline_keyboard: rows,
    }
}

fn workflow_row(workflow: &Workflow) -> Option<Vec<Button>> {
    let Some(id) = workflow.id() else {
        tracing::warn!("workflow without id skipped in menu");
        return None;
    };
    let buttons = [
        (format!("Run: {}", workflow.display_name()), ActionToken::Run(id.clone())),
        ("Enable".to_string(), ActionToken::Enable(id.clone())),
        ("Disable".to_string(), ActionToken::Disable(id.clone())),
        ("Backup".to_string(), ActionToken::Backup(id.clone())),
        ("Delete".to_string(), ActionToken::Delete(id.clone())),
    ];

    let mut row = Vec::with_capacity(buttons.len());
    for (text, token) in buttons {
        match token.encode() {
            Ok(data) => row.push(Button::new(text, data)),
            Err(e) => {
                tracing::warn!(workflow = %id, error = %e, "workflow skipped in menu");
                return None;
            }
        }
    }
    Some(row)
}
