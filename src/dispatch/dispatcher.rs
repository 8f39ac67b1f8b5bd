//! Dispatcher：单个事件的完整处理
//!
//! 每个事件只有两种结局：Unauthorized（直接回复，不做任何外部调用）或 Executing（执行一个 Verb 后回复）。
//! 适配器的错误在此渲染为以 ❌ 结尾的文本；处理过程中的残余错误或 panic 在边界处兜底为 "Action failed"。

use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use futures_util::FutureExt;

use crate::adapters::{ArchiveManager, ContainerControl, HostProbe, WorkflowRegistry};
use crate::auth::AuthGate;
use crate::core::{BotError, BotResult};
use crate::dispatch::command::{verb_for_command, HELP_TEXT};
use crate::dispatch::reply::{
    chunk_text, truncate_chars, ChatTransport, Responder, LOG_CHUNK_CHARS, LOG_DISPLAY_LIMIT,
};
use crate::dispatch::{ActionToken, EventKind, InboundEvent, Verb};
use crate::presentation::{main_menu, workflow_menu};

pub const MAIN_MENU_TEXT: &str = "n8n Manager Bot — Main Menu";
pub const UNKNOWN_ACTION_TEXT: &str = "Unknown action.";
pub const UNKNOWN_COMMAND_TEXT: &str = "Unknown command. Use /help.";
pub const RESTORE_PROMPT_TEXT: &str =
    "Please upload the backup (.tar.gz) or workflow (.json) file now.";
pub const UNSUPPORTED_FILE_TEXT: &str = "Unsupported file type. Use .tar.gz or .json";
pub const BACKUP_PROGRESS_TEXT: &str = "Creating backup...";

/// 上传文件的路由依据（仅看扩展名）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    FullBackup,
    WorkflowJson,
    Unsupported,
}

pub fn classify_upload(file_name: &str) -> UploadKind {
    let lower = file_name.to_lowercase();
    if lower.ends_with(".tar.gz") || lower.ends_with(".tgz") {
        UploadKind::FullBackup
    } else if lower.ends_with(".json") {
        UploadKind::WorkflowJson
    } else {
        UploadKind::Unsupported
    }
}

/// 预构建的 Dispatcher 依赖，启动时注入
pub struct BotComponents {
    pub gate: AuthGate,
    pub container: Arc<dyn ContainerControl>,
    pub registry: Arc<dyn WorkflowRegistry>,
    pub archive: ArchiveManager,
    pub host: Arc<dyn HostProbe>,
    /// /n8n_logs 读取的行数
    pub log_tail_lines: usize,
}

pub struct Dispatcher {
    components: BotComponents,
}

impl Dispatcher {
    pub fn new(components: BotComponents) -> Self {
        Self { components }
    }

    /// 处理事件；处理中的 panic 被捕获并回复通用失败消息
    pub async fn handle_guarded(&self, event: InboundEvent, transport: &dyn ChatTransport) {
        let target = event.target;
        let outcome = AssertUnwindSafe(self.handle(event, transport))
            .catch_unwind()
            .await;
        if outcome.is_err() {
            tracing::error!(chat_id = target.chat_id, "event handler panicked");
            let responder = Responder::new(transport, target);
            if let Err(e) = responder.reply("Action failed: internal error ❌", None).await {
                tracing::error!(error = %e, "failed to report handler panic");
            }
        }
    }

    /// 处理单个事件：授权 → 解析 Verb → 执行 → 回复
    pub async fn handle(&self, event: InboundEvent, transport: &dyn ChatTransport) {
        let started = Instant::now();
        let responder = Responder::new(transport, event.target);

        if let Err(denied) = self.components.gate.check(&event.caller) {
            if let Err(e) = responder.reply(&denied.to_string(), None).await {
                tracing::warn!(error = %e, "failed to send unauthorized reply");
            }
            return;
        }

        let verb = match self.resolve(event.kind, &responder).await {
            Ok(verb) => verb,
            Err(text) => {
                if let Err(e) = responder.reply(&text, None).await {
                    tracing::warn!(error = %e, "failed to send reply");
                }
                return;
            }
        };

        let verb_name = verb.name();
        let result = self.execute(verb, &responder).await;
        let duration_ms = started.elapsed().as_millis() as u64;
        tracing::info!(
            verb = verb_name,
            caller = %event.caller,
            ok = result.is_ok(),
            duration_ms,
            "event handled"
        );

        if let Err(e) = result {
            tracing::error!(verb = verb_name, error = %e, "event handling failed");
            if let Err(e) = responder.reply(&failure("Action failed", &e), None).await {
                tracing::error!(error = %e, "failed to report action failure");
            }
        }
    }

    /// 事件 → Verb；无法解析时返回要回复给用户的文本
    async fn resolve(&self, kind: EventKind, responder: &Responder<'_>) -> Result<Verb, String> {
        match kind {
            EventKind::Command { name, args } => {
                verb_for_command(&name, &args).ok_or_else(|| UNKNOWN_COMMAND_TEXT.to_string())
            }
            EventKind::ButtonPress { token } => ActionToken::decode(&token)
                .map(ActionToken::into_verb)
                .map_err(|e| {
                    tracing::debug!(error = %e, "undecodable button token");
                    UNKNOWN_ACTION_TEXT.to_string()
                }),
            EventKind::FileUpload { file_ref, file_name } => {
                if classify_upload(&file_name) == UploadKind::Unsupported {
                    return Err(UNSUPPORTED_FILE_TEXT.to_string());
                }
                let path = responder
                    .fetch_file(&file_ref, &file_name)
                    .await
                    .map_err(|e| failure("Download failed", &e))?;
                Ok(Verb::FileUploaded { path, file_name })
            }
        }
    }

    /// 执行 Verb；只有回复通道本身的错误会作为 Err 返回
    pub async fn execute(&self, verb: Verb, responder: &Responder<'_>) -> BotResult<()> {
        let c = &self.components;
        match verb {
            Verb::Menu => {
                responder.reply(MAIN_MENU_TEXT, Some(&main_menu())).await?;
            }
            Verb::Help => {
                responder.reply(HELP_TEXT, None).await?;
            }
            Verb::Status => {
                let host = c.host.snapshot().await;
                let status = c.container.status().await;
                responder
                    .reply(&format!("{host}\nn8n container: {status}"), None)
                    .await?;
            }
            Verb::ContainerStart => {
                let text = outcome(c.container.start().await, "n8n started ✅", "Failed to start n8n");
                responder.reply(&text, None).await?;
            }
            Verb::ContainerStop => {
                let text = outcome(c.container.stop().await, "n8n stopped ✅", "Failed to stop n8n");
                responder.reply(&text, None).await?;
            }
            Verb::ContainerRestart => {
                let text = outcome(
                    c.container.restart().await,
                    "n8n restarted ✅",
                    "Failed to restart n8n",
                );
                responder.reply(&text, None).await?;
            }
            Verb::LogsTail { lines } => {
                let logs = c.archive.tail_log(lines.unwrap_or(c.log_tail_lines)).await;
                if logs.chars().count() > LOG_DISPLAY_LIMIT {
                    for chunk in chunk_text(&logs, LOG_CHUNK_CHARS) {
                        responder.send_new(&chunk).await?;
                    }
                } else {
                    responder.reply(&format!("Logs:\n{logs}"), None).await?;
                }
            }
            Verb::BackupCreate => self.create_backup(responder).await?,
            Verb::RestorePrompt => {
                responder.reply(RESTORE_PROMPT_TEXT, None).await?;
            }
            Verb::WorkflowsList => {
                match c.registry.list().await {
                    Ok(workflows) if workflows.is_empty() => {
                        responder.reply("No workflows found.", None).await?;
                    }
                    Ok(workflows) => {
                        responder
                            .reply("Select a workflow:", Some(&workflow_menu(&workflows)))
                            .await?;
                    }
                    Err(e) => {
                        responder
                            .reply(&failure("Workflow API inaccessible", &e), None)
                            .await?;
                    }
                };
            }
            Verb::WorkflowRun(id) => {
                let text = match c.registry.run(&id).await {
                    Ok(response) => format!(
                        "Workflow {id} triggered ✅\n{}",
                        truncate_chars(&response.to_string(), LOG_CHUNK_CHARS)
                    ),
                    Err(e) => failure("Run failed", &e),
                };
                responder.reply(&text, None).await?;
            }
            Verb::WorkflowEnable(id) => {
                let text = outcome(c.registry.activate(&id).await, "Workflow enabled ✅", "Enable failed");
                responder.reply(&text, None).await?;
            }
            Verb::WorkflowDisable(id) => {
                let text = outcome(
                    c.registry.deactivate(&id).await,
                    "Workflow disabled ✅",
                    "Disable failed",
                );
                responder.reply(&text, None).await?;
            }
            Verb::WorkflowBackup(id) => self.backup_workflow(&id, responder).await?,
            Verb::WorkflowDelete(id) => {
                let text = outcome(c.registry.delete(&id).await, "Workflow deleted ✅", "Delete failed");
                responder.reply(&text, None).await?;
            }
            Verb::LogsDeleteAll => {
                let dir = c.archive.paths().log_dir.clone();
                let text = outcome(c.archive.delete_all_in(&dir).await, "Logs deleted ✅", "Delete logs failed");
                responder.reply(&text, None).await?;
            }
            Verb::BackupsDeleteAll => {
                let dir = c.archive.paths().backup_dir.clone();
                let text = outcome(
                    c.archive.delete_all_in(&dir).await,
                    "Backups deleted ✅",
                    "Delete backups failed",
                );
                responder.reply(&text, None).await?;
            }
            Verb::FileUploaded { path, file_name } => {
                let text = self.restore_upload(&path, &file_name).await;
                if let Err(e) = tokio::fs::remove_file(&path).await {
                    tracing::debug!(path = %path.display(), error = %e, "upload cleanup skipped");
                }
                responder.reply(&text, None).await?;
            }
        }
        Ok(())
    }

    /// 先回复「Creating backup...」，完成后原地编辑为结果
    async fn create_backup(&self, responder: &Responder<'_>) -> BotResult<()> {
        let progress = responder.reply(BACKUP_PROGRESS_TEXT, None).await?;
        let result = async {
            let path = self.components.archive.create_full_backup().await?;
            responder.document(&path).await
        }
        .await;
        let text = match result {
            Ok(()) => "Backup completed ✅".to_string(),
            Err(e) => failure("Backup failed", &e),
        };
        responder.edit(progress, &text).await
    }

    async fn backup_workflow(&self, id: &str, responder: &Responder<'_>) -> BotResult<()> {
        let c = &self.components;
        let result = async {
            let workflow = c.registry.get(id).await?;
            let path = c.archive.export_workflow_to_file(&workflow).await?;
            responder.document(&path).await
        }
        .await;
        let text = match result {
            Ok(()) => "Workflow backup sent ✅".to_string(),
            Err(e) => failure("Export failed", &e),
        };
        responder.reply(&text, None).await?;
        Ok(())
    }

    /// .tar.gz / .tgz：全量还原，成功后重启容器；.json：导入工作流（不解包、不重启）
    async fn restore_upload(&self, path: &Path, file_name: &str) -> String {
        let c = &self.components;
        match classify_upload(file_name) {
            UploadKind::FullBackup => match c.archive.restore_full_backup(path).await {
                Ok(report) => {
                    let mut text = "Full n8n backup restored ✅".to_string();
                    if report.skipped > 0 {
                        text.push_str(&format!("\nSkipped {} archive entries", report.skipped));
                    }
                    text.push('\n');
                    text.push_str(&outcome(
                        c.container.restart().await,
                        "n8n restarted ✅",
                        "Failed to restart n8n",
                    ));
                    text
                }
                Err(e) => failure("Restore failed", &e),
            },
            UploadKind::WorkflowJson => outcome(
                c.archive.restore_workflow_from_file(path).await,
                "Workflow restore successful ✅",
                "Workflow restore failed",
            ),
            UploadKind::Unsupported => UNSUPPORTED_FILE_TEXT.to_string(),
        }
    }
}

/// 以 ❌ 结尾的失败文本
fn failure(prefix: &str, error: &BotError) -> String {
    format!("{prefix}: {error} ❌")
}

fn outcome<T>(result: BotResult<T>, ok_text: &str, fail_prefix: &str) -> String {
    match result {
        Ok(_) => ok_text.to_string(),
        Err(e) => {
            tracing::warn!(error = %e, "{fail_prefix}");
            failure(fail_prefix, &e)
        }
    }
}
