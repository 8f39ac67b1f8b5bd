//! Telegram Bot API 传输层
//!
//! 只实现机器人需要的最小子集：getUpdates 长轮询、sendMessage、editMessageText、
//! sendDocument（multipart）、answerCallbackQuery、getFile + 文件下载。

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::auth::CallerId;
use crate::core::{BotError, BotResult};
use crate::dispatch::command::split_command;
use crate::dispatch::{ChatTransport, EventKind, InboundEvent, MessageRef, ReplyTarget};
use crate::presentation::InlineKeyboard;

#[derive(Error, Debug)]
pub enum TelegramError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Telegram API error: {0}")]
    Api(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<TelegramError> for BotError {
    fn from(e: TelegramError) -> Self {
        match e {
            TelegramError::Io(e) => e.into(),
            other => BotError::ExternalCallFailed(other.to_string()),
        }
    }
}

/// Bot API 统一响应包装
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub from: Option<User>,
    pub chat: Chat,
    pub text: Option<String>,
    pub document: Option<Document>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Document {
    pub file_id: String,
    pub file_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    pub message: Option<Message>,
    pub data: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FileInfo {
    file_path: Option<String>,
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: i64,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_markup: Option<&'a InlineKeyboard>,
}

#[derive(Serialize)]
struct EditMessageText<'a> {
    chat_id: i64,
    message_id: i64,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_markup: Option<&'a InlineKeyboard>,
}

impl Update {
    /// 转换为 Dispatcher 事件；同时返回需要应答的 callback_query ID。
    /// 非命令文本、没有发送者的消息等返回 None（忽略）。
    pub fn into_event(self) -> Option<(InboundEvent, Option<String>)> {
        if let Some(query) = self.callback_query {
            let message = query.message?;
            let event = InboundEvent {
                caller: CallerId::Int(query.from.id),
                target: ReplyTarget {
                    chat_id: message.chat.id,
                    origin_message_id: Some(message.message_id),
                },
                kind: EventKind::ButtonPress {
                    token: query.data.unwrap_or_default(),
                },
            };
            return Some((event, Some(query.id)));
        }

        let message = self.message?;
        let caller = CallerId::Int(message.from.as_ref()?.id);
        let target = ReplyTarget {
            chat_id: message.chat.id,
            origin_message_id: None,
        };

        let kind = if let Some(document) = message.document {
            EventKind::FileUpload {
                file_ref: document.file_id,
                file_name: document.file_name.unwrap_or_default(),
            }
        } else {
            let (name, args) = split_command(message.text.as_deref()?)?;
            EventKind::Command { name, args }
        };
        Some((InboundEvent { caller, target, kind }, None))
    }
}

/// 上传文件名只保留最后一段，去掉路径分隔符
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or("");
    let base = base.trim_start_matches('.');
    if base.is_empty() {
        "upload".to_string()
    } else {
        base.to_string()
    }
}

pub struct TelegramClient {
    http: reqwest::Client,
    api_base: String,
    token: String,
    upload_dir: PathBuf,
    poll_timeout_secs: u64,
}

impl TelegramClient {
    pub fn new(
        api_base: impl Into<String>,
        token: impl Into<String>,
        upload_dir: impl Into<PathBuf>,
        poll_timeout_secs: u64,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token: token.into(),
            upload_dir: upload_dir.into(),
            poll_timeout_secs,
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.token, method)
    }

    async fn unwrap_response<T: DeserializeOwned>(
        resp: reqwest::Response,
        method: &str,
    ) -> Result<T, TelegramError> {
        let body: ApiResponse<T> = resp.json().await?;
        match body {
            ApiResponse {
                ok: true,
                result: Some(result),
                ..
            } => Ok(result),
            ApiResponse { description, .. } => Err(TelegramError::Api(format!(
                "{method}: {}",
                description.unwrap_or_else(|| "no description".to_string())
            ))),
        }
    }

    async fn call<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        method: &str,
        body: &B,
    ) -> Result<T, TelegramError> {
        let resp = self
            .http
            .post(self.method_url(method))
            .json(body)
            .timeout(Duration::from_secs(30))
            .send()
            .await?;
        Self::unwrap_response(resp, method).await
    }

    /// 长轮询拉取 offset 之后的更新
    pub async fn get_updates(&self, offset: i64) -> Result<Vec<Update>, TelegramError> {
        let body = serde_json::json!({
            "offset": offset,
            "timeout": self.poll_timeout_secs,
            "allowed_updates": ["message", "callback_query"],
        });
        let resp = self
            .http
            .post(self.method_url("getUpdates"))
            .json(&body)
            .timeout(Duration::from_secs(self.poll_timeout_secs + 10))
            .send()
            .await?;
        Self::unwrap_response(resp, "getUpdates").await
    }

    pub async fn answer_callback(&self, callback_id: &str) -> Result<(), TelegramError> {
        let body = serde_json::json!({ "callback_query_id": callback_id });
        self.call::<bool, _>("answerCallbackQuery", &body).await.map(|_| ())
    }
}

#[async_trait]
impl ChatTransport for TelegramClient {
    async fn send_text(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<&InlineKeyboard>,
    ) -> BotResult<MessageRef> {
        let body = SendMessage {
            chat_id,
            text,
            reply_markup: keyboard,
        };
        let message: Message = self.call("sendMessage", &body).await?;
        Ok(MessageRef {
            chat_id: message.chat.id,
            message_id: message.message_id,
        })
    }

    async fn edit_text(
        &self,
        message: MessageRef,
        text: &str,
        keyboard: Option<&InlineKeyboard>,
    ) -> BotResult<()> {
        let body = EditMessageText {
            chat_id: message.chat_id,
            message_id: message.message_id,
            text,
            reply_markup: keyboard,
        };
        // 成功时 result 为 Message（或内联消息时为 true），此处不关心内容
        match self.call::<serde_json::Value, _>("editMessageText", &body).await {
            Ok(_) => Ok(()),
            Err(TelegramError::Api(desc)) if desc.contains("message is not modified") => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn send_document(&self, chat_id: i64, path: &Path) -> BotResult<()> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "document".to_string());
        let form = Form::new()
            .text("chat_id", chat_id.to_string())
            .part("document", Part::bytes(bytes).file_name(file_name));
        let resp = self
            .http
            .post(self.method_url("sendDocument"))
            .multipart(form)
            .timeout(Duration::from_secs(120))
            .send()
            .await
            .map_err(TelegramError::from)?;
        Self::unwrap_response::<serde_json::Value>(resp, "sendDocument").await?;
        Ok(())
    }

    async fn fetch_file(&self, file_ref: &str, file_name: &str) -> BotResult<PathBuf> {
        let body = serde_json::json!({ "file_id": file_ref });
        let info: FileInfo = self.call("getFile", &body).await?;
        let remote = info
            .file_path
            .ok_or_else(|| BotError::ExternalCallFailed("getFile returned no file_path".into()))?;

        let url = format!("{}/file/bot{}/{}", self.api_base, self.token, remote);
        let resp = self
            .http
            .get(url)
            .timeout(Duration::from_secs(120))
            .send()
            .await?
            .error_for_status()?;
        let bytes = resp.bytes().await?;

        // uuid 前缀避免同名上传互相覆盖
        tokio::fs::create_dir_all(&self.upload_dir).await?;
        let local = self.upload_dir.join(format!(
            "{}_{}",
            uuid::Uuid::new_v4().simple(),
            sanitize_file_name(file_name)
        ));
        tokio::fs::write(&local, &bytes).await?;
        tracing::info!(path = %local.display(), size = bytes.len(), "upload downloaded");
        Ok(local)
    }
}
