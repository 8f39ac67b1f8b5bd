//! 回复通道：传输层需要提供的最小接口，以及回复目标与长文本分段
//!
//! 按钮触发的事件通过编辑按钮所在消息回复；命令触发的事件发送新消息。

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::core::BotResult;
use crate::presentation::InlineKeyboard;

/// 日志超过此字符数时分段发送
pub const LOG_DISPLAY_LIMIT: usize = 4000;
/// 每段最多字符数
pub const LOG_CHUNK_CHARS: usize = 3500;

/// 已发送消息的引用（用于后续编辑）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageRef {
    pub chat_id: i64,
    pub message_id: i64,
}

/// 事件的回复位置：会话 ID + 可选的来源消息（按钮所在消息）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplyTarget {
    pub chat_id: i64,
    pub origin_message_id: Option<i64>,
}

/// 聊天传输层 trait（注入点，测试可替换为记录型实现）
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send_text(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<&InlineKeyboard>,
    ) -> BotResult<MessageRef>;

    async fn edit_text(
        &self,
        message: MessageRef,
        text: &str,
        keyboard: Option<&InlineKeyboard>,
    ) -> BotResult<()>;

    async fn send_document(&self, chat_id: i64, path: &Path) -> BotResult<()>;

    /// 下载用户上传的文件，返回本地路径（仅在授权通过后调用）
    async fn fetch_file(&self, file_ref: &str, file_name: &str) -> BotResult<PathBuf>;
}

/// 绑定了回复目标的回复器
pub struct Responder<'a> {
    transport: &'a dyn ChatTransport,
    target: ReplyTarget,
}

impl<'a> Responder<'a> {
    pub fn new(transport: &'a dyn ChatTransport, target: ReplyTarget) -> Self {
        Self { transport, target }
    }

    pub fn chat_id(&self) -> i64 {
        self.target.chat_id
    }

    /// 主回复：按钮事件编辑来源消息，否则发送新消息
    pub async fn reply(&self, text: &str, keyboard: Option<&InlineKeyboard>) -> BotResult<MessageRef> {
        match self.target.origin_message_id {
            Some(message_id) => {
                let message = MessageRef {
                    chat_id: self.target.chat_id,
                    message_id,
                };
                self.transport.edit_text(message, text, keyboard).await?;
                Ok(message)
            }
            None => self.transport.send_text(self.target.chat_id, text, keyboard).await,
        }
    }

    /// 总是发送新消息（用于日志分段）
    pub async fn send_new(&self, text: &str) -> BotResult<MessageRef> {
        self.transport.send_text(self.target.chat_id, text, None).await
    }

    pub async fn edit(&self, message: MessageRef, text: &str) -> BotResult<()> {
        self.transport.edit_text(message, text, None).await
    }

    pub async fn document(&self, path: &Path) -> BotResult<()> {
        self.transport.send_document(self.target.chat_id, path).await
    }

    pub async fn fetch_file(&self, file_ref: &str, file_name: &str) -> BotResult<PathBuf> {
        self.transport.fetch_file(file_ref, file_name).await
    }
}

/// 按字符（Unicode 标量）切分，每段不超过 max_chars
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(max_chars.max(1))
        .map(|c| c.iter().collect())
        .collect()
}

/// 截断到 max_chars 个字符，超出时追加省略号
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars).collect();
    out.push('…');
    out
}
