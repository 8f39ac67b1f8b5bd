//! 命令分发层：事件 → 授权 → Verb → 适配器 → 回复
//!
//! 每个事件独立处理，没有多轮会话状态；「还原」流程只依赖用户下一次上传的文件扩展名。

pub mod action;
pub mod command;
pub mod dispatcher;
pub mod reply;

use crate::auth::CallerId;

pub use action::{ActionToken, Verb};
pub use dispatcher::{classify_upload, BotComponents, Dispatcher, UploadKind};
pub use reply::{ChatTransport, MessageRef, ReplyTarget, Responder};

/// 传输层投递给 Dispatcher 的事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// 文本命令（已去掉前导 `/` 与 `@botname`）
    Command { name: String, args: Vec<String> },
    /// 按钮点击，token 为 callback_data 原文
    ButtonPress { token: String },
    /// 文件上传；file_ref 为传输层文件标识，授权后才下载
    FileUpload { file_ref: String, file_name: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    pub caller: CallerId,
    pub target: ReplyTarget,
    pub kind: EventKind,
}
