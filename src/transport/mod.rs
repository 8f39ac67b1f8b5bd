//! 聊天传输层：Telegram 长轮询与回复通道

pub mod runner;
pub mod telegram;

pub use runner::run_polling;
pub use telegram::{TelegramClient, TelegramError, Update};
