//! 核心：错误类型、事件处理池、优雅关闭

pub mod error;
pub mod event_pool;
pub mod shutdown;

pub use error::{BotError, BotResult};
pub use event_pool::EventPool;
pub use shutdown::{ShutdownManager, ShutdownReason};
