//! n8n-bee - n8n 远程管理机器人
//!
//! 模块划分：
//! - **adapters**: 外部动作适配器（docker 容器、n8n 工作流 API、备份归档、主机状态）
//! - **auth**: 单一授权用户校验
//! - **bot**: 由配置装配生产组件
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误类型、事件处理池、优雅关闭
//! - **dispatch**: 命令 / 按钮 / 上传事件的分发与回复
//! - **observability**: 日志初始化
//! - **presentation**: 主菜单与工作流菜单按钮布局
//! - **transport**: Telegram 长轮询与回复通道

pub mod adapters;
pub mod auth;
pub mod bot;
pub mod config;
pub mod core;
pub mod dispatch;
pub mod observability;
pub mod presentation;
pub mod transport;

pub use bot::{create_bot_components, create_dispatcher};
