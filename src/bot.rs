//! 启动装配：由配置构建适配器并注入 Dispatcher

use std::sync::Arc;

use crate::adapters::{
    ArchiveManager, ArchivePaths, ContainerControl, DockerCli, N8nClient, SysinfoProbe,
    WorkflowRegistry,
};
use crate::auth::AuthGate;
use crate::config::AppConfig;
use crate::dispatch::{BotComponents, Dispatcher};
use crate::transport::TelegramClient;

/// 生产环境组件：docker CLI、n8n HTTP 客户端、sysinfo
pub fn create_bot_components(cfg: &AppConfig) -> BotComponents {
    let container: Arc<dyn ContainerControl> = Arc::new(DockerCli::new(
        cfg.n8n.container.clone(),
        cfg.n8n.long_timeout_secs,
    ));
    let registry: Arc<dyn WorkflowRegistry> = Arc::new(N8nClient::new(
        cfg.n8n.api_url.clone(),
        cfg.n8n.api_key.clone(),
        cfg.n8n.request_timeout_secs,
        cfg.n8n.long_timeout_secs,
    ));
    let archive = ArchiveManager::new(
        ArchivePaths {
            data_dir: cfg.paths.data_dir.clone(),
            backup_dir: cfg.paths.backup_dir.clone(),
            log_dir: cfg.paths.log_dir.clone(),
        },
        cfg.restore.mode,
        container.clone(),
        registry.clone(),
    );

    BotComponents {
        gate: AuthGate::new(cfg.telegram.authorized_user_id),
        container,
        registry,
        archive,
        host: Arc::new(SysinfoProbe),
        log_tail_lines: cfg.bot.log_tail_lines,
    }
}

pub fn create_dispatcher(cfg: &AppConfig) -> Dispatcher {
    Dispatcher::new(create_bot_components(cfg))
}

pub fn create_telegram_client(cfg: &AppConfig) -> TelegramClient {
    TelegramClient::new(
        cfg.telegram.api_base.clone(),
        cfg.telegram.bot_token.clone(),
        cfg.paths.upload_dir(),
        cfg.telegram.poll_timeout_secs,
    )
}
