//! n8n-bee 入口
//!
//! 初始化日志、加载并校验配置、装配 Dispatcher，运行 Telegram 长轮询直至收到关闭信号。
//!
//! 环境变量:
//! - TELEGRAM_BOT_TOKEN: Bot Token（必填）
//! - AUTHORIZED_USER_ID: 唯一授权用户 ID（必填，非 0）
//! - N8N_API_URL / N8N_API_KEY: n8n API 地址与可选 Key
//! - N8N_CONTAINER: n8n 容器名
//! - N8N_DATA / N8N_BACKUPS / N8N_LOGS: 数据、备份、日志目录
//!
//! 启动: cargo run -- [config.toml]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use n8n_bee::bot::{create_dispatcher, create_telegram_client};
use n8n_bee::config::load_config;
use n8n_bee::core::{EventPool, ShutdownManager};
use n8n_bee::observability;
use n8n_bee::transport::run_polling;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();

    let cfg = load_config(std::env::args().nth(1).map(PathBuf::from))
        .context("Failed to load config")?;
    if let Err(e) = cfg.validate() {
        tracing::error!(error = %e, "TELEGRAM_BOT_TOKEN or AUTHORIZED_USER_ID not set. Exiting.");
        std::process::exit(1);
    }

    tokio::fs::create_dir_all(cfg.paths.upload_dir())
        .await
        .context("Failed to create upload directory")?;

    let dispatcher = Arc::new(create_dispatcher(&cfg));
    let client = Arc::new(create_telegram_client(&cfg));
    let pool = EventPool::new(cfg.bot.max_concurrent_events);

    let shutdown = Arc::new(ShutdownManager::new());
    shutdown.install_signal_handlers();

    tracing::info!(
        container = %cfg.n8n.container,
        api = %cfg.n8n.api_url,
        restore_mode = ?cfg.restore.mode,
        "n8n-bee is starting"
    );
    run_polling(client, dispatcher, pool, shutdown).await;
    tracing::info!("n8n-bee stopped");

    Ok(())
}
