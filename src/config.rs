//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `N8NBEE__*` 覆盖（双下划线表示嵌套，如 `N8NBEE__N8N__CONTAINER=n8n-prod`），
//! 最后兼容旧版扁平环境变量（TELEGRAM_BOT_TOKEN、AUTHORIZED_USER_ID、N8N_API_URL 等）。

use std::path::PathBuf;

use serde::Deserialize;

use crate::core::BotError;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub telegram: TelegramSection,
    pub n8n: N8nSection,
    pub paths: PathsSection,
    pub restore: RestoreSection,
    pub bot: BotSection,
}

/// [telegram] 段：Bot Token、唯一授权用户、长轮询参数
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TelegramSection {
    pub bot_token: String,
    /// 唯一允许操作机器人的用户 ID，0 表示未配置
    pub authorized_user_id: i64,
    pub api_base: String,
    /// getUpdates 长轮询等待秒数
    pub poll_timeout_secs: u64,
}

impl Default for TelegramSection {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            authorized_user_id: 0,
            api_base: "https://api.telegram.org".to_string(),
            poll_timeout_secs: 30,
        }
    }
}

/// [n8n] 段：API 地址、可选 API Key、容器名与超时
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct N8nSection {
    pub api_url: String,
    pub api_key: Option<String>,
    pub container: String,
    /// 普通调用超时（秒）
    pub request_timeout_secs: u64,
    /// run / import 超时（秒）
    pub long_timeout_secs: u64,
}

impl Default for N8nSection {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:5678".to_string(),
            api_key: None,
            container: "n8n".to_string(),
            request_timeout_secs: 10,
            long_timeout_secs: 30,
        }
    }
}

/// [paths] 段：数据、备份、日志目录与上传文件暂存目录
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathsSection {
    pub data_dir: PathBuf,
    pub backup_dir: PathBuf,
    pub log_dir: PathBuf,
    /// 用户上传文件的下载目录，未设置时用系统临时目录
    pub upload_dir: Option<PathBuf>,
}

impl Default for PathsSection {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("/root/n8n_data"),
            backup_dir: PathBuf::from("/root/n8n_backups"),
            log_dir: PathBuf::from("/var/log/n8n"),
            upload_dir: None,
        }
    }
}

impl PathsSection {
    pub fn upload_dir(&self) -> PathBuf {
        self.upload_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("n8n-bee-uploads"))
    }
}

/// 全量备份的还原位置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RestoreMode {
    /// n8n_data/ → data_dir，n8n_logs/ → log_dir，其余条目跳过
    #[default]
    Mapped,
    /// 旧行为：相对文件系统根目录解包（危险，需显式开启）
    FilesystemRoot,
}

/// [restore] 段
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RestoreSection {
    pub mode: RestoreMode,
}

/// [bot] 段：日志行数与事件并发
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BotSection {
    pub log_tail_lines: usize,
    /// 同时处理的事件数，1 即严格串行
    pub max_concurrent_events: usize,
}

impl Default for BotSection {
    fn default() -> Self {
        Self {
            log_tail_lines: 100,
            max_concurrent_events: 1,
        }
    }
}

impl AppConfig {
    /// 启动前校验：Bot Token 与授权用户必须配置
    pub fn validate(&self) -> Result<(), BotError> {
        if self.telegram.bot_token.trim().is_empty() {
            return Err(BotError::Config("TELEGRAM_BOT_TOKEN is not set".to_string()));
        }
        if self.telegram.authorized_user_id == 0 {
            return Err(BotError::Config("AUTHORIZED_USER_ID is not set".to_string()));
        }
        Ok(())
    }

    /// 叠加旧版扁平环境变量；lookup 便于测试时注入
    pub fn apply_legacy_env<F>(&mut self, lookup: F) -> Result<(), BotError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(token) = non_empty("TELEGRAM_BOT_TOKEN") {
            self.telegram.bot_token = token;
        }
        if let Some(id) = non_empty("AUTHORIZED_USER_ID") {
            self.telegram.authorized_user_id = id.trim().parse().map_err(|_| {
                BotError::Config(format!("AUTHORIZED_USER_ID is not an integer: {id}"))
            })?;
        }
        if let Some(url) = non_empty("N8N_API_URL") {
            self.n8n.api_url = url;
        }
        if let Some(key) = non_empty("N8N_API_KEY") {
            self.n8n.api_key = Some(key);
        }
        if let Some(container) = non_empty("N8N_CONTAINER") {
            self.n8n.container = container;
        }
        if let Some(dir) = non_empty("N8N_DATA") {
            self.paths.data_dir = PathBuf::from(dir);
        }
        if let Some(dir) = non_empty("N8N_BACKUPS") {
            self.paths.backup_dir = PathBuf::from(dir);
        }
        if let Some(dir) = non_empty("N8N_LOGS") {
            self.paths.log_dir = PathBuf::from(dir);
        }
        Ok(())
    }
}

/// 从 config 目录加载配置，环境变量 N8NBEE__* 与旧版变量可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 叠加环境变量 N8NBEE__*（双下划线表示嵌套键）
/// 4. 叠加旧版扁平变量
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, BotError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("N8NBEE")
            .separator("__")
            .try_parsing(true),
    );

    let mut cfg: AppConfig = builder
        .build()
        .and_then(|c| c.try_deserialize())
        .map_err(|e| BotError::Config(e.to_string()))?;
    cfg.apply_legacy_env(|key| std::env::var(key).ok())?;
    Ok(cfg)
}
