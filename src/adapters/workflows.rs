//! n8n 工作流注册表客户端
//!
//! 通过 HTTP API 列出 / 获取 / 触发 / 启停 / 删除 / 导入工作流。
//! 每次调用只发一次请求（run 除外：按候选端点依次探测，各试一次，用于兼容不同版本的 n8n），
//! 超时即失败，不重试。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::{BotError, BotResult};

/// 触发工作流的候选端点（按顺序探测）
pub const RUN_ENDPOINTS: &[&str] = &["execute", "run", "executions"];

/// 工作流快照：保留服务端返回的完整 JSON，导出时原样写出
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Workflow {
    raw: Value,
}

impl Workflow {
    /// 仅接受 JSON 对象
    pub fn from_value(raw: Value) -> Option<Self> {
        raw.is_object().then_some(Self { raw })
    }

    /// 工作流 ID：依次取 id → workflowId → uuid，数字 ID 转为字符串
    pub fn id(&self) -> Option<String> {
        ["id", "workflowId", "uuid"]
            .iter()
            .filter_map(|key| self.raw.get(*key))
            .find_map(|v| match v {
                Value::String(s) if !s.is_empty() => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
    }

    pub fn name(&self) -> Option<&str> {
        self.str_field("name")
    }

    pub fn label(&self) -> Option<&str> {
        self.str_field("label")
    }

    pub fn active(&self) -> Option<bool> {
        self.raw.get("active").and_then(Value::as_bool)
    }

    /// 按钮上展示的名称：name → label → workflow_<id>
    pub fn display_name(&self) -> String {
        self.name()
            .or_else(|| self.label())
            .map(str::to_string)
            .unwrap_or_else(|| format!("workflow_{}", self.id().unwrap_or_default()))
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }

    fn str_field(&self, key: &str) -> Option<&str> {
        self.raw
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }
}

/// 工作流注册表 trait（注入点，测试可替换）
#[async_trait]
pub trait WorkflowRegistry: Send + Sync {
    /// 空列表与拉取失败是两种结果：Ok(vec![]) / Err(..)
    async fn list(&self) -> BotResult<Vec<Workflow>>;

    async fn get(&self, id: &str) -> BotResult<Workflow>;

    /// 触发执行，返回服务端响应体（无响应体时为 {"status": code}）
    async fn run(&self, id: &str) -> BotResult<Value>;

    async fn activate(&self, id: &str) -> BotResult<()>;

    async fn deactivate(&self, id: &str) -> BotResult<()>;

    async fn delete(&self, id: &str) -> BotResult<()>;

    /// 以原始字节 POST 到导入端点
    async fn import(&self, raw: Vec<u8>) -> BotResult<()>;
}

/// n8n HTTP 客户端
pub struct N8nClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    timeout: Duration,
    long_timeout: Duration,
}

impl N8nClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout_secs: u64,
        long_timeout_secs: u64,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
            timeout: Duration::from_secs(timeout_secs),
            long_timeout: Duration::from_secs(long_timeout_secs),
        }
    }

    fn request(&self, method: Method, path: &str, timeout: Duration) -> RequestBuilder {
        let builder = self
            .http
            .request(method, format!("{}{}", self.base_url, path))
            .timeout(timeout);
        match &self.api_key {
            Some(key) => builder.bearer_auth(key).header("X-N8N-API-KEY", key),
            None => builder,
        }
    }

    /// 发送请求，非 2xx 转为错误（404 → NotFound）
    async fn send(&self, builder: RequestBuilder, what: &str) -> BotResult<reqwest::Response> {
        let resp = builder.send().await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        tracing::warn!(what = %what, status = %status, "n8n API call failed");
        if status == StatusCode::NOT_FOUND {
            Err(BotError::NotFound(what.to_string()))
        } else {
            Err(BotError::ExternalCallFailed(format!("{what}: HTTP {status}")))
        }
    }

    async fn post_simple(&self, id: &str, action: &str) -> BotResult<()> {
        let path = format!("{}/{action}", workflow_path(id)?);
        let what = format!("{action} workflow {id}");
        self.send(self.request(Method::POST, &path, self.timeout), &what)
            .await
            .map(|_| ())
    }
}

/// /workflows/{id}；拒绝会改变 URL 结构的 ID
fn workflow_path(id: &str) -> BotResult<String> {
    if id.is_empty() || id.contains(['/', '?', '#', '%']) || id.contains("..") {
        return Err(BotError::UnsupportedInput(format!("invalid workflow id: {id}")));
    }
    Ok(format!("/workflows/{id}"))
}

/// 兼容裸数组与 n8n Public API 的 {"data": [...]} 包装
pub fn parse_workflow_list(body: Value) -> BotResult<Vec<Workflow>> {
    let items = match body {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(BotError::ExternalCallFailed(
                    "unexpected workflow list payload".to_string(),
                ))
            }
        },
        _ => {
            return Err(BotError::ExternalCallFailed(
                "unexpected workflow list payload".to_string(),
            ))
        }
    };
    Ok(items.into_iter().filter_map(Workflow::from_value).collect())
}

/// 单个工作流：部分版本返回 {"data": {...}}
fn unwrap_single(body: Value) -> Value {
    match body {
        Value::Object(ref map) if map.len() == 1 && map.get("data").is_some_and(Value::is_object) => {
            map["data"].clone()
        }
        other => other,
    }
}

#[async_trait]
impl WorkflowRegistry for N8nClient {
    async fn list(&self) -> BotResult<Vec<Workflow>> {
        let resp = self
            .send(self.request(Method::GET, "/workflows", self.timeout), "list workflows")
            .await?;
        parse_workflow_list(resp.json::<Value>().await?)
    }

    async fn get(&self, id: &str) -> BotResult<Workflow> {
        let path = workflow_path(id)?;
        let what = format!("workflow {id}");
        let resp = self
            .send(self.request(Method::GET, &path, self.timeout), &what)
            .await?;
        let body = unwrap_single(resp.json::<Value>().await?);
        Workflow::from_value(body)
            .ok_or_else(|| BotError::ExternalCallFailed(format!("{what}: not a JSON object")))
    }

    async fn run(&self, id: &str) -> BotResult<Value> {
        let base = workflow_path(id)?;
        let mut last_error = String::from("no endpoint accepted the request");

        for endpoint in RUN_ENDPOINTS {
            let path = format!("{base}/{endpoint}");
            let resp = match self
                .request(Method::POST, &path, self.long_timeout)
                .send()
                .await
            {
                Ok(resp) => resp,
                Err(e) => {
                    tracing::debug!(endpoint = %path, error = %e, "run endpoint unreachable");
                    last_error = e.to_string();
                    continue;
                }
            };

            let status = resp.status();
            if !matches!(status.as_u16(), 200 | 201 | 202) {
                tracing::debug!(endpoint = %path, status = %status, "run endpoint rejected");
                last_error = format!("{path}: HTTP {status}");
                continue;
            }

            tracing::info!(workflow = %id, endpoint = %path, "workflow triggered");
            let bytes = resp.bytes().await.unwrap_or_default();
            if bytes.is_empty() {
                return Ok(serde_json::json!({ "status": status.as_u16() }));
            }
            return Ok(serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                serde_json::json!({
                    "status": status.as_u16(),
                    "body": String::from_utf8_lossy(&bytes),
                })
            }));
        }

        Err(BotError::ExternalCallFailed(format!(
            "Failed to trigger workflow ({last_error})"
        )))
    }

    async fn activate(&self, id: &str) -> BotResult<()> {
        self.post_simple(id, "activate").await
    }

    async fn deactivate(&self, id: &str) -> BotResult<()> {
        self.post_simple(id, "deactivate").await
    }

    async fn delete(&self, id: &str) -> BotResult<()> {
        let path = workflow_path(id)?;
        let what = format!("delete workflow {id}");
        self.send(self.request(Method::DELETE, &path, self.timeout), &what)
            .await
            .map(|_| ())
    }

    async fn import(&self, raw: Vec<u8>) -> BotResult<()> {
        let builder = self
            .request(Method::POST, "/workflows/import", self.long_timeout)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(raw);
        self.send(builder, "import workflow").await.map(|_| ())
    }
}
