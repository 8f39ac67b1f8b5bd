//! 授权门：单一授权用户，无多用户 ACL
//!
//! 每个命令、按钮、文件上传在执行前都必须先经过 AuthGate::authorize。

use std::fmt;

use crate::core::{BotError, BotResult};

/// 调用方身份：传输层可能给出整数或字符串，比较前统一规整为 i64
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallerId {
    Int(i64),
    Str(String),
}

impl CallerId {
    /// 规整为整数；无法解析的字符串返回 None（永远不会被授权）
    pub fn normalized(&self) -> Option<i64> {
        match self {
            CallerId::Int(id) => Some(*id),
            CallerId::Str(s) => s.trim().parse().ok(),
        }
    }
}

impl From<i64> for CallerId {
    fn from(id: i64) -> Self {
        CallerId::Int(id)
    }
}

impl From<&str> for CallerId {
    fn from(id: &str) -> Self {
        CallerId::Str(id.to_string())
    }
}

impl fmt::Display for CallerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallerId::Int(id) => write!(f, "{id}"),
            CallerId::Str(s) => write!(f, "{s}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthDecision {
    Allow,
    Deny,
}

#[derive(Debug, Clone)]
pub struct AuthGate {
    authorized: i64,
}

impl AuthGate {
    pub fn new(authorized: i64) -> Self {
        Self { authorized }
    }

    /// 拒绝时返回 BotError::Unauthorized，其文本即回复给调用方的内容
    pub fn check(&self, caller: &CallerId) -> BotResult<()> {
        match self.authorize(caller) {
            AuthDecision::Allow => Ok(()),
            AuthDecision::Deny => Err(BotError::Unauthorized),
        }
    }

    pub fn authorize(&self, caller: &CallerId) -> AuthDecision {
        match caller.normalized() {
            Some(id) if id == self.authorized => AuthDecision::Allow,
            _ => {
                tracing::warn!(caller = %caller, "unauthorized caller rejected");
                AuthDecision::Deny
            }
        }
    }
}
