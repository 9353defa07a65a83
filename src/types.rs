//! 核心数据类型
//!
//! 服务实例、注册表事件、健康状态和路由请求的定义

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 服务实例信息
///
/// `id` 是实例的唯一标识，`name` 是逻辑服务分组（同名实例互为可替换副本）。
/// 注册后不可变：更新实例需要先注销再注册。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceInfo {
    /// 实例 ID（唯一标识）
    pub id: String,

    /// 逻辑服务名（如 "payments", "search"）
    pub name: String,

    /// 主机地址
    pub host: String,

    /// 端口
    pub port: u16,

    /// 自定义元数据（如 version、region）
    pub metadata: HashMap<String, serde_json::Value>,
}

impl ServiceInfo {
    /// 创建新的服务实例
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        host: impl Into<String>,
        port: u16,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            host: host.into(),
            port,
            metadata: HashMap::new(),
        }
    }

    /// 添加元数据
    pub fn with_metadata(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// 转换为基础 HTTP URL
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    /// 健康检查 URL
    pub fn health_url(&self, path: &str) -> String {
        format!("http://{}:{}{}", self.host, self.port, path)
    }
}

/// 注册表事件类型
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ServiceEventType {
    Added,
    Removed,
    Updated,
}

/// 注册表变更事件
///
/// 注册表每次变更都会向对应服务名的订阅者广播一条事件；
/// 单个注册表实例内的事件顺序与变更顺序一致。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceEvent {
    /// 事件类型
    pub event_type: ServiceEventType,

    /// 涉及的服务实例
    pub service: ServiceInfo,

    /// 事件时间戳
    pub timestamp: DateTime<Utc>,
}

impl ServiceEvent {
    /// 创建新的变更事件（时间戳为当前时间）
    pub fn new(event_type: ServiceEventType, service: ServiceInfo) -> Self {
        Self {
            event_type,
            service,
            timestamp: Utc::now(),
        }
    }
}

/// 健康检查结果
///
/// 瞬时状态，不持久化；每个实例只保留最近一次结果。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    /// 是否健康
    pub healthy: bool,

    /// 响应耗时（毫秒）
    pub response_time_ms: u64,

    /// 失败原因（仅在不健康时存在）
    pub error: Option<String>,
}

impl HealthStatus {
    /// 创建健康结果
    pub fn up(response_time_ms: u64) -> Self {
        Self {
            healthy: true,
            response_time_ms,
            error: None,
        }
    }

    /// 创建不健康结果
    pub fn down(response_time_ms: u64, error: impl Into<String>) -> Self {
        Self {
            healthy: false,
            response_time_ms,
            error: Some(error.into()),
        }
    }
}

/// 路由请求
///
/// 对内置策略是不透明的；自定义策略可以读取 path 和 headers 做选择。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RouteRequest {
    /// 请求路径
    pub path: String,

    /// 请求头
    pub headers: HashMap<String, String>,
}

impl RouteRequest {
    /// 创建新的路由请求
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            headers: HashMap::new(),
        }
    }

    /// 添加请求头
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }
}
