//! 路由策略定义
//!
//! 内置轮询和随机两种策略，自定义策略通过 [`SelectStrategy`] trait 注入。

use crate::error::OrchestratorError;
use crate::types::{RouteRequest, ServiceInfo};
use async_trait::async_trait;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// 自定义选择策略
///
/// `select` 收到完整的拓扑快照和路由请求，必须返回其中一个成员；
/// 选择过程允许挂起（例如查询外部系统）。返回 `None` 视为无可用实例。
#[async_trait]
pub trait SelectStrategy: Send + Sync {
    /// 策略名称
    fn name(&self) -> &str;

    /// 从拓扑中选出一个实例
    async fn select(
        &self,
        instances: &[ServiceInfo],
        request: &RouteRequest,
    ) -> Option<ServiceInfo>;
}

/// 路由策略
#[derive(Clone)]
pub enum RoutingStrategy {
    /// 轮询
    RoundRobin,
    /// 随机
    Random,
    /// 自定义策略
    Custom(Arc<dyn SelectStrategy>),
}

impl RoutingStrategy {
    /// 策略名称
    pub fn name(&self) -> &str {
        match self {
            RoutingStrategy::RoundRobin => "round-robin",
            RoutingStrategy::Random => "random",
            RoutingStrategy::Custom(strategy) => strategy.name(),
        }
    }
}

impl fmt::Debug for RoutingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RoutingStrategy {
    type Err = OrchestratorError;

    /// 解析内置策略名；未知名称立即报错，而不是延迟到路由时
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "round_robin" | "roundrobin" => Ok(RoutingStrategy::RoundRobin),
            "random" => Ok(RoutingStrategy::Random),
            _ => Err(OrchestratorError::unknown_strategy(s)),
        }
    }
}
