//! 动态路由模块
//!
//! 从物化的实例列表（拓扑）中按当前策略选出一个实例。
//! 拓扑更新永远是整体替换，读者不会观察到半更新的列表。

pub mod strategy;

pub use strategy::{RoutingStrategy, SelectStrategy};

use crate::error::{OrchestratorError, Result};
use crate::types::{RouteRequest, ServiceInfo};
use rand::Rng;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;
use tracing::debug;

/// 动态路由器
pub struct DynamicRouter {
    topology: Arc<RwLock<Vec<ServiceInfo>>>,
    strategy: Arc<RwLock<RoutingStrategy>>,
    round_robin_index: AtomicUsize,
}

impl DynamicRouter {
    /// 创建新的路由器（默认轮询策略）
    pub fn new() -> Self {
        Self::with_strategy(RoutingStrategy::RoundRobin)
    }

    /// 创建指定策略的路由器
    pub fn with_strategy(strategy: RoutingStrategy) -> Self {
        Self {
            topology: Arc::new(RwLock::new(Vec::new())),
            strategy: Arc::new(RwLock::new(strategy)),
            round_robin_index: AtomicUsize::new(0),
        }
    }

    /// 整体替换当前拓扑
    pub async fn update_topology(&self, instances: Vec<ServiceInfo>) {
        let mut topology = self.topology.write().await;
        *topology = instances;
    }

    /// 当前拓扑快照
    pub async fn topology(&self) -> Vec<ServiceInfo> {
        self.topology.read().await.clone()
    }

    /// 切换选择策略，下一次 `route` 调用生效
    pub async fn set_strategy(&self, strategy: RoutingStrategy) {
        debug!(strategy = strategy.name(), "Routing strategy updated");
        *self.strategy.write().await = strategy;
    }

    /// 按名称切换内置策略；未知名称立即返回错误
    pub async fn set_strategy_by_name(&self, name: &str) -> Result<()> {
        let strategy: RoutingStrategy = name.parse()?;
        self.set_strategy(strategy).await;
        Ok(())
    }

    /// 当前策略名称
    pub async fn strategy_name(&self) -> String {
        self.strategy.read().await.name().to_string()
    }

    /// 按当前策略从拓扑中选出一个实例
    ///
    /// 拓扑为空时返回 [`OrchestratorError::NoServicesAvailable`]。
    /// 自定义策略的 `select` 在拓扑快照上执行，挂起期间不持有锁。
    pub async fn route(&self, request: &RouteRequest) -> Result<ServiceInfo> {
        let topology = self.topology.read().await.clone();
        if topology.is_empty() {
            return Err(OrchestratorError::no_services());
        }

        let strategy = self.strategy.read().await.clone();
        match strategy {
            RoutingStrategy::RoundRobin => {
                let index = self.round_robin_index.fetch_add(1, Ordering::Relaxed);
                Ok(topology[index % topology.len()].clone())
            }
            RoutingStrategy::Random => {
                let index = rand::thread_rng().gen_range(0..topology.len());
                Ok(topology[index].clone())
            }
            RoutingStrategy::Custom(custom) => custom
                .select(&topology, request)
                .await
                .ok_or(OrchestratorError::NoServicesAvailable),
        }
    }
}

impl Default for DynamicRouter {
    fn default() -> Self {
        Self::new()
    }
}
