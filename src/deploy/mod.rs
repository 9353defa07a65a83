//! 部署控制模块
//!
//! 金丝雀发布、蓝绿切换和回滚。部署覆盖在常规路由之前求值，
//! 顺序为金丝雀（概率）优先于蓝绿（确定性固定），避免进行中的
//! 金丝雀实验被遗留的蓝绿固定遮蔽。

use crate::types::ServiceInfo;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

/// 金丝雀配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanaryConfig {
    /// 金丝雀实例
    pub service: ServiceInfo,

    /// 流量百分比 [0, 100]，每个请求独立判定
    pub percentage: f64,
}

/// 蓝绿槽位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActiveSlot {
    Blue,
    Green,
}

/// 蓝绿配置
///
/// 两个槽位都持有完整的实例信息：切换后的目标不要求已经进入
/// 常规拓扑，回滚后也不会残留在其中。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlueGreenConfig {
    /// 原版本实例
    pub blue: ServiceInfo,

    /// 新版本实例
    pub green: ServiceInfo,

    /// 当前生效的槽位
    pub active: ActiveSlot,
}

impl BlueGreenConfig {
    /// 当前生效的实例
    pub fn active_service(&self) -> &ServiceInfo {
        match self.active {
            ActiveSlot::Blue => &self.blue,
            ActiveSlot::Green => &self.green,
        }
    }

    /// 当前生效的实例 ID
    pub fn active_id(&self) -> &str {
        &self.active_service().id
    }
}

/// 部署控制器
///
/// 同时最多持有一份金丝雀配置和一份蓝绿配置；`rollback` 一次清除两者。
#[derive(Clone, Default)]
pub struct DeploymentController {
    canary: Arc<RwLock<Option<CanaryConfig>>>,
    blue_green: Arc<RwLock<Option<BlueGreenConfig>>>,
}

impl DeploymentController {
    /// 创建新的部署控制器
    pub fn new() -> Self {
        Self::default()
    }

    /// 配置金丝雀发布（覆盖之前的配置）
    ///
    /// `percentage` 被收敛到 [0, 100]。
    pub async fn canary_deploy(&self, service: ServiceInfo, percentage: f64) {
        let percentage = percentage.clamp(0.0, 100.0);
        info!(
            service_id = %service.id,
            percentage,
            "Canary deployment configured"
        );
        *self.canary.write().await = Some(CanaryConfig {
            service,
            percentage,
        });
    }

    /// 蓝绿切换：之后全部流量固定到 `green`，直到下次变更
    pub async fn blue_green_switch(&self, blue: ServiceInfo, green: ServiceInfo) {
        info!(
            blue_id = %blue.id,
            green_id = %green.id,
            "Blue-green switch: traffic pinned to green"
        );
        *self.blue_green.write().await = Some(BlueGreenConfig {
            blue,
            green,
            active: ActiveSlot::Green,
        });
    }

    /// 回滚：清除金丝雀和蓝绿覆盖，恢复常规拓扑路由；幂等
    pub async fn rollback(&self) {
        let canary = self.canary.write().await.take();
        let blue_green = self.blue_green.write().await.take();
        if canary.is_some() || blue_green.is_some() {
            info!("Deployment overrides rolled back");
        }
    }

    /// 当前金丝雀配置
    pub async fn active_canary(&self) -> Option<CanaryConfig> {
        self.canary.read().await.clone()
    }

    /// 当前蓝绿配置
    pub async fn active_blue_green(&self) -> Option<BlueGreenConfig> {
        self.blue_green.read().await.clone()
    }

    /// 求部署覆盖：金丝雀 → 蓝绿 → `None`（落回常规路由）
    pub async fn select(&self) -> Option<ServiceInfo> {
        let canary = self.canary.read().await;
        if let Some(config) = canary.as_ref() {
            if rand::thread_rng().gen_range(0.0..100.0) < config.percentage {
                return Some(config.service.clone());
            }
        }
        drop(canary);

        let blue_green = self.blue_green.read().await;
        if let Some(config) = blue_green.as_ref() {
            return Some(config.active_service().clone());
        }

        None
    }
}
