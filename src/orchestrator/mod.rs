//! 编排器（组合根）
//!
//! 持有注册表、健康检查器、路由器和部署控制器各一份，对外暴露
//! register / discover / route。每次 `route` 调用都会重算健康过滤后的
//! 拓扑，再按金丝雀 → 蓝绿 → 路由策略的顺序求值。
//!
//! 配置了发现间隔 / 健康检查间隔时，对应的后台循环在构造时启动；
//! `destroy` 取消全部循环，调用时机不受 tick 边界限制。

use crate::config::OrchestratorConfig;
use crate::deploy::DeploymentController;
use crate::error::Result;
use crate::health::{HealthChecker, HealthProbe, HttpHealthProbe};
use crate::registry::{ServiceRegistry, ServiceWatcher};
use crate::router::{DynamicRouter, RoutingStrategy};
use crate::types::{RouteRequest, ServiceInfo};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// 后台循环句柄
struct LoopHandle {
    name: &'static str,
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

/// 服务编排器
pub struct Orchestrator {
    registry: Arc<ServiceRegistry>,
    health: Arc<HealthChecker>,
    router: Arc<DynamicRouter>,
    deployment: Arc<DeploymentController>,
    loops: Mutex<Vec<LoopHandle>>,
}

impl Orchestrator {
    /// 创建编排器，健康探测走 HTTP GET `{health_check.path}`
    pub fn new(config: OrchestratorConfig) -> Self {
        let probe = Arc::new(HttpHealthProbe::new(
            config.health_check.path.clone(),
            Duration::from_millis(config.health_check.timeout_ms),
        ));
        Self::with_probe(config, probe)
    }

    /// 创建编排器并注入探测器（测试用确定性探测的入口）
    pub fn with_probe(config: OrchestratorConfig, probe: Arc<dyn HealthProbe>) -> Self {
        let registry = Arc::new(ServiceRegistry::new());
        let health = Arc::new(HealthChecker::with_config(probe, &config.health_check));
        let router = Arc::new(DynamicRouter::new());
        let deployment = Arc::new(DeploymentController::new());

        let mut loops = Vec::new();
        if let Some(interval_ms) = config.discovery_interval_ms {
            info!(interval_ms, "🚀 Starting discovery loop");
            loops.push(Self::spawn_discovery_loop(
                registry.clone(),
                health.clone(),
                router.clone(),
                interval_ms,
            ));
        }
        if let Some(interval_ms) = config.health_check_interval_ms {
            info!(interval_ms, "🚀 Starting health check loop");
            loops.push(Self::spawn_health_loop(
                registry.clone(),
                health.clone(),
                router.clone(),
                interval_ms,
            ));
        }

        Self {
            registry,
            health,
            router,
            deployment,
            loops: Mutex::new(loops),
        }
    }

    /// 注册服务实例并立即重算拓扑
    pub async fn register(&self, service: ServiceInfo) {
        self.registry.register(service).await;
        self.refresh_topology().await;
    }

    /// 注销服务实例并立即重算拓扑
    pub async fn deregister(&self, id: &str) {
        self.registry.deregister(id).await;
        self.refresh_topology().await;
    }

    /// 发现服务（指定服务名的实例快照）
    pub async fn discover(&self, name: &str) -> Vec<ServiceInfo> {
        self.registry.discover(name).await
    }

    /// 订阅指定服务名的变更事件流
    pub async fn watch(&self, name: &str) -> ServiceWatcher {
        self.registry.watch(name).await
    }

    /// 路由一个请求
    ///
    /// 先重算健康过滤后的拓扑，然后按金丝雀 → 蓝绿 → 路由策略求值。
    /// 候选集为空时返回 [`NoServicesAvailable`](crate::error::OrchestratorError::NoServicesAvailable)。
    pub async fn route(&self, request: &RouteRequest) -> Result<ServiceInfo> {
        self.refresh_topology().await;

        if let Some(service) = self.deployment.select().await {
            debug!(service_id = %service.id, "Routed via deployment override");
            return Ok(service);
        }

        self.router.route(request).await
    }

    /// 重算健康过滤后的拓扑并整体替换到路由器
    pub async fn refresh_topology(&self) {
        Self::refresh(&self.registry, &self.health, &self.router).await;
    }

    /// 切换路由策略
    pub async fn set_strategy(&self, strategy: RoutingStrategy) {
        self.router.set_strategy(strategy).await;
    }

    /// 按名称切换内置路由策略
    pub async fn set_strategy_by_name(&self, name: &str) -> Result<()> {
        self.router.set_strategy_by_name(name).await
    }

    /// 配置金丝雀发布
    pub async fn canary_deploy(&self, service: ServiceInfo, percentage: f64) {
        self.deployment.canary_deploy(service, percentage).await;
    }

    /// 蓝绿切换
    pub async fn blue_green_switch(&self, blue: ServiceInfo, green: ServiceInfo) {
        self.deployment.blue_green_switch(blue, green).await;
    }

    /// 回滚全部部署覆盖
    pub async fn rollback(&self) {
        self.deployment.rollback().await;
    }

    /// 注册表
    pub fn registry(&self) -> &Arc<ServiceRegistry> {
        &self.registry
    }

    /// 健康检查器
    pub fn health_checker(&self) -> &Arc<HealthChecker> {
        &self.health
    }

    /// 路由器
    pub fn router(&self) -> &Arc<DynamicRouter> {
        &self.router
    }

    /// 部署控制器
    pub fn deployment(&self) -> &Arc<DeploymentController> {
        &self.deployment
    }

    /// 停止全部后台循环并释放资源
    ///
    /// tick 进行中调用也安全：发送关闭信号后直接中止任务，
    /// 保证不会再有后续的计划执行。幂等。
    pub async fn destroy(&self) {
        let mut loops = self.loops.lock().await;
        if loops.is_empty() {
            return;
        }
        for lp in loops.drain(..) {
            let _ = lp.shutdown.send(());
            lp.handle.abort();
            info!(loop_name = lp.name, "Background loop stopped");
        }
    }

    async fn refresh(
        registry: &Arc<ServiceRegistry>,
        health: &Arc<HealthChecker>,
        router: &Arc<DynamicRouter>,
    ) {
        let all = registry.list_all().await;
        let healthy = health.healthy_services(&all).await;
        debug!(
            total = all.len(),
            healthy = healthy.len(),
            "Topology refreshed"
        );
        router.update_topology(healthy).await;
    }

    /// 启动后台发现循环：周期性重算拓扑
    fn spawn_discovery_loop(
        registry: Arc<ServiceRegistry>,
        health: Arc<HealthChecker>,
        router: Arc<DynamicRouter>,
        interval_ms: u64,
    ) -> LoopHandle {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_millis(interval_ms));
            // 第一次 tick 立即完成，跳过
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => {
                        debug!("Discovery loop shutting down");
                        break;
                    }
                    _ = ticker.tick() => {
                        Self::refresh(&registry, &health, &router).await;
                    }
                }
            }
        });
        LoopHandle {
            name: "discovery",
            shutdown: shutdown_tx,
            handle,
        }
    }

    /// 启动后台健康检查循环：周期性复查全部实例并重算拓扑
    fn spawn_health_loop(
        registry: Arc<ServiceRegistry>,
        health: Arc<HealthChecker>,
        router: Arc<DynamicRouter>,
        interval_ms: u64,
    ) -> LoopHandle {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_millis(interval_ms));
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => {
                        debug!("Health check loop shutting down");
                        break;
                    }
                    _ = ticker.tick() => {
                        let all = registry.list_all().await;
                        for service in &all {
                            health.check_health(service).await;
                        }
                        Self::refresh(&registry, &health, &router).await;
                    }
                }
            }
        });
        LoopHandle {
            name: "health-check",
            shutdown: shutdown_tx,
            handle,
        }
    }
}
