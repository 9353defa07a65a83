//! 健康检查模块
//!
//! 周期 / 按需的存活探测，带重试和实例级熔断。探测期间不持有任何锁，
//! 探测进行时注册、发现、拓扑读取照常服务。每个实例只缓存最近一次结果。

pub mod breaker;
pub mod probe;

pub use breaker::{BreakerState, CircuitBreaker};
pub use probe::{HealthProbe, HttpHealthProbe, MockHealthProbe};

use crate::config::HealthCheckConfig;
use crate::retry::{FixedRetryPolicy, RetryPolicy};
use crate::types::{HealthStatus, ServiceInfo};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// 健康检查器
///
/// 持有可注入的探测器、最近一次状态表和实例级熔断器表。
/// 熔断器计数按实例独立，彼此之间没有锁依赖。
pub struct HealthChecker {
    probe: Arc<dyn HealthProbe>,
    statuses: Arc<RwLock<HashMap<String, HealthStatus>>>,
    breakers: Arc<RwLock<HashMap<String, CircuitBreaker>>>,
    threshold: Arc<RwLock<Option<u32>>>,
    retry_delay: Duration,
    optimistic_default: bool,
}

impl HealthChecker {
    /// 创建新的健康检查器（默认配置）
    pub fn new(probe: Arc<dyn HealthProbe>) -> Self {
        Self::with_config(probe, &HealthCheckConfig::default())
    }

    /// 按配置创建健康检查器
    pub fn with_config(probe: Arc<dyn HealthProbe>, config: &HealthCheckConfig) -> Self {
        Self {
            probe,
            statuses: Arc::new(RwLock::new(HashMap::new())),
            breakers: Arc::new(RwLock::new(HashMap::new())),
            threshold: Arc::new(RwLock::new(config.failure_threshold)),
            retry_delay: Duration::from_millis(config.retry_delay_ms),
            optimistic_default: config.optimistic_default,
        }
    }

    /// 启用熔断器
    ///
    /// 连续失败达到 `threshold` 次后该实例的熔断器打开。
    pub async fn enable_circuit_breaker(&self, threshold: u32) {
        *self.threshold.write().await = Some(threshold);
    }

    /// 停用熔断器（已打开的熔断器保持原状，直到被重置）
    pub async fn disable_circuit_breaker(&self) {
        *self.threshold.write().await = None;
    }

    /// 对单个实例执行一次健康检查
    ///
    /// 熔断器打开时直接短路：不发起探测，返回
    /// `{healthy: false, error: "circuit breaker open"}`，并把熔断器
    /// 拨到 half-open，让下一次检查得以真正探测。
    pub async fn check_health(&self, service: &ServiceInfo) -> HealthStatus {
        let threshold = *self.threshold.read().await;

        {
            let mut breakers = self.breakers.write().await;
            let breaker = breakers.entry(service.id.clone()).or_default();
            if breaker.begin_attempt() {
                drop(breakers);
                let status = HealthStatus::down(0, "circuit breaker open");
                self.record_status(&service.id, status.clone()).await;
                debug!(service_id = %service.id, "Circuit breaker open, probe skipped");
                return status;
            }
        }

        // 探测期间不持有任何锁
        let started = Instant::now();
        let outcome = self.probe.probe(service).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        let status = match outcome {
            Ok(()) => {
                let mut breakers = self.breakers.write().await;
                breakers.entry(service.id.clone()).or_default().record_success();
                HealthStatus::up(elapsed_ms)
            }
            Err(reason) => {
                let mut breakers = self.breakers.write().await;
                let breaker = breakers.entry(service.id.clone()).or_default();
                breaker.record_failure(threshold);
                warn!(
                    service_id = %service.id,
                    failure_count = breaker.failure_count,
                    error = %reason,
                    "Health probe failed"
                );
                HealthStatus::down(elapsed_ms, reason)
            }
        };

        self.record_status(&service.id, status.clone()).await;
        status
    }

    /// 带重试的健康检查
    ///
    /// 固定间隔重复调用 [`check_health`](Self::check_health)，最多
    /// `max_retries` 次，返回首个成功结果或最后一次失败结果。
    pub async fn check_health_with_retry(
        &self,
        service: &ServiceInfo,
        max_retries: u32,
    ) -> HealthStatus {
        let policy = FixedRetryPolicy::new(max_retries, self.retry_delay);
        self.check_health_with_policy(service, &policy).await
    }

    /// 按指定重试策略执行健康检查
    pub async fn check_health_with_policy(
        &self,
        service: &ServiceInfo,
        policy: &dyn RetryPolicy,
    ) -> HealthStatus {
        let mut attempt: u32 = 0;
        loop {
            let status = self.check_health(service).await;
            attempt += 1;
            if status.healthy || !policy.should_retry(attempt) {
                return status;
            }
            debug!(
                service_id = %service.id,
                attempt,
                max_attempts = policy.max_attempts(),
                "Health check failed, retrying"
            );
            tokio::time::sleep(policy.backoff_duration(attempt)).await;
        }
    }

    /// 过滤出健康的实例
    ///
    /// 只查询缓存状态，不触发新的探测。熔断器打开的实例一律排除；
    /// 尚无记录的实例按 `optimistic_default` 处理（默认乐观视为健康）。
    pub async fn healthy_services(&self, services: &[ServiceInfo]) -> Vec<ServiceInfo> {
        let statuses = self.statuses.read().await;
        let breakers = self.breakers.read().await;
        services
            .iter()
            .filter(|s| {
                if breakers.get(&s.id).map(|b| b.is_open()).unwrap_or(false) {
                    return false;
                }
                match statuses.get(&s.id) {
                    Some(status) => status.healthy,
                    None => self.optimistic_default,
                }
            })
            .cloned()
            .collect()
    }

    /// 手动标记实例为健康，并重置其熔断器
    pub async fn mark_healthy(&self, id: &str) {
        self.record_status(id, HealthStatus::up(0)).await;
        if let Some(breaker) = self.breakers.write().await.get_mut(id) {
            breaker.reset();
        }
    }

    /// 手动标记实例为不健康
    pub async fn mark_unhealthy(&self, id: &str) {
        self.record_status(id, HealthStatus::down(0, "manually marked unhealthy"))
            .await;
    }

    /// 最近一次健康检查结果
    pub async fn last_status(&self, id: &str) -> Option<HealthStatus> {
        self.statuses.read().await.get(id).cloned()
    }

    /// 熔断器状态（只读快照）
    pub async fn breaker_status(&self, id: &str) -> Option<CircuitBreaker> {
        self.breakers.read().await.get(id).cloned()
    }

    /// 重置指定实例的熔断器
    pub async fn reset_breaker(&self, id: &str) {
        if let Some(breaker) = self.breakers.write().await.get_mut(id) {
            breaker.reset();
        }
    }

    async fn record_status(&self, id: &str, status: HealthStatus) {
        self.statuses.write().await.insert(id.to_string(), status);
    }
}
