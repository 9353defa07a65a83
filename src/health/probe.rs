//! 存活探测器
//!
//! 探测逻辑通过 trait 注入：生产环境对实例发起 HTTP GET 探测，
//! 测试环境用确定性 mock 替换，无需真实 socket。

use crate::types::ServiceInfo;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;

/// 存活探测 trait
///
/// 对单个实例执行一次有界超时的探测；`Err` 携带失败原因。
/// 探测的成败如何影响熔断计数由调用方（健康检查器）决定。
#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn probe(&self, service: &ServiceInfo) -> Result<(), String>;
}

/// HTTP 存活探测器
///
/// GET `http://{host}:{port}{path}`，2xx 视为健康，
/// 其余状态码、超时和连接错误一律视为不健康。
pub struct HttpHealthProbe {
    client: reqwest::Client,
    path: String,
    timeout: Duration,
}

impl HttpHealthProbe {
    /// 创建新的 HTTP 探测器
    pub fn new(path: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            path: path.into(),
            timeout,
        }
    }
}

impl Default for HttpHealthProbe {
    fn default() -> Self {
        Self::new("/health", Duration::from_secs(5))
    }
}

#[async_trait]
impl HealthProbe for HttpHealthProbe {
    async fn probe(&self, service: &ServiceInfo) -> Result<(), String> {
        let url = service.health_url(&self.path);
        let resp = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| format!("health probe request failed: {}", e))?;

        if resp.status().is_success() {
            Ok(())
        } else {
            Err(format!("health probe returned status {}", resp.status()))
        }
    }
}

/// 测试用确定性探测器
///
/// 按实例 ID 预设探测结果，并统计实际发生的探测次数
/// （用于验证熔断短路没有发起真实探测）。
#[derive(Default)]
pub struct MockHealthProbe {
    results: RwLock<HashMap<String, bool>>,
    probe_count: AtomicUsize,
}

impl MockHealthProbe {
    /// 创建 mock 探测器（未预设的实例默认健康）
    pub fn new() -> Self {
        Self::default()
    }

    /// 预设某实例的探测结果
    pub async fn mock_health_status(&self, id: impl Into<String>, healthy: bool) {
        self.results.write().await.insert(id.into(), healthy);
    }

    /// 已执行的探测次数
    pub fn probe_count(&self) -> usize {
        self.probe_count.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl HealthProbe for MockHealthProbe {
    async fn probe(&self, service: &ServiceInfo) -> Result<(), String> {
        self.probe_count.fetch_add(1, Ordering::Relaxed);
        let healthy = self
            .results
            .read()
            .await
            .get(&service.id)
            .copied()
            .unwrap_or(true);
        if healthy {
            Ok(())
        } else {
            Err("mock probe unhealthy".to_string())
        }
    }
}
