//! 编排器配置

use serde::{Deserialize, Serialize};

/// 编排器配置
///
/// 两个 interval 字段分别控制后台发现循环和后台健康检查循环：
/// 字段存在则启用对应循环，缺省则完全按需/手动运行。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// 拓扑刷新间隔（毫秒），None 表示不启动发现循环
    pub discovery_interval_ms: Option<u64>,

    /// 健康检查间隔（毫秒），None 表示不启动健康检查循环
    pub health_check_interval_ms: Option<u64>,

    /// 健康检查配置
    #[serde(default)]
    pub health_check: HealthCheckConfig,
}

/// 健康检查配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckConfig {
    /// 单次探测超时（毫秒）
    pub timeout_ms: u64,

    /// 健康检查路径（HTTP）
    pub path: String,

    /// 重试间隔（毫秒），用于 check_health_with_retry
    pub retry_delay_ms: u64,

    /// 熔断阈值（连续失败多少次后打开熔断器），None 表示不启用熔断
    pub failure_threshold: Option<u32>,

    /// 未记录状态的实例是否默认视为健康
    ///
    /// 乐观默认：刚注册、尚未探测过的实例也能接收流量
    pub optimistic_default: bool,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 5000,
            path: "/health".to_string(),
            retry_delay_ms: 100,
            failure_threshold: None,
            optimistic_default: true,
        }
    }
}
