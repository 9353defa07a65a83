//! 统一错误类型
//!
//! 探测失败不属于错误：它们以 `HealthStatus::error` 的形式在健康检查边界内消化。
//! 这里只定义调用方必须处理的错误。

use thiserror::Error;

/// 编排核心统一错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OrchestratorError {
    /// 候选实例集为空，无法路由
    #[error("no services available")]
    NoServicesAvailable,

    /// 未知的路由策略名称
    #[error("unknown routing strategy: {0}")]
    UnknownStrategy(String),
}

impl OrchestratorError {
    /// 创建"无可用服务"错误
    pub fn no_services() -> Self {
        OrchestratorError::NoServicesAvailable
    }

    /// 创建"未知策略"错误
    pub fn unknown_strategy(name: impl Into<String>) -> Self {
        OrchestratorError::UnknownStrategy(name.into())
    }
}

/// 编排核心 Result 别名
pub type Result<T> = std::result::Result<T, OrchestratorError>;
