//! 实例级熔断器
//!
//! 状态机：`closed` --连续失败达到阈值--> `open` --下一次检查--> `half-open`
//! --成功--> `closed`（失败则回到 `open`）。`open` 状态下的检查直接短路，
//! 不发起网络探测，避免持续冲击已知故障的实例。

use serde::{Deserialize, Serialize};

/// 熔断器状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

/// 单个实例的熔断器
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreaker {
    /// 连续失败次数
    pub failure_count: u32,

    /// 当前状态
    pub state: BreakerState,
}

impl CircuitBreaker {
    pub fn new() -> Self {
        Self {
            failure_count: 0,
            state: BreakerState::Closed,
        }
    }

    /// 是否处于打开状态
    pub fn is_open(&self) -> bool {
        self.state == BreakerState::Open
    }

    /// 一次检查开始时调用
    ///
    /// 处于 `open` 时拨到 `half-open` 并返回 `true`（本次检查应短路）；
    /// 其余状态返回 `false`，照常探测。
    pub(crate) fn begin_attempt(&mut self) -> bool {
        if self.state == BreakerState::Open {
            self.state = BreakerState::HalfOpen;
            true
        } else {
            false
        }
    }

    /// 记录一次成功探测：清零计数并闭合
    pub(crate) fn record_success(&mut self) {
        self.failure_count = 0;
        self.state = BreakerState::Closed;
    }

    /// 记录一次失败探测
    ///
    /// 计数递增；启用了阈值且达到阈值时打开熔断器
    /// （`half-open` 下的失败同样会重新打开）。
    pub(crate) fn record_failure(&mut self, threshold: Option<u32>) {
        self.failure_count = self.failure_count.saturating_add(1);
        if let Some(threshold) = threshold {
            if self.failure_count >= threshold {
                self.state = BreakerState::Open;
            }
        }
    }

    /// 重置为初始状态
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new()
    }
}
