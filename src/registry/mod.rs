//! 服务注册表模块
//!
//! 进程内服务实例目录，支持注册 / 注销 / 发现，以及按服务名订阅的
//! 变更事件流。实例表和订阅者表放在同一把锁下，事件通知在写锁内完成，
//! 因此订阅者观察到的事件顺序与变更顺序严格一致。

pub mod watch;

pub use watch::ServiceWatcher;

use crate::types::{ServiceEvent, ServiceEventType, ServiceInfo};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::{RwLock, mpsc};
use tracing::{debug, info};
use uuid::Uuid;

/// 订阅者句柄
struct Watcher {
    id: Uuid,
    tx: mpsc::UnboundedSender<ServiceEvent>,
}

/// 注册表内部状态
#[derive(Default)]
struct RegistryInner {
    /// 实例表：id -> 实例
    services: HashMap<String, ServiceInfo>,
    /// 订阅者表：服务名 -> 订阅者列表
    watchers: HashMap<String, Vec<Watcher>>,
}

impl RegistryInner {
    /// 向该服务名的所有订阅者广播事件
    ///
    /// 发送失败说明订阅端已取消（接收器被丢弃），就地剪除，
    /// 之后不再为其缓冲任何事件。
    fn notify(&mut self, event: ServiceEvent) {
        let name = event.service.name.clone();
        let drained = match self.watchers.get_mut(&name) {
            Some(subs) => {
                subs.retain(|w| match w.tx.send(event.clone()) {
                    Ok(()) => true,
                    Err(_) => {
                        debug!(watcher_id = %w.id, service_name = %name, "Watcher cancelled, pruning");
                        false
                    }
                });
                subs.is_empty()
            }
            None => false,
        };
        if drained {
            self.watchers.remove(&name);
        }
    }
}

/// 服务注册表
///
/// 所有变更（注册、注销）在写锁下串行执行；`discover` 等读取操作
/// 返回不可变快照，并发读取不会与变更竞争。
#[derive(Clone, Default)]
pub struct ServiceRegistry {
    inner: Arc<RwLock<RegistryInner>>,
}

impl ServiceRegistry {
    /// 创建新的注册表
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册服务实例
    ///
    /// 按 `id` 插入或覆盖。新 `id` 广播 `added` 事件，
    /// 覆盖已存在的 `id` 广播 `updated` 事件；重复注册同一实例是幂等的。
    pub async fn register(&self, service: ServiceInfo) {
        let mut inner = self.inner.write().await;
        let event_type = if inner.services.contains_key(&service.id) {
            ServiceEventType::Updated
        } else {
            ServiceEventType::Added
        };
        inner.services.insert(service.id.clone(), service.clone());
        info!(
            service_id = %service.id,
            service_name = %service.name,
            "Service registered"
        );
        inner.notify(ServiceEvent::new(event_type, service));
    }

    /// 注销服务实例
    ///
    /// 存在则移除并广播 `removed` 事件；不存在则静默返回（幂等）。
    pub async fn deregister(&self, id: &str) {
        let mut inner = self.inner.write().await;
        if let Some(service) = inner.services.remove(id) {
            info!(
                service_id = %service.id,
                service_name = %service.name,
                "Service deregistered"
            );
            inner.notify(ServiceEvent::new(ServiceEventType::Removed, service));
        }
    }

    /// 发现服务（获取指定服务名的所有实例快照）
    pub async fn discover(&self, name: &str) -> Vec<ServiceInfo> {
        let inner = self.inner.read().await;
        inner
            .services
            .values()
            .filter(|s| s.name == name)
            .cloned()
            .collect()
    }

    /// 获取服务实例（通过实例 ID）
    pub async fn get(&self, id: &str) -> Option<ServiceInfo> {
        let inner = self.inner.read().await;
        inner.services.get(id).cloned()
    }

    /// 获取所有已注册的服务名
    pub async fn service_names(&self) -> Vec<String> {
        let inner = self.inner.read().await;
        let names: BTreeSet<String> = inner.services.values().map(|s| s.name.clone()).collect();
        names.into_iter().collect()
    }

    /// 获取所有服务实例（所有服务名）
    pub async fn list_all(&self) -> Vec<ServiceInfo> {
        let inner = self.inner.read().await;
        inner.services.values().cloned().collect()
    }

    /// 订阅指定服务名的变更事件流
    ///
    /// 每个订阅者独立缓冲（广播语义，非竞争消费）；订阅者未消费时
    /// 事件在其无界队列中排队，不丢失。丢弃返回的 [`ServiceWatcher`]
    /// 即取消订阅。
    pub async fn watch(&self, name: &str) -> ServiceWatcher {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = Uuid::new_v4();
        let mut inner = self.inner.write().await;
        inner
            .watchers
            .entry(name.to_string())
            .or_default()
            .push(Watcher { id, tx });
        debug!(watcher_id = %id, service_name = %name, "Watcher subscribed");
        ServiceWatcher::new(id, name.to_string(), rx)
    }

    /// 当前仍在消费的订阅者数量（已取消但尚未剪除的不计入）
    pub async fn watcher_count(&self, name: &str) -> usize {
        let inner = self.inner.read().await;
        inner
            .watchers
            .get(name)
            .map(|subs| subs.iter().filter(|w| !w.tx.is_closed()).count())
            .unwrap_or(0)
    }
}
