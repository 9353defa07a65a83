//! 变更事件流订阅端
//!
//! 每个订阅者持有一条独立的无界 mpsc 队列。生产者（注册表变更）
//! 永远不会被慢消费者阻塞；接收端被丢弃后，生产者在下一次发送失败时
//! 将其剪除，停止为其缓冲。

use crate::types::ServiceEvent;
use futures::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use uuid::Uuid;

/// 变更事件流
///
/// 通过 [`recv`](Self::recv) 逐条消费，或作为 [`futures::Stream`] 使用。
pub struct ServiceWatcher {
    id: Uuid,
    name: String,
    rx: mpsc::UnboundedReceiver<ServiceEvent>,
}

impl ServiceWatcher {
    pub(crate) fn new(id: Uuid, name: String, rx: mpsc::UnboundedReceiver<ServiceEvent>) -> Self {
        Self { id, name, rx }
    }

    /// 订阅 ID
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// 订阅的服务名
    pub fn service_name(&self) -> &str {
        &self.name
    }

    /// 接收下一条事件
    ///
    /// 队列中有缓冲事件时立即返回；否则挂起等待。订阅被取消后返回 `None`。
    pub async fn recv(&mut self) -> Option<ServiceEvent> {
        self.rx.recv().await
    }

    /// 非阻塞地取一条已缓冲的事件
    pub fn try_recv(&mut self) -> Option<ServiceEvent> {
        self.rx.try_recv().ok()
    }

    /// 主动取消订阅
    ///
    /// 之后注册表不再为此订阅缓冲事件；已缓冲的事件仍可被 `recv` 排空。
    pub fn close(&mut self) {
        self.rx.close();
    }
}

impl Stream for ServiceWatcher {
    type Item = ServiceEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}
