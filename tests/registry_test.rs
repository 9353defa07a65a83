//! 服务注册表测试
//!
//! 覆盖注册 / 注销 / 发现的集合语义，以及变更事件流的顺序、
//! 缓冲和订阅者独立性。

use orchestrator_core::{ServiceEventType, ServiceInfo, ServiceRegistry};

/// 创建测试用的服务实例
fn create_test_instance(id: &str, name: &str, port: u16) -> ServiceInfo {
    ServiceInfo::new(id, name, "127.0.0.1", port)
        .with_metadata("env", "test")
        .with_metadata("version", "v1.0.0")
}

/// 测试：注册后能按服务名发现
#[tokio::test]
async fn test_register_and_discover() {
    let registry = ServiceRegistry::new();

    registry.register(create_test_instance("api-1", "api", 8080)).await;
    registry.register(create_test_instance("api-2", "api", 8081)).await;
    registry.register(create_test_instance("db-1", "db", 5432)).await;

    let instances = registry.discover("api").await;
    assert_eq!(instances.len(), 2, "Expected exactly the two api instances");
    assert!(
        instances.iter().any(|s| s.id == "api-1"),
        "Instance api-1 not found after registration"
    );
    assert!(
        instances.iter().any(|s| s.id == "api-2"),
        "Instance api-2 not found after registration"
    );
    assert!(
        !instances.iter().any(|s| s.id == "db-1"),
        "Instance db-1 belongs to another service name"
    );
}

/// 测试：注销后实例立即从发现结果中消失
#[tokio::test]
async fn test_deregister_removes_instance() {
    let registry = ServiceRegistry::new();

    registry.register(create_test_instance("api-1", "api", 8080)).await;
    registry.register(create_test_instance("api-2", "api", 8081)).await;

    registry.deregister("api-1").await;

    let instances = registry.discover("api").await;
    assert_eq!(instances.len(), 1);
    assert!(
        !instances.iter().any(|s| s.id == "api-1"),
        "Instance api-1 still present after deregistration"
    );
}

/// 测试：重复注销同一 ID 是幂等的
#[tokio::test]
async fn test_deregister_is_idempotent() {
    let registry = ServiceRegistry::new();

    registry.register(create_test_instance("api-1", "api", 8080)).await;

    registry.deregister("api-1").await;
    registry.deregister("api-1").await;

    assert!(registry.discover("api").await.is_empty());
    assert!(registry.get("api-1").await.is_none());
}

/// 测试：重复注册同一实例是幂等的
#[tokio::test]
async fn test_register_same_id_is_idempotent() {
    let registry = ServiceRegistry::new();

    let instance = create_test_instance("api-1", "api", 8080);
    registry.register(instance.clone()).await;
    registry.register(instance).await;

    let instances = registry.discover("api").await;
    assert_eq!(instances.len(), 1, "Duplicate registration must not duplicate the entry");
}

/// 测试：按 ID 获取实例与列出服务名
#[tokio::test]
async fn test_get_and_service_names() {
    let registry = ServiceRegistry::new();

    registry.register(create_test_instance("api-1", "api", 8080)).await;
    registry.register(create_test_instance("db-1", "db", 5432)).await;

    let found = registry.get("db-1").await;
    assert_eq!(found.map(|s| s.port), Some(5432));
    assert!(registry.get("missing").await.is_none());

    let names = registry.service_names().await;
    assert_eq!(names, vec!["api".to_string(), "db".to_string()]);
    assert_eq!(registry.list_all().await.len(), 2);
}

/// 测试：事件顺序与变更顺序一致，同一 ID 的 added 先于 removed
#[tokio::test]
async fn test_watch_event_ordering() {
    let registry = ServiceRegistry::new();
    let mut watcher = registry.watch("api").await;

    registry.register(create_test_instance("api-1", "api", 8080)).await;
    registry.register(create_test_instance("api-2", "api", 8081)).await;
    registry.deregister("api-1").await;

    let first = watcher.recv().await.expect("missing first event");
    assert_eq!(first.event_type, ServiceEventType::Added);
    assert_eq!(first.service.id, "api-1");

    let second = watcher.recv().await.expect("missing second event");
    assert_eq!(second.event_type, ServiceEventType::Added);
    assert_eq!(second.service.id, "api-2");

    let third = watcher.recv().await.expect("missing third event");
    assert_eq!(third.event_type, ServiceEventType::Removed);
    assert_eq!(third.service.id, "api-1");
}

/// 测试：覆盖已存在的 ID 广播 updated 事件
#[tokio::test]
async fn test_overwrite_emits_updated_event() {
    let registry = ServiceRegistry::new();
    let mut watcher = registry.watch("api").await;

    registry.register(create_test_instance("api-1", "api", 8080)).await;
    registry.register(create_test_instance("api-1", "api", 9090)).await;

    let first = watcher.recv().await.expect("missing added event");
    assert_eq!(first.event_type, ServiceEventType::Added);

    let second = watcher.recv().await.expect("missing updated event");
    assert_eq!(second.event_type, ServiceEventType::Updated);
    assert_eq!(second.service.port, 9090);
}

/// 测试：订阅者未消费时事件被完整缓冲，消费时按序取出
#[tokio::test]
async fn test_watch_buffers_until_consumed() {
    let registry = ServiceRegistry::new();
    let mut watcher = registry.watch("api").await;

    for i in 0..5u16 {
        registry
            .register(create_test_instance(&format!("api-{}", i), "api", 8080 + i))
            .await;
    }

    for i in 0..5u16 {
        let event = watcher.recv().await.expect("buffered event lost");
        assert_eq!(event.service.id, format!("api-{}", i), "Events out of order");
    }
    assert!(watcher.try_recv().is_none(), "No further events expected");
}

/// 测试：多个订阅者互相独立（广播，而非竞争消费）
#[tokio::test]
async fn test_watchers_are_independent() {
    let registry = ServiceRegistry::new();
    let mut first = registry.watch("api").await;
    let mut second = registry.watch("api").await;

    registry.register(create_test_instance("api-1", "api", 8080)).await;

    let event_a = first.recv().await.expect("first watcher missed the event");
    let event_b = second.recv().await.expect("second watcher missed the event");
    assert_eq!(event_a.service.id, "api-1");
    assert_eq!(event_b.service.id, "api-1");
}

/// 测试：订阅只收到自己服务名的事件
#[tokio::test]
async fn test_watch_is_scoped_to_name() {
    let registry = ServiceRegistry::new();
    let mut watcher = registry.watch("api").await;

    registry.register(create_test_instance("db-1", "db", 5432)).await;
    registry.register(create_test_instance("api-1", "api", 8080)).await;

    let event = watcher.recv().await.expect("missing api event");
    assert_eq!(event.service.id, "api-1", "Watcher must not see other service names");
    assert!(watcher.try_recv().is_none());
}

/// 测试：事件流可以作为 Stream 消费
#[tokio::test]
async fn test_watch_as_stream() {
    use futures::StreamExt;

    let registry = ServiceRegistry::new();
    let mut watcher = registry.watch("api").await;

    registry.register(create_test_instance("api-1", "api", 8080)).await;
    registry.deregister("api-1").await;

    let first = watcher.next().await.expect("stream ended unexpectedly");
    assert_eq!(first.event_type, ServiceEventType::Added);
    let second = watcher.next().await.expect("stream ended unexpectedly");
    assert_eq!(second.event_type, ServiceEventType::Removed);
}

/// 测试：取消订阅后注册表停止为其缓冲
#[tokio::test]
async fn test_cancelled_watcher_is_pruned() {
    let registry = ServiceRegistry::new();

    let watcher = registry.watch("api").await;
    assert_eq!(registry.watcher_count("api").await, 1);

    drop(watcher);
    assert_eq!(
        registry.watcher_count("api").await,
        0,
        "Dropped watcher still counted as live"
    );

    // 变更触发剪除，不会向已取消的订阅投递
    registry.register(create_test_instance("api-1", "api", 8080)).await;
    assert_eq!(registry.watcher_count("api").await, 0);
}
