//! Redis event bus tests.

use std::time::Duration;

use hookcut_models::ProjectId;
use hookcut_queue::{
    ConcurrencyLimiter, EventEnvelope, EventPublisher, QueueConfig, RedisEventBus, StepJournal,
    WorkflowEvent,
};

/// Bus on keys no other test run touches.
async fn isolated_bus() -> RedisEventBus {
    dotenvy::dotenv().ok();

    let namespace = format!("hookcut-test:{}", chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default());
    let config = QueueConfig {
        stream_name: format!("{}:events", namespace),
        consumer_group: format!("{}:workers", namespace),
        dlq_stream_name: format!("{}:dlq", namespace),
        delayed_key: format!("{}:delayed", namespace),
        key_prefix: namespace,
        ..QueueConfig::from_env()
    };
    let bus = RedisEventBus::new(config).expect("Failed to create bus");
    bus.init().await.expect("Failed to initialize bus");
    bus
}

fn guardian(project: &str) -> WorkflowEvent {
    WorkflowEvent::GuardianCheck {
        project_id: ProjectId::from(project),
    }
}

#[tokio::test]
#[ignore = "requires Redis"]
async fn test_redis_connection() {
    let bus = isolated_bus().await;
    bus.ping().await.expect("Failed to ping Redis");
    assert_eq!(bus.len().await.unwrap(), 0);
}

#[tokio::test]
#[ignore = "requires Redis"]
async fn test_publish_consume_ack() {
    let bus = isolated_bus().await;
    let envelope = EventEnvelope::new(guardian("p1"));
    bus.publish(envelope.clone()).await.expect("Failed to publish");

    let deliveries = bus.consume("test-consumer", 1000, 5).await.unwrap();
    assert_eq!(deliveries.len(), 1);
    assert_eq!(deliveries[0].envelope, envelope);

    bus.ack(&deliveries[0].message_id).await.expect("Failed to ack");
    let again = bus.consume("test-consumer", 100, 5).await.unwrap();
    assert!(again.is_empty());
}

#[tokio::test]
#[ignore = "requires Redis"]
async fn test_dead_letter() {
    let bus = isolated_bus().await;
    bus.emit(guardian("p1")).await.unwrap();

    let deliveries = bus.consume("test-consumer", 1000, 1).await.unwrap();
    bus.dead_letter(&deliveries[0], "permanent failure")
        .await
        .expect("Failed to dead-letter");

    assert_eq!(bus.dlq_len().await.unwrap(), 1);
}

#[tokio::test]
#[ignore = "requires Redis"]
async fn test_delayed_delivery_is_promoted_when_due() {
    let bus = isolated_bus().await;
    bus.schedule(EventEnvelope::new(guardian("soon")), Duration::ZERO)
        .await
        .unwrap();
    bus.schedule(EventEnvelope::new(guardian("later")), Duration::from_secs(3600))
        .await
        .unwrap();

    assert_eq!(bus.promote_due(10).await.unwrap(), 1);
    assert_eq!(bus.delayed_len().await.unwrap(), 1);

    let deliveries = bus.consume("test-consumer", 1000, 5).await.unwrap();
    assert_eq!(deliveries.len(), 1);
    assert_eq!(deliveries[0].envelope.event, guardian("soon"));
}

#[tokio::test]
#[ignore = "requires Redis"]
async fn test_failed_promotion_keeps_event_scheduled() {
    let bus = isolated_bus().await;
    bus.schedule(EventEnvelope::new(guardian("stuck")), Duration::ZERO)
        .await
        .unwrap();

    // Replace the stream with a plain string so XADD fails with WRONGTYPE.
    let client = redis::Client::open(bus.config().redis_url.as_str()).unwrap();
    let mut conn = client.get_multiplexed_async_connection().await.unwrap();
    redis::cmd("DEL")
        .arg(&bus.config().stream_name)
        .query_async::<()>(&mut conn)
        .await
        .unwrap();
    redis::cmd("SET")
        .arg(&bus.config().stream_name)
        .arg("not-a-stream")
        .query_async::<()>(&mut conn)
        .await
        .unwrap();

    assert!(bus.promote_due(10).await.is_err());
    assert_eq!(bus.delayed_len().await.unwrap(), 1);

    // Once the stream is usable again the same event goes out exactly once.
    redis::cmd("DEL")
        .arg(&bus.config().stream_name)
        .query_async::<()>(&mut conn)
        .await
        .unwrap();
    bus.init().await.unwrap();
    assert_eq!(bus.promote_due(10).await.unwrap(), 1);
    assert_eq!(bus.delayed_len().await.unwrap(), 0);
    assert_eq!(bus.promote_due(10).await.unwrap(), 0);

    let deliveries = bus.consume("test-consumer", 1000, 5).await.unwrap();
    assert_eq!(deliveries.len(), 1);
    assert_eq!(deliveries[0].envelope.event, guardian("stuck"));
}

#[tokio::test]
#[ignore = "requires Redis"]
async fn test_journal_and_lease() {
    let bus = isolated_bus().await;

    assert!(bus.load("run-1", "dispatch").await.unwrap().is_none());
    bus.record("run-1", "dispatch", &serde_json::json!({"clip_count": 2}))
        .await
        .unwrap();
    assert_eq!(
        bus.load("run-1", "dispatch").await.unwrap(),
        Some(serde_json::json!({"clip_count": 2}))
    );

    let ttl = Duration::from_secs(30);
    assert!(bus.try_acquire("process-video:u1", "run-1", ttl).await.unwrap());
    assert!(!bus.try_acquire("process-video:u1", "run-2", ttl).await.unwrap());

    // Only the holder can release.
    bus.release("process-video:u1", "run-2").await.unwrap();
    assert!(!bus.try_acquire("process-video:u1", "run-2", ttl).await.unwrap());
    bus.release("process-video:u1", "run-1").await.unwrap();
    assert!(bus.try_acquire("process-video:u1", "run-2", ttl).await.unwrap());
}
