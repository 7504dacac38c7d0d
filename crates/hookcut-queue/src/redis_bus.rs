//! Redis implementation of the workflow bus.
//!
//! - Events: a stream read through a consumer group, acked and deleted on success
//! - Delayed events: a sorted set scored by due time (ms), promoted onto the stream
//! - Dead letters: a second stream carrying the payload and the final error
//! - Step journal: one hash per run
//! - Leases: `SET NX PX`, released by compare-and-delete

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use redis::AsyncCommands;
use tracing::{debug, info, warn};

use crate::bus::{ConcurrencyLimiter, EventPublisher, StepJournal};
use crate::error::{QueueError, QueueResult};
use crate::event::EventEnvelope;

const RELEASE_SCRIPT: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("DEL", KEYS[1])
else
    return 0
end
"#;

/// Moves one delayed member onto the stream. The member is removed only
/// after XADD succeeds, and a member another scheduler already took is
/// skipped.
const PROMOTE_SCRIPT: &str = r#"
if not redis.call("ZSCORE", KEYS[1], ARGV[1]) then
    return false
end
local id = redis.call("XADD", KEYS[2], "*", "event", ARGV[1], "type", ARGV[2])
redis.call("ZREM", KEYS[1], ARGV[1])
return id
"#;

#[derive(Debug, Clone)]
pub struct QueueConfig {
    pub redis_url: String,
    pub stream_name: String,
    pub consumer_group: String,
    pub dlq_stream_name: String,
    /// Sorted set holding delayed envelopes.
    pub delayed_key: String,
    pub key_prefix: String,
    /// How long journaled step outputs are kept.
    pub journal_ttl: Duration,
    /// Pending entries idle this long are reclaimed from dead consumers.
    pub visibility_timeout: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://localhost:6379".to_string(),
            stream_name: "hookcut:events".to_string(),
            consumer_group: "hookcut:workers".to_string(),
            dlq_stream_name: "hookcut:dlq".to_string(),
            delayed_key: "hookcut:delayed".to_string(),
            key_prefix: "hookcut".to_string(),
            journal_ttl: Duration::from_secs(7 * 24 * 3600),
            visibility_timeout: Duration::from_secs(600),
        }
    }
}

impl QueueConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            redis_url: std::env::var("REDIS_URL").unwrap_or(defaults.redis_url),
            stream_name: std::env::var("QUEUE_STREAM").unwrap_or(defaults.stream_name),
            consumer_group: std::env::var("QUEUE_CONSUMER_GROUP").unwrap_or(defaults.consumer_group),
            dlq_stream_name: std::env::var("QUEUE_DLQ_STREAM").unwrap_or(defaults.dlq_stream_name),
            delayed_key: std::env::var("QUEUE_DELAYED_KEY").unwrap_or(defaults.delayed_key),
            key_prefix: defaults.key_prefix,
            journal_ttl: defaults.journal_ttl,
            visibility_timeout: Duration::from_secs(
                std::env::var("QUEUE_VISIBILITY_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(600),
            ),
        }
    }

    fn journal_key(&self, run_id: &str) -> String {
        format!("{}:journal:{}", self.key_prefix, run_id)
    }

    fn lease_key(&self, key: &str) -> String {
        format!("{}:lease:{}", self.key_prefix, key)
    }
}

/// A consumed stream entry.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub message_id: String,
    pub envelope: EventEnvelope,
}

#[derive(Clone)]
pub struct RedisEventBus {
    client: redis::Client,
    config: QueueConfig,
}

impl RedisEventBus {
    pub fn new(config: QueueConfig) -> QueueResult<Self> {
        let client = redis::Client::open(config.redis_url.as_str())?;
        Ok(Self { client, config })
    }

    pub fn from_env() -> QueueResult<Self> {
        Self::new(QueueConfig::from_env())
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    async fn conn(&self) -> QueueResult<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| QueueError::unavailable(e.to_string()))
    }

    /// Create the consumer group if it does not exist yet.
    pub async fn init(&self) -> QueueResult<()> {
        let mut conn = self.conn().await?;

        let result: Result<(), redis::RedisError> = redis::cmd("XGROUP")
            .arg("CREATE")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg("$")
            .arg("MKSTREAM")
            .query_async(&mut conn)
            .await;

        match result {
            Ok(_) => info!("Created consumer group: {}", self.config.consumer_group),
            Err(e) if e.to_string().contains("BUSYGROUP") => {
                debug!("Consumer group already exists: {}", self.config.consumer_group);
            }
            Err(e) => return Err(QueueError::Redis(e)),
        }

        Ok(())
    }

    pub async fn ping(&self) -> QueueResult<()> {
        let mut conn = self.conn().await?;
        redis::cmd("PING").query_async::<()>(&mut conn).await?;
        Ok(())
    }

    /// Read new entries for this consumer, blocking up to `block_ms`.
    pub async fn consume(&self, consumer: &str, block_ms: u64, count: usize) -> QueueResult<Vec<Delivery>> {
        let mut conn = self.conn().await?;

        let reply: redis::streams::StreamReadReply = redis::cmd("XREADGROUP")
            .arg("GROUP")
            .arg(&self.config.consumer_group)
            .arg(consumer)
            .arg("COUNT")
            .arg(count)
            .arg("BLOCK")
            .arg(block_ms)
            .arg("STREAMS")
            .arg(&self.config.stream_name)
            .arg(">")
            .query_async(&mut conn)
            .await?;

        let mut deliveries = Vec::new();
        for stream in reply.keys {
            for entry in stream.ids {
                if let Some(delivery) = self.decode_entry(entry.id, entry.map.get("event")).await {
                    deliveries.push(delivery);
                }
            }
        }
        Ok(deliveries)
    }

    /// Take over entries left pending by consumers that died mid-run.
    pub async fn claim_pending(&self, consumer: &str, count: usize) -> QueueResult<Vec<Delivery>> {
        let mut conn = self.conn().await?;

        let idle_ms = self.config.visibility_timeout.as_millis() as u64;

        let pending: redis::streams::StreamPendingCountReply = redis::cmd("XPENDING")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg("IDLE")
            .arg(idle_ms)
            .arg("-")
            .arg("+")
            .arg(count)
            .query_async(&mut conn)
            .await?;
        if pending.ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut claim = redis::cmd("XCLAIM");
        claim
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg(consumer)
            .arg(idle_ms);
        for p in &pending.ids {
            claim.arg(&p.id);
        }
        let reply: redis::streams::StreamClaimReply = claim.query_async(&mut conn).await?;

        let mut deliveries = Vec::new();
        for entry in reply.ids {
            if let Some(delivery) = self.decode_entry(entry.id, entry.map.get("event")).await {
                info!(message_id = %delivery.message_id, "Claimed pending event");
                deliveries.push(delivery);
            }
        }
        Ok(deliveries)
    }

    async fn decode_entry(&self, message_id: String, payload: Option<&redis::Value>) -> Option<Delivery> {
        let raw = match payload {
            Some(redis::Value::BulkString(bytes)) => String::from_utf8_lossy(bytes).into_owned(),
            _ => {
                warn!(message_id = %message_id, "Stream entry without event payload");
                self.ack(&message_id).await.ok();
                return None;
            }
        };
        match serde_json::from_str::<EventEnvelope>(&raw) {
            Ok(envelope) => Some(Delivery { message_id, envelope }),
            Err(e) => {
                warn!(message_id = %message_id, "Failed to parse event payload: {}", e);
                // Malformed entries can never succeed; drop them instead of looping.
                self.ack(&message_id).await.ok();
                None
            }
        }
    }

    /// Acknowledge and delete a processed entry.
    pub async fn ack(&self, message_id: &str) -> QueueResult<()> {
        let mut conn = self.conn().await?;

        redis::cmd("XACK")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg(message_id)
            .query_async::<()>(&mut conn)
            .await?;

        redis::cmd("XDEL")
            .arg(&self.config.stream_name)
            .arg(message_id)
            .query_async::<()>(&mut conn)
            .await?;

        debug!("Acknowledged event: {}", message_id);
        Ok(())
    }

    /// Park an envelope on the dead-letter stream and ack the original.
    pub async fn dead_letter(&self, delivery: &Delivery, error: &str) -> QueueResult<()> {
        let mut conn = self.conn().await?;
        let payload = serde_json::to_string(&delivery.envelope)?;

        redis::cmd("XADD")
            .arg(&self.config.dlq_stream_name)
            .arg("*")
            .arg("event")
            .arg(&payload)
            .arg("error")
            .arg(error)
            .arg("original_id")
            .arg(&delivery.message_id)
            .query_async::<()>(&mut conn)
            .await?;

        self.ack(&delivery.message_id).await?;
        warn!(
            event = delivery.envelope.event.name(),
            run_id = %delivery.envelope.run_id,
            "Moved event to DLQ: {}",
            error
        );
        Ok(())
    }

    /// Move due delayed envelopes onto the stream. Returns how many were moved.
    ///
    /// Each member is appended and removed in one script, so a failed append
    /// leaves it scheduled and concurrent schedulers never publish it twice.
    pub async fn promote_due(&self, limit: usize) -> QueueResult<usize> {
        let mut conn = self.conn().await?;
        let now_ms = Utc::now().timestamp_millis();

        let due: Vec<String> = redis::cmd("ZRANGEBYSCORE")
            .arg(&self.config.delayed_key)
            .arg("-inf")
            .arg(now_ms)
            .arg("LIMIT")
            .arg(0)
            .arg(limit)
            .query_async(&mut conn)
            .await?;

        let script = redis::Script::new(PROMOTE_SCRIPT);
        let mut promoted = 0;
        for member in due {
            let envelope = match serde_json::from_str::<EventEnvelope>(&member) {
                Ok(envelope) => envelope,
                Err(e) => {
                    warn!("Dropping malformed delayed event: {}", e);
                    conn.zrem::<_, _, ()>(&self.config.delayed_key, &member).await?;
                    continue;
                }
            };

            let message_id: Option<String> = script
                .key(&self.config.delayed_key)
                .key(&self.config.stream_name)
                .arg(&member)
                .arg(envelope.event.name())
                .invoke_async(&mut conn)
                .await?;

            if let Some(message_id) = message_id {
                debug!(
                    event = envelope.event.name(),
                    run_id = %envelope.run_id,
                    message_id = %message_id,
                    "Promoted delayed event"
                );
                promoted += 1;
            }
        }
        if promoted > 0 {
            debug!(promoted, "Promoted delayed events");
        }
        Ok(promoted)
    }

    pub async fn len(&self) -> QueueResult<u64> {
        let mut conn = self.conn().await?;
        Ok(conn.xlen(&self.config.stream_name).await?)
    }

    pub async fn dlq_len(&self) -> QueueResult<u64> {
        let mut conn = self.conn().await?;
        Ok(conn.xlen(&self.config.dlq_stream_name).await?)
    }

    pub async fn delayed_len(&self) -> QueueResult<u64> {
        let mut conn = self.conn().await?;
        Ok(conn.zcard(&self.config.delayed_key).await?)
    }
}

#[async_trait]
impl EventPublisher for RedisEventBus {
    async fn publish(&self, envelope: EventEnvelope) -> QueueResult<String> {
        let mut conn = self.conn().await?;
        let payload = serde_json::to_string(&envelope)?;

        let message_id: String = redis::cmd("XADD")
            .arg(&self.config.stream_name)
            .arg("*")
            .arg("event")
            .arg(&payload)
            .arg("type")
            .arg(envelope.event.name())
            .query_async(&mut conn)
            .await
            .map_err(|e| QueueError::publish_failed(e.to_string()))?;

        info!(
            event = envelope.event.name(),
            run_id = %envelope.run_id,
            attempt = envelope.attempt,
            message_id = %message_id,
            "Published event"
        );
        Ok(message_id)
    }

    async fn schedule(&self, envelope: EventEnvelope, delay: Duration) -> QueueResult<()> {
        let mut conn = self.conn().await?;
        let due_ms = Utc::now().timestamp_millis() + delay.as_millis() as i64;
        let payload = serde_json::to_string(&envelope)?;

        conn.zadd::<_, _, _, ()>(&self.config.delayed_key, &payload, due_ms)
            .await?;

        info!(
            event = envelope.event.name(),
            run_id = %envelope.run_id,
            delay_secs = delay.as_secs(),
            "Scheduled event"
        );
        Ok(())
    }
}

#[async_trait]
impl StepJournal for RedisEventBus {
    async fn load(&self, run_id: &str, step: &str) -> QueueResult<Option<serde_json::Value>> {
        let mut conn = self.conn().await?;
        let raw: Option<String> = conn.hget(self.config.journal_key(run_id), step).await?;
        raw.map(|s| serde_json::from_str(&s).map_err(QueueError::from))
            .transpose()
    }

    async fn record(&self, run_id: &str, step: &str, output: &serde_json::Value) -> QueueResult<()> {
        let mut conn = self.conn().await?;
        let key = self.config.journal_key(run_id);
        conn.hset::<_, _, _, ()>(&key, step, output.to_string()).await?;
        conn.expire::<_, ()>(&key, self.config.journal_ttl.as_secs() as i64)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl ConcurrencyLimiter for RedisEventBus {
    async fn try_acquire(&self, key: &str, holder: &str, ttl: Duration) -> QueueResult<bool> {
        let mut conn = self.conn().await?;
        let reply: Option<String> = redis::cmd("SET")
            .arg(self.config.lease_key(key))
            .arg(holder)
            .arg("NX")
            .arg("PX")
            .arg(ttl.as_millis() as u64)
            .query_async(&mut conn)
            .await?;
        Ok(reply.is_some())
    }

    async fn release(&self, key: &str, holder: &str) -> QueueResult<()> {
        let mut conn = self.conn().await?;
        let _: i64 = redis::Script::new(RELEASE_SCRIPT)
            .key(self.config.lease_key(key))
            .arg(holder)
            .invoke_async(&mut conn)
            .await?;
        Ok(())
    }
}
