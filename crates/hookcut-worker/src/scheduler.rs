//! Delayed delivery: moves due envelopes (retries, deferrals, guardian
//! checks) from the Redis sorted set onto the event stream.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{info, warn};

use hookcut_queue::RedisEventBus;

/// Most envelopes promoted per tick.
const PROMOTE_BATCH: usize = 100;

pub async fn run(bus: Arc<RedisEventBus>, every: Duration, mut shutdown_rx: watch::Receiver<bool>) {
    let mut interval = tokio::time::interval(every);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    info!("Delayed event scheduler started");

    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    break;
                }
            }
            _ = interval.tick() => {
                // Drain a backlog without waiting a full tick per batch.
                loop {
                    match bus.promote_due(PROMOTE_BATCH).await {
                        Ok(promoted) if promoted == PROMOTE_BATCH => continue,
                        Ok(_) => break,
                        Err(e) => {
                            warn!("Failed to promote delayed events: {}", e);
                            break;
                        }
                    }
                }
            }
        }
    }

    info!("Delayed event scheduler stopped");
}
