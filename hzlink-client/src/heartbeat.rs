//! Periodic heartbeat pings keeping an idle connection alive.

use std::sync::Arc;
use std::time::Duration;

use hzlink_core::{hz_trace, hz_warn};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::codec::ping;
use crate::connection::Connection;

/// Pings `connection` every `interval` until it closes.
///
/// Returns `None` without spawning anything when `interval` is zero. A failed
/// ping is logged; the task only stops once the connection is closed.
pub fn spawn_heartbeat(connection: Arc<Connection>, interval: Duration) -> Option<JoinHandle<()>> {
    if interval.is_zero() {
        return None;
    }

    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            if connection.is_closed() {
                break;
            }
            if let Err(e) = ping::send_ping(&connection).await {
                if connection.is_closed() {
                    break;
                }
                hz_warn!(
                    connection.logger(),
                    "heartbeat to {} failed: {}",
                    connection.address(),
                    e
                );
            }
        }
        hz_trace!(connection.logger(), "heartbeat to {} stopped", connection.address());
    }))
}
