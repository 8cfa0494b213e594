//! Single-threaded dispatch loop.
//!
//! Three event sources feed the [`VolumeController`]:
//!
//! ```text
//!  poll timer (10 ms) ──▶ KeySource::drain() ──▶ handle_keys(batch)
//!  session channel   ──▶ SessionEvent       ──▶ handle_session_event()
//!  reconnect timer   ──▶ deadline reached    ──▶ reconnect_now()
//! ```
//!
//! All three are awaited in one `tokio::select!`, so the controller is only
//! ever touched by this task and each transition runs to completion before
//! the next one starts.  Nothing in the loop waits on the network: device
//! reads are non-blocking and session commands are fire-and-forget.

use std::future::Future;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::application::control_volume::{SessionEvent, VolumeController};
use crate::infrastructure::input_device::KeySource;

/// Default device polling period.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Tracks whether device reads are currently failing so a persistent
/// failure is logged once instead of on every tick.
#[derive(Debug, Default)]
struct ReadHealth {
    failing: bool,
}

/// Runs the daemon until `shutdown` completes.
///
/// The loop never exits on device or network errors; they are logged and
/// the loop keeps going.
pub async fn run<S, F>(
    controller: &mut VolumeController,
    source: &mut S,
    events: &mut mpsc::Receiver<SessionEvent>,
    poll_interval: Duration,
    shutdown: F,
) where
    S: KeySource + ?Sized,
    F: Future<Output = ()>,
{
    let mut ticker = time::interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut health = ReadHealth::default();
    let mut session_open = true;
    tokio::pin!(shutdown);

    loop {
        let reconnect_at = controller.reconnect_deadline();

        tokio::select! {
            biased;

            () = &mut shutdown => {
                info!("shutdown requested");
                break;
            }

            event = events.recv(), if session_open => match event {
                Some(event) => controller.handle_session_event(event),
                None => {
                    warn!("session notification channel closed");
                    session_open = false;
                }
            },

            () = sleep_until(reconnect_at), if reconnect_at.is_some() => {
                controller.reconnect_now();
            }

            _ = ticker.tick() => poll_device(controller, source, &mut health),
        }
    }
}

/// Drains the device once and feeds the batch to the controller.
fn poll_device<S>(controller: &mut VolumeController, source: &mut S, health: &mut ReadHealth)
where
    S: KeySource + ?Sized,
{
    match source.drain() {
        Ok(keys) => {
            if health.failing {
                info!("input device reads recovered");
                health.failing = false;
            }
            controller.handle_keys(keys);
        }
        Err(e) if health.failing => debug!("{e}"),
        Err(e) => {
            error!("{e}");
            health.failing = true;
        }
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
