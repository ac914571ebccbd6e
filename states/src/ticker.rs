//! An owned periodic timer.
//!
//! A `Ticker` is a resource, not an ambient global: it starts when it is
//! spawned, and it stops when it is cancelled, dropped, or when nobody is
//! listening on its channel any more.

use std::time::Duration;

use flume::Sender;
use log::debug;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;

/// One period elapsed. `sequence` starts at 1 and increases by exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    pub sequence: u64,
}

/// Handle to a running ticker task.
///
/// Must be spawned from within a tokio runtime.
#[derive(Debug)]
pub struct Ticker {
    cancel_token: CancellationToken,
}

impl Ticker {
    /// Spawns a ticker that sends `map(tick)` into `sender` once per `period`.
    ///
    /// The first tick fires one full period after spawning. Ticks missed
    /// because the runtime was busy are delivered in a burst so no period is
    /// ever skipped.
    pub fn spawn<T, F>(period: Duration, sender: Sender<T>, map: F) -> Self
    where
        T: Send + 'static,
        F: Fn(Tick) -> T + Send + 'static,
    {
        let cancel_token = CancellationToken::new();
        let token = cancel_token.clone();

        tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Burst);
            let mut sequence = 0_u64;

            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        debug!("Ticker: cancelled after {sequence} ticks");
                        break;
                    }
                    _ = interval.tick() => {
                        sequence += 1;
                        if sender.send(map(Tick { sequence })).is_err() {
                            debug!("Ticker: receiver dropped after {sequence} ticks");
                            break;
                        }
                    }
                }
            }
        });

        Self { cancel_token }
    }

    /// Stops the ticker. No tick is sent after this returns.
    pub fn stop(&self) {
        self.cancel_token.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel_token.is_cancelled()
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}
