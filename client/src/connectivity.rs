//! Connectivity signal and background reachability monitor.
//!
//! The signal gates whether new remote operations are attempted. It has no
//! effect on calls already in flight.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Something that can tell whether the remote side is reachable.
#[async_trait]
pub trait Probe: Send + Sync {
    async fn is_reachable(&self) -> bool;
}

/// Shared reachability flag with change notification.
///
/// Clones observe and update the same flag.
#[derive(Debug, Clone)]
pub struct ConnectivitySignal {
    tx: Arc<watch::Sender<bool>>,
}

impl ConnectivitySignal {
    /// Create a signal starting at `connected`.
    pub fn new(connected: bool) -> Self {
        let (tx, _rx) = watch::channel(connected);
        Self { tx: Arc::new(tx) }
    }

    /// Current reachability.
    pub fn is_connected(&self) -> bool {
        *self.tx.borrow()
    }

    /// Publish reachability. Subscribers are only woken on a transition;
    /// returns whether one happened.
    pub fn set(&self, connected: bool) -> bool {
        self.tx.send_if_modified(|current| {
            if *current == connected {
                false
            } else {
                *current = connected;
                true
            }
        })
    }

    /// Receiver notified on every transition.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

/// Background task polling a [`Probe`] and publishing transitions to a
/// [`ConnectivitySignal`]. Stops when shut down or dropped.
#[derive(Debug)]
pub struct ConnectivityMonitor {
    handle: JoinHandle<()>,
}

impl ConnectivityMonitor {
    /// Start polling `probe` every `interval`. The first probe runs
    /// immediately.
    pub fn spawn(probe: Arc<dyn Probe>, signal: ConnectivitySignal, interval: Duration) -> Self {
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                let reachable = probe.is_reachable().await;
                if signal.set(reachable) {
                    if reachable {
                        tracing::info!("Connectivity restored");
                    } else {
                        tracing::warn!("Connectivity lost, working from local data");
                    }
                }
            }
        });

        Self { handle }
    }

    /// Stop polling.
    pub fn shutdown(self) {
        // Drop aborts the task
    }
}

impl Drop for ConnectivityMonitor {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
