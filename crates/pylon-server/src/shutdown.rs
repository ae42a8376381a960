//! Graceful shutdown.
//!
//! A [`ShutdownSignal`] is cloned into the accept loop and every
//! connection task. Triggering it stops accepting, asks open connections to
//! finish their current exchange, and the server then waits on a
//! [`ConnectionTracker`] until they are gone or the shutdown timeout
//! elapses.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{broadcast, Notify};
use tracing::{info, warn};

/// A cloneable, one-shot shutdown trigger.
///
/// ```rust
/// use pylon_server::ShutdownSignal;
///
/// let shutdown = ShutdownSignal::new();
/// let other = shutdown.clone();
/// other.trigger();
/// assert!(shutdown.is_shutdown());
/// ```
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    triggered: Arc<AtomicBool>,
    sender: broadcast::Sender<()>,
}

impl ShutdownSignal {
    /// Creates an untriggered signal.
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(1);
        Self {
            triggered: Arc::new(AtomicBool::new(false)),
            sender,
        }
    }

    /// Triggers shutdown. Idempotent.
    pub fn trigger(&self) {
        if !self.triggered.swap(true, Ordering::SeqCst) {
            // No subscribers is fine.
            let _ = self.sender.send(());
        }
    }

    /// Returns `true` once triggered.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    /// Completes when shutdown is triggered, immediately if it already was.
    pub async fn recv(&self) {
        // Subscribe before checking the flag so a concurrent trigger is not
        // missed.
        let mut receiver = self.sender.subscribe();
        if self.is_shutdown() {
            return;
        }
        let _ = receiver.recv().await;
    }

    /// Creates a signal triggered by SIGTERM or Ctrl+C.
    ///
    /// Must be called inside a Tokio runtime.
    #[must_use]
    pub fn with_os_signals() -> Self {
        let signal = Self::new();
        let trigger = signal.clone();
        tokio::spawn(async move {
            wait_for_os_signal().await;
            trigger.trigger();
        });
        signal
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

async fn wait_for_os_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
                    result = tokio::signal::ctrl_c() => log_ctrl_c(result),
                }
            }
            Err(e) => {
                warn!(failure = %e, "SIGTERM handler unavailable, waiting for Ctrl+C only");
                log_ctrl_c(tokio::signal::ctrl_c().await);
            }
        }
    }

    #[cfg(not(unix))]
    log_ctrl_c(tokio::signal::ctrl_c().await);
}

fn log_ctrl_c(result: std::io::Result<()>) {
    match result {
        Ok(()) => info!("received SIGINT, shutting down"),
        Err(e) => warn!(failure = %e, "failed to listen for Ctrl+C, shutting down"),
    }
}

/// Counts open connections.
///
/// ```rust
/// use pylon_server::ConnectionTracker;
///
/// let tracker = ConnectionTracker::new();
/// let token = tracker.acquire();
/// assert_eq!(tracker.active_connections(), 1);
/// drop(token);
/// assert_eq!(tracker.active_connections(), 0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConnectionTracker {
    active: Arc<AtomicUsize>,
    idle: Arc<Notify>,
}

impl ConnectionTracker {
    /// Creates a tracker with no connections.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a connection until the token drops.
    #[must_use]
    pub fn acquire(&self) -> ConnectionToken {
        self.active.fetch_add(1, Ordering::SeqCst);
        ConnectionToken {
            active: Arc::clone(&self.active),
            idle: Arc::clone(&self.idle),
        }
    }

    /// Number of open connections.
    #[must_use]
    pub fn active_connections(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Completes once no connections are open.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            if self.active_connections() == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// Held for the lifetime of one connection.
#[derive(Debug)]
pub struct ConnectionToken {
    active: Arc<AtomicUsize>,
    idle: Arc<Notify>,
}

impl Drop for ConnectionToken {
    fn drop(&mut self) {
        if self.active.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.idle.notify_waiters();
        }
    }
}
