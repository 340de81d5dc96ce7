//! OS signal handling.
//!
//! [`ShutdownCoordinator`] turns the first termination signal into a
//! cancellation of a single [`CancellationToken`] that the dispatch loop
//! observes between events.
//!
//! **Unix platforms:** `SIGINT` (Ctrl-C) and `SIGTERM` request shutdown,
//! `SIGHUP` reloads the administrator list.
//!
//! **Other platforms:** only Ctrl-C via [`tokio::signal::ctrl_c`].

use std::fmt;
#[cfg(unix)]
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[cfg(unix)]
use crate::config::AdminList;

/// Termination signal that ended the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    Interrupt,
    Terminate,
}

impl fmt::Display for ShutdownSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Interrupt => write!(f, "SIGINT"),
            Self::Terminate => write!(f, "SIGTERM"),
        }
    }
}

/// Waits for a termination signal.
///
/// Each call creates independent signal listeners.
#[cfg(unix)]
pub async fn wait_for_shutdown_signal() -> std::io::Result<ShutdownSignal> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    let received = tokio::select! {
        _ = sigint.recv() => ShutdownSignal::Interrupt,
        _ = sigterm.recv() => ShutdownSignal::Terminate,
    };
    Ok(received)
}

/// Waits for a termination signal.
///
/// Each call creates independent signal listeners.
#[cfg(not(unix))]
pub async fn wait_for_shutdown_signal() -> std::io::Result<ShutdownSignal> {
    tokio::signal::ctrl_c().await?;
    Ok(ShutdownSignal::Interrupt)
}

/// Owns the process-wide cancellation token.
#[derive(Debug, Clone, Default)]
pub struct ShutdownCoordinator {
    token: CancellationToken,
}

impl ShutdownCoordinator {
    /// Creates a coordinator with a fresh token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a handle to the token for the dispatch loop to observe.
    #[must_use]
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Fires the token. Calling this again is a no-op.
    pub fn trigger(&self, reason: &str) {
        if self.token.is_cancelled() {
            debug!(reason, "Shutdown already requested");
            return;
        }

        info!(reason, "Shutdown requested");
        self.token.cancel();
    }

    /// Waits for the first termination signal in a background task and fires
    /// the token when it arrives.
    ///
    /// If signal listeners cannot be installed the token is fired right away,
    /// so the process never runs without a way to stop it.
    pub fn spawn(&self) -> JoinHandle<()> {
        let coordinator = self.clone();

        tokio::spawn(async move {
            tokio::select! {
                () = coordinator.token.cancelled() => {}
                received = wait_for_shutdown_signal() => match received {
                    Ok(signal) => {
                        info!("Received {}, shutting down...", signal);
                        coordinator.trigger(&signal.to_string());
                    }
                    Err(e) => {
                        error!(error = %e, "Failed to install signal handlers");
                        coordinator.trigger("signal handler failure");
                    }
                },
            }
        })
    }
}

/// Waits for a background task to finish. A panic or cancellation is logged
/// instead of propagated; returns `false` in that case.
pub async fn join_background(name: &str, handle: JoinHandle<()>) -> bool {
    match handle.await {
        Ok(()) => true,
        Err(e) => {
            warn!(task = name, error = %e, "Background task failed");
            false
        }
    }
}

/// Reloads the administrator list on every `SIGHUP` until `shutdown` fires.
#[cfg(unix)]
pub fn spawn_admin_reload(
    admins: Arc<AdminList>,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    use tokio::signal::unix::{SignalKind, signal};

    tokio::spawn(async move {
        let mut hangup = match signal(SignalKind::hangup()) {
            Ok(hangup) => hangup,
            Err(e) => {
                error!(error = %e, "Failed to install SIGHUP handler, admin reload disabled");
                return;
            }
        };

        loop {
            tokio::select! {
                () = shutdown.cancelled() => break,
                received = hangup.recv() => {
                    if received.is_none() {
                        break;
                    }
                    info!("Received SIGHUP, reloading administrators");
                    if let Err(e) = admins.reload() {
                        warn!(error = %e, "Admin reload failed, keeping previous list");
                    }
                }
            }
        }
    })
}
