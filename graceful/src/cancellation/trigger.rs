//! Trigger source merging a parent token with OS termination signals.

use super::CancellationToken;
use std::fmt;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// Reason recorded on every merged token, whatever triggered it.
pub const SHUTDOWN_REASON: &str = "shutdown requested";

/// What caused a merged token to cancel. Used for diagnostics only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOrigin {
    /// The caller-supplied parent token was cancelled.
    Parent,
    /// The process received an interrupt request (SIGINT / Ctrl-C).
    Interrupt,
    /// The process received a termination request (SIGTERM).
    Terminate,
}

impl fmt::Display for TriggerOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parent => write!(f, "parent"),
            Self::Interrupt => write!(f, "interrupt"),
            Self::Terminate => write!(f, "terminate"),
        }
    }
}

/// Builds a merged cancellation token.
///
/// The merged token is available through [`token`](Self::token) as soon as
/// the source exists, but nothing can cancel it until [`arm`](Self::arm)
/// connects it to the parent token and the OS signals.
#[derive(Debug)]
pub struct TriggerSource {
    parent: Option<Arc<CancellationToken>>,
    token: Arc<CancellationToken>,
    listen_for_signals: bool,
}

impl TriggerSource {
    /// Creates a trigger source for an optional parent token.
    #[must_use]
    pub fn new(parent: Option<Arc<CancellationToken>>) -> Self {
        Self {
            parent,
            token: Arc::new(CancellationToken::new()),
            listen_for_signals: true,
        }
    }

    /// Enables or disables the OS signal subscription.
    #[must_use]
    pub fn with_signals(mut self, enabled: bool) -> Self {
        self.listen_for_signals = enabled;
        self
    }

    /// Returns the merged token.
    #[must_use]
    pub fn token(&self) -> &Arc<CancellationToken> {
        &self.token
    }

    /// Subscribes to OS signals and starts watching the parent token.
    ///
    /// Must be called from within a tokio runtime. The subscription lives
    /// until the returned guard is released or dropped; while it is alive
    /// SIGINT and SIGTERM no longer terminate the process.
    pub fn arm(self) -> TriggerGuard {
        let (signals, hold) = if self.listen_for_signals {
            match DefaultActionHold::acquire()
                .and_then(|hold| ShutdownSignals::subscribe().map(|signals| (signals, hold)))
            {
                Ok((signals, hold)) => (Some(signals), Some(hold)),
                Err(e) => {
                    error!(
                        "Failed to subscribe to shutdown signals, relying on parent token only: {}",
                        e
                    );
                    (None, None)
                }
            }
        } else {
            (None, None)
        };

        let token = Arc::clone(&self.token);
        let parent = self.parent;
        let listener = tokio::spawn(async move {
            let origin = match signals {
                Some(mut signals) => {
                    tokio::select! {
                        () = wait_for_parent(parent.as_deref()) => TriggerOrigin::Parent,
                        origin = signals.recv() => origin,
                    }
                }
                None => {
                    wait_for_parent(parent.as_deref()).await;
                    TriggerOrigin::Parent
                }
            };

            if token.cancel(SHUTDOWN_REASON) {
                info!(origin = %origin, "Shutdown triggered");
            } else {
                debug!(origin = %origin, "Shutdown already triggered, ignoring");
            }
        });

        TriggerGuard {
            token: self.token,
            listener: Some(listener),
            hold,
        }
    }
}

/// Keeps a trigger source's signal subscription alive.
///
/// Releasing (or dropping) the guard drops the subscription so repeated
/// coordinator runs never stack listeners. On Unix, once no guard holds a
/// subscription any more, SIGINT and SIGTERM terminate the process again as
/// they would without this crate.
#[derive(Debug)]
pub struct TriggerGuard {
    token: Arc<CancellationToken>,
    listener: Option<JoinHandle<()>>,
    hold: Option<DefaultActionHold>,
}

impl TriggerGuard {
    /// Returns the merged token.
    #[must_use]
    pub fn token(&self) -> &Arc<CancellationToken> {
        &self.token
    }

    /// Drops the signal subscription and hands SIGINT/SIGTERM back to their
    /// default action. Safe to call more than once.
    pub fn release(&mut self) {
        self.hold.take();
        if let Some(listener) = self.listener.take() {
            listener.abort();
            debug!("Shutdown signal subscription released");
        }
    }

    /// Returns true once the subscription has been released.
    #[must_use]
    pub fn is_released(&self) -> bool {
        self.listener.is_none()
    }
}

impl Drop for TriggerGuard {
    fn drop(&mut self) {
        self.release();
    }
}

/// Creates a token that cancels when `parent` cancels or the process
/// receives an interrupt or termination signal, whichever happens first.
pub fn merge_cancellation(parent: Option<Arc<CancellationToken>>) -> TriggerGuard {
    TriggerSource::new(parent).arm()
}

async fn wait_for_parent(parent: Option<&CancellationToken>) {
    match parent {
        Some(parent) => parent.cancelled().await,
        None => std::future::pending().await,
    }
}

#[cfg(unix)]
use parking_lot::Mutex;
#[cfg(unix)]
use std::sync::atomic::{AtomicBool, Ordering};

#[cfg(unix)]
struct HoldState {
    active: usize,
    restore_default: Option<Arc<AtomicBool>>,
}

#[cfg(unix)]
static HOLD_STATE: Mutex<HoldState> = parking_lot::const_mutex(HoldState {
    active: 0,
    restore_default: None,
});

/// Suppresses the default action of SIGINT and SIGTERM while alive.
///
/// tokio never uninstalls its process-wide handlers, so a conditional
/// default action is chained next to them and switched back on when the
/// last hold goes away.
#[cfg(unix)]
#[derive(Debug)]
struct DefaultActionHold(());

#[cfg(unix)]
impl DefaultActionHold {
    fn acquire() -> std::io::Result<Self> {
        use signal_hook::consts::{SIGINT, SIGTERM};

        let mut state = HOLD_STATE.lock();
        if state.restore_default.is_none() {
            let restore_default = Arc::new(AtomicBool::new(false));
            for signal in [SIGINT, SIGTERM] {
                signal_hook::flag::register_conditional_default(
                    signal,
                    Arc::clone(&restore_default),
                )?;
            }
            state.restore_default = Some(restore_default);
        }

        state.active += 1;
        if let Some(restore_default) = &state.restore_default {
            restore_default.store(false, Ordering::SeqCst);
        }
        Ok(Self(()))
    }
}

#[cfg(unix)]
impl Drop for DefaultActionHold {
    fn drop(&mut self) {
        let mut state = HOLD_STATE.lock();
        state.active = state.active.saturating_sub(1);
        if state.active == 0 {
            if let Some(restore_default) = &state.restore_default {
                restore_default.store(true, Ordering::SeqCst);
            }
        }
    }
}

#[cfg(not(unix))]
#[derive(Debug)]
struct DefaultActionHold(());

#[cfg(not(unix))]
impl DefaultActionHold {
    fn acquire() -> std::io::Result<Self> {
        Ok(Self(()))
    }
}

#[cfg(unix)]
struct ShutdownSignals {
    interrupt: tokio::signal::unix::Signal,
    terminate: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl ShutdownSignals {
    fn subscribe() -> std::io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    async fn recv(&mut self) -> TriggerOrigin {
        tokio::select! {
            Some(()) = self.interrupt.recv() => TriggerOrigin::Interrupt,
            Some(()) = self.terminate.recv() => TriggerOrigin::Terminate,
            else => std::future::pending().await,
        }
    }
}

#[cfg(not(unix))]
struct ShutdownSignals;

#[cfg(not(unix))]
impl ShutdownSignals {
    fn subscribe() -> std::io::Result<Self> {
        Ok(Self)
    }

    async fn recv(&mut self) -> TriggerOrigin {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
        TriggerOrigin::Interrupt
    }
}
