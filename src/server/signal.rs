// Signal handling module (nginx-style)
//
// Supported signals:
// - SIGTERM: Graceful shutdown
// - SIGINT:  Graceful shutdown (Ctrl+C)
// - SIGUSR1: Reopen log files
// - SIGHUP:  Logged only; configuration is read at startup

use std::sync::Arc;
use tokio::sync::Notify;

use crate::logger;

/// Signal handler state
pub struct SignalHandler {
    /// Shutdown signal (SIGTERM, SIGINT)
    pub shutdown: Arc<Notify>,
}

impl SignalHandler {
    pub fn new() -> Self {
        Self {
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Wake the accept loop; the permit is kept if it is not waiting yet
    pub fn request_shutdown(&self) {
        self.shutdown.notify_one();
    }
}

impl Default for SignalHandler {
    fn default() -> Self {
        Self::new()
    }
}

/// Register Unix signal handlers and spawn the task reacting to them
///
/// | Signal  | Action           | Nginx Equivalent |
/// |---------|------------------|------------------|
/// | SIGTERM | Graceful stop    | `nginx -s quit`  |
/// | SIGINT  | Graceful stop    | Ctrl+C           |
/// | SIGUSR1 | Reopen logs      | `nginx -s reopen`|
#[cfg(unix)]
pub fn start_signal_handler(handler: Arc<SignalHandler>) -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigusr1 = signal(SignalKind::user_defined1())?;
    let mut sighup = signal(SignalKind::hangup())?;

    logger::log_info(&format!(
        "Signal handlers registered (pid {}): TERM/INT shutdown, USR1 reopen logs",
        std::process::id()
    ));

    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = sigterm.recv() => {
                    logger::log_info("SIGTERM received, initiating graceful shutdown");
                    handler.request_shutdown();
                    break;
                }
                _ = sigint.recv() => {
                    logger::log_info("SIGINT received, initiating graceful shutdown");
                    handler.request_shutdown();
                    break;
                }
                _ = sigusr1.recv() => {
                    logger::reopen();
                }
                _ = sighup.recv() => {
                    logger::log_warning("SIGHUP ignored: restart the server to apply configuration changes");
                }
            }
        }
    });

    Ok(())
}

/// Non-Unix fallback - only handles Ctrl+C
#[cfg(not(unix))]
pub fn start_signal_handler(handler: Arc<SignalHandler>) -> std::io::Result<()> {
    tokio::spawn(async move {
        if let Ok(()) = tokio::signal::ctrl_c().await {
            logger::log_info("Ctrl+C received, initiating graceful shutdown");
            handler.request_shutdown();
        }
    });
    Ok(())
}
