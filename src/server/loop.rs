// Server loop module
// Accepts connections until shutdown, then drains in-flight connections

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::time::Instant;

use super::connection::accept_connection;
use super::signal::SignalHandler;
use crate::config::AppState;
use crate::logger;

const DRAIN_POLL: Duration = Duration::from_millis(50);

/// Run the accept loop on the current `LocalSet` until shutdown is requested.
///
/// On shutdown the listener is closed first, then open connections are told
/// to finish their current request and given `performance.shutdown_grace`
/// seconds to do so.
pub async fn start_server_loop(
    listener: TcpListener,
    state: Arc<AppState>,
    signals: Arc<SignalHandler>,
) -> Result<(), Box<dyn std::error::Error>> {
    let active_connections = Arc::new(AtomicUsize::new(0));
    let (drain_tx, drain_rx) = watch::channel(false);

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        accept_connection(
                            stream,
                            peer_addr,
                            &state,
                            &active_connections,
                            drain_rx.clone(),
                        );
                    }
                    Err(e) => logger::log_error(&format!("Failed to accept connection: {e}")),
                }
            }

            () = signals.shutdown.notified() => break,
        }
    }

    drop(listener);
    logger::log_shutdown(active_connections.load(Ordering::SeqCst));
    drain_tx.send_replace(true);

    let grace = Duration::from_secs(state.config.performance.shutdown_grace);
    if wait_for_drain(&active_connections, grace).await {
        logger::log_info("All connections closed, server stopped");
    } else {
        logger::log_warning(&format!(
            "Shutdown grace of {}s elapsed with {} connection(s) still open",
            grace.as_secs(),
            active_connections.load(Ordering::SeqCst)
        ));
    }
    Ok(())
}

/// Wait until the counter reaches zero or `grace` elapses
async fn wait_for_drain(active: &AtomicUsize, grace: Duration) -> bool {
    let deadline = Instant::now() + grace;
    while active.load(Ordering::SeqCst) > 0 {
        if Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(DRAIN_POLL).await;
    }
    true
}
