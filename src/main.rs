use std::sync::Arc;
use std::time::Duration;

mod config;
mod contact;
mod handler;
mod http;
mod logger;
mod routing;
mod server;
mod session;

use session::SessionStore;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config".to_string());
    let cfg = config::Config::load_from(&config_path)?;
    logger::init(&cfg)?;

    // Build the Tokio runtime, sized by `server.workers` when set
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();

    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
        logger::log_info(&format!("Using {workers} worker threads"));
    } else {
        logger::log_info("Using default worker threads (CPU cores)");
    }

    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: config::Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr = cfg.get_socket_addr()?;
    let listener = server::create_listener(addr)?;

    let state = Arc::new(config::AppState::new(cfg)?);
    logger::log_server_start(&addr, &state.config);
    logger::log_info(&format!(
        "Mail transport: {}",
        state.contact.mailer().transport_name()
    ));
    if state.config.recaptcha.secret_key.is_empty() {
        logger::log_warning("recaptcha.secret_key is not set, bot checks will fail");
    }
    let budget = state.config.contact_outbound_budget();
    if state.config.performance.write_timeout <= budget {
        logger::log_warning(&format!(
            "performance.write_timeout ({}s) does not exceed the contact outbound budget ({budget}s); \
             slow mail delivery will be cut off",
            state.config.performance.write_timeout
        ));
    }

    let signals = Arc::new(server::SignalHandler::new());
    server::start_signal_handler(Arc::clone(&signals))?;
    spawn_session_purge(&state);

    // Use LocalSet for spawn_local support
    let local = tokio::task::LocalSet::new();
    local
        .run_until(server::start_server_loop(listener, state, signals))
        .await
}

/// Periodically drop sessions idle longer than `session.ttl_secs`
fn spawn_session_purge(state: &Arc<config::AppState>) {
    let sessions = Arc::clone(&state.sessions);
    let period = (state.config.session.ttl() / 4).max(Duration::from_secs(1));

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            let purged = sessions.purge_expired();
            if purged > 0 {
                logger::log_debug(&format!(
                    "Purged {purged} expired session(s), {} active",
                    sessions.session_count()
                ));
            }
        }
    });
}
