mod logging;
mod manager;
mod routes;

use clap::Parser;
use evo_core::{Hub, HubConfig, CONNECT_DELAY};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tracing::{error, info};

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_LOG_DIR: &str = ".evo/logs";

#[derive(Clone, Debug)]
struct Config {
    addr: String,
    debug: bool,
    connect_delay: Duration,
    log_dir: String,
}

/// Every flag falls back to an environment variable, then a default.
#[derive(Parser, Debug)]
#[command(name = "evo-hub")]
struct Args {
    /// Bind address; `EVO_HUB_ADDR`, else `0.0.0.0:$PORT`.
    #[arg(long, default_value = "")]
    addr: String,
    /// Force debug logging; also `EVO_HUB_DEBUG`.
    #[arg(long, default_value_t = false)]
    debug: bool,
    /// Handshake confirmation delay; also `EVO_CONNECT_DELAY_MS`.
    #[arg(long)]
    connect_delay_ms: Option<u64>,
    /// Log directory; `EVO_LOG_DIR`. Empty disables the log file.
    #[arg(long)]
    log_dir: Option<String>,
}

#[tokio::main]
async fn main() {
    let config = Config::from_args(Args::parse());
    let _log_guard = logging::init(config.debug, &config.log_dir);
    let addr: SocketAddr = match config.addr.parse() {
        Ok(value) => value,
        Err(err) => {
            error!(event = "invalid_addr", error = %err, addr = %config.addr);
            return;
        }
    };

    let hub = Arc::new(Hub::new(HubConfig {
        connect_delay: config.connect_delay,
        ..HubConfig::default()
    }));
    let app = routes::router(hub);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(value) => value,
        Err(err) => {
            error!(event = "hub_error", error = %err);
            return;
        }
    };

    info!(
        event = "hub_start",
        addr = %addr,
        connect_delay_ms = u64::try_from(config.connect_delay.as_millis()).unwrap_or(u64::MAX),
        manager = %format!("http://{addr}/manager")
    );

    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    if let Err(err) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
    {
        error!(event = "hub_error", error = %err);
    }
    info!(event = "hub_stop");
}

impl Config {
    fn from_args(args: Args) -> Self {
        let addr = non_blank(args.addr)
            .or_else(|| env_value("EVO_HUB_ADDR"))
            .unwrap_or_else(|| {
                let port = env_value("PORT")
                    .and_then(|value| value.parse::<u16>().ok())
                    .unwrap_or(DEFAULT_PORT);
                format!("0.0.0.0:{port}")
            });
        let connect_delay = args
            .connect_delay_ms
            .or_else(|| env_value("EVO_CONNECT_DELAY_MS").and_then(|value| value.parse().ok()))
            .map(Duration::from_millis)
            .unwrap_or(CONNECT_DELAY);
        let debug = args.debug
            || env_value("EVO_HUB_DEBUG").is_some_and(|value| {
                matches!(value.to_lowercase().as_str(), "1" | "true" | "yes" | "on")
            });
        // An explicitly empty EVO_LOG_DIR turns the file off, so read it raw.
        let log_dir = args
            .log_dir
            .or_else(|| std::env::var("EVO_LOG_DIR").ok())
            .unwrap_or_else(|| DEFAULT_LOG_DIR.to_string());
        Self {
            addr,
            debug,
            connect_delay,
            log_dir,
        }
    }
}

/// Trimmed value of `key`, or `None` when unset or blank.
pub(crate) fn env_value(key: &str) -> Option<String> {
    std::env::var(key).ok().and_then(non_blank)
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
