//! `wsmux-client` -- command-line session over the game server channels.
//!
//! Opens the configured channels, logs every server event and reports
//! when the session as a whole loses and regains connectivity. Each line
//! typed on stdin counts as user input for the idle check behind the
//! main channel heartbeat. Stops on Ctrl-C.
//!
//! See [`ClientConfig::from_env`] for the environment variables.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wsmux_client::config::ClientConfig;
use wsmux_core::{ChannelEvent, ChannelKind};
use wsmux_session::{IdleTracker, SessionConfig, SessionManager, SessionTable};
use wsmux_transport::WsTransport;

/// Application tags logged for each channel kind.
fn app_tags(kind: ChannelKind) -> &'static [&'static str] {
    match kind {
        ChannelKind::List => &["room", "room_list"],
        ChannelKind::Main => &["user_status", "user_info"],
        ChannelKind::Observe | ChannelKind::User => &["room_info", "game_state"],
    }
}

fn log_events(table: &SessionTable) {
    for kind in table.kinds() {
        let Some(handle) = table.get(kind) else {
            continue;
        };
        for tag in app_tags(kind) {
            handle.on(
                tag,
                Arc::new(move |e: &ChannelEvent| {
                    tracing::info!(kind = %kind, tag = %e.tag, payload = %e.payload, "Server event");
                }),
            );
        }
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "wsmux_client=info,wsmux_session=info,wsmux_transport=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ClientConfig::from_env().unwrap_or_else(|e| {
        tracing::error!(error = %e, "Invalid configuration");
        std::process::exit(1);
    });

    tracing::info!(
        server_url = %config.server_url,
        channels = ?config.channels,
        heartbeat_secs = config.session.heartbeat_period.as_secs(),
        "Starting wsmux-client",
    );

    let idle = Arc::new(IdleTracker::new(config.session.idle_timeout));
    let transport = Arc::new(WsTransport::new(config.server_url.clone(), config.reconnect.clone()));
    let manager = SessionManager::new(transport, idle.clone(), config.session.clone());

    let session = SessionConfig::new(config.channels.clone())
        .on_disconnect(|| tracing::warn!("Connection lost"))
        .on_reconnect(|| tracing::info!("Connection restored"));

    let table = manager.open(session).unwrap_or_else(|e| {
        tracing::error!(error = %e, "Failed to open session");
        std::process::exit(1);
    });
    log_events(&table);

    let input = tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(_)) = lines.next_line().await {
            idle.touch();
        }
    });

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl-C");
    }

    tracing::info!("Shutting down");
    input.abort();
    drop(table);
}
