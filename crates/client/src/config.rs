use wsmux_core::config::{required, split_list};
use wsmux_core::ConfigError;
use wsmux_session::SessionSettings;
use wsmux_transport::ReconnectConfig;

/// Channels opened when `WSMUX_CHANNELS` is unset.
pub const DEFAULT_CHANNELS: &str = "list,main,observe,user";

/// Everything the client binary needs to start a session.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the game server, e.g. `http://localhost:8080`.
    pub server_url: String,
    /// Requested channel names, in order. Unknown names are passed through
    /// and skipped by the session manager.
    pub channels: Vec<String>,
    pub session: SessionSettings,
    pub reconnect: ReconnectConfig,
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// | Env Var                    | Required | Default                  |
    /// |----------------------------|----------|--------------------------|
    /// | `WSMUX_SERVER_URL`         | yes      | --                       |
    /// | `WSMUX_CHANNELS`           | no       | `list,main,observe,user` |
    /// | `WSMUX_HEARTBEAT_SECS`     | no       | `200`                    |
    /// | `WSMUX_IDLE_TIMEOUT_SECS`  | no       | `60`                     |
    /// | `WSMUX_RECONNECT_MAX_SECS` | no       | `30`                     |
    pub fn from_env() -> Result<Self, ConfigError> {
        let server_url = required("WSMUX_SERVER_URL")?;
        let channels = std::env::var("WSMUX_CHANNELS").unwrap_or_else(|_| DEFAULT_CHANNELS.into());

        Ok(Self {
            server_url,
            channels: split_list(&channels),
            session: SessionSettings::from_env()?,
            reconnect: ReconnectConfig::from_env()?,
        })
    }
}
