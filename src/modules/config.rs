use log::debug;
use url::Url;

use crate::types::error::WatchError;

pub const WS_PROVIDER_VAR: &str = "WS_PROVIDER";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Validated `ws://` or `wss://` endpoint of the node.
    pub ws_url: Url,
}

impl Config {
    /// Reads the WebSocket endpoint from `WS_PROVIDER`.
    ///
    /// Fails with `WatchError::Config` when the variable is missing or is not
    /// a `ws`/`wss` URL with a host.
    pub fn from_env() -> Result<Self, WatchError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Config::from_env`] with a custom variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, WatchError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw = lookup(WS_PROVIDER_VAR)
            .ok_or_else(|| WatchError::Config(format!("{WS_PROVIDER_VAR} must be set")))?;
        let ws_url = parse_ws_url(raw.trim())?;
        debug!("Loaded configuration [ws_url: {}]", ws_url);

        Ok(Self { ws_url })
    }
}

fn parse_ws_url(raw: &str) -> Result<Url, WatchError> {
    if raw.is_empty() {
        return Err(WatchError::Config(format!("{WS_PROVIDER_VAR} is empty")));
    }

    let url = Url::parse(raw).map_err(|e| {
        WatchError::Config(format!("{WS_PROVIDER_VAR} is not a valid URL ({e}): {raw}"))
    })?;

    if !matches!(url.scheme(), "ws" | "wss") {
        return Err(WatchError::Config(format!(
            "{WS_PROVIDER_VAR} must be a ws:// or wss:// URL, got {raw}"
        )));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(WatchError::Config(format!(
            "{WS_PROVIDER_VAR} has no host: {raw}"
        )));
    }

    Ok(url)
}
