use std::{env, fmt::Display, net::SocketAddr, path::PathBuf, str::FromStr, time::Duration};

use tracing::{info, warn};

pub const DEFAULT_SEARCH_URL: &str = "http://webhose.io/filterWebContent";
pub const DEFAULT_KEY_PATH: &str = "search.key";

/// Two weeks, the usual session cookie age.
const DEFAULT_SESSION_IDLE_SECS: u64 = 60 * 60 * 24 * 14;

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub search_url: String,
    pub search_key_path: PathBuf,
    pub search_timeout: Option<Duration>,
    pub session_idle: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
            search_url: DEFAULT_SEARCH_URL.to_string(),
            search_key_path: PathBuf::from(DEFAULT_KEY_PATH),
            search_timeout: None,
            session_idle: Duration::from_secs(DEFAULT_SESSION_IDLE_SECS),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from an arbitrary variable source; unset or
    /// unparsable values keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            addr: try_load(&lookup, "RANGO_ADDR", defaults.addr),
            search_url: lookup("WEBHOSE_URL").unwrap_or(defaults.search_url),
            search_key_path: lookup("SEARCH_KEY_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.search_key_path),
            search_timeout: lookup("SEARCH_TIMEOUT_SECS")
                .and_then(|raw| parse_or_warn::<u64>("SEARCH_TIMEOUT_SECS", &raw))
                .map(Duration::from_secs),
            session_idle: Duration::from_secs(try_load(
                &lookup,
                "SESSION_IDLE_SECS",
                DEFAULT_SESSION_IDLE_SECS,
            )),
        }
    }
}

fn try_load<T: FromStr + Display>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T::Err: Display,
{
    match lookup(key) {
        Some(raw) => parse_or_warn(key, &raw).unwrap_or(default),
        None => {
            info!("{key} not set, using default: {default}");
            default
        }
    }
}

fn parse_or_warn<T: FromStr>(key: &str, raw: &str) -> Option<T>
where
    T::Err: Display,
{
    raw.trim()
        .parse()
        .map_err(|e| {
            warn!("Invalid {key} value {raw:?}: {e}");
        })
        .ok()
}
