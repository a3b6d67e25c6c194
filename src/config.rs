use std::time::Duration;

use figment::{
    providers::{Env, Format, Json, Serialized},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Settings for what is requested from the infoscreen and how the service runs.
///
/// Loaded from defaults, then `infoportal.json`, then `INFOPORTAL_*` environment
/// variables, later sources winning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Days of substitutions requested from the infoscreen.
    pub days: u32,
    /// Whether the page carries a news column after the day columns.
    pub show_news: bool,
    /// Minutes before cached data counts as stale.
    pub refresh_interval: u64,
    /// Minutes between background refresh sweeps, at least one.
    pub sweep_interval: u64,
    /// Seconds before an upstream request is abandoned.
    pub fetch_timeout: u64,
    pub cache_capacity: usize,
    pub base_url: String,
    pub host: String,
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            days: 3,
            show_news: true,
            refresh_interval: 5,
            sweep_interval: 5,
            fetch_timeout: 10,
            cache_capacity: 10,
            base_url: "https://schule-infoportal.de/infoscreen/".to_owned(),
            host: "127.0.0.1".to_owned(),
            port: 3000,
        }
    }
}

impl Config {
    pub const FILE: &'static str = "infoportal.json";
    pub const ENV_PREFIX: &'static str = "INFOPORTAL_";

    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(Self::default()))
            .merge(Json::file(Self::FILE))
            .merge(Env::prefixed(Self::ENV_PREFIX))
    }

    pub fn load() -> crate::Result<Self> {
        if let Err(e) = dotenvy::dotenv() {
            log::debug!("No .env file loaded: {e}");
        }
        Ok(Self::figment().extract()?)
    }

    #[must_use]
    pub fn refresh_interval(&self) -> chrono::Duration {
        i64::try_from(self.refresh_interval)
            .ok()
            .and_then(chrono::Duration::try_minutes)
            .unwrap_or(chrono::Duration::MAX)
    }

    #[must_use]
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval.max(1).saturating_mul(60))
    }

    #[must_use]
    pub const fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout)
    }
}
