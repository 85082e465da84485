//! Service configuration.

use std::time::Duration;

use setforge_bots::BotTimings;
use setforge_engine::GameSettings;
use setforge_session::SessionConfig;
use setforge_store::StoreConfig;
use setforge_tick::CountdownConfig;

use crate::ServiceError;

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Fast cache. `None` keeps room state in-process only.
    pub redis_url: Option<String>,
    pub store: StoreConfig,
    pub countdown: CountdownConfig,
    pub session: SessionConfig,
    pub bots: BotTimings,

    /// Countdown for games started by joining a room nobody configured.
    /// `None` plays until the cards run out.
    pub default_countdown_secs: Option<u64>,

    /// Used when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            redis_url: None,
            store: StoreConfig::default(),
            countdown: CountdownConfig::default(),
            session: SessionConfig::default(),
            bots: BotTimings::default(),
            default_countdown_secs: Some(180),
            log_filter: "info".to_string(),
        }
    }
}

impl ServiceConfig {
    /// Defaults overridden by `SETFORGE_*` environment variables.
    ///
    /// # Errors
    /// [`ServiceError::Config`] if a variable is set but unparsable.
    pub fn from_env() -> Result<Self, ServiceError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`from_env`](Self::from_env), reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ServiceError> {
        let mut config = Self::default();

        if let Some(url) = lookup("SETFORGE_REDIS_URL").filter(|u| !u.trim().is_empty()) {
            config.redis_url = Some(url);
        }
        if let Some(ms) = parse::<u64>(&lookup, "SETFORGE_CACHE_TIMEOUT_MS")? {
            config.store.op_timeout = Duration::from_millis(ms);
        }
        if let Some(raw) = lookup("SETFORGE_COUNTDOWN_SECS") {
            config.default_countdown_secs = match raw.trim() {
                "" | "0" | "off" | "none" => None,
                secs => Some(secs.parse().map_err(|_| {
                    ServiceError::Config(format!("SETFORGE_COUNTDOWN_SECS: `{secs}` is not a number"))
                })?),
            };
        }
        if let Some(secs) = parse::<u64>(&lookup, "SETFORGE_RECONNECT_GRACE_SECS")? {
            config.session.reconnect_grace_secs = secs;
        }
        if let Some(filter) = lookup("SETFORGE_LOG").filter(|f| !f.trim().is_empty()) {
            config.log_filter = filter;
        }

        Ok(config.validated())
    }

    /// Clamp out-of-range values so the config is safe to use.
    pub fn validated(mut self) -> Self {
        self.store = self.store.validated();
        self.countdown = self.countdown.validated();
        self.session = self.session.validated();
        self.bots = self.bots.validated();
        self.default_countdown_secs = self.default_countdown_secs.map(|secs| {
            secs.clamp(GameSettings::MIN_COUNTDOWN_SECS, GameSettings::MAX_COUNTDOWN_SECS)
        });
        self
    }

    /// Settings for a game nobody configured.
    pub fn default_settings(&self) -> GameSettings {
        GameSettings {
            countdown_secs: self.default_countdown_secs,
            ..GameSettings::default()
        }
    }
}

fn parse<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
) -> Result<Option<T>, ServiceError> {
    match lookup(name) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ServiceError::Config(format!("{name}: `{raw}` is not a number"))),
    }
}
