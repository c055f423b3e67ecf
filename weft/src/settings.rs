//! Typed runtime settings: the recognized configuration options in one
//! struct, constructed once at startup.

use std::time::Duration;

use crate::api::{API_FILE_URL, API_URL};
use crate::types::UpdateType;

/// The recognized options, with their documented defaults.
#[derive(Clone, Debug)]
pub struct Settings {
    /// Waiter machine capacity per hasher.
    pub max_storage_size: usize,
    /// Default waiter lifetime.
    pub base_state_lifetime: Duration,
    /// Update kinds to subscribe to; empty means everything the upstream
    /// sends by default.
    pub allowed_updates: Vec<UpdateType>,
    /// Applied by [`crate::api::Api::from_settings`] and
    /// [`crate::bot::Bot::with_settings`].
    pub api_base_url: String,
    pub api_file_base_url: String,
    /// Per-request transport deadline; consumed when
    /// [`crate::api::Api::from_settings`] builds the reqwest client.
    pub http_timeout: Duration,
    /// Long-poll timeout passed to `getUpdates`, in seconds.
    pub polling_timeout: u64,
    /// How often the sweeper drops expired waiters.
    pub sweep_interval: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_storage_size: 1000,
            base_state_lifetime: Duration::from_secs(7 * 24 * 60 * 60),
            allowed_updates: Vec::new(),
            api_base_url: API_URL.to_string(),
            api_file_base_url: API_FILE_URL.to_string(),
            http_timeout: Duration::from_secs(60),
            polling_timeout: crate::bot::polling::DEFAULT_POLLING_TIMEOUT,
            sweep_interval: Duration::from_secs(60),
        }
    }
}

impl Settings {
    /// Fills the environment from `.env` and the XDG config (existing env
    /// wins), then reads the overrides.
    pub fn load() -> Self {
        let _ = env_config::Loader::new("weft").apply();
        Self::from_env()
    }

    /// Defaults overridden from the environment (`WEFT_MAX_STORAGE_SIZE`,
    /// `WEFT_BASE_STATE_LIFETIME_SECS`, `WEFT_ALLOWED_UPDATES` as a
    /// comma-separated list, `WEFT_API_BASE_URL`, `WEFT_API_FILE_BASE_URL`,
    /// `WEFT_HTTP_TIMEOUT_SECS`). Run an [`env_config::Loader`] first when
    /// these live in `.env` or an XDG config.
    pub fn from_env() -> Self {
        let mut settings = Self::default();
        if let Some(value) = env_parse::<usize>("WEFT_MAX_STORAGE_SIZE") {
            settings.max_storage_size = value;
        }
        if let Some(secs) = env_parse::<u64>("WEFT_BASE_STATE_LIFETIME_SECS") {
            settings.base_state_lifetime = Duration::from_secs(secs);
        }
        if let Ok(list) = std::env::var("WEFT_ALLOWED_UPDATES") {
            settings.allowed_updates = list
                .split(',')
                .filter_map(|name| name.trim().parse().ok())
                .collect();
        }
        if let Ok(url) = std::env::var("WEFT_API_BASE_URL") {
            settings.api_base_url = url;
        }
        if let Ok(url) = std::env::var("WEFT_API_FILE_BASE_URL") {
            settings.api_file_base_url = url;
        }
        if let Some(secs) = env_parse::<u64>("WEFT_HTTP_TIMEOUT_SECS") {
            settings.http_timeout = Duration::from_secs(secs);
        }
        settings
    }
}

fn env_parse<T: std::str::FromStr>(var: &str) -> Option<T> {
    std::env::var(var).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: Defaults match the documented configuration surface.
    #[test]
    fn documented_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.max_storage_size, 1000);
        assert_eq!(settings.base_state_lifetime, Duration::from_secs(604_800));
        assert!(settings.allowed_updates.is_empty());
        assert_eq!(settings.sweep_interval, Duration::from_secs(60));
    }

    /// **Scenario**: Environment overrides are applied and parsed.
    #[test]
    fn env_overrides() {
        std::env::set_var("WEFT_MAX_STORAGE_SIZE", "5");
        std::env::set_var("WEFT_ALLOWED_UPDATES", "message, callback_query");
        let settings = Settings::from_env();
        std::env::remove_var("WEFT_MAX_STORAGE_SIZE");
        std::env::remove_var("WEFT_ALLOWED_UPDATES");

        assert_eq!(settings.max_storage_size, 5);
        assert_eq!(
            settings.allowed_updates,
            vec![UpdateType::Message, UpdateType::CallbackQuery]
        );
    }
}
