//! Configuration for the notification engine.

use std::{path::Path, time::Duration};

use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::{
    client::ClientConfig,
    messaging::{MessagingSettings, DEFAULT_ADDRESS_PREFIX, DEFAULT_API_BASE},
    retry::RetryPolicy,
    webhook::WebhookSettings,
};

const CONFIG_FILE: &str = "beacon.toml";

const ENV_PREFIX: &str = "BEACON_";

/// Engine configuration with defaults, file, and environment overrides.
///
/// Configuration is loaded in priority order:
/// 1. Environment variables prefixed with `BEACON_` (highest priority)
/// 2. Configuration file (`beacon.toml`)
/// 3. Built-in defaults (lowest priority)
///
/// Empty strings count as unset, so `BEACON_WEBHOOK_URL=` disables the
/// webhook channel just like leaving the variable out.
///
/// # Example
///
/// ```no_run
/// use beacon_delivery::Config;
///
/// let config = Config::load().expect("Failed to load configuration");
/// println!("notifications enabled: {}", config.notifications_enabled());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    // Webhook
    /// Automation webhook endpoint.
    ///
    /// Environment variable: `BEACON_WEBHOOK_URL`
    #[serde(default)]
    pub webhook_url: Option<String>,
    /// Shared secret sent as `x-api-key` and used to sign bodies.
    ///
    /// Environment variable: `BEACON_WEBHOOK_API_KEY`
    #[serde(default)]
    pub webhook_api_key: Option<String>,

    // Messaging
    /// Provider account identifier.
    ///
    /// Environment variable: `BEACON_MESSAGING_ACCOUNT_SID`
    #[serde(default)]
    pub messaging_account_sid: Option<String>,
    /// Provider auth token.
    ///
    /// Environment variable: `BEACON_MESSAGING_AUTH_TOKEN`
    #[serde(default)]
    pub messaging_auth_token: Option<String>,
    /// Source address.
    ///
    /// Environment variable: `BEACON_MESSAGING_FROM`
    #[serde(default)]
    pub messaging_from: Option<String>,
    /// Destination used when a notification names none.
    ///
    /// Environment variable: `BEACON_MESSAGING_TO`
    #[serde(default)]
    pub messaging_to: Option<String>,
    /// Provider API root.
    ///
    /// Environment variable: `BEACON_MESSAGING_API_BASE`
    #[serde(default = "default_messaging_api_base")]
    pub messaging_api_base: String,
    /// Network prefix for addresses; empty disables prefixing.
    ///
    /// Environment variable: `BEACON_MESSAGING_ADDRESS_PREFIX`
    #[serde(default = "default_address_prefix")]
    pub messaging_address_prefix: String,

    // General
    /// Forces notifications on even without credentials.
    ///
    /// Environment variable: `BEACON_NOTIFICATIONS_ENABLED`
    #[serde(default)]
    pub notifications_enabled: bool,
    /// Dashboard root used to build ticket links.
    ///
    /// Environment variable: `BEACON_DASHBOARD_BASE_URL`
    #[serde(default = "default_dashboard_base_url")]
    pub dashboard_base_url: String,

    // Retry
    /// Attempts per channel, including the first.
    ///
    /// Environment variable: `BEACON_RETRY_MAX_ATTEMPTS`
    #[serde(default = "default_retry_max_attempts")]
    pub retry_max_attempts: u32,
    /// Delay after the first failed attempt in milliseconds.
    ///
    /// Environment variable: `BEACON_RETRY_BASE_DELAY_MS`
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,

    // Client
    /// Per-request HTTP timeout in seconds.
    ///
    /// Environment variable: `BEACON_DELIVERY_TIMEOUT_SECONDS`
    #[serde(default = "default_delivery_timeout")]
    pub delivery_timeout_seconds: u64,

    // Logging
    /// Log filter used when `RUST_LOG` is not set.
    ///
    /// Environment variable: `BEACON_RUST_LOG`
    #[serde(default = "default_log_level")]
    pub rust_log: String,
}

impl Config {
    /// Loads configuration from defaults, `beacon.toml`, and `BEACON_*`
    /// environment variables.
    pub fn load() -> Result<Self> {
        Self::load_from(CONFIG_FILE)
    }

    /// Like [`Config::load`] but reads the given TOML file. A missing file
    /// is not an error.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let figment = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX));

        let config: Self = figment.extract().context("Failed to load configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Whether notifications go out at all: the explicit flag, or any
    /// channel credential being present.
    pub fn notifications_enabled(&self) -> bool {
        self.notifications_enabled
            || [
                &self.webhook_url,
                &self.webhook_api_key,
                &self.messaging_account_sid,
                &self.messaging_auth_token,
            ]
            .into_iter()
            .any(|value| non_empty(value).is_some())
    }

    /// Webhook settings, or `None` when no URL is configured.
    pub fn webhook_settings(&self) -> Option<WebhookSettings> {
        let url = non_empty(&self.webhook_url)?;
        Some(WebhookSettings {
            url: url.to_string(),
            api_key: non_empty(&self.webhook_api_key).map(str::to_string),
        })
    }

    /// Messaging settings, or `None` unless account, token, and source
    /// address are all configured.
    pub fn messaging_settings(&self) -> Option<MessagingSettings> {
        Some(MessagingSettings {
            api_base: self.messaging_api_base.trim().to_string(),
            account_sid: non_empty(&self.messaging_account_sid)?.to_string(),
            auth_token: non_empty(&self.messaging_auth_token)?.to_string(),
            from: non_empty(&self.messaging_from)?.to_string(),
            default_to: non_empty(&self.messaging_to).map(str::to_string),
            address_prefix: self.messaging_address_prefix.trim().to_string(),
        })
    }

    /// Convert to retry policy.
    pub fn to_retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry_max_attempts, Duration::from_millis(self.retry_base_delay_ms))
    }

    /// Convert to client configuration.
    pub fn to_client_config(&self) -> ClientConfig {
        ClientConfig {
            timeout: Duration::from_secs(self.delivery_timeout_seconds),
            ..ClientConfig::default()
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        if self.retry_max_attempts == 0 {
            anyhow::bail!("retry_max_attempts must be greater than 0");
        }

        if self.delivery_timeout_seconds == 0 {
            anyhow::bail!("delivery_timeout_seconds must be greater than 0");
        }

        if let Some(url) = non_empty(&self.webhook_url) {
            if !is_http_url(url) {
                anyhow::bail!("webhook_url must start with http:// or https://");
            }
        }

        if !is_http_url(self.messaging_api_base.trim()) {
            anyhow::bail!("messaging_api_base must start with http:// or https://");
        }

        if self.dashboard_base_url.trim().is_empty() {
            anyhow::bail!("dashboard_base_url must not be empty");
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            webhook_url: None,
            webhook_api_key: None,
            messaging_account_sid: None,
            messaging_auth_token: None,
            messaging_from: None,
            messaging_to: None,
            messaging_api_base: default_messaging_api_base(),
            messaging_address_prefix: default_address_prefix(),
            notifications_enabled: false,
            dashboard_base_url: default_dashboard_base_url(),
            retry_max_attempts: default_retry_max_attempts(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            delivery_timeout_seconds: default_delivery_timeout(),
            rust_log: default_log_level(),
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

fn default_messaging_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_address_prefix() -> String {
    DEFAULT_ADDRESS_PREFIX.to_string()
}

fn default_dashboard_base_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_retry_max_attempts() -> u32 {
    crate::retry::DEFAULT_MAX_ATTEMPTS
}

fn default_retry_base_delay_ms() -> u64 {
    1000
}

fn default_delivery_timeout() -> u64 {
    crate::DEFAULT_TIMEOUT_SECONDS
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, env, sync::Mutex};

    use super::*;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const MISSING_FILE: &str = "does-not-exist/beacon.toml";

    struct TestEnvGuard {
        _lock: std::sync::MutexGuard<'static, ()>,
        vars: Vec<String>,
        originals: HashMap<String, Option<String>>,
    }

    impl TestEnvGuard {
        fn new() -> Self {
            let lock = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            Self { _lock: lock, vars: Vec::new(), originals: HashMap::new() }
        }

        fn set_var(&mut self, key: &str, value: &str) {
            if !self.vars.contains(&key.to_string()) {
                self.originals.insert(key.to_string(), env::var(key).ok());
                self.vars.push(key.to_string());
            }
            env::set_var(key, value);
        }
    }

    impl Drop for TestEnvGuard {
        fn drop(&mut self) {
            for var in &self.vars {
                match self.originals.get(var) {
                    Some(Some(value)) => env::set_var(var, value),
                    Some(None) => env::remove_var(var),
                    None => {},
                }
            }
        }
    }

    #[test]
    fn defaults_are_valid_and_disabled() {
        let config = Config::default();

        assert!(config.validate().is_ok());
        assert!(!config.notifications_enabled());
        assert_eq!(config.webhook_settings(), None);
        assert_eq!(config.messaging_settings(), None);
        assert_eq!(config.to_retry_policy(), RetryPolicy::default());
        assert_eq!(config.to_client_config().timeout, Duration::from_secs(10));
    }

    #[test]
    fn env_overrides_defaults() {
        let mut guard = TestEnvGuard::new();
        guard.set_var("BEACON_WEBHOOK_URL", "https://automation.example.com/hook");
        guard.set_var("BEACON_WEBHOOK_API_KEY", "topsecret");
        guard.set_var("BEACON_RETRY_MAX_ATTEMPTS", "5");
        guard.set_var("BEACON_RETRY_BASE_DELAY_MS", "250");

        let config = Config::load_from(MISSING_FILE).expect("config should load");

        assert!(config.notifications_enabled());
        assert_eq!(
            config.webhook_settings(),
            Some(WebhookSettings {
                url: "https://automation.example.com/hook".to_string(),
                api_key: Some("topsecret".to_string()),
            })
        );
        assert_eq!(config.to_retry_policy(), RetryPolicy::new(5, Duration::from_millis(250)));
    }

    #[test]
    fn file_values_are_layered_under_env() {
        let mut guard = TestEnvGuard::new();
        guard.set_var("BEACON_MESSAGING_AUTH_TOKEN", "from-env");

        let path = env::temp_dir().join(format!("beacon-config-{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(
            &path,
            r#"
messaging_account_sid = "AC-file"
messaging_auth_token = "from-file"
messaging_from = "whatsapp:+15550000"
dashboard_base_url = "https://support.example.com/"
"#,
        )
        .unwrap();

        let config = Config::load_from(&path).expect("config should load");
        std::fs::remove_file(&path).ok();

        let settings = config.messaging_settings().expect("messaging should be enabled");
        assert_eq!(settings.account_sid, "AC-file");
        assert_eq!(settings.auth_token, "from-env");
        assert_eq!(settings.default_to, None);
        assert_eq!(settings.address_prefix, "whatsapp:");
        assert_eq!(config.dashboard_base_url, "https://support.example.com/");
    }

    #[test]
    fn empty_values_count_as_unset() {
        let config = Config {
            webhook_url: Some("   ".to_string()),
            messaging_account_sid: Some(String::new()),
            messaging_auth_token: Some("token".to_string()),
            messaging_from: Some("whatsapp:+15550000".to_string()),
            ..Config::default()
        };

        assert_eq!(config.webhook_settings(), None);
        assert_eq!(config.messaging_settings(), None);
        assert!(config.notifications_enabled(), "auth token alone enables notifications");
    }

    #[test]
    fn explicit_flag_enables_without_credentials() {
        let config = Config { notifications_enabled: true, ..Config::default() };
        assert!(config.notifications_enabled());
    }

    #[test]
    fn validation_rejects_bad_values() {
        let zero_attempts = Config { retry_max_attempts: 0, ..Config::default() };
        assert!(zero_attempts.validate().is_err());

        let zero_timeout = Config { delivery_timeout_seconds: 0, ..Config::default() };
        assert!(zero_timeout.validate().is_err());

        let bad_url = Config { webhook_url: Some("ftp://example.com".to_string()), ..Config::default() };
        let error = bad_url.validate().unwrap_err();
        assert!(error.to_string().contains("webhook_url"));
    }

    #[test]
    fn invalid_env_value_fails_to_load() {
        let mut guard = TestEnvGuard::new();
        guard.set_var("BEACON_RETRY_MAX_ATTEMPTS", "0");

        assert!(Config::load_from(MISSING_FILE).is_err());
    }
}
