//! Configuration types for netalert
//!
//! This module defines the client/engine settings and the desired-state
//! configuration for the two managed entities (alert, domain alert).

use crate::dispatch::DEFAULT_INTERVAL_SECS;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;

/// Default base URL of the alert API
pub const DEFAULT_BASE_URL: &str = "https://api.shodan.io";

/// Main netalert configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetalertConfig {
    /// Remote API client settings
    pub client: ClientConfig,

    /// Optional engine settings
    #[serde(default)]
    pub engine: EngineConfig,
}

impl NetalertConfig {
    pub fn new(client: ClientConfig) -> Self {
        Self {
            client,
            engine: EngineConfig::default(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.client.validate()?;
        self.engine.validate()
    }
}

/// Remote API client configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Secret API key
    /// ⚠️ NEVER log this value
    pub api_key: String,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Minimum seconds between requests. Unset means the conservative
    /// default; values of zero or below are floored to one second.
    #[serde(default)]
    pub rate_limit: Option<i64>,

    /// Per-request timeout applied by the transport
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

// Custom Debug implementation that hides the API key
impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_key", &"<REDACTED>")
            .field("base_url", &self.base_url)
            .field("rate_limit", &self.rate_limit)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl ClientConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: default_base_url(),
            rate_limit: None,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_rate_limit(mut self, seconds: i64) -> Self {
        self.rate_limit = Some(seconds);
        self
    }

    pub fn with_request_timeout_secs(mut self, seconds: u64) -> Self {
        self.request_timeout_secs = seconds;
        self
    }

    /// Effective throttle interval in seconds (default applied, floored at 1)
    pub fn rate_limit_secs(&self) -> i64 {
        self.rate_limit.unwrap_or(DEFAULT_INTERVAL_SECS).max(1)
    }

    /// Read the configuration from environment variables
    ///
    /// - `SHODAN_API_KEY` (required)
    /// - `SHODAN_BASE_URL`
    /// - `SHODAN_RATE_LIMIT`: seconds between requests
    /// - `SHODAN_TIMEOUT_SECS`
    pub fn from_env() -> Result<Self, crate::Error> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`ClientConfig::from_env`] with a custom variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, crate::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("SHODAN_API_KEY")
            .filter(|key| !key.is_empty())
            .ok_or_else(|| crate::Error::config("SHODAN_API_KEY is not set"))?;

        let mut config = Self::new(api_key);

        if let Some(base_url) = lookup("SHODAN_BASE_URL") {
            config.base_url = base_url;
        }

        if let Some(raw) = lookup("SHODAN_RATE_LIMIT") {
            let seconds = raw.trim().parse::<i64>().map_err(|_| {
                crate::Error::config(format!("SHODAN_RATE_LIMIT must be an integer, got {:?}", raw))
            })?;
            config.rate_limit = Some(seconds);
        }

        if let Some(raw) = lookup("SHODAN_TIMEOUT_SECS") {
            config.request_timeout_secs = raw.trim().parse::<u64>().map_err(|_| {
                crate::Error::config(format!(
                    "SHODAN_TIMEOUT_SECS must be a positive integer, got {:?}",
                    raw
                ))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate the client configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.api_key.is_empty() {
            return Err(crate::Error::config("API key cannot be empty"));
        }
        if !(self.base_url.starts_with("https://") || self.base_url.starts_with("http://")) {
            return Err(crate::Error::config(format!(
                "base URL must be http(s), got {:?}",
                self.base_url
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(crate::Error::config("request timeout must be > 0"));
        }
        Ok(())
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(String::new())
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Capacity of the reconciliation event channel
    ///
    /// When full, new events are dropped (with a warning log). Reconciliation
    /// never waits on a slow event consumer.
    ///
    /// Default: 1000 events
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("event channel capacity must be > 0"));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_event_channel_capacity() -> usize {
    1000
}

/// Desired state of a network alert
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertConfig {
    pub name: String,

    /// IP addresses or CIDR blocks to monitor
    pub networks: Vec<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub tags: Vec<String>,

    /// Defaults to true on create
    #[serde(default)]
    pub enabled: Option<bool>,

    #[serde(default)]
    pub triggers: Vec<String>,

    #[serde(default)]
    pub notifiers: Vec<String>,

    /// Slack notifier ids, attached like any other notifier
    #[serde(default)]
    pub slack_notifications: Vec<String>,
}

impl AlertConfig {
    pub fn new<I, S>(name: impl Into<String>, networks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            networks: networks.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    pub fn with_triggers(mut self, triggers: Vec<String>) -> Self {
        self.triggers = triggers;
        self
    }

    pub fn with_notifiers(mut self, notifiers: Vec<String>) -> Self {
        self.notifiers = notifiers;
        self
    }

    pub fn with_slack_notifications(mut self, slack_notifications: Vec<String>) -> Self {
        self.slack_notifications = slack_notifications;
        self
    }

    /// Validate the alert configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.name.trim().is_empty() {
            return Err(crate::Error::invalid_input("alert name cannot be empty"));
        }
        if self.networks.is_empty() {
            return Err(crate::Error::invalid_input(format!(
                "alert {} must monitor at least one network",
                self.name
            )));
        }
        for network in &self.networks {
            validate_network(network)?;
        }
        Ok(())
    }
}

/// Desired state of a domain-backed alert
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainAlertConfig {
    /// Domain whose resolved addresses are monitored
    pub domain: String,

    /// Optional custom name, folded into the remote alert name
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub enabled: Option<bool>,

    #[serde(default)]
    pub triggers: Vec<String>,

    #[serde(default)]
    pub notifiers: Vec<String>,

    #[serde(default)]
    pub slack_notifications: Vec<String>,
}

impl DomainAlertConfig {
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            ..Self::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    pub fn with_triggers(mut self, triggers: Vec<String>) -> Self {
        self.triggers = triggers;
        self
    }

    pub fn with_notifiers(mut self, notifiers: Vec<String>) -> Self {
        self.notifiers = notifiers;
        self
    }

    pub fn with_slack_notifications(mut self, slack_notifications: Vec<String>) -> Self {
        self.slack_notifications = slack_notifications;
        self
    }

    /// Validate the domain alert configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        let domain = self.domain.trim();
        if domain.is_empty() {
            return Err(crate::Error::invalid_input("domain cannot be empty"));
        }
        if domain.len() > 253 || !domain.contains('.') {
            return Err(crate::Error::invalid_input(format!(
                "invalid domain name: {}",
                self.domain
            )));
        }
        Ok(())
    }
}

/// Accepts a bare IP address or a CIDR block
fn validate_network(network: &str) -> Result<(), crate::Error> {
    let invalid = || crate::Error::invalid_input(format!("invalid network: {:?}", network));

    let (address, prefix) = match network.split_once('/') {
        Some((address, prefix)) => (address, Some(prefix)),
        None => (network, None),
    };

    let address: IpAddr = address.parse().map_err(|_| invalid())?;

    if let Some(prefix) = prefix {
        let prefix: u8 = prefix.parse().map_err(|_| invalid())?;
        let max = if address.is_ipv4() { 32 } else { 128 };
        if prefix > max {
            return Err(invalid());
        }
    }

    Ok(())
}
