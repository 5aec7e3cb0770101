//! Poller configuration
//!
//! Defines the receive parameters, polling cadence and shutdown grace period,
//! plus the builder that validates them and assembles a [`Poller`].

use sluice_core::{QueueClient, ReceiveRequest};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{PollerError, Result};
use crate::scheduler::Poller;
use crate::service::{NoopObserver, PollerObserver};

pub const DEFAULT_MAX_MESSAGES: u32 = 10;
pub const DEFAULT_VISIBILITY_TIMEOUT: u32 = 20;
pub const DEFAULT_WAIT_TIME_SECONDS: u32 = 10;
pub const DEFAULT_POLLING_DELAY: Duration = Duration::ZERO;
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_millis(5000);

/// Environment variables read by [`PollerBuilder::from_env`]
pub mod env {
    pub const QUEUE_URL: &str = "SLUICE_QUEUE_URL";
    pub const MAX_MESSAGES: &str = "SLUICE_MAX_MESSAGES";
    pub const ATTRIBUTE_NAMES: &str = "SLUICE_ATTRIBUTE_NAMES";
    pub const VISIBILITY_TIMEOUT: &str = "SLUICE_VISIBILITY_TIMEOUT";
    pub const WAIT_TIME_SECONDS: &str = "SLUICE_WAIT_TIME_SECONDS";
    pub const POLLING_DELAY_MS: &str = "SLUICE_POLLING_DELAY_MS";
    pub const SHUTDOWN_TIMEOUT_MS: &str = "SLUICE_SHUTDOWN_TIMEOUT_MS";
}

/// Poller configuration
///
/// Immutable once the poller is built; read it back with [`Poller::config`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollerConfig {
    /// Queue to consume
    pub queue_url: String,

    /// Maximum number of messages per receive call
    pub max_messages: u32,

    /// Message attribute names requested with each message
    pub attribute_names: Vec<String>,

    /// Seconds a received message stays hidden from other consumers
    pub visibility_timeout: u32,

    /// Long-polling wait in seconds
    pub wait_time_seconds: u32,

    /// Pause between iterations; zero reschedules immediately
    pub polling_delay: Duration,

    /// How long `stop` waits for in-flight messages to drain
    pub shutdown_timeout: Duration,
}

impl PollerConfig {
    /// Creates a new configuration with defaults
    pub fn new(queue_url: impl Into<String>) -> Self {
        Self {
            queue_url: queue_url.into(),
            max_messages: DEFAULT_MAX_MESSAGES,
            attribute_names: vec!["All".to_string()],
            visibility_timeout: DEFAULT_VISIBILITY_TIMEOUT,
            wait_time_seconds: DEFAULT_WAIT_TIME_SECONDS,
            polling_delay: DEFAULT_POLLING_DELAY,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<()> {
        if self.queue_url.trim().is_empty() {
            return Err(PollerError::configuration("queue_url is a required option"));
        }

        if self.max_messages == 0 {
            return Err(PollerError::configuration(
                "invalid max_messages: must be at least 1",
            ));
        }

        Ok(())
    }

    pub(crate) fn receive_request(&self) -> ReceiveRequest {
        ReceiveRequest {
            queue_url: self.queue_url.clone(),
            max_messages: self.max_messages,
            attribute_names: self.attribute_names.clone(),
            visibility_timeout: self.visibility_timeout,
            wait_time_seconds: self.wait_time_seconds,
        }
    }
}

/// Builder for [`Poller`]
///
/// Nothing is spawned and no I/O happens until [`Poller::start`].
pub struct PollerBuilder {
    queue_url: Option<String>,
    client: Option<Arc<dyn QueueClient>>,
    observer: Arc<dyn PollerObserver>,
    max_messages: u32,
    attribute_names: Vec<String>,
    visibility_timeout: u32,
    wait_time_seconds: u32,
    polling_delay: Duration,
    shutdown_timeout: Duration,
    /// First unparseable environment variable, reported at `config`/`build`
    env_error: Option<String>,
}

impl Default for PollerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PollerBuilder {
    pub fn new() -> Self {
        Self {
            queue_url: None,
            client: None,
            observer: Arc::new(NoopObserver),
            max_messages: DEFAULT_MAX_MESSAGES,
            attribute_names: vec!["All".to_string()],
            visibility_timeout: DEFAULT_VISIBILITY_TIMEOUT,
            wait_time_seconds: DEFAULT_WAIT_TIME_SECONDS,
            polling_delay: DEFAULT_POLLING_DELAY,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            env_error: None,
        }
    }

    /// Creates a builder from environment variables
    ///
    /// Expected environment variables:
    /// - SLUICE_QUEUE_URL (optional here, required at `build`)
    /// - SLUICE_MAX_MESSAGES (optional, default: 10)
    /// - SLUICE_ATTRIBUTE_NAMES (optional, comma separated, default: All)
    /// - SLUICE_VISIBILITY_TIMEOUT (optional, seconds, default: 20)
    /// - SLUICE_WAIT_TIME_SECONDS (optional, seconds, default: 10)
    /// - SLUICE_POLLING_DELAY_MS (optional, default: 0)
    /// - SLUICE_SHUTDOWN_TIMEOUT_MS (optional, default: 5000)
    ///
    /// Unlike a missing variable, one that is set but not an integer fails
    /// the later `config`/`build`, after the queue url check.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = Self::new();

        if let Some(queue_url) = lookup(env::QUEUE_URL) {
            builder.queue_url = Some(queue_url);
        }

        if let Some(value) =
            builder.defer(parse_integer(&lookup, env::MAX_MESSAGES, "max_messages"))
        {
            builder.max_messages = value;
        }

        if let Some(names) = lookup(env::ATTRIBUTE_NAMES) {
            builder.attribute_names = names
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(String::from)
                .collect();
        }

        if let Some(value) =
            builder.defer(parse_integer(&lookup, env::VISIBILITY_TIMEOUT, "visibility_timeout"))
        {
            builder.visibility_timeout = value;
        }

        if let Some(value) =
            builder.defer(parse_integer(&lookup, env::WAIT_TIME_SECONDS, "wait_time_seconds"))
        {
            builder.wait_time_seconds = value;
        }

        if let Some(value) =
            builder.defer(parse_integer::<u64, _>(&lookup, env::POLLING_DELAY_MS, "polling_delay"))
        {
            builder.polling_delay = Duration::from_millis(value);
        }

        if let Some(value) = builder.defer(parse_integer::<u64, _>(
            &lookup,
            env::SHUTDOWN_TIMEOUT_MS,
            "shutdown_timeout",
        )) {
            builder.shutdown_timeout = Duration::from_millis(value);
        }

        builder
    }

    /// Keeps the first parse failure for `config` to report
    fn defer<T>(&mut self, parsed: std::result::Result<Option<T>, String>) -> Option<T> {
        match parsed {
            Ok(value) => value,
            Err(message) => {
                self.env_error.get_or_insert(message);
                None
            }
        }
    }

    pub fn queue_url(mut self, queue_url: impl Into<String>) -> Self {
        self.queue_url = Some(queue_url.into());
        self
    }

    pub fn client(mut self, client: Arc<dyn QueueClient>) -> Self {
        self.client = Some(client);
        self
    }

    /// Attaches an observer for lifecycle events
    pub fn observer(mut self, observer: impl PollerObserver + 'static) -> Self {
        self.observer = Arc::new(observer);
        self
    }

    pub fn max_messages(mut self, max_messages: u32) -> Self {
        self.max_messages = max_messages;
        self
    }

    pub fn attribute_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attribute_names = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn visibility_timeout(mut self, seconds: u32) -> Self {
        self.visibility_timeout = seconds;
        self
    }

    pub fn wait_time_seconds(mut self, seconds: u32) -> Self {
        self.wait_time_seconds = seconds;
        self
    }

    pub fn polling_delay(mut self, delay: Duration) -> Self {
        self.polling_delay = delay;
        self
    }

    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Resolves and validates the configuration without requiring a client
    ///
    /// Fails on a missing queue url, then on an unparseable environment
    /// variable or an out-of-range option.
    pub fn config(&self) -> Result<PollerConfig> {
        let queue_url = self.require_queue_url()?;

        if let Some(message) = &self.env_error {
            return Err(PollerError::configuration(message.clone()));
        }

        let config = PollerConfig {
            queue_url,
            max_messages: self.max_messages,
            attribute_names: self.attribute_names.clone(),
            visibility_timeout: self.visibility_timeout,
            wait_time_seconds: self.wait_time_seconds,
            polling_delay: self.polling_delay,
            shutdown_timeout: self.shutdown_timeout,
        };
        config.validate()?;

        Ok(config)
    }

    /// Validates the options and builds the poller
    ///
    /// Checks run in order: queue url, client, numeric options.
    pub fn build(self) -> Result<Poller> {
        self.require_queue_url()?;

        let client = self
            .client
            .clone()
            .ok_or_else(|| PollerError::configuration("client is a required option"))?;

        let config = self.config()?;

        Ok(Poller::new(config, client, self.observer))
    }

    fn require_queue_url(&self) -> Result<String> {
        self.queue_url
            .clone()
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| PollerError::configuration("queue_url is a required option"))
    }
}

fn parse_integer<T, F>(lookup: &F, key: &str, field: &str) -> std::result::Result<Option<T>, String>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| format!("invalid {}: expected an integer, got {:?}", field, raw)),
    }
}
