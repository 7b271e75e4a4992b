use anyhow::Context;
use mediary_runtime::ControllerConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

pub const ENV_HOST: &str = "MEDIARY_DEBUG_HOST";
pub const ENV_COMMAND_PORT: &str = "MEDIARY_DEBUG_COMMAND_PORT";
pub const ENV_EVENT_PORT: &str = "MEDIARY_DEBUG_EVENT_PORT";
pub const ENV_SUSPEND_ON_START: &str = "MEDIARY_DEBUG_SUSPEND_ON_START";
pub const ENV_SUSPEND_TIMEOUT_SECS: &str = "MEDIARY_DEBUG_SUSPEND_TIMEOUT_SECS";

/// Settings of the debug server.
///
/// Resolved from defaults, then an optional TOML file, then `MEDIARY_DEBUG_*`
/// environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    pub host: String,
    pub command_port: u16,
    pub event_port: u16,
    pub suspend_on_start: bool,
    pub suspend_timeout_secs: Option<u64>,
    pub event_buffer: usize,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            command_port: 9005,
            event_port: 9006,
            suspend_on_start: true,
            suspend_timeout_secs: None,
            event_buffer: 256,
        }
    }
}

impl DebugConfig {
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading debug config {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("parsing debug config {}", path.display()))
    }

    /// Full resolution: file (if any) and then the process environment.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_from(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Overrides fields from `lookup`. Unparsable values are logged and skipped.
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup(ENV_HOST) {
            self.host = host;
        }
        override_parsed(&lookup, ENV_COMMAND_PORT, &mut self.command_port);
        override_parsed(&lookup, ENV_EVENT_PORT, &mut self.event_port);
        override_parsed(&lookup, ENV_SUSPEND_ON_START, &mut self.suspend_on_start);

        let mut timeout = 0u64;
        if override_parsed(&lookup, ENV_SUSPEND_TIMEOUT_SECS, &mut timeout) {
            self.suspend_timeout_secs = (timeout > 0).then_some(timeout);
        }
    }

    pub fn command_addr(&self) -> String {
        format!("{}:{}", self.host, self.command_port)
    }

    pub fn event_addr(&self) -> String {
        format!("{}:{}", self.host, self.event_port)
    }

    pub fn controller_config(&self) -> ControllerConfig {
        ControllerConfig {
            suspend_on_start: self.suspend_on_start,
            suspend_timeout: self.suspend_timeout_secs.map(Duration::from_secs),
        }
    }
}

fn override_parsed<F, T>(lookup: &F, key: &str, slot: &mut T) -> bool
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    let Some(raw) = lookup(key) else {
        return false;
    };
    match raw.trim().parse() {
        Ok(value) => {
            *slot = value;
            true
        }
        Err(_) => {
            tracing::warn!("Ignoring invalid {}={:?}", key, raw);
            false
        }
    }
}
