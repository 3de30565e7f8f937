use std::time::Duration;

use anyhow::{Context, Result};

use crate::push::PushConfig;
use crate::validate::{DEFAULT_NAME_MAX, NameRules};

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_url: String,
    pub push_url: String,
    /// Display name attached to sent messages. A guest name is generated
    /// when unset.
    pub username: Option<String>,
    pub name_rules: NameRules,
    pub reconnect_delay: Duration,
    pub max_reconnect_delay: Duration,
    pub heartbeat: Duration,
}

impl ClientConfig {
    /// Read `PARLOR_*` variables from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_url = lookup("PARLOR_API_URL").unwrap_or_else(|| "http://localhost:5000".into());
        let push_url = lookup("PARLOR_PUSH_URL").unwrap_or_else(|| {
            format!(
                "{}/socket",
                api_url
                    .trim_end_matches('/')
                    .replace("http://", "ws://")
                    .replace("https://", "wss://")
            )
        });
        let username = lookup("PARLOR_USERNAME").filter(|name| !name.trim().is_empty());

        let max_len: usize = lookup("PARLOR_CHANNEL_NAME_MAX")
            .map(|v| v.parse().context("PARLOR_CHANNEL_NAME_MAX must be a number"))
            .transpose()?
            .unwrap_or(DEFAULT_NAME_MAX);
        let reconnect_secs: u64 = lookup("PARLOR_RECONNECT_SECS")
            .map(|v| v.parse().context("PARLOR_RECONNECT_SECS must be a number"))
            .transpose()?
            .unwrap_or(1);
        let heartbeat_secs: u64 = lookup("PARLOR_HEARTBEAT_SECS")
            .map(|v| v.parse().context("PARLOR_HEARTBEAT_SECS must be a number"))
            .transpose()?
            .unwrap_or(15);

        Ok(Self {
            api_url,
            push_url,
            username,
            name_rules: NameRules { max_len },
            reconnect_delay: Duration::from_secs(reconnect_secs.max(1)),
            max_reconnect_delay: Duration::from_secs(30),
            heartbeat: Duration::from_secs(heartbeat_secs.max(1)),
        })
    }

    pub fn push_config(&self) -> PushConfig {
        PushConfig {
            url: self.push_url.clone(),
            reconnect_delay: self.reconnect_delay,
            max_reconnect_delay: self.max_reconnect_delay.max(self.reconnect_delay),
            heartbeat: self.heartbeat,
        }
    }

    /// Configured display name, or a fresh `guest-NNNN`.
    pub fn author(&self) -> String {
        match &self.username {
            Some(name) => name.trim().to_string(),
            None => format!("guest-{:04}", rand::random_range(0..10_000u32)),
        }
    }
}
