//! Run-time settings.
//!
//! Values come from the environment; `main` loads a `.env` file with dotenv first.

use crate::error::{PeeringError, Result};
use std::str::FromStr;
use std::time::Duration;

/// Base pause unit used when polling Azure.
pub const SLEEP_MSEC: u64 = 500;
/// Default number of state reads before giving up.
pub const POLL_ATTEMPTS: u32 = 30;
/// Subscription used by the in-memory provider when none is configured.
pub const NIL_SUBSCRIPTION: &str = "00000000-0000-0000-0000-000000000000";
pub const DEFAULT_LOCATION: &str = "westus";

/// Which [`crate::provider::NetworkProvider`] the sample runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Memory,
    AzCli,
}

impl FromStr for ProviderKind {
    type Err = PeeringError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" | "mem" => Ok(ProviderKind::Memory),
            "az" | "az-cli" | "azure" => Ok(ProviderKind::AzCli),
            other => Err(PeeringError::Config(format!(
                "PEERING_PROVIDER must be 'memory' or 'az', got '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub provider: ProviderKind,
    /// `None` means the provider's default (the logged-in az subscription).
    pub subscription_id: Option<String>,
    pub location: String,
    /// `None` means a random `rgNEMV####` name.
    pub resource_group: Option<String>,
    pub poll_interval: Duration,
    pub poll_attempts: u32,
    pub keep_resources: bool,
}

impl Settings {
    /// Read settings from the process environment.
    pub fn from_env() -> Result<Settings> {
        Settings::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup`, which maps a variable name to its value.
    pub fn from_lookup<F>(lookup: F) -> Result<Settings>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let provider = match get("PEERING_PROVIDER") {
            Some(v) => v.parse()?,
            None => ProviderKind::Memory,
        };
        let default_poll = match provider {
            ProviderKind::Memory => 0,
            ProviderKind::AzCli => SLEEP_MSEC * 4,
        };
        let poll_msec: u64 = parse_var("PEERING_POLL_MSEC", get("PEERING_POLL_MSEC"), default_poll)?;
        let poll_attempts: u32 =
            parse_var("PEERING_POLL_ATTEMPTS", get("PEERING_POLL_ATTEMPTS"), POLL_ATTEMPTS)?;
        if poll_attempts == 0 {
            return Err(PeeringError::Config(
                "PEERING_POLL_ATTEMPTS must be at least 1".to_string(),
            ));
        }
        let keep_resources = match get("KEEP_RESOURCES") {
            Some(v) => parse_bool("KEEP_RESOURCES", &v)?,
            None => false,
        };

        Ok(Settings {
            provider,
            subscription_id: get("AZURE_SUBSCRIPTION_ID").map(|s| s.trim().to_string()),
            location: get("AZURE_LOCATION").unwrap_or_else(|| DEFAULT_LOCATION.to_string()),
            resource_group: get("AZURE_RESOURCE_GROUP"),
            poll_interval: Duration::from_millis(poll_msec),
            poll_attempts,
            keep_resources,
        })
    }
}

fn parse_var<T: FromStr>(key: &str, value: Option<String>, default: T) -> Result<T> {
    match value {
        Some(v) => v
            .trim()
            .parse()
            .map_err(|_| PeeringError::Config(format!("{key} has invalid value '{v}'"))),
        None => Ok(default),
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(PeeringError::Config(format!(
            "{key} has invalid value '{value}'"
        ))),
    }
}
