//! Azure Resource Manager identity of a virtual network.

use crate::error::{PeeringError, Result};
use regex::Regex;
use serde::{de, Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// Regex for the virtual network prefix of an ARM id. Child segments are allowed.
static VNET_ID_REGEX: OnceLock<Regex> = OnceLock::new();

fn get_vnet_id_regex() -> &'static Regex {
    VNET_ID_REGEX.get_or_init(|| {
        Regex::new(
            r"(?i)^/subscriptions/([^/]+)/resourceGroups/([^/]+)/providers/Microsoft\.Network/virtualNetworks/([^/]+)(?:/.*)?$",
        )
        .expect("Invalid Regex")
    })
}

/// Identity of a virtual network: subscription, resource group and name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId {
    pub subscription_id: String,
    pub resource_group: String,
    pub name: String,
}

impl ResourceId {
    pub fn new(
        subscription_id: impl Into<String>,
        resource_group: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        ResourceId {
            subscription_id: subscription_id.into(),
            resource_group: resource_group.into(),
            name: name.into(),
        }
    }

    /// Parse an ARM id such as
    /// `/subscriptions/{sub}/resourceGroups/{rg}/providers/Microsoft.Network/virtualNetworks/{name}`.
    ///
    /// A peering id (`.../virtualNetworks/{name}/virtualNetworkPeerings/{p}`) yields
    /// the owning network.
    pub fn parse(id: &str) -> Result<ResourceId> {
        let caps = get_vnet_id_regex()
            .captures(id.trim())
            .ok_or_else(|| PeeringError::InvalidResourceId(id.to_string()))?;
        Ok(ResourceId::new(&caps[1], &caps[2], &caps[3]))
    }

    /// Same network, comparing the way ARM does (case-insensitive).
    pub fn same_as(&self, other: &ResourceId) -> bool {
        self.subscription_id.eq_ignore_ascii_case(&other.subscription_id)
            && self.resource_group.eq_ignore_ascii_case(&other.resource_group)
            && self.name.eq_ignore_ascii_case(&other.name)
    }

    pub fn same_subscription(&self, other: &ResourceId) -> bool {
        self.subscription_id.eq_ignore_ascii_case(&other.subscription_id)
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "/subscriptions/{}/resourceGroups/{}/providers/Microsoft.Network/virtualNetworks/{}",
            self.subscription_id, self.resource_group, self.name
        )
    }
}

impl FromStr for ResourceId {
    type Err = PeeringError;

    fn from_str(s: &str) -> Result<Self> {
        ResourceId::parse(s)
    }
}

impl Serialize for ResourceId {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ResourceId {
    fn deserialize<D>(deserializer: D) -> std::result::Result<ResourceId, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        ResourceId::parse(&s).map_err(de::Error::custom)
    }
}
