//! Virtual network peering data model.
//!
//! A peering between two networks is stored as two independent
//! [`PeeringRecord`]s, one under each network, each pointing at the other.
//! [`PeeringLink`] is a view over such a pair and is never stored.

use super::ResourceId;
use crate::error::{PeeringError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The four independent flags of one side of a peering.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct PeeringOptions {
    /// The remote network's address space is reachable from this network.
    pub allow_virtual_network_access: bool,
    /// Traffic not originating in the remote network may flow through the peering.
    pub allow_forwarded_traffic: bool,
    /// The remote network may use this network's gateway.
    pub allow_gateway_transit: bool,
    /// This network uses the remote network's gateway.
    pub use_remote_gateways: bool,
}

impl Default for PeeringOptions {
    fn default() -> Self {
        PeeringOptions {
            allow_virtual_network_access: true,
            allow_forwarded_traffic: false,
            allow_gateway_transit: false,
            use_remote_gateways: false,
        }
    }
}

impl PeeringOptions {
    pub fn with_access(mut self, allow: bool) -> Self {
        self.allow_virtual_network_access = allow;
        self
    }

    pub fn with_forwarded_traffic(mut self, allow: bool) -> Self {
        self.allow_forwarded_traffic = allow;
        self
    }

    pub fn with_gateway_transit(mut self, allow: bool) -> Self {
        self.allow_gateway_transit = allow;
        self
    }

    pub fn with_remote_gateways(mut self, use_remote: bool) -> Self {
        self.use_remote_gateways = use_remote;
        self
    }

    /// A side cannot both offer its gateway and use the remote one.
    pub fn validate(&self) -> Result<()> {
        if self.allow_gateway_transit && self.use_remote_gateways {
            return Err(PeeringError::InvalidOptions(
                "allowGatewayTransit and useRemoteGateways cannot both be set on one side"
                    .to_string(),
            ));
        }
        Ok(())
    }

    /// Flags in declaration order: access, forwarded traffic, gateway transit, remote gateways.
    pub fn as_flags(&self) -> [bool; 4] {
        [
            self.allow_virtual_network_access,
            self.allow_forwarded_traffic,
            self.allow_gateway_transit,
            self.use_remote_gateways,
        ]
    }
}

impl fmt::Display for PeeringOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "access={} forwarded={} gatewayTransit={} remoteGateways={}",
            self.allow_virtual_network_access,
            self.allow_forwarded_traffic,
            self.allow_gateway_transit,
            self.use_remote_gateways
        )
    }
}

/// Provider-side reconciliation state of one peering record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PeeringState {
    /// Created; the remote side is missing or not yet consistent.
    Initiated,
    /// Both sides exist and point at each other.
    Connected,
    /// The remote side was deleted.
    Disconnected,
    Unknown(String),
}

impl From<&str> for PeeringState {
    fn from(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "initiated" => PeeringState::Initiated,
            "connected" => PeeringState::Connected,
            "disconnected" => PeeringState::Disconnected,
            _ => PeeringState::Unknown(value.to_string()),
        }
    }
}

impl fmt::Display for PeeringState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeeringState::Initiated => write!(f, "Initiated"),
            PeeringState::Connected => write!(f, "Connected"),
            PeeringState::Disconnected => write!(f, "Disconnected"),
            PeeringState::Unknown(s) => write!(f, "{s}"),
        }
    }
}

/// One side of a peering, stored under its owning network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeeringRecord {
    /// Name, unique within the owning network.
    pub name: String,
    /// The network this record is stored under.
    pub network: ResourceId,
    /// The network this record points at. Fixed at creation.
    pub remote_network_id: ResourceId,
    pub options: PeeringOptions,
    pub state: PeeringState,
}

impl PeeringRecord {
    /// `name on network` for log and error messages.
    pub fn label(&self) -> String {
        format!("'{}' on {}", self.name, self.network.name)
    }

    /// The remote network is fixed once the record exists.
    pub fn check_remote(&self, remote_network_id: &ResourceId) -> Result<()> {
        if self.remote_network_id.same_as(remote_network_id) {
            Ok(())
        } else {
            Err(PeeringError::ImmutableFieldViolation(format!(
                "peering {} points at {}, cannot repoint to {}",
                self.label(),
                self.remote_network_id.name,
                remote_network_id.name
            )))
        }
    }
}

impl fmt::Display for PeeringRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {} [{}] {}",
            self.label(),
            self.remote_network_id.name,
            self.state,
            self.options
        )
    }
}

/// Names and options for both sides of a new link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkSpec {
    pub name_on_a: String,
    pub name_on_b: String,
    pub options_a: PeeringOptions,
    pub options_b: PeeringOptions,
}

impl LinkSpec {
    /// Same name and default options on both sides.
    pub fn symmetric(name: impl Into<String>) -> LinkSpec {
        let name = name.into();
        LinkSpec {
            name_on_a: name.clone(),
            name_on_b: name,
            options_a: PeeringOptions::default(),
            options_b: PeeringOptions::default(),
        }
    }

    pub fn with_names(mut self, on_a: impl Into<String>, on_b: impl Into<String>) -> Self {
        self.name_on_a = on_a.into();
        self.name_on_b = on_b.into();
        self
    }

    /// Mirror one option set to both sides.
    pub fn with_options(mut self, options: PeeringOptions) -> Self {
        self.options_a = options;
        self.options_b = options;
        self
    }

    pub fn with_side_options(mut self, a: PeeringOptions, b: PeeringOptions) -> Self {
        self.options_a = a;
        self.options_b = b;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.name_on_a.trim().is_empty() || self.name_on_b.trim().is_empty() {
            return Err(PeeringError::InvalidOptions(
                "peering name must not be empty".to_string(),
            ));
        }
        self.options_a.validate()?;
        self.options_b.validate()?;
        if self.options_a.use_remote_gateways && !self.options_b.allow_gateway_transit {
            return Err(PeeringError::InvalidOptions(
                "side A uses remote gateways but side B does not allow gateway transit".to_string(),
            ));
        }
        if self.options_b.use_remote_gateways && !self.options_a.allow_gateway_transit {
            return Err(PeeringError::InvalidOptions(
                "side B uses remote gateways but side A does not allow gateway transit".to_string(),
            ));
        }
        Ok(())
    }
}

/// Requested change to an existing record. Only the options are mutable;
/// `name` and `remote_network_id` may be given to assert they are unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeeringUpdate {
    pub options: PeeringOptions,
    pub name: Option<String>,
    pub remote_network_id: Option<ResourceId>,
}

impl PeeringUpdate {
    pub fn options(options: PeeringOptions) -> PeeringUpdate {
        PeeringUpdate {
            options,
            name: None,
            remote_network_id: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_remote_network(mut self, remote: ResourceId) -> Self {
        self.remote_network_id = Some(remote);
        self
    }

    /// Fail if the update would rename or repoint `record`.
    pub fn check_immutable(&self, record: &PeeringRecord) -> Result<()> {
        if let Some(name) = &self.name {
            if name != &record.name {
                return Err(PeeringError::ImmutableFieldViolation(format!(
                    "name of peering {} cannot change to '{name}'",
                    record.label()
                )));
            }
        }
        if let Some(remote) = &self.remote_network_id {
            if !remote.same_as(&record.remote_network_id) {
                return Err(PeeringError::ImmutableFieldViolation(format!(
                    "remote network of peering {} is {}, cannot repoint to {}; delete and recreate instead",
                    record.label(),
                    record.remote_network_id.name,
                    remote.name
                )));
            }
        }
        Ok(())
    }
}

/// Both records of a link. A view, not a stored entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeeringLink {
    pub side_a: PeeringRecord,
    pub side_b: PeeringRecord,
}

impl PeeringLink {
    /// Each side points at the other's owning network.
    pub fn is_consistent(&self) -> bool {
        self.side_a.remote_network_id.same_as(&self.side_b.network)
            && self.side_b.remote_network_id.same_as(&self.side_a.network)
    }

    pub fn is_connected(&self) -> bool {
        self.side_a.state == PeeringState::Connected && self.side_b.state == PeeringState::Connected
    }

    pub fn into_records(self) -> (PeeringRecord, PeeringRecord) {
        (self.side_a, self.side_b)
    }
}
