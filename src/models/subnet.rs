//! Azure subnet data model.

use super::Ipv4;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A named subnet owned by a single virtual network.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Subnet {
    /// Name of the subnet, unique within its network.
    pub name: String,
    /// CIDR block of the subnet.
    pub cidr: Ipv4,
}

impl Subnet {
    pub fn new(name: impl Into<String>, cidr: Ipv4) -> Self {
        Subnet {
            name: name.into(),
            cidr,
        }
    }
}

impl fmt::Display for Subnet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.cidr)
    }
}
