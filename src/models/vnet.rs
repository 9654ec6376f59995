//! Azure Virtual Network (VNet) data model.

use super::{first_overlap, Ipv4, ResourceId, Subnet};
use crate::error::{PeeringError, Result};
use itertools::Itertools;
use std::collections::HashSet;
use std::fmt;

/// An Azure Virtual Network with its address space and subnets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualNetwork {
    /// Identity of the virtual network.
    pub id: ResourceId,
    /// Azure region location.
    pub location: String,
    /// CIDR blocks of the virtual network.
    pub address_space: Vec<Ipv4>,
    /// Subnets in creation order.
    pub subnets: Vec<Subnet>,
}

impl VirtualNetwork {
    /// Start a network definition with an empty address space.
    pub fn define(id: ResourceId, location: impl Into<String>) -> VirtualNetwork {
        VirtualNetwork {
            id,
            location: location.into(),
            address_space: vec![],
            subnets: vec![],
        }
    }

    pub fn with_address_space(mut self, cidr: &str) -> Result<Self> {
        self.address_space.push(Ipv4::new(cidr)?);
        Ok(self)
    }

    pub fn with_subnet(mut self, name: &str, cidr: &str) -> Result<Self> {
        self.subnets.push(Subnet::new(name, Ipv4::new(cidr)?));
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.id.name
    }

    /// Check the address space and subnet layout.
    pub fn validate(&self) -> Result<()> {
        let name = self.name();
        if self.address_space.is_empty() {
            return Err(PeeringError::InvalidNetwork(format!(
                "{name}: address space is empty"
            )));
        }
        for cidr in self.address_space.iter().chain(self.subnets.iter().map(|s| &s.cidr)) {
            if !cidr.is_aligned() {
                return Err(PeeringError::InvalidCidr(format!(
                    "{name}: {cidr} has host bits set, expected {}/{}",
                    cidr.lo(),
                    cidr.mask
                )));
            }
        }
        for (i, a) in self.address_space.iter().enumerate() {
            if let Some(b) = self.address_space[i + 1..].iter().find(|b| a.overlaps(b)) {
                return Err(PeeringError::InvalidNetwork(format!(
                    "{name}: address blocks {a} and {b} overlap"
                )));
            }
        }

        let mut seen = HashSet::new();
        for (i, subnet) in self.subnets.iter().enumerate() {
            if !seen.insert(subnet.name.as_str()) {
                return Err(PeeringError::InvalidNetwork(format!(
                    "{name}: duplicate subnet name '{}'",
                    subnet.name
                )));
            }
            if !self.address_space.iter().any(|block| block.contains(&subnet.cidr)) {
                return Err(PeeringError::InvalidNetwork(format!(
                    "{name}: subnet '{}' {} is outside the address space [{}]",
                    subnet.name,
                    subnet.cidr,
                    self.address_space.iter().join(", ")
                )));
            }
            if let Some(other) = self.subnets[i + 1..]
                .iter()
                .find(|other| subnet.cidr.overlaps(&other.cidr))
            {
                return Err(PeeringError::InvalidNetwork(format!(
                    "{name}: subnets '{}' and '{}' overlap",
                    subnet.name, other.name
                )));
            }
        }
        Ok(())
    }

    /// First pair of overlapping blocks between this network and `other`.
    pub fn overlap_with(&self, other: &VirtualNetwork) -> Option<(Ipv4, Ipv4)> {
        first_overlap(&self.address_space, &other.address_space)
    }
}

impl fmt::Display for VirtualNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] ({} subnets, {})",
            self.name(),
            self.address_space.iter().join(", "),
            self.subnets.len(),
            self.location
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn network_a() -> VirtualNetwork {
        VirtualNetwork::define(ResourceId::new("sub", "rg", "vnetA"), "westus")
            .with_address_space("10.0.0.0/27")
            .unwrap()
            .with_subnet("subnet1", "10.0.0.0/28")
            .unwrap()
            .with_subnet("subnet2", "10.0.0.16/28")
            .unwrap()
    }

    #[test]
    fn test_validate_ok() {
        let vnet = network_a();
        vnet.validate().expect("valid network");
        assert_eq!(vnet.to_string(), "vnetA [10.0.0.0/27] (2 subnets, westus)");
    }

    #[test]
    fn test_validate_empty_space() {
        let vnet = VirtualNetwork::define(ResourceId::new("sub", "rg", "empty"), "westus");
        assert!(matches!(vnet.validate(), Err(PeeringError::InvalidNetwork(_))));
    }

    #[test]
    fn test_validate_subnet_outside() {
        let vnet = network_a().with_subnet("subnet3", "10.0.0.32/28").unwrap();
        let err = vnet.validate().unwrap_err();
        assert!(err.to_string().contains("outside the address space"), "{err}");
    }

    #[test]
    fn test_validate_duplicate_subnet_name() {
        let vnet = VirtualNetwork::define(ResourceId::new("sub", "rg", "v"), "westus")
            .with_address_space("10.0.0.0/24")
            .unwrap()
            .with_subnet("s", "10.0.0.0/28")
            .unwrap()
            .with_subnet("s", "10.0.0.16/28")
            .unwrap();
        let err = vnet.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate subnet name"), "{err}");
    }

    #[test]
    fn test_validate_overlapping_subnets() {
        let vnet = VirtualNetwork::define(ResourceId::new("sub", "rg", "v"), "westus")
            .with_address_space("10.0.0.0/24")
            .unwrap()
            .with_subnet("s1", "10.0.0.0/27")
            .unwrap()
            .with_subnet("s2", "10.0.0.16/28")
            .unwrap();
        let err = vnet.validate().unwrap_err();
        assert!(err.to_string().contains("overlap"), "{err}");
    }

    #[test]
    fn test_validate_unaligned() {
        let vnet = VirtualNetwork::define(ResourceId::new("sub", "rg", "v"), "westus")
            .with_address_space("10.0.0.5/27")
            .unwrap();
        assert!(matches!(vnet.validate(), Err(PeeringError::InvalidCidr(_))));
    }

    #[test]
    fn test_overlap_with() {
        let a = network_a();
        let b = VirtualNetwork::define(ResourceId::new("sub", "rg", "vnetB"), "westus")
            .with_address_space("10.1.0.0/27")
            .unwrap();
        assert_eq!(a.overlap_with(&b), None);

        let c = VirtualNetwork::define(ResourceId::new("sub", "rg", "vnetC"), "westus")
            .with_address_space("10.0.0.0/16")
            .unwrap();
        assert!(a.overlap_with(&c).is_some());
    }
}
