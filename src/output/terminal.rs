//! Terminal output for virtual networks and their peerings.

use crate::models::{PeeringRecord, PeeringState, VirtualNetwork};
use colored::Colorize;
use itertools::Itertools;
use std::fmt;

/// A network with its peerings, displayed as an indented block.
pub struct NetworkBlock<'a> {
    pub network: &'a VirtualNetwork,
    pub peerings: &'a [PeeringRecord],
}

impl fmt::Display for NetworkBlock<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let network = self.network;
        writeln!(f, "Virtual network: {}", network.id)?;
        writeln!(f, "\tName: {}", network.name())?;
        writeln!(f, "\tResource group: {}", network.id.resource_group)?;
        writeln!(f, "\tRegion: {}", network.location)?;
        writeln!(
            f,
            "\tAddress spaces: {}",
            network.address_space.iter().join(", ")
        )?;
        writeln!(f, "\tSubnets: {}", network.subnets.len())?;
        for subnet in &network.subnets {
            writeln!(f, "\t\t{:<12} {}", subnet.name, subnet.cidr)?;
        }
        writeln!(f, "\tPeerings: {}", self.peerings.len())?;
        for peering in self.peerings {
            writeln!(
                f,
                "\t\t{:<12} -> {:<16} {:<13} {}",
                peering.name,
                peering.remote_network_id.name,
                format_state(&peering.state),
                peering.options
            )?;
        }
        Ok(())
    }
}

/// Render a network, its subnets and its peerings as an indented block.
pub fn render_virtual_network(network: &VirtualNetwork, peerings: &[PeeringRecord]) -> String {
    NetworkBlock { network, peerings }.to_string()
}

/// Print a network block to stdout.
pub fn print_virtual_network(network: &VirtualNetwork, peerings: &[PeeringRecord]) {
    println!("{}", render_virtual_network(network, peerings));
}

fn format_state(state: &PeeringState) -> String {
    let text = state.to_string();
    match state {
        PeeringState::Connected => text.green().to_string(),
        PeeringState::Initiated => text.yellow().to_string(),
        PeeringState::Disconnected => text.red().to_string(),
        PeeringState::Unknown(_) => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PeeringOptions, ResourceId};

    #[test]
    fn test_render_network_with_peering() {
        colored::control::set_override(false);
        let network = VirtualNetwork::define(ResourceId::new("sub", "rg", "vnetA"), "westus")
            .with_address_space("10.0.0.0/27")
            .unwrap()
            .with_subnet("subnet1", "10.0.0.0/28")
            .unwrap();
        let peering = PeeringRecord {
            name: "peerAB".to_string(),
            network: network.id.clone(),
            remote_network_id: ResourceId::new("sub", "rg", "vnetB"),
            options: PeeringOptions::default(),
            state: PeeringState::Connected,
        };
        let text = render_virtual_network(&network, &[peering]);
        assert!(text.contains("\tAddress spaces: 10.0.0.0/27\n"), "{text}");
        assert!(text.contains("subnet1      10.0.0.0/28"), "{text}");
        assert!(text.contains("\tPeerings: 1\n"), "{text}");
        assert!(text.contains("-> vnetB"), "{text}");
        assert!(text.contains("Connected"), "{text}");
        assert!(text.contains("access=true forwarded=false"), "{text}");
    }

    #[test]
    fn test_render_without_peerings() {
        let network = VirtualNetwork::define(ResourceId::new("sub", "rg", "vnetB"), "westus")
            .with_address_space("10.1.0.0/27")
            .unwrap();
        let text = render_virtual_network(&network, &[]);
        assert!(text.contains("\tPeerings: 0\n"), "{text}");
        assert!(text.contains("\tSubnets: 0\n"), "{text}");
    }

    #[test]
    fn test_network_block_display() {
        let network = VirtualNetwork::define(ResourceId::new("sub", "rg", "vnetA"), "westus")
            .with_address_space("10.0.0.0/27")
            .unwrap();
        let block = NetworkBlock {
            network: &network,
            peerings: &[],
        };
        let text = format!("{block}");
        assert!(text.starts_with("Virtual network: /subscriptions/sub/"), "{text}");
        assert_eq!(text.lines().count(), 7);
    }
}
