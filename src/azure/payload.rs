//! JSON shapes returned by `az network vnet ...` commands.

use crate::error::{PeeringError, Result};
use crate::models::{
    Ipv4, PeeringOptions, PeeringRecord, PeeringState, ResourceId, Subnet, VirtualNetwork,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AzSubResource {
    pub id: String,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct AzAddressSpace {
    #[serde(default)]
    pub address_prefixes: Vec<Ipv4>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AzSubnet {
    pub name: String,
    pub address_prefix: Option<Ipv4>,
    pub address_prefixes: Option<Vec<Ipv4>>,
}

/// `az network vnet show`
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AzVnet {
    pub id: String,
    pub name: String,
    pub location: String,
    #[serde(default)]
    pub address_space: AzAddressSpace,
    #[serde(default)]
    pub subnets: Vec<AzSubnet>,
}

/// `az network vnet peering show|create|update`, one element of `list`.
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AzPeering {
    pub id: String,
    pub name: String,
    pub remote_virtual_network: AzSubResource,
    #[serde(default)]
    pub allow_virtual_network_access: bool,
    #[serde(default)]
    pub allow_forwarded_traffic: bool,
    #[serde(default)]
    pub allow_gateway_transit: bool,
    #[serde(default)]
    pub use_remote_gateways: bool,
    pub peering_state: Option<String>,
}

/// Parse az JSON output, reporting the failing path on error.
pub fn parse<T: DeserializeOwned>(what: &str, output: &str) -> Result<T> {
    let mut deserializer = serde_json::Deserializer::from_str(output);
    serde_path_to_error::deserialize(&mut deserializer).map_err(|e| {
        log::error!("OUTPUT START:\n\n{}\n\nOUTPUT END\n", output);
        PeeringError::Provider(format!(
            "Error parsing {what}: path={} error={}",
            e.path(),
            e
        ))
    })
}

impl TryFrom<AzVnet> for VirtualNetwork {
    type Error = PeeringError;

    fn try_from(vnet: AzVnet) -> Result<Self> {
        let id = ResourceId::parse(&vnet.id)?;
        let mut subnets = Vec::with_capacity(vnet.subnets.len());
        for subnet in vnet.subnets {
            let cidr = subnet
                .address_prefix
                .or_else(|| subnet.address_prefixes.and_then(|p| p.first().copied()))
                .ok_or_else(|| {
                    PeeringError::Provider(format!(
                        "subnet '{}' of {} has no address prefix",
                        subnet.name, vnet.name
                    ))
                })?;
            subnets.push(Subnet::new(subnet.name, cidr));
        }
        Ok(VirtualNetwork {
            id,
            location: vnet.location,
            address_space: vnet.address_space.address_prefixes,
            subnets,
        })
    }
}

impl TryFrom<AzPeering> for PeeringRecord {
    type Error = PeeringError;

    fn try_from(peering: AzPeering) -> Result<Self> {
        Ok(PeeringRecord {
            network: ResourceId::parse(&peering.id)?,
            remote_network_id: ResourceId::parse(&peering.remote_virtual_network.id)?,
            name: peering.name,
            options: PeeringOptions {
                allow_virtual_network_access: peering.allow_virtual_network_access,
                allow_forwarded_traffic: peering.allow_forwarded_traffic,
                allow_gateway_transit: peering.allow_gateway_transit,
                use_remote_gateways: peering.use_remote_gateways,
            },
            state: peering
                .peering_state
                .as_deref()
                .map(PeeringState::from)
                .unwrap_or(PeeringState::Unknown("None".to_string())),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_fixture(name: &str) -> String {
        std::fs::read_to_string(format!("src/tests/test_data/{name}"))
            .expect("Error reading test fixture")
    }

    #[test]
    fn test_parse_vnet_show() {
        let vnet: AzVnet = parse("vnet", &read_fixture("az_vnet_show_01.json")).unwrap();
        let vnet = VirtualNetwork::try_from(vnet).unwrap();
        assert_eq!(vnet.name(), "vnet1-4821");
        assert_eq!(vnet.id.resource_group, "rgNEMV1234");
        assert_eq!(vnet.address_space, vec![Ipv4::new("10.0.0.0/27").unwrap()]);
        assert_eq!(vnet.subnets.len(), 2);
        assert_eq!(vnet.subnets[1].name, "subnet2");
        assert_eq!(vnet.subnets[1].cidr, Ipv4::new("10.0.0.16/28").unwrap());
        vnet.validate().expect("fixture network is valid");
    }

    #[test]
    fn test_parse_peering_list() {
        let peerings: Vec<AzPeering> =
            parse("peerings", &read_fixture("az_peering_list_01.json")).unwrap();
        let records: Vec<PeeringRecord> = peerings
            .into_iter()
            .map(PeeringRecord::try_from)
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(records.len(), 1);
        let rec = &records[0];
        assert_eq!(rec.name, "peer5309");
        assert_eq!(rec.network.name, "vnet1-4821");
        assert_eq!(rec.remote_network_id.name, "vnet2-917");
        assert_eq!(rec.state, PeeringState::Connected);
        assert_eq!(rec.options.as_flags(), [false, true, false, false]);
    }

    #[test]
    fn test_parse_reports_path() {
        let err = parse::<AzVnet>("vnet", r#"{"id": "x", "name": "n", "location": 3}"#).unwrap_err();
        assert!(err.to_string().contains("location"), "{err}");
    }
}
