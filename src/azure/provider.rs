//! [`NetworkProvider`] backed by the Azure CLI.
//!
//! Every call is a blocking `az` invocation: `az` waits for long-running
//! operations to complete unless `--no-wait` is passed, which this provider
//! never does.

use super::cli;
use super::payload::{parse, AzPeering, AzVnet};
use crate::error::Result;
use crate::models::{PeeringOptions, PeeringRecord, ResourceId, VirtualNetwork};
use crate::provider::NetworkProvider;
use async_trait::async_trait;
use itertools::Itertools;

/// Drives `az group` and `az network vnet` commands.
#[derive(Debug, Clone)]
pub struct AzCliProvider {
    subscription_id: String,
}

impl AzCliProvider {
    /// Commands are scoped with `--subscription` to keep every identity in one subscription.
    pub fn new(subscription_id: impl Into<String>) -> Self {
        AzCliProvider {
            subscription_id: subscription_id.into(),
        }
    }

    /// Ask `az` for the subscription of the logged-in account.
    pub async fn from_default_subscription() -> Result<Self> {
        let out = cli::run("az account show --query id --output tsv").await?;
        let subscription_id = out.trim().to_string();
        log::info!("Using default az subscription {subscription_id}");
        Ok(AzCliProvider::new(subscription_id))
    }

    async fn az(&self, args: &str) -> Result<String> {
        cli::run(&format!(
            "az {args} --subscription {sub} --output json",
            sub = self.subscription_id
        ))
        .await
    }

    fn vnet_args(id: &ResourceId) -> String {
        format!("--resource-group {} --name {}", id.resource_group, id.name)
    }

    fn peering_args(network: &ResourceId, name: &str) -> String {
        format!(
            "--resource-group {} --vnet-name {} --name {name}",
            network.resource_group, network.name
        )
    }
}

#[async_trait]
impl NetworkProvider for AzCliProvider {
    fn name(&self) -> &str {
        "az-cli"
    }

    fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    async fn create_resource_group(&self, name: &str, location: &str) -> Result<()> {
        self.az(&format!("group create --name {name} --location {location}"))
            .await?;
        Ok(())
    }

    async fn delete_resource_group(&self, name: &str) -> Result<()> {
        self.az(&format!("group delete --name {name} --yes")).await?;
        Ok(())
    }

    async fn create_or_update_network(&self, network: &VirtualNetwork) -> Result<VirtualNetwork> {
        network.validate()?;
        self.az(&format!(
            "network vnet create {} --location {} --address-prefixes {}",
            Self::vnet_args(&network.id),
            network.location,
            network.address_space.iter().join(" ")
        ))
        .await?;
        for subnet in &network.subnets {
            log::debug!("Creating subnet {subnet} in {}", network.name());
            self.az(&format!(
                "network vnet subnet create --resource-group {} --vnet-name {} --name {} --address-prefixes {}",
                network.id.resource_group,
                network.id.name,
                subnet.name,
                subnet.cidr
            ))
            .await?;
        }
        self.get_network(&network.id).await
    }

    async fn get_network(&self, id: &ResourceId) -> Result<VirtualNetwork> {
        let out = self
            .az(&format!("network vnet show {}", Self::vnet_args(id)))
            .await?;
        VirtualNetwork::try_from(parse::<AzVnet>("vnet show", &out)?)
    }

    async fn delete_network(&self, id: &ResourceId) -> Result<()> {
        self.az(&format!("network vnet delete {}", Self::vnet_args(id)))
            .await?;
        Ok(())
    }

    async fn create_or_update_peering(
        &self,
        network: &ResourceId,
        name: &str,
        remote_network_id: &ResourceId,
        options: PeeringOptions,
    ) -> Result<PeeringRecord> {
        let out = match self.get_peering(network, name).await {
            Ok(existing) => {
                existing.check_remote(remote_network_id)?;
                self.az(&format!(
                    "network vnet peering update {} --set allowVirtualNetworkAccess={} allowForwardedTraffic={} allowGatewayTransit={} useRemoteGateways={}",
                    Self::peering_args(network, name),
                    options.allow_virtual_network_access,
                    options.allow_forwarded_traffic,
                    options.allow_gateway_transit,
                    options.use_remote_gateways
                ))
                .await?
            }
            Err(e) if e.is_not_found() => {
                self.az(&format!(
                    "network vnet peering create {} --remote-vnet {remote_network_id} --allow-vnet-access {} --allow-forwarded-traffic {} --allow-gateway-transit {} --use-remote-gateways {}",
                    Self::peering_args(network, name),
                    options.allow_virtual_network_access,
                    options.allow_forwarded_traffic,
                    options.allow_gateway_transit,
                    options.use_remote_gateways
                ))
                .await?
            }
            Err(e) => return Err(e),
        };
        PeeringRecord::try_from(parse::<AzPeering>("peering", &out)?)
    }

    async fn get_peering(&self, network: &ResourceId, name: &str) -> Result<PeeringRecord> {
        let out = self
            .az(&format!(
                "network vnet peering show {}",
                Self::peering_args(network, name)
            ))
            .await?;
        PeeringRecord::try_from(parse::<AzPeering>("peering show", &out)?)
    }

    async fn delete_peering(&self, network: &ResourceId, name: &str) -> Result<()> {
        // `az ... peering delete` succeeds on a missing record; show first to report NotFound.
        self.get_peering(network, name).await?;
        self.az(&format!(
            "network vnet peering delete {}",
            Self::peering_args(network, name)
        ))
        .await?;
        Ok(())
    }

    async fn list_peerings(&self, network: &ResourceId) -> Result<Vec<PeeringRecord>> {
        let out = self
            .az(&format!(
                "network vnet peering list --resource-group {} --vnet-name {}",
                network.resource_group, network.name
            ))
            .await?;
        parse::<Vec<AzPeering>>("peering list", &out)?
            .into_iter()
            .map(PeeringRecord::try_from)
            .collect()
    }
}
