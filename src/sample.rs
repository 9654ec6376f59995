//! End-to-end peering walkthrough.
//!
//! 1. Create two networks in one region and subscription: A with two
//!    subnets, B with one, address spaces not overlapping.
//! 2. Peer them with default options (access on, forwarding off, no gateway transit).
//! 3. Update A's side: no network access, forwarded traffic allowed.
//! 4. Delete the peering on both sides.
//!
//! The resource group is deleted at the end whatever happened before.

use crate::config::Settings;
use crate::coordinator::PeeringCoordinator;
use crate::error::Result;
use crate::models::{LinkSpec, PeeringOptions, PeeringUpdate, ResourceId, VirtualNetwork};
use crate::output::print_virtual_network;
use crate::provider::NetworkProvider;
use crate::wait::{wait_until_connected, PollPolicy};
use colored::Colorize;
use rand::Rng;

/// `prefix` followed by a random number below 10000.
pub fn create_random_name(prefix: &str) -> String {
    format!("{prefix}{}", rand::thread_rng().gen_range(0..10000))
}

/// Names of everything the walkthrough creates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleNames {
    pub resource_group: String,
    pub vnet_a: String,
    pub vnet_b: String,
    pub peering: String,
}

impl SampleNames {
    pub fn random(settings: &Settings) -> SampleNames {
        SampleNames {
            resource_group: settings
                .resource_group
                .clone()
                .unwrap_or_else(|| create_random_name("rgNEMV")),
            vnet_a: create_random_name("vnet1-"),
            vnet_b: create_random_name("vnet2-"),
            peering: create_random_name("peer"),
        }
    }
}

/// Run the walkthrough, then delete the resource group unless `keep_resources` is set.
pub async fn run_sample<P: NetworkProvider>(
    provider: P,
    settings: &Settings,
    names: &SampleNames,
) -> Result<()> {
    log::info!(
        "Running peering sample against provider '{}' in subscription {}",
        provider.name(),
        provider.subscription_id()
    );
    let coordinator = PeeringCoordinator::new(provider);
    let result = run_steps(&coordinator, settings, names).await;
    if let Err(e) = &result {
        log::error!("{} {e}", "sample failed:".on_red());
    }
    cleanup(coordinator.provider(), settings, names).await;
    result
}

async fn run_steps<P: NetworkProvider>(
    coordinator: &PeeringCoordinator<P>,
    settings: &Settings,
    names: &SampleNames,
) -> Result<()> {
    let provider = coordinator.provider();
    let subscription = provider.subscription_id();

    log::info!("Creating resource group {}...", names.resource_group);
    provider
        .create_resource_group(&names.resource_group, &settings.location)
        .await?;

    //=============================================================
    // Define two virtual networks to peer
    log::info!("Creating two virtual networks in the same region and subscription...");
    let id_a = ResourceId::new(subscription, &names.resource_group, &names.vnet_a);
    let id_b = ResourceId::new(subscription, &names.resource_group, &names.vnet_b);
    let network_a = VirtualNetwork::define(id_a.clone(), &settings.location)
        .with_address_space("10.0.0.0/27")?
        .with_subnet("subnet1", "10.0.0.0/28")?
        .with_subnet("subnet2", "10.0.0.16/28")?;
    let network_b = VirtualNetwork::define(id_b.clone(), &settings.location)
        .with_address_space("10.1.0.0/27")?
        .with_subnet("subnet3", "10.1.0.0/27")?;

    // Independent networks, created concurrently.
    let (network_a, network_b) = futures::try_join!(
        provider.create_or_update_network(&network_a),
        provider.create_or_update_network(&network_b)
    )?;
    log::info!("Created {network_a}");
    log::info!("Created {network_b}");
    show(coordinator, &id_a).await?;
    show(coordinator, &id_b).await?;

    //=============================================================
    // Peer the two networks using default settings
    log::info!(
        "Peering the networks using default settings...\n\
         - Network access enabled\n\
         - Traffic forwarding disabled\n\
         - Gateway use (transit) by the peered network disabled"
    );
    let link = coordinator
        .create_link(&id_a, &id_b, &LinkSpec::symmetric(&names.peering))
        .await?;
    let policy = PollPolicy {
        interval: settings.poll_interval,
        max_attempts: settings.poll_attempts,
    };
    let link = wait_until_connected(provider, &link, &policy).await?;
    log::info!("Created a peering: {} <-> {}", link.side_a, link.side_b);
    show(coordinator, &id_a).await?;
    show(coordinator, &id_b).await?;

    //=============================================================
    // Update A's side only; B keeps its defaults.
    log::info!("Updating the peering ...");
    let options = PeeringOptions::default()
        .with_access(false)
        .with_forwarded_traffic(true);
    let updated = coordinator
        .update_link(&link.side_a, &PeeringUpdate::options(options))
        .await?;
    log::info!(
        "Updated the peering to disallow network access from {} but allow forwarded traffic: {updated}",
        names.vnet_a
    );
    show(coordinator, &id_a).await?;
    show(coordinator, &id_b).await?;

    //=============================================================
    // Remove the peering
    log::info!("Deleting the peering from the networks...");
    let outcome = coordinator
        .delete_both_named(&id_a, &id_b, &names.peering)
        .await?;
    log::info!("Deleted the peering from both sides: {outcome:?}");
    show(coordinator, &id_a).await?;
    show(coordinator, &id_b).await?;

    Ok(())
}

async fn show<P: NetworkProvider>(
    coordinator: &PeeringCoordinator<P>,
    id: &ResourceId,
) -> Result<()> {
    let network = coordinator.provider().get_network(id).await?;
    let peerings: Vec<_> = coordinator.describe(id).await?.collect();
    print_virtual_network(&network, &peerings);
    Ok(())
}

/// Best effort: failures are logged, never returned.
async fn cleanup<P: NetworkProvider>(provider: &P, settings: &Settings, names: &SampleNames) {
    if settings.keep_resources {
        log::warn!(
            "KEEP_RESOURCES set, leaving resource group {} in place",
            names.resource_group
        );
        return;
    }
    log::info!("Deleting Resource Group...");
    match provider.delete_resource_group(&names.resource_group).await {
        Ok(()) => log::info!("Deleted Resource Group: {}", names.resource_group),
        Err(e) if e.is_not_found() => {
            log::info!("Did not create any resources in Azure. No clean up is necessary")
        }
        Err(e) => log::error!("Cleanup of {} failed: {e}", names.resource_group),
    }
}
