//! Peering coordinator.
//!
//! A peering link is two records stored independently under each network.
//! There is no atomic dual write, so every operation here is an explicit
//! sequence of single-record calls, and failures say which side exists.

use crate::error::{PeeringError, Result};
use crate::models::{LinkSpec, PeeringLink, PeeringRecord, PeeringUpdate, ResourceId};
use crate::provider::NetworkProvider;
use colored::Colorize;

/// Result of deleting one side in a pair delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// The record was not there; counts as done.
    AlreadyAbsent,
}

/// Per-side outcome of [`PeeringCoordinator::delete_both_named`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DualDelete {
    pub side_a: DeleteOutcome,
    pub side_b: DeleteOutcome,
}

/// Creates, updates and removes the two records of a peering link.
pub struct PeeringCoordinator<P: NetworkProvider> {
    provider: P,
}

impl<P: NetworkProvider> PeeringCoordinator<P> {
    pub fn new(provider: P) -> Self {
        PeeringCoordinator { provider }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Peer `network_a` with `network_b`: side A first, then side B.
    ///
    /// All checks run before the first write, so a rejected link leaves no
    /// record on either side. If side B fails after side A was written, side A
    /// stays and the error is [`PeeringError::OneSidedCreate`].
    pub async fn create_link(
        &self,
        network_a: &ResourceId,
        network_b: &ResourceId,
        spec: &LinkSpec,
    ) -> Result<PeeringLink> {
        spec.validate()?;
        if network_a.same_as(network_b) {
            return Err(PeeringError::InvalidNetwork(format!(
                "{} cannot be peered with itself",
                network_a.name
            )));
        }
        if !network_a.same_subscription(network_b) {
            return Err(PeeringError::CrossSubscriptionUnsupported(format!(
                "{} is in {} but {} is in {}",
                network_a.name,
                network_a.subscription_id,
                network_b.name,
                network_b.subscription_id
            )));
        }

        let vnet_a = self.provider.get_network(network_a).await?;
        let vnet_b = self.provider.get_network(network_b).await?;
        if let Some((a, b)) = vnet_a.overlap_with(&vnet_b) {
            return Err(PeeringError::AddressSpaceOverlap(format!(
                "{} {a} overlaps {} {b}",
                network_a.name, network_b.name
            )));
        }

        self.check_free(network_a, &spec.name_on_a, network_b).await?;
        self.check_free(network_b, &spec.name_on_b, network_a).await?;

        log::info!(
            "Creating peering '{}' {} -> {}",
            spec.name_on_a,
            network_a.name,
            network_b.name
        );
        let side_a = self
            .provider
            .create_or_update_peering(network_a, &spec.name_on_a, network_b, spec.options_a)
            .await?;

        log::info!(
            "Creating peering '{}' {} -> {}",
            spec.name_on_b,
            network_b.name,
            network_a.name
        );
        let side_b = match self
            .provider
            .create_or_update_peering(network_b, &spec.name_on_b, network_a, spec.options_b)
            .await
        {
            Ok(record) => record,
            Err(e) => {
                log::error!(
                    "{} peering {} exists without its remote side: {e}",
                    "one-sided".on_red(),
                    side_a.label()
                );
                return Err(PeeringError::OneSidedCreate {
                    created: Box::new(side_a),
                    source: Box::new(e),
                });
            }
        };

        Ok(PeeringLink { side_a, side_b })
    }

    /// Fail if `network` already has a record named `name` or one pointing at `remote`.
    async fn check_free(&self, network: &ResourceId, name: &str, remote: &ResourceId) -> Result<()> {
        for record in self.provider.list_peerings(network).await? {
            if record.name == name {
                return Err(PeeringError::DuplicateName(format!(
                    "peering {} already exists",
                    record.label()
                )));
            }
            if record.remote_network_id.same_as(remote) {
                return Err(PeeringError::DuplicateName(format!(
                    "{} is already peered with {} by {}",
                    network.name,
                    remote.name,
                    record.label()
                )));
            }
        }
        Ok(())
    }

    /// Change the options of one record. Only the owning side is written;
    /// a symmetric change takes one call per side.
    pub async fn update_link(
        &self,
        existing: &PeeringRecord,
        update: &PeeringUpdate,
    ) -> Result<PeeringRecord> {
        update.check_immutable(existing)?;
        update.options.validate()?;

        let current = self
            .provider
            .get_peering(&existing.network, &existing.name)
            .await?;
        update.check_immutable(&current)?;
        if !current.remote_network_id.same_as(&existing.remote_network_id) {
            return Err(PeeringError::ImmutableFieldViolation(format!(
                "peering {} points at {}, not {}",
                current.label(),
                current.remote_network_id.name,
                existing.remote_network_id.name
            )));
        }

        log::info!(
            "Updating peering {}: {} => {}",
            current.label(),
            current.options,
            update.options
        );
        self.provider
            .create_or_update_peering(
                &current.network,
                &current.name,
                &current.remote_network_id,
                update.options,
            )
            .await
    }

    /// Delete `record` from its owning network only.
    pub async fn delete_link(&self, record: &PeeringRecord) -> Result<()> {
        log::info!("Deleting peering {}", record.label());
        self.provider
            .delete_peering(&record.network, &record.name)
            .await
    }

    /// Delete the record named `name` on both networks. A missing record
    /// counts as already deleted, so repeating the call is harmless.
    pub async fn delete_both_named(
        &self,
        network_a: &ResourceId,
        network_b: &ResourceId,
        name: &str,
    ) -> Result<DualDelete> {
        self.delete_pair((network_a, name), (network_b, name)).await
    }

    /// [`Self::delete_both_named`] for a link whose sides may carry different names.
    pub async fn delete_link_pair(&self, link: &PeeringLink) -> Result<DualDelete> {
        self.delete_pair(
            (&link.side_a.network, link.side_a.name.as_str()),
            (&link.side_b.network, link.side_b.name.as_str()),
        )
        .await
    }

    async fn delete_pair(
        &self,
        (network_a, name_a): (&ResourceId, &str),
        (network_b, name_b): (&ResourceId, &str),
    ) -> Result<DualDelete> {
        let side_a = self.delete_idempotent(network_a, name_a).await?;
        let side_b = match self.delete_idempotent(network_b, name_b).await {
            Ok(outcome) => outcome,
            Err(e) if side_a == DeleteOutcome::Deleted => {
                return Err(PeeringError::OneSidedDelete {
                    deleted: format!("'{name_a}' on {}", network_a.name),
                    source: Box::new(e),
                });
            }
            Err(e) => return Err(e),
        };
        log::info!(
            "Deleted peering '{name_a}' on {} ({side_a:?}) and '{name_b}' on {} ({side_b:?})",
            network_a.name,
            network_b.name
        );
        Ok(DualDelete { side_a, side_b })
    }

    async fn delete_idempotent(&self, network: &ResourceId, name: &str) -> Result<DeleteOutcome> {
        match self.provider.delete_peering(network, name).await {
            Ok(()) => Ok(DeleteOutcome::Deleted),
            Err(e) if e.is_not_found() => {
                log::debug!("peering '{name}' on {} already absent", network.name);
                Ok(DeleteOutcome::AlreadyAbsent)
            }
            Err(e) => Err(e),
        }
    }

    /// Records owned by `network`, ordered by name. Call again for a fresh view.
    pub async fn describe(
        &self,
        network: &ResourceId,
    ) -> Result<std::vec::IntoIter<PeeringRecord>> {
        let mut records = self.provider.list_peerings(network).await?;
        records.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(records.into_iter())
    }
}
