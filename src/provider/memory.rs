//! In-process network provider.
//!
//! Keeps resource groups, networks and peering records in memory and applies
//! the rules the Azure control plane applies to peerings: both networks must
//! exist, address spaces must not overlap, the remote network of a record is
//! fixed, and peering state is reconciled from the presence of the partner
//! record.

use super::NetworkProvider;
use crate::error::{PeeringError, Result};
use crate::models::{PeeringOptions, PeeringRecord, PeeringState, ResourceId, VirtualNetwork};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

/// Networks are keyed by lower-cased (resource group, name), as ARM compares them.
type NetworkKey = (String, String);

fn key(id: &ResourceId) -> NetworkKey {
    (id.resource_group.to_lowercase(), id.name.to_lowercase())
}

#[derive(Debug, Default)]
struct State {
    resource_groups: BTreeMap<String, String>,
    networks: BTreeMap<NetworkKey, VirtualNetwork>,
    peerings: BTreeMap<NetworkKey, BTreeMap<String, PeeringRecord>>,
    failing_writes: HashSet<NetworkKey>,
}

impl State {
    fn network(&self, id: &ResourceId) -> Result<&VirtualNetwork> {
        self.networks
            .get(&key(id))
            .ok_or_else(|| PeeringError::NotFound(format!("virtual network {}", id.name)))
    }

    /// Recompute the state of the record under `network` named `name` and its partner.
    /// A disconnected record stays disconnected until it is deleted and recreated.
    fn reconcile(&mut self, network: &ResourceId, name: &str) {
        let Some(record) = self.peerings.get(&key(network)).and_then(|p| p.get(name)).cloned()
        else {
            return;
        };
        if record.state == PeeringState::Disconnected {
            return;
        }
        let remote_key = key(&record.remote_network_id);
        let partner = self.peerings.get_mut(&remote_key).and_then(|records| {
            records
                .values_mut()
                .find(|p| p.remote_network_id.same_as(network))
        });
        let state = match partner {
            Some(partner) if partner.state != PeeringState::Disconnected => {
                partner.state = PeeringState::Connected;
                PeeringState::Connected
            }
            _ => PeeringState::Initiated,
        };
        if let Some(record) = self
            .peerings
            .get_mut(&key(network))
            .and_then(|p| p.get_mut(name))
        {
            record.state = state;
        }
    }

    /// Mark every record pointing at `removed` as disconnected.
    fn disconnect_partners_of(&mut self, removed: &ResourceId) {
        for records in self.peerings.values_mut() {
            for record in records.values_mut() {
                if record.remote_network_id.same_as(removed) {
                    record.state = PeeringState::Disconnected;
                }
            }
        }
    }

    fn live_references_to(&self, id: &ResourceId) -> Vec<String> {
        let own = self
            .peerings
            .get(&key(id))
            .into_iter()
            .flat_map(|records| records.values())
            .filter(|r| r.state != PeeringState::Disconnected);
        let remote = self
            .peerings
            .values()
            .flat_map(|records| records.values())
            .filter(|r| r.remote_network_id.same_as(id) && r.state != PeeringState::Disconnected);
        own.chain(remote).map(|r| r.label()).collect()
    }

    /// Any record owned by `id` or pointing at it, whatever its state.
    fn is_referenced(&self, id: &ResourceId) -> bool {
        self.peerings.get(&key(id)).is_some_and(|p| !p.is_empty())
            || self
                .peerings
                .values()
                .flat_map(|records| records.values())
                .any(|r| r.remote_network_id.same_as(id))
    }
}

/// Cheaply clonable; clones share the same state.
#[derive(Debug, Clone)]
pub struct MemoryProvider {
    subscription_id: String,
    state: Arc<Mutex<State>>,
}

impl MemoryProvider {
    pub fn new(subscription_id: impl Into<String>) -> Self {
        MemoryProvider {
            subscription_id: subscription_id.into(),
            state: Arc::new(Mutex::new(State::default())),
        }
    }

    /// Make the next peering write or delete under `network` fail with `ProviderUnavailable`.
    pub fn fail_next_peering_write(&self, network: &ResourceId) -> Result<()> {
        self.state()?.failing_writes.insert(key(network));
        Ok(())
    }

    fn state(&self) -> Result<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|e| PeeringError::Provider(format!("memory provider state poisoned: {e}")))
    }

    fn check_subscription(&self, id: &ResourceId) -> Result<()> {
        if id.subscription_id.eq_ignore_ascii_case(&self.subscription_id) {
            Ok(())
        } else {
            Err(PeeringError::NotFound(format!(
                "{} is not in subscription {}",
                id.name, self.subscription_id
            )))
        }
    }
}

#[async_trait]
impl NetworkProvider for MemoryProvider {
    fn name(&self) -> &str {
        "memory"
    }

    fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    async fn create_resource_group(&self, name: &str, location: &str) -> Result<()> {
        log::debug!("memory: create resource group {name} in {location}");
        self.state()?
            .resource_groups
            .insert(name.to_lowercase(), location.to_string());
        Ok(())
    }

    async fn delete_resource_group(&self, name: &str) -> Result<()> {
        let mut state = self.state()?;
        let rg = name.to_lowercase();
        if state.resource_groups.remove(&rg).is_none() {
            return Err(PeeringError::NotFound(format!("resource group {name}")));
        }
        let removed: Vec<ResourceId> = state
            .networks
            .iter()
            .filter(|((group, _), _)| group == &rg)
            .map(|(_, vnet)| vnet.id.clone())
            .collect();
        for id in &removed {
            state.networks.remove(&key(id));
            state.peerings.remove(&key(id));
            state.disconnect_partners_of(id);
        }
        log::debug!(
            "memory: deleted resource group {name} with {} networks",
            removed.len()
        );
        Ok(())
    }

    async fn create_or_update_network(&self, network: &VirtualNetwork) -> Result<VirtualNetwork> {
        self.check_subscription(&network.id)?;
        network.validate()?;
        let mut state = self.state()?;
        if !state
            .resource_groups
            .contains_key(&network.id.resource_group.to_lowercase())
        {
            return Err(PeeringError::NotFound(format!(
                "resource group {}",
                network.id.resource_group
            )));
        }
        let k = key(&network.id);
        if let Some(existing) = state.networks.get(&k) {
            if state.is_referenced(&network.id) && existing.address_space != network.address_space {
                return Err(PeeringError::NetworkInUse(format!(
                    "address space of {} cannot change while it is peered",
                    network.name()
                )));
            }
        }
        state.networks.insert(k, network.clone());
        log::debug!("memory: stored network {network}");
        Ok(network.clone())
    }

    async fn get_network(&self, id: &ResourceId) -> Result<VirtualNetwork> {
        self.check_subscription(id)?;
        Ok(self.state()?.network(id)?.clone())
    }

    async fn delete_network(&self, id: &ResourceId) -> Result<()> {
        self.check_subscription(id)?;
        let mut state = self.state()?;
        state.network(id)?;
        let live = state.live_references_to(id);
        if !live.is_empty() {
            return Err(PeeringError::NetworkInUse(format!(
                "{} is referenced by peerings {}",
                id.name,
                live.join(", ")
            )));
        }
        state.networks.remove(&key(id));
        state.peerings.remove(&key(id));
        Ok(())
    }

    async fn create_or_update_peering(
        &self,
        network: &ResourceId,
        name: &str,
        remote_network_id: &ResourceId,
        options: PeeringOptions,
    ) -> Result<PeeringRecord> {
        self.check_subscription(network)?;
        self.check_subscription(remote_network_id)?;
        options.validate()?;
        let mut state = self.state()?;
        if state.failing_writes.remove(&key(network)) {
            return Err(PeeringError::ProviderUnavailable(format!(
                "injected failure writing peering '{name}' on {}",
                network.name
            )));
        }

        let local = state.network(network)?.clone();
        let remote = state.network(remote_network_id)?.clone();
        if local.id.same_as(&remote.id) {
            return Err(PeeringError::InvalidNetwork(format!(
                "{} cannot be peered with itself",
                network.name
            )));
        }
        if let Some((a, b)) = local.overlap_with(&remote) {
            return Err(PeeringError::AddressSpaceOverlap(format!(
                "{} {a} overlaps {} {b}",
                local.name(),
                remote.name()
            )));
        }

        let records = state.peerings.entry(key(network)).or_default();
        match records.get_mut(name) {
            Some(existing) => {
                existing.check_remote(remote_network_id)?;
                existing.options = options;
            }
            None => {
                if let Some(other) = records
                    .values()
                    .find(|r| r.remote_network_id.same_as(remote_network_id))
                {
                    return Err(PeeringError::DuplicateName(format!(
                        "{} is already peered with {} by {}",
                        network.name,
                        remote_network_id.name,
                        other.label()
                    )));
                }
                records.insert(
                    name.to_string(),
                    PeeringRecord {
                        name: name.to_string(),
                        network: local.id.clone(),
                        remote_network_id: remote.id.clone(),
                        options,
                        state: PeeringState::Initiated,
                    },
                );
            }
        }
        state.reconcile(network, name);

        let record = state
            .peerings
            .get(&key(network))
            .and_then(|p| p.get(name))
            .cloned()
            .ok_or_else(|| PeeringError::NotFound(format!("peering '{name}' on {}", network.name)))?;
        log::debug!("memory: stored peering {record}");
        Ok(record)
    }

    async fn get_peering(&self, network: &ResourceId, name: &str) -> Result<PeeringRecord> {
        self.check_subscription(network)?;
        let state = self.state()?;
        state.network(network)?;
        state
            .peerings
            .get(&key(network))
            .and_then(|p| p.get(name))
            .cloned()
            .ok_or_else(|| PeeringError::NotFound(format!("peering '{name}' on {}", network.name)))
    }

    async fn delete_peering(&self, network: &ResourceId, name: &str) -> Result<()> {
        self.check_subscription(network)?;
        let mut state = self.state()?;
        if state.failing_writes.remove(&key(network)) {
            return Err(PeeringError::ProviderUnavailable(format!(
                "injected failure deleting peering '{name}' on {}",
                network.name
            )));
        }
        let removed = state
            .peerings
            .get_mut(&key(network))
            .and_then(|p| p.remove(name))
            .ok_or_else(|| {
                PeeringError::NotFound(format!("peering '{name}' on {}", network.name))
            })?;
        if let Some(partner) = state
            .peerings
            .get_mut(&key(&removed.remote_network_id))
            .and_then(|records| records.values_mut().find(|p| p.remote_network_id.same_as(network)))
        {
            partner.state = PeeringState::Disconnected;
        }
        log::debug!("memory: deleted peering {}", removed.label());
        Ok(())
    }

    async fn list_peerings(&self, network: &ResourceId) -> Result<Vec<PeeringRecord>> {
        self.check_subscription(network)?;
        let state = self.state()?;
        state.network(network)?;
        Ok(state
            .peerings
            .get(&key(network))
            .map(|p| p.values().cloned().collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUB: &str = "sub-1";

    async fn provider_with_networks() -> (MemoryProvider, ResourceId, ResourceId) {
        let provider = MemoryProvider::new(SUB);
        provider.create_resource_group("rg", "westus").await.unwrap();
        let a = ResourceId::new(SUB, "rg", "vnetA");
        let b = ResourceId::new(SUB, "rg", "vnetB");
        let vnet_a = VirtualNetwork::define(a.clone(), "westus")
            .with_address_space("10.0.0.0/27")
            .unwrap();
        let vnet_b = VirtualNetwork::define(b.clone(), "westus")
            .with_address_space("10.1.0.0/27")
            .unwrap();
        provider.create_or_update_network(&vnet_a).await.unwrap();
        provider.create_or_update_network(&vnet_b).await.unwrap();
        (provider, a, b)
    }

    #[tokio::test]
    async fn test_network_requires_resource_group() {
        let provider = MemoryProvider::new(SUB);
        let vnet = VirtualNetwork::define(ResourceId::new(SUB, "missing", "v"), "westus")
            .with_address_space("10.0.0.0/27")
            .unwrap();
        let err = provider.create_or_update_network(&vnet).await.unwrap_err();
        assert!(err.is_not_found(), "{err}");
    }

    #[tokio::test]
    async fn test_state_reconciliation() {
        let (provider, a, b) = provider_with_networks().await;
        let opts = PeeringOptions::default();

        let ab = provider.create_or_update_peering(&a, "p", &b, opts).await.unwrap();
        assert_eq!(ab.state, PeeringState::Initiated);

        let ba = provider.create_or_update_peering(&b, "p", &a, opts).await.unwrap();
        assert_eq!(ba.state, PeeringState::Connected);
        assert_eq!(
            provider.get_peering(&a, "p").await.unwrap().state,
            PeeringState::Connected
        );

        provider.delete_peering(&b, "p").await.unwrap();
        assert_eq!(
            provider.get_peering(&a, "p").await.unwrap().state,
            PeeringState::Disconnected
        );
    }

    #[tokio::test]
    async fn test_create_is_idempotent() {
        let (provider, a, b) = provider_with_networks().await;
        let opts = PeeringOptions::default();
        let first = provider.create_or_update_peering(&a, "p", &b, opts).await.unwrap();
        let second = provider.create_or_update_peering(&a, "p", &b, opts).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(provider.list_peerings(&a).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_remote_is_immutable() {
        let (provider, a, b) = provider_with_networks().await;
        let c = ResourceId::new(SUB, "rg", "vnetC");
        let vnet_c = VirtualNetwork::define(c.clone(), "westus")
            .with_address_space("10.2.0.0/27")
            .unwrap();
        provider.create_or_update_network(&vnet_c).await.unwrap();

        let opts = PeeringOptions::default();
        provider.create_or_update_peering(&a, "p", &b, opts).await.unwrap();
        let err = provider
            .create_or_update_peering(&a, "p", &c, opts)
            .await
            .unwrap_err();
        assert!(matches!(err, PeeringError::ImmutableFieldViolation(_)), "{err}");
    }

    #[tokio::test]
    async fn test_delete_missing_peering() {
        let (provider, a, _b) = provider_with_networks().await;
        let err = provider.delete_peering(&a, "nope").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_injected_failure_is_one_shot() {
        let (provider, a, b) = provider_with_networks().await;
        provider.fail_next_peering_write(&a).unwrap();
        let opts = PeeringOptions::default();
        let err = provider
            .create_or_update_peering(&a, "p", &b, opts)
            .await
            .unwrap_err();
        assert!(err.is_transient());
        provider
            .create_or_update_peering(&a, "p", &b, opts)
            .await
            .expect("second attempt succeeds");
    }

    #[tokio::test]
    async fn test_delete_resource_group_disconnects_partners() {
        let (provider, a, b) = provider_with_networks().await;
        provider.create_resource_group("rg2", "westus").await.unwrap();
        let c = ResourceId::new(SUB, "rg2", "vnetC");
        let vnet_c = VirtualNetwork::define(c.clone(), "westus")
            .with_address_space("10.2.0.0/27")
            .unwrap();
        provider.create_or_update_network(&vnet_c).await.unwrap();
        let opts = PeeringOptions::default();
        provider.create_or_update_peering(&a, "ac", &c, opts).await.unwrap();
        provider.create_or_update_peering(&c, "ca", &a, opts).await.unwrap();

        provider.delete_resource_group("rg2").await.unwrap();
        assert_eq!(
            provider.get_peering(&a, "ac").await.unwrap().state,
            PeeringState::Disconnected
        );
        assert!(provider.get_network(&c).await.unwrap_err().is_not_found());
        assert!(provider.get_network(&b).await.is_ok());
    }

    #[tokio::test]
    async fn test_address_space_locked_while_peered() {
        let (provider, a, b) = provider_with_networks().await;
        provider
            .create_or_update_peering(&a, "p", &b, PeeringOptions::default())
            .await
            .unwrap();
        let grown = VirtualNetwork::define(a.clone(), "westus")
            .with_address_space("10.0.0.0/26")
            .unwrap();
        let err = provider.create_or_update_network(&grown).await.unwrap_err();
        assert!(matches!(err, PeeringError::NetworkInUse(_)), "{err}");
    }

    #[tokio::test]
    async fn test_update_keeps_disconnected_state() {
        let (provider, a, b) = provider_with_networks().await;
        let opts = PeeringOptions::default();
        provider.create_or_update_peering(&a, "p", &b, opts).await.unwrap();
        provider.create_or_update_peering(&b, "p", &a, opts).await.unwrap();
        provider.delete_peering(&b, "p").await.unwrap();

        let updated = provider
            .create_or_update_peering(&a, "p", &b, opts.with_forwarded_traffic(true))
            .await
            .unwrap();
        assert_eq!(updated.state, PeeringState::Disconnected);
        assert!(updated.options.allow_forwarded_traffic);

        // A dead record does not hold the remote network.
        provider.delete_network(&b).await.expect("only a dead peering points at B");
    }

    #[tokio::test]
    async fn test_recreated_partner_does_not_revive_disconnected_side() {
        let (provider, a, b) = provider_with_networks().await;
        let opts = PeeringOptions::default();
        provider.create_or_update_peering(&a, "p", &b, opts).await.unwrap();
        provider.create_or_update_peering(&b, "p", &a, opts).await.unwrap();
        provider.delete_peering(&b, "p").await.unwrap();
        provider.create_or_update_peering(&a, "p", &b, opts).await.unwrap();

        let recreated = provider.create_or_update_peering(&b, "p", &a, opts).await.unwrap();
        assert_eq!(recreated.state, PeeringState::Initiated);
        assert_eq!(
            provider.get_peering(&a, "p").await.unwrap().state,
            PeeringState::Disconnected
        );
    }

    #[tokio::test]
    async fn test_address_space_locked_while_referenced_remotely() {
        let (provider, a, b) = provider_with_networks().await;
        provider
            .create_or_update_peering(&a, "p", &b, PeeringOptions::default())
            .await
            .unwrap();
        let grown = VirtualNetwork::define(b.clone(), "westus")
            .with_address_space("10.1.0.0/26")
            .unwrap();
        let err = provider.create_or_update_network(&grown).await.unwrap_err();
        assert!(matches!(err, PeeringError::NetworkInUse(_)), "{err}");
    }
}
