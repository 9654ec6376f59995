//! Network provider abstraction.
//!
//! The coordinator never talks to Azure directly. Everything it needs from
//! the control plane goes through [`NetworkProvider`]:
//! - [`crate::azure::AzCliProvider`] - drives the `az` command line
//! - [`memory::MemoryProvider`] - in-process provider for tests and offline runs

pub mod memory;

use crate::error::Result;
use crate::models::{PeeringOptions, PeeringRecord, ResourceId, VirtualNetwork};
use async_trait::async_trait;

pub use memory::MemoryProvider;

/// Create/read/delete operations over resource groups, virtual networks and
/// peering records, keyed by name within a resource group.
///
/// Every call returns once the provider has durably recorded the change.
#[async_trait]
pub trait NetworkProvider: Send + Sync {
    /// Short provider name for logs (e.g. "az-cli", "memory").
    fn name(&self) -> &str;

    /// Subscription all identities of this provider live in.
    fn subscription_id(&self) -> &str;

    async fn create_resource_group(&self, name: &str, location: &str) -> Result<()>;

    /// Delete a resource group and everything in it.
    async fn delete_resource_group(&self, name: &str) -> Result<()>;

    async fn create_or_update_network(&self, network: &VirtualNetwork) -> Result<VirtualNetwork>;

    async fn get_network(&self, id: &ResourceId) -> Result<VirtualNetwork>;

    async fn delete_network(&self, id: &ResourceId) -> Result<()>;

    /// Idempotent: repeating a call with identical inputs neither fails nor duplicates.
    async fn create_or_update_peering(
        &self,
        network: &ResourceId,
        name: &str,
        remote_network_id: &ResourceId,
        options: PeeringOptions,
    ) -> Result<PeeringRecord>;

    async fn get_peering(&self, network: &ResourceId, name: &str) -> Result<PeeringRecord>;

    /// Fails with `NotFound` when the record does not exist.
    async fn delete_peering(&self, network: &ResourceId, name: &str) -> Result<()>;

    async fn list_peerings(&self, network: &ResourceId) -> Result<Vec<PeeringRecord>>;
}
