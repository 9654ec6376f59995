//! Polling for provider-side peering state.

use crate::config;
use crate::error::{PeeringError, Result};
use crate::models::{PeeringLink, PeeringRecord, PeeringState, ResourceId};
use crate::provider::NetworkProvider;
use std::time::Duration;

/// How often and how long to re-read a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        PollPolicy {
            interval: Duration::from_millis(config::SLEEP_MSEC * 4),
            max_attempts: config::POLL_ATTEMPTS,
        }
    }
}

/// Re-read the peering until its state is `target`.
///
/// Gives up with [`PeeringError::Cancelled`] after `policy.max_attempts` reads.
pub async fn wait_for_state<P: NetworkProvider + ?Sized>(
    provider: &P,
    network: &ResourceId,
    name: &str,
    target: PeeringState,
    policy: &PollPolicy,
) -> Result<PeeringRecord> {
    let mut last = None;
    for attempt in 1..=policy.max_attempts.max(1) {
        let record = provider.get_peering(network, name).await?;
        if record.state == target {
            log::debug!("peering {} reached {target} after {attempt} read(s)", record.label());
            return Ok(record);
        }
        log::debug!(
            "peering {} is {} (want {target}), attempt {attempt}/{}",
            record.label(),
            record.state,
            policy.max_attempts
        );
        last = Some(record.state);
        if attempt < policy.max_attempts {
            tokio::time::sleep(policy.interval).await;
        }
    }
    Err(PeeringError::Cancelled(format!(
        "peering '{name}' on {} did not reach {target} after {} reads, last state {}",
        network.name,
        policy.max_attempts,
        last.map(|s| s.to_string()).unwrap_or_default()
    )))
}

/// Wait for both records of `link` to be connected; returns the refreshed link.
pub async fn wait_until_connected<P: NetworkProvider + ?Sized>(
    provider: &P,
    link: &PeeringLink,
    policy: &PollPolicy,
) -> Result<PeeringLink> {
    let side_a = wait_for_state(
        provider,
        &link.side_a.network,
        &link.side_a.name,
        PeeringState::Connected,
        policy,
    )
    .await?;
    let side_b = wait_for_state(
        provider,
        &link.side_b.network,
        &link.side_b.name,
        PeeringState::Connected,
        policy,
    )
    .await?;
    Ok(PeeringLink { side_a, side_b })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PeeringOptions, VirtualNetwork};
    use crate::provider::MemoryProvider;

    const SUB: &str = "sub-1";

    fn fast() -> PollPolicy {
        PollPolicy {
            interval: Duration::from_millis(1),
            max_attempts: 3,
        }
    }

    async fn setup() -> (MemoryProvider, ResourceId, ResourceId) {
        let provider = MemoryProvider::new(SUB);
        provider.create_resource_group("rg", "westus").await.unwrap();
        let a = ResourceId::new(SUB, "rg", "vnetA");
        let b = ResourceId::new(SUB, "rg", "vnetB");
        for (id, cidr) in [(&a, "10.0.0.0/27"), (&b, "10.1.0.0/27")] {
            let vnet = VirtualNetwork::define(id.clone(), "westus")
                .with_address_space(cidr)
                .unwrap();
            provider.create_or_update_network(&vnet).await.unwrap();
        }
        (provider, a, b)
    }

    #[tokio::test]
    async fn test_wait_reaches_state() {
        let (provider, a, b) = setup().await;
        let opts = PeeringOptions::default();
        provider.create_or_update_peering(&a, "p", &b, opts).await.unwrap();
        provider.create_or_update_peering(&b, "p", &a, opts).await.unwrap();
        let rec = wait_for_state(&provider, &a, "p", PeeringState::Connected, &fast())
            .await
            .unwrap();
        assert_eq!(rec.state, PeeringState::Connected);
    }

    #[tokio::test]
    async fn test_wait_gives_up() {
        let (provider, a, b) = setup().await;
        provider
            .create_or_update_peering(&a, "p", &b, PeeringOptions::default())
            .await
            .unwrap();
        let err = wait_for_state(&provider, &a, "p", PeeringState::Connected, &fast())
            .await
            .unwrap_err();
        match err {
            PeeringError::Cancelled(msg) => assert!(msg.contains("Initiated"), "{msg}"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_wait_missing_record() {
        let (provider, a, _b) = setup().await;
        let err = wait_for_state(&provider, &a, "nope", PeeringState::Connected, &fast())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
