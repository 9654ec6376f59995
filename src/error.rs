//! Error types for network and peering operations.

use crate::models::PeeringRecord;
use thiserror::Error;

/// Errors raised by the coordinator and the network providers.
#[derive(Error, Debug)]
pub enum PeeringError {
    #[error("Invalid CIDR: {0}")]
    InvalidCidr(String),

    #[error("Invalid resource id: {0}")]
    InvalidResourceId(String),

    #[error("Invalid network: {0}")]
    InvalidNetwork(String),

    #[error("Invalid peering options: {0}")]
    InvalidOptions(String),

    #[error("Address space overlap: {0}")]
    AddressSpaceOverlap(String),

    #[error("Duplicate name: {0}")]
    DuplicateName(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Immutable field: {0}")]
    ImmutableFieldViolation(String),

    #[error("Cross-subscription peering is not supported: {0}")]
    CrossSubscriptionUnsupported(String),

    #[error("Network in use: {0}")]
    NetworkInUse(String),

    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Cancelled: {0}")]
    Cancelled(String),

    /// Side A of a link was written, side B was not. Side A is left in place.
    #[error(
        "One-sided peering: '{}' exists on {} but the remote side failed: {source}",
        .created.name,
        .created.network
    )]
    OneSidedCreate {
        created: Box<PeeringRecord>,
        source: Box<PeeringError>,
    },

    /// Side A of a link was deleted, side B could not be.
    #[error("One-sided delete: '{deleted}' removed but the remote side failed: {source}")]
    OneSidedDelete {
        deleted: String,
        source: Box<PeeringError>,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PeeringError {
    /// Transient provider failure; the caller may retry the whole operation.
    pub fn is_transient(&self) -> bool {
        matches!(self, PeeringError::ProviderUnavailable(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, PeeringError::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, PeeringError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_transient() {
        assert!(PeeringError::ProviderUnavailable("429".into()).is_transient());
        assert!(!PeeringError::NotFound("x".into()).is_transient());
        assert!(PeeringError::NotFound("x".into()).is_not_found());
    }

    #[test]
    fn test_one_sided_delete_message() {
        let err = PeeringError::OneSidedDelete {
            deleted: "peer1 on vnet1".to_string(),
            source: Box::new(PeeringError::ProviderUnavailable("timeout".into())),
        };
        let msg = err.to_string();
        assert!(msg.contains("peer1 on vnet1"), "{msg}");
        assert!(msg.contains("timeout"), "{msg}");
    }
}
