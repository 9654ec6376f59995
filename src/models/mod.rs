//! Domain models for virtual network peering.
//!
//! This module contains the core data structures used throughout the crate:
//! - [`Ipv4`] - IPv4 CIDR block with range checks
//! - [`ResourceId`] - ARM identity of a virtual network
//! - [`Subnet`] and [`VirtualNetwork`] - network layout
//! - [`PeeringRecord`], [`PeeringLink`] and friends - the two-sided peering model

mod ipv4;
mod peering;
mod resource_id;
mod subnet;
mod vnet;

// Re-export public types
pub use ipv4::{broadcast_addr, cut_addr, first_overlap, get_cidr_mask, Ipv4, MAX_LENGTH};
pub use peering::{
    LinkSpec, PeeringLink, PeeringOptions, PeeringRecord, PeeringState, PeeringUpdate,
};
pub use resource_id::ResourceId;
pub use subnet::Subnet;
pub use vnet::VirtualNetwork;
