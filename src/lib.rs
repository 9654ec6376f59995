// cargo watch -x 'fmt' -x 'run'  // 'run -- --some-arg'

//! Azure virtual network peering.
//!
//! A peering between two networks is two records, one stored under each
//! network. [`coordinator::PeeringCoordinator`] creates, updates and deletes
//! those records explicitly, side by side, against any
//! [`provider::NetworkProvider`].

pub mod azure;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod models;
pub mod output;
pub mod provider;
pub mod sample;
pub mod wait;

pub use coordinator::{DeleteOutcome, DualDelete, PeeringCoordinator};
pub use error::{PeeringError, Result};
