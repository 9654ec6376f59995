//! Azure CLI interaction.
//!
//! This module handles all Azure-related operations:
//! - [`cli`] - Command execution for Azure CLI
//! - [`payload`] - JSON shapes of `az network` output
//! - [`provider`] - The `az` backed network provider

mod cli;
mod payload;
mod provider;

// Re-export public types and functions
pub use cli::{classify_az_error, run};
pub use provider::AzCliProvider;
