//! Output formatting for networks and peerings.
//!
//! - [`terminal`] - Terminal output with colors

mod terminal;

pub use terminal::{print_virtual_network, render_virtual_network, NetworkBlock};
