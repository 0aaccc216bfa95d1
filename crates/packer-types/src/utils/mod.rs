//! Utility functions for the packer types.
//!
//! Contains helper functions for common operations such as string formatting
//! and ID truncation for display purposes.

pub mod formatting;

pub use formatting::{format_weight_kg, truncate_id};
