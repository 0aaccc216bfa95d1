//! String formatting utilities.
//!
//! Provides functions for formatting values for display: truncating long ids
//! to keep logs readable and rendering weights the way the station UI shows
//! them.

/// Utility function to truncate an id string for display purposes.
///
/// Shows only the first 8 characters followed by ".." for longer strings.
pub fn truncate_id(id: &str) -> String {
	if id.len() <= 8 {
		id.to_string()
	} else {
		format!("{}..", &id[..8])
	}
}

/// Formats a weight in kilograms for display with 3 decimal places.
///
/// Aggregates are kept unrounded internally; this is display formatting only.
pub fn format_weight_kg(kilograms: f64) -> String {
	format!("{:.3} kg", kilograms)
}
