//! Lifecycle management for the packing engine.
//!
//! Handles initialization and shutdown procedures: recovering an in-flight
//! session on startup and cancelling the auto-print countdown plus flushing
//! the session snapshot on the way out.

use super::{EngineError, PackingEngine};
use crate::store::{ItemStore, SessionRecord};
use packer_store::StorageError;
use packer_types::{truncate_id, StorageKey};

impl PackingEngine {
	/// Performs any initialization required before running.
	///
	/// When the session store still holds a snapshot for this station (the
	/// process died mid-order), the item store is re-hydrated from it.
	pub async fn initialize(&mut self) -> Result<(), EngineError> {
		tracing::info!(station_id = %self.config.station.id, "Initializing packing engine");

		match self
			.storage
			.retrieve::<SessionRecord>(StorageKey::Sessions.as_str(), &self.config.station.id)
			.await
		{
			Ok(record) => {
				tracing::info!(
					order_id = %truncate_id(&record.order_id),
					item_count = record.items.len(),
					"Recovered in-flight packing session"
				);
				self.store = ItemStore::from_record(record);
				self.after_mutation().await;
			}
			Err(StorageError::NotFound) => {}
			Err(e) => {
				tracing::warn!(error = %e, "Failed to read session snapshot; starting empty");
			}
		}

		Ok(())
	}

	/// Performs cleanup operations.
	pub async fn shutdown(&mut self) -> Result<(), EngineError> {
		tracing::info!("Shutting down packing engine");

		// The countdown must not outlive the loop that would consume it
		self.trigger.cancel();

		if !self.store.is_empty() {
			let complete = self.checked_completion();
			self.persist_session(complete).await;
		}

		Ok(())
	}
}
