//! The packing engine and its event loop.
//!
//! The engine owns the item store, the auto-print trigger, and the session
//! persistence, and consumes workflow commands from a single channel. The
//! command loop is a single-threaded cooperative event loop: all item-status
//! mutations are synchronous and strictly ordered, and the store is never
//! read mid-mutation. The only long-lived asynchronous operation is the
//! auto-print countdown, which reports back through its own channel and is
//! cancellable at every reset point.

pub mod event_bus;
pub mod lifecycle;

use crate::autoprint::{AutoPrintTrigger, TriggerMessage};
use crate::store::{ApplyOutcome, ItemStore, StoreError};
use crate::{selection, weights};
use event_bus::EventBus;
use packer_config::Config;
use packer_devices::PrinterService;
use packer_store::StorageService;
use packer_types::{
	truncate_id, ItemEvent, PackingSnapshot, PrintEvent, RawOrderItem, StorageKey,
	WorkflowCommand, WorkflowEvent,
};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tracing::instrument;

/// Errors that can occur during engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
	/// Error related to configuration issues.
	#[error("Configuration error: {0}")]
	Config(String),
	/// Error from one of the engine's services.
	#[error("Service error: {0}")]
	Service(String),
}

/// The order-packing workflow engine.
///
/// Created once per station process via [`crate::PackerBuilder`]; orders are
/// loaded and discarded through commands over its lifetime.
pub struct PackingEngine {
	/// Station configuration.
	pub(crate) config: Config,
	/// Storage service for session snapshots.
	pub(crate) storage: Arc<StorageService>,
	/// Printer service the auto-print trigger fires into.
	pub(crate) printer: Arc<PrinterService>,
	/// Event bus for consumer notifications.
	pub(crate) event_bus: EventBus,
	/// The item store for the current order.
	pub(crate) store: ItemStore,
	/// The auto-print trigger.
	pub(crate) trigger: AutoPrintTrigger,
	/// External print-ready signal, OR'd into the arming condition.
	print_ready: bool,
	/// Debug override, OR'd into the arming condition.
	debug_override: bool,
	/// Active item of the previous derivation, for edge detection.
	last_active_item: Option<String>,
	snapshot_tx: watch::Sender<PackingSnapshot>,
	command_tx: mpsc::UnboundedSender<WorkflowCommand>,
	command_rx: Option<mpsc::UnboundedReceiver<WorkflowCommand>>,
	trigger_tx: mpsc::UnboundedSender<TriggerMessage>,
	trigger_rx: Option<mpsc::UnboundedReceiver<TriggerMessage>>,
}

impl std::fmt::Debug for PackingEngine {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("PackingEngine").finish_non_exhaustive()
	}
}

impl PackingEngine {
	/// Creates a new engine with the given services.
	pub fn new(
		config: Config,
		storage: Arc<StorageService>,
		printer: Arc<PrinterService>,
		event_bus: EventBus,
	) -> Self {
		let (command_tx, command_rx) = mpsc::unbounded_channel();
		let (trigger_tx, trigger_rx) = mpsc::unbounded_channel();
		let (snapshot_tx, _) = watch::channel(PackingSnapshot::default());
		let trigger = AutoPrintTrigger::new(
			config.equipment.auto_print_on_complete,
			config.equipment.auto_print_delay_ms,
		);
		let debug_override = config.equipment.debug_override;

		Self {
			config,
			storage,
			printer,
			event_bus,
			store: ItemStore::empty(),
			trigger,
			print_ready: false,
			debug_override,
			last_active_item: None,
			snapshot_tx,
			command_tx,
			command_rx: Some(command_rx),
			trigger_tx,
			trigger_rx: Some(trigger_rx),
		}
	}

	/// Returns a sender for workflow commands.
	pub fn command_sender(&self) -> mpsc::UnboundedSender<WorkflowCommand> {
		self.command_tx.clone()
	}

	/// Returns a receiver for the derived read-only snapshot.
	pub fn subscribe_snapshot(&self) -> watch::Receiver<PackingSnapshot> {
		self.snapshot_tx.subscribe()
	}

	/// Returns a reference to the event bus.
	pub fn event_bus(&self) -> &EventBus {
		&self.event_bus
	}

	/// Returns a reference to the configuration.
	pub fn config(&self) -> &Config {
		&self.config
	}

	/// Main execution loop for the packing engine.
	///
	/// Consumes workflow commands and countdown messages until a `Shutdown`
	/// command or Ctrl+C arrives.
	pub async fn run(&mut self) -> Result<(), EngineError> {
		let mut command_rx = self
			.command_rx
			.take()
			.ok_or_else(|| EngineError::Service("Engine is already running".to_string()))?;
		let mut trigger_rx = self
			.trigger_rx
			.take()
			.ok_or_else(|| EngineError::Service("Engine is already running".to_string()))?;

		loop {
			tokio::select! {
				// Handle workflow commands
				Some(command) = command_rx.recv() => {
					if matches!(command, WorkflowCommand::Shutdown) {
						break;
					}
					self.handle_command(command).await;
				}

				// Handle countdown messages from the auto-print trigger
				Some(message) = trigger_rx.recv() => {
					self.handle_trigger_message(message).await;
				}

				// Shutdown signal
				_ = tokio::signal::ctrl_c() => {
					break;
				}
			}
		}

		self.shutdown().await
	}

	/// Applies one workflow command.
	///
	/// Command failures (illegal clicks, invalid transitions, unknown items)
	/// are handled locally: logged and turned into "no change", never
	/// propagated across the engine boundary.
	async fn handle_command(&mut self, command: WorkflowCommand) {
		match command {
			WorkflowCommand::LoadOrder { order_id, items } => {
				self.handle_load_order(order_id, items).await;
			}
			WorkflowCommand::ItemClicked { item_id } => {
				let outcome = self.store.click(&item_id);
				self.finish_apply(outcome).await;
			}
			WorkflowCommand::SetStatus { item_id, status } => {
				let outcome = self.store.set_status(&item_id, status);
				self.finish_apply(outcome).await;
			}
			WorkflowCommand::AdvanceBox => {
				let outcome = self.store.advance_box();
				self.finish_apply(outcome).await;
			}
			WorkflowCommand::PrintRequested => {
				self.handle_print_requested().await;
			}
			WorkflowCommand::SetPrintReady(value) => {
				self.print_ready = value;
				self.after_mutation().await;
			}
			WorkflowCommand::SetDebugOverride(value) => {
				self.debug_override = value;
				self.after_mutation().await;
			}
			// Handled by the run loop
			WorkflowCommand::Shutdown => {}
		}
	}

	/// Hydrates a new order, discarding the previous session.
	#[instrument(skip_all, fields(order_id = %truncate_id(&order_id)))]
	async fn handle_load_order(&mut self, order_id: String, items: Vec<RawOrderItem>) {
		// The trigger must never fire against a stale order
		let events = self.trigger.reset(self.store.order_id());
		self.publish_events(events);

		if !self.store.is_empty() {
			self.remove_session().await;
		}

		let (store, events) = ItemStore::hydrate(&order_id, items);
		tracing::info!(item_count = store.items().len(), "Order loaded");
		self.store = store;
		self.last_active_item = None;
		self.publish_events(events);
		self.after_mutation().await;
	}

	/// Publishes the outcome of a store application and runs the derivation
	/// pipeline when anything changed.
	async fn finish_apply(&mut self, outcome: Result<ApplyOutcome, StoreError>) {
		match outcome {
			Ok(outcome) => {
				let changed = outcome.changed;
				self.publish_events(outcome.events);
				if changed {
					self.after_mutation().await;
				}
			}
			Err(e) => {
				// Stale or malformed commands are a normal guard, not a fault
				tracing::warn!(error = %e, "Command rejected");
			}
		}
	}

	/// Handles an explicit operator print action.
	async fn handle_print_requested(&mut self) {
		if !self.arming_condition() {
			tracing::debug!("Explicit print rejected; order is not complete");
			return;
		}

		// Cancel any in-flight countdown so the automatic path cannot print
		// a second label
		self.trigger.mark_fired();
		self.fire_print().await;
		self.refresh_countdown();
	}

	/// Handles a message from the countdown task.
	async fn handle_trigger_message(&mut self, message: TriggerMessage) {
		match message {
			TriggerMessage::Tick {
				generation,
				seconds_left,
			} => {
				let events = self.trigger.handle_tick(generation, seconds_left);
				self.publish_events(events);
				self.refresh_countdown();
			}
			TriggerMessage::Elapsed { generation } => {
				if self.trigger.handle_elapsed(generation) {
					self.fire_print().await;
					self.refresh_countdown();
				}
			}
		}
	}

	/// Invokes the print callback and publishes the fired event.
	async fn fire_print(&mut self) {
		let order_id = self.store.order_id().to_string();
		self.event_bus
			.publish(WorkflowEvent::Print(PrintEvent::Fired {
				order_id: order_id.clone(),
			}))
			.ok();

		if let Err(e) = self.printer.print_ttn(&order_id).await {
			// Device failures surface in the log and as "no change"
			tracing::error!(order_id = %truncate_id(&order_id), error = %e, "Print failed");
		}
	}

	/// Recomputes every derived value after a mutation: completion with its
	/// integrity cross-check, the active item edge, the auto-print arming
	/// condition, the snapshot, and the persisted session.
	async fn after_mutation(&mut self) {
		let complete = self.checked_completion();

		let active = selection::select_active_item(self.store.items(), self.store.active_box_index())
			.map(|i| i.id.clone());
		if active != self.last_active_item {
			self.last_active_item = active.clone();
			self.event_bus
				.publish(WorkflowEvent::Item(ItemEvent::ActiveItemChanged {
					item_id: active,
				}))
				.ok();
		}

		let armed = complete || self.print_ready || self.debug_override;
		let order_id = self.store.order_id().to_string();
		let events = self.trigger.evaluate(armed, &order_id, &self.trigger_tx);
		self.publish_events(events);

		self.publish_snapshot(complete);
		self.persist_session(complete).await;
	}

	/// Order completion with the portion-accounting cross-check.
	///
	/// A divergence between the completion definitions is a data-integrity
	/// defect; the order is then treated as incomplete so nothing downstream
	/// (auto-print included) acts on corrupt data.
	fn checked_completion(&self) -> bool {
		if self.store.is_empty() {
			return false;
		}
		match weights::check_completion_integrity(
			self.store.items(),
			self.store.expected_total_portions(),
		) {
			Ok(complete) => complete,
			Err(e) => {
				tracing::error!(
					order_id = %truncate_id(self.store.order_id()),
					error = %e,
					"Completion accounting defect; treating order as incomplete"
				);
				false
			}
		}
	}

	fn publish_events(&self, events: Vec<WorkflowEvent>) {
		for event in events {
			self.event_bus.publish(event).ok();
		}
	}

	/// Rebuilds and publishes the display snapshot.
	fn publish_snapshot(&self, complete: bool) {
		let items = self.store.items();
		let active_box = self.store.active_box_index();
		let snapshot = PackingSnapshot {
			order_id: self.store.order_id().to_string(),
			active_item_id: self.last_active_item.clone(),
			active_box_index: active_box,
			current_box_weight: weights::current_box_weight(items, active_box),
			current_scale_weight: weights::current_scale_weight(items, active_box),
			total_order_weight: weights::total_order_weight(items),
			packed_portions: weights::packed_portions(items, active_box),
			total_packed_portions: weights::total_packed_portions(items),
			total_portions: weights::total_portions(items),
			order_complete: complete,
			has_next_box: crate::progression::has_next_box(items, active_box),
			countdown_seconds: self.trigger.seconds_left(),
		};
		self.snapshot_tx.send_replace(snapshot);
	}

	/// Updates only the countdown field of the published snapshot.
	fn refresh_countdown(&self) {
		let seconds = self.trigger.seconds_left();
		self.snapshot_tx.send_modify(|snapshot| {
			snapshot.countdown_seconds = seconds;
		});
	}

	/// Persists the in-flight session, or removes it once the order is
	/// complete. Storage failures are logged and otherwise ignored.
	async fn persist_session(&self, complete: bool) {
		if self.store.is_empty() {
			return;
		}
		let station_id = &self.config.station.id;
		if complete {
			self.remove_session().await;
		} else if let Err(e) = self
			.storage
			.store(StorageKey::Sessions.as_str(), station_id, &self.store.to_record())
			.await
		{
			tracing::warn!(error = %e, "Failed to persist session snapshot");
		}
	}

	async fn remove_session(&self) {
		if let Err(e) = self
			.storage
			.remove(StorageKey::Sessions.as_str(), &self.config.station.id)
			.await
		{
			tracing::warn!(error = %e, "Failed to remove session snapshot");
		}
	}

	/// The auto-print arming condition.
	fn arming_condition(&self) -> bool {
		self.checked_completion() || self.print_ready || self.debug_override
	}
}
