//! Auto-print trigger.
//!
//! A single-shot, delayed, externally cancellable action tied to order
//! completion. The trigger arms when the order completes (or an external
//! print-ready signal or debug override is raised), counts down whole
//! seconds for UI feedback, and requests the print callback exactly once per
//! armed session. Navigating away from a completed order resets the trigger
//! fully so the next order can arm and fire independently.
//!
//! The countdown runs as a spawned task owned through its JoinHandle; the
//! handle is aborted at every reset point so the callback can never fire
//! against a stale order. Messages from the task carry a generation counter,
//! making ticks queued before a reset harmlessly stale instead of a second
//! fire.

use packer_types::{PrintEvent, WorkflowEvent};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Duration;

/// States of the auto-print trigger, per order-view lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerState {
	/// Default state; the arming condition is false.
	Idle,
	/// The arming condition is true but auto-print is disabled, so the
	/// trigger waits for an explicit operator print.
	Armed,
	/// The countdown task is running.
	Counting,
	/// The print callback has been requested. Terminal for this order.
	Fired,
}

/// Messages sent by the countdown task back into the engine loop.
#[derive(Debug, Clone, Copy)]
pub enum TriggerMessage {
	/// One whole second of the countdown elapsed.
	Tick { generation: u64, seconds_left: u32 },
	/// The full delay elapsed; the callback should fire now.
	Elapsed { generation: u64 },
}

/// The auto-print trigger state machine.
pub struct AutoPrintTrigger {
	/// Whether the countdown starts on arming (`auto_print_on_complete`).
	enabled: bool,
	/// Delay between arming and the fire.
	delay: Duration,
	state: TriggerState,
	seconds_left: Option<u32>,
	/// Identifies the current armed session; messages from older countdown
	/// tasks are ignored.
	generation: u64,
	countdown: Option<JoinHandle<()>>,
}

impl AutoPrintTrigger {
	/// Creates a trigger with the given equipment configuration.
	pub fn new(enabled: bool, delay_ms: u64) -> Self {
		Self {
			enabled,
			delay: Duration::from_millis(delay_ms),
			state: TriggerState::Idle,
			seconds_left: None,
			generation: 0,
			countdown: None,
		}
	}

	/// Current trigger state.
	pub fn state(&self) -> TriggerState {
		self.state
	}

	/// Seconds remaining on the countdown, if counting.
	pub fn seconds_left(&self) -> Option<u32> {
		self.seconds_left
	}

	/// Whole seconds the countdown starts from.
	fn countdown_seconds(&self) -> u32 {
		self.delay.as_millis().div_ceil(1000) as u32
	}

	/// Re-evaluates the arming condition after a mutation.
	///
	/// Arms (and starts the countdown when auto-print is enabled) on the
	/// rising edge, resets fully on the falling edge, and does nothing while
	/// the condition holds steady. Returns the events to publish.
	pub fn evaluate(
		&mut self,
		armed: bool,
		order_id: &str,
		messages: &mpsc::UnboundedSender<TriggerMessage>,
	) -> Vec<WorkflowEvent> {
		match (armed, self.state) {
			(true, TriggerState::Idle) => {
				let mut events = vec![WorkflowEvent::Print(PrintEvent::Armed {
					order_id: order_id.to_string(),
				})];
				if self.enabled {
					self.state = TriggerState::Counting;
					let seconds = self.countdown_seconds();
					self.seconds_left = Some(seconds);
					events.push(WorkflowEvent::Print(PrintEvent::CountdownTick {
						seconds_left: seconds,
					}));
					self.spawn_countdown(messages.clone());
				} else {
					self.state = TriggerState::Armed;
				}
				events
			}
			(false, TriggerState::Idle) => Vec::new(),
			(false, _) => self.reset(order_id),
			(true, _) => Vec::new(),
		}
	}

	/// Resets the trigger to idle, cancelling any in-flight countdown and
	/// clearing the fired flag so a subsequent order can re-arm.
	pub fn reset(&mut self, order_id: &str) -> Vec<WorkflowEvent> {
		self.cancel();
		if self.state == TriggerState::Idle {
			return Vec::new();
		}
		self.state = TriggerState::Idle;
		self.seconds_left = None;
		vec![WorkflowEvent::Print(PrintEvent::Reset {
			order_id: order_id.to_string(),
		})]
	}

	/// Aborts the countdown task without touching the state machine.
	///
	/// Used on engine shutdown; stale messages are fenced off by the
	/// generation bump.
	pub fn cancel(&mut self) {
		self.generation += 1;
		if let Some(handle) = self.countdown.take() {
			handle.abort();
		}
	}

	/// Handles a countdown tick from the task.
	pub fn handle_tick(&mut self, generation: u64, seconds_left: u32) -> Vec<WorkflowEvent> {
		if generation != self.generation || self.state != TriggerState::Counting {
			return Vec::new();
		}
		self.seconds_left = Some(seconds_left);
		vec![WorkflowEvent::Print(PrintEvent::CountdownTick {
			seconds_left,
		})]
	}

	/// Handles the countdown elapsing.
	///
	/// Returns true exactly once per armed session; the caller performs the
	/// actual print. Stale or repeated messages return false.
	pub fn handle_elapsed(&mut self, generation: u64) -> bool {
		if generation != self.generation || self.state != TriggerState::Counting {
			return false;
		}
		self.state = TriggerState::Fired;
		self.seconds_left = None;
		self.countdown = None;
		true
	}

	/// Marks the trigger fired through an explicit operator print.
	///
	/// Cancels the countdown so the automatic path cannot fire a second
	/// label for the same armed session.
	pub fn mark_fired(&mut self) {
		self.cancel();
		if self.state != TriggerState::Idle {
			self.state = TriggerState::Fired;
		}
		self.seconds_left = None;
	}

	fn spawn_countdown(&mut self, messages: mpsc::UnboundedSender<TriggerMessage>) {
		self.generation += 1;
		let generation = self.generation;
		let total_seconds = self.countdown_seconds();
		let delay = self.delay;

		let handle = tokio::spawn(async move {
			for seconds_left in (1..total_seconds).rev() {
				tokio::time::sleep(Duration::from_secs(1)).await;
				if messages
					.send(TriggerMessage::Tick {
						generation,
						seconds_left,
					})
					.is_err()
				{
					return;
				}
			}

			// Remainder of the delay past the whole-second ticks
			let ticked = Duration::from_secs(u64::from(total_seconds.saturating_sub(1)));
			tokio::time::sleep(delay.saturating_sub(ticked)).await;
			messages.send(TriggerMessage::Elapsed { generation }).ok();
		});
		self.countdown = Some(handle);
	}
}

impl Drop for AutoPrintTrigger {
	fn drop(&mut self) {
		if let Some(handle) = self.countdown.take() {
			handle.abort();
		}
	}
}
