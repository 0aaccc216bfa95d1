//! Event bus for workflow events.
//!
//! A thin wrapper around a tokio broadcast channel. Publishing is
//! fire-and-forget: consumers that lag far enough behind miss events, and
//! publishing with no subscribers at all is not an error.

use packer_types::WorkflowEvent;
use tokio::sync::broadcast;

/// Broadcast bus carrying workflow events to any number of subscribers.
#[derive(Clone)]
pub struct EventBus {
	sender: broadcast::Sender<WorkflowEvent>,
}

impl EventBus {
	/// Creates a new event bus with the given channel capacity.
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);
		Self { sender }
	}

	/// Publishes an event to all current subscribers.
	///
	/// Returns the number of subscribers the event reached; an error means
	/// there were none, which callers are free to ignore.
	pub fn publish(
		&self,
		event: WorkflowEvent,
	) -> Result<usize, broadcast::error::SendError<WorkflowEvent>> {
		self.sender.send(event)
	}

	/// Creates a new subscription to the bus.
	pub fn subscribe(&self) -> broadcast::Receiver<WorkflowEvent> {
		self.sender.subscribe()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use packer_types::{ItemEvent, WorkflowEvent};

	#[tokio::test]
	async fn test_publish_without_subscribers_is_not_fatal() {
		let bus = EventBus::new(16);
		let result = bus.publish(WorkflowEvent::Item(ItemEvent::ActiveItemChanged {
			item_id: None,
		}));
		assert!(result.is_err());
	}

	#[tokio::test]
	async fn test_all_subscribers_receive_events() {
		let bus = EventBus::new(16);
		let mut first = bus.subscribe();
		let mut second = bus.subscribe();

		bus.publish(WorkflowEvent::Item(ItemEvent::ActiveItemChanged {
			item_id: Some("a".to_string()),
		}))
		.unwrap();

		for rx in [&mut first, &mut second] {
			let event = rx.recv().await.unwrap();
			assert!(matches!(
				event,
				WorkflowEvent::Item(ItemEvent::ActiveItemChanged { item_id: Some(id) }) if id == "a"
			));
		}
	}
}
