use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use hidlink_events::{AxisEvent, KeyEvent, PointerEvent};

use crate::error::QueueFullError;
use crate::report::DeviceClass;

pub const QUEUE_CAPACITY: usize = 32;

pub type StopSignal = Signal<CriticalSectionRawMutex, ()>;

/// Bounded FIFO between the producers of one class and its delivery loop.
/// Producers never wait: a full queue refuses the event.
pub struct EventQueue<E> {
	class: DeviceClass,
	channel: Channel<CriticalSectionRawMutex, E, QUEUE_CAPACITY>,
}

impl<E> EventQueue<E> {
	pub const fn new(class: DeviceClass) -> Self {
		Self {
			class,
			channel: Channel::new(),
		}
	}

	pub fn class(&self) -> DeviceClass {
		self.class
	}

	pub fn enqueue(&self, event: E) -> Result<(), QueueFullError> {
		self.channel.try_send(event).map_err(|_| {
			warn!("{:?} queue full, event dropped", self.class);
			QueueFullError { class: self.class }
		})
	}

	/// Waits for the next event.
	pub async fn dequeue(&self) -> E {
		self.channel.receive().await
	}

	/// Waits for the next event unless `stop` fires first. A pending stop wins
	/// over a pending event, so nothing more is taken from the queue after it.
	pub async fn dequeue_or_stop(&self, stop: &StopSignal) -> Option<E> {
		match select(stop.wait(), self.channel.receive()).await {
			Either::First(()) => None,
			Either::Second(event) => Some(event),
		}
	}

	pub fn try_dequeue(&self) -> Option<E> {
		self.channel.try_receive().ok()
	}

	/// Throws away everything queued and returns how many events that was.
	pub fn clear(&self) -> usize {
		let mut dropped = 0;
		while self.channel.try_receive().is_ok() {
			dropped += 1;
		}
		dropped
	}
}

/// One queue per device class.
pub struct EventQueues {
	pub keyboard: EventQueue<KeyEvent>,
	pub pointer: EventQueue<PointerEvent>,
	pub joystick: EventQueue<AxisEvent>,
}

impl EventQueues {
	pub const fn new() -> Self {
		Self {
			keyboard: EventQueue::new(DeviceClass::Keyboard),
			pointer: EventQueue::new(DeviceClass::Pointer),
			joystick: EventQueue::new(DeviceClass::Joystick),
		}
	}

	/// Empties every queue, logging what was discarded.
	pub fn drain(&self) -> usize {
		let mut total = 0;
		for (class, dropped) in [
			(DeviceClass::Keyboard, self.keyboard.clear()),
			(DeviceClass::Pointer, self.pointer.clear()),
			(DeviceClass::Joystick, self.joystick.clear()),
		] {
			if dropped > 0 {
				info!("Discarded {} stale {:?} events", dropped, class);
			}
			total += dropped;
		}
		total
	}
}

impl Default for EventQueues {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use embassy_futures::block_on;
	use hidlink_events::KeyModifiers;

	#[test]
	fn fifo_per_class() {
		let queue = EventQueue::new(DeviceClass::Pointer);
		for x in 1..=3 {
			queue.enqueue(PointerEvent::motion(x, 0)).unwrap();
		}
		for x in 1..=3 {
			assert_eq!(block_on(queue.dequeue()).x, x);
		}
		assert_eq!(queue.try_dequeue(), None);
	}

	#[test]
	fn thirty_third_event_is_refused() {
		let queue = EventQueue::new(DeviceClass::Keyboard);
		for usage in 0..QUEUE_CAPACITY as u8 {
			queue.enqueue(KeyEvent::tap(usage, KeyModifiers::NONE)).unwrap();
		}
		assert_eq!(
			queue.enqueue(KeyEvent::tap(0x50, KeyModifiers::NONE)),
			Err(QueueFullError {
				class: DeviceClass::Keyboard
			})
		);

		// The 32 queued events are intact and in order.
		for usage in 0..QUEUE_CAPACITY as u8 {
			assert_eq!(queue.try_dequeue().map(|e| e.usage), Some(usage));
		}
		assert_eq!(queue.try_dequeue(), None);
	}

	#[test]
	fn pending_stop_wins_over_pending_event() {
		let queue = EventQueue::new(DeviceClass::Joystick);
		let stop = StopSignal::new();
		queue.enqueue(AxisEvent::default()).unwrap();
		stop.signal(());

		assert_eq!(block_on(queue.dequeue_or_stop(&stop)), None);
		assert_eq!(block_on(queue.dequeue_or_stop(&stop)), Some(AxisEvent::default()));
	}

	#[test]
	fn drain_empties_every_queue() {
		let queues = EventQueues::new();
		queues.keyboard.enqueue(KeyEvent::tap(4, KeyModifiers::NONE)).unwrap();
		queues.pointer.enqueue(PointerEvent::motion(1, 1)).unwrap();
		queues.pointer.enqueue(PointerEvent::motion(2, 2)).unwrap();

		assert_eq!(queues.drain(), 3);
		assert_eq!(queues.drain(), 0);
	}
}
