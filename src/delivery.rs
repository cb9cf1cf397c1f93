//! Per class worker: queue, encoder, transport.

use crate::encoder::{Encoder, Reports};
use crate::queue::EventQueue;
use crate::report::{DeviceClass, Report};
use crate::session::ConnectionController;
use crate::transport::Transport;

/// Runs the delivery of session `generation` for `E::CLASS`.
///
/// Every event is encoded and each resulting report is stored, then notified
/// if the session has notifications enabled for it. Events that fail to
/// encode are logged and dropped. Once the session is over no further event
/// is taken from the queue and a single neutral report goes out. A stop left
/// over from an earlier session is ignored.
pub async fn deliver<E, T>(
	encoder: &mut E,
	queue: &EventQueue<E::Event>,
	controller: &ConnectionController,
	transport: &T,
	generation: u32,
) where
	E: Encoder,
	T: Transport,
{
	let class = E::CLASS;
	let stop = controller.stop_signal(class);
	controller.delivery_started(class);
	debug!("{:?} delivery started for session {}", class, generation);

	let mut reports = Reports::new();
	loop {
		let Some(event) = queue.dequeue_or_stop(stop).await else {
			if controller.is_active(generation) {
				trace!("{:?} stop from an earlier session ignored", class);
				continue;
			}
			break;
		};

		reports.clear();
		match encoder.encode(&event, &mut reports) {
			Ok(()) => {
				for report in reports.iter() {
					publish(transport, controller, class, report);
				}
			},
			Err(e) => warn!("Dropping {:?} event: {:?}", class, e),
		}
	}

	let neutral = encoder.neutral();
	publish(transport, controller, class, &neutral);

	debug!("{:?} delivery stopped", class);
	controller.delivery_stopped(class);
}

/// Stores `report` and notifies it when both the session and the transport's
/// client configuration want it. The value is completely written before the
/// notification is triggered.
pub fn publish<T: Transport>(transport: &T, controller: &ConnectionController, class: DeviceClass, report: &Report) {
	if let Err(e) = transport.set_report_value(report.id(), report.as_bytes()) {
		warn!("Storing {:?} failed: {:?}", report.id(), e);
		return;
	}

	if !controller.notifications_enabled(class) {
		trace!("{:?} notifications disabled, stored only", class);
		return;
	}
	if !transport.is_notification_enabled(report.id()) {
		debug!("{:?} not subscribed on the transport, stored only", report.id());
		return;
	}

	match transport.notify(report.id()) {
		Ok(()) => trace!("Notified {:?}", report),
		Err(e) => warn!("Notifying {:?} failed: {:?}", report.id(), e),
	}
}
