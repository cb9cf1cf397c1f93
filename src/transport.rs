//! Seam between the engine and the radio stack that hosts the HID service.

use crate::error::{ConnectionRejected, SecurityRejected};
use crate::report::ReportId;
use crate::security::PeerAddress;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransportError {
	/// No peer to notify.
	NotConnected,
	/// The report id has no characteristic.
	UnknownReport(ReportId),
	/// The stack is out of buffers, try again later.
	Busy,
	/// The stack rejected the call.
	Rejected,
}

/// What the engine needs from the GATT server. Every method is synchronous:
/// the value of a report is fully stored before [`notify`](Transport::notify) reads it.
pub trait Transport {
	/// Publishes the report map. Called once, before any report can flow.
	fn register_descriptor(&self, descriptor: &[u8]) -> Result<(), TransportError>;

	/// Replaces the stored value of an input report characteristic.
	fn set_report_value(&self, id: ReportId, data: &[u8]) -> Result<(), TransportError>;

	/// Pushes the stored value of `id` to the connected peer.
	fn notify(&self, id: ReportId) -> Result<(), TransportError>;

	/// Client configuration of `id` as the stack sees it. Delivery notifies only
	/// when this and the session flag are both set.
	fn is_notification_enabled(&self, id: ReportId) -> bool;

	/// Forces the client characteristic configuration of `id`. Some hosts never
	/// write it themselves and would otherwise never see a report.
	fn set_notifications_enabled(&self, id: ReportId, enabled: bool);
}

impl<T: Transport + ?Sized> Transport for &T {
	fn register_descriptor(&self, descriptor: &[u8]) -> Result<(), TransportError> {
		(**self).register_descriptor(descriptor)
	}

	fn set_report_value(&self, id: ReportId, data: &[u8]) -> Result<(), TransportError> {
		(**self).set_report_value(id, data)
	}

	fn notify(&self, id: ReportId) -> Result<(), TransportError> {
		(**self).notify(id)
	}

	fn is_notification_enabled(&self, id: ReportId) -> bool {
		(**self).is_notification_enabled(id)
	}

	fn set_notifications_enabled(&self, id: ReportId, enabled: bool) {
		(**self).set_notifications_enabled(id, enabled)
	}
}

/// What the transport reports back about the link. Implemented by the device so
/// the radio glue needs no knowledge of encoders or queues.
pub trait ConnectionEvents {
	fn on_connect(&self, peer: PeerAddress) -> Result<(), ConnectionRejected>;

	fn on_disconnect(&self, peer: PeerAddress);

	/// The peer wrote the client characteristic configuration of `id`.
	fn on_notifications_changed(&self, id: ReportId, enabled: bool);

	/// The peer wrote an output report.
	fn on_output_report(&self, id: ReportId, data: &[u8]);

	fn on_authentication_complete(&self, success: bool, peer: PeerAddress) -> Result<(), SecurityRejected>;
}
