use core::cell::Cell;

use embassy_futures::join::join3;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use hidlink_events::{keymap, AxisEvent, KeyEvent, PointerEvent};

use crate::config::HidConfig;
use crate::delivery::deliver;
use crate::descriptor::ReportDescriptor;
use crate::encoder::Encoder;
use crate::error::{ConnectionRejected, InitError, QueueFullError, SecurityRejected, SubmitError, SubmitTextError};
use crate::joystick::JoystickEncoder;
use crate::keyboard::{KeyboardEncoder, KeyboardLeds};
use crate::pointer::PointerEncoder;
use crate::queue::{EventQueue, EventQueues};
use crate::report::{DeviceClass, ReportId};
use crate::security::{PairingPolicy, PeerAddress};
use crate::session::{ConnectionController, ConnectionState, Session};
use crate::transport::{ConnectionEvents, Transport};

/// Everything one HID peripheral owns: report map, queues, session, the
/// transport it publishes through and the pairing policy.
pub struct HidDevice<T: Transport, P: PairingPolicy> {
	config: HidConfig,
	descriptor: ReportDescriptor,
	queues: EventQueues,
	controller: ConnectionController,
	transport: T,
	policy: P,
	leds: Mutex<CriticalSectionRawMutex, Cell<KeyboardLeds>>,
}

impl<T: Transport, P: PairingPolicy> HidDevice<T, P> {
	/// Builds and checks the report map and registers it with the transport.
	/// Nothing can be advertised if this fails.
	pub fn init(config: HidConfig, transport: T, policy: P) -> Result<Self, InitError> {
		let descriptor = ReportDescriptor::build(&config.classes)?;
		transport
			.register_descriptor(descriptor.bytes())
			.map_err(InitError::Transport)?;

		info!(
			"HID ready: keyboard={} pointer={} joystick={}",
			config.classes.keyboard,
			config.classes.pointer,
			config.classes.joystick
		);

		Ok(Self {
			config,
			descriptor,
			queues: EventQueues::new(),
			controller: ConnectionController::new(),
			transport,
			policy,
			leds: Mutex::new(Cell::new(KeyboardLeds::default())),
		})
	}

	pub fn config(&self) -> &HidConfig {
		&self.config
	}

	pub fn descriptor(&self) -> &ReportDescriptor {
		&self.descriptor
	}

	pub fn transport(&self) -> &T {
		&self.transport
	}

	pub fn policy(&self) -> &P {
		&self.policy
	}

	pub fn state(&self) -> ConnectionState {
		self.controller.state()
	}

	pub fn session(&self) -> Option<Session> {
		self.controller.session()
	}

	pub fn submit_key(&self, event: KeyEvent) -> Result<(), QueueFullError> {
		self.queues.keyboard.enqueue(event)
	}

	/// Fails with [`SubmitError::ClassNotIncluded`] when the report map has no pointer report.
	pub fn submit_pointer(&self, event: PointerEvent) -> Result<(), SubmitError> {
		self.check_included(DeviceClass::Pointer)?;
		Ok(self.queues.pointer.enqueue(event)?)
	}

	pub fn submit_axis(&self, event: AxisEvent) -> Result<(), SubmitError> {
		self.check_included(DeviceClass::Joystick)?;
		Ok(self.queues.joystick.enqueue(event)?)
	}

	fn check_included(&self, class: DeviceClass) -> Result<(), SubmitError> {
		if self.config.classes.includes(class) {
			Ok(())
		} else {
			warn!("{:?} event refused, class not included", class);
			Err(SubmitError::ClassNotIncluded(class))
		}
	}

	/// Queues one tap per character of `text`. Stops at the first character the
	/// US layout cannot type or when the queue fills; what was queued stays queued.
	pub fn submit_text(&self, text: &str) -> Result<usize, SubmitTextError> {
		for (index, ch) in text.chars().enumerate() {
			let event = keymap::ascii(ch).ok_or(SubmitTextError::Unmappable { index, ch })?;
			self.submit_key(event)?;
		}
		Ok(text.chars().count())
	}

	pub fn keyboard_leds(&self) -> KeyboardLeds {
		self.leds.lock(|leds| leds.get())
	}

	/// Delivers keyboard reports, one session at a time.
	pub async fn run_keyboard(&self) {
		self.run_class(&mut KeyboardEncoder::new(), &self.queues.keyboard).await
	}

	pub async fn run_pointer(&self) {
		self.run_class(&mut PointerEncoder, &self.queues.pointer).await
	}

	pub async fn run_joystick(&self) {
		self.run_class(&mut JoystickEncoder, &self.queues.joystick).await
	}

	/// All delivery loops of the included classes. Never returns.
	pub async fn run(&self) {
		join3(self.run_keyboard(), self.run_pointer(), self.run_joystick()).await;
	}

	async fn run_class<E: Encoder>(&self, encoder: &mut E, queue: &EventQueue<E::Event>) {
		if !self.config.classes.includes(E::CLASS) {
			debug!("{:?} not included, no delivery", E::CLASS);
			return;
		}

		let mut served = 0;
		loop {
			served = self.controller.wait_session(E::CLASS, served).await;
			deliver(encoder, queue, &self.controller, &self.transport, served).await;
		}
	}
}

impl<T: Transport, P: PairingPolicy> ConnectionEvents for HidDevice<T, P> {
	/// Opens the session, discards whatever was queued while nobody listened,
	/// enables notifications for every included report and only then lets the
	/// delivery loops go.
	fn on_connect(&self, peer: PeerAddress) -> Result<(), ConnectionRejected> {
		self.controller.connect(peer)?;
		self.queues.drain();

		for class in self.config.classes.included() {
			let id = class.report_id();
			self.transport.set_notifications_enabled(id, true);
			self.controller.set_notifications(id, true);
		}

		self.controller.start(&self.config.classes);
		Ok(())
	}

	fn on_disconnect(&self, peer: PeerAddress) {
		self.controller.disconnect(peer, &self.config.classes);
	}

	fn on_notifications_changed(&self, id: ReportId, enabled: bool) {
		if self.controller.set_notifications(id, enabled) {
			debug!("Notifications for {:?} {}", id, if enabled { "on" } else { "off" });
		}
	}

	fn on_output_report(&self, id: ReportId, data: &[u8]) {
		if id != DeviceClass::Keyboard.report_id() {
			warn!("Output report for {:?} ignored", id);
			return;
		}

		match KeyboardLeds::decode(data) {
			Some(leds) => {
				info!("Keyboard LEDs: {:?}", leds);
				self.leds.lock(|l| l.set(leds));
			},
			None => warn!("Keyboard output report of {} bytes", data.len()),
		}
	}

	fn on_authentication_complete(&self, success: bool, peer: PeerAddress) -> Result<(), SecurityRejected> {
		self.controller.set_authenticated(peer, success);
		self.policy.on_authentication_complete(success, peer)
	}
}
