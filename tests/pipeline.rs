use std::cell::RefCell;

use embassy_futures::block_on;
use embassy_futures::select::select;
use embassy_futures::yield_now;
use hidlink::joystick;
use hidlink::prelude::*;

const HOST: PeerAddress = PeerAddress([0x10, 0x20, 0x30, 0x40, 0x50, 0x60]);
const OTHER: PeerAddress = PeerAddress([0x66, 0x55, 0x44, 0x33, 0x22, 0x11]);

const KEYBOARD: ReportId = ReportId(1);
const POINTER: ReportId = ReportId(2);
const JOYSTICK: ReportId = ReportId(3);

#[derive(Debug, Clone, PartialEq, Eq)]
enum Call {
	Descriptor(usize),
	Store(ReportId, Vec<u8>),
	Notify(ReportId),
	Enable(ReportId, bool),
}

#[derive(Default)]
struct Recorder {
	calls: RefCell<Vec<Call>>,
	refuse_descriptor: bool,
}

impl Recorder {
	fn calls(&self) -> Vec<Call> {
		self.calls.borrow().clone()
	}

	fn take(&self) -> Vec<Call> {
		self.calls.borrow_mut().drain(..).collect()
	}

	/// What the peer actually received, as (report id, payload).
	fn notified(&self) -> Vec<(ReportId, Vec<u8>)> {
		let mut stored: Vec<(ReportId, Vec<u8>)> = Vec::new();
		let mut out = Vec::new();
		for call in self.calls.borrow().iter() {
			match call {
				Call::Store(id, data) => {
					stored.retain(|(i, _)| i != id);
					stored.push((*id, data.clone()));
				},
				Call::Notify(id) => {
					let (_, data) = stored.iter().find(|(i, _)| i == id).expect("notify before store");
					out.push((*id, data.clone()));
				},
				_ => {},
			}
		}
		out
	}
}

impl Transport for Recorder {
	fn register_descriptor(&self, descriptor: &[u8]) -> Result<(), TransportError> {
		if self.refuse_descriptor {
			return Err(TransportError::Rejected);
		}
		self.calls.borrow_mut().push(Call::Descriptor(descriptor.len()));
		Ok(())
	}

	fn set_report_value(&self, id: ReportId, data: &[u8]) -> Result<(), TransportError> {
		self.calls.borrow_mut().push(Call::Store(id, data.to_vec()));
		Ok(())
	}

	fn notify(&self, id: ReportId) -> Result<(), TransportError> {
		self.calls.borrow_mut().push(Call::Notify(id));
		Ok(())
	}

	fn is_notification_enabled(&self, id: ReportId) -> bool {
		let mut enabled = false;
		for call in self.calls.borrow().iter() {
			if let Call::Enable(i, e) = call {
				if *i == id {
					enabled = *e;
				}
			}
		}
		enabled
	}

	fn set_notifications_enabled(&self, id: ReportId, enabled: bool) {
		self.calls.borrow_mut().push(Call::Enable(id, enabled));
	}
}

type Device = HidDevice<Recorder, StaticPasskey>;

fn config(joystick: bool) -> HidConfig {
	HidConfig {
		classes: ClassesConfig {
			keyboard: true,
			pointer: true,
			joystick,
		},
		..Default::default()
	}
}

fn device(joystick: bool) -> Device {
	HidDevice::init(config(joystick), Recorder::default(), StaticPasskey::default()).unwrap()
}

async fn settle() {
	for _ in 0..16 {
		yield_now().await;
	}
}

/// Runs `scenario` next to the delivery loops of `device`.
fn with_delivery<F: core::future::Future<Output = ()>>(device: &Device, scenario: F) {
	block_on(select(device.run(), scenario));
}

#[test]
fn init_registers_the_report_map() {
	let device = device(true);
	assert_eq!(device.transport().calls(), [Call::Descriptor(device.descriptor().bytes().len())]);
	assert_eq!(device.state(), ConnectionState::Idle);
}

#[test]
fn init_fails_fast() {
	let mut bad = config(true);
	bad.classes.pointer = false;
	let err = HidDevice::init(bad, Recorder::default(), StaticPasskey::default()).err();
	assert_eq!(err, Some(InitError::Descriptor(DescriptorConsistencyError::JoystickWithoutPointer)));

	let refusing = Recorder {
		refuse_descriptor: true,
		..Default::default()
	};
	let err = HidDevice::init(config(false), refusing, StaticPasskey::default()).err();
	assert_eq!(err, Some(InitError::Transport(TransportError::Rejected)));
}

#[test]
fn notifications_are_enabled_before_the_first_notify() {
	let device = device(true);
	with_delivery(&device, async {
		device.submit_key(KeyEvent::tap(0x04, KeyModifiers::NONE)).unwrap();
		device.on_connect(HOST).unwrap();
		device.submit_pointer(PointerEvent::motion(1, 1)).unwrap();
		device.submit_axis(AxisEvent::default()).unwrap();
		settle().await;
	});

	let calls = device.transport().calls();
	let first_notify = calls.iter().position(|c| matches!(c, Call::Notify(_))).unwrap();
	for id in [KEYBOARD, POINTER, JOYSTICK] {
		let enabled = calls.iter().position(|c| *c == Call::Enable(id, true)).unwrap();
		assert!(enabled < first_notify, "{:?}", id);
	}
	// The key queued before the connection was discarded.
	assert!(!calls.iter().any(|c| matches!(c, Call::Store(KEYBOARD, _))));
}

#[test]
fn keyboard_tap_is_two_reports() {
	let device = device(false);
	with_delivery(&device, async {
		device.on_connect(HOST).unwrap();
		device.submit_key(KeyEvent::tap(0x0b, KeyModifiers::LEFT_SHIFT)).unwrap();
		settle().await;
	});

	assert_eq!(
		device.transport().notified(),
		[(KEYBOARD, vec![0x02, 0, 0x0b, 0, 0, 0, 0, 0]), (KEYBOARD, vec![0; 8])]
	);
}

#[test]
fn pointer_motion_bytes() {
	let device = device(false);
	with_delivery(&device, async {
		device.on_connect(HOST).unwrap();
		device.submit_pointer(PointerEvent::motion(50, 0)).unwrap();
		device.submit_pointer(PointerEvent::motion(-50, 0)).unwrap();
		settle().await;
	});

	assert_eq!(
		device.transport().notified(),
		[(POINTER, vec![0x00, 50, 0x00, 0x00]), (POINTER, vec![0x00, 0xce, 0x00, 0x00])]
	);
}

#[test]
fn reports_follow_enqueue_order() {
	let device = device(false);
	with_delivery(&device, async {
		device.on_connect(HOST).unwrap();
		for x in 1..=3 {
			device.submit_pointer(PointerEvent::motion(x, 0)).unwrap();
		}
		settle().await;
	});

	let xs: Vec<u8> = device.transport().notified().iter().map(|(_, data)| data[1]).collect();
	assert_eq!(xs, [1, 2, 3]);
}

#[test]
fn every_report_has_its_declared_length() {
	let device = device(true);
	with_delivery(&device, async {
		device.on_connect(HOST).unwrap();
		device.submit_text("Hello, World!").unwrap();
		device.submit_pointer(PointerEvent::scroll(-3)).unwrap();
		let mut axis = AxisEvent::default();
		axis.axes = [1023, 0, 512, 7];
		device.submit_axis(axis).unwrap();
		settle().await;
	});

	let stored = device.transport().calls();
	assert!(stored.len() > 3);
	for call in stored {
		if let Call::Store(id, data) = call {
			let class = DeviceClass::from_report_id(id).unwrap();
			assert_eq!(Some(data.len()), device.descriptor().input_len(class), "{:?}", class);
		}
	}
}

#[test]
fn out_of_range_event_is_dropped_and_delivery_continues() {
	let device = device(false);
	with_delivery(&device, async {
		device.on_connect(HOST).unwrap();
		device.submit_pointer(PointerEvent::motion(i8::MIN, 0)).unwrap();
		device.submit_pointer(PointerEvent::motion(5, 0)).unwrap();
		settle().await;
	});

	assert_eq!(device.transport().notified(), [(POINTER, vec![0, 5, 0, 0])]);
}

#[test]
fn thirty_third_event_is_refused() {
	let device = device(false);
	for _ in 0..32 {
		device.submit_pointer(PointerEvent::motion(1, 0)).unwrap();
	}
	assert_eq!(
		device.submit_pointer(PointerEvent::motion(1, 0)),
		Err(SubmitError::QueueFull(QueueFullError {
			class: DeviceClass::Pointer
		}))
	);
	// Other classes have their own room.
	assert!(device.submit_key(KeyEvent::tap(0x04, KeyModifiers::NONE)).is_ok());
}

#[test]
fn disconnect_stores_neutral_reports() {
	let device = device(true);
	with_delivery(&device, async {
		device.on_connect(HOST).unwrap();
		device.submit_key(KeyEvent::press(0x04, KeyModifiers::NONE)).unwrap();
		device.submit_pointer(PointerEvent::motion(3, 3).with_buttons(PointerButtons::LEFT)).unwrap();
		settle().await;
		device.transport().take();

		device.on_disconnect(HOST);
		settle().await;
	});

	let calls = device.transport().calls();
	assert!(calls.contains(&Call::Store(KEYBOARD, vec![0; 8])));
	assert!(calls.contains(&Call::Store(POINTER, vec![0; 4])));
	let hat_centered = calls
		.iter()
		.any(|c| matches!(c, Call::Store(JOYSTICK, data) if data[4] == 0x0f && data.iter().enumerate().all(|(i, &b)| i == 4 || b == 0)));
	assert!(hat_centered);
	// The session is gone, nothing is pushed to the peer.
	assert!(!calls.iter().any(|c| matches!(c, Call::Notify(_))));
	assert_eq!(device.state(), ConnectionState::Idle);
}

#[test]
fn reconnect_does_not_replay_stale_events() {
	let device = device(false);
	with_delivery(&device, async {
		device.on_connect(HOST).unwrap();
		settle().await;
		device.on_disconnect(HOST);
		settle().await;

		// Nobody listens: these must not show up in the next session.
		device.submit_key(KeyEvent::tap(0x05, KeyModifiers::NONE)).unwrap();
		device.submit_pointer(PointerEvent::motion(9, 9)).unwrap();
		device.transport().take();

		device.on_connect(HOST).unwrap();
		let session = device.session().unwrap();
		assert!(session.notifications_enabled(DeviceClass::Keyboard));
		assert!(!session.authenticated);

		device.submit_pointer(PointerEvent::motion(1, 0)).unwrap();
		settle().await;
	});

	assert_eq!(device.transport().notified(), [(POINTER, vec![0, 1, 0, 0])]);
}

#[test]
fn quick_reconnect_still_delivers() {
	let device = device(false);
	with_delivery(&device, async {
		// All three happen before any delivery loop runs again.
		device.on_connect(HOST).unwrap();
		device.on_disconnect(HOST);
		device.on_connect(HOST).unwrap();

		device.submit_pointer(PointerEvent::motion(7, 0)).unwrap();
		settle().await;

		device.on_disconnect(HOST);
		settle().await;
		device.on_connect(OTHER).unwrap();
		device.submit_pointer(PointerEvent::motion(8, 0)).unwrap();
		settle().await;
	});

	let pointer: Vec<Vec<u8>> = device
		.transport()
		.notified()
		.into_iter()
		.filter(|(id, _)| *id == POINTER)
		.map(|(_, data)| data)
		.collect();
	assert_eq!(pointer, [vec![0, 7, 0, 0], vec![0, 8, 0, 0]]);
	assert_eq!(device.state(), ConnectionState::Connected);
}

#[test]
fn excluded_class_refuses_events() {
	let device = device(false);
	assert_eq!(
		device.submit_axis(AxisEvent::default()),
		Err(SubmitError::ClassNotIncluded(DeviceClass::Joystick))
	);

	let keyboard_only = HidConfig {
		classes: ClassesConfig {
			keyboard: true,
			pointer: false,
			joystick: false,
		},
		..Default::default()
	};
	let device = HidDevice::init(keyboard_only, Recorder::default(), StaticPasskey::default()).unwrap();
	assert_eq!(
		device.submit_pointer(PointerEvent::motion(1, 0)),
		Err(SubmitError::ClassNotIncluded(DeviceClass::Pointer))
	);
	assert!(device.submit_key(KeyEvent::tap(0x04, KeyModifiers::NONE)).is_ok());
}

#[test]
fn second_peer_is_rejected_and_the_session_survives() {
	let device = device(false);
	with_delivery(&device, async {
		device.on_connect(HOST).unwrap();
		assert_eq!(device.on_connect(OTHER), Err(ConnectionRejected { active: HOST }));
		device.on_disconnect(OTHER);

		device.submit_pointer(PointerEvent::motion(2, 0)).unwrap();
		settle().await;
	});

	assert_eq!(device.session().map(|s| s.peer), Some(HOST));
	assert_eq!(device.state(), ConnectionState::Connected);
	assert_eq!(device.transport().notified(), [(POINTER, vec![0, 2, 0, 0])]);
}

#[test]
fn peer_can_turn_notifications_off() {
	let device = device(false);
	with_delivery(&device, async {
		device.on_connect(HOST).unwrap();
		device.on_notifications_changed(POINTER, false);
		device.submit_pointer(PointerEvent::motion(4, 0)).unwrap();
		settle().await;
	});

	let calls = device.transport().calls();
	assert!(calls.contains(&Call::Store(POINTER, vec![0, 4, 0, 0])));
	assert!(!calls.contains(&Call::Notify(POINTER)));
}

#[test]
fn unsubscribed_transport_gets_no_notification() {
	let device = device(false);
	with_delivery(&device, async {
		device.on_connect(HOST).unwrap();
		// The stack lost the client configuration, the session still has it.
		device.transport().set_notifications_enabled(POINTER, false);
		device.submit_pointer(PointerEvent::motion(6, 0)).unwrap();
		settle().await;
	});

	let calls = device.transport().calls();
	assert!(calls.contains(&Call::Store(POINTER, vec![0, 6, 0, 0])));
	assert!(!calls.contains(&Call::Notify(POINTER)));
}

#[test]
fn joystick_report_unpacks_to_the_event() {
	let device = device(true);
	let mut event = AxisEvent {
		hat: Hat::DownLeft,
		axes: [0, 1023, 341, 682],
		sliders: [1, 1022],
		..Default::default()
	};
	event.set_button(0, true);
	event.set_button(31, true);

	with_delivery(&device, async {
		device.on_connect(HOST).unwrap();
		device.submit_axis(event).unwrap();
		settle().await;
	});

	let notified = device.transport().notified();
	assert_eq!(notified.len(), 1);
	assert_eq!(joystick::decode(&notified[0].1).unwrap(), event);
}

#[test]
fn text_stops_at_the_first_unmappable_character() {
	let device = device(false);
	assert_eq!(device.submit_text("Hi!"), Ok(3));
	assert_eq!(
		device.submit_text("a\u{e9}b"),
		Err(SubmitTextError::Unmappable { index: 1, ch: '\u{e9}' })
	);

	with_delivery(&device, async {
		device.on_connect(HOST).unwrap();
		settle().await;
	});
	// Connecting drained the queue.
	assert!(device.transport().notified().is_empty());
}

#[test]
fn host_leds_are_decoded() {
	let device = device(false);
	device.on_output_report(KEYBOARD, &[0x02]);
	assert!(device.keyboard_leds().caps_lock);
	assert!(!device.keyboard_leds().num_lock);

	// Wrong report id or length is ignored.
	device.on_output_report(POINTER, &[0x01]);
	device.on_output_report(KEYBOARD, &[0x01, 0x00]);
	assert_eq!(device.keyboard_leds().bits(), 0x02);
}

#[test]
fn failed_pairing_is_recorded_without_dropping_the_session() {
	let device = device(false);
	with_delivery(&device, async {
		device.on_connect(HOST).unwrap();
		settle().await;
	});

	assert_eq!(
		device.on_authentication_complete(false, HOST),
		Err(SecurityRejected { peer: HOST })
	);
	assert_eq!(device.session().map(|s| s.authenticated), Some(false));
	assert_eq!(device.policy().last_outcome().map(|o| o.success), Some(false));

	assert!(device.on_authentication_complete(true, HOST).is_ok());
	assert_eq!(device.session().map(|s| s.authenticated), Some(true));
}
