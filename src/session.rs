use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::signal::Signal;

use crate::config::ClassesConfig;
use crate::error::ConnectionRejected;
use crate::queue::StopSignal;
use crate::report::{DeviceClass, ReportId};
use crate::security::PeerAddress;

pub type StartSignal = Signal<CriticalSectionRawMutex, ()>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConnectionState {
	Idle,
	Connected,
	/// The peer is gone but delivery loops are still sending their neutral reports.
	Disconnected,
}

/// The connected peer. Exactly one at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Session {
	pub peer: PeerAddress,
	notify: [bool; DeviceClass::COUNT],
	pub authenticated: bool,
}

impl Session {
	/// Every notification flag starts disabled.
	pub fn new(peer: PeerAddress) -> Self {
		Self {
			peer,
			notify: [false; DeviceClass::COUNT],
			authenticated: false,
		}
	}

	pub fn notifications_enabled(&self, class: DeviceClass) -> bool {
		self.notify[class.index()]
	}

	pub fn set_notifications(&mut self, class: DeviceClass, enabled: bool) {
		self.notify[class.index()] = enabled;
	}
}

struct Inner {
	state: ConnectionState,
	session: Option<Session>,
	/// Bumped on every accepted connect, so loops can tell sessions apart.
	generation: u32,
	running: [bool; DeviceClass::COUNT],
}

/// Owns the session and tells delivery loops when to start and stop.
pub struct ConnectionController {
	inner: Mutex<CriticalSectionRawMutex, RefCell<Inner>>,
	start: [StartSignal; DeviceClass::COUNT],
	stop: [StopSignal; DeviceClass::COUNT],
}

impl ConnectionController {
	pub const fn new() -> Self {
		Self {
			inner: Mutex::new(RefCell::new(Inner {
				state: ConnectionState::Idle,
				session: None,
				generation: 0,
				running: [false; DeviceClass::COUNT],
			})),
			start: [StartSignal::new(), StartSignal::new(), StartSignal::new()],
			stop: [StopSignal::new(), StopSignal::new(), StopSignal::new()],
		}
	}

	fn with<R>(&self, f: impl FnOnce(&mut Inner) -> R) -> R {
		self.inner.lock(|inner| f(&mut inner.borrow_mut()))
	}

	pub fn state(&self) -> ConnectionState {
		self.with(|inner| inner.state)
	}

	pub fn session(&self) -> Option<Session> {
		self.with(|inner| inner.session)
	}

	/// Opens a session for `peer`. A second peer is turned away and the open
	/// session is left untouched.
	pub fn connect(&self, peer: PeerAddress) -> Result<(), ConnectionRejected> {
		self.with(|inner| {
			if let Some(active) = &inner.session {
				warn!("Rejecting {:?}, already connected to {:?}", peer, active.peer);
				return Err(ConnectionRejected { active: active.peer });
			}

			inner.session = Some(Session::new(peer));
			inner.state = ConnectionState::Connected;
			inner.generation = inner.generation.wrapping_add(1);
			info!("Connected to {:?} (session {})", peer, inner.generation);
			Ok(())
		})
	}

	/// Updates the session's flag for report `id`. Returns false when there is
	/// no session or `id` belongs to no class.
	pub fn set_notifications(&self, id: ReportId, enabled: bool) -> bool {
		let Some(class) = DeviceClass::from_report_id(id) else {
			return false;
		};

		self.with(|inner| match inner.session.as_mut() {
			Some(session) => {
				session.set_notifications(class, enabled);
				true
			},
			None => false,
		})
	}

	pub fn notifications_enabled(&self, class: DeviceClass) -> bool {
		self.with(|inner| inner.session.map_or(false, |s| s.notifications_enabled(class)))
	}

	pub fn set_authenticated(&self, peer: PeerAddress, authenticated: bool) {
		self.with(|inner| match inner.session.as_mut() {
			Some(session) if session.peer == peer => session.authenticated = authenticated,
			_ => debug!("Authentication result for {:?} has no session", peer),
		})
	}

	/// Lets the delivery loops of `classes` run.
	pub fn start(&self, classes: &ClassesConfig) {
		for class in classes.included() {
			self.start[class.index()].signal(());
		}
	}

	/// Tears down the session of `peer` and tells every delivery loop of `classes`
	/// to stop. A peer that was turned away has no session and changes nothing.
	pub fn disconnect(&self, peer: PeerAddress, classes: &ClassesConfig) -> Option<Session> {
		let session = self.with(|inner| {
			if inner.session?.peer != peer {
				return None;
			}
			let session = inner.session.take()?;
			inner.state = if inner.running.iter().any(|&r| r) {
				ConnectionState::Disconnected
			} else {
				ConnectionState::Idle
			};
			Some(session)
		});

		match session {
			Some(session) => {
				info!("Disconnected from {:?}", session.peer);
				for class in classes.included() {
					self.stop[class.index()].signal(());
				}
			},
			None => debug!("{:?} disconnected without a session", peer),
		}

		session
	}

	/// Waits for an open session other than `served` and returns its generation.
	/// The state is checked before every wait, so a start that was merged with
	/// an earlier one is never lost.
	pub async fn wait_session(&self, class: DeviceClass, served: u32) -> u32 {
		loop {
			let open = self.with(|inner| {
				inner
					.session
					.map(|_| inner.generation)
					.filter(|&generation| generation != served)
			});
			if let Some(generation) = open {
				return generation;
			}
			self.start[class.index()].wait().await;
		}
	}

	/// Whether the session of `generation` is still the open one.
	pub fn is_active(&self, generation: u32) -> bool {
		self.with(|inner| inner.session.is_some() && inner.generation == generation)
	}

	pub fn stop_signal(&self, class: DeviceClass) -> &StopSignal {
		&self.stop[class.index()]
	}

	pub(crate) fn delivery_started(&self, class: DeviceClass) {
		self.with(|inner| inner.running[class.index()] = true);
	}

	/// Once the last loop is done after a disconnect the controller is idle again.
	pub(crate) fn delivery_stopped(&self, class: DeviceClass) {
		self.with(|inner| {
			inner.running[class.index()] = false;
			if inner.state == ConnectionState::Disconnected && !inner.running.iter().any(|&r| r) {
				inner.state = ConnectionState::Idle;
			}
		});
	}
}

impl Default for ConnectionController {
	fn default() -> Self {
		Self::new()
	}
}
