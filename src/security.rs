use core::cell::Cell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;

use crate::error::SecurityRejected;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PeerAddress(pub [u8; 6]);

/// Six digit pairing passkey.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Passkey(pub u32);

impl Passkey {
	pub const MAX: u32 = 999_999;

	/// ASCII digits, most significant first, as the SoftDevice expects them.
	pub fn digits(self) -> [u8; 6] {
		let mut digits = [b'0'; 6];
		let mut value = self.0 % (Self::MAX + 1);
		for digit in digits.iter_mut().rev() {
			*digit = b'0' + (value % 10) as u8;
			value /= 10;
		}
		digits
	}

	/// Parses ASCII digits. `None` when anything but `0`..=`9` shows up.
	pub fn from_digits(digits: &[u8; 6]) -> Option<Self> {
		digits.iter().try_fold(0u32, |acc, &d| {
			d.is_ascii_digit().then(|| acc * 10 + (d - b'0') as u32)
		})
		.map(Passkey)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AuthOutcome {
	pub peer: PeerAddress,
	pub success: bool,
}

/// Pairing callbacks. The transport's security hooks forward here.
pub trait PairingPolicy {
	/// Key to answer a passkey request with.
	fn provide_passkey(&self) -> Passkey;

	/// The stack generated or showed a passkey; later requests reuse it.
	fn on_peer_passkey_notify(&self, passkey: Passkey);

	/// Whether to go along with a peer's security request.
	fn on_security_request(&self) -> bool;

	/// Numeric comparison.
	fn on_confirm_pin(&self, passkey: Passkey) -> bool;

	/// Records the pairing outcome. No corrective action is taken on failure.
	fn on_authentication_complete(&self, success: bool, peer: PeerAddress) -> Result<(), SecurityRejected>;
}

impl<P: PairingPolicy + ?Sized> PairingPolicy for &P {
	fn provide_passkey(&self) -> Passkey {
		(**self).provide_passkey()
	}

	fn on_peer_passkey_notify(&self, passkey: Passkey) {
		(**self).on_peer_passkey_notify(passkey)
	}

	fn on_security_request(&self) -> bool {
		(**self).on_security_request()
	}

	fn on_confirm_pin(&self, passkey: Passkey) -> bool {
		(**self).on_confirm_pin(passkey)
	}

	fn on_authentication_complete(&self, success: bool, peer: PeerAddress) -> Result<(), SecurityRejected> {
		(**self).on_authentication_complete(success, peer)
	}
}

/// Accepts every request and answers with a fixed passkey that the peer may replace.
pub struct StaticPasskey {
	passkey: Mutex<CriticalSectionRawMutex, Cell<Passkey>>,
	last_outcome: Mutex<CriticalSectionRawMutex, Cell<Option<AuthOutcome>>>,
}

impl StaticPasskey {
	pub const fn new(passkey: Passkey) -> Self {
		Self {
			passkey: Mutex::new(Cell::new(passkey)),
			last_outcome: Mutex::new(Cell::new(None)),
		}
	}

	pub fn last_outcome(&self) -> Option<AuthOutcome> {
		self.last_outcome.lock(|o| o.get())
	}
}

impl Default for StaticPasskey {
	fn default() -> Self {
		Self::new(Passkey::default())
	}
}

impl PairingPolicy for StaticPasskey {
	fn provide_passkey(&self) -> Passkey {
		let passkey = self.passkey.lock(|p| p.get());
		info!("Passkey requested, answering {}", passkey.0);
		passkey
	}

	fn on_peer_passkey_notify(&self, passkey: Passkey) {
		info!("Passkey notified: {}", passkey.0);
		self.passkey.lock(|p| p.set(passkey));
	}

	fn on_security_request(&self) -> bool {
		debug!("Security request granted");
		true
	}

	fn on_confirm_pin(&self, passkey: Passkey) -> bool {
		info!("Confirming pin {}", passkey.0);
		true
	}

	fn on_authentication_complete(&self, success: bool, peer: PeerAddress) -> Result<(), SecurityRejected> {
		self.last_outcome.lock(|o| o.set(Some(AuthOutcome { peer, success })));

		if success {
			info!("Pairing with {:?} succeeded", peer);
			Ok(())
		} else {
			warn!("Pairing with {:?} failed", peer);
			Err(SecurityRejected { peer })
		}
	}
}
