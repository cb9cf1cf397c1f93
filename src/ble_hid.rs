use core::cell::{Cell, RefCell};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use heapless::String;
use nrf_softdevice::ble::advertisement_builder::{
	AdvertisementDataType, Flag, LegacyAdvertisementBuilder, ServiceList, ServiceUuid16,
};
use nrf_softdevice::ble::gatt_server::builder::ServiceBuilder;
use nrf_softdevice::ble::gatt_server::characteristic::{Attribute, Metadata, Properties};
use nrf_softdevice::ble::gatt_server::{self, RegisterError, Service, WriteOp};
use nrf_softdevice::ble::security::{IoCapabilities, SecurityHandler};
use nrf_softdevice::ble::{
	peripheral, Connection, EncryptionInfo, GattValue, IdentityKey, MasterId, PasskeyReply, SecurityMode, Uuid,
};
use nrf_softdevice::Softdevice;

use crate::config::{HidConfig, IdentityConfig};
use crate::descriptor::MAX_DESCRIPTOR_LEN;
use crate::keyboard::KeyboardLeds;
use crate::report::{DeviceClass, ReportId, MAX_REPORT_LEN};
use crate::security::{PairingPolicy, Passkey, PeerAddress};
use crate::transport::{ConnectionEvents, Transport, TransportError};

const REPORT_REFERENCE: u16 = 0x2908;
const REPORT_INPUT: u8 = 1;
const REPORT_OUTPUT: u8 = 2;

#[nrf_softdevice::gatt_service(uuid = "180f")]
pub struct BatteryService {
	#[characteristic(uuid = "2a19", read, notify)]
	battery_level: u8,
}

/// PnP ID characteristic value, already in wire order.
#[derive(Clone, Copy)]
pub struct PnpId(pub [u8; 7]);

impl GattValue for PnpId {
	const MAX_SIZE: usize = 7;
	const MIN_SIZE: usize = 7;

	fn from_gatt(data: &[u8]) -> Self {
		let mut value = [0u8; 7];
		let len = data.len().min(7);
		value[..len].copy_from_slice(&data[..len]);
		Self(value)
	}

	fn to_gatt(&self) -> &[u8] {
		&self.0
	}
}

#[nrf_softdevice::gatt_service(uuid = "180a")]
pub struct DeviceInformationService {
	#[characteristic(uuid = "2a24", read)]
	model_number: String<32>,

	#[characteristic(uuid = "2a29", read)]
	manufacturer_name: String<32>,

	#[characteristic(uuid = "2a50", read)]
	pnp_id: PnpId,
}

#[derive(Debug, Clone, Copy)]
struct ReportHandles {
	value: u16,
	cccd: u16,
}

pub struct HidService {
	pub hid_info: u16,
	pub report_map: u16,
	pub hid_control: u16,
	pub protocol_mode: u16,
	pub keyboard_output: u16,
	input: [Option<ReportHandles>; DeviceClass::COUNT],
}

#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HidServiceEvent {
	Notifications { id: ReportId, enabled: bool },
	KeyboardOutput(u8),
	Control(u8),
}

impl HidService {
	/// Registers the HID service with one input report characteristic per
	/// included class. The report map value stays empty until the transport's
	/// `register_descriptor` fills it in.
	pub fn new(sd: &mut Softdevice, config: &HidConfig) -> Result<Self, RegisterError> {
		let mut service_builder = ServiceBuilder::new(sd, Uuid::new_16(0x1812))?;

		let hid_info = service_builder.add_characteristic(
			Uuid::new_16(0x2A4A),
			Attribute::new(config.identity.hid_information()),
			Metadata::new(Properties::new().read()),
		)?;
		let hid_info_handle = hid_info.build();

		let report_map = service_builder.add_characteristic(
			Uuid::new_16(0x2A4B),
			Attribute::new([0u8; MAX_DESCRIPTOR_LEN]).variable_len(MAX_DESCRIPTOR_LEN as u16),
			Metadata::new(Properties::new().read()),
		)?;
		let report_map_handle = report_map.build();

		let hid_control = service_builder.add_characteristic(
			Uuid::new_16(0x2A4C),
			Attribute::new([0u8]),
			Metadata::new(Properties::new().write_without_response()),
		)?;
		let hid_control_handle = hid_control.build();

		let mut input = [None; DeviceClass::COUNT];
		for class in config.classes.included() {
			let id = class.report_id();
			let mut characteristic = service_builder.add_characteristic(
				Uuid::new_16(0x2A4D),
				Attribute::new([0u8; MAX_REPORT_LEN]).variable_len(class.report_len() as u16),
				Metadata::new(Properties::new().read().notify()),
			)?;
			characteristic.add_descriptor(Uuid::new_16(REPORT_REFERENCE), Attribute::new([id.0, REPORT_INPUT]))?;
			let handles = characteristic.build();
			input[class.index()] = Some(ReportHandles {
				value: handles.value_handle,
				cccd: handles.cccd_handle,
			});
		}

		let mut keyboard_output = service_builder.add_characteristic(
			Uuid::new_16(0x2A4D),
			Attribute::new([0u8; KeyboardLeds::REPORT_LEN]),
			Metadata::new(Properties::new().read().write().write_without_response()),
		)?;
		keyboard_output.add_descriptor(
			Uuid::new_16(REPORT_REFERENCE),
			Attribute::new([DeviceClass::Keyboard.report_id().0, REPORT_OUTPUT]),
		)?;
		let keyboard_output_handle = keyboard_output.build();

		// Report protocol only
		let protocol_mode = service_builder.add_characteristic(
			Uuid::new_16(0x2A4E),
			Attribute::new([1u8]),
			Metadata::new(Properties::new().read().write_without_response()),
		)?;
		let protocol_mode_handle = protocol_mode.build();

		let _service_handle = service_builder.build();

		Ok(HidService {
			hid_info: hid_info_handle.value_handle,
			report_map: report_map_handle.value_handle,
			hid_control: hid_control_handle.value_handle,
			protocol_mode: protocol_mode_handle.value_handle,
			keyboard_output: keyboard_output_handle.value_handle,
			input,
		})
	}

	fn input_handle(&self, id: ReportId) -> Result<u16, TransportError> {
		DeviceClass::from_report_id(id)
			.and_then(|class| self.input[class.index()])
			.map(|h| h.value)
			.ok_or(TransportError::UnknownReport(id))
	}
}

impl Service for HidService {
	type Event = HidServiceEvent;

	fn on_write(&self, handle: u16, data: &[u8]) -> Option<Self::Event> {
		trace!("HidService::on_write: handle: {:x}, data: {:?}", handle, data);

		if handle == self.keyboard_output {
			return data.first().map(|&leds| HidServiceEvent::KeyboardOutput(leds));
		}
		if handle == self.hid_control {
			return data.first().map(|&c| HidServiceEvent::Control(c));
		}

		self.input.iter().enumerate().find_map(|(index, handles)| {
			let handles = (*handles)?;
			(handles.cccd == handle).then(|| HidServiceEvent::Notifications {
				id: ReportId(index as u8 + 1),
				enabled: data.first().map_or(false, |&cccd| cccd & 0x01 != 0),
			})
		})
	}
}

pub enum ServerEvent {
	Battery(BatteryServiceEvent),
	Hid(HidServiceEvent),
}

pub struct Server {
	pub bas: BatteryService,
	pub hid: HidService,
	pub dis: DeviceInformationService,
}

impl Server {
	pub fn new(sd: &mut Softdevice, config: &HidConfig) -> Result<Self, RegisterError> {
		Ok(Self {
			bas: BatteryService::new(sd)?,
			hid: HidService::new(sd, config)?,
			dis: DeviceInformationService::new(sd)?,
		})
	}

	pub fn init(&self, identity: &IdentityConfig) {
		let mut model = String::new();
		let mut manufacturer = String::new();
		if model.push_str(identity.device_name).is_err() || manufacturer.push_str(identity.manufacturer).is_err() {
			warn!("Device name or manufacturer longer than 32 bytes, left empty");
		}

		let results = [
			self.dis.model_number_set(&model),
			self.dis.manufacturer_name_set(&manufacturer),
			self.dis.pnp_id_set(&PnpId(identity.pnp_id())),
			self.bas.battery_level_set(&100),
		];
		if results.iter().any(|r| r.is_err()) {
			warn!("Setting device information failed");
		}
	}
}

impl gatt_server::Server for Server {
	type Event = ServerEvent;

	fn on_write(&self, _conn: &Connection, handle: u16, _op: WriteOp, _offset: usize, data: &[u8]) -> Option<Self::Event> {
		if let Some(event) = self.bas.on_write(handle, data) {
			return Some(ServerEvent::Battery(event));
		}
		self.hid.on_write(handle, data).map(ServerEvent::Hid)
	}
}

/// Transport over the SoftDevice GATT server.
pub struct BleTransport {
	sd: &'static Softdevice,
	server: &'static Server,
	conn: Mutex<CriticalSectionRawMutex, Cell<Option<u16>>>,
	notify: Mutex<CriticalSectionRawMutex, Cell<[bool; DeviceClass::COUNT]>>,
}

impl BleTransport {
	pub fn new(sd: &'static Softdevice, server: &'static Server) -> Self {
		Self {
			sd,
			server,
			conn: Mutex::new(Cell::new(None)),
			notify: Mutex::new(Cell::new([false; DeviceClass::COUNT])),
		}
	}

	fn attach(&self, conn: &Connection) {
		self.conn.lock(|c| c.set(conn.handle()));
	}

	fn detach(&self) {
		self.conn.lock(|c| c.set(None));
		self.notify.lock(|n| n.set([false; DeviceClass::COUNT]));
	}
}

impl Transport for BleTransport {
	fn register_descriptor(&self, descriptor: &[u8]) -> Result<(), TransportError> {
		gatt_server::set_value(self.sd, self.server.hid.report_map, descriptor).map_err(|e| {
			error!("Storing report map failed: {:?}", e);
			TransportError::Rejected
		})
	}

	fn set_report_value(&self, id: ReportId, data: &[u8]) -> Result<(), TransportError> {
		let handle = self.server.hid.input_handle(id)?;
		gatt_server::set_value(self.sd, handle, data).map_err(|_| TransportError::Rejected)
	}

	fn notify(&self, id: ReportId) -> Result<(), TransportError> {
		let handle = self.server.hid.input_handle(id)?;
		let conn = self
			.conn
			.lock(|c| c.get())
			.and_then(Connection::from_handle)
			.ok_or(TransportError::NotConnected)?;

		let mut value = [0u8; MAX_REPORT_LEN];
		let len = gatt_server::get_value(self.sd, handle, &mut value).map_err(|_| TransportError::Rejected)?;

		gatt_server::notify_value(&conn, handle, &value[..len]).map_err(|e| match e {
			gatt_server::NotifyValueError::Disconnected => TransportError::NotConnected,
			gatt_server::NotifyValueError::Raw(_) => TransportError::Busy,
		})
	}

	fn is_notification_enabled(&self, id: ReportId) -> bool {
		DeviceClass::from_report_id(id).map_or(false, |class| self.notify.lock(|n| n.get()[class.index()]))
	}

	fn set_notifications_enabled(&self, id: ReportId, enabled: bool) {
		if let Some(class) = DeviceClass::from_report_id(id) {
			self.notify.lock(|n| {
				let mut flags = n.get();
				flags[class.index()] = enabled;
				n.set(flags);
			});
		}
	}
}

fn peer_address(conn: &Connection) -> PeerAddress {
	PeerAddress(conn.peer_address().bytes())
}

/// Advertises, runs the GATT server for one peer at a time and reports every
/// link change to `events`. Never returns.
pub async fn serve(
	sd: &'static Softdevice,
	server: &'static Server,
	transport: &'static BleTransport,
	events: &'static dyn ConnectionEvents,
	bonder: &'static Bonder,
	identity: &IdentityConfig,
) {
	loop {
		info!("Waiting for connection");
		let conn = match advertise(sd, bonder, identity).await {
			Ok(conn) => conn,
			Err(e) => {
				error!("Advertising failed: {:?}", e);
				continue;
			},
		};

		let peer = peer_address(&conn);
		if events.on_connect(peer).is_err() {
			if let Err(e) = conn.disconnect() {
				warn!("Disconnecting rejected peer failed: {:?}", e);
			}
			continue;
		}
		transport.attach(&conn);

		let e = gatt_server::run(&conn, server, |event| match event {
			ServerEvent::Hid(HidServiceEvent::Notifications { id, enabled }) => {
				transport.set_notifications_enabled(id, enabled);
				events.on_notifications_changed(id, enabled);
			},
			ServerEvent::Hid(HidServiceEvent::KeyboardOutput(leds)) => {
				events.on_output_report(DeviceClass::Keyboard.report_id(), &[leds]);
			},
			ServerEvent::Hid(HidServiceEvent::Control(c)) => debug!("HID control point: {}", c),
			ServerEvent::Battery(_) => {},
		})
		.await;

		info!("Connection lost: {:?}", e);
		transport.detach();
		events.on_disconnect(peer);
	}
}

async fn advertise(
	sd: &Softdevice,
	bonder: &'static Bonder,
	identity: &IdentityConfig,
) -> Result<Connection, peripheral::AdvertiseError> {
	let adv_data = LegacyAdvertisementBuilder::new()
		.flags(&[Flag::GeneralDiscovery, Flag::LE_Only])
		.services_16(
			ServiceList::Incomplete,
			&[ServiceUuid16::BATTERY, ServiceUuid16::HUMAN_INTERFACE_DEVICE],
		)
		.full_name(identity.device_name)
		.raw(AdvertisementDataType::APPEARANCE, &identity.appearance.to_le_bytes())
		.build();

	let scan_data = LegacyAdvertisementBuilder::new()
		.services_16(
			ServiceList::Complete,
			&[
				ServiceUuid16::BATTERY,
				ServiceUuid16::DEVICE_INFORMATION,
				ServiceUuid16::HUMAN_INTERFACE_DEVICE,
			],
		)
		.build();

	let config = peripheral::Config::default();
	let adv = peripheral::ConnectableAdvertisement::ScannableUndirected {
		adv_data: &adv_data,
		scan_data: &scan_data,
	};

	debug!("Advertising");
	peripheral::advertise_pairable(sd, adv, &config, bonder).await
}

#[derive(Debug, Clone, Copy)]
struct Peer {
	master_id: MasterId,
	key: EncryptionInfo,
	peer_id: IdentityKey,
}

/// Keeps one bond in RAM and forwards the pairing decisions to a [`PairingPolicy`].
pub struct Bonder {
	policy: &'static dyn PairingPolicy,
	events: &'static dyn ConnectionEvents,
	peer: Cell<Option<Peer>>,
	sys_attrs: RefCell<heapless::Vec<u8, 64>>,
}

impl Bonder {
	pub fn new(policy: &'static dyn PairingPolicy, events: &'static dyn ConnectionEvents) -> Self {
		Bonder {
			policy,
			events,
			peer: Cell::new(None),
			sys_attrs: Default::default(),
		}
	}
}

impl SecurityHandler for Bonder {
	fn io_capabilities(&self) -> IoCapabilities {
		IoCapabilities::DisplayOnly
	}

	fn can_bond(&self, _conn: &Connection) -> bool {
		self.policy.on_security_request()
	}

	fn display_passkey(&self, passkey: &[u8; 6]) {
		match Passkey::from_digits(passkey) {
			Some(passkey) => self.policy.on_peer_passkey_notify(passkey),
			None => warn!("Passkey is not numeric"),
		}
	}

	fn enter_passkey(&self, reply: PasskeyReply) {
		let digits = self.policy.provide_passkey().digits();
		if reply.reply(Some(&digits)).is_err() {
			warn!("Passkey reply failed");
		}
	}

	fn on_security_update(&self, conn: &Connection, security_mode: SecurityMode) {
		debug!("Security update {:?}", security_mode);
		let success = security_mode != SecurityMode::Open && security_mode != SecurityMode::NoAccess;
		// Failure is only recorded
		let _ = self.events.on_authentication_complete(success, peer_address(conn));
	}

	fn on_bonded(&self, _conn: &Connection, master_id: MasterId, key: EncryptionInfo, peer_id: IdentityKey) {
		info!("Bonded");

		self.sys_attrs.borrow_mut().clear();
		self.peer.set(Some(Peer {
			master_id,
			key,
			peer_id,
		}));
	}

	fn get_key(&self, _conn: &Connection, master_id: MasterId) -> Option<EncryptionInfo> {
		self.peer
			.get()
			.and_then(|peer| (master_id == peer.master_id).then_some(peer.key))
	}

	fn save_sys_attrs(&self, conn: &Connection) {
		if let Some(peer) = self.peer.get() {
			if peer.peer_id.is_match(conn.peer_address()) {
				let mut sys_attrs = self.sys_attrs.borrow_mut();
				let capacity = sys_attrs.capacity();
				let _ = sys_attrs.resize(capacity, 0);
				match gatt_server::get_sys_attrs(conn, &mut sys_attrs) {
					Ok(len) => sys_attrs.truncate(len),
					Err(_) => sys_attrs.clear(),
				}
			}
		}
	}

	fn load_sys_attrs(&self, conn: &Connection) {
		let addr = conn.peer_address();
		let attrs = self.sys_attrs.borrow();
		let attrs = if self.peer.get().map_or(false, |peer| peer.peer_id.is_match(addr)) {
			(!attrs.is_empty()).then_some(attrs.as_slice())
		} else {
			None
		};

		if gatt_server::set_sys_attrs(conn, attrs).is_err() {
			warn!("Restoring system attributes failed");
		}
	}
}
