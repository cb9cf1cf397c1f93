use core::mem;

use embassy_executor::task;
use embassy_nrf::interrupt::Priority;
use embassy_nrf::pac;
use nrf_softdevice::{raw, Softdevice};

use crate::config::IdentityConfig;
use crate::security::Passkey;

pub fn init() -> embassy_nrf::Peripherals {
	info!("hidlink v{}", env!("CARGO_PKG_VERSION"));

	unsafe {
		let nvmc = &*pac::NVMC::ptr();
		let power = &*pac::POWER::ptr();

		// Enable DC-DC
		power.dcdcen.write(|w| w.dcdcen().enabled());

		// Enable flash cache
		nvmc.icachecnf.write(|w| w.cacheen().enabled());
	}

	// Priorities 0, 1 and 4 belong to the SoftDevice
	let mut config = embassy_nrf::config::Config::default();
	config.gpiote_interrupt_priority = Priority::P2;
	config.time_interrupt_priority = Priority::P2;
	embassy_nrf::init(config)
}

#[task]
pub async fn softdevice_task(sd: &'static Softdevice) {
	info!("SoftDevice task started");
	sd.run().await;
	info!("SoftDevice task finished");
}

pub fn get_softdevice(identity: &'static IdentityConfig) -> &'static mut Softdevice {
	let name = identity.device_name;

	let sd_config = nrf_softdevice::Config {
		clock: Some(raw::nrf_clock_lf_cfg_t {
			// Use external crystal
			source: raw::NRF_CLOCK_LF_SRC_XTAL as u8,
			// Need to be 0 for external crystal
			rc_ctiv: 0,
			// Need to be 0 for external crystal
			rc_temp_ctiv: 0,
			accuracy: raw::NRF_CLOCK_LF_ACCURACY_20_PPM as u8,
		}),
		conn_gap: Some(raw::ble_gap_conn_cfg_t {
			conn_count: 1,
			event_length: 24,
		}),
		conn_gatt: Some(raw::ble_gatt_conn_cfg_t { att_mtu: 256 }),
		gatts_attr_tab_size: Some(raw::ble_gatts_cfg_attr_tab_size_t { attr_tab_size: 32768 }),
		gap_role_count: Some(raw::ble_gap_cfg_role_count_t {
			adv_set_count: 1,
			periph_role_count: 1,
			central_role_count: 0,
			central_sec_count: 0,
			_bitfield_1: raw::ble_gap_cfg_role_count_t::new_bitfield_1(0),
		}),
		gap_device_name: Some(raw::ble_gap_cfg_device_name_t {
			p_value: name.as_ptr() as _,
			current_len: name.len() as u16,
			max_len: name.len() as u16,
			write_perm: unsafe { mem::zeroed() },
			_bitfield_1: raw::ble_gap_cfg_device_name_t::new_bitfield_1(raw::BLE_GATTS_VLOC_STACK as u8),
		}),
		..Default::default()
	};

	let sd = Softdevice::enable(&sd_config);
	info!("SoftDevice initialized");

	sd
}

/// Makes the SoftDevice display `passkey` instead of a random one when pairing.
/// The digits must outlive every pairing, hence `'static`.
pub fn set_static_passkey(digits: &'static [u8; 6]) {
	let mut opt: raw::ble_opt_t = unsafe { mem::zeroed() };
	opt.gap_opt.passkey.p_passkey = digits.as_ptr();

	let ret = unsafe { raw::sd_ble_opt_set(raw::BLE_GAP_OPT_PASSKEY, &opt) };
	if ret != raw::NRF_SUCCESS {
		warn!("Setting the static passkey failed: {}", ret);
	} else {
		debug!("Static passkey set");
	}
}

/// Static passkey storage for [`set_static_passkey`]. Panics when called twice.
pub fn passkey_digits(passkey: Passkey) -> &'static [u8; 6] {
	static DIGITS: static_cell::StaticCell<[u8; 6]> = static_cell::StaticCell::new();
	DIGITS.init(passkey.digits())
}
