#![no_std]
#![no_main]
// make_static! macro requires this
#![feature(type_alias_impl_trait)]

extern crate defmt_rtt;
extern crate panic_probe;

use defmt::{info, unwrap};
use embassy_executor::{task, Spawner};
use hidlink::ble_hid::{self, Bonder, BleTransport, Server};
use hidlink::nrf::{get_softdevice, init, passkey_digits, set_static_passkey, softdevice_task};
use hidlink::prelude::*;

type Device = HidDevice<&'static BleTransport, &'static StaticPasskey>;

#[task]
async fn ble_task(
	sd: &'static nrf_softdevice::Softdevice,
	server: &'static Server,
	transport: &'static BleTransport,
	device: &'static Device,
	bonder: &'static Bonder,
) {
	ble_hid::serve(sd, server, transport, device, bonder, &BOARD.identity).await
}

#[task]
async fn delivery_task(device: &'static Device) {
	device.run().await
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
	let _p = init();
	let config: &'static HidConfig = &BOARD;

	let sd = get_softdevice(&config.identity);
	let server: &'static Server = make_static!(unwrap!(Server::new(sd, config)));
	server.init(&config.identity);
	let sd = &*sd;
	unwrap!(spawner.spawn(softdevice_task(sd)));

	let passkey = config.security.passkey();
	if passkey != Passkey::default() {
		set_static_passkey(passkey_digits(passkey));
	}

	let transport: &'static BleTransport = make_static!(BleTransport::new(sd, server));
	let policy: &'static StaticPasskey = make_static!(StaticPasskey::new(passkey));
	let device: &'static Device = make_static!(unwrap!(HidDevice::init(*config, transport, policy)));
	let bonder = make_static!(Bonder::new(policy, device));

	unwrap!(spawner.spawn(delivery_task(device)));
	unwrap!(spawner.spawn(ble_task(sd, server, transport, device, bonder)));

	info!("hidlink running");
}
