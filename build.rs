//! Turns the selected board file (`boards/<HIDLINK_BOARD>.toml`, `default` when
//! unset) into `$OUT_DIR/board.rs`, which `src/config.rs` includes as `BOARD`.
//! Report class combinations the report map cannot express are rejected here,
//! so a bad board never builds.
//!
//! When targeting the nRF52840 it also puts `memory.x` on the linker search
//! path and passes the cortex-m-rt and defmt linker scripts.

use convert_case::{Case, Casing};
use std::fs::{copy, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::{env, fs};
use toml;

const SECTIONS: &[&str] = &["classes", "identity", "security"];
const MAX_PASSKEY: i64 = 999_999;

fn value_to_rust(section: &str, key: &str, value: &toml::Value) -> String {
	match value {
		toml::Value::String(s) => format!("{:?}", s),
		toml::Value::Integer(i) => i.to_string(),
		toml::Value::Float(f) => f.to_string(),
		toml::Value::Boolean(b) => b.to_string(),
		toml::Value::Array(arr) => {
			let elements = arr
				.iter()
				.map(|v| value_to_rust(section, key, v))
				.collect::<Vec<_>>()
				.join(", ");
			format!("[{}]", elements)
		},
		_ => panic!("Unsupported TOML value for `{}.{}`", section, key),
	}
}

fn flag(table: &toml::Table, key: &str) -> Option<bool> {
	table.get(key).and_then(|v| v.as_bool())
}

fn validate(board: &toml::Table, board_path: &Path) {
	for section in board.keys() {
		if !SECTIONS.contains(&section.as_str()) {
			panic!(
				"{}: unknown section `[{}]`, expected one of {:?}",
				board_path.display(),
				section,
				SECTIONS
			);
		}
	}

	if let Some(classes) = board.get("classes").and_then(|c| c.as_table()) {
		if flag(classes, "keyboard") == Some(false) {
			panic!("{}: the keyboard report is always present", board_path.display());
		}
		// The joystick collection follows the pointer one in the report map
		if flag(classes, "joystick") == Some(true) && flag(classes, "pointer") == Some(false) {
			panic!("{}: joystick = true requires pointer = true", board_path.display());
		}
	}

	if let Some(passkey) = board
		.get("security")
		.and_then(|s| s.get("passkey"))
		.and_then(|p| p.as_integer())
	{
		if !(0..=MAX_PASSKEY).contains(&passkey) {
			panic!("{}: passkey must be 6 digits at most", board_path.display());
		}
	}
}

fn main() {
	let out = &PathBuf::from(env::var_os("OUT_DIR").unwrap());

	if env::var("CARGO_CFG_TARGET_ARCH").as_deref() == Ok("arm") {
		// Put `memory.x` in our output directory and ensure it's
		// on the linker search path.
		copy("memory.x", out.join("memory.x")).unwrap();
		println!("cargo:rustc-link-search={}", out.display());
		println!("cargo:rerun-if-changed=memory.x");

		println!("cargo:rustc-link-arg-bins=--nmagic");
		println!("cargo:rustc-link-arg-bins=-Tlink.x");
		println!("cargo:rustc-link-arg-bins=-Tdefmt.x");
	}

	println!("cargo:rerun-if-env-changed=HIDLINK_BOARD");
	let board_name = env::var("HIDLINK_BOARD").unwrap_or_else(|_| "default".into());
	let board_path = Path::new(env!("CARGO_MANIFEST_DIR"))
		.join("boards")
		.join(format!("{}.toml", board_name));
	let board = fs::read_to_string(&board_path)
		.unwrap_or_else(|e| panic!("Could not read board file {}: {}", board_path.display(), e));
	println!("cargo:rerun-if-changed={}", board_path.display());

	let board = toml::from_str::<toml::Table>(board.as_str())
		.unwrap_or_else(|e| panic!("Invalid board file {}: {}", board_path.display(), e));
	validate(&board, &board_path);

	let config_path = out.join("board.rs");
	let mut config = File::create(&config_path).unwrap();

	writeln!(config, "lazy_static! {{").unwrap();
	writeln!(config, "\tpub static ref BOARD: HidConfig = HidConfig {{").unwrap();
	for (section, items) in board.iter() {
		let field = section.to_case(Case::Snake);
		let field_type = section.to_case(Case::Pascal);
		let fields = items
			.as_table()
			.unwrap_or_else(|| panic!("`{}` must be a table", section))
			.iter()
			.map(|(k, v)| format!("\t\t\t{}: {},", k.to_case(Case::Snake), value_to_rust(section, k, v)))
			.collect::<Vec<String>>()
			.join("\n");

		writeln!(
			config,
			"\t\t{0}: {1}Config {{\n{2}\n\t\t\t..Default::default()\n\t\t}},",
			field, field_type, fields
		)
		.unwrap();
	}
	writeln!(config, "\t\t..Default::default()\n\t}};").unwrap();
	writeln!(config, "}}").unwrap();

	config.sync_all().unwrap();
}
