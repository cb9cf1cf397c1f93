//! US layout ASCII to boot keyboard usages.

use crate::{KeyEvent, KeyModifiers};

pub const ENTER: u8 = 0x28;
pub const BACKSPACE: u8 = 0x2a;
pub const TAB: u8 = 0x2b;
pub const SPACE: u8 = 0x2c;

fn unshifted(c: char) -> Option<u8> {
	Some(match c {
		'a'..='z' => 0x04 + (c as u8 - b'a'),
		'1'..='9' => 0x1e + (c as u8 - b'1'),
		'0' => 0x27,
		'\n' => ENTER,
		'\x08' => BACKSPACE,
		'\t' => TAB,
		' ' => SPACE,
		'-' => 0x2d,
		'=' => 0x2e,
		'[' => 0x2f,
		']' => 0x30,
		'\\' => 0x31,
		';' => 0x33,
		'\'' => 0x34,
		'`' => 0x35,
		',' => 0x36,
		'.' => 0x37,
		'/' => 0x38,
		_ => return None,
	})
}

fn shifted(c: char) -> Option<char> {
	Some(match c {
		'A'..='Z' => c.to_ascii_lowercase(),
		'!' => '1',
		'@' => '2',
		'#' => '3',
		'$' => '4',
		'%' => '5',
		'^' => '6',
		'&' => '7',
		'*' => '8',
		'(' => '9',
		')' => '0',
		'_' => '-',
		'+' => '=',
		'{' => '[',
		'}' => ']',
		'|' => '\\',
		':' => ';',
		'"' => '\'',
		'~' => '`',
		'<' => ',',
		'>' => '.',
		'?' => '/',
		_ => return None,
	})
}

/// Tap event typing `c`, or `None` when the character has no key on a US layout.
pub fn ascii(c: char) -> Option<KeyEvent> {
	if let Some(usage) = unshifted(c) {
		return Some(KeyEvent::tap(usage, KeyModifiers::NONE));
	}

	let base = shifted(c)?;
	unshifted(base).map(|usage| KeyEvent::tap(usage, KeyModifiers::LEFT_SHIFT))
}
