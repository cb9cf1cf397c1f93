//! Logging macros that go to defmt on the device, to `log` when that feature
//! is picked instead, and compile to nothing otherwise (host tests).
#![allow(unused_macros)]

macro_rules! log_impl {
	($level:ident, $s:literal $(, $x:expr)* $(,)?) => {
		{
			#[cfg(feature = "defmt")]
			::defmt::$level!($s $(, $x)*);
			#[cfg(all(feature = "log", not(feature = "defmt")))]
			::log::$level!($s $(, $x)*);
			#[cfg(not(any(feature = "defmt", feature = "log")))]
			let _ = ($( & $x ),*);
		}
	};
}

macro_rules! trace {
	($s:literal $(, $x:expr)* $(,)?) => {
		log_impl!(trace, $s $(, $x)*)
	};
}

macro_rules! debug {
	($s:literal $(, $x:expr)* $(,)?) => {
		log_impl!(debug, $s $(, $x)*)
	};
}

macro_rules! info {
	($s:literal $(, $x:expr)* $(,)?) => {
		log_impl!(info, $s $(, $x)*)
	};
}

macro_rules! warn {
	($s:literal $(, $x:expr)* $(,)?) => {
		log_impl!(warn, $s $(, $x)*)
	};
}

macro_rules! error {
	($s:literal $(, $x:expr)* $(,)?) => {
		log_impl!(error, $s $(, $x)*)
	};
}
