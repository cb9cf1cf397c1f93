#![cfg_attr(not(test), no_std)]
//! HID report map (report descriptor) items, a fixed capacity builder and a
//! layout parser that tells how many bits each report id carries.

pub mod bits;
pub mod builder;
pub mod constants;
pub mod items;
pub mod parser;

pub use bits::{BitError, BitReader, BitWriter};
pub use builder::{BuildError, ReportMapBuilder};
pub use items::{CollectionKind, ItemData, ItemTag, MainFlags};
pub use parser::{parse, Direction, Field, ParseError, ReportLayout, ReportMap};
