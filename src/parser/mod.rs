//! Email parsing: raw header decoding, MIME traversal, address extraction,
//! and sender classification.

pub mod address;
pub mod eml;
pub mod header;
pub mod mime;
pub mod sender;

pub use eml::{parse_file, parse_message};
