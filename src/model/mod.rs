//! Core data model types for parsed messages, addresses, and attachments.

pub mod address;
pub mod attachment;
pub mod message;

pub use attachment::{format_file_size, AttachmentRecord};
pub use message::ParsedMessage;
