//! Error handling
//!
//! Defines error types and wire code mapping for the file server.

pub mod handlers;
pub mod types;

pub use handlers::{error_to_wire_code, handle_error, protocol_error_code};
pub use types::*;
