//! Wire protocol implementation
//!
//! Handles request parsing, dispatch and response encoding.

pub mod codec;
pub mod commands;
pub mod handlers;
pub mod responses;

pub use commands::{Command, parse_command};
pub use handlers::handle_command;
pub use responses::Response;
