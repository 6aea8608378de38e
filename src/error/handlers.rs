//! Error handlers
//!
//! Maps errors onto the stable codes sent to remote callers.

use crate::error::types::{ErrorKind, FsError, ProtocolError};
use log::warn;

/// Log a failed filesystem operation
pub fn handle_error(err: &FsError) {
    warn!(
        "{} {} failed [{}] (os error {:?})",
        err.operation(),
        err.paths(),
        error_to_wire_code(err.kind()),
        err.raw_os_error()
    );
}

/// Convert an error kind to its wire code
pub fn error_to_wire_code(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::NotFound => "not-found",
        ErrorKind::PermissionDenied => "permission-denied",
        ErrorKind::AlreadyExists => "already-exists",
        ErrorKind::NotEmpty => "not-empty",
        ErrorKind::CrossDevice => "cross-device",
        ErrorKind::OutsideRoot => "outside-root",
        ErrorKind::Io => "io",
    }
}

/// Convert a protocol error to its wire code
pub fn protocol_error_code(err: &ProtocolError) -> &'static str {
    match err {
        ProtocolError::LineTooLong(_) | ProtocolError::PayloadTooLarge { .. } => "too-large",
        _ => "bad-request",
    }
}
