//! Error types
//!
//! Defines the error types for each layer of the file server: filesystem
//! operations, the wire protocol, the remote client and server startup.

use std::fmt;
use std::io;

/// The operation a filesystem error was raised from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    MakeDirectory,
    RemoveDirectory,
    ListDirectory,
    Stat,
    Rename,
    Delete,
    Read,
    Write,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::MakeDirectory => "mkdir",
            Operation::RemoveDirectory => "rmdir",
            Operation::ListDirectory => "list",
            Operation::Stat => "stat",
            Operation::Rename => "rename",
            Operation::Delete => "delete",
            Operation::Read => "read",
            Operation::Write => "write",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Condition that caused a filesystem operation to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    PermissionDenied,
    AlreadyExists,
    NotEmpty,
    CrossDevice,
    /// Only produced when path confinement is enabled.
    OutsideRoot,
    Io,
}

impl ErrorKind {
    /// Classify an OS error.
    pub fn from_io(error: &io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::NotFound => ErrorKind::NotFound,
            io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied,
            io::ErrorKind::AlreadyExists => ErrorKind::AlreadyExists,
            io::ErrorKind::DirectoryNotEmpty => ErrorKind::NotEmpty,
            io::ErrorKind::CrossesDevices => ErrorKind::CrossDevice,
            _ => ErrorKind::Io,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not found",
            ErrorKind::PermissionDenied => "permission denied",
            ErrorKind::AlreadyExists => "already exists",
            ErrorKind::NotEmpty => "directory not empty",
            ErrorKind::CrossDevice => "cross-device rename",
            ErrorKind::OutsideRoot => "path escapes server root",
            ErrorKind::Io => "i/o failure",
        }
    }
}

/// The caller-supplied path(s) an error refers to.
///
/// Always the relative form the caller sent, never the resolved path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathContext {
    Single(String),
    Pair { old: String, new: String },
}

impl fmt::Display for PathContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathContext::Single(p) => write!(f, "{}", p),
            PathContext::Pair { old, new } => write!(f, "{} -> {}", old, new),
        }
    }
}

/// A failed filesystem operation, qualified with the caller's relative path.
#[derive(Debug)]
pub struct FsError {
    kind: ErrorKind,
    operation: Operation,
    paths: PathContext,
    source: io::Error,
}

impl FsError {
    /// Attach a single relative path to an OS error.
    pub fn at(operation: Operation, path: &str, source: io::Error) -> Self {
        FsError {
            kind: ErrorKind::from_io(&source),
            operation,
            paths: PathContext::Single(path.to_string()),
            source,
        }
    }

    /// Attach both rename paths to an OS error.
    pub fn between(operation: Operation, old: &str, new: &str, source: io::Error) -> Self {
        FsError {
            kind: ErrorKind::from_io(&source),
            operation,
            paths: PathContext::Pair {
                old: old.to_string(),
                new: new.to_string(),
            },
            source,
        }
    }

    pub fn outside_root(operation: Operation, path: &str) -> Self {
        FsError {
            kind: ErrorKind::OutsideRoot,
            operation,
            paths: PathContext::Single(path.to_string()),
            source: escape_error(),
        }
    }

    pub fn outside_root_between(operation: Operation, old: &str, new: &str) -> Self {
        FsError {
            kind: ErrorKind::OutsideRoot,
            operation,
            paths: PathContext::Pair {
                old: old.to_string(),
                new: new.to_string(),
            },
            source: escape_error(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn paths(&self) -> &PathContext {
        &self.paths
    }

    pub fn raw_os_error(&self) -> Option<i32> {
        self.source.raw_os_error()
    }
}

fn escape_error() -> io::Error {
    io::Error::new(io::ErrorKind::PermissionDenied, "path escapes server root")
}

impl fmt::Display for FsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}: {} ({})",
            self.operation,
            self.paths,
            self.kind.description(),
            self.source
        )
    }
}

impl std::error::Error for FsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// Wire protocol errors
#[derive(Debug)]
pub enum ProtocolError {
    UnknownVerb(String),
    MissingArgument(&'static str),
    InvalidLength(String),
    LineTooLong(usize),
    PayloadTooLarge { len: u64, limit: u64 },
    UnexpectedEof,
    Malformed(String),
    Io(io::Error),
}

impl ProtocolError {
    /// Whether the connection can keep going after this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ProtocolError::UnknownVerb(_)
                | ProtocolError::MissingArgument(_)
                | ProtocolError::InvalidLength(_)
                | ProtocolError::Malformed(_)
        )
    }
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::UnknownVerb(v) => write!(f, "Unknown request: {}", v),
            ProtocolError::MissingArgument(v) => write!(f, "Missing argument for {}", v),
            ProtocolError::InvalidLength(s) => write!(f, "Invalid payload length: {}", s),
            ProtocolError::LineTooLong(limit) => {
                write!(f, "Request line exceeds {} bytes", limit)
            }
            ProtocolError::PayloadTooLarge { len, limit } => {
                write!(f, "Payload of {} bytes exceeds limit of {} bytes", len, limit)
            }
            ProtocolError::UnexpectedEof => write!(f, "Connection closed mid-message"),
            ProtocolError::Malformed(s) => write!(f, "Malformed message: {}", s),
            ProtocolError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for ProtocolError {}

impl From<io::Error> for ProtocolError {
    fn from(error: io::Error) -> Self {
        if error.kind() == io::ErrorKind::UnexpectedEof {
            ProtocolError::UnexpectedEof
        } else {
            ProtocolError::Io(error)
        }
    }
}

/// Errors seen by a remote caller.
#[derive(Debug)]
pub enum RemoteError {
    /// The server ran the operation and it failed.
    Fs { code: String, message: String },
    Protocol(ProtocolError),
}

impl RemoteError {
    /// Wire code of a server-side failure, if this is one.
    pub fn code(&self) -> Option<&str> {
        match self {
            RemoteError::Fs { code, .. } => Some(code),
            RemoteError::Protocol(_) => None,
        }
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteError::Fs { code, message } => write!(f, "[{}] {}", code, message),
            RemoteError::Protocol(e) => write!(f, "Protocol error: {}", e),
        }
    }
}

impl std::error::Error for RemoteError {}

impl From<ProtocolError> for RemoteError {
    fn from(error: ProtocolError) -> Self {
        RemoteError::Protocol(error)
    }
}

impl From<io::Error> for RemoteError {
    fn from(error: io::Error) -> Self {
        RemoteError::Protocol(ProtocolError::from(error))
    }
}

/// Startup and transport errors of the server process
#[derive(Debug)]
pub enum ServerError {
    Config(config::ConfigError),
    InvalidRoot(String),
    Bind { addr: String, source: io::Error },
    Io(io::Error),
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerError::Config(e) => write!(f, "Configuration error: {}", e),
            ServerError::InvalidRoot(msg) => write!(f, "Invalid server root: {}", msg),
            ServerError::Bind { addr, source } => {
                write!(f, "Failed to bind to {}: {}", addr, source)
            }
            ServerError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for ServerError {}

impl From<config::ConfigError> for ServerError {
    fn from(error: config::ConfigError) -> Self {
        ServerError::Config(error)
    }
}

impl From<io::Error> for ServerError {
    fn from(error: io::Error) -> Self {
        ServerError::Io(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_common_os_errors() {
        let cases = [
            (io::ErrorKind::NotFound, ErrorKind::NotFound),
            (io::ErrorKind::PermissionDenied, ErrorKind::PermissionDenied),
            (io::ErrorKind::AlreadyExists, ErrorKind::AlreadyExists),
            (io::ErrorKind::DirectoryNotEmpty, ErrorKind::NotEmpty),
            (io::ErrorKind::CrossesDevices, ErrorKind::CrossDevice),
            (io::ErrorKind::Interrupted, ErrorKind::Io),
        ];
        for (io_kind, expected) in cases {
            assert_eq!(ErrorKind::from_io(&io::Error::from(io_kind)), expected);
        }
    }

    #[test]
    fn display_mentions_only_relative_paths() {
        let err = FsError::between(
            Operation::Rename,
            "a/old.txt",
            "b/new.txt",
            io::Error::from(io::ErrorKind::NotFound),
        );
        let text = err.to_string();
        assert!(text.starts_with("rename a/old.txt -> b/new.txt: not found"));
        assert_eq!(
            err.paths(),
            &PathContext::Pair {
                old: "a/old.txt".into(),
                new: "b/new.txt".into()
            }
        );
    }

    #[test]
    fn keeps_raw_os_error() {
        let err = FsError::at(Operation::Delete, "x", io::Error::from_raw_os_error(2));
        assert_eq!(err.raw_os_error(), Some(2));
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn only_request_errors_are_recoverable() {
        assert!(ProtocolError::UnknownVerb("NOPE".into()).is_recoverable());
        assert!(!ProtocolError::LineTooLong(10).is_recoverable());
        assert!(!ProtocolError::UnexpectedEof.is_recoverable());
    }
}
