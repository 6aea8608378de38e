//! Response handling
//!
//! Every response starts with a header line. Responses that carry data
//! declare its length in the header and follow it with the raw bytes.

use crate::error::{FsError, ProtocolError, error_to_wire_code, protocol_error_code};
use crate::storage::FileInfo;

/// Separates names in a listing payload; it cannot appear in a file name.
pub const NAME_SEPARATOR: u8 = 0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// A mutation succeeded: `OK`
    Done,
    /// `OK len` followed by NUL-separated names
    Listing(Vec<String>),
    /// `OK size mtime dir deleted namelen` followed by the name
    Info(FileInfo),
    /// `OK len` followed by the file contents
    Contents(Vec<u8>),
    /// `ERR code message`
    Failure { code: String, message: String },
    /// `BYE`, after which the connection closes
    Bye,
}

impl Response {
    pub fn from_fs_error(err: &FsError) -> Self {
        Response::Failure {
            code: error_to_wire_code(err.kind()).to_string(),
            message: err.to_string(),
        }
    }

    pub fn from_protocol_error(err: &ProtocolError) -> Self {
        Response::Failure {
            code: protocol_error_code(err).to_string(),
            message: err.to_string(),
        }
    }

    /// Encode the header line plus any payload.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Response::Done => b"OK\r\n".to_vec(),
            Response::Listing(names) => {
                let payload = names.join("\0").into_bytes();
                with_payload(format!("OK {}\r\n", payload.len()), &payload)
            }
            Response::Info(info) => with_payload(
                format!(
                    "OK {} {} {} {} {}\r\n",
                    info.size,
                    info.mod_time,
                    info.is_dir as u8,
                    info.deleted as u8,
                    info.name.len()
                ),
                info.name.as_bytes(),
            ),
            Response::Contents(bytes) => with_payload(format!("OK {}\r\n", bytes.len()), bytes),
            Response::Failure { code, message } => {
                format!("ERR {} {}\r\n", code, single_line(message)).into_bytes()
            }
            Response::Bye => b"BYE\r\n".to_vec(),
        }
    }
}

fn with_payload(header: String, payload: &[u8]) -> Vec<u8> {
    let mut out = header.into_bytes();
    out.extend_from_slice(payload);
    out
}

fn single_line(message: &str) -> String {
    message.replace(['\r', '\n'], " ")
}

/// Split a listing payload back into names.
pub fn split_listing(payload: &[u8]) -> Vec<String> {
    if payload.is_empty() {
        return Vec::new();
    }
    payload
        .split(|b| *b == NAME_SEPARATOR)
        .map(|name| String::from_utf8_lossy(name).into_owned())
        .collect()
}
