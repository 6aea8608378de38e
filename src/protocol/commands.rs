//! Module `commands`
//!
//! Request header parsing and encoding. A request is one line,
//! `VERB argument`, and a `PUT` header is followed by its raw payload.

use crate::error::ProtocolError;

/// A request header received from a caller.
///
/// Paths are the remainder of the line after the verb and may contain
/// spaces. `RENAME` separates its two paths with a tab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    MakeDirectory(String),
    RemoveDirectory(String),
    ListDirectory(String),
    Stat(String),
    Rename { old: String, new: String },
    Delete(String),
    Read(String),
    /// Followed on the wire by exactly `len` bytes of contents
    Write { path: String, len: u64 },
    Quit,
}

impl Command {
    /// Verb as sent on the wire
    pub fn verb(&self) -> &'static str {
        match self {
            Command::MakeDirectory(_) => "MKDIR",
            Command::RemoveDirectory(_) => "RMDIR",
            Command::ListDirectory(_) => "LIST",
            Command::Stat(_) => "STAT",
            Command::Rename { .. } => "RENAME",
            Command::Delete(_) => "DELETE",
            Command::Read(_) => "GET",
            Command::Write { .. } => "PUT",
            Command::Quit => "QUIT",
        }
    }

    /// Encode as a request header line, including the line terminator.
    pub fn encode(&self) -> String {
        match self {
            Command::MakeDirectory(p)
            | Command::RemoveDirectory(p)
            | Command::ListDirectory(p)
            | Command::Stat(p)
            | Command::Delete(p)
            | Command::Read(p) => format!("{} {}\r\n", self.verb(), p),
            Command::Rename { old, new } => format!("{} {}\t{}\r\n", self.verb(), old, new),
            Command::Write { path, len } => format!("{} {} {}\r\n", self.verb(), len, path),
            Command::Quit => format!("{}\r\n", self.verb()),
        }
    }
}

/// Parses a request line into a `Command`.
///
/// The verb is case-insensitive. Only the line terminator is stripped;
/// the path keeps any surrounding whitespace.
pub fn parse_command(raw: &str) -> Result<Command, ProtocolError> {
    let line = raw.trim_end_matches(['\r', '\n']);
    let (verb, arg) = line.split_once(' ').unwrap_or((line, ""));
    let arg = arg.to_string();

    match verb.to_ascii_uppercase().as_str() {
        "MKDIR" => Ok(Command::MakeDirectory(arg)),
        "RMDIR" => Ok(Command::RemoveDirectory(arg)),
        "LIST" => Ok(Command::ListDirectory(arg)),
        "STAT" => Ok(Command::Stat(arg)),
        "DELETE" => Ok(Command::Delete(arg)),
        "GET" => Ok(Command::Read(arg)),
        "RENAME" => match arg.split_once('\t') {
            Some((old, new)) => Ok(Command::Rename {
                old: old.to_string(),
                new: new.to_string(),
            }),
            None => Err(ProtocolError::MissingArgument("RENAME")),
        },
        "PUT" => {
            let (len, path) = arg
                .split_once(' ')
                .ok_or(ProtocolError::MissingArgument("PUT"))?;
            let len = len
                .parse::<u64>()
                .map_err(|_| ProtocolError::InvalidLength(len.to_string()))?;
            Ok(Command::Write {
                path: path.to_string(),
                len,
            })
        }
        "QUIT" => Ok(Command::Quit),
        _ => Err(ProtocolError::UnknownVerb(verb.to_string())),
    }
}
