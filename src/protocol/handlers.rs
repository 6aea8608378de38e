//! Request dispatch
//!
//! Runs a parsed command against the file access handler and turns the
//! outcome into a wire response.

use log::debug;

use crate::error::{FsError, handle_error};
use crate::protocol::commands::Command;
use crate::protocol::responses::Response;
use crate::storage::FileAccessHandler;

/// Execute one command. `payload` is the body of a `PUT` and empty otherwise.
///
/// Blocks on filesystem I/O; async callers should run it on a blocking thread.
pub fn handle_command(handler: &FileAccessHandler, command: Command, payload: Vec<u8>) -> Response {
    debug!("Handling {}", command.verb());

    let result = match command {
        Command::MakeDirectory(path) => handler.make_directory(&path).map(|_| Response::Done),
        Command::RemoveDirectory(path) => handler.remove_directory(&path).map(|_| Response::Done),
        Command::ListDirectory(path) => handler.list_directory(&path).map(Response::Listing),
        Command::Stat(path) => handler.stat(&path).map(Response::Info),
        Command::Rename { old, new } => handler.rename(&old, &new).map(|_| Response::Done),
        Command::Delete(path) => handler.delete(&path).map(|_| Response::Done),
        Command::Read(path) => handler.read(&path).map(Response::Contents),
        Command::Write { path, .. } => handler.write(&path, &payload).map(|_| Response::Done),
        Command::Quit => Ok(Response::Bye),
    };

    result.unwrap_or_else(|err: FsError| {
        handle_error(&err);
        Response::from_fs_error(&err)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{FileInfo, PathResolver};
    use std::fs;
    use tempfile::TempDir;

    fn setup() -> (TempDir, FileAccessHandler) {
        let base = TempDir::new().unwrap();
        fs::create_dir(base.path().join("root")).unwrap();
        let handler = FileAccessHandler::new(PathResolver::new(base.path().join("root")), base.path());
        (base, handler)
    }

    #[test]
    fn dispatches_to_handler() {
        let (_base, handler) = setup();

        let put = Command::Write {
            path: "f".into(),
            len: 3,
        };
        assert_eq!(handle_command(&handler, put, b"abc".to_vec()), Response::Done);
        assert_eq!(
            handle_command(&handler, Command::Read("f".into()), Vec::new()),
            Response::Contents(b"abc".to_vec())
        );
        assert_eq!(
            handle_command(&handler, Command::ListDirectory(String::new()), Vec::new()),
            Response::Listing(vec!["f".into()])
        );
        assert_eq!(
            handle_command(&handler, Command::Stat("gone".into()), Vec::new()),
            Response::Info(FileInfo::deleted_marker())
        );
    }

    #[test]
    fn failures_become_error_responses() {
        let (_base, handler) = setup();
        match handle_command(&handler, Command::Delete("missing/x".into()), Vec::new()) {
            Response::Failure { code, message } => {
                assert_eq!(code, "not-found");
                assert!(message.starts_with("delete missing/x"));
            }
            other => panic!("unexpected response {:?}", other),
        }
    }
}
