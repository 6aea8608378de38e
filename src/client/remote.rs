//! Async client for the file server's wire protocol.

use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpStream, ToSocketAddrs};

use crate::error::{ProtocolError, RemoteError};
use crate::protocol::Command;
use crate::protocol::codec::{read_line, read_payload};
use crate::protocol::responses::split_listing;
use crate::storage::FileInfo;

const MAX_RESPONSE_LINE: usize = 64 * 1024;

/// A connection to a remote file server.
///
/// Mirrors the server-side operations; each call is one request/response
/// round trip on the shared connection.
pub struct RemoteFs {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl RemoteFs {
    pub async fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self, RemoteError> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        let (read_half, writer) = stream.into_split();
        Ok(Self {
            reader: BufReader::new(read_half),
            writer,
        })
    }

    pub async fn make_directory(&mut self, path: &str) -> Result<(), RemoteError> {
        self.call(&Command::MakeDirectory(path.to_string()), &[])
            .await
            .map(|_| ())
    }

    pub async fn remove_directory(&mut self, path: &str) -> Result<(), RemoteError> {
        self.call(&Command::RemoveDirectory(path.to_string()), &[])
            .await
            .map(|_| ())
    }

    pub async fn list_directory(&mut self, path: &str) -> Result<Vec<String>, RemoteError> {
        let header = self.call(&Command::ListDirectory(path.to_string()), &[]).await?;
        let payload = self.read_body(&header).await?;
        Ok(split_listing(&payload))
    }

    pub async fn stat(&mut self, path: &str) -> Result<FileInfo, RemoteError> {
        let header = self.call(&Command::Stat(path.to_string()), &[]).await?;
        let fields: Vec<&str> = header.split(' ').collect();
        let [size, mod_time, is_dir, deleted, name_len] = fields[..] else {
            return Err(malformed(&header));
        };

        let name = read_payload(&mut self.reader, parse_number(name_len)?).await?;
        Ok(FileInfo {
            name: String::from_utf8_lossy(&name).into_owned(),
            size: parse_number(size)?,
            mod_time: mod_time.parse().map_err(|_| malformed(mod_time))?,
            is_dir: parse_flag(is_dir)?,
            deleted: parse_flag(deleted)?,
        })
    }

    pub async fn rename(&mut self, old: &str, new: &str) -> Result<(), RemoteError> {
        let command = Command::Rename {
            old: old.to_string(),
            new: new.to_string(),
        };
        self.call(&command, &[]).await.map(|_| ())
    }

    pub async fn delete(&mut self, path: &str) -> Result<(), RemoteError> {
        self.call(&Command::Delete(path.to_string()), &[])
            .await
            .map(|_| ())
    }

    pub async fn read(&mut self, path: &str) -> Result<Vec<u8>, RemoteError> {
        let header = self.call(&Command::Read(path.to_string()), &[]).await?;
        self.read_body(&header).await
    }

    pub async fn write(&mut self, path: &str, contents: &[u8]) -> Result<(), RemoteError> {
        let command = Command::Write {
            path: path.to_string(),
            len: contents.len() as u64,
        };
        self.call(&command, contents).await.map(|_| ())
    }

    /// Ask the server to close the connection.
    pub async fn quit(mut self) -> Result<(), RemoteError> {
        self.call(&Command::Quit, &[]).await.map(|_| ())
    }

    /// Send one request and return the arguments of its `OK` header.
    async fn call(&mut self, command: &Command, payload: &[u8]) -> Result<String, RemoteError> {
        self.writer.write_all(command.encode().as_bytes()).await?;
        if !payload.is_empty() {
            self.writer.write_all(payload).await?;
        }
        self.writer.flush().await?;

        let line = read_line(&mut self.reader, MAX_RESPONSE_LINE)
            .await?
            .ok_or(ProtocolError::UnexpectedEof)?;
        parse_status(&line)
    }

    async fn read_body(&mut self, header: &str) -> Result<Vec<u8>, RemoteError> {
        let len = parse_number(header)?;
        Ok(read_payload(&mut self.reader, len).await?)
    }
}

fn parse_status(line: &str) -> Result<String, RemoteError> {
    if line == "OK" || line == "BYE" {
        return Ok(String::new());
    }
    if let Some(args) = line.strip_prefix("OK ") {
        return Ok(args.to_string());
    }
    if let Some(rest) = line.strip_prefix("ERR ") {
        let (code, message) = rest.split_once(' ').unwrap_or((rest, ""));
        return Err(RemoteError::Fs {
            code: code.to_string(),
            message: message.to_string(),
        });
    }
    Err(malformed(line))
}

fn parse_number(field: &str) -> Result<u64, RemoteError> {
    field.parse().map_err(|_| malformed(field))
}

fn parse_flag(field: &str) -> Result<bool, RemoteError> {
    match field {
        "0" => Ok(false),
        "1" => Ok(true),
        _ => Err(malformed(field)),
    }
}

fn malformed(text: &str) -> RemoteError {
    RemoteError::Protocol(ProtocolError::Malformed(text.to_string()))
}
