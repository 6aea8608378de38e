//! Per-connection request loop

use log::{debug, info, warn};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::OwnedWriteHalf;

use crate::config::ServerConfig;
use crate::error::ProtocolError;
use crate::protocol::codec::{read_line, read_payload};
use crate::protocol::{Command, Response, handle_command, parse_command};
use crate::storage::FileAccessHandler;

/// Framing limits applied to every connection.
#[derive(Debug, Clone, Copy)]
pub struct SessionLimits {
    pub max_request_line: usize,
    pub max_payload_bytes: u64,
}

impl SessionLimits {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            max_request_line: config.max_request_line,
            max_payload_bytes: config.max_payload_bytes,
        }
    }
}

/// Serves requests from one connection until it closes or sends `QUIT`.
///
/// Requests are answered strictly in order. Filesystem work runs on the
/// blocking pool so a slow disk never stalls the accept loop.
pub async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    handler: Arc<FileAccessHandler>,
    limits: SessionLimits,
) -> Result<(), ProtocolError> {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    loop {
        let line = match read_line(&mut reader, limits.max_request_line).await {
            Ok(Some(line)) => line,
            Ok(None) => {
                info!("Connection closed by client {}", peer);
                return Ok(());
            }
            Err(e) if e.is_recoverable() => {
                send(&mut write_half, &Response::from_protocol_error(&e)).await?;
                continue;
            }
            Err(e @ ProtocolError::LineTooLong(_)) => {
                warn!("Closing {}: {}", peer, e);
                send(&mut write_half, &Response::from_protocol_error(&e)).await?;
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        let command = match parse_command(&line) {
            Ok(command) => command,
            Err(e) => {
                debug!("Rejected request from {}: {}", peer, e);
                send(&mut write_half, &Response::from_protocol_error(&e)).await?;
                continue;
            }
        };

        let payload = match &command {
            Command::Write { len, .. } if *len > limits.max_payload_bytes => {
                // The payload cannot be skipped safely, so the stream is abandoned.
                let e = ProtocolError::PayloadTooLarge {
                    len: *len,
                    limit: limits.max_payload_bytes,
                };
                warn!("Closing {}: {}", peer, e);
                send(&mut write_half, &Response::from_protocol_error(&e)).await?;
                return Ok(());
            }
            Command::Write { len, .. } => read_payload(&mut reader, *len).await?,
            _ => Vec::new(),
        };

        debug!("Received from {}: {}", peer, command.verb());
        let quit = command == Command::Quit;
        let handler = Arc::clone(&handler);
        let response = tokio::task::spawn_blocking(move || handle_command(&handler, command, payload))
            .await
            .map_err(io::Error::other)?;

        send(&mut write_half, &response).await?;

        if quit {
            info!("Client {} requested to quit", peer);
            return Ok(());
        }
    }
}

async fn send(writer: &mut OwnedWriteHalf, response: &Response) -> Result<(), ProtocolError> {
    writer.write_all(&response.encode()).await?;
    writer.flush().await?;
    Ok(())
}
