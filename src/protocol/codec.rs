//! Framing helpers shared by the server session and the client.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt};

use crate::error::ProtocolError;

/// Read one `\n`-terminated line of at most `limit` bytes.
///
/// Returns `Ok(None)` on a clean end of stream before any byte.
pub async fn read_line<R>(reader: &mut R, limit: usize) -> Result<Option<String>, ProtocolError>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    let n = reader
        .take(limit as u64 + 1)
        .read_until(b'\n', &mut buf)
        .await?;

    if n == 0 {
        return Ok(None);
    }
    if buf.last() != Some(&b'\n') {
        if n > limit {
            return Err(ProtocolError::LineTooLong(limit));
        }
        return Err(ProtocolError::UnexpectedEof);
    }

    let line = String::from_utf8(buf)
        .map_err(|_| ProtocolError::Malformed("line is not valid UTF-8".into()))?;
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
}

/// Read exactly `len` payload bytes.
///
/// The buffer grows as bytes arrive, so a large declared length costs
/// nothing until the peer actually sends the data.
pub async fn read_payload<R>(reader: &mut R, len: u64) -> Result<Vec<u8>, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let mut payload = Vec::new();
    reader.take(len).read_to_end(&mut payload).await?;
    if (payload.len() as u64) < len {
        return Err(ProtocolError::UnexpectedEof);
    }
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::BufReader;

    #[tokio::test]
    async fn reads_lines_and_payloads() {
        let mut reader = BufReader::new(&b"PUT 3 f\r\nabcSTAT f\n"[..]);
        assert_eq!(read_line(&mut reader, 64).await.unwrap().unwrap(), "PUT 3 f");
        assert_eq!(read_payload(&mut reader, 3).await.unwrap(), b"abc");
        assert_eq!(read_line(&mut reader, 64).await.unwrap().unwrap(), "STAT f");
        assert!(read_line(&mut reader, 64).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn rejects_oversized_lines() {
        let mut reader = BufReader::new(&b"STAT a-very-long-path\n"[..]);
        assert!(matches!(
            read_line(&mut reader, 8).await,
            Err(ProtocolError::LineTooLong(8))
        ));
    }

    #[tokio::test]
    async fn payload_read_stops_at_declared_length() {
        let mut reader = BufReader::new(&b"abcdefOK\n"[..]);
        assert_eq!(read_payload(&mut reader, 6).await.unwrap(), b"abcdef");
        assert_eq!(read_line(&mut reader, 64).await.unwrap().unwrap(), "OK");
        assert!(read_payload(&mut reader, 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn huge_declared_length_is_not_preallocated() {
        let mut reader = BufReader::new(&b"tiny"[..]);
        assert!(matches!(
            read_payload(&mut reader, u64::MAX).await,
            Err(ProtocolError::UnexpectedEof)
        ));
    }

    #[tokio::test]
    async fn short_payload_is_eof() {
        let mut reader = BufReader::new(&b"ab"[..]);
        assert!(matches!(
            read_payload(&mut reader, 5).await,
            Err(ProtocolError::UnexpectedEof)
        ));
    }
}
