//! Newline framing for byte-stream transports.
//!
//! A raw stream gives no message boundaries: one `read` may return half a
//! frame or three frames at once. Each frame is therefore written as its
//! payload followed by `\n`, and [`FrameReader`] buffers incoming bytes
//! until a full line is available.

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::{TransportError, MAX_FRAME_LEN};

/// Appends the frame delimiter, rejecting payloads that would break framing.
pub fn encode_frame(frame: &[u8]) -> Result<Vec<u8>, TransportError> {
    if frame.len() > MAX_FRAME_LEN {
        return Err(TransportError::InvalidFrame(format!(
            "frame of {} bytes exceeds {MAX_FRAME_LEN}",
            frame.len()
        )));
    }
    if frame.contains(&b'\n') {
        return Err(TransportError::InvalidFrame(
            "frame contains a line terminator".into(),
        ));
    }
    let mut out = Vec::with_capacity(frame.len() + 1);
    out.extend_from_slice(frame);
    out.push(b'\n');
    Ok(out)
}

/// Splits a byte stream into newline-delimited frames.
///
/// Empty lines are skipped and a trailing `\r` is stripped. Bytes after the
/// last delimiter at end-of-stream are yielded as a final frame.
///
/// `next_frame` is cancel-safe: buffered bytes survive a dropped future,
/// so it can sit in a `tokio::select!` branch.
pub struct FrameReader<R> {
    inner: R,
    buf: Vec<u8>,
    eof: bool,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buf: Vec::with_capacity(MAX_FRAME_LEN),
            eof: false,
        }
    }

    /// Reads the next frame. `Ok(None)` means the stream has ended.
    pub async fn next_frame(
        &mut self,
    ) -> Result<Option<Vec<u8>>, TransportError> {
        let mut chunk = [0u8; MAX_FRAME_LEN];
        loop {
            if let Some(frame) = self.take_line()? {
                if frame.is_empty() {
                    continue;
                }
                return Ok(Some(frame));
            }
            // Room for a full payload plus a trailing `\r`.
            if self.buf.len() > MAX_FRAME_LEN + 1 {
                let len = self.buf.len();
                self.buf.clear();
                return Err(TransportError::InvalidFrame(format!(
                    "no delimiter within {len} buffered bytes"
                )));
            }
            if self.eof {
                if self.buf.is_empty() {
                    return Ok(None);
                }
                let rest = std::mem::take(&mut self.buf);
                return checked(rest).map(Some);
            }

            let n = self
                .inner
                .read(&mut chunk)
                .await
                .map_err(TransportError::ReceiveFailed)?;
            if n == 0 {
                self.eof = true;
            } else {
                self.buf.extend_from_slice(&chunk[..n]);
            }
        }
    }

    fn take_line(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        let Some(pos) = self.buf.iter().position(|b| *b == b'\n') else {
            return Ok(None);
        };
        let mut line: Vec<u8> = self.buf.drain(..=pos).collect();
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        checked(line).map(Some)
    }
}

fn checked(frame: Vec<u8>) -> Result<Vec<u8>, TransportError> {
    if frame.len() > MAX_FRAME_LEN {
        return Err(TransportError::InvalidFrame(format!(
            "frame of {} bytes exceeds {MAX_FRAME_LEN}",
            frame.len()
        )));
    }
    Ok(frame)
}

#[cfg(test)]
mod tests {
    use tokio::io::AsyncWriteExt;

    use super::*;

    #[test]
    fn test_encode_frame_appends_newline() {
        assert_eq!(encode_frame(b"rs1").unwrap(), b"rs1\n");
    }

    #[test]
    fn test_encode_frame_rejects_embedded_newline() {
        assert!(matches!(
            encode_frame(b"rs1\nrs0"),
            Err(TransportError::InvalidFrame(_))
        ));
    }

    #[test]
    fn test_encode_frame_rejects_oversized() {
        let big = vec![b'a'; MAX_FRAME_LEN + 1];
        assert!(encode_frame(&big).is_err());
        let exact = vec![b'a'; MAX_FRAME_LEN];
        assert!(encode_frame(&exact).is_ok());
    }

    #[tokio::test]
    async fn test_next_frame_splits_coalesced_writes() {
        let (mut tx, rx) = tokio::io::duplex(64);
        tx.write_all(b"Connected\nrs1\nrs1\n").await.unwrap();
        drop(tx);

        let mut reader = FrameReader::new(rx);
        assert_eq!(reader.next_frame().await.unwrap().unwrap(), b"Connected");
        assert_eq!(reader.next_frame().await.unwrap().unwrap(), b"rs1");
        assert_eq!(reader.next_frame().await.unwrap().unwrap(), b"rs1");
        assert!(reader.next_frame().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_next_frame_reassembles_split_writes() {
        let (mut tx, rx) = tokio::io::duplex(64);
        let mut reader = FrameReader::new(rx);

        let writer = tokio::spawn(async move {
            tx.write_all(b"dd-").await.unwrap();
            tokio::task::yield_now().await;
            tx.write_all(b"70\r\n").await.unwrap();
        });

        assert_eq!(reader.next_frame().await.unwrap().unwrap(), b"dd-70");
        writer.await.unwrap();
    }

    #[tokio::test]
    async fn test_next_frame_skips_empty_lines() {
        let (mut tx, rx) = tokio::io::duplex(64);
        tx.write_all(b"\n\r\nes0\n").await.unwrap();
        drop(tx);

        let mut reader = FrameReader::new(rx);
        assert_eq!(reader.next_frame().await.unwrap().unwrap(), b"es0");
        assert!(reader.next_frame().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_next_frame_yields_unterminated_tail_at_eof() {
        let (mut tx, rx) = tokio::io::duplex(64);
        tx.write_all(b"Disconnect").await.unwrap();
        drop(tx);

        let mut reader = FrameReader::new(rx);
        assert_eq!(reader.next_frame().await.unwrap().unwrap(), b"Disconnect");
        assert!(reader.next_frame().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_next_frame_overlong_line_is_error() {
        let (mut tx, rx) = tokio::io::duplex(4096);
        tx.write_all(&vec![b'x'; MAX_FRAME_LEN * 2]).await.unwrap();

        let mut reader = FrameReader::new(rx);
        assert!(matches!(
            reader.next_frame().await,
            Err(TransportError::InvalidFrame(_))
        ));
    }

    #[tokio::test]
    async fn test_next_frame_overlong_terminated_line_is_error() {
        let (mut tx, rx) = tokio::io::duplex(8192);
        let mut line = vec![b'x'; 1500];
        line.push(b'\n');
        tx.write_all(&line).await.unwrap();
        tx.write_all(b"rs1\n").await.unwrap();

        let mut reader = FrameReader::new(rx);
        assert!(matches!(
            reader.next_frame().await,
            Err(TransportError::InvalidFrame(_))
        ));
    }

    #[tokio::test]
    async fn test_next_frame_max_length_line_is_accepted() {
        let (mut tx, rx) = tokio::io::duplex(8192);
        let mut line = vec![b'x'; MAX_FRAME_LEN];
        line.extend_from_slice(b"\r\n");
        tx.write_all(&line).await.unwrap();
        drop(tx);

        let mut reader = FrameReader::new(rx);
        assert_eq!(reader.next_frame().await.unwrap().unwrap().len(), MAX_FRAME_LEN);
        assert!(reader.next_frame().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_next_frame_overlong_tail_at_eof_is_error() {
        let (mut tx, rx) = tokio::io::duplex(8192);
        tx.write_all(&vec![b'x'; MAX_FRAME_LEN + 1]).await.unwrap();
        drop(tx);

        let mut reader = FrameReader::new(rx);
        assert!(matches!(
            reader.next_frame().await,
            Err(TransportError::InvalidFrame(_))
        ));
    }
}
