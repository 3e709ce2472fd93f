//! Fixed-size frame I/O over a byte stream

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::trace;

use higoal_core::{Frame, FRAME_LEN};

use crate::error::Result;

/// Read half of a relay connection
pub struct FrameReader {
    inner: Box<dyn AsyncRead + Send + Unpin>,
    buf: BytesMut,
}

impl FrameReader {
    pub fn new(inner: impl AsyncRead + Send + Unpin + 'static) -> Self {
        Self {
            inner: Box::new(inner),
            buf: BytesMut::with_capacity(FRAME_LEN),
        }
    }

    /// Read exactly one frame
    ///
    /// Returns `Ok(None)` when the peer closes the stream before a full frame
    /// has arrived; any partial bytes are discarded.
    pub async fn read_frame(&mut self) -> Result<Option<Frame>> {
        while self.buf.len() < FRAME_LEN {
            let remaining = (FRAME_LEN - self.buf.len()) as u64;
            let n = (&mut self.inner).take(remaining).read_buf(&mut self.buf).await?;
            if n == 0 {
                if !self.buf.is_empty() {
                    trace!(partial = self.buf.len(), "Discarding partial frame");
                }
                self.buf.clear();
                return Ok(None);
            }
        }

        let chunk = self.buf.split_to(FRAME_LEN);
        let frame = Frame::from_slice(&chunk)?;
        trace!("Received frame: {:?}", frame);
        Ok(Some(frame))
    }
}

/// Write half of a relay connection
pub struct FrameWriter {
    inner: Box<dyn AsyncWrite + Send + Unpin>,
}

impl FrameWriter {
    pub fn new(inner: impl AsyncWrite + Send + Unpin + 'static) -> Self {
        Self {
            inner: Box::new(inner),
        }
    }

    /// Write all 48 bytes of a frame and flush
    pub async fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        trace!("Sending frame: {:?}", frame);
        self.inner.write_all(frame.as_bytes()).await?;
        self.inner.flush().await?;
        Ok(())
    }

    /// Shut down the write direction
    pub async fn shutdown(&mut self) {
        let _ = self.inner.shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn numbered_frame(seed: u8) -> Frame {
        let mut bytes = [0u8; FRAME_LEN];
        for (i, b) in bytes.iter_mut().enumerate() {
            *b = seed.wrapping_add(i as u8);
        }
        Frame::new(bytes)
    }

    #[tokio::test]
    async fn test_reassembles_split_frame() {
        let (client, mut server) = tokio::io::duplex(256);
        let mut reader = FrameReader::new(client);
        let frame = numbered_frame(1);

        server.write_all(&frame.as_bytes()[..20]).await.unwrap();
        server.flush().await.unwrap();
        let pending = tokio::spawn(async move {
            let read = reader.read_frame().await;
            (reader, read)
        });
        tokio::task::yield_now().await;
        server.write_all(&frame.as_bytes()[20..]).await.unwrap();

        let (_reader, read) = pending.await.unwrap();
        assert_eq!(read.unwrap(), Some(frame));
    }

    #[tokio::test]
    async fn test_back_to_back_frames() {
        let (client, mut server) = tokio::io::duplex(256);
        let mut reader = FrameReader::new(client);
        let first = numbered_frame(1);
        let second = numbered_frame(100);

        let mut both = first.as_bytes().to_vec();
        both.extend_from_slice(second.as_bytes());
        server.write_all(&both).await.unwrap();

        assert_eq!(reader.read_frame().await.unwrap(), Some(first));
        assert_eq!(reader.read_frame().await.unwrap(), Some(second));
    }

    #[tokio::test]
    async fn test_close_mid_frame_is_none() {
        let (client, mut server) = tokio::io::duplex(256);
        let mut reader = FrameReader::new(client);

        server.write_all(&[0xBB; 10]).await.unwrap();
        drop(server);

        assert_eq!(reader.read_frame().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_writer_sends_whole_frame() {
        let (client, mut server) = tokio::io::duplex(256);
        let mut writer = FrameWriter::new(client);
        let frame = numbered_frame(7);

        writer.write_frame(&frame).await.unwrap();

        let mut received = [0u8; FRAME_LEN];
        server.read_exact(&mut received).await.unwrap();
        assert_eq!(&received, frame.as_bytes());
    }
}
