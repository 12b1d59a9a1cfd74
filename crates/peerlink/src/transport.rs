//! Transport boundary.
//!
//! The bridge only needs "send a block of bytes"; arrival is pushed in by
//! the surrounding network layer via [`Peer::on_message`]. [`StreamTransport`]
//! is a provided adapter that pumps length-delimited frames over any duplex
//! stream so two peers can be wired up without a real socket layer.
//!
//! [`Peer::on_message`]: crate::peer::Peer::on_message

use std::io;

use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio_util::bytes::Bytes;
use tokio_util::codec::{FramedRead, FramedWrite, LengthDelimitedCodec};

/// Byte-block sink the bridge emits frames through.
///
/// Implementations may fragment large payloads into multiple physical
/// frames; the bridge always hands in one logical, fully encoded block.
pub trait Transport: Send + Sync {
    fn send_binary(&self, block: Bytes) -> io::Result<()>;
}

/// Framed adapter over any `AsyncRead + AsyncWrite` duplex stream.
///
/// Spawns a writer pump draining an outbound queue and a reader pump
/// surfacing complete frames; `send_binary` only queues, so callers never
/// block on the socket.
pub struct StreamTransport {
    outbound: mpsc::UnboundedSender<Bytes>,
}

impl StreamTransport {
    /// Split `stream` and spawn the read/write pumps.
    ///
    /// Returns the transport and the inbound frame receiver. Must be called
    /// within a tokio runtime.
    pub fn spawn<S>(stream: S) -> (Self, mpsc::UnboundedReceiver<Bytes>)
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (read_half, write_half) = tokio::io::split(stream);
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Bytes>();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel::<Bytes>();

        let mut writer = FramedWrite::new(write_half, LengthDelimitedCodec::new());
        tokio::spawn(async move {
            while let Some(block) = outbound_rx.recv().await {
                if let Err(e) = writer.send(block).await {
                    tracing::error!(error = %e, "writer pump failed");
                    break;
                }
            }
            tracing::trace!("writer pump exiting");
        });

        let mut reader = FramedRead::new(read_half, LengthDelimitedCodec::new());
        tokio::spawn(async move {
            loop {
                match reader.next().await {
                    Some(Ok(frame)) => {
                        if inbound_tx.send(frame.freeze()).is_err() {
                            break;
                        }
                    }
                    Some(Err(e)) => {
                        tracing::error!(error = %e, "reader pump failed");
                        break;
                    }
                    None => {
                        tracing::trace!("stream closed");
                        break;
                    }
                }
            }
        });

        (
            Self {
                outbound: outbound_tx,
            },
            inbound_rx,
        )
    }
}

impl Transport for StreamTransport {
    fn send_binary(&self, block: Bytes) -> io::Result<()> {
        self.outbound
            .send(block)
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "transport writer closed"))
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn frames_cross_a_duplex_stream() {
        let (left_io, right_io) = tokio::io::duplex(256);
        let (left, _left_inbound) = StreamTransport::spawn(left_io);
        let (_right, mut right_inbound) = StreamTransport::spawn(right_io);

        left.send_binary(Bytes::from_static(b"hello")).unwrap();
        let frame = right_inbound.recv().await.unwrap();
        assert_eq!(&frame[..], b"hello");
    }

    #[tokio::test]
    async fn both_directions_are_independent() {
        let (left_io, right_io) = tokio::io::duplex(256);
        let (left, mut left_inbound) = StreamTransport::spawn(left_io);
        let (right, mut right_inbound) = StreamTransport::spawn(right_io);

        left.send_binary(Bytes::from_static(b"ping")).unwrap();
        right.send_binary(Bytes::from_static(b"pong")).unwrap();

        assert_eq!(&right_inbound.recv().await.unwrap()[..], b"ping");
        assert_eq!(&left_inbound.recv().await.unwrap()[..], b"pong");
    }

    #[tokio::test]
    async fn send_after_stream_drop_reports_broken_pipe() {
        let (left_io, right_io) = tokio::io::duplex(256);
        let (left, _inbound) = StreamTransport::spawn(left_io);
        drop(right_io);

        // The writer pump may take a moment to observe the closed stream.
        let mut result = left.send_binary(Bytes::from_static(b"x"));
        for _ in 0..50 {
            if result.is_err() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            result = left.send_binary(Bytes::from_static(b"x"));
        }
        assert!(result.is_err());
    }
}
