//! Plain-TCP frame transport.
//!
//! HOMCC has no transport encryption — operators are expected to tunnel
//! over SSH or an isolated network if that's needed — so this is a thin
//! `TcpStream` wrapper rather than a QUIC endpoint. The read loop (read
//! exactly [`FrameHeader::SIZE`] bytes, parse the length, read exactly that
//! many more) is the same technique the header-then-payload framing in
//! other HOMCC transports uses; only the underlying stream type differs.

use bytes::BytesMut;
use homcc_core::{error::Result, HomccError};
use homcc_proto::{CompressionKind, Frame, FrameHeader, Message};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
};

/// A single TCP connection framed as HOMCC messages.
pub struct FrameTransport {
    stream: TcpStream,
    max_payload_bytes: u64,
}

impl FrameTransport {
    /// Wrap an already-connected stream. `max_payload_bytes` is the local
    /// decoder's configured cap (§4.1's default is 2 GiB).
    #[must_use]
    pub fn new(stream: TcpStream, max_payload_bytes: u64) -> Self {
        Self { stream, max_payload_bytes }
    }

    /// Connect to `addr` and wrap the resulting stream.
    pub async fn connect(addr: (&str, u16), max_payload_bytes: u64) -> Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        Ok(Self::new(stream, max_payload_bytes))
    }

    /// Encode, compress, and write one message.
    pub async fn send(&mut self, message: &Message, compression: CompressionKind) -> Result<()> {
        let body = message.encode_body()?;
        let compressed = homcc_compress::encode(compression, &body)?;
        let frame = Frame::new(message.message_type(), compression.to_u8(), compressed);

        let mut buf = BytesMut::with_capacity(FrameHeader::SIZE + frame.payload.len());
        frame.encode(&mut buf);
        self.stream.write_all(&buf).await?;
        Ok(())
    }

    /// Read, decompress, and parse one message. Blocks until a full frame
    /// has arrived or the peer closes the connection.
    pub async fn recv(&mut self) -> Result<Message> {
        let mut header_buf = [0u8; FrameHeader::SIZE];
        self.read_exact_or_peer_closed(&mut header_buf).await?;

        let header = FrameHeader::from_bytes(&header_buf)?;
        let payload_length = header.payload_length();
        if payload_length > self.max_payload_bytes {
            return Err(HomccError::ProtocolOverflow(format!(
                "payload length {payload_length} exceeds cap of {}",
                self.max_payload_bytes
            )));
        }

        let compression = CompressionKind::from_u8(header.compression_kind())
            .ok_or_else(|| HomccError::ProtocolMalformed(format!("unknown compression kind {}", header.compression_kind())))?;
        let message_type = homcc_proto::MessageType::from_u8(header.message_type())
            .ok_or_else(|| HomccError::ProtocolMalformed(format!("unknown message type {}", header.message_type())))?;

        let mut payload_buf = vec![0u8; payload_length as usize];
        self.read_exact_or_peer_closed(&mut payload_buf).await?;

        let decompressed = homcc_compress::decode(compression, &payload_buf)?;
        Ok(Message::decode_body(message_type, &decompressed)?)
    }

    async fn read_exact_or_peer_closed(&mut self, buf: &mut [u8]) -> Result<()> {
        match self.stream.read_exact(buf).await {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Err(HomccError::PeerClosed),
            Err(e) => Err(e.into()),
        }
    }

    /// Shut down the write half, signalling the peer no more frames follow.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.stream.shutdown().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use homcc_proto::{ConnectionRefused, MessageType};
    use tokio::net::TcpListener;

    use super::*;

    #[tokio::test]
    async fn round_trips_a_message_over_a_real_socket() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("accept");
            let mut transport = FrameTransport::new(stream, 1 << 20);
            let message = transport.recv().await.expect("recv");
            assert_eq!(message.message_type(), MessageType::ConnectionRefused);
            transport.send(&message, CompressionKind::Lzo).await.expect("send");
        });

        let mut client = FrameTransport::connect((addr.ip().to_string().as_str(), addr.port()), 1 << 20)
            .await
            .expect("connect");
        let outbound = Message::ConnectionRefused(ConnectionRefused::limit_reached());
        client.send(&outbound, CompressionKind::None).await.expect("send");
        let echoed = client.recv().await.expect("recv");
        assert_eq!(echoed, outbound);

        server.await.expect("server task");
    }

    #[tokio::test]
    async fn recv_reports_peer_closed_on_clean_disconnect() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");

        let server = tokio::spawn(async move {
            let (_stream, _) = listener.accept().await.expect("accept");
        });

        let mut client = FrameTransport::connect((addr.ip().to_string().as_str(), addr.port()), 1 << 20)
            .await
            .expect("connect");
        server.await.expect("server task");

        let err = client.recv().await.unwrap_err();
        assert!(matches!(err, HomccError::PeerClosed));
    }
}
