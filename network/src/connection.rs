//! Framed TCP connections.
//!
//! One read task and one write task per peer. Readers push complete
//! frames onto the shared inbound channel; writers drain a per-peer
//! queue. Neither side ever blocks protocol logic — a dead peer just
//! stops draining its queue until the tasks exit.

use std::collections::HashMap;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;

use crate::codec::{parse_header, FRAME_OVERHEAD};
use crate::NetworkError;

/// Per-peer outbound queue depth.
const PEER_QUEUE_CAPACITY: usize = 256;

/// Read one complete frame (header + payload) from the stream.
pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Vec<u8>, NetworkError> {
    let mut header = [0u8; FRAME_OVERHEAD];
    reader
        .read_exact(&mut header)
        .await
        .map_err(|e| NetworkError::PeerUnreachable(e.to_string()))?;
    let length = parse_header(&header)?;

    let mut frame = vec![0u8; FRAME_OVERHEAD + length];
    frame[..FRAME_OVERHEAD].copy_from_slice(&header);
    reader
        .read_exact(&mut frame[FRAME_OVERHEAD..])
        .await
        .map_err(|e| NetworkError::PeerUnreachable(e.to_string()))?;
    Ok(frame)
}

/// Write one complete frame to the stream.
pub async fn write_frame<W: AsyncWrite + Unpin>(
    writer: &mut W,
    frame: &[u8],
) -> Result<(), NetworkError> {
    writer
        .write_all(frame)
        .await
        .map_err(|e| NetworkError::PeerUnreachable(e.to_string()))?;
    writer
        .flush()
        .await
        .map_err(|e| NetworkError::PeerUnreachable(e.to_string()))
}

/// Maps peer ids to their outbound queues.
#[derive(Default)]
pub struct ConnectionRegistry {
    writers: HashMap<String, mpsc::Sender<Vec<u8>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, peer_id: String, sender: mpsc::Sender<Vec<u8>>) {
        self.writers.insert(peer_id, sender);
    }

    pub fn unregister(&mut self, peer_id: &str) {
        self.writers.remove(peer_id);
    }

    pub fn sender_for(&self, peer_id: &str) -> Option<&mpsc::Sender<Vec<u8>>> {
        self.writers.get(peer_id)
    }

    pub fn len(&self) -> usize {
        self.writers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writers.is_empty()
    }
}

/// Spawn the read and write tasks for an established connection.
///
/// Returns the sender for this peer's outbound queue. Inbound frames
/// arrive on `inbound_tx` tagged with the peer id; the read task ends on
/// any I/O or framing error, which the node observes as a disconnect.
pub fn spawn_connection(
    stream: TcpStream,
    peer_id: String,
    inbound_tx: mpsc::Sender<(String, Vec<u8>)>,
) -> mpsc::Sender<Vec<u8>> {
    let (frame_tx, mut frame_rx) = mpsc::channel::<Vec<u8>>(PEER_QUEUE_CAPACITY);
    let (mut read_half, mut write_half) = stream.into_split();

    let reader_peer = peer_id.clone();
    tokio::spawn(async move {
        loop {
            match read_frame(&mut read_half).await {
                Ok(frame) => {
                    if inbound_tx.send((reader_peer.clone(), frame)).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    tracing::debug!(peer = %reader_peer, %e, "read loop ended");
                    break;
                }
            }
        }
    });

    tokio::spawn(async move {
        while let Some(frame) = frame_rx.recv().await {
            if let Err(e) = write_frame(&mut write_half, &frame).await {
                tracing::debug!(peer = %peer_id, %e, "write loop ended");
                break;
            }
        }
    });

    frame_tx
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::encode_frame;
    use lattice_messages::{GossipMessage, KeepaliveMessage, MessageHeader, MessageKind};
    use lattice_types::{ClusterId, Timestamp};

    fn keepalive_frame() -> Vec<u8> {
        encode_frame(&GossipMessage::Keepalive(KeepaliveMessage {
            header: MessageHeader::new(
                MessageKind::Keepalive,
                ClusterId::new("chat"),
                0,
                Timestamp::new(1),
            ),
            peers: vec![],
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn frame_roundtrip_over_duplex() {
        let (mut client, mut server) = tokio::io::duplex(4096);
        let frame = keepalive_frame();

        write_frame(&mut client, &frame).await.unwrap();
        let received = read_frame(&mut server).await.unwrap();
        assert_eq!(received, frame);
    }

    #[tokio::test]
    async fn garbage_header_is_rejected() {
        let (mut client, mut server) = tokio::io::duplex(4096);
        client.write_all(&[0xFFu8; 32]).await.unwrap();
        assert!(read_frame(&mut server).await.is_err());
    }

    #[tokio::test]
    async fn connection_tasks_shuttle_frames() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (inbound_tx, mut inbound_rx) = mpsc::channel(16);
        let accept_inbound = inbound_tx.clone();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            spawn_connection(stream, "server-side".into(), accept_inbound);
        });

        let stream = TcpStream::connect(addr).await.unwrap();
        let client_tx = spawn_connection(stream, "client-side".into(), inbound_tx);

        client_tx.send(keepalive_frame()).await.unwrap();
        let (peer, frame) = inbound_rx.recv().await.unwrap();
        assert_eq!(peer, "server-side");
        assert_eq!(frame, keepalive_frame());
    }
}
