use std::io;
use std::net::{Shutdown, TcpStream};
use std::sync::Mutex;

use crate::amp::{self, Message};
use crate::global::{ConnectorId, PeerId};

/// Where a peer connection came from. Drives what happens on link drop: an
/// accepted peer is simply forgotten, a connector-owned peer triggers
/// reconnection by that connector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerOrigin {
    Accepted,
    Connector(ConnectorId),
}

/// A live, bidirectional TCP connection to one peer.
///
/// The read half is never stored here: it is moved into the dedicated reader
/// thread spawned when the peer is created (see `connection_manager`), so
/// that thread is the sole reader and needs no locking. The write half is
/// shared (broadcast sends and unicast replies both reach for it), hence the
/// mutex.
pub struct Peer {
    pub id: PeerId,
    pub origin: PeerOrigin,
    write_half: Mutex<TcpStream>,
}

impl Peer {
    pub fn new(id: PeerId, origin: PeerOrigin, write_half: TcpStream) -> Peer {
        Peer { id, origin, write_half: Mutex::new(write_half) }
    }

    /// Encodes and writes `msg` to this peer. A short write or I/O error
    /// means the connection is dead; the caller is expected to evict the
    /// peer from the live set when this returns `Err`.
    pub fn send(&self, msg: &Message) -> io::Result<()> {
        let frame = amp::encode(msg);
        let mut stream = self.write_half.lock().unwrap_or_else(|e| e.into_inner());
        amp::write_frame(&mut *stream, &frame)
    }

    /// Forces both halves of the underlying socket closed. Used by eviction:
    /// shutting down a cloned `TcpStream` tears down the shared file
    /// descriptor, which unblocks this peer's reader thread (blocked in
    /// `read_exact`) with an I/O error even though the shutdown call itself
    /// runs on a different thread.
    pub fn shutdown(&self) {
        if let Ok(stream) = self.write_half.lock() {
            let _ = stream.shutdown(Shutdown::Both);
        }
    }
}
