// The Connection Manager: owns every listener and outbound connector for one
// endpoint, and maintains the single logical set of live peers they feed.
//
// One blocking OS thread per listener, per connector, and per accepted peer:
// each listener accepts in a loop, each connector connects-and-reads in a
// loop, and each accepted peer gets its own reader thread once accepted.

use std::collections::{HashMap, HashSet};
use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use socket2::{Domain, Socket, Type};

use crate::amp;
use crate::callbacks::Callbacks;
use crate::config::Config;
use crate::error::{EngineError, Result};
use crate::global::{ConnectorId, IdSequence, PeerId};
use crate::peer::{Peer, PeerOrigin};

/// Receives every inbound message decoded off any peer belonging to this
/// endpoint. Implemented by `crate::dispatcher::Dispatcher`.
pub trait FrameSink: Send + Sync {
    fn on_message(&self, peer: Arc<Peer>, msg: amp::Message);
}

/// The live peer set: every currently-connected peer, in insertion order,
/// plus the round-robin cursor that indexes into that order. Both are
/// observed atomically through the enclosing mutex, so the cursor always
/// indexes into the set as it was at the moment it's read.
pub struct PeerSet {
    peers: HashMap<PeerId, Arc<Peer>>,
    order: Vec<PeerId>,
    cursor: usize,
}

impl PeerSet {
    pub fn new() -> PeerSet {
        PeerSet { peers: HashMap::new(), order: Vec::new(), cursor: 0 }
    }

    fn insert(&mut self, peer: Arc<Peer>) {
        self.order.push(peer.id);
        self.peers.insert(peer.id, peer);
    }

    pub fn remove(&mut self, id: PeerId) -> Option<Arc<Peer>> {
        if let Some(pos) = self.order.iter().position(|&p| p == id) {
            self.order.remove(pos);
            if self.cursor > pos {
                self.cursor -= 1;
            }
            if !self.order.is_empty() {
                self.cursor %= self.order.len();
            } else {
                self.cursor = 0;
            }
        }
        self.peers.remove(&id)
    }

    pub fn get(&self, id: PeerId) -> Option<Arc<Peer>> {
        self.peers.get(&id).cloned()
    }

    /// Every live peer, in registration order. Cloned out from under the
    /// lock so broadcast sends don't hold it for the duration of several
    /// socket writes.
    pub fn snapshot(&self) -> Vec<Arc<Peer>> {
        self.order.iter().filter_map(|id| self.peers.get(id).cloned()).collect()
    }

    /// The peer immediately after the cursor, advancing it. `None` if no
    /// peer is currently live.
    pub fn next_round_robin(&mut self) -> Option<Arc<Peer>> {
        if self.order.is_empty() {
            return None;
        }
        if self.cursor >= self.order.len() {
            self.cursor = 0;
        }
        let id = self.order[self.cursor];
        self.cursor = (self.cursor + 1) % self.order.len();
        self.peers.get(&id).cloned()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

pub struct ConnectionManager {
    peer_set: Arc<Mutex<PeerSet>>,
    peer_id_seq: IdSequence,
    connector_id_seq: IdSequence,
    config: Config,
    callbacks: Arc<Callbacks>,
    sink: Arc<dyn FrameSink>,
    shutdown: Arc<AtomicBool>,
    listeners: Mutex<Vec<JoinHandle<()>>>,
    connectors: Mutex<Vec<JoinHandle<()>>>,
    readers: Arc<Mutex<Vec<JoinHandle<()>>>>,
    connect_targets: Mutex<HashSet<(String, u16)>>,
}

impl ConnectionManager {
    /// `peer_set` is constructed by the caller (`crate::engine`) and shared
    /// with the `SendScheduler` it builds from the same set — breaking what
    /// would otherwise be a construction cycle between the connection
    /// manager and the dispatcher that needs a send scheduler.
    pub fn new(
        peer_set: Arc<Mutex<PeerSet>>,
        config: Config,
        callbacks: Arc<Callbacks>,
        sink: Arc<dyn FrameSink>,
    ) -> ConnectionManager {
        ConnectionManager {
            peer_set,
            peer_id_seq: IdSequence::new(),
            connector_id_seq: IdSequence::new(),
            config,
            callbacks,
            sink,
            shutdown: Arc::new(AtomicBool::new(false)),
            listeners: Mutex::new(Vec::new()),
            connectors: Mutex::new(Vec::new()),
            readers: Arc::new(Mutex::new(Vec::new())),
            connect_targets: Mutex::new(HashSet::new()),
        }
    }

    /// Binds a listener on `port` (0 for an ephemeral port), firing the bind
    /// callback with the actual bound port on success. Socket creation,
    /// set-option, bind, and listen are each a distinct failure mode.
    pub fn bind(&self, port: u16) -> Result<u16> {
        let socket = Socket::new(Domain::IPV4, Type::STREAM, None).map_err(EngineError::SocketSetup)?;
        socket.set_reuse_address(true).map_err(EngineError::SocketSetup)?;

        let addr: SocketAddr = ([0, 0, 0, 0], port).into();
        socket.bind(&addr.into()).map_err(EngineError::SocketSetup)?;
        socket.listen(128).map_err(EngineError::SocketSetup)?;

        let listener: TcpListener = socket.into();
        let bound_port = listener.local_addr().map_err(EngineError::SocketSetup)?.port();

        let peer_set = self.peer_set.clone();
        let peer_id_seq = self.peer_id_seq.clone();
        let sink = self.sink.clone();
        let shutdown = self.shutdown.clone();
        let callbacks = self.callbacks.clone();
        let readers = self.readers.clone();

        let handle =
            thread::spawn(move || run_listener(listener, peer_set, peer_id_seq, sink, shutdown, callbacks, readers));
        self.listeners.lock().unwrap_or_else(|e| e.into_inner()).push(handle);

        self.callbacks.fire_bind(bound_port);

        Ok(bound_port)
    }

    /// Starts an outbound connector to `(hostname, port)`. Returns as soon as
    /// the connector is enqueued; the first connection attempt, and every
    /// reconnect after a link drop, happens on the connector's own thread.
    pub fn connect(&self, hostname: &str, port: u16) -> Result<()> {
        self.connect_targets.lock().unwrap_or_else(|e| e.into_inner()).insert((hostname.to_owned(), port));

        let connector_id = ConnectorId(self.connector_id_seq.next());
        let peer_set = self.peer_set.clone();
        let peer_id_seq = self.peer_id_seq.clone();
        let sink = self.sink.clone();
        let shutdown = self.shutdown.clone();
        let config = self.config;
        let hostname = hostname.to_owned();

        let handle = thread::spawn(move || {
            run_connector(hostname, port, connector_id, config, peer_set, peer_id_seq, sink, shutdown)
        });
        self.connectors.lock().unwrap_or_else(|e| e.into_inner()).push(handle);

        Ok(())
    }

    /// True iff `connect` was ever called with exactly this (hostname, port)
    /// pair, regardless of whether a link is currently up.
    pub fn is_connected(&self, hostname: &str, port: u16) -> bool {
        self.connect_targets
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&(hostname.to_owned(), port))
    }

    /// Tears down every listener, connector, and live peer, then waits for
    /// every worker thread to exit.
    pub fn close_all(&self) {
        self.shutdown.store(true, Ordering::SeqCst);

        let peers = self.peer_set.lock().unwrap_or_else(|e| e.into_inner()).snapshot();
        for peer in peers {
            peer.shutdown();
        }

        for handle in self.listeners.lock().unwrap_or_else(|e| e.into_inner()).drain(..) {
            let _ = handle.join();
        }
        for handle in self.connectors.lock().unwrap_or_else(|e| e.into_inner()).drain(..) {
            let _ = handle.join();
        }
        for handle in self.readers.lock().unwrap_or_else(|e| e.into_inner()).drain(..) {
            let _ = handle.join();
        }
    }
}

/// Builds the `Peer` for a freshly accepted or connected stream and clones
/// off its read half, but does not yet insert it into the peer set or start
/// reading — the caller decides whether the reader loop runs on a fresh
/// thread (listener) or inline (connector).
fn new_peer(stream: TcpStream, origin: PeerOrigin, id_seq: &IdSequence) -> io::Result<(Arc<Peer>, TcpStream)> {
    let read_half = stream.try_clone()?;
    let id = PeerId(id_seq.next());
    Ok((Arc::new(Peer::new(id, origin, stream)), read_half))
}

/// Reads frames off `read_half` until the link drops or a frame fails to
/// decode, handing each non-empty message to `sink`. Either way the peer is
/// removed from `peer_set` and its socket is shut down before returning, so
/// callers (listener thread for an accepted peer, connector thread for an
/// owned one) can treat "this function returned" as "this peer is gone".
fn run_peer_reader(peer: Arc<Peer>, mut read_half: TcpStream, peer_set: Arc<Mutex<PeerSet>>, sink: Arc<dyn FrameSink>) {
    loop {
        match amp::decode_from(&mut read_half) {
            Ok(msg) if msg.is_empty() => {
                // Defensive: a frame with no fields is dropped silently.
                continue;
            }
            Ok(msg) => sink.on_message(peer.clone(), msg),
            Err(e) => {
                log::debug!("[{:?}] link drop or decode failure: {}", peer.id, e);
                break;
            }
        }
    }

    peer_set.lock().unwrap_or_else(|e| e.into_inner()).remove(peer.id);
    peer.shutdown();
}

#[allow(clippy::too_many_arguments)]
fn run_listener(
    listener: TcpListener,
    peer_set: Arc<Mutex<PeerSet>>,
    peer_id_seq: IdSequence,
    sink: Arc<dyn FrameSink>,
    shutdown: Arc<AtomicBool>,
    callbacks: Arc<Callbacks>,
    readers: Arc<Mutex<Vec<JoinHandle<()>>>>,
) {
    if let Err(e) = listener.set_nonblocking(true) {
        callbacks.fire_error(format!("listener set_nonblocking failed: {e}"));
        return;
    }

    while !shutdown.load(Ordering::SeqCst) {
        match listener.accept() {
            Ok((stream, addr)) => {
                log::debug!("accepted peer from {addr}");
                match new_peer(stream, PeerOrigin::Accepted, &peer_id_seq) {
                    Ok((peer, read_half)) => {
                        peer_set.lock().unwrap_or_else(|e| e.into_inner()).insert(peer.clone());
                        let peer_set = peer_set.clone();
                        let sink = sink.clone();
                        let handle = thread::spawn(move || run_peer_reader(peer, read_half, peer_set, sink));
                        readers.lock().unwrap_or_else(|e| e.into_inner()).push(handle);
                    }
                    Err(e) => log::debug!("failed to prepare accepted peer: {e}"),
                }
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                thread::sleep(Duration::from_millis(100));
            }
            Err(e) => {
                callbacks.fire_error(format!("listener accept failed: {e}"));
                break;
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn run_connector(
    hostname: String,
    port: u16,
    connector_id: ConnectorId,
    config: Config,
    peer_set: Arc<Mutex<PeerSet>>,
    peer_id_seq: IdSequence,
    sink: Arc<dyn FrameSink>,
    shutdown: Arc<AtomicBool>,
) {
    let mut backoff = config.backoff_floor;

    while !shutdown.load(Ordering::SeqCst) {
        match TcpStream::connect((hostname.as_str(), port)) {
            Ok(stream) => {
                backoff = config.backoff_floor;
                log::debug!("connector to {hostname}:{port} linked");

                match new_peer(stream, PeerOrigin::Connector(connector_id), &peer_id_seq) {
                    Ok((peer, read_half)) => {
                        peer_set.lock().unwrap_or_else(|e| e.into_inner()).insert(peer.clone());
                        run_peer_reader(peer, read_half, peer_set.clone(), sink.clone());
                        // run_peer_reader only returns once the link is gone; loop
                        // back around to reconnect unless we're tearing down.
                    }
                    Err(e) => log::debug!("failed to prepare connected peer: {e}"),
                }
            }
            Err(_e) => {
                thread::sleep(backoff);
                backoff = config.next_backoff(backoff);
            }
        }
    }
}
