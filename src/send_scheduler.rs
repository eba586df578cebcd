// The Send Scheduler: writes an already-built message to one or more peers
// per a destination policy (broadcast, round-robin, unicast). Writes are
// synchronous on the calling thread — no dedicated send worker thread is
// spawned per call, consolidating the source's thread-per-send model (see
// the corresponding redesign note).

use std::sync::{Arc, Mutex};
use std::thread;

use crate::amp::Message;
use crate::config::Config;
use crate::connection_manager::PeerSet;
use crate::error::{EngineError, Result};
use crate::global::PeerId;

pub struct SendScheduler {
    peer_set: Arc<Mutex<PeerSet>>,
    config: Config,
}

impl SendScheduler {
    pub fn new(peer_set: Arc<Mutex<PeerSet>>, config: Config) -> SendScheduler {
        SendScheduler { peer_set, config }
    }

    /// Sends `msg` to every live peer. A peer whose write fails is evicted;
    /// the call itself never fails (PUB has no failure mode to report).
    pub fn broadcast(&self, msg: &Message) {
        let snapshot = self.peer_set.lock().unwrap_or_else(|e| e.into_inner()).snapshot();
        for peer in snapshot {
            if peer.send(msg).is_err() {
                self.evict(peer.id);
            }
        }
    }

    /// Sends `msg` to the peer after the round-robin cursor, advancing it.
    /// With no live peers, retries on the same backoff schedule as the
    /// connector (floor → ×multiplier → cap), and gives up after
    /// `config.round_robin_no_peer_retries` consecutive cap-length waits.
    pub fn round_robin(&self, msg: &Message) -> Result<()> {
        let mut backoff = self.config.backoff_floor;
        let mut cap_waits = 0u32;

        loop {
            let next = self.peer_set.lock().unwrap_or_else(|e| e.into_inner()).next_round_robin();

            match next {
                Some(peer) => match peer.send(msg) {
                    Ok(()) => return Ok(()),
                    Err(_) => {
                        self.evict(peer.id);
                        continue;
                    }
                },
                None => {
                    thread::sleep(backoff);
                    if backoff >= self.config.backoff_cap {
                        cap_waits += 1;
                        if cap_waits >= self.config.round_robin_no_peer_retries {
                            return Err(EngineError::SendToNoPeers);
                        }
                    }
                    backoff = self.config.next_backoff(backoff);
                }
            }
        }
    }

    /// Sends `msg` to exactly the peer identified by `id`. A missing peer is
    /// a silent drop (it disconnected between decode and reply); a failed
    /// write evicts it.
    pub fn unicast(&self, id: PeerId, msg: &Message) {
        let peer = self.peer_set.lock().unwrap_or_else(|e| e.into_inner()).get(id);
        if let Some(peer) = peer {
            if peer.send(msg).is_err() {
                self.evict(id);
            }
        }
    }

    fn evict(&self, id: PeerId) {
        if let Some(peer) = self.peer_set.lock().unwrap_or_else(|e| e.into_inner()).remove(id) {
            peer.shutdown();
        }
    }
}
