use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// The six roles an endpoint can take. Role is fixed at creation time and
/// determines which operations are legal and how inbound frames are routed.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum Role {
    /// Broadcasts every sent message to all currently connected peers.
    /// Send-only: calling `subscribe` or reading a generic message is a role mismatch.
    Pub,

    /// Receives messages published by `Pub` peers. Holds a subscription list:
    /// messages whose leading string field matches a registered pattern are
    /// routed to that pattern's callback with the topic stripped.
    Sub,

    /// Distributes sent messages to peers in round-robin order. Send-only.
    Push,

    /// Receives messages pushed by `Push` peers, fair-queued across connections.
    /// Shares the subscription mechanism with `Sub` (PULL is a "topic-less SUB"
    /// from the matcher's point of view, matching anything via an empty pattern).
    Pull,

    /// Sends a request, appends a correlation id, and blocks for the matching reply.
    Req,

    /// Receives a request (correlation id stripped), and may return a reply which
    /// is sent back to the originating peer with the id re-appended.
    Rep,
}

impl Role {
    /// The peer role this role is expected to interoperate with over the wire.
    pub fn peer(self) -> Role {
        match self {
            Role::Pub => Role::Sub,
            Role::Sub => Role::Pub,
            Role::Push => Role::Pull,
            Role::Pull => Role::Push,
            Role::Req => Role::Rep,
            Role::Rep => Role::Req,
        }
    }

    pub fn can_send(self) -> bool {
        matches!(self, Role::Pub | Role::Push | Role::Req)
    }

    pub fn can_subscribe(self) -> bool {
        matches!(self, Role::Sub | Role::Pull)
    }

    pub fn is_replier(self) -> bool {
        matches!(self, Role::Rep)
    }

    pub fn is_requester(self) -> bool {
        matches!(self, Role::Req)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Pub => "pub",
            Role::Sub => "sub",
            Role::Push => "push",
            Role::Pull => "pull",
            Role::Req => "req",
            Role::Rep => "rep",
        };
        f.write_str(name)
    }
}

/// Stable identifier of a live peer connection, assigned on entry and never reused.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct PeerId(pub usize);

impl fmt::Debug for PeerId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "peer#{}", self.0)
    }
}

/// Identifies one outbound connector (a single (hostname, port) descriptor).
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct ConnectorId(pub usize);

impl fmt::Debug for ConnectorId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "connector#{}", self.0)
    }
}

/// A thread-safe monotonic counter, cloneable and shared by every clone.
///
/// Used both for peer ids and for the per-endpoint REQ counter. Built on an
/// `AtomicUsize` behind an `Arc` rather than a plain `Cell` so the same
/// sequence can be shared across the worker threads this engine spawns.
#[derive(Clone)]
pub struct IdSequence {
    value: Arc<AtomicUsize>,
}

impl IdSequence {
    pub fn new() -> IdSequence {
        IdSequence { value: Arc::new(AtomicUsize::new(0)) }
    }

    pub fn next(&self) -> usize {
        self.value.fetch_add(1, Ordering::SeqCst)
    }
}

impl Default for IdSequence {
    fn default() -> Self {
        IdSequence::new()
    }
}

#[cfg(test)]
mod tests {
    use super::IdSequence;

    #[test]
    fn id_sequence_can_be_cloned() {
        let seq = IdSequence::new();
        let other = seq.clone();

        assert_eq!(0, other.next());
        assert_eq!(1, seq.next());
        assert_eq!(2, seq.next());
        assert_eq!(3, other.next());
    }

    #[test]
    fn role_peer_is_reciprocal() {
        use super::Role;
        for role in [Role::Pub, Role::Sub, Role::Push, Role::Pull, Role::Req, Role::Rep] {
            assert_eq!(role, role.peer().peer());
        }
    }
}
