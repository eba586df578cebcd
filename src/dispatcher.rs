// The Receive Dispatcher: routes a decoded frame off any peer to the right
// place for the endpoint's role. This is the one piece of routing logic that
// is genuinely role-specific; everything upstream (the connection manager)
// and downstream (the send scheduler) is role-agnostic.

use std::sync::Arc;

use crate::amp::Message;
use crate::callbacks::Callbacks;
use crate::connection_manager::FrameSink;
use crate::correlator::Correlator;
use crate::global::Role;
use crate::peer::Peer;
use crate::send_scheduler::SendScheduler;
use crate::subscription::SubscriptionMatcher;

pub struct Dispatcher {
    role: Role,
    callbacks: Arc<Callbacks>,
    subscriptions: Arc<SubscriptionMatcher>,
    correlator: Arc<Correlator>,
    send_scheduler: Arc<SendScheduler>,
}

impl Dispatcher {
    pub fn new(
        role: Role,
        callbacks: Arc<Callbacks>,
        subscriptions: Arc<SubscriptionMatcher>,
        correlator: Arc<Correlator>,
        send_scheduler: Arc<SendScheduler>,
    ) -> Dispatcher {
        Dispatcher { role, callbacks, subscriptions, correlator, send_scheduler }
    }
}

impl FrameSink for Dispatcher {
    fn on_message(&self, peer: Arc<Peer>, msg: Message) {
        match self.role {
            // SUB/PULL: the generic message callback fires unconditionally,
            // with the message exactly as received. Separately, if the
            // leading field is a string, treat it as a topic: strip it and
            // walk the subscription list against the remainder. PULL shares
            // this path by subscribing peers to the empty pattern "", which
            // matches every topic.
            Role::Sub | Role::Pull => {
                self.callbacks.fire_message(msg.clone());
                if let Some((topic, rest)) = msg.split_first_str() {
                    self.subscriptions.dispatch(&topic, &rest);
                } else {
                    log::debug!("[{:?}] message had no leading topic string, subscription walk skipped", peer.id);
                }
            }

            // REP: the trailing field is the requester's correlation id. The
            // message callback gets the stripped payload and may return a
            // reply, which goes back to exactly this peer with the id
            // re-appended.
            Role::Rep => {
                let (rest, id) = match msg.split_last_str() {
                    Some(pair) => pair,
                    None => {
                        log::debug!("[{:?}] request carried no correlation id, dropped", peer.id);
                        return;
                    }
                };
                if let Some(reply) = self.callbacks.fire_message(rest) {
                    let framed = reply.push(id);
                    self.send_scheduler.unicast(peer.id, &framed);
                }
            }

            // REQ: the trailing field is this endpoint's own correlation id,
            // echoed back by the replier. Hand it to the correlator; a
            // reply with no outstanding request (late, or the id is
            // corrupt) is silently dropped.
            Role::Req => {
                let (rest, id) = match msg.split_last_str() {
                    Some(pair) => pair,
                    None => {
                        log::debug!("[{:?}] reply carried no correlation id, dropped", peer.id);
                        return;
                    }
                };
                if !self.correlator.complete(&id, rest) {
                    log::debug!("[{:?}] reply for unknown or expired request {id}", peer.id);
                }
            }

            // PUB/PUSH are send-only; any inbound data on one of their
            // connections is unsolicited (the peer is misbehaving or
            // mismatched) and is ignored rather than surfaced as an error.
            Role::Pub | Role::Push => {
                log::debug!("[{:?}] unsolicited inbound message on a {} endpoint, ignored", peer.id, self.role);
            }
        }
    }
}
