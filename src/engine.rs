// Wires the per-endpoint components together: one `Engine` per created
// socket, owning everything that outlives any single call into it.

use std::sync::{Arc, Mutex};

use crate::callbacks::Callbacks;
use crate::config::Config;
use crate::connection_manager::{ConnectionManager, PeerSet};
use crate::correlator::Correlator;
use crate::dispatcher::Dispatcher;
use crate::global::Role;
use crate::send_scheduler::SendScheduler;
use crate::subscription::SubscriptionMatcher;

pub struct Engine {
    pub role: Role,
    pub config: Config,
    pub callbacks: Arc<Callbacks>,
    pub subscriptions: Arc<SubscriptionMatcher>,
    pub correlator: Arc<Correlator>,
    pub send_scheduler: Arc<SendScheduler>,
    pub connection_manager: Arc<ConnectionManager>,
}

impl Engine {
    pub fn new(role: Role, config: Config) -> Arc<Engine> {
        let callbacks = Arc::new(Callbacks::new());
        let subscriptions = Arc::new(SubscriptionMatcher::new());
        let correlator = Arc::new(Correlator::new());

        // The peer set is constructed up front and shared by the send
        // scheduler and the connection manager, so the dispatcher (which
        // needs a send scheduler) can exist before the connection manager
        // (which needs the dispatcher as its frame sink) does.
        let peer_set = Arc::new(Mutex::new(PeerSet::new()));
        let send_scheduler = Arc::new(SendScheduler::new(peer_set.clone(), config));

        let dispatcher = Arc::new(Dispatcher::new(
            role,
            callbacks.clone(),
            subscriptions.clone(),
            correlator.clone(),
            send_scheduler.clone(),
        ));

        let connection_manager = Arc::new(ConnectionManager::new(peer_set, config, callbacks.clone(), dispatcher));

        Arc::new(Engine {
            role,
            config,
            callbacks,
            subscriptions,
            correlator,
            send_scheduler,
            connection_manager,
        })
    }
}
