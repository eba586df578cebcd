// The Endpoint Facade: the only type applications touch directly. Each
// constructor fixes the endpoint's role for its lifetime; every method
// checks the role before doing anything, turning a call that doesn't make
// sense for that role (`subscribe` on a `Pub`, `send` on a `Sub`) into an
// `EngineError::RoleMismatch` instead of a silent no-op or a panic.

use std::sync::Arc;
use std::time::Duration;

use crate::amp::Message;
use crate::config::Config;
use crate::engine::Engine;
use crate::error::{EngineError, Result};
use crate::global::Role;
use crate::subscription::SubscriptionCallback;

pub struct Endpoint {
    engine: Arc<Engine>,
}

impl Endpoint {
    fn new(role: Role, config: Config) -> Endpoint {
        Endpoint { engine: Engine::new(role, config) }
    }

    pub fn pub_socket() -> Endpoint {
        Endpoint::new(Role::Pub, Config::default())
    }

    pub fn sub_socket() -> Endpoint {
        Endpoint::new(Role::Sub, Config::default())
    }

    pub fn push_socket() -> Endpoint {
        Endpoint::new(Role::Push, Config::default())
    }

    pub fn pull_socket() -> Endpoint {
        Endpoint::new(Role::Pull, Config::default())
    }

    pub fn req_socket() -> Endpoint {
        Endpoint::new(Role::Req, Config::default())
    }

    pub fn rep_socket() -> Endpoint {
        Endpoint::new(Role::Rep, Config::default())
    }

    pub fn with_config(role: Role, config: Config) -> Endpoint {
        Endpoint::new(role, config)
    }

    pub fn role(&self) -> Role {
        self.engine.role
    }

    fn require(&self, ok: bool, operation: &'static str) -> Result<()> {
        if ok {
            Ok(())
        } else {
            Err(EngineError::RoleMismatch { role: role_name(self.engine.role), operation })
        }
    }

    /// Starts listening on `port` (0 for an ephemeral port), returning the
    /// port actually bound. Legal for every role — any endpoint can accept
    /// inbound connections from its peer role.
    pub fn bind(&self, port: u16) -> Result<u16> {
        self.engine.connection_manager.bind(port)
    }

    /// Starts an outbound connection to `hostname:port`. Legal for every
    /// role, symmetrically with `bind`.
    pub fn connect(&self, hostname: &str, port: u16) -> Result<()> {
        self.engine.connection_manager.connect(hostname, port)
    }

    pub fn is_connected(&self, hostname: &str, port: u16) -> bool {
        self.engine.connection_manager.is_connected(hostname, port)
    }

    pub fn on_bind(&self, cb: impl Fn(u16) + Send + Sync + 'static) {
        self.engine.callbacks.set_bind(Box::new(cb));
    }

    /// Registers the generic message callback. For `Rep`, whatever it
    /// returns (if anything) is sent back as the reply; for every other
    /// role its return value is ignored.
    pub fn on_message(&self, cb: impl Fn(Message) -> Option<Message> + Send + Sync + 'static) {
        self.engine.callbacks.set_message(Box::new(cb));
    }

    pub fn on_error(&self, cb: impl Fn(String) + Send + Sync + 'static) {
        self.engine.callbacks.set_error(Box::new(cb));
    }

    /// Registers `callback` for topics matching `pattern`. Only legal for
    /// `Sub` and `Pull` endpoints.
    pub fn subscribe(&self, pattern: &str, callback: SubscriptionCallback) -> Result<()> {
        self.require(self.engine.role.can_subscribe(), "subscribe")?;
        self.engine.subscriptions.subscribe(pattern, callback)
    }

    pub fn unsubscribe(&self, pattern: &str) -> Result<()> {
        self.require(self.engine.role.can_subscribe(), "unsubscribe")?;
        self.engine.subscriptions.unsubscribe(pattern)
    }

    /// Sends `msg` per the endpoint's role: broadcast for `Pub`, round-robin
    /// for `Push`, request/reply correlation for `Req`. Illegal for `Sub`,
    /// `Pull`, and `Rep` (a `Rep` replies through the value returned from its
    /// message callback instead, since a reply must be addressed to the
    /// peer that asked).
    pub fn send(&self, msg: Message) -> Result<()> {
        self.require(self.engine.role.can_send(), "send")?;
        match self.engine.role {
            Role::Pub => {
                self.engine.send_scheduler.broadcast(&msg);
                Ok(())
            }
            Role::Push => self.engine.send_scheduler.round_robin(&msg),
            Role::Req => self.send_request(msg, self.engine.config.default_request_timeout).map(|_| ()),
            _ => unreachable!("can_send() guarantees Pub, Push, or Req"),
        }
    }

    /// Like `send`, but for `Req` endpoints lets the caller override the
    /// default reply timeout.
    pub fn send_with_timeout(&self, msg: Message, timeout: Duration) -> Result<()> {
        self.require(self.engine.role == Role::Req, "send_with_timeout")?;
        self.send_request(msg, timeout).map(|_| ())
    }

    /// Sends a request and blocks for its reply, returning the reply message.
    /// Only legal for `Req` endpoints.
    pub fn request(&self, msg: Message, timeout: Duration) -> Result<Message> {
        self.require(self.engine.role == Role::Req, "request")?;
        self.send_request(msg, timeout)
    }

    fn send_request(&self, msg: Message, timeout: Duration) -> Result<Message> {
        let id = self.engine.correlator.next_request_id();
        let framed = msg.push(id.clone());
        let send_scheduler = self.engine.send_scheduler.clone();
        self.engine.correlator.request(&id, timeout, move || send_scheduler.round_robin(&framed))
    }

    /// Tears down every listener, connector, and live peer, and releases any
    /// thread blocked in `request`/`send_with_timeout`.
    pub fn release(&self) {
        self.engine.correlator.teardown();
        self.engine.connection_manager.close_all();
    }
}

impl Drop for Endpoint {
    fn drop(&mut self) {
        self.release();
    }
}

fn role_name(role: Role) -> &'static str {
    match role {
        Role::Pub => "pub",
        Role::Sub => "sub",
        Role::Push => "push",
        Role::Pull => "pull",
        Role::Req => "req",
        Role::Rep => "rep",
    }
}
