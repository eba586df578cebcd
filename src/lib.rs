//! axon: message-oriented sockets over framed TCP.
//!
//! Six roles, paired into three patterns:
//!
//! - [`Role::Pub`]/[`Role::Sub`] — broadcast publish, pattern-matched subscribe.
//! - [`Role::Push`]/[`Role::Pull`] — round-robin fair-queued distribution.
//! - [`Role::Req`]/[`Role::Rep`] — correlated request/reply.
//!
//! Every endpoint is created with a fixed role via one of the
//! [`Endpoint`] constructors, can both `bind` a listener and `connect` to
//! peers (the two are not mutually exclusive), and exchanges [`Message`]s
//! built from a small set of typed fields. See [`amp`] for the wire format.
//!
//! ```no_run
//! use axon::Endpoint;
//! use axon::amp::Message;
//!
//! let rep = Endpoint::rep_socket();
//! rep.on_message(|req| {
//!     let (payload, _topic_like) = (req, ());
//!     Some(Message::new().push("pong"))
//! });
//! rep.bind(0).unwrap();
//! ```

pub mod amp;
mod callbacks;
mod config;
mod connection_manager;
mod correlator;
mod dispatcher;
mod endpoint;
mod engine;
mod error;
mod global;
mod peer;
mod send_scheduler;
mod subscription;

pub use config::Config;
pub use endpoint::Endpoint;
pub use error::{EngineError, Result};
pub use global::Role;
pub use subscription::SubscriptionCallback;
