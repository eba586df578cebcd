// The Request/Reply Correlator: generates unique request ids, and provides
// the single-producer/single-consumer rendezvous between the REQ send call
// and the REP reply's arrival on (possibly) a dispatcher thread.
//
// The source implements this rendezvous with a process-wide, pid-and-counter
// named POSIX message queue. There is no cross-process requirement here, so
// — per the corresponding redesign note — this is a plain in-process map
// from id to a bounded (capacity 1) channel. The wire-visible id format
// `"<pid>:<counter>"` is unchanged.

use std::collections::HashMap;
use std::sync::mpsc::{self, RecvTimeoutError, SyncSender};
use std::sync::Mutex;
use std::time::Duration;

use crate::amp::Message;
use crate::error::{EngineError, Result};
use crate::global::IdSequence;

pub struct Correlator {
    id_seq: IdSequence,
    pending: Mutex<HashMap<String, SyncSender<Message>>>,
}

impl Correlator {
    pub fn new() -> Correlator {
        Correlator { id_seq: IdSequence::new(), pending: Mutex::new(HashMap::new()) }
    }

    /// Allocates a fresh request id of the form `"<pid>:<counter>"`.
    pub fn next_request_id(&self) -> String {
        format!("{}:{}", std::process::id(), self.id_seq.next())
    }

    /// Registers a rendezvous slot for `id`. The returned receiver accepts
    /// at most one message.
    fn register(&self, id: &str) -> mpsc::Receiver<Message> {
        let (tx, rx) = mpsc::sync_channel(1);
        self.pending.lock().unwrap_or_else(|e| e.into_inner()).insert(id.to_owned(), tx);
        rx
    }

    /// Called by the dispatcher when a reply carrying `id` arrives. Returns
    /// `false` if there was no outstanding request for `id` (a late reply
    /// past its deadline, or one with a wire-corrupted id) — the caller
    /// drops the message in that case.
    pub fn complete(&self, id: &str, msg: Message) -> bool {
        match self.pending.lock().unwrap_or_else(|e| e.into_inner()).remove(id) {
            Some(tx) => tx.send(msg).is_ok(),
            None => false,
        }
    }

    /// Registers the slot, then blocks the caller until either the reply
    /// arrives or `timeout` elapses, whichever is first. `send` is the
    /// closure that actually hands the encoded, id-tagged frame to the send
    /// scheduler; it runs after the slot exists so a reply arriving the
    /// instant it is sent can never race ahead of `register`.
    pub fn request<F>(&self, id: &str, timeout: Duration, send: F) -> Result<Message>
    where
        F: FnOnce() -> Result<()>,
    {
        let rx = self.register(id);

        if let Err(e) = send() {
            self.pending.lock().unwrap_or_else(|e| e.into_inner()).remove(id);
            return Err(e);
        }

        match rx.recv_timeout(timeout) {
            Ok(msg) => Ok(msg),
            Err(RecvTimeoutError::Timeout) => {
                self.pending.lock().unwrap_or_else(|e| e.into_inner()).remove(id);
                Err(EngineError::ReplyTimeout)
            }
            Err(RecvTimeoutError::Disconnected) => Err(EngineError::Teardown),
        }
    }

    /// Drops every pending sender, which makes any thread currently blocked
    /// in `recv_timeout` wake up immediately with `Disconnected` instead of
    /// waiting out its full deadline.
    pub fn teardown(&self) {
        self.pending.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

impl Default for Correlator {
    fn default() -> Self {
        Correlator::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_ids_are_unique_and_carry_pid() {
        let c = Correlator::new();
        let a = c.next_request_id();
        let b = c.next_request_id();
        assert_ne!(a, b);
        assert!(a.starts_with(&format!("{}:", std::process::id())));
    }

    #[test]
    fn late_reply_after_timeout_is_dropped() {
        let c = Correlator::new();
        let id = c.next_request_id();
        let result = c.request(&id, Duration::from_millis(20), || Ok(()));
        assert!(matches!(result, Err(EngineError::ReplyTimeout)));

        // the slot is gone: a reply that arrives late has no outstanding request
        assert!(!c.complete(&id, Message::new()));
    }

    #[test]
    fn reply_delivered_before_deadline_succeeds() {
        use std::sync::Arc;
        use std::thread;

        let c = Arc::new(Correlator::new());
        let id = c.next_request_id();
        let reply = Message::new().push("ok");

        let c2 = c.clone();
        let id2 = id.clone();
        let reply2 = reply.clone();
        let result = c.request(&id, Duration::from_millis(500), move || {
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                assert!(c2.complete(&id2, reply2));
            });
            Ok(())
        });

        assert_eq!(result.unwrap(), reply);
    }

    #[test]
    fn teardown_wakes_pending_waiters() {
        use std::sync::Arc;
        use std::thread;

        let c = Arc::new(Correlator::new());
        let id = c.next_request_id();
        let c2 = c.clone();

        let waiter = thread::spawn(move || c2.request(&id, Duration::from_secs(10), || Ok(())));

        thread::sleep(Duration::from_millis(50));
        c.teardown();

        let result = waiter.join().unwrap();
        assert!(matches!(result, Err(EngineError::Teardown)));
    }
}
