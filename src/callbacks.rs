use std::sync::Mutex;

use crate::amp::Message;

type BindCallback = Box<dyn Fn(u16) + Send + Sync>;
type MessageCallback = Box<dyn Fn(Message) -> Option<Message> + Send + Sync>;
type ErrorCallback = Box<dyn Fn(String) + Send + Sync>;

/// The three generic callback slots every endpoint owns, regardless of role.
/// Each is registered through its own typed method on `Endpoint` rather than
/// a string-keyed `on(event, callback)` dispatch — see the "opaque callback"
/// redesign note.
#[derive(Default)]
pub struct Callbacks {
    bind: Mutex<Option<BindCallback>>,
    message: Mutex<Option<MessageCallback>>,
    error: Mutex<Option<ErrorCallback>>,
}

impl Callbacks {
    pub fn new() -> Callbacks {
        Callbacks::default()
    }

    pub fn set_bind(&self, cb: BindCallback) {
        *self.bind.lock().unwrap_or_else(|e| e.into_inner()) = Some(cb);
    }

    pub fn set_message(&self, cb: MessageCallback) {
        *self.message.lock().unwrap_or_else(|e| e.into_inner()) = Some(cb);
    }

    pub fn set_error(&self, cb: ErrorCallback) {
        *self.error.lock().unwrap_or_else(|e| e.into_inner()) = Some(cb);
    }

    pub fn fire_bind(&self, port: u16) {
        if let Some(cb) = self.bind.lock().unwrap_or_else(|e| e.into_inner()).as_ref() {
            cb(port);
        }
    }

    /// Invokes the message callback, if any, and returns what it returns
    /// (meaningful for REP, ignored for SUB/PULL/REQ).
    pub fn fire_message(&self, msg: Message) -> Option<Message> {
        self.message.lock().unwrap_or_else(|e| e.into_inner()).as_ref().and_then(|cb| cb(msg))
    }

    pub fn has_message(&self) -> bool {
        self.message.lock().unwrap_or_else(|e| e.into_inner()).is_some()
    }

    pub fn fire_error(&self, err: String) {
        if let Some(cb) = self.error.lock().unwrap_or_else(|e| e.into_inner()).as_ref() {
            cb(err);
        } else {
            log::error!("{}", err);
        }
    }
}
