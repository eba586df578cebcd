// The Subscription Matcher: an ordered list of (pattern, callback) entries,
// unique by pattern string, walked in registration order for every inbound
// SUB/PULL topic.
//
// The pattern is compiled once at `subscribe` time and the `Regex` is
// cached, rather than recompiled on every dispatch, as long as the
// observable match set and invocation order stay the same.

use std::sync::Mutex;

use regex::Regex;

use crate::amp::Message;
use crate::error::{EngineError, Result};

pub type SubscriptionCallback = Box<dyn Fn(&str, Message) + Send + Sync>;

struct Entry {
    pattern: String,
    regex: Regex,
    callback: SubscriptionCallback,
}

#[derive(Default)]
pub struct SubscriptionMatcher {
    entries: Mutex<Vec<Entry>>,
}

impl SubscriptionMatcher {
    pub fn new() -> SubscriptionMatcher {
        SubscriptionMatcher::default()
    }

    /// Registers `callback` under `pattern`. Re-registering an existing
    /// pattern replaces its callback in place, keeping its original position
    /// in the invocation order.
    pub fn subscribe(&self, pattern: &str, callback: SubscriptionCallback) -> Result<()> {
        let regex = Regex::new(pattern)
            .map_err(|e| EngineError::Io(std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())))?;

        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(existing) = entries.iter_mut().find(|e| e.pattern == pattern) {
            existing.regex = regex;
            existing.callback = callback;
        } else {
            entries.push(Entry { pattern: pattern.to_owned(), regex, callback });
        }
        Ok(())
    }

    /// Idempotent: removing a pattern that isn't registered is a no-op success.
    pub fn unsubscribe(&self, pattern: &str) -> Result<()> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).retain(|e| e.pattern != pattern);
        Ok(())
    }

    /// Invokes every entry whose pattern matches `topic`, in registration
    /// order, each with its own clone of the (topic-stripped) message.
    pub fn dispatch(&self, topic: &str, msg: &Message) {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        for entry in entries.iter() {
            if entry.regex.is_match(topic) {
                (entry.callback)(topic, msg.clone());
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn matches_in_registration_order() {
        let matcher = SubscriptionMatcher::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        let o1 = order.clone();
        matcher.subscribe("topic1", Box::new(move |_t, _m| o1.lock().unwrap().push(1))).unwrap();
        let o2 = order.clone();
        matcher.subscribe("^topic[0-9]$", Box::new(move |_t, _m| o2.lock().unwrap().push(2))).unwrap();

        matcher.dispatch("topic1", &Message::new());
        assert_eq!(*order.lock().unwrap(), vec![1, 2]);

        order.lock().unwrap().clear();
        matcher.dispatch("other", &Message::new());
        assert!(order.lock().unwrap().is_empty());
    }

    #[test]
    fn resubscribe_replaces_callback() {
        let matcher = SubscriptionMatcher::new();
        let calls = Arc::new(AtomicUsize::new(0));

        matcher.subscribe("t", Box::new(|_t, _m| panic!("stale callback invoked"))).unwrap();
        let calls2 = calls.clone();
        matcher.subscribe("t", Box::new(move |_t, _m| { calls2.fetch_add(1, Ordering::SeqCst); })).unwrap();

        matcher.dispatch("t", &Message::new());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unsubscribe_is_idempotent() {
        let matcher = SubscriptionMatcher::new();
        matcher.unsubscribe("never-registered").unwrap();
        matcher.subscribe("t", Box::new(|_, _| {})).unwrap();
        matcher.unsubscribe("t").unwrap();
        matcher.unsubscribe("t").unwrap();
        assert!(matcher.is_empty());
    }
}
