use crate::prelude::*;
use std::sync::{Mutex, PoisonError};

/// Somewhere to send advisory, non-fatal notes about the host ("couldn't figure out
/// your libssl, guessing 1.1.x"). Implementations are expected to show each `key` at
/// most once; callers are free to call repeatedly.
pub trait Notify {
    fn notify_once(&self, key: &str, message: &str);
}

// Keys we've already warned about, for the lifetime of the process.
static ALREADY_WARNED: Lazy<Mutex<HashSet<String>>> = Lazy::new(Default::default);

/// The process-wide notifier: each key becomes one `warn!` event, ever. The key rides
/// along as the event's `advisory` field, which the UI layer shows next to the message.
#[derive(Debug, Default, Clone, Copy)]
pub struct WarnOnce;

impl Notify for WarnOnce {
    fn notify_once(&self, key: &str, message: &str) {
        let first_time = ALREADY_WARNED
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_owned());
        if first_time {
            warn!(advisory = key, "{}", message);
        } else {
            trace!("suppressing repeated warning {:?}", key);
        }
    }
}

/// Collects notifications instead of printing them, with the same once-per-key rule.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct Recorder {
    seen: std::cell::RefCell<Vec<(String, String)>>,
}

#[cfg(test)]
impl Recorder {
    pub fn keys(&self) -> Vec<String> {
        self.seen.borrow().iter().map(|(k, _)| k.clone()).collect()
    }

    pub fn message(&self, key: &str) -> Option<String> {
        self.seen
            .borrow()
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, m)| m.clone())
    }
}

#[cfg(test)]
impl Notify for Recorder {
    fn notify_once(&self, key: &str, message: &str) {
        let mut seen = self.seen.borrow_mut();
        if !seen.iter().any(|(k, _)| k == key) {
            seen.push((key.into(), message.into()));
        }
    }
}
