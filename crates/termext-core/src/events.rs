//! Multicast notification points
//!
//! Subscribers are callbacks registered under an opaque [`SubscriptionToken`].
//! Dispatch runs over a snapshot of the subscriber list taken outside the
//! lock, so handlers may subscribe or unsubscribe while being notified. A
//! handler removed mid-dispatch can still see the event in flight; one added
//! mid-dispatch first sees the next event.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::error;

/// Opaque handle returned by a subscription, used to remove it again
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionToken(u64);

type Handler<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// A notification point with any number of subscribers
pub struct Event<T> {
    name: &'static str,
    next_token: AtomicU64,
    handlers: Mutex<Vec<(SubscriptionToken, Handler<T>)>>,
}

impl<T> Event<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            next_token: AtomicU64::new(1),
            handlers: Mutex::new(Vec::new()),
        }
    }

    /// Register a handler; it only sees events raised after this call
    pub fn subscribe<F>(&self, handler: F) -> SubscriptionToken
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let token = SubscriptionToken(self.next_token.fetch_add(1, Ordering::Relaxed));
        self.lock().push((token, Arc::new(handler)));
        token
    }

    /// Remove a handler. Returns `false` if the token was unknown.
    pub fn unsubscribe(&self, token: SubscriptionToken) -> bool {
        let mut handlers = self.lock();
        let before = handlers.len();
        handlers.retain(|(t, _)| *t != token);
        handlers.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().len()
    }

    /// Invoke every current subscriber with `args`
    pub fn raise(&self, args: &T) {
        let snapshot: Vec<Handler<T>> = self.lock().iter().map(|(_, h)| h.clone()).collect();

        for handler in snapshot {
            if catch_unwind(AssertUnwindSafe(|| handler(args))).is_err() {
                error!("Subscriber to '{}' panicked; continuing dispatch", self.name);
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<(SubscriptionToken, Handler<T>)>> {
        // Handlers never run under this lock, so a poisoned list is still consistent
        self.handlers.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_multiple_subscribers() {
        let event: Event<String> = Event::new("output");
        let seen = Arc::new(Mutex::new(Vec::new()));

        let a = seen.clone();
        event.subscribe(move |s: &String| a.lock().unwrap().push(format!("a:{}", s)));
        let b = seen.clone();
        event.subscribe(move |s: &String| b.lock().unwrap().push(format!("b:{}", s)));

        event.raise(&"x".to_string());
        assert_eq!(*seen.lock().unwrap(), vec!["a:x", "b:x"]);
    }

    #[test]
    fn test_unsubscribe() {
        let event: Event<()> = Event::new("disconnected");
        let count = Arc::new(AtomicUsize::new(0));

        let c = count.clone();
        let token = event.subscribe(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        event.raise(&());
        assert!(event.unsubscribe(token));
        assert!(!event.unsubscribe(token));
        event.raise(&());

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(event.subscriber_count(), 0);
    }

    #[test]
    fn test_no_replay_for_late_subscribers() {
        let event: Event<String> = Event::new("output");
        event.raise(&"early".to_string());

        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = seen.clone();
        event.subscribe(move |v: &String| s.lock().unwrap().push(v.clone()));
        event.raise(&"late".to_string());

        assert_eq!(*seen.lock().unwrap(), vec!["late".to_string()]);
    }

    #[test]
    fn test_handler_can_unsubscribe_itself() {
        let event: Arc<Event<()>> = Arc::new(Event::new("disconnected"));
        let count = Arc::new(AtomicUsize::new(0));
        let token_slot: Arc<Mutex<Option<SubscriptionToken>>> = Arc::new(Mutex::new(None));

        let ev = event.clone();
        let c = count.clone();
        let slot = token_slot.clone();
        let token = event.subscribe(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
            if let Some(token) = *slot.lock().unwrap() {
                ev.unsubscribe(token);
            }
        });
        *token_slot.lock().unwrap() = Some(token);

        event.raise(&());
        event.raise(&());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_panicking_handler_does_not_stop_dispatch() {
        let event: Event<()> = Event::new("disconnected");
        let count = Arc::new(AtomicUsize::new(0));

        event.subscribe(|_| panic!("boom"));
        let c = count.clone();
        event.subscribe(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        event.raise(&());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
