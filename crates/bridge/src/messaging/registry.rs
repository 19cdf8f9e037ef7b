//! Subscription Registry for inbound messages from the embedded surface.
//!
//! Subscribers register a handler for one channel key and get back a
//! [`Subscription`] handle. Every inbound message is dispatched to all active
//! handlers whose key matches, in registration order.
//!
//! Handlers run without the registry lock held, so a handler may subscribe or
//! unsubscribe (itself or anyone else) while a dispatch is in progress.
//! Dispatch iterates a snapshot taken when it starts:
//! - handlers added during a dispatch see the next message, not this one
//! - handlers removed during a dispatch are skipped if they have not run yet
//! - no handler runs twice for one message

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use framebridge_protocol::InboundMessage;

type Handler = Arc<dyn Fn(&InboundMessage) + Send + Sync + 'static>;

struct Entry {
    id: u64,
    channel_key: String,
    active: Arc<AtomicBool>,
    handler: Handler,
}

type Entries = Mutex<Vec<Entry>>;

fn lock_entries(entries: &Entries) -> MutexGuard<'_, Vec<Entry>> {
    entries.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Registry of (channel key, handler) pairs owned by one bridge instance.
#[derive(Clone, Default)]
pub struct SubscriptionRegistry {
    entries: Arc<Entries>,
    next_id: Arc<AtomicU64>,
}

impl SubscriptionRegistry {
    /// Create a new registry with no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe `handler` to messages whose channel key equals `channel_key`.
    pub fn subscribe<H>(&self, channel_key: impl Into<String>, handler: H) -> Subscription
    where
        H: Fn(&InboundMessage) + Send + Sync + 'static,
    {
        self.subscribe_with(channel_key, move |_| handler)
    }

    /// Subscribe a handler that needs its own [`Subscription`] handle.
    ///
    /// `make_handler` receives the handle before the handler is registered, so a
    /// one-shot listener can remove itself from inside its own invocation.
    pub fn subscribe_with<F, H>(&self, channel_key: impl Into<String>, make_handler: F) -> Subscription
    where
        F: FnOnce(Subscription) -> H,
        H: Fn(&InboundMessage) + Send + Sync + 'static,
    {
        let channel_key = channel_key.into();
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let active = Arc::new(AtomicBool::new(true));

        let subscription = Subscription {
            id,
            channel_key: channel_key.clone(),
            active: Arc::clone(&active),
            entries: Arc::downgrade(&self.entries),
        };

        // Built outside the lock: the constructor may touch the registry
        let handler: Handler = Arc::new(make_handler(subscription.clone()));

        lock_entries(&self.entries).push(Entry {
            id,
            channel_key,
            active,
            handler,
        });

        tracing::trace!(
            subscription_id = id,
            channel_key = %subscription.channel_key,
            "Subscribed"
        );

        subscription
    }

    /// Dispatch a message to every active handler registered for its channel key.
    ///
    /// Returns how many handlers were invoked.
    pub fn dispatch(&self, message: &InboundMessage) -> usize {
        let snapshot: Vec<(Arc<AtomicBool>, Handler)> = lock_entries(&self.entries)
            .iter()
            .filter(|entry| entry.channel_key == message.channel_key)
            .map(|entry| (Arc::clone(&entry.active), Arc::clone(&entry.handler)))
            .collect();

        let mut invoked = 0;
        for (active, handler) in snapshot {
            if active.load(Ordering::SeqCst) {
                handler(message);
                invoked += 1;
            }
        }

        invoked
    }

    /// Get the number of active subscriptions.
    pub fn len(&self) -> usize {
        lock_entries(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every subscription.
    ///
    /// Outstanding handles become inert; handlers are dropped, which drops
    /// whatever they captured.
    pub fn clear(&self) -> usize {
        let drained: Vec<Entry> = lock_entries(&self.entries).drain(..).collect();
        for entry in &drained {
            entry.active.store(false, Ordering::SeqCst);
        }
        drained.len()
    }
}

/// Handle to one registered handler.
///
/// Dropping the handle does NOT unsubscribe. Call [`Subscription::unsubscribe`]
/// explicitly; it is idempotent and safe to call from inside any handler.
#[derive(Clone)]
pub struct Subscription {
    id: u64,
    channel_key: String,
    active: Arc<AtomicBool>,
    entries: Weak<Entries>,
}

impl Subscription {
    /// Remove the handler. Returns true if this call performed the removal.
    pub fn unsubscribe(&self) -> bool {
        if !self.active.swap(false, Ordering::SeqCst) {
            return false;
        }

        if let Some(entries) = self.entries.upgrade() {
            lock_entries(&entries).retain(|entry| entry.id != self.id);
        }

        tracing::trace!(
            subscription_id = self.id,
            channel_key = %self.channel_key,
            "Unsubscribed"
        );
        true
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("channel_key", &self.channel_key)
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    fn message(key: &str) -> InboundMessage {
        InboundMessage::new(key)
    }

    fn counter() -> Arc<AtomicU32> {
        Arc::new(AtomicU32::new(0))
    }

    #[test]
    fn test_subscribe_and_dispatch() {
        let registry = SubscriptionRegistry::new();
        let count = counter();

        let count_clone = Arc::clone(&count);
        registry.subscribe("HANDLE_RESPONSE-a", move |_msg| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(registry.len(), 1);

        registry.dispatch(&message("HANDLE_RESPONSE-a"));
        registry.dispatch(&message("HANDLE_RESPONSE-a"));

        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_only_matching_channel_key_is_invoked() {
        let registry = SubscriptionRegistry::new();
        let count = counter();

        let count_clone = Arc::clone(&count);
        registry.subscribe("HANDLE_RESPONSE-a", move |_msg| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });

        // Same message type, other bridge instance
        assert_eq!(registry.dispatch(&message("HANDLE_RESPONSE-b")), 0);
        assert_eq!(registry.dispatch(&message("OVERLAY_READY-a")), 0);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_registration_order_is_preserved() {
        let registry = SubscriptionRegistry::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for n in 0..3 {
            let seen = Arc::clone(&seen);
            registry.subscribe("k", move |_msg| seen.lock().unwrap().push(n));
        }

        registry.dispatch(&message("k"));
        assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let registry = SubscriptionRegistry::new();
        let count = counter();

        let count_clone = Arc::clone(&count);
        let sub = registry.subscribe("k", move |_msg| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });

        assert!(sub.unsubscribe());
        assert!(!sub.unsubscribe());
        assert!(!sub.is_active());
        assert!(registry.is_empty());

        registry.dispatch(&message("k"));
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_handler_can_remove_itself_during_dispatch() {
        let registry = SubscriptionRegistry::new();
        let count = counter();

        let count_clone = Arc::clone(&count);
        let sub = registry.subscribe_with("k", move |me| {
            move |_msg: &InboundMessage| {
                me.unsubscribe();
                count_clone.fetch_add(1, Ordering::SeqCst);
            }
        });

        registry.dispatch(&message("k"));
        registry.dispatch(&message("k"));

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!sub.is_active());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_handler_removed_by_earlier_handler_is_skipped() {
        let registry = SubscriptionRegistry::new();
        let second_calls = counter();
        let third_calls = counter();

        let victim: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));

        let victim_clone = Arc::clone(&victim);
        registry.subscribe("k", move |_msg| {
            if let Some(sub) = victim_clone.lock().unwrap().as_ref() {
                sub.unsubscribe();
            }
        });

        let second_clone = Arc::clone(&second_calls);
        let second = registry.subscribe("k", move |_msg| {
            second_clone.fetch_add(1, Ordering::SeqCst);
        });
        *victim.lock().unwrap() = Some(second);

        let third_clone = Arc::clone(&third_calls);
        registry.subscribe("k", move |_msg| {
            third_clone.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(registry.dispatch(&message("k")), 2);
        assert_eq!(second_calls.load(Ordering::SeqCst), 0);
        // Removal of a neighbour must not skip the handler after it
        assert_eq!(third_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_handler_added_during_dispatch_sees_next_message() {
        let registry = SubscriptionRegistry::new();
        let late_calls = counter();

        let registry_clone = registry.clone();
        let late_clone = Arc::clone(&late_calls);
        registry.subscribe_with("k", move |me| {
            move |_msg: &InboundMessage| {
                me.unsubscribe();
                let late = Arc::clone(&late_clone);
                registry_clone.subscribe("k", move |_msg| {
                    late.fetch_add(1, Ordering::SeqCst);
                });
            }
        });

        registry.dispatch(&message("k"));
        assert_eq!(late_calls.load(Ordering::SeqCst), 0);

        registry.dispatch(&message("k"));
        assert_eq!(late_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_clear_deactivates_handles() {
        let registry = SubscriptionRegistry::new();
        let a = registry.subscribe("a", |_msg| {});
        let b = registry.subscribe("b", |_msg| {});

        assert_eq!(registry.clear(), 2);
        assert!(registry.is_empty());
        assert!(!a.is_active());
        assert!(!b.unsubscribe());
    }
}
