//! Process-wide publish/subscribe channel for progress changes.
//!
//! Display components subscribe once and re-read whatever they render when
//! an event arrives. Subscriptions are scoped: dropping the returned
//! [`Subscription`] deregisters the listener.

use std::collections::BTreeMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError, Weak};

use tracing::warn;

/// Events broadcast by the progress store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressEvent {
    /// The cumulative points total changed; carries the new total.
    PointsChanged { points: u32 },
    /// Demo mode was toggled; cached mastery displays must be recomputed.
    DemoModeChanged { enabled: bool },
}

type Listener = Arc<dyn Fn(&ProgressEvent) + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    listeners: BTreeMap<u64, Listener>,
}

/// Cloneable handle to a shared listener registry.
#[derive(Clone, Default)]
pub struct ProgressBus {
    inner: Arc<Mutex<Registry>>,
}

impl ProgressBus {
    /// A fresh, isolated bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The bus shared by the whole process.
    #[must_use]
    pub fn global() -> &'static ProgressBus {
        static GLOBAL: OnceLock<ProgressBus> = OnceLock::new();
        GLOBAL.get_or_init(ProgressBus::new)
    }

    /// Register `listener` for every future event.
    ///
    /// Listeners are invoked in registration order. Keep the returned
    /// `Subscription` alive for as long as the listener should receive events.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&ProgressEvent) + Send + Sync + 'static,
    {
        let mut registry = self.registry();
        let id = registry.next_id;
        registry.next_id += 1;
        registry.listeners.insert(id, Arc::new(listener));
        Subscription {
            registry: Arc::downgrade(&self.inner),
            id,
        }
    }

    /// Convenience for consumers that only display points.
    pub fn subscribe_points<F>(&self, on_points: F) -> Subscription
    where
        F: Fn(u32) + Send + Sync + 'static,
    {
        self.subscribe(move |event| {
            if let ProgressEvent::PointsChanged { points } = event {
                on_points(*points);
            }
        })
    }

    /// Deliver `event` synchronously to every current listener.
    ///
    /// A panicking listener is logged and skipped; the remaining listeners
    /// still receive the event. Returns how many listeners completed normally.
    pub fn publish(&self, event: &ProgressEvent) -> usize {
        // Snapshot so listeners may (un)subscribe while being notified.
        let listeners: Vec<(u64, Listener)> = self
            .registry()
            .listeners
            .iter()
            .map(|(id, listener)| (*id, Arc::clone(listener)))
            .collect();

        let mut delivered = 0;
        for (id, listener) in listeners {
            match catch_unwind(AssertUnwindSafe(|| listener(event))) {
                Ok(()) => delivered += 1,
                Err(_) => warn!(subscription = id, ?event, "progress listener panicked"),
            }
        }
        delivered
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.registry().listeners.len()
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Live registration on a [`ProgressBus`]; deregisters on drop.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    registry: Weak<Mutex<Registry>>,
    id: u64,
}

impl Subscription {
    /// Explicitly end the subscription.
    pub fn cancel(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .listeners
                .remove(&self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn recorder(bus: &ProgressBus, log: &Arc<Mutex<Vec<String>>>, name: &'static str) -> Subscription {
        let log = Arc::clone(log);
        bus.subscribe(move |event| {
            log.lock().unwrap().push(format!("{name}:{event:?}"));
        })
    }

    #[test]
    fn delivers_in_registration_order() {
        let bus = ProgressBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let _a = recorder(&bus, &log, "a");
        let _b = recorder(&bus, &log, "b");

        let delivered = bus.publish(&ProgressEvent::PointsChanged { points: 5 });

        assert_eq!(delivered, 2);
        assert_eq!(
            *log.lock().unwrap(),
            vec![
                "a:PointsChanged { points: 5 }".to_string(),
                "b:PointsChanged { points: 5 }".to_string(),
            ]
        );
    }

    #[test]
    fn dropping_subscription_deregisters() {
        let bus = ProgressBus::new();
        let hits = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&hits);
        let sub = bus.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(bus.subscriber_count(), 1);

        bus.publish(&ProgressEvent::PointsChanged { points: 1 });
        drop(sub);
        bus.publish(&ProgressEvent::PointsChanged { points: 2 });

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn cancel_deregisters() {
        let bus = ProgressBus::new();
        let sub = bus.subscribe(|_| {});
        sub.cancel();
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn panicking_listener_does_not_block_others() {
        let bus = ProgressBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let _first = recorder(&bus, &log, "first");
        let _boom = bus.subscribe(|_| panic!("listener failure"));
        let _last = recorder(&bus, &log, "last");

        let delivered = bus.publish(&ProgressEvent::DemoModeChanged { enabled: true });

        assert_eq!(delivered, 2);
        assert_eq!(log.lock().unwrap().len(), 2);
        assert_eq!(bus.subscriber_count(), 3);
    }

    #[test]
    fn points_subscription_ignores_other_events() {
        let bus = ProgressBus::new();
        let seen = Arc::new(AtomicU32::new(0));
        let sink = Arc::clone(&seen);
        let _sub = bus.subscribe_points(move |points| sink.store(points, Ordering::SeqCst));

        bus.publish(&ProgressEvent::DemoModeChanged { enabled: false });
        assert_eq!(seen.load(Ordering::SeqCst), 0);
        bus.publish(&ProgressEvent::PointsChanged { points: 42 });
        assert_eq!(seen.load(Ordering::SeqCst), 42);
    }

    #[test]
    fn listener_may_unsubscribe_others_during_publish() {
        let bus = ProgressBus::new();
        let slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
        let slot_for_listener = Arc::clone(&slot);
        let _dropper = bus.subscribe(move |_| {
            slot_for_listener.lock().unwrap().take();
        });
        *slot.lock().unwrap() = Some(bus.subscribe(|_| {}));
        assert_eq!(bus.subscriber_count(), 2);

        bus.publish(&ProgressEvent::PointsChanged { points: 0 });
        assert_eq!(bus.subscriber_count(), 1);
    }

    #[test]
    fn global_bus_is_shared() {
        let hits = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&hits);
        let _sub = ProgressBus::global().subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        ProgressBus::global().publish(&ProgressEvent::DemoModeChanged { enabled: true });
        assert!(hits.load(Ordering::SeqCst) >= 1);
    }

    #[test]
    fn subscriptions_outliving_the_bus_drop_cleanly() {
        let bus = ProgressBus::new();
        let sub = bus.subscribe(|_| {});
        drop(bus);
        drop(sub);
    }
}
