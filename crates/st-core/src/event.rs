//! One-shot events for a front end to consume.

use tokio::sync::watch;

/// A single-slot event that stays pending until acknowledged.
///
/// Firing again before the consumer acknowledges replaces the pending
/// value. Subscribers are notified on every fire and every acknowledge that
/// actually clears something.
#[derive(Debug)]
pub struct EventSlot<T> {
    slot: watch::Sender<Option<T>>,
}

impl<T> Default for EventSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> EventSlot<T> {
    /// Creates an empty slot.
    pub fn new() -> Self {
        let (slot, _) = watch::channel(None);
        Self { slot }
    }

    /// Stores `value` as the pending event.
    pub fn fire(&self, value: T) {
        self.slot.send_replace(Some(value));
    }

    /// Clears the pending event. Does nothing if none is pending.
    pub fn acknowledge(&self) {
        self.slot.send_if_modified(|pending| pending.take().is_some());
    }

    /// Returns and clears the pending event.
    pub fn take(&self) -> Option<T> {
        let mut taken = None;
        self.slot.send_if_modified(|pending| {
            taken = pending.take();
            taken.is_some()
        });
        taken
    }

    /// Whether an event is waiting to be acknowledged.
    pub fn is_pending(&self) -> bool {
        self.slot.borrow().is_some()
    }

    /// Watches the slot; `Some` means pending.
    pub fn subscribe(&self) -> watch::Receiver<Option<T>> {
        self.slot.subscribe()
    }
}

impl<T: Clone> EventSlot<T> {
    /// Peeks at the pending event without acknowledging it.
    pub fn pending(&self) -> Option<T> {
        self.slot.borrow().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fired_event_stays_pending_until_acknowledged() {
        let slot = EventSlot::<i32>::new();
        assert_eq!(slot.pending(), None);

        slot.fire(7);
        assert_eq!(slot.pending(), Some(7));
        assert_eq!(slot.pending(), Some(7));

        slot.acknowledge();
        assert_eq!(slot.pending(), None);
        slot.acknowledge();
        assert!(!slot.is_pending());
    }

    #[test]
    fn take_consumes_exactly_once() {
        let slot = EventSlot::new();
        slot.fire("first");
        slot.fire("second");
        assert_eq!(slot.take(), Some("second"));
        assert_eq!(slot.take(), None);
    }

    #[tokio::test]
    async fn subscribers_see_fire_and_acknowledge() {
        let slot = EventSlot::<()>::new();
        let mut rx = slot.subscribe();

        slot.fire(());
        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update().is_some());

        slot.acknowledge();
        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update().is_none());

        // Acknowledging an empty slot does not notify.
        slot.acknowledge();
        assert!(!rx.has_changed().unwrap());
    }
}
