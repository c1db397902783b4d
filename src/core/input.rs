//! Pointer events and listener registration.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use glam::Vec2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerKind {
    Down,
    Up,
    Move,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub kind: PointerKind,
    /// Pixels, origin top-left.
    pub position: Vec2,
    /// Press sequence number. Every `Down` starts a new sequence; re-delivery
    /// of the same press carries the same number.
    pub sequence: u64,
}

type Listener = Rc<RefCell<dyn FnMut(&PointerEvent)>>;

#[derive(Default)]
struct HubInner {
    next_id: u64,
    listeners: Vec<(u64, Listener)>,
}

/// Fan-out of pointer events to subscribed listeners.
#[derive(Clone, Default)]
pub struct PointerHub {
    inner: Rc<RefCell<HubInner>>,
    sequence: Rc<RefCell<u64>>,
}

impl PointerHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, listener: F) -> ListenerGuard
    where
        F: FnMut(&PointerEvent) + 'static,
    {
        let listener: Listener = Rc::new(RefCell::new(listener));
        let mut inner = self.inner.borrow_mut();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.listeners.push((id, listener));
        ListenerGuard {
            id,
            hub: Rc::downgrade(&self.inner),
        }
    }

    pub fn listener_count(&self) -> usize {
        self.inner.borrow().listeners.len()
    }

    /// Deliver one event to every listener registered when dispatch starts.
    pub fn dispatch(&self, event: &PointerEvent) {
        // Snapshot so listeners may subscribe or unsubscribe while running.
        let listeners: Vec<(u64, Listener)> = self.inner.borrow().listeners.clone();
        for (id, listener) in listeners {
            let still_registered = self.inner.borrow().listeners.iter().any(|(l, _)| *l == id);
            if !still_registered {
                continue;
            }
            if let Ok(mut f) = listener.try_borrow_mut() {
                (&mut *f)(event);
            }
        }
    }

    /// Build and dispatch a press at `position`, returning the event.
    pub fn press(&self, position: Vec2) -> PointerEvent {
        let sequence = {
            let mut seq = self.sequence.borrow_mut();
            *seq += 1;
            *seq
        };
        let event = PointerEvent {
            kind: PointerKind::Down,
            position,
            sequence,
        };
        self.dispatch(&event);
        event
    }
}

/// Keeps one listener registered; dropping it deregisters the listener.
#[must_use = "dropping the guard unsubscribes the listener"]
pub struct ListenerGuard {
    id: u64,
    hub: Weak<RefCell<HubInner>>,
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        let Some(hub) = self.hub.upgrade() else {
            return;
        };
        let removed = match hub.try_borrow_mut() {
            Ok(mut inner) => {
                let pos = inner.listeners.iter().position(|(l, _)| *l == self.id);
                pos.map(|pos| inner.listeners.remove(pos))
            }
            Err(_) => None,
        };
        // The closure may own other guards; drop it with the hub unborrowed.
        drop(removed);
    }
}

impl std::fmt::Debug for ListenerGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerGuard").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn dropped_listeners_stop_receiving() {
        let hub = PointerHub::new();
        let hits = Rc::new(Cell::new(0));
        let h = Rc::clone(&hits);
        let guard = hub.subscribe(move |_| h.set(h.get() + 1));
        assert_eq!(hub.listener_count(), 1);

        hub.press(Vec2::new(1.0, 1.0));
        drop(guard);
        assert_eq!(hub.listener_count(), 0);
        hub.press(Vec2::new(1.0, 1.0));
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn presses_get_fresh_sequence_numbers() {
        let hub = PointerHub::new();
        let a = hub.press(Vec2::ZERO);
        let b = hub.press(Vec2::ZERO);
        assert_eq!(a.kind, PointerKind::Down);
        assert!(b.sequence > a.sequence);
    }

    #[test]
    fn listener_unsubscribed_mid_dispatch_is_skipped() {
        let hub = PointerHub::new();
        let later_hits = Rc::new(Cell::new(0));
        let slot: Rc<RefCell<Option<ListenerGuard>>> = Rc::new(RefCell::new(None));

        let s = Rc::clone(&slot);
        let _first = hub.subscribe(move |_| {
            s.borrow_mut().take();
        });
        let h = Rc::clone(&later_hits);
        *slot.borrow_mut() = Some(hub.subscribe(move |_| h.set(h.get() + 1)));

        hub.press(Vec2::ZERO);
        assert_eq!(later_hits.get(), 0);
        assert_eq!(hub.listener_count(), 1);
    }
}
