//! Host window resize notifications

use crate::terminal::Viewport;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Identifier returned by `add_resize_listener`
pub type ListenerId = u64;

type ResizeListener = Arc<dyn Fn(Viewport) + Send + Sync>;

/// The window hosting terminal views.
///
/// Listeners run synchronously on the thread calling `resize`, in
/// subscription order.
pub struct HostWindow {
    viewport: Mutex<Viewport>,
    listeners: Mutex<BTreeMap<ListenerId, ResizeListener>>,
    next_id: Mutex<ListenerId>,
}

impl HostWindow {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport: Mutex::new(viewport),
            listeners: Mutex::new(BTreeMap::new()),
            next_id: Mutex::new(0),
        }
    }

    pub fn viewport(&self) -> Viewport {
        *self.viewport.lock()
    }

    pub fn add_resize_listener(&self, listener: impl Fn(Viewport) + Send + Sync + 'static) -> ListenerId {
        let id = {
            let mut next = self.next_id.lock();
            *next += 1;
            *next
        };
        self.listeners.lock().insert(id, Arc::new(listener));
        id
    }

    /// Unsubscribe. Returns false if the id was not subscribed.
    pub fn remove_resize_listener(&self, id: ListenerId) -> bool {
        self.listeners.lock().remove(&id).is_some()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }

    /// Record a new window size and notify listeners
    pub fn resize(&self, viewport: Viewport) {
        *self.viewport.lock() = viewport;
        // Snapshot so listeners can unsubscribe themselves without deadlocking
        let listeners: Vec<ResizeListener> = self.listeners.lock().values().cloned().collect();
        for listener in listeners {
            listener(viewport);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listeners_receive_resizes_until_removed() {
        let window = HostWindow::new(Viewport::new(800, 600));
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&seen);
        let id = window.add_resize_listener(move |v| sink.lock().push(v));
        window.resize(Viewport::new(1024, 768));

        assert!(window.remove_resize_listener(id));
        assert!(!window.remove_resize_listener(id));
        window.resize(Viewport::new(640, 480));

        assert_eq!(*seen.lock(), vec![Viewport::new(1024, 768)]);
        assert_eq!(window.viewport(), Viewport::new(640, 480));
        assert_eq!(window.listener_count(), 0);
    }

    #[test]
    fn test_listener_may_unsubscribe_itself() {
        let window = Arc::new(HostWindow::new(Viewport::new(10, 10)));
        let id_slot = Arc::new(Mutex::new(None));

        let weak = Arc::downgrade(&window);
        let slot = Arc::clone(&id_slot);
        let id = window.add_resize_listener(move |_| {
            if let (Some(window), Some(id)) = (weak.upgrade(), *slot.lock()) {
                window.remove_resize_listener(id);
            }
        });
        *id_slot.lock() = Some(id);

        window.resize(Viewport::new(20, 20));
        assert_eq!(window.listener_count(), 0);
    }
}
