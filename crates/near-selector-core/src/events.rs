use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use crate::domain::Account;

pub type EventHandler<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// Handle returned by `on`-style registrations. Listeners stay registered
/// until `remove` is called; dropping the handle does not unsubscribe.
pub struct Subscription {
    remove: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(remove: impl FnOnce() + Send + 'static) -> Self {
        Self {
            remove: Some(Box::new(remove)),
        }
    }

    pub fn noop() -> Self {
        Self { remove: None }
    }

    pub fn remove(mut self) {
        if let Some(remove) = self.remove.take() {
            remove();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.remove.is_some())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountsChanged {
    pub accounts: Vec<Account>,
}

pub struct EventEmitter<E> {
    inner: Arc<Mutex<Listeners<E>>>,
}

struct Listeners<E> {
    next_id: u64,
    handlers: Vec<(u64, EventHandler<E>)>,
}

impl<E> Default for EventEmitter<E> {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Listeners {
                next_id: 0,
                handlers: Vec::new(),
            })),
        }
    }
}

impl<E> Clone for EventEmitter<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E: 'static> fmt::Debug for EventEmitter<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventEmitter")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl<E: 'static> EventEmitter<E> {
    pub fn on(&self, handler: EventHandler<E>) -> Subscription {
        let id = {
            let mut g = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            g.next_id = g.next_id.saturating_add(1);
            let id = g.next_id;
            g.handlers.push((id, handler));
            id
        };
        let inner = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = inner.upgrade() {
                let mut g = inner.lock().unwrap_or_else(PoisonError::into_inner);
                g.handlers.retain(|(x, _)| *x != id);
            }
        })
    }

    /// Handlers run outside the listener lock so they may subscribe or emit.
    pub fn emit(&self, event: &E) {
        let handlers: Vec<EventHandler<E>> = {
            let g = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            g.handlers.iter().map(|(_, h)| Arc::clone(h)).collect()
        };
        for handler in handlers {
            handler(event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .handlers
            .len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn removed_listener_is_not_called() {
        let emitter = EventEmitter::<u32>::default();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let sub = emitter.on(Arc::new(move |v: &u32| {
            counter.fetch_add(*v as usize, Ordering::SeqCst);
        }));

        emitter.emit(&2);
        sub.remove();
        emitter.emit(&5);

        assert_eq!(hits.load(Ordering::SeqCst), 2);
        assert_eq!(emitter.listener_count(), 0);
    }

    #[test]
    fn handler_may_subscribe_during_emit() {
        let emitter = EventEmitter::<()>::default();
        let nested = emitter.clone();
        let _sub = emitter.on(Arc::new(move |_: &()| {
            let _ = nested.on(Arc::new(|_: &()| {}));
        }));

        emitter.emit(&());
        assert_eq!(emitter.listener_count(), 2);
    }

    #[test]
    fn debug_shows_listener_count() {
        let emitter = EventEmitter::<AccountsChanged>::default();
        let _sub = emitter.on(Arc::new(|_: &AccountsChanged| {}));
        assert_eq!(format!("{emitter:?}"), "EventEmitter { listeners: 1 }");
    }
}
