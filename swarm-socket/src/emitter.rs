//! Typed in-memory event emitter.
//!
//! Listeners are kept in two ordered lists: persistent listeners registered
//! with [`EventEmitter::on`] and one-shot listeners registered with
//! [`EventEmitter::once`]. `emit` runs the persistent list, then drains the
//! one-shot list. Listeners run outside the lock, so they may register or
//! dispose listeners themselves; such changes take effect on the next `emit`.
//!
//! There is no panic isolation: a panicking listener unwinds out of `emit`
//! and the listeners after it are skipped for that call.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;
type OnceCallback<T> = Box<dyn FnOnce(&T) + Send>;

struct Listeners<T> {
    next_id: u64,
    persistent: Vec<(u64, Callback<T>)>,
    once: Vec<OnceCallback<T>>,
}

/// A type safe event emitter for one event type `T`.
///
/// Cloning an emitter yields another handle to the same listener lists.
pub struct EventEmitter<T> {
    inner: Arc<Mutex<Listeners<T>>>,
}

impl<T> Clone for EventEmitter<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: 'static> Default for EventEmitter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> EventEmitter<T> {
    /// Create an emitter with no listeners.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Listeners {
                next_id: 0,
                persistent: Vec::new(),
                once: Vec::new(),
            })),
        }
    }

    /// Register a persistent listener. Its return value is ignored.
    ///
    /// The same closure may be registered more than once; each registration
    /// is invoked separately. The returned [`Disposer`] removes exactly this
    /// registration.
    pub fn on<F, R>(&self, listener: F) -> Disposer
    where
        F: Fn(&T) -> R + Send + Sync + 'static,
    {
        let callback: Callback<T> = Arc::new(move |event: &T| {
            let _ = listener(event);
        });

        let id = {
            let mut inner = self.inner.lock();
            let id = inner.next_id;
            inner.next_id += 1;
            inner.persistent.push((id, callback));
            id
        };

        let weak: Weak<Mutex<Listeners<T>>> = Arc::downgrade(&self.inner);
        Disposer::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.lock().persistent.retain(|(entry, _)| *entry != id);
            }
        })
    }

    /// Register a listener that runs on the next `emit` only.
    pub fn once<F, R>(&self, listener: F)
    where
        F: FnOnce(&T) -> R + Send + 'static,
    {
        self.inner.lock().once.push(Box::new(move |event: &T| {
            let _ = listener(event);
        }));
    }

    /// Deliver `event` to every persistent listener in registration order,
    /// then to every pending one-shot listener in registration order.
    pub fn emit(&self, event: &T) {
        let persistent: Vec<Callback<T>> = self
            .inner
            .lock()
            .persistent
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect();
        for callback in &persistent {
            callback(event);
        }

        let once = std::mem::take(&mut self.inner.lock().once);
        for callback in once {
            callback(event);
        }
    }

    /// Number of persistent listeners plus pending one-shot listeners.
    pub fn listener_count(&self) -> usize {
        let inner = self.inner.lock();
        inner.persistent.len() + inner.once.len()
    }

    /// Remove every listener. Outstanding disposers become no-ops.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.persistent.clear();
        inner.once.clear();
    }
}

/// Removes a persistent listener from its emitter.
///
/// Dropping a `Disposer` keeps the listener registered.
pub struct Disposer {
    remove: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl Disposer {
    fn new(remove: impl FnOnce() + Send + 'static) -> Self {
        Self {
            remove: Mutex::new(Some(Box::new(remove))),
        }
    }

    /// Remove the listener. Calling this again is a no-op.
    pub fn dispose(&self) {
        let remove = self.remove.lock().take();
        if let Some(remove) = remove {
            remove();
        }
    }

    /// Whether `dispose` has already run.
    pub fn is_disposed(&self) -> bool {
        self.remove.lock().is_none()
    }
}

impl std::fmt::Debug for Disposer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Disposer")
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
