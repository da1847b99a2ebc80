use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use datagrid_data::SourceError;

/// The state of an async-loaded value.
#[derive(Debug, Clone, Default)]
pub enum ResourceState<T> {
    /// Nothing requested yet
    #[default]
    Idle,
    /// A fetch is in flight
    Loading,
    /// Last fetch succeeded
    Ready(T),
    /// Last fetch failed
    Error(SourceError),
}

impl<T> ResourceState<T> {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// Get reference to ready value
    pub fn as_ready(&self) -> Option<&T> {
        match self {
            Self::Ready(v) => Some(v),
            _ => None,
        }
    }

    /// Get the error if present
    pub fn as_error(&self) -> Option<&SourceError> {
        match self {
            Self::Error(e) => Some(e),
            _ => None,
        }
    }
}

/// Async-loaded value with interior mutability.
///
/// Cheap to clone; all clones share the same state, so a fetch task can
/// update it while the grid reads it.
#[derive(Debug)]
pub struct Resource<T> {
    inner: Arc<RwLock<ResourceState<T>>>,
    dirty: Arc<AtomicBool>,
}

impl<T> Resource<T> {
    /// Create a new resource in idle state
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(ResourceState::Idle)),
            dirty: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Get a clone of the current state
    pub fn get(&self) -> ResourceState<T>
    where
        T: Clone,
    {
        self.inner
            .read()
            .map(|guard| guard.clone())
            .unwrap_or(ResourceState::Idle)
    }

    pub fn set_loading(&self) {
        self.replace(ResourceState::Loading);
    }

    pub fn set_ready(&self, value: T) {
        self.replace(ResourceState::Ready(value));
    }

    pub fn set_error(&self, err: SourceError) {
        self.replace(ResourceState::Error(err));
    }

    /// Put back a settled state after an abandoned fetch. A `Loading` state
    /// falls back to `Idle`.
    pub fn restore(&self, state: ResourceState<T>) {
        match state {
            ResourceState::Loading => self.replace(ResourceState::Idle),
            state => self.replace(state),
        }
    }

    fn replace(&self, state: ResourceState<T>) {
        if let Ok(mut guard) = self.inner.write() {
            *guard = state;
            self.dirty.store(true, Ordering::SeqCst);
        }
    }

    /// Check if the resource has been modified since last check
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::SeqCst)
    }

    /// Clear the dirty flag
    pub fn clear_dirty(&self) {
        self.dirty.store(false, Ordering::SeqCst);
    }

    pub fn is_loading(&self) -> bool {
        self.inner
            .read()
            .map(|guard| guard.is_loading())
            .unwrap_or(false)
    }

    /// The error from the last fetch, if it failed.
    pub fn error(&self) -> Option<SourceError> {
        self.inner
            .read()
            .ok()
            .and_then(|guard| guard.as_error().cloned())
    }
}

impl<T> Default for Resource<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Resource<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            dirty: Arc::clone(&self.dirty),
        }
    }
}
