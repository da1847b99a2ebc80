//! CRUD orchestration over a [`DataSource`].
//!
//! [`CrudAdapter`] keeps the latest row list and its load state, runs
//! mutations and refetches the list after each successful one. Every request
//! carries a cancellation token: a new list fetch supersedes the previous
//! one, and [`CrudAdapter::shutdown`] cancels everything in flight.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use async_trait::async_trait;
use datagrid_data::{DataSource, FieldValues, Identity, RowId, SourceError, SourceOp};
use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;

use crate::edit::EditMode;
use crate::resource::{Resource, ResourceState};

// =============================================================================
// Persistence
// =============================================================================

/// How the grid saves and deletes rows.
#[async_trait]
pub trait Persistence<R: Send + Sync + 'static>: Send + Sync {
    /// Save form values. `previous` is the edited row in edit mode.
    async fn persist(
        &self,
        mode: EditMode,
        values: FieldValues,
        previous: Option<&R>,
    ) -> Result<R, SourceError>;

    async fn delete(&self, row: &R) -> Result<(), SourceError>;

    /// Whether saving is wired; hides edit and add actions when not.
    fn can_persist(&self) -> bool {
        true
    }

    /// Whether deleting is wired; hides the delete action when not.
    fn can_delete(&self) -> bool {
        true
    }
}

pub type PersistFn<R> =
    Arc<dyn Fn(EditMode, FieldValues, Option<R>) -> BoxFuture<'static, Result<R, SourceError>> + Send + Sync>;

pub type DeleteFn<R> = Arc<dyn Fn(R) -> BoxFuture<'static, Result<(), SourceError>> + Send + Sync>;

/// Persistence from plain async callbacks, either of which may be absent.
pub struct FnPersistence<R> {
    persist: Option<PersistFn<R>>,
    delete: Option<DeleteFn<R>>,
}

impl<R> Default for FnPersistence<R> {
    fn default() -> Self {
        Self {
            persist: None,
            delete: None,
        }
    }
}

impl<R: 'static> FnPersistence<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_persist<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(EditMode, FieldValues, Option<R>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, SourceError>> + Send + 'static,
    {
        self.persist = Some(Arc::new(
            move |mode, values, previous| -> BoxFuture<'static, Result<R, SourceError>> {
                Box::pin(f(mode, values, previous))
            },
        ));
        self
    }

    pub fn on_delete<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(R) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), SourceError>> + Send + 'static,
    {
        self.delete = Some(Arc::new(
            move |row| -> BoxFuture<'static, Result<(), SourceError>> { Box::pin(f(row)) },
        ));
        self
    }
}

#[async_trait]
impl<R: Clone + Send + Sync + 'static> Persistence<R> for FnPersistence<R> {
    async fn persist(
        &self,
        mode: EditMode,
        values: FieldValues,
        previous: Option<&R>,
    ) -> Result<R, SourceError> {
        match &self.persist {
            Some(persist) => persist(mode, values, previous.cloned()).await,
            None => Err(SourceError::Unexpected(Some("Saving is not supported".to_string()))),
        }
    }

    async fn delete(&self, row: &R) -> Result<(), SourceError> {
        match &self.delete {
            Some(delete) => delete(row.clone()).await,
            None => Err(SourceError::Unexpected(Some("Deleting is not supported".to_string()))),
        }
    }

    fn can_persist(&self) -> bool {
        self.persist.is_some()
    }

    fn can_delete(&self) -> bool {
        self.delete.is_some()
    }
}

// =============================================================================
// Adapter
// =============================================================================

/// Which successful mutations refetch the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidateOnSuccess {
    pub create: bool,
    pub update: bool,
    pub remove: bool,
}

impl Default for InvalidateOnSuccess {
    fn default() -> Self {
        Self {
            create: true,
            update: true,
            remove: true,
        }
    }
}

impl InvalidateOnSuccess {
    pub fn none() -> Self {
        Self {
            create: false,
            update: false,
            remove: false,
        }
    }

    pub fn applies_to(&self, op: SourceOp) -> bool {
        match op {
            SourceOp::List => false,
            SourceOp::Create => self.create,
            SourceOp::Update => self.update,
            SourceOp::Remove => self.remove,
        }
    }
}

struct AdapterInner<R: Send + 'static> {
    source: Arc<dyn DataSource<R>>,
    identity: Identity<R>,
    state: Resource<Vec<R>>,
    /// Last successfully fetched rows, kept while a refetch fails.
    rows: RwLock<Vec<R>>,
    invalidate: InvalidateOnSuccess,
    generation: AtomicU64,
    current: Mutex<Option<CancellationToken>>,
    shutdown: CancellationToken,
}

impl<R: Send + 'static> Drop for AdapterInner<R> {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Binds a grid to a data source.
///
/// Not optimistic: rows change only after the backend confirms and the list
/// is refetched.
pub struct CrudAdapter<R: Send + 'static> {
    inner: Arc<AdapterInner<R>>,
}

impl<R: Send + 'static> Clone for CrudAdapter<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R: Clone + Send + Sync + 'static> CrudAdapter<R> {
    pub fn new(source: Arc<dyn DataSource<R>>) -> Self {
        Self::with_invalidation(source, InvalidateOnSuccess::default())
    }

    pub fn with_invalidation(source: Arc<dyn DataSource<R>>, invalidate: InvalidateOnSuccess) -> Self {
        let identity = source.identity();
        Self {
            inner: Arc::new(AdapterInner {
                source,
                identity,
                state: Resource::new(),
                rows: RwLock::new(Vec::new()),
                invalidate,
                generation: AtomicU64::new(0),
                current: Mutex::new(None),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    // -------------------------------------------------------------------------
    // State
    // -------------------------------------------------------------------------

    pub fn identity(&self) -> Identity<R> {
        self.inner.identity.clone()
    }

    /// Last successfully fetched rows.
    pub fn rows(&self) -> Vec<R> {
        self.inner
            .rows
            .read()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    pub fn state(&self) -> ResourceState<Vec<R>> {
        self.inner.state.get()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.state.is_loading()
    }

    pub fn error(&self) -> Option<SourceError> {
        self.inner.state.error()
    }

    /// Whether a successful `op` refetches the list.
    pub fn invalidates(&self, op: SourceOp) -> bool {
        self.inner.invalidate.applies_to(op)
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.shutdown.is_cancelled()
    }

    /// Cancel all in-flight requests and refuse new ones.
    pub fn shutdown(&self) {
        log::debug!("Shutting down CRUD adapter");
        self.inner.shutdown.cancel();
    }

    // -------------------------------------------------------------------------
    // Fetching
    // -------------------------------------------------------------------------

    /// Fetch the list, superseding any fetch still in flight.
    ///
    /// A superseded or cancelled fetch returns [`SourceError::Cancelled`] and
    /// leaves the state untouched.
    pub async fn refetch(&self) -> Result<Vec<R>, SourceError> {
        let inner = &self.inner;
        if inner.shutdown.is_cancelled() {
            return Err(SourceError::Cancelled);
        }

        let generation = inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let token = inner.shutdown.child_token();
        let previous = inner
            .current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(token.clone());
        if let Some(previous) = previous {
            previous.cancel();
        }

        let settled = inner.state.get();
        inner.state.set_loading();
        log::debug!("Fetching rows (request {})", generation);
        let result = guarded(&token, inner.source.list()).await;

        if inner.generation.load(Ordering::SeqCst) != generation {
            log::debug!("Discarding superseded fetch {}", generation);
            return Err(SourceError::Cancelled);
        }
        if token.is_cancelled() {
            log::debug!("Fetch {} cancelled", generation);
            inner.state.restore(settled);
            return Err(SourceError::Cancelled);
        }

        match result {
            Ok(rows) => {
                log::info!("Fetched {} rows", rows.len());
                if let Ok(mut guard) = inner.rows.write() {
                    *guard = rows.clone();
                }
                inner.state.set_ready(rows.clone());
                Ok(rows)
            }
            Err(e) => {
                log::warn!("Fetching rows failed: {}", e);
                inner.state.set_error(e.clone());
                Err(e)
            }
        }
    }

    /// Fetch only when nothing is cached yet.
    pub async fn load_rows(&self) -> Result<Vec<R>, SourceError> {
        let cached = self.rows();
        if cached.is_empty() {
            self.refetch().await
        } else {
            Ok(cached)
        }
    }

    /// Refetch after a failed load.
    pub async fn retry(&self) -> Result<Vec<R>, SourceError> {
        self.refetch().await
    }

    // -------------------------------------------------------------------------
    // Mutations
    // -------------------------------------------------------------------------

    pub async fn create(&self, values: FieldValues) -> Result<R, SourceError> {
        let inner = &self.inner;
        self.mutate(SourceOp::Create, inner.source.create(values)).await
    }

    pub async fn update(&self, id: &RowId, values: FieldValues) -> Result<R, SourceError> {
        let inner = &self.inner;
        self.mutate(SourceOp::Update, inner.source.update(id, values)).await
    }

    pub async fn remove(&self, id: &RowId) -> Result<(), SourceError> {
        let inner = &self.inner;
        self.mutate(SourceOp::Remove, inner.source.remove(id)).await
    }

    async fn mutate<T>(
        &self,
        op: SourceOp,
        request: impl Future<Output = Result<T, SourceError>>,
    ) -> Result<T, SourceError> {
        if self.is_shut_down() {
            return Err(SourceError::Cancelled);
        }
        let token = self.inner.shutdown.child_token();
        let result = guarded(&token, request).await;
        match &result {
            Ok(_) => {
                log::info!("{} succeeded", op);
                if self.invalidates(op) {
                    // A failed refetch is recorded in the load state.
                    let _ = self.refetch().await;
                }
            }
            Err(e) => log::warn!("{} failed: {}", op, e),
        }
        result
    }

    fn require_id(&self, row: &R) -> Result<RowId, SourceError> {
        self.inner
            .identity
            .of(row)
            .ok_or_else(|| SourceError::Unexpected(Some("Row has no identity".to_string())))
    }
}

async fn guarded<T>(
    token: &CancellationToken,
    request: impl Future<Output = Result<T, SourceError>>,
) -> Result<T, SourceError> {
    tokio::select! {
        _ = token.cancelled() => Err(SourceError::Cancelled),
        result = request => result,
    }
}

#[async_trait]
impl<R: Clone + Send + Sync + 'static> Persistence<R> for CrudAdapter<R> {
    async fn persist(
        &self,
        mode: EditMode,
        values: FieldValues,
        previous: Option<&R>,
    ) -> Result<R, SourceError> {
        match (mode, previous) {
            (EditMode::Edit, Some(row)) => {
                let id = self.require_id(row)?;
                self.update(&id, values).await
            }
            _ => self.create(values).await,
        }
    }

    async fn delete(&self, row: &R) -> Result<(), SourceError> {
        let id = self.require_id(row)?;
        self.remove(&id).await
    }
}
