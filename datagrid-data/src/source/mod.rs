//! Data source port
//!
//! A [`DataSource`] supplies rows and persists mutations for a grid. The grid
//! never talks to a backend directly; it only calls these four operations and
//! resolves row identity through [`DataSource::identity`].

mod memory;

pub use memory::*;

use async_trait::async_trait;

use crate::error::SourceError;
use crate::model::FieldValues;
use crate::model::Identity;
use crate::model::RowId;

/// Backend operations for rows of type `R`.
///
/// All operations may fail with an arbitrary [`SourceError`], which callers
/// surface verbatim.
///
/// # Example
///
/// ```ignore
/// struct UsersApi { client: HttpClient }
///
/// #[async_trait]
/// impl DataSource<User> for UsersApi {
///     async fn list(&self) -> Result<Vec<User>, SourceError> {
///         self.client.get("/users").await
///     }
///     // ...
/// }
/// ```
#[async_trait]
pub trait DataSource<R: Send + 'static>: Send + Sync {
    /// Fetches the complete row set.
    async fn list(&self) -> Result<Vec<R>, SourceError>;

    /// Creates a row from form values and returns the stored record.
    async fn create(&self, values: FieldValues) -> Result<R, SourceError>;

    /// Updates the row with `id` and returns the stored record.
    async fn update(&self, id: &RowId, values: FieldValues) -> Result<R, SourceError>;

    /// Removes the row with `id`.
    async fn remove(&self, id: &RowId) -> Result<(), SourceError>;

    /// Identity function for rows produced by this source.
    fn identity(&self) -> Identity<R>;
}

/// The four source operations, used for call accounting and failure
/// injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceOp {
    List,
    Create,
    Update,
    Remove,
}

impl std::fmt::Display for SourceOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::List => "list",
            Self::Create => "create",
            Self::Update => "update",
            Self::Remove => "remove",
        };
        f.write_str(name)
    }
}
