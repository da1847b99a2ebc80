//! Data layer for the datagrid engine
//!
//! Dynamic values and records, row identity, source errors and the
//! [`DataSource`](source::DataSource) port the grid persists through.

pub mod error;
pub mod model;
pub mod source;

pub use error::SourceError;
pub use model::{FieldAccess, FieldValues, Identity, Record, RowId, Value};
pub use source::{DataSource, MemorySource, SourceOp};
