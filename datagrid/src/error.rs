//! Engine errors

use datagrid_data::RowId;
use thiserror::Error;

/// Errors returned by grid operations.
///
/// Backend failures never surface here: they are routed to the form's server
/// error slot, the fetch banner or the error sink instead.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GridError {
    #[error("Row '{0}' not found")]
    UnknownRow(RowId),

    #[error("Row has no identity")]
    MissingIdentity,

    #[error("Unknown column '{0}'")]
    UnknownColumn(String),

    #[error("Adding rows is disabled while the load error is shown")]
    AddBlocked,

    #[error("No edit session is active")]
    NoSession,

    #[error("A submit is already in flight")]
    SubmitInFlight,

    #[error("No persistence configured")]
    NoPersistence,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl GridError {
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }
}
