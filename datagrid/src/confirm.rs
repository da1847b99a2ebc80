//! Confirmation dialog for destructive actions.
//!
//! The grid owns one dialog. [`ConfirmDialog::confirm`] opens it and returns
//! a future that resolves once the user answers; the renderer answers through
//! [`ConfirmDialog::accept`] or [`ConfirmDialog::decline`].

use std::future::Future;
use std::sync::{Arc, Mutex};

use tokio::sync::oneshot;

/// Text and styling of a confirmation dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmOptions {
    pub title: String,
    pub description: Option<String>,
    pub confirm_text: String,
    pub cancel_text: String,
    pub destructive: bool,
}

impl Default for ConfirmOptions {
    fn default() -> Self {
        Self {
            title: "Are you sure?".to_string(),
            description: None,
            confirm_text: "Confirm".to_string(),
            cancel_text: "Cancel".to_string(),
            destructive: false,
        }
    }
}

impl ConfirmOptions {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    /// Options used before deleting a row.
    pub fn delete() -> Self {
        Self {
            title: "Delete this item?".to_string(),
            description: Some("This action cannot be undone.".to_string()),
            confirm_text: "Delete".to_string(),
            cancel_text: "Cancel".to_string(),
            destructive: true,
        }
    }

    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    pub fn confirm_text(mut self, text: impl Into<String>) -> Self {
        self.confirm_text = text.into();
        self
    }

    pub fn cancel_text(mut self, text: impl Into<String>) -> Self {
        self.cancel_text = text.into();
        self
    }

    pub fn destructive(mut self) -> Self {
        self.destructive = true;
        self
    }
}

struct Pending {
    options: ConfirmOptions,
    tx: oneshot::Sender<bool>,
}

/// A single-slot confirmation dialog.
///
/// Opening a new confirmation declines the one still pending. Dropping the
/// dialog resolves any waiter with `false`.
#[derive(Clone, Default)]
pub struct ConfirmDialog {
    pending: Arc<Mutex<Option<Pending>>>,
}

impl ConfirmDialog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the dialog. The returned future resolves to the user's answer.
    ///
    /// The dialog is open as soon as this returns, before the future is
    /// polled.
    pub fn confirm(&self, options: ConfirmOptions) -> impl Future<Output = bool> + Send + use<> {
        let (tx, rx) = oneshot::channel();
        let previous = self
            .pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .replace(Pending { options, tx });
        if let Some(previous) = previous {
            log::debug!("Declining superseded confirmation '{}'", previous.options.title);
            let _ = previous.tx.send(false);
        }
        async move { rx.await.unwrap_or(false) }
    }

    /// Answer the open dialog. Returns `false` if nothing was open.
    pub fn resolve(&self, confirmed: bool) -> bool {
        let pending = self.pending.lock().unwrap_or_else(|e| e.into_inner()).take();
        match pending {
            Some(pending) => {
                let _ = pending.tx.send(confirmed);
                true
            }
            None => false,
        }
    }

    pub fn accept(&self) -> bool {
        self.resolve(true)
    }

    /// Decline the open dialog (cancel button, escape, backdrop).
    pub fn decline(&self) -> bool {
        self.resolve(false)
    }

    pub fn is_open(&self) -> bool {
        self.pending
            .lock()
            .map(|guard| guard.is_some())
            .unwrap_or(false)
    }

    /// Options of the open dialog, for rendering.
    pub fn options(&self) -> Option<ConfirmOptions> {
        self.pending
            .lock()
            .ok()
            .and_then(|guard| guard.as_ref().map(|p| p.options.clone()))
    }
}

impl std::fmt::Debug for ConfirmDialog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfirmDialog")
            .field("open", &self.is_open())
            .finish()
    }
}
