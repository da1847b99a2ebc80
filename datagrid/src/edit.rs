//! Editing state machine and edit surface selection.
//!
//! At most one edit session exists per grid. Where the form is shown is a
//! separate concern: [`EditContainerKind`] maps the current state to an
//! [`EditSurface`] and a shell's chrome, while the form body stays the same.

use datagrid_data::RowId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditMode {
    Create,
    Edit,
}

impl EditMode {
    /// Heading of the form for this mode.
    pub fn title(&self) -> &'static str {
        match self {
            Self::Create => "Create",
            Self::Edit => "Edit",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum EditState {
    #[default]
    Idle,
    Creating,
    Editing(RowId),
}

impl EditState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn mode(&self) -> Option<EditMode> {
        match self {
            Self::Idle => None,
            Self::Creating => Some(EditMode::Create),
            Self::Editing(_) => Some(EditMode::Edit),
        }
    }

    pub fn row_id(&self) -> Option<&RowId> {
        match self {
            Self::Editing(id) => Some(id),
            _ => None,
        }
    }
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// Cancel button, escape or backdrop.
    User,
    /// The host bumped its cancel trigger.
    External,
    /// A new session replaced this one.
    Superseded,
    /// The form was saved.
    Submitted,
    /// The edited row was deleted.
    Removed,
}

/// Notifications produced by state changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditEvent {
    Cancelled(CancelReason),
    CreateStarted,
    EditStarted(RowId),
}

/// An active edit session.
#[derive(Debug, Clone)]
pub struct EditSession<R> {
    pub mode: EditMode,
    /// Row being edited; `None` when creating.
    pub row: Option<R>,
}

/// Tracks the single edit session of a grid.
#[derive(Debug, Clone)]
pub struct EditMachine<R> {
    state: EditState,
    session: Option<EditSession<R>>,
    last_trigger: u64,
}

impl<R> Default for EditMachine<R> {
    fn default() -> Self {
        Self {
            state: EditState::Idle,
            session: None,
            last_trigger: 0,
        }
    }
}

impl<R> EditMachine<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &EditState {
        &self.state
    }

    pub fn session(&self) -> Option<&EditSession<R>> {
        self.session.as_ref()
    }

    pub fn is_active(&self) -> bool {
        !self.state.is_idle()
    }

    /// Enter `Creating`, cancelling any active session first.
    pub fn start_create(&mut self) -> Vec<EditEvent> {
        let mut events: Vec<EditEvent> = self.cancel(CancelReason::Superseded).into_iter().collect();
        self.state = EditState::Creating;
        self.session = Some(EditSession {
            mode: EditMode::Create,
            row: None,
        });
        log::debug!("Edit session: creating");
        events.push(EditEvent::CreateStarted);
        events
    }

    /// Enter `Editing(id)`, cancelling any active session first.
    pub fn start_edit(&mut self, id: RowId, row: R) -> Vec<EditEvent> {
        let mut events: Vec<EditEvent> = self.cancel(CancelReason::Superseded).into_iter().collect();
        log::debug!("Edit session: editing {}", id);
        self.state = EditState::Editing(id.clone());
        self.session = Some(EditSession {
            mode: EditMode::Edit,
            row: Some(row),
        });
        events.push(EditEvent::EditStarted(id));
        events
    }

    /// Return to `Idle`. No event when already idle.
    pub fn cancel(&mut self, reason: CancelReason) -> Option<EditEvent> {
        if self.state.is_idle() {
            return None;
        }
        log::debug!("Edit session closed: {:?}", reason);
        self.state = EditState::Idle;
        self.session = None;
        Some(EditEvent::Cancelled(reason))
    }

    /// Apply the host's cancel trigger counter.
    ///
    /// Cancels only when the counter moves to a new positive value while a
    /// session is active.
    pub fn apply_cancel_trigger(&mut self, counter: u64) -> Option<EditEvent> {
        if counter == 0 || counter == self.last_trigger || self.state.is_idle() {
            return None;
        }
        self.last_trigger = counter;
        self.cancel(CancelReason::External)
    }
}

// =============================================================================
// Presentation
// =============================================================================

/// Where the edit form is shown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EditContainerKind {
    /// Side panel anchored to the right.
    #[default]
    #[serde(alias = "right")]
    RightPanel,
    /// Panel sliding up from the bottom.
    #[serde(alias = "bottom")]
    BottomSheet,
    Modal,
    /// Editor rows injected into the table body.
    Inline,
    /// No built-in editor; the add action is hidden.
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellAnchor {
    Right,
    Bottom,
    Center,
}

/// Chrome around the shared form body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShellChrome {
    pub anchor: ShellAnchor,
    pub backdrop: bool,
    pub closes_on_escape: bool,
    pub closes_on_backdrop: bool,
}

/// What the renderer should show for the current edit state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditSurface {
    Hidden,
    Shell {
        chrome: ShellChrome,
        mode: EditMode,
        title: &'static str,
    },
    /// Inline create row above the first body row.
    InlineCreate,
    /// Inline editor row right below the edited row.
    InlineBelow(RowId),
}

impl EditContainerKind {
    pub fn is_inline(&self) -> bool {
        matches!(self, Self::Inline)
    }

    /// Whether the add action is offered.
    pub fn shows_add(&self) -> bool {
        !matches!(self, Self::None)
    }

    /// Chrome of shelled containers; `None` for inline and none.
    pub fn chrome(&self) -> Option<ShellChrome> {
        let anchor = match self {
            Self::RightPanel => ShellAnchor::Right,
            Self::BottomSheet => ShellAnchor::Bottom,
            Self::Modal => ShellAnchor::Center,
            Self::Inline | Self::None => return None,
        };
        Some(ShellChrome {
            anchor,
            backdrop: true,
            closes_on_escape: true,
            closes_on_backdrop: true,
        })
    }

    pub fn surface(&self, state: &EditState) -> EditSurface {
        let Some(mode) = state.mode() else {
            return EditSurface::Hidden;
        };
        match (self, state) {
            (Self::None, _) => EditSurface::Hidden,
            (Self::Inline, EditState::Editing(id)) => EditSurface::InlineBelow(id.clone()),
            (Self::Inline, _) => EditSurface::InlineCreate,
            _ => match self.chrome() {
                Some(chrome) => EditSurface::Shell {
                    chrome,
                    mode,
                    title: mode.title(),
                },
                None => EditSurface::Hidden,
            },
        }
    }
}
