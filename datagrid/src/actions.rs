//! Row actions column.

use serde::{Deserialize, Serialize};

use crate::column::ACTIONS_COLUMN_ID;

/// How row actions are shown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionPresentation {
    /// A regular trailing column headed "Actions".
    Inline,
    /// Buttons floating over the row end on hover; takes no layout width.
    #[default]
    Overlay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RowAction {
    Edit,
    Delete,
}

/// A rendered action button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionButton {
    pub action: RowAction,
    pub label: String,
    pub aria_label: String,
    pub destructive: bool,
}

/// The synthetic trailing actions column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionColumn {
    pub presentation: ActionPresentation,
    pub edit_label: String,
    pub delete_label: String,
}

impl Default for ActionColumn {
    fn default() -> Self {
        Self::new(ActionPresentation::default())
    }
}

impl ActionColumn {
    pub fn new(presentation: ActionPresentation) -> Self {
        Self {
            presentation,
            edit_label: "Edit".to_string(),
            delete_label: "Delete".to_string(),
        }
    }

    pub fn id(&self) -> &'static str {
        ACTIONS_COLUMN_ID
    }

    pub fn header(&self) -> &'static str {
        match self.presentation {
            ActionPresentation::Inline => "Actions",
            ActionPresentation::Overlay => "",
        }
    }

    /// Width reserved in the column layout.
    pub fn layout_width(&self) -> u32 {
        0
    }

    /// Buttons for a row, given which callbacks are wired.
    pub fn buttons(&self, can_edit: bool, can_delete: bool) -> Vec<ActionButton> {
        let mut buttons = Vec::with_capacity(2);
        if can_edit {
            buttons.push(ActionButton {
                action: RowAction::Edit,
                label: self.edit_label.clone(),
                aria_label: "Edit row".to_string(),
                destructive: false,
            });
        }
        if can_delete {
            buttons.push(ActionButton {
                action: RowAction::Delete,
                label: self.delete_label.clone(),
                aria_label: "Delete row".to_string(),
                destructive: true,
            });
        }
        buttons
    }
}
