//! Grid configuration.

use serde::Deserialize;
use serde::Serialize;

use crate::actions::ActionPresentation;
use crate::edit::EditContainerKind;
use crate::error::GridError;
use crate::form::FormLayout;
use crate::table::PaginationState;
use crate::table::SortEntry;
use crate::window::DEFAULT_OVERSCAN;
use crate::window::DEFAULT_ROW_HEIGHT;

/// Page sizes offered by the pagination footer.
pub const DEFAULT_PAGE_SIZE_OPTIONS: [usize; 5] = [5, 10, 20, 50, 100];

/// Per-grid configuration.
///
/// Every field has a default, so hosts can deserialize a partial JSON object
/// or start from [`GridConfig::new`] and chain builder calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GridConfig {
    /// Title shown above the grid; also seeds the default storage key.
    pub title: String,

    /// Where the edit form is presented.
    pub edit_container: EditContainerKind,

    /// How row actions are presented.
    pub actions: ActionPresentation,

    pub pagination: PaginationConfig,

    /// Sorting applied before any user interaction.
    pub initial_sorting: Vec<SortEntry>,

    pub form_layout: FormLayout,

    /// Namespace for persisted column preferences.
    /// Defaults to `dg:<title>` when unset.
    pub storage_key: Option<String>,

    /// Estimated row height in pixels.
    pub row_height: u32,

    /// Rows mounted beyond each edge of the viewport.
    pub overscan: usize,

    /// Estimated height of an expanded panel or inline editor until the
    /// host reports a measurement.
    pub detail_height: u32,

    /// Minimum interval between layout recomputes on container resize.
    pub frame_ms: u64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            title: "Data".to_string(),
            edit_container: EditContainerKind::default(),
            actions: ActionPresentation::default(),
            pagination: PaginationConfig::default(),
            initial_sorting: Vec::new(),
            form_layout: FormLayout::default(),
            storage_key: None,
            row_height: DEFAULT_ROW_HEIGHT,
            overscan: DEFAULT_OVERSCAN,
            detail_height: DEFAULT_ROW_HEIGHT * 4,
            frame_ms: 16,
        }
    }
}

impl GridConfig {
    /// Create a config with the given title.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    /// Parse a config from JSON. Missing fields take their defaults.
    pub fn from_json(raw: &str) -> Result<Self, GridError> {
        let config: Self =
            serde_json::from_str(raw).map_err(|e| GridError::invalid_config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn edit_container(mut self, kind: EditContainerKind) -> Self {
        self.edit_container = kind;
        self
    }

    pub fn actions(mut self, presentation: ActionPresentation) -> Self {
        self.actions = presentation;
        self
    }

    pub fn pagination(mut self, pagination: PaginationConfig) -> Self {
        self.pagination = pagination;
        self
    }

    /// Disable pagination; every filtered row is on one page.
    pub fn without_pagination(mut self) -> Self {
        self.pagination.enabled = false;
        self
    }

    pub fn initial_sorting(mut self, sorting: Vec<SortEntry>) -> Self {
        self.initial_sorting = sorting;
        self
    }

    pub fn form_layout(mut self, layout: FormLayout) -> Self {
        self.form_layout = layout;
        self
    }

    pub fn storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = Some(key.into());
        self
    }

    pub fn row_height(mut self, px: u32) -> Self {
        self.row_height = px;
        self
    }

    pub fn overscan(mut self, rows: usize) -> Self {
        self.overscan = rows;
        self
    }

    pub fn detail_height(mut self, px: u32) -> Self {
        self.detail_height = px;
        self
    }

    /// Key under which column preferences are stored.
    pub fn resolved_storage_key(&self) -> String {
        match &self.storage_key {
            Some(key) => key.clone(),
            None => {
                let slug = self
                    .title
                    .to_lowercase()
                    .split_whitespace()
                    .collect::<Vec<_>>()
                    .join("-");
                format!("dg:{slug}")
            }
        }
    }

    /// Check for values the engine cannot work with.
    pub fn validate(&self) -> Result<(), GridError> {
        if self.row_height == 0 {
            return Err(GridError::invalid_config("row height must be positive"));
        }
        if !(1..=4).contains(&self.form_layout.columns) {
            return Err(GridError::invalid_config(format!(
                "form layout columns must be 1-4, got {}",
                self.form_layout.columns
            )));
        }
        self.pagination.validate()
    }
}

/// Pagination settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PaginationConfig {
    pub enabled: bool,
    pub page_size_options: Vec<usize>,
    pub initial: PaginationState,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            page_size_options: DEFAULT_PAGE_SIZE_OPTIONS.to_vec(),
            initial: PaginationState::default(),
        }
    }
}

impl PaginationConfig {
    pub fn page_size(mut self, size: usize) -> Self {
        self.initial.page_size = size;
        self
    }

    pub fn page_size_options(mut self, options: Vec<usize>) -> Self {
        self.page_size_options = options;
        self
    }

    fn validate(&self) -> Result<(), GridError> {
        if self.initial.page_size == 0 {
            return Err(GridError::invalid_config("page size must be positive"));
        }
        if self.page_size_options.contains(&0) {
            return Err(GridError::invalid_config(
                "page size options must be positive",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_key_is_slugged_title() {
        let config = GridConfig::new("Active  Users");
        assert_eq!(config.resolved_storage_key(), "dg:active-users");

        let config = config.storage_key("custom");
        assert_eq!(config.resolved_storage_key(), "custom");
    }

    #[test]
    fn partial_json_uses_defaults() {
        let config = GridConfig::from_json(r#"{"title":"Users","overscan":4}"#).unwrap();
        assert_eq!(config.title, "Users");
        assert_eq!(config.overscan, 4);
        assert_eq!(config.row_height, DEFAULT_ROW_HEIGHT);
        assert_eq!(config.pagination.initial.page_size, 10);
    }

    #[test]
    fn rejects_bad_form_columns() {
        let mut config = GridConfig::default();
        config.form_layout.columns = 5;
        assert!(matches!(
            config.validate(),
            Err(GridError::InvalidConfig(_))
        ));
    }
}
