//! Holds the validated settings of one workspace.

use std::path::PathBuf;

use super::{
    ConfigError,
    Settings,
    loader,
};

/// Owner of the current [`Settings`].
#[derive(Default, Debug, Clone)]
pub struct ConfigManager {
    /// Last settings that passed validation.
    current_settings: Settings,
}

impl ConfigManager {
    #[must_use]
    pub fn new() -> Self {
        Self { current_settings: Settings::default() }
    }

    /// Loads and validates the workspace configuration. Without a workspace,
    /// or without a configuration file, the defaults apply.
    ///
    /// On error the previous settings are kept.
    ///
    /// # Errors
    /// - The configuration file cannot be read or parsed
    /// - Validation fails
    pub fn load_settings(&mut self, workspace_root: Option<PathBuf>) -> Result<(), ConfigError> {
        tracing::debug!("Loading settings for workspace: {:?}", workspace_root);

        let settings = if let Some(root) = &workspace_root {
            loader::load_from_workspace(root)?.map_or_else(Settings::default, |ws| {
                tracing::debug!("Loaded workspace settings: {:?}", ws);
                ws
            })
        } else {
            Settings::default()
        };

        settings.validate().map_err(ConfigError::ValidationErrors)?;

        self.current_settings = settings;
        tracing::debug!("Settings loaded successfully: {:?}", self.current_settings);

        Ok(())
    }

    #[must_use]
    pub const fn get_settings(&self) -> &Settings {
        &self.current_settings
    }
}
