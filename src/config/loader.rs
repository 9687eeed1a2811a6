//! Reads `.folio-i18n.json` from a workspace.

use std::path::Path;

use jsonc_parser::ParseOptions;

use super::{
    ConfigError,
    Settings,
};

/// Name of the configuration file at the workspace root.
pub const CONFIG_FILE_NAME: &str = ".folio-i18n.json";

/// Loads the workspace configuration file, if any.
///
/// Comments and trailing commas are accepted.
///
/// # Returns
/// - `Ok(Some(settings))`: the file exists and was read
/// - `Ok(None)`: no configuration file
///
/// # Errors
/// - The file cannot be read
/// - The file is not valid JSON(C) or has wrongly typed fields
pub(super) fn load_from_workspace(workspace_root: &Path) -> Result<Option<Settings>, ConfigError> {
    let config_path = workspace_root.join(CONFIG_FILE_NAME);

    if !config_path.exists() {
        tracing::debug!("Configuration file not found: {:?}", config_path);
        return Ok(None);
    }

    tracing::debug!("Loading configuration from: {:?}", config_path);

    let content = std::fs::read_to_string(&config_path)?;
    let Some(value) = jsonc_parser::parse_to_serde_value(&content, &ParseOptions::default())
        .map_err(|e| ConfigError::ParseError(e.to_string()))?
    else {
        return Ok(Some(Settings::default()));
    };

    Ok(Some(serde_json::from_value(value)?))
}
