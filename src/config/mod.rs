//! Workspace configuration (`.folio-i18n.json`).
mod loader;
mod manager;
mod types;

pub use loader::CONFIG_FILE_NAME;
pub use manager::ConfigManager;
pub use types::{
    ConfigError,
    DeeplConfig,
    GithubConfig,
    RelayConfig,
    Settings,
    StorageConfig,
    TranslationFilesConfig,
    ValidationError,
};
