use std::path::PathBuf;
use std::time::Duration;

use reqwest::Url;
use serde::{
    Deserialize,
    Serialize,
};
use thiserror::Error;

use crate::locale::{
    Locale,
    SupportedLocales,
};
use crate::relay::{
    DEFAULT_DEEPL_URL,
    Glossary,
    GlossaryTerm,
};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Configuration error in '{field_path}': {message}")]
pub struct ValidationError {
    /// JSON path to the field (e.g., "supportedLocales[1]")
    pub field_path: String,
    pub message: String,
}

impl ValidationError {
    #[must_use]
    pub fn new(field_path: impl Into<String>, message: impl Into<String>) -> Self {
        Self { field_path: field_path.into(), message: message.into() }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration validation failed:\n{}", format_validation_errors(.0))]
    ValidationErrors(Vec<ValidationError>),

    #[error("Failed to load configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Failed to read configuration: {0}")]
    DeserializeError(#[from] serde_json::Error),
}

impl From<ValidationError> for ConfigError {
    fn from(err: ValidationError) -> Self {
        Self::ValidationErrors(vec![err])
    }
}

/// Numbered list of errors, one per line.
fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .enumerate()
        .map(|(i, err)| format!("  {}. {} - {}", i + 1, err.field_path, err.message))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Contents of `.folio-i18n.json`. Every field has a default.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub default_locale: String,

    /// Locales a visitor can switch to. The default locale may be listed too.
    pub supported_locales: Vec<String>,

    pub translation_files: TranslationFilesConfig,
    pub key_separator: String,

    pub relay: RelayConfig,
    pub storage: StorageConfig,
    pub deepl: DeeplConfig,
    pub github: GithubConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TranslationFilesConfig {
    pub file_pattern: String,
}

impl Default for TranslationFilesConfig {
    fn default() -> Self {
        Self { file_pattern: "**/{locales,messages}/**/*.json".to_string() }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RelayConfig {
    pub endpoint: String,

    /// Upper bound for one machine translation, in milliseconds.
    pub timeout_ms: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self { endpoint: "http://localhost:3000/api/translate".to_string(), timeout_ms: 8000 }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StorageConfig {
    /// Store file. Falls back to the platform data directory when unset.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeeplConfig {
    pub api_url: String,
    pub glossary: Vec<GlossaryTerm>,
}

impl Default for DeeplConfig {
    fn default() -> Self {
        Self { api_url: DEFAULT_DEEPL_URL.to_string(), glossary: Vec::new() }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GithubConfig {
    pub endpoint: String,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self { endpoint: "https://api.github.com/graphql".to_string() }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_locale: "en".to_string(),
            supported_locales: vec!["en".to_string(), "de".to_string()],
            translation_files: TranslationFilesConfig::default(),
            key_separator: ".".to_string(),
            relay: RelayConfig::default(),
            storage: StorageConfig::default(),
            deepl: DeeplConfig::default(),
            github: GithubConfig::default(),
        }
    }
}

/// Parses a configured URL, blaming `field_path` on failure.
fn parse_url(field_path: &str, value: &str) -> Result<Url, ValidationError> {
    Url::parse(value)
        .map_err(|e| ValidationError::new(field_path, format!("Invalid URL '{value}': {e}")))
}

impl Settings {
    /// # Errors
    /// - Unparsable or duplicate locale
    /// - Default locale missing from `supportedLocales`
    /// - Empty separator or invalid glob pattern
    /// - Invalid URL, zero timeout, or empty glossary term
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = self.locale_set().err().unwrap_or_default();

        if self.key_separator.is_empty() {
            errors.push(ValidationError::new(
                "keySeparator",
                "The separator cannot be empty. Please specify a separator, for example: \".\" (dot)",
            ));
        }

        if self.translation_files.file_pattern.is_empty() {
            errors.push(ValidationError::new(
                "translationFiles.filePattern",
                "The pattern cannot be empty. Example: \"**/{locales,messages}/**/*.json\"",
            ));
        } else if let Err(e) = globset::Glob::new(&self.translation_files.file_pattern) {
            errors.push(ValidationError::new(
                "translationFiles.filePattern",
                format!("Invalid glob pattern '{}': {e}", self.translation_files.file_pattern),
            ));
        }

        for url in [self.relay_endpoint(), self.deepl_api_url(), self.github_endpoint()] {
            if let Err(e) = url {
                errors.push(e);
            }
        }

        if self.relay.timeout_ms == 0 {
            errors.push(ValidationError::new(
                "relay.timeoutMs",
                "The timeout must be greater than zero milliseconds",
            ));
        }

        for (index, term) in self.deepl.glossary.iter().enumerate() {
            if term.from.is_empty() {
                errors.push(ValidationError::new(
                    format!("deepl.glossary[{index}].from"),
                    "The term to replace cannot be empty",
                ));
            }
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    /// Builds the locale set from `defaultLocale` and `supportedLocales`.
    ///
    /// # Errors
    /// Every unparsable, duplicate or missing locale, one entry each.
    pub fn locale_set(&self) -> Result<SupportedLocales, Vec<ValidationError>> {
        let mut errors = Vec::new();

        let default = Locale::parse(&self.default_locale)
            .map_err(|e| errors.push(ValidationError::new("defaultLocale", e.to_string())))
            .ok();

        let mut locales: Vec<Locale> = Vec::new();
        for (index, tag) in self.supported_locales.iter().enumerate() {
            let field_path = format!("supportedLocales[{index}]");
            match Locale::parse(tag) {
                Ok(locale) if locales.contains(&locale) => errors.push(ValidationError::new(
                    field_path,
                    format!("Locale '{locale}' is listed more than once"),
                )),
                Ok(locale) => locales.push(locale),
                Err(e) => errors.push(ValidationError::new(field_path, e.to_string())),
            }
        }

        let Some(default) = default else {
            return Err(errors);
        };
        if !self.supported_locales.is_empty() && !locales.contains(&default) {
            errors.push(ValidationError::new(
                "defaultLocale",
                format!("Default locale '{default}' must be one of supportedLocales"),
            ));
        }
        if !errors.is_empty() {
            return Err(errors);
        }

        SupportedLocales::new(default, locales)
            .map_err(|e| vec![ValidationError::new("supportedLocales", e.to_string())])
    }

    /// # Errors
    /// Returns the validation error for `relay.endpoint`.
    pub fn relay_endpoint(&self) -> Result<Url, ValidationError> {
        parse_url("relay.endpoint", &self.relay.endpoint)
    }

    /// # Errors
    /// Returns the validation error for `deepl.apiUrl`.
    pub fn deepl_api_url(&self) -> Result<Url, ValidationError> {
        parse_url("deepl.apiUrl", &self.deepl.api_url)
    }

    /// # Errors
    /// Returns the validation error for `github.endpoint`.
    pub fn github_endpoint(&self) -> Result<Url, ValidationError> {
        parse_url("github.endpoint", &self.github.endpoint)
    }

    #[must_use]
    pub const fn relay_timeout(&self) -> Duration {
        Duration::from_millis(self.relay.timeout_ms)
    }

    #[must_use]
    pub fn glossary(&self) -> Glossary {
        Glossary::new(self.deepl.glossary.clone())
    }
}
