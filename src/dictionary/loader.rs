//! Translation file discovery and parsing

use std::collections::HashMap;
use std::path::{
    Path,
    PathBuf,
};

use globset::Glob;
use ignore::WalkBuilder;
use jsonc_parser::ParseOptions;
use serde_json::Value;

use super::{
    Dictionaries,
    DictionaryError,
};
use crate::locale::{
    Locale,
    SupportedLocales,
};

/// Flatten nested JSON object into separator-joined key map.
///
/// # Examples
/// ```
/// use serde_json::json;
/// use folio_i18n::dictionary::flatten_json;
///
/// let json = json!({
///     "nav": {
///         "resume": "Lebenslauf",
///         "projects": "Projekte"
///     }
/// });
///
/// let flattened = flatten_json(&json, ".", None);
/// assert_eq!(flattened.get("nav.resume"), Some(&"Lebenslauf".to_string()));
/// assert_eq!(flattened.get("nav.projects"), Some(&"Projekte".to_string()));
/// ```
#[must_use]
pub fn flatten_json(
    json: &Value,
    separator: &str,
    prefix: Option<&str>,
) -> HashMap<String, String> {
    let mut result = HashMap::new();
    flatten_json_value(json, separator, prefix, &mut result);
    result
}

/// Recursive worker for [`flatten_json`].
fn flatten_json_value(
    json: &Value,
    separator: &str,
    prefix: Option<&str>,
    result: &mut HashMap<String, String>,
) {
    match json {
        Value::Object(map) => {
            for (key, value) in map {
                let full_key =
                    prefix.map_or_else(|| key.clone(), |p| format!("{p}{separator}{key}"));
                flatten_json_value(value, separator, Some(&full_key), result);
            }
        }
        Value::Array(arr) => {
            for (index, value) in arr.iter().enumerate() {
                let full_key =
                    prefix.map_or_else(|| format!("[{index}]"), |p| format!("{p}[{index}]"));
                flatten_json_value(value, separator, Some(&full_key), result);
            }
        }
        Value::String(s) => {
            if let Some(key) = prefix {
                result.insert(key.to_string(), s.clone());
            }
        }
        Value::Null => {}
        _ => {
            if let Some(key) = prefix {
                result.insert(key.to_string(), json.to_string());
            }
        }
    }
}

/// Detect the locale of a translation file from its path.
///
/// Splits the path by '/' and '.', then searches backwards for a part that is
/// one of the supported locales.
///
/// # Examples
/// - `messages/de.json` → `de`
/// - `locales/de/common.json` → `de`
/// - `messages/de-DE.json` → `de-DE` (only if `de-DE` itself is supported)
#[must_use]
pub fn detect_locale_from_path(file_path: &Path, supported: &SupportedLocales) -> Option<Locale> {
    let path_str = file_path.to_string_lossy().replace('\\', "/");

    path_str.split(['/', '.']).rev().find_map(|part| {
        Locale::parse(part).ok().filter(|locale| supported.contains(locale))
    })
}

/// Parse the text of a translation file. Comments and trailing commas are accepted.
///
/// # Errors
/// - The text is not valid JSON(C)
/// - The top-level value is not an object
pub fn parse_dictionary_text(
    text: &str,
    separator: &str,
) -> Result<HashMap<String, String>, DictionaryError> {
    let value = jsonc_parser::parse_to_serde_value(text, &ParseOptions::default())
        .map_err(|e| DictionaryError::Parse(e.to_string()))?
        .unwrap_or(Value::Object(serde_json::Map::new()));

    if !value.is_object() {
        return Err(DictionaryError::NotAnObject);
    }

    Ok(flatten_json(&value, separator, None))
}

/// Load every translation file under `workspace_root` matching `file_pattern`.
///
/// Files that cannot be read or parsed, or whose locale is not supported, are
/// skipped with a warning.
///
/// # Errors
/// Returns [`DictionaryError::InvalidPattern`] if `file_pattern` is not a valid glob.
pub fn load_dictionaries(
    workspace_root: &Path,
    file_pattern: &str,
    separator: &str,
    supported: &SupportedLocales,
) -> Result<Dictionaries, DictionaryError> {
    tracing::debug!(workspace_root = %workspace_root.display(), file_pattern, "Loading dictionaries");

    let mut dictionaries = Dictionaries::new();
    for relative_path in find_translation_files(workspace_root, file_pattern)? {
        // only the part inside the workspace may name the locale
        let Some(locale) = detect_locale_from_path(&relative_path, supported) else {
            tracing::warn!("Skipping translation file with unsupported locale: {:?}", relative_path);
            continue;
        };

        let file_path = workspace_root.join(&relative_path);
        let entries = match std::fs::read_to_string(&file_path)
            .map_err(DictionaryError::from)
            .and_then(|content| parse_dictionary_text(&content, separator))
        {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("Failed to load translation file {:?}: {}", file_path, e);
                continue;
            }
        };

        tracing::debug!(locale = %locale, keys = entries.len(), "Loaded {:?}", file_path);
        dictionaries.extend(locale, entries);
    }

    Ok(dictionaries)
}

/// Walk the workspace and collect files matching `file_pattern`, relative to
/// `workspace_root`.
fn find_translation_files(
    workspace_root: &Path,
    file_pattern: &str,
) -> Result<Vec<PathBuf>, DictionaryError> {
    let matcher = Glob::new(file_pattern)
        .map_err(|e| DictionaryError::InvalidPattern {
            pattern: file_pattern.to_string(),
            message: e.to_string(),
        })?
        .compile_matcher();

    let mut found_files = Vec::new();
    for result in WalkBuilder::new(workspace_root)
        .hidden(false)
        .git_ignore(true)
        .git_exclude(true)
        .follow_links(false)
        .build()
    {
        let entry = match result {
            Ok(entry) => entry,
            Err(err) => {
                tracing::debug!(?err, "Failed to read directory entry");
                continue;
            }
        };

        if !entry.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }

        let path = entry.path();
        let Ok(relative_path) = path.strip_prefix(workspace_root) else {
            continue;
        };
        if matcher.is_match(relative_path) {
            found_files.push(relative_path.to_path_buf());
        }
    }

    // Later files overwrite earlier ones on key collisions; keep that stable.
    found_files.sort();
    Ok(found_files)
}
