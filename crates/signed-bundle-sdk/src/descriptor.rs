//! Project descriptor (`config.xml`) reading.
//!
//! Only the preferences declared inside `<platform name="android">` are of
//! interest here:
//!
//! ```xml
//! <widget id="com.example.app" version="1.0.0">
//!     <platform name="android">
//!         <preference name="signed_bundle_keystore_path" value="keys/release.jks" />
//!         <preference name="signed_bundle_keystore_alias" value="upload" />
//!     </platform>
//! </widget>
//! ```
//!
//! Parsing sits behind [`PreferenceReader`] so the pipeline does not depend
//! on a particular markup library and tests can feed preferences directly.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::types::{ConfigError, SigningConfig, ANDROID_PLATFORM};

/// Descriptor file name, relative to the project root.
pub const DESCRIPTOR_FILE: &str = "config.xml";

/// Preference holding the keystore path.
pub const KEYSTORE_PATH_PREFERENCE: &str = "signed_bundle_keystore_path";

/// Preference holding the key alias.
pub const KEYSTORE_ALIAS_PREFERENCE: &str = "signed_bundle_keystore_alias";

/// Source of Android platform preferences.
pub trait PreferenceReader {
    /// Returns the `name -> value` preferences of the android platform
    /// section of the descriptor at `descriptor`. Repeated names keep the
    /// last value in document order.
    fn read_android_preferences(
        &self,
        descriptor: &Path,
    ) -> Result<BTreeMap<String, String>, ConfigError>;
}

/// [`PreferenceReader`] backed by `quick-xml`.
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlPreferenceReader;

impl PreferenceReader for XmlPreferenceReader {
    fn read_android_preferences(
        &self,
        descriptor: &Path,
    ) -> Result<BTreeMap<String, String>, ConfigError> {
        let contents =
            std::fs::read_to_string(descriptor).map_err(|source| ConfigError::Unreadable {
                path: descriptor.to_path_buf(),
                source,
            })?;
        parse_android_preferences(&contents).map_err(|message| ConfigError::ParseFailure {
            path: descriptor.to_path_buf(),
            message,
        })
    }
}

/// Extracts android platform preferences from descriptor text.
///
/// Only `<platform>` elements that are direct children of a `<widget>` root
/// are considered. A document without a `<widget>` root yields no
/// preferences; a malformed document yields an error message.
pub fn parse_android_preferences(xml: &str) -> Result<BTreeMap<String, String>, String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut preferences = BTreeMap::new();
    let mut stack: Vec<Vec<u8>> = Vec::new();
    let mut seen_root = false;
    // Stack depth at which the current android <platform> was opened.
    let mut android_depth: Option<usize> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| format!("{} at byte {}", e, reader.error_position()))?;

        match event {
            Event::Start(element) => {
                if stack.is_empty() {
                    seen_root = true;
                }
                let opens_android = visit_element(&element, &stack, android_depth, &mut preferences)?;
                if opens_android {
                    android_depth = Some(stack.len());
                }
                stack.push(element.name().as_ref().to_vec());
            }
            Event::Empty(element) => {
                if stack.is_empty() {
                    seen_root = true;
                }
                visit_element(&element, &stack, android_depth, &mut preferences)?;
            }
            Event::End(_) => {
                stack.pop();
                if android_depth == Some(stack.len()) {
                    android_depth = None;
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(format!(
            "unexpected end of document, <{}> is not closed",
            String::from_utf8_lossy(stack.last().map(Vec::as_slice).unwrap_or_default())
        ));
    }
    if !seen_root {
        return Err("document has no root element".to_string());
    }

    Ok(preferences)
}

/// Records a preference if `element` sits in the android platform section.
/// Returns `true` if `element` is itself the android platform element.
fn visit_element(
    element: &BytesStart<'_>,
    stack: &[Vec<u8>],
    android_depth: Option<usize>,
    preferences: &mut BTreeMap<String, String>,
) -> Result<bool, String> {
    let name = element.name();
    let name = name.as_ref();

    if stack.len() == 1 && stack[0] == b"widget" && name == b"platform" {
        return Ok(attribute(element, b"name")?.as_deref() == Some(ANDROID_PLATFORM));
    }

    if android_depth.is_some_and(|depth| stack.len() == depth + 1) && name == b"preference" {
        if let (Some(key), Some(value)) = (
            attribute(element, b"name")?,
            attribute(element, b"value")?,
        ) {
            preferences.insert(key, value);
        }
    }

    Ok(false)
}

fn attribute(element: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>, String> {
    for attr in element.attributes() {
        let attr = attr.map_err(|e| e.to_string())?;
        if attr.key.as_ref() == key {
            let value = attr.unescape_value().map_err(|e| e.to_string())?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

/// Resolves a keystore path against the project root unless it is
/// already absolute.
pub fn resolve_keystore_path(project_root: &Path, keystore: impl AsRef<Path>) -> PathBuf {
    let keystore = keystore.as_ref();
    if keystore.is_absolute() {
        keystore.to_path_buf()
    } else {
        project_root.join(keystore)
    }
}

/// Loads the signing configuration from `<project_root>/config.xml`.
///
/// A missing or empty keystore preference leaves
/// [`SigningConfig::keystore_path`] as `None`; deciding whether that is
/// fatal is up to the signer.
pub fn load_signing_config(
    reader: &dyn PreferenceReader,
    project_root: &Path,
) -> Result<SigningConfig, ConfigError> {
    let descriptor = project_root.join(DESCRIPTOR_FILE);
    let preferences = reader.read_android_preferences(&descriptor)?;
    Ok(signing_config_from_preferences(&preferences, project_root))
}

/// Builds a [`SigningConfig`] from already-read preferences.
pub fn signing_config_from_preferences(
    preferences: &BTreeMap<String, String>,
    project_root: &Path,
) -> SigningConfig {
    let non_empty = |key: &str| {
        preferences
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    };

    SigningConfig {
        keystore_path: non_empty(KEYSTORE_PATH_PREFERENCE)
            .map(|path| resolve_keystore_path(project_root, path)),
        alias: non_empty(KEYSTORE_ALIAS_PREFERENCE).map(str::to_string),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const DESCRIPTOR: &str = r#"<?xml version='1.0' encoding='utf-8'?>
<widget id="com.example.app" version="1.0.0" xmlns="http://www.w3.org/ns/widgets">
    <name>Example</name>
    <preference name="signed_bundle_keystore_path" value="top-level-is-ignored.jks" />
    <platform name="ios">
        <preference name="signed_bundle_keystore_path" value="ios.jks" />
    </platform>
    <platform name="android">
        <preference name="signed_bundle_keystore_path" value="rel/store.jks" />
        <preference name="signed_bundle_keystore_alias" value="myalias" />
        <preference name="Orientation" value="portrait"></preference>
    </platform>
</widget>
"#;

    #[test]
    fn test_parse_android_preferences() {
        let prefs = parse_android_preferences(DESCRIPTOR).unwrap();
        assert_eq!(prefs.len(), 3);
        assert_eq!(prefs[KEYSTORE_PATH_PREFERENCE], "rel/store.jks");
        assert_eq!(prefs[KEYSTORE_ALIAS_PREFERENCE], "myalias");
        assert_eq!(prefs["Orientation"], "portrait");
    }

    #[test]
    fn test_repeated_preference_last_wins() {
        let xml = r#"<widget>
            <platform name="android">
                <preference name="signed_bundle_keystore_alias" value="first" />
            </platform>
            <platform name="android">
                <preference name="signed_bundle_keystore_alias" value="second" />
            </platform>
        </widget>"#;
        let prefs = parse_android_preferences(xml).unwrap();
        assert_eq!(prefs[KEYSTORE_ALIAS_PREFERENCE], "second");
    }

    #[test]
    fn test_no_android_platform() {
        let xml = r#"<widget><platform name="ios"/><platform name="android"/></widget>"#;
        assert!(parse_android_preferences(xml).unwrap().is_empty());
    }

    #[test]
    fn test_escaped_values() {
        let xml = r#"<widget><platform name="android">
            <preference name="signed_bundle_keystore_path" value="keys/a&amp;b.jks" />
        </platform></widget>"#;
        let prefs = parse_android_preferences(xml).unwrap();
        assert_eq!(prefs[KEYSTORE_PATH_PREFERENCE], "keys/a&b.jks");
    }

    #[test]
    fn test_malformed_descriptor() {
        assert!(parse_android_preferences("<widget><platform name=\"android\"></widget>").is_err());
        assert!(parse_android_preferences("<widget>").is_err());
        assert!(parse_android_preferences("").is_err());
    }

    #[test]
    fn test_load_signing_config_relative_path() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join(DESCRIPTOR_FILE), DESCRIPTOR).unwrap();

        let config = load_signing_config(&XmlPreferenceReader, temp_dir.path()).unwrap();
        assert_eq!(
            config.keystore_path,
            Some(temp_dir.path().join("rel/store.jks"))
        );
        assert_eq!(config.alias.as_deref(), Some("myalias"));
    }

    #[test]
    fn test_absolute_keystore_unchanged() {
        let absolute = std::env::temp_dir().join("release.jks");
        let mut prefs = BTreeMap::new();
        prefs.insert(
            KEYSTORE_PATH_PREFERENCE.to_string(),
            absolute.display().to_string(),
        );

        let config = signing_config_from_preferences(&prefs, Path::new("/p"));
        assert_eq!(config.keystore_path, Some(absolute));
        assert_eq!(config.alias, None);
    }

    #[test]
    fn test_relative_keystore_joined_to_root() {
        let root = Path::new("/p");
        assert_eq!(
            resolve_keystore_path(root, "rel/store.jks"),
            root.join("rel/store.jks")
        );
    }

    #[test]
    fn test_empty_preference_is_unresolved() {
        let mut prefs = BTreeMap::new();
        prefs.insert(KEYSTORE_PATH_PREFERENCE.to_string(), String::new());
        prefs.insert(KEYSTORE_ALIAS_PREFERENCE.to_string(), String::new());

        let config = signing_config_from_preferences(&prefs, Path::new("/p"));
        assert_eq!(config, SigningConfig::default());
    }

    #[test]
    fn test_preference_values_are_not_trimmed() {
        let mut prefs = BTreeMap::new();
        prefs.insert(
            KEYSTORE_PATH_PREFERENCE.to_string(),
            "keys/release .jks ".to_string(),
        );
        prefs.insert(KEYSTORE_ALIAS_PREFERENCE.to_string(), " upload".to_string());

        let config = signing_config_from_preferences(&prefs, Path::new("/p"));
        assert_eq!(
            config.keystore_path,
            Some(Path::new("/p").join("keys/release .jks "))
        );
        assert_eq!(config.alias.as_deref(), Some(" upload"));
    }

    #[test]
    fn test_missing_descriptor_is_unreadable() {
        let temp_dir = TempDir::new().unwrap();
        let err = load_signing_config(&XmlPreferenceReader, temp_dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Unreadable { .. }));
    }

    #[test]
    fn test_malformed_descriptor_is_parse_failure() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join(DESCRIPTOR_FILE), "<widget><platform>").unwrap();

        let err = load_signing_config(&XmlPreferenceReader, temp_dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseFailure { .. }));
    }
}
