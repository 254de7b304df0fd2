//! Host hook context ingestion.
//!
//! Build hosts describe the current run as a JSON document:
//!
//! ```json
//! {
//!   "opts": {
//!     "platforms": ["android"],
//!     "projectRoot": "/work/app",
//!     "options": { "release": true, "sign": true, "bundle": false }
//!   }
//! }
//! ```
//!
//! Flags are loosely typed by hosts, so booleans, numbers and the usual
//! textual spellings (`"true"`, `"1"`, `"yes"`, ...) are all accepted.
//! Missing fields default to empty / `false`.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use std::path::{Path, PathBuf};

use crate::types::InvocationContext;

/// Top-level hook context document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HookContext {
    #[serde(default)]
    pub opts: HookOptions,
}

/// The `opts` object of a hook context.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HookOptions {
    #[serde(default)]
    pub platforms: Vec<String>,
    #[serde(default)]
    pub project_root: Option<PathBuf>,
    #[serde(default)]
    pub options: HookFlags,
}

/// Build flags passed by the host.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
pub struct HookFlags {
    #[serde(default, deserialize_with = "boolish")]
    pub release: bool,
    #[serde(default, deserialize_with = "boolish")]
    pub sign: bool,
    #[serde(default, deserialize_with = "boolish")]
    pub bundle: bool,
}

impl HookContext {
    /// Parses a hook context from JSON text.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Converts the host document into an [`InvocationContext`].
    ///
    /// `fallback_root` is used when the document carries no `projectRoot`.
    pub fn into_invocation(self, fallback_root: &Path) -> InvocationContext {
        let opts = self.opts;
        InvocationContext {
            platforms: opts
                .platforms
                .into_iter()
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect(),
            release: opts.options.release,
            sign: opts.options.sign,
            bundle: opts.options.bundle,
            project_root: opts
                .project_root
                .unwrap_or_else(|| fallback_root.to_path_buf()),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Boolish {
    Bool(bool),
    Number(f64),
    Text(String),
}

fn boolish<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Boolish>::deserialize(deserializer)? {
        None => Ok(false),
        Some(Boolish::Bool(value)) => Ok(value),
        Some(Boolish::Number(value)) => Ok(value != 0.0),
        Some(Boolish::Text(text)) => match text.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "" | "false" | "0" | "no" | "off" => Ok(false),
            other => Err(D::Error::custom(format!(
                "expected a boolean flag, found {:?}",
                other
            ))),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_context() {
        let json = r#"{
            "opts": {
                "platforms": ["android", "ios"],
                "projectRoot": "/work/app",
                "options": { "release": true, "sign": true, "bundle": false }
            }
        }"#;

        let ctx = HookContext::from_json(json)
            .unwrap()
            .into_invocation(Path::new("/fallback"));

        assert!(ctx.targets_android());
        assert!(ctx.platforms.contains("ios"));
        assert!(ctx.release);
        assert!(ctx.sign);
        assert!(!ctx.bundle);
        assert_eq!(ctx.project_root, PathBuf::from("/work/app"));
    }

    #[test]
    fn test_boolish_flags() {
        let json = r#"{"opts": {"options": {"release": "true", "sign": 1, "bundle": null}}}"#;
        let flags = HookContext::from_json(json).unwrap().opts.options;
        assert_eq!(
            flags,
            HookFlags {
                release: true,
                sign: true,
                bundle: false
            }
        );

        let json = r#"{"opts": {"options": {"release": "no", "sign": 0}}}"#;
        let flags = HookContext::from_json(json).unwrap().opts.options;
        assert!(!flags.release);
        assert!(!flags.sign);
    }

    #[test]
    fn test_rejects_unknown_flag_text() {
        let json = r#"{"opts": {"options": {"release": "maybe"}}}"#;
        assert!(HookContext::from_json(json).is_err());
    }

    #[test]
    fn test_missing_fields_default() {
        let ctx = HookContext::from_json("{}")
            .unwrap()
            .into_invocation(Path::new("/fallback"));
        assert!(ctx.platforms.is_empty());
        assert!(!ctx.release);
        assert_eq!(ctx.project_root, PathBuf::from("/fallback"));
    }
}
