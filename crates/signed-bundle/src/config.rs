//! Configuration file support for signed-bundle.
//!
//! Tool settings live in an optional `signed-bundle.toml`. The file is
//! searched for starting at the project root and walking up parent
//! directories until a `.git` directory or the filesystem root is reached.
//! `--config` (or `SIGNED_BUNDLE_CONFIG`) points at a file explicitly.
//!
//! ## Example Configuration
//!
//! ```toml
//! [bundle]
//! gradle = "./gradlew"
//! task = "bundleRelease"
//!
//! [signing]
//! jarsigner = "jarsigner"
//! sigalg = "SHA256withRSA"
//! digestalg = "SHA-256"
//! tsa = "http://timestamp.digicert.com"
//!
//! [process]
//! timeout_secs = 1800
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use signed_bundle_sdk::builders::android::{DEFAULT_BUNDLE_TASK, default_gradle_command};
use signed_bundle_sdk::signer::{
    DEFAULT_DIGESTALG, DEFAULT_SIGALG, DEFAULT_SIGNER, DEFAULT_TSA_URL, SigningOptions,
};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The default configuration file name.
pub const CONFIG_FILE_NAME: &str = "signed-bundle.toml";

/// Root configuration structure for `signed-bundle.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignedBundleConfig {
    /// App Bundle build settings.
    pub bundle: BundleConfig,

    /// Signing tool settings.
    pub signing: SigningConfig,

    /// External process settings.
    pub process: ProcessConfig,
}

/// App Bundle build settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BundleConfig {
    /// Gradle wrapper command, run inside `platforms/android`.
    ///
    /// Defaults to `./gradlew` (`gradlew.bat` on Windows).
    pub gradle: Option<String>,

    /// Gradle task producing the release bundle.
    ///
    /// Defaults to `bundleRelease`.
    pub task: String,
}

impl Default for BundleConfig {
    fn default() -> Self {
        Self {
            gradle: None,
            task: DEFAULT_BUNDLE_TASK.to_string(),
        }
    }
}

/// Signing tool settings.
///
/// The algorithm defaults are SHA-1 based for compatibility with existing
/// release setups. Prefer `SHA256withRSA` / `SHA-256` where possible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SigningConfig {
    /// Signing tool command. Defaults to `jarsigner`.
    pub jarsigner: String,

    /// `-sigalg` value. Defaults to `SHA1withRSA`.
    pub sigalg: String,

    /// `-digestalg` value. Defaults to `SHA1`.
    pub digestalg: String,

    /// Timestamping authority URL. An empty string disables `-tsa`.
    pub tsa: String,
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            jarsigner: DEFAULT_SIGNER.to_string(),
            sigalg: DEFAULT_SIGALG.to_string(),
            digestalg: DEFAULT_DIGESTALG.to_string(),
            tsa: DEFAULT_TSA_URL.to_string(),
        }
    }
}

/// External process settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessConfig {
    /// Kill Gradle or jarsigner after this many seconds. Unset waits forever.
    pub timeout_secs: Option<u64>,
}

impl SignedBundleConfig {
    /// Loads configuration from the specified file path.
    ///
    /// # Returns
    ///
    /// * `Ok(SignedBundleConfig)` - Successfully loaded configuration
    /// * `Err` - If the file cannot be read or parsed
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let config: SignedBundleConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        Ok(config)
    }

    /// Attempts to find and load configuration starting from the specified directory.
    ///
    /// # Returns
    ///
    /// * `Ok(Some((config, path)))` - Found and loaded configuration with its path
    /// * `Ok(None)` - No configuration file found
    /// * `Err` - If a config file was found but couldn't be parsed
    pub fn discover_from(start_dir: &Path) -> Result<Option<(Self, PathBuf)>> {
        let mut current = start_dir.to_path_buf();

        loop {
            let config_path = current.join(CONFIG_FILE_NAME);

            if config_path.is_file() {
                let config = Self::load_from_file(&config_path)?;
                return Ok(Some((config, config_path)));
            }

            // Stop at repository root or filesystem root
            if current.join(".git").exists() || !current.pop() {
                break;
            }
        }

        Ok(None)
    }

    /// Loads `explicit` if given, otherwise searches from `project_root`.
    /// Falls back to defaults when nothing is found.
    pub fn resolve(explicit: Option<&Path>, project_root: &Path) -> Result<Self> {
        if let Some(path) = explicit {
            log::debug!("Using config file {}", path.display());
            return Self::load_from_file(path);
        }

        match Self::discover_from(project_root)? {
            Some((config, path)) => {
                log::debug!("Using config file {}", path.display());
                Ok(config)
            }
            None => Ok(Self::default()),
        }
    }

    /// Gradle wrapper command to use.
    pub fn gradle(&self) -> String {
        self.bundle
            .gradle
            .clone()
            .unwrap_or_else(|| default_gradle_command().to_string())
    }

    /// Signing tool options.
    pub fn signing_options(&self) -> SigningOptions {
        let tsa = self.signing.tsa.trim();
        SigningOptions {
            program: self.signing.jarsigner.clone(),
            sigalg: self.signing.sigalg.clone(),
            digestalg: self.signing.digestalg.clone(),
            tsa_url: (!tsa.is_empty()).then(|| tsa.to_string()),
        }
    }

    /// Process timeout, if configured.
    pub fn timeout(&self) -> Option<Duration> {
        self.process.timeout_secs.map(Duration::from_secs)
    }

    /// Generates a starter configuration file as a formatted TOML string.
    ///
    /// Every setting is commented out at its default value.
    pub fn generate_starter_toml() -> String {
        format!(
            r#"# signed-bundle configuration file
# CLI flags override these settings when provided.

[bundle]
# Gradle wrapper, run inside platforms/android (default: {gradle})
# gradle = "{gradle}"

# Gradle task producing the release bundle (default: {task})
# task = "{task}"

[signing]
# Signing tool (default: {signer})
# jarsigner = "{signer}"

# Signature and digest algorithms. The SHA-1 defaults are kept for
# compatibility only; prefer SHA256withRSA / SHA-256.
# sigalg = "{sigalg}"
# digestalg = "{digestalg}"

# Timestamping authority; set to "" to sign without a timestamp
# tsa = "{tsa}"

[process]
# Kill Gradle or jarsigner after this many seconds (default: wait forever)
# timeout_secs = 1800
"#,
            gradle = default_gradle_command(),
            task = DEFAULT_BUNDLE_TASK,
            signer = DEFAULT_SIGNER,
            sigalg = DEFAULT_SIGALG,
            digestalg = DEFAULT_DIGESTALG,
            tsa = DEFAULT_TSA_URL,
        )
    }
}
