//! Core types for signed-bundle-sdk.
//!
//! This module defines the values that flow through the release pipeline:
//!
//! - [`InvocationContext`] - Inputs supplied by the build host
//! - [`SigningConfig`] - Keystore settings read from `config.xml`
//! - [`ArtifactKind`] / [`ArtifactResult`] - The produced release artifact
//! - [`ExitOutcome`] - How an external tool terminated
//! - [`ConfigError`], [`BuildError`], [`SignError`], [`HookError`] - Stage errors

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Name of the platform this hook acts on.
pub const ANDROID_PLATFORM: &str = "android";

/// Inputs the build host hands to the hook for a single run.
///
/// Constructed once at the start of a run and read-only afterwards.
///
/// # Example
///
/// ```
/// use signed_bundle_sdk::InvocationContext;
///
/// let ctx = InvocationContext::new("/work/app")
///     .platform("android")
///     .release(true)
///     .sign(true);
/// assert!(ctx.targets_android());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvocationContext {
    /// Platforms targeted by the current build (e.g. `android`, `ios`).
    pub platforms: BTreeSet<String>,
    /// Whether this is a release build.
    pub release: bool,
    /// Whether the artifact should be signed with a keystore.
    pub sign: bool,
    /// Whether an Android App Bundle should be built instead of using the APK.
    pub bundle: bool,
    /// Absolute path of the project root.
    pub project_root: PathBuf,
}

impl InvocationContext {
    /// Creates an empty context for the given project root.
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            ..Self::default()
        }
    }

    /// Adds a target platform.
    pub fn platform(mut self, platform: impl Into<String>) -> Self {
        self.platforms.insert(platform.into());
        self
    }

    /// Sets the release flag.
    pub fn release(mut self, release: bool) -> Self {
        self.release = release;
        self
    }

    /// Sets the sign flag.
    pub fn sign(mut self, sign: bool) -> Self {
        self.sign = sign;
        self
    }

    /// Sets the bundle flag.
    pub fn bundle(mut self, bundle: bool) -> Self {
        self.bundle = bundle;
        self
    }

    /// Returns `true` if `android` is among the targeted platforms.
    pub fn targets_android(&self) -> bool {
        self.platforms.contains(ANDROID_PLATFORM)
    }

    /// Kind of artifact this context asks for.
    pub fn artifact_kind(&self) -> ArtifactKind {
        if self.bundle {
            ArtifactKind::Aab
        } else {
            ArtifactKind::Apk
        }
    }
}

/// Signing settings derived from the project descriptor.
///
/// `keystore_path` is `None` when the descriptor does not configure it (or
/// could not be read). The signer treats that as a hard error.
///
/// Paths are resolved once, when the descriptor is loaded. The signer passes
/// `keystore_path` through as given and runs in the project root, so a
/// hand-built relative path still resolves against it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SigningConfig {
    /// Keystore location. Absolute when read with `load_signing_config`.
    pub keystore_path: Option<PathBuf>,
    /// Key alias passed to the signer as a trailing argument.
    pub alias: Option<String>,
}

/// Release artifact format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// Android application package.
    Apk,
    /// Android App Bundle.
    Aab,
}

impl ArtifactKind {
    /// Returns the short string representation (`"apk"` or `"aab"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Apk => "apk",
            ArtifactKind::Aab => "aab",
        }
    }

    /// Human readable label used in the final report.
    pub fn label(&self) -> &'static str {
        match self {
            ArtifactKind::Apk => "apk",
            ArtifactKind::Aab => "aab bundle",
        }
    }
}

/// Artifact produced by the pipeline.
///
/// Created unsigned by the producer; the signer flips `signed` once the
/// signing tool succeeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactResult {
    /// Absolute path of the artifact.
    pub path: PathBuf,
    /// Artifact format.
    pub kind: ArtifactKind,
    /// Whether the artifact has been signed.
    pub signed: bool,
}

impl ArtifactResult {
    /// Creates an unsigned artifact result.
    pub fn unsigned(path: impl Into<PathBuf>, kind: ArtifactKind) -> Self {
        Self {
            path: path.into(),
            kind,
            signed: false,
        }
    }
}

/// How an external tool invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitOutcome {
    /// The process exited with the given status code.
    Exited(i32),
    /// The process was terminated by a signal and has no exit code.
    Signaled,
    /// The process was killed after exceeding the configured timeout.
    TimedOut(Duration),
}

impl ExitOutcome {
    /// Returns `true` for a zero exit status.
    pub fn success(&self) -> bool {
        matches!(self, ExitOutcome::Exited(0))
    }

    /// Exit code, if the process exited normally.
    pub fn code(&self) -> Option<i32> {
        match self {
            ExitOutcome::Exited(code) => Some(*code),
            _ => None,
        }
    }
}

impl fmt::Display for ExitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitOutcome::Exited(code) => write!(f, "exit code {}", code),
            ExitOutcome::Signaled => write!(f, "terminated by signal"),
            ExitOutcome::TimedOut(limit) => write!(f, "timed out after {}s", limit.as_secs()),
        }
    }
}

/// Errors raised while reading the project descriptor.
///
/// These never stop artifact production; they only matter when signing
/// needs the keystore preference.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The descriptor file could not be read.
    #[error("failed to read {}: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The descriptor is not well-formed XML.
    #[error("failed to parse {}: {message}", .path.display())]
    ParseFailure { path: PathBuf, message: String },
}

/// Errors raised while producing the release artifact.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// The bundle tool could not be started at all.
    #[error("failed to run {program}: {source}. Check that the Android platform has been added and the Gradle wrapper exists")]
    BundleToolUnavailable {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The bundle tool ran but did not succeed.
    #[error("bundle build failed ({outcome})")]
    BundleBuildFailed { outcome: ExitOutcome },

    /// The unsigned APK could not be copied.
    #[error("failed to copy {} to {}: {source}", .from.display(), .to.display())]
    ArtifactCopyFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised while signing the artifact.
#[derive(Debug, thiserror::Error)]
pub enum SignError {
    /// Signing was requested but no keystore path is configured.
    #[error("Preference signed_bundle_keystore_path must be defined in config.xml within <platform name=\"android\"></platform> tag.")]
    MissingKeystorePreference,

    /// The signing tool could not be started at all.
    #[error("failed to run {program}: {source}. Ensure a JDK is installed and jarsigner is on PATH")]
    SignerUnavailable {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The signing tool ran but did not succeed.
    #[error("signing failed ({outcome})")]
    SigningFailed { outcome: ExitOutcome },
}

/// Any error that stops the pipeline.
///
/// Descriptor errors are not part of it: they are logged and leave the
/// keystore unresolved, which surfaces as
/// [`SignError::MissingKeystorePreference`] if signing was requested.
#[derive(Debug, thiserror::Error)]
pub enum HookError {
    #[error("build error: {0}")]
    Build(#[from] BuildError),

    #[error("sign error: {0}")]
    Sign(#[from] SignError),
}
