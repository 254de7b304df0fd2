//! Android release artifact production
//!
//! This module turns a finished `cordova build android --release` tree into
//! the artifact the hook hands to the signer: either an App Bundle built with
//! the Gradle wrapper, or a copy of the unsigned release APK.

use std::path::{Component, Path, PathBuf};

use crate::process::{ProcessInvocation, ProcessRunner};
use crate::types::{ArtifactKind, ArtifactResult, BuildError};

/// Android platform subtree, relative to the project root.
pub const ANDROID_PLATFORM_DIR: &str = "platforms/android";

/// Unsigned release APK written by the platform build, relative to the project root.
pub const UNSIGNED_APK_PATH: &str =
    "platforms/android/app/build/outputs/apk/release/app-release-unsigned.apk";

/// Release bundle written by `bundleRelease`, relative to the project root.
pub const RELEASE_BUNDLE_PATH: &str =
    "platforms/android/app/build/outputs/bundle/release/app-release.aab";

/// Gradle task that builds the release bundle.
pub const DEFAULT_BUNDLE_TASK: &str = "bundleRelease";

/// Gradle wrapper for the host OS.
pub fn default_gradle_command() -> &'static str {
    if cfg!(target_os = "windows") {
        "gradlew.bat"
    } else {
        "./gradlew"
    }
}

/// Joins a `/`-separated relative path onto `root` component by component.
pub fn project_path(root: &Path, relative: &str) -> PathBuf {
    relative
        .split('/')
        .fold(root.to_path_buf(), |path, part| path.join(part))
}

/// Produces the release artifact for a project
pub struct AndroidArtifactBuilder {
    /// Root directory of the project
    project_root: PathBuf,
    /// Gradle wrapper command
    gradle: String,
    /// Gradle task building the bundle
    task: String,
    /// Log file operations instead of performing them
    dry_run: bool,
}

impl AndroidArtifactBuilder {
    /// Creates a new builder
    ///
    /// # Arguments
    ///
    /// * `project_root` - Root directory containing `config.xml` and `platforms/`
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            gradle: default_gradle_command().to_string(),
            task: DEFAULT_BUNDLE_TASK.to_string(),
            dry_run: false,
        }
    }

    /// Overrides the Gradle wrapper command
    pub fn gradle(mut self, gradle: impl Into<String>) -> Self {
        self.gradle = gradle.into();
        self
    }

    /// Overrides the Gradle task used for the bundle
    pub fn task(mut self, task: impl Into<String>) -> Self {
        self.task = task.into();
        self
    }

    /// Skips the APK copy (the runner decides what happens to subprocesses)
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Android platform directory, the working directory of the bundle build
    pub fn platform_dir(&self) -> PathBuf {
        project_path(&self.project_root, ANDROID_PLATFORM_DIR)
    }

    /// Program used for the bundle build
    ///
    /// Child processes do not search their working directory for the
    /// program (Windows does not search the parent's either), so the Gradle
    /// wrapper and other relative commands are joined onto the platform
    /// directory. Bare names other than the wrapper (e.g. `gradle`) are left
    /// for `PATH` lookup.
    pub fn gradle_program(&self) -> String {
        let command = Path::new(&self.gradle);
        let has_separator = command.components().count() > 1;
        let is_wrapper = command
            .file_stem()
            .is_some_and(|stem| stem == "gradlew");

        if command.is_absolute() || !(has_separator || is_wrapper) {
            return self.gradle.clone();
        }

        command
            .components()
            .filter(|c| !matches!(c, Component::CurDir))
            .fold(self.platform_dir(), |path, c| path.join(c))
            .to_string_lossy()
            .into_owned()
    }

    /// Produces an artifact of the requested kind
    ///
    /// # Returns
    ///
    /// * `Ok(ArtifactResult)` - unsigned artifact at its absolute path
    /// * `Err(BuildError)` - if the bundle build or the APK copy fails
    pub fn produce(
        &self,
        kind: ArtifactKind,
        runner: &dyn ProcessRunner,
    ) -> Result<ArtifactResult, BuildError> {
        let path = match kind {
            ArtifactKind::Aab => self.build_bundle(runner)?,
            ArtifactKind::Apk => self.copy_unsigned_apk()?,
        };
        Ok(ArtifactResult::unsigned(path, kind))
    }

    /// Runs the Gradle bundle task in the Android platform directory
    ///
    /// Success is judged by the exit status only; the bundle file itself is
    /// not checked.
    fn build_bundle(&self, runner: &dyn ProcessRunner) -> Result<PathBuf, BuildError> {
        let program = self.gradle_program();
        let invocation =
            ProcessInvocation::new(&program, self.platform_dir()).arg(&self.task);

        log::info!("Building Android App Bundle with `{}`...", invocation);
        let outcome =
            runner
                .run(&invocation)
                .map_err(|source| BuildError::BundleToolUnavailable {
                    program: program.clone(),
                    source,
                })?;

        if !outcome.success() {
            return Err(BuildError::BundleBuildFailed { outcome });
        }

        Ok(project_path(&self.project_root, RELEASE_BUNDLE_PATH))
    }

    /// Copies the unsigned release APK next to itself under its signed name
    ///
    /// The copy is made even when signing will not happen.
    fn copy_unsigned_apk(&self) -> Result<PathBuf, BuildError> {
        let unsigned = project_path(&self.project_root, UNSIGNED_APK_PATH);
        let destination = signed_copy_path(&unsigned);

        if self.dry_run {
            log::info!(
                "[dry-run] would copy {} -> {}",
                unsigned.display(),
                destination.display()
            );
            return Ok(destination);
        }

        log::info!(
            "Copying {} -> {}",
            unsigned.display(),
            destination.display()
        );
        std::fs::copy(&unsigned, &destination).map_err(|source| {
            BuildError::ArtifactCopyFailed {
                from: unsigned.clone(),
                to: destination.clone(),
                source,
            }
        })?;

        Ok(destination)
    }
}

/// Name of the signed copy of an APK, in the same directory.
///
/// A trailing `-unsigned` in the file stem becomes `-signed`
/// (`app-release-unsigned.apk` -> `app-release-signed.apk`); any other stem
/// gets `-signed` appended before the extension.
pub fn signed_copy_path(unsigned: &Path) -> PathBuf {
    let stem = unsigned
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let base = stem.strip_suffix("-unsigned").unwrap_or(&stem);

    let file_name = match unsigned.extension() {
        Some(ext) => format!("{}-signed.{}", base, ext.to_string_lossy()),
        None => format!("{}-signed", base),
    };
    unsigned.with_file_name(file_name)
}
