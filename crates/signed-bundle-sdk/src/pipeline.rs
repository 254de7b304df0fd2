//! Release pipeline
//!
//! Sequences the stages of a single hook run:
//!
//! ```text
//! gate -> descriptor -> artifact -> [sign] -> report
//! ```
//!
//! Every run ends in one of three states: skipped (the gate said no),
//! reported (the summary line was printed), or failed at a given stage.
//! Expected failures are logged and returned, never panicked on.

use std::fmt;

use crate::builders::android::{AndroidArtifactBuilder, DEFAULT_BUNDLE_TASK, default_gradle_command};
use crate::descriptor::{PreferenceReader, load_signing_config};
use crate::gate::should_run;
use crate::process::ProcessRunner;
use crate::report::report;
use crate::signer::{JarSigner, SigningOptions};
use crate::types::{ArtifactResult, HookError, InvocationContext, SigningConfig};

/// Pipeline stage a failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Artifact,
    Sign,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Artifact => write!(f, "artifact"),
            Stage::Sign => write!(f, "sign"),
        }
    }
}

/// Terminal state of a run.
#[derive(Debug)]
pub enum PipelineOutcome {
    /// The gate rejected the run; nothing was touched.
    Skipped,
    /// The artifact was produced (and signed if requested) and reported.
    Reported(ArtifactResult),
    /// A stage failed. `artifact` is set if production had already succeeded.
    Failed {
        stage: Stage,
        error: HookError,
        artifact: Option<ArtifactResult>,
    },
}

impl PipelineOutcome {
    /// Returns `false` only for [`PipelineOutcome::Failed`].
    pub fn is_success(&self) -> bool {
        !matches!(self, PipelineOutcome::Failed { .. })
    }
}

/// Runs the release pipeline with injected descriptor and process seams.
///
/// # Example
///
/// ```ignore
/// use signed_bundle_sdk::{InvocationContext, ReleasePipeline};
/// use signed_bundle_sdk::descriptor::XmlPreferenceReader;
/// use signed_bundle_sdk::process::SystemProcessRunner;
///
/// let ctx = InvocationContext::new("/work/app")
///     .platform("android")
///     .release(true)
///     .bundle(true)
///     .sign(true);
///
/// let runner = SystemProcessRunner::new();
/// let outcome = ReleasePipeline::new(&XmlPreferenceReader, &runner).run(&ctx);
/// assert!(outcome.is_success());
/// ```
pub struct ReleasePipeline<'a> {
    preferences: &'a dyn PreferenceReader,
    runner: &'a dyn ProcessRunner,
    gradle: String,
    bundle_task: String,
    signing: SigningOptions,
    dry_run: bool,
}

impl<'a> ReleasePipeline<'a> {
    /// Creates a pipeline with default tool settings
    pub fn new(preferences: &'a dyn PreferenceReader, runner: &'a dyn ProcessRunner) -> Self {
        Self {
            preferences,
            runner,
            gradle: default_gradle_command().to_string(),
            bundle_task: DEFAULT_BUNDLE_TASK.to_string(),
            signing: SigningOptions::default(),
            dry_run: false,
        }
    }

    /// Sets the Gradle wrapper command
    pub fn gradle(mut self, gradle: impl Into<String>) -> Self {
        self.gradle = gradle.into();
        self
    }

    /// Sets the Gradle task that builds the bundle
    pub fn bundle_task(mut self, task: impl Into<String>) -> Self {
        self.bundle_task = task.into();
        self
    }

    /// Sets the signing tool options
    pub fn signing(mut self, signing: SigningOptions) -> Self {
        self.signing = signing;
        self
    }

    /// Skips file copies; pair with a dry-run process runner
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Runs every stage for `ctx`
    pub fn run(&self, ctx: &InvocationContext) -> PipelineOutcome {
        if !should_run(ctx) {
            log::debug!(
                "Nothing to do (android: {}, release: {}, sign: {}, bundle: {})",
                ctx.targets_android(),
                ctx.release,
                ctx.sign,
                ctx.bundle
            );
            return PipelineOutcome::Skipped;
        }

        let signing_config = self.read_signing_config(ctx);

        let builder = AndroidArtifactBuilder::new(&ctx.project_root)
            .gradle(&self.gradle)
            .task(&self.bundle_task)
            .dry_run(self.dry_run);
        let mut artifact = match builder.produce(ctx.artifact_kind(), self.runner) {
            Ok(artifact) => artifact,
            Err(e) => return fail(Stage::Artifact, e.into(), None),
        };

        if ctx.sign {
            let signer = JarSigner::new(self.signing.clone());
            if let Err(e) = signer.sign(
                &mut artifact,
                &signing_config,
                &ctx.project_root,
                self.runner,
            ) {
                return fail(Stage::Sign, e.into(), Some(artifact));
            }
        }

        report(&artifact);
        PipelineOutcome::Reported(artifact)
    }

    /// Reads the descriptor. A broken descriptor does not stop the run; it
    /// leaves the keystore unresolved so signing refuses later.
    fn read_signing_config(&self, ctx: &InvocationContext) -> SigningConfig {
        match load_signing_config(self.preferences, &ctx.project_root) {
            Ok(config) => config,
            Err(e) if ctx.sign => {
                log::error!("Error reading config.xml while creating signed bundle: {}", e);
                SigningConfig::default()
            }
            Err(e) => {
                log::warn!("Ignoring unreadable config.xml: {}", e);
                SigningConfig::default()
            }
        }
    }
}

fn fail(stage: Stage, error: HookError, artifact: Option<ArtifactResult>) -> PipelineOutcome {
    log::error!("{} stage failed: {}", stage, error);
    PipelineOutcome::Failed {
        stage,
        error,
        artifact,
    }
}
