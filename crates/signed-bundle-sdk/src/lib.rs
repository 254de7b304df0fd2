//! Android release artifact pipeline
//!
//! `signed-bundle-sdk` implements the post-build release hook behind the
//! `signed-bundle` executable: after an Android release build it produces the
//! requested artifact and optionally signs it.
//!
//! # Pipeline
//!
//! 1. **Gate** ([`gate::should_run`]) - only Android release builds that ask
//!    for signing or a bundle are handled; everything else is a no-op
//! 2. **Descriptor** ([`descriptor::load_signing_config`]) - reads the keystore
//!    path and alias from `config.xml`
//! 3. **Artifact** ([`builders::AndroidArtifactBuilder`]) - runs
//!    `gradlew bundleRelease`, or copies the unsigned release APK to
//!    `app-release-signed.apk`
//! 4. **Sign** ([`signer::JarSigner`]) - runs `jarsigner` on the artifact
//! 5. **Report** ([`report::report`]) - prints
//!    `created <signed|unsigned> <aab bundle|apk> at <path>`
//!
//! [`ReleasePipeline`] wires these together. Descriptor parsing and process
//! execution are injected through [`descriptor::PreferenceReader`] and
//! [`process::ProcessRunner`].
//!
//! # Example
//!
//! ```ignore
//! use signed_bundle_sdk::descriptor::XmlPreferenceReader;
//! use signed_bundle_sdk::process::SystemProcessRunner;
//! use signed_bundle_sdk::{InvocationContext, ReleasePipeline};
//!
//! let ctx = InvocationContext::new("/work/app")
//!     .platform("android")
//!     .release(true)
//!     .sign(true);
//!
//! let runner = SystemProcessRunner::new();
//! let outcome = ReleasePipeline::new(&XmlPreferenceReader, &runner).run(&ctx);
//! ```

pub mod builders;
pub mod context;
pub mod descriptor;
pub mod gate;
pub mod pipeline;
pub mod process;
pub mod report;
pub mod signer;
pub mod types;

pub use context::HookContext;
pub use pipeline::{PipelineOutcome, ReleasePipeline, Stage};
pub use signer::SigningOptions;
pub use types::{
    ArtifactKind, ArtifactResult, BuildError, ConfigError, ExitOutcome, HookError,
    InvocationContext, SignError, SigningConfig,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
