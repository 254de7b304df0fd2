//! Artifact signing with `jarsigner`.
//!
//! The algorithm arguments default to `SHA1withRSA` / `SHA1`, which is what
//! existing release setups expect. SHA-1 signatures are weak; projects that
//! can should override them through [`SigningOptions`] (for example
//! `SHA256withRSA` / `SHA-256`). The defaults are kept for compatibility,
//! not recommended.

use std::ffi::OsString;
use std::path::Path;

use crate::process::{ProcessInvocation, ProcessRunner};
use crate::types::{ArtifactResult, SignError, SigningConfig};

pub const DEFAULT_SIGNER: &str = "jarsigner";
pub const DEFAULT_SIGALG: &str = "SHA1withRSA";
pub const DEFAULT_DIGESTALG: &str = "SHA1";
pub const DEFAULT_TSA_URL: &str = "http://timestamp.digicert.com";

/// Signing tool settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningOptions {
    /// Signing tool command.
    pub program: String,
    /// Value of `-sigalg`.
    pub sigalg: String,
    /// Value of `-digestalg`.
    pub digestalg: String,
    /// Value of `-tsa`; `None` omits timestamping.
    pub tsa_url: Option<String>,
}

impl Default for SigningOptions {
    fn default() -> Self {
        Self {
            program: DEFAULT_SIGNER.to_string(),
            sigalg: DEFAULT_SIGALG.to_string(),
            digestalg: DEFAULT_DIGESTALG.to_string(),
            tsa_url: Some(DEFAULT_TSA_URL.to_string()),
        }
    }
}

impl SigningOptions {
    /// Returns `true` if either algorithm is SHA-1 based.
    pub fn uses_sha1(&self) -> bool {
        let is_sha1 = |alg: &str| {
            let alg = alg.to_ascii_uppercase();
            alg.starts_with("SHA1") || alg == "SHA-1"
        };
        is_sha1(&self.sigalg) || is_sha1(&self.digestalg)
    }
}

/// Signs release artifacts in place.
#[derive(Debug, Clone, Default)]
pub struct JarSigner {
    options: SigningOptions,
}

impl JarSigner {
    pub fn new(options: SigningOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &SigningOptions {
        &self.options
    }

    /// Signs `result` with the configured keystore.
    ///
    /// Fails with [`SignError::MissingKeystorePreference`] before running
    /// anything if no keystore is configured. The keystore path is passed
    /// as given; the tool runs in `project_root`, so relative paths resolve
    /// there. `result.signed` is set only when the tool exits successfully.
    pub fn sign(
        &self,
        result: &mut ArtifactResult,
        config: &SigningConfig,
        project_root: &Path,
        runner: &dyn ProcessRunner,
    ) -> Result<(), SignError> {
        let keystore = config
            .keystore_path
            .as_deref()
            .ok_or(SignError::MissingKeystorePreference)?;

        if self.options.uses_sha1() {
            log::warn!(
                "Signing with SHA-1 based algorithms ({} / {}); consider overriding sigalg and digestalg",
                self.options.sigalg,
                self.options.digestalg
            );
        }

        let invocation = ProcessInvocation::new(&self.options.program, project_root).args(
            self.arguments(keystore, &result.path, config.alias.as_deref()),
        );

        log::info!("Signing {}...", result.path.display());
        let outcome = runner
            .run(&invocation)
            .map_err(|source| SignError::SignerUnavailable {
                program: self.options.program.clone(),
                source,
            })?;

        if !outcome.success() {
            return Err(SignError::SigningFailed { outcome });
        }

        result.signed = true;
        Ok(())
    }

    /// Command line arguments for signing `artifact`.
    ///
    /// The alias, when present, is the trailing positional argument.
    pub fn arguments(
        &self,
        keystore: &Path,
        artifact: &Path,
        alias: Option<&str>,
    ) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-sigalg".into(),
            self.options.sigalg.clone().into(),
        ];
        if let Some(tsa) = &self.options.tsa_url {
            args.push("-tsa".into());
            args.push(tsa.into());
        }
        args.push("-digestalg".into());
        args.push(self.options.digestalg.clone().into());
        args.push("-keystore".into());
        args.push(keystore.into());
        args.push(artifact.into());
        if let Some(alias) = alias {
            args.push(alias.into());
        }
        args
    }
}
