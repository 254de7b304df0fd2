//! # signed-bundle
//!
//! Post-build release hook for Android projects.
//!
//! ## Overview
//!
//! After `cordova build android --release` finishes, the build host runs
//! `signed-bundle run`. Depending on the host flags it:
//!
//! - **Bundles** - runs `gradlew bundleRelease` in `platforms/android` (`--bundle`)
//! - **Copies** - copies `app-release-unsigned.apk` to `app-release-signed.apk` (no `--bundle`)
//! - **Signs** - runs `jarsigner` with the keystore from `config.xml` (`--sign`)
//! - **Reports** - prints `created <signed|unsigned> <aab bundle|apk> at <path>`
//!
//! Nothing happens unless the build targets `android`, is a release build,
//! and asks for `--sign` and/or `--bundle`.
//!
//! ## Quick Start
//!
//! ```bash
//! # From hook flags
//! signed-bundle run --project-root . --platform android --release --bundle --sign
//!
//! # From a host hook context document
//! signed-bundle run --context hook-context.json
//!
//! # Preview the commands without running them
//! signed-bundle run --platform android --release --sign --dry-run
//! ```
//!
//! ## Keystore Configuration
//!
//! ```xml
//! <platform name="android">
//!     <preference name="signed_bundle_keystore_path" value="keys/release.jks" />
//!     <preference name="signed_bundle_keystore_alias" value="upload" />
//! </platform>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `run` | Produce (and sign) the release artifact |
//! | `init` | Write a starter `signed-bundle.toml` |
//! | `inspect` | Show the signing configuration read from `config.xml` |
//!
//! ## Exit Codes
//!
//! - `0` - artifact reported, or nothing to do
//! - `1` - a pipeline stage failed (details are logged)
//! - `2` - invalid invocation or configuration
//!
//! ## Modules
//!
//! - [`config`] - Configuration file support for `signed-bundle.toml`

#![cfg_attr(docsrs, feature(doc_cfg))]

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use signed_bundle_sdk::descriptor::{XmlPreferenceReader, load_signing_config};
use signed_bundle_sdk::process::{DryRunProcessRunner, ProcessRunner, SystemProcessRunner};
use signed_bundle_sdk::{HookContext, InvocationContext, ReleasePipeline};

pub mod config;

use config::{CONFIG_FILE_NAME, SignedBundleConfig};

/// Exit code for a run that failed in one of the pipeline stages.
pub const EXIT_STAGE_FAILED: i32 = 1;

/// Exit code for invalid invocations and configuration.
pub const EXIT_USAGE: i32 = 2;

/// Release hook producing signed Android App Bundles and APKs.
#[derive(Parser, Debug)]
#[command(name = "signed-bundle", author, version, about = "Android release artifact hook", long_about = None)]
pub struct Cli {
    /// Enable debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to signed-bundle.toml (default: discovered from the project root)
    #[arg(long, global = true, env = "SIGNED_BUNDLE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Produce the release artifact and sign it if requested.
    Run(RunArgs),
    /// Write a starter signed-bundle.toml into the project root.
    Init {
        #[arg(long, default_value = ".")]
        project_root: PathBuf,
        #[arg(long, help = "Overwrite an existing file")]
        force: bool,
    },
    /// Show the keystore settings read from config.xml.
    Inspect {
        #[arg(long, default_value = ".")]
        project_root: PathBuf,
    },
}

#[derive(Args, Debug, Default)]
pub struct RunArgs {
    #[arg(
        long,
        help = "Host hook context JSON file, or - for stdin",
        value_name = "FILE"
    )]
    pub context: Option<PathBuf>,
    #[arg(long, env = "SIGNED_BUNDLE_PROJECT_ROOT", help = "Project root (default: current directory)")]
    pub project_root: Option<PathBuf>,
    #[arg(
        long = "platform",
        value_delimiter = ',',
        help = "Target platform(s) of the build, e.g. android,ios"
    )]
    pub platforms: Vec<String>,
    #[arg(long, help = "The build is a release build")]
    pub release: bool,
    #[arg(long, help = "Sign the artifact with the configured keystore")]
    pub sign: bool,
    #[arg(long, help = "Build an Android App Bundle instead of using the APK")]
    pub bundle: bool,
    #[arg(long, help = "Log the commands and copies without running them")]
    pub dry_run: bool,
    #[arg(long, help = "Kill Gradle or jarsigner after this many seconds")]
    pub timeout_secs: Option<u64>,
}

/// Parses the command line and runs the selected command.
///
/// Returns the process exit code.
pub fn run() -> Result<i32> {
    load_dotenv();
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Run(args) => cmd_run(args, cli.config.as_deref()),
        Command::Init {
            project_root,
            force,
        } => cmd_init(&project_root, force),
        Command::Inspect { project_root } => cmd_inspect(&project_root),
    }
}

fn load_dotenv() {
    if let Ok(cwd) = std::env::current_dir() {
        let _ = dotenvy::from_path(cwd.join(".env.local"));
        let _ = dotenvy::from_path(cwd.join(".env"));
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .format_target(false)
        .try_init();
}

fn cmd_run(args: RunArgs, config_path: Option<&Path>) -> Result<i32> {
    let ctx = resolve_context(&args)?;
    let config = SignedBundleConfig::resolve(config_path, &ctx.project_root)?;
    let timeout = args
        .timeout_secs
        .map(Duration::from_secs)
        .or_else(|| config.timeout());

    let runner: Box<dyn ProcessRunner> = if args.dry_run {
        Box::new(DryRunProcessRunner)
    } else {
        Box::new(SystemProcessRunner::new().timeout(timeout))
    };

    let outcome = ReleasePipeline::new(&XmlPreferenceReader, runner.as_ref())
        .gradle(config.gradle())
        .bundle_task(&config.bundle.task)
        .signing(config.signing_options())
        .dry_run(args.dry_run)
        .run(&ctx);

    Ok(if outcome.is_success() {
        0
    } else {
        EXIT_STAGE_FAILED
    })
}

/// Builds the invocation context from an optional hook context document
/// and the command line flags. Flags are OR-ed onto the document values and
/// an explicit `--project-root` wins.
pub fn resolve_context(args: &RunArgs) -> Result<InvocationContext> {
    let cwd = std::env::current_dir().context("resolving current directory")?;

    let mut ctx = match &args.context {
        Some(path) => {
            let json = read_context_document(path)?;
            HookContext::from_json(&json)
                .with_context(|| format!("parsing hook context {:?}", path))?
                .into_invocation(&cwd)
        }
        None => InvocationContext::new(&cwd),
    };

    if let Some(root) = &args.project_root {
        ctx.project_root = root.clone();
    }
    ctx.project_root = absolute_path(&cwd, &ctx.project_root);

    ctx.platforms.extend(
        args.platforms
            .iter()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty()),
    );
    ctx.release |= args.release;
    ctx.sign |= args.sign;
    ctx.bundle |= args.bundle;

    Ok(ctx)
}

fn read_context_document(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut json = String::new();
        std::io::stdin()
            .read_to_string(&mut json)
            .context("reading hook context from stdin")?;
        return Ok(json);
    }
    fs::read_to_string(path).with_context(|| format!("reading hook context {:?}", path))
}

fn absolute_path(cwd: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}

fn cmd_init(project_root: &Path, force: bool) -> Result<i32> {
    let path = project_root.join(CONFIG_FILE_NAME);
    if path.exists() && !force {
        bail!("refusing to overwrite existing file: {:?}", path);
    }
    fs::write(&path, SignedBundleConfig::generate_starter_toml())
        .with_context(|| format!("writing file {:?}", path))?;
    println!("Wrote {}", path.display());
    Ok(0)
}

fn cmd_inspect(project_root: &Path) -> Result<i32> {
    let config = load_signing_config(&XmlPreferenceReader, project_root)
        .context("reading config.xml")?;

    match &config.keystore_path {
        Some(path) => println!("keystore: {}", path.display()),
        None => println!("keystore: (not configured)"),
    }
    match &config.alias {
        Some(alias) => println!("alias:    {}", alias),
        None => println!("alias:    (none)"),
    }

    Ok(if config.keystore_path.is_some() {
        0
    } else {
        EXIT_STAGE_FAILED
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_run_flags() {
        let cli = Cli::try_parse_from([
            "signed-bundle",
            "run",
            "--project-root",
            "/work/app",
            "--platform",
            "android,ios",
            "--release",
            "--sign",
        ])
        .unwrap();

        let Command::Run(args) = cli.command else {
            panic!("expected run command");
        };
        assert_eq!(args.platforms, vec!["android", "ios"]);
        assert!(args.release);
        assert!(args.sign);
        assert!(!args.bundle);
        assert!(!args.dry_run);
    }

    #[test]
    fn test_flags_build_context() {
        let temp_dir = TempDir::new().unwrap();
        let args = RunArgs {
            project_root: Some(temp_dir.path().to_path_buf()),
            platforms: vec!["android".to_string()],
            release: true,
            bundle: true,
            ..RunArgs::default()
        };

        let ctx = resolve_context(&args).unwrap();
        assert!(ctx.targets_android());
        assert!(ctx.release);
        assert!(ctx.bundle);
        assert!(!ctx.sign);
        assert_eq!(ctx.project_root, temp_dir.path());
    }

    #[test]
    fn test_context_document_merged_with_flags() {
        let temp_dir = TempDir::new().unwrap();
        let context_path = temp_dir.path().join("context.json");
        let json = format!(
            r#"{{"opts": {{"platforms": ["android"], "projectRoot": {:?}, "options": {{"release": true, "bundle": "true"}}}}}}"#,
            temp_dir.path().display().to_string()
        );
        fs::write(&context_path, json).unwrap();

        let args = RunArgs {
            context: Some(context_path),
            sign: true,
            ..RunArgs::default()
        };

        let ctx = resolve_context(&args).unwrap();
        assert!(ctx.targets_android());
        assert!(ctx.release);
        assert!(ctx.bundle);
        assert!(ctx.sign);
        assert_eq!(ctx.project_root, temp_dir.path());
    }

    #[test]
    fn test_bad_context_document() {
        let temp_dir = TempDir::new().unwrap();
        let context_path = temp_dir.path().join("context.json");
        fs::write(&context_path, "{ not json").unwrap();

        let args = RunArgs {
            context: Some(context_path),
            ..RunArgs::default()
        };
        assert!(resolve_context(&args).is_err());
    }

    #[test]
    fn test_gated_run_succeeds_without_work() {
        let temp_dir = TempDir::new().unwrap();
        let args = RunArgs {
            project_root: Some(temp_dir.path().to_path_buf()),
            platforms: vec!["ios".to_string()],
            release: true,
            sign: true,
            ..RunArgs::default()
        };

        assert_eq!(cmd_run(args, None).unwrap(), 0);
    }

    #[test]
    fn test_dry_run_bundle() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::create_dir(temp_dir.path().join(".git")).unwrap();
        let args = RunArgs {
            project_root: Some(temp_dir.path().to_path_buf()),
            platforms: vec!["android".to_string()],
            release: true,
            bundle: true,
            dry_run: true,
            ..RunArgs::default()
        };

        assert_eq!(cmd_run(args, None).unwrap(), 0);
    }

    #[test]
    fn test_missing_keystore_fails_run() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::create_dir(temp_dir.path().join(".git")).unwrap();
        fs::write(
            temp_dir.path().join("config.xml"),
            r#"<widget><platform name="android"/></widget>"#,
        )
        .unwrap();
        let args = RunArgs {
            project_root: Some(temp_dir.path().to_path_buf()),
            platforms: vec!["android".to_string()],
            release: true,
            bundle: true,
            sign: true,
            dry_run: true,
            ..RunArgs::default()
        };

        assert_eq!(cmd_run(args, None).unwrap(), EXIT_STAGE_FAILED);
    }

    #[test]
    fn test_init_refuses_overwrite() {
        let temp_dir = TempDir::new().unwrap();
        assert_eq!(cmd_init(temp_dir.path(), false).unwrap(), 0);
        assert!(temp_dir.path().join(CONFIG_FILE_NAME).is_file());
        assert!(cmd_init(temp_dir.path(), false).is_err());
        assert_eq!(cmd_init(temp_dir.path(), true).unwrap(), 0);
    }

    #[test]
    fn test_inspect_reports_keystore() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join("config.xml"),
            r#"<widget><platform name="android">
                <preference name="signed_bundle_keystore_path" value="keys/release.jks"/>
            </platform></widget>"#,
        )
        .unwrap();

        assert_eq!(cmd_inspect(temp_dir.path()).unwrap(), 0);
    }
}
