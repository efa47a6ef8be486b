//! Instrumented build and artifact execution
//!
//! The compiler is a black box: [`CargoToolchain`] runs
//! `cargo test --no-run --message-format=json` with the instrumentation
//! environment and reads the produced executables from cargo's JSON
//! messages. Dep-info files cargo writes next to those executables are
//! removed right away, and so are counter files left by instrumented build
//! scripts: after a build the workspace holds no counter data.

use crate::instrument::{ArtifactKind, BuildTarget, BuiltTarget, InstrumentationConfig};
use crate::result::{PipelineError, PipelineResult};
use crate::workspace::Workspace;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Exit status of an executed test artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunStatus {
    /// Exit code, `None` when terminated by a signal
    pub code: Option<i32>,
}

impl RunStatus {
    /// Successful exit
    pub const SUCCESS: Self = Self { code: Some(0) };

    /// Whether the artifact exited with status 0
    #[must_use]
    pub const fn success(self) -> bool {
        matches!(self.code, Some(0))
    }
}

impl From<std::process::ExitStatus> for RunStatus {
    fn from(status: std::process::ExitStatus) -> Self {
        Self {
            code: status.code(),
        }
    }
}

/// Builds instrumented targets and runs their artifacts
pub trait Toolchain {
    /// Compile `target` under `config`, leaving only its artifacts behind
    fn build(
        &self,
        target: &BuildTarget,
        config: &InstrumentationConfig,
        workspace: &Workspace,
    ) -> PipelineResult<BuiltTarget>;

    /// Execute one artifact to completion with the workspace root as CWD
    fn run_artifact(&self, artifact: &Path, workspace: &Workspace) -> PipelineResult<RunStatus>;
}

/// [`Toolchain`] backed by `cargo`
#[derive(Debug, Clone)]
pub struct CargoToolchain {
    cargo: PathBuf,
    test_args: Vec<String>,
}

impl Default for CargoToolchain {
    fn default() -> Self {
        Self {
            cargo: std::env::var_os("CARGO").map_or_else(|| PathBuf::from("cargo"), PathBuf::from),
            test_args: Vec::new(),
        }
    }
}

impl CargoToolchain {
    /// Use `cargo` from `$CARGO` or `PATH`
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific cargo binary
    #[must_use]
    pub fn with_cargo(mut self, cargo: impl Into<PathBuf>) -> Self {
        self.cargo = cargo.into();
        self
    }

    /// Arguments passed to every test artifact (e.g. `--test-threads=1`)
    #[must_use]
    pub fn with_test_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.test_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// The build command for `target`
    #[must_use]
    pub fn build_command(
        &self,
        target: &BuildTarget,
        config: &InstrumentationConfig,
        workspace: &Workspace,
    ) -> Command {
        let mut cmd = Command::new(&self.cargo);
        let _ = cmd
            .args(target.cargo_args())
            .current_dir(workspace.root())
            .env("CARGO_TARGET_DIR", workspace.target_dir())
            .envs(config.env());
        cmd
    }
}

impl Toolchain for CargoToolchain {
    fn build(
        &self,
        target: &BuildTarget,
        config: &InstrumentationConfig,
        workspace: &Workspace,
    ) -> PipelineResult<BuiltTarget> {
        tracing::info!(build = %target, "building instrumented target");

        let output = self
            .build_command(target, config, workspace)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| PipelineError::spawn(self.cargo.display().to_string(), e))?;

        if !output.status.success() {
            return Err(PipelineError::BuildFailure {
                target: target.name.clone(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        let artifacts = parse_artifacts(&String::from_utf8_lossy(&output.stdout), &target.kind);
        if artifacts.is_empty() {
            return Err(PipelineError::BuildFailure {
                target: target.name.clone(),
                stderr: "cargo reported no test executable for this target".to_string(),
            });
        }

        for artifact in &artifacts {
            let _ = workspace.remove_dep_info(artifact)?;
        }
        let build_counters = workspace.remove_counter_files()?;

        tracing::debug!(
            build = %target.name,
            artifacts = artifacts.len(),
            build_counters,
            "build finished"
        );
        Ok(BuiltTarget {
            target: target.clone(),
            artifacts,
        })
    }

    fn run_artifact(&self, artifact: &Path, workspace: &Workspace) -> PipelineResult<RunStatus> {
        tracing::info!(artifact = %artifact.display(), "running instrumented tests");
        let status = Command::new(artifact)
            .args(&self.test_args)
            .current_dir(workspace.root())
            .status()
            .map_err(|e| PipelineError::spawn(artifact.display().to_string(), e))?;
        Ok(status.into())
    }
}

#[derive(Debug, Deserialize)]
struct CargoMessage {
    reason: String,
    #[serde(default)]
    executable: Option<PathBuf>,
    #[serde(default)]
    profile: Option<CargoProfile>,
    #[serde(default)]
    target: Option<CargoTarget>,
}

#[derive(Debug, Deserialize)]
struct CargoProfile {
    #[serde(default)]
    test: bool,
}

#[derive(Debug, Deserialize)]
struct CargoTarget {
    name: String,
    #[serde(default)]
    kind: Vec<String>,
}

/// Test executables listed in cargo's `--message-format=json` output
///
/// Non-JSON lines and messages other than `compiler-artifact` are skipped.
#[must_use]
pub fn parse_artifacts(stdout: &str, kind: &ArtifactKind) -> Vec<PathBuf> {
    stdout
        .lines()
        .filter_map(|line| serde_json::from_str::<CargoMessage>(line).ok())
        .filter(|msg| msg.reason == "compiler-artifact")
        .filter(|msg| msg.profile.as_ref().is_some_and(|p| p.test))
        .filter(|msg| {
            msg.target
                .as_ref()
                .is_some_and(|t| kind.matches(&t.kind, &t.name))
        })
        .filter_map(|msg| msg.executable)
        .collect()
}
