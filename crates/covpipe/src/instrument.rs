//! Build targets and instrumentation settings
//!
//! Instrumentation is described by a value, never by ambient environment
//! variables: [`InstrumentationConfig::env`] renders the exact environment
//! the build command receives.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Kind of test artifact a target produces
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ArtifactKind {
    /// The library's unit-test binary (`cargo test --lib`)
    LibTest,
    /// One integration-test binary (`cargo test --test <name>`)
    IntegrationTest {
        /// Name of the file under `tests/`, without extension
        test: String,
    },
}

impl ArtifactKind {
    /// Cargo target selector arguments
    #[must_use]
    pub fn cargo_selector(&self) -> Vec<String> {
        match self {
            Self::LibTest => vec!["--lib".to_string()],
            Self::IntegrationTest { test } => vec!["--test".to_string(), test.clone()],
        }
    }

    /// Whether a cargo artifact with target kind `kind` and name `name`
    /// belongs to this selector
    #[must_use]
    pub fn matches(&self, kind: &[String], name: &str) -> bool {
        match self {
            Self::LibTest => kind
                .iter()
                .any(|k| matches!(k.as_str(), "lib" | "rlib" | "cdylib" | "dylib" | "staticlib" | "proc-macro")),
            Self::IntegrationTest { test } => kind.iter().any(|k| k == "test") && name == test,
        }
    }
}

/// A compilable unit whose coverage is captured on its own
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildTarget {
    /// Target name, also the stem of its `<name>.info` record
    pub name: String,
    /// Artifact kind
    #[serde(flatten)]
    pub kind: ArtifactKind,
    /// Package to build (`-p`), workspace default when `None`
    #[serde(default)]
    pub package: Option<String>,
    /// Features to enable
    #[serde(default)]
    pub features: Vec<String>,
    /// Enable all features
    #[serde(default)]
    pub all_features: bool,
    /// Build with the release profile
    #[serde(default)]
    pub release: bool,
}

impl BuildTarget {
    /// Unit-test target named `unit`
    #[must_use]
    pub fn unit() -> Self {
        Self::new("unit", ArtifactKind::LibTest)
    }

    /// Integration-test target for `tests/<test>.rs`
    #[must_use]
    pub fn integration(test: impl Into<String>) -> Self {
        Self::new(
            "integration",
            ArtifactKind::IntegrationTest { test: test.into() },
        )
    }

    /// Create a target
    #[must_use]
    pub fn new(name: impl Into<String>, kind: ArtifactKind) -> Self {
        Self {
            name: name.into(),
            kind,
            package: None,
            features: Vec::new(),
            all_features: false,
            release: false,
        }
    }

    /// Set the package
    #[must_use]
    pub fn with_package(mut self, package: impl Into<String>) -> Self {
        self.package = Some(package.into());
        self
    }

    /// Add features
    #[must_use]
    pub fn with_features<I, S>(mut self, features: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.features.extend(features.into_iter().map(Into::into));
        self
    }

    /// Use the release profile
    #[must_use]
    pub const fn with_release(mut self, release: bool) -> Self {
        self.release = release;
        self
    }

    /// File name of this target's coverage record
    #[must_use]
    pub fn record_file_name(&self) -> String {
        format!("{}.info", self.name)
    }

    /// Full `cargo test --no-run` argument list, excluding the program
    #[must_use]
    pub fn cargo_args(&self) -> Vec<String> {
        let mut args = vec![
            "test".to_string(),
            "--no-run".to_string(),
            "--message-format=json".to_string(),
        ];
        args.extend(self.kind.cargo_selector());
        if let Some(ref package) = self.package {
            args.push("--package".to_string());
            args.push(package.clone());
        }
        if self.all_features {
            args.push("--all-features".to_string());
        } else if !self.features.is_empty() {
            args.push("--features".to_string());
            args.push(self.features.join(","));
        }
        if self.release {
            args.push("--release".to_string());
        }
        args
    }
}

impl fmt::Display for BuildTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ArtifactKind::LibTest => write!(f, "{} (lib tests)", self.name),
            ArtifactKind::IntegrationTest { test } => write!(f, "{} (tests/{test}.rs)", self.name),
        }
    }
}

/// A target after a successful instrumented build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltTarget {
    /// The target that was built
    pub target: BuildTarget,
    /// Executable test artifacts, in the order cargo reported them
    pub artifacts: Vec<PathBuf>,
}

/// Compiler settings that make counters trustworthy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstrumentationConfig {
    /// Optimization level; 0 keeps line attribution accurate
    pub opt_level: u8,
    /// Codegen units; 1 maps counter files 1:1 to compile units
    pub codegen_units: u32,
    /// Incremental compilation; stale incremental state corrupts counters
    pub incremental: bool,
    /// Abort on panic so no unwinding path is double counted or unreachable
    pub panic_abort: bool,
    /// Link the counter-emission runtime (`-Zprofile`)
    pub profiler_runtime: bool,
    /// Additional flags appended to `RUSTFLAGS`
    pub extra_rustflags: Vec<String>,
}

impl Default for InstrumentationConfig {
    fn default() -> Self {
        Self {
            opt_level: 0,
            codegen_units: 1,
            incremental: false,
            panic_abort: true,
            profiler_runtime: true,
            extra_rustflags: Vec::new(),
        }
    }
}

impl InstrumentationConfig {
    /// Create the default instrumentation
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the optimization level
    #[must_use]
    pub const fn with_opt_level(mut self, level: u8) -> Self {
        self.opt_level = level;
        self
    }

    /// Enable or disable panic=abort
    #[must_use]
    pub const fn with_panic_abort(mut self, enabled: bool) -> Self {
        self.panic_abort = enabled;
        self
    }

    /// Append an extra rustc flag
    #[must_use]
    pub fn with_rustflag(mut self, flag: impl Into<String>) -> Self {
        self.extra_rustflags.push(flag.into());
        self
    }

    /// Flags for `rustc` when compiling crates
    #[must_use]
    pub fn rustflags(&self) -> Vec<String> {
        let mut flags = Vec::new();
        if self.profiler_runtime {
            flags.push("-Zprofile".to_string());
        }
        flags.push(format!("-Ccodegen-units={}", self.codegen_units));
        flags.push(format!("-Copt-level={}", self.opt_level));
        flags.push("-Clink-dead-code".to_string());
        flags.push("-Coverflow-checks=off".to_string());
        if self.panic_abort {
            flags.push("-Zpanic_abort_tests".to_string());
            flags.push("-Cpanic=abort".to_string());
        }
        flags.extend(self.extra_rustflags.iter().cloned());
        flags
    }

    /// Flags for `rustdoc`; doctests cannot use the panic=abort test harness
    #[must_use]
    pub fn rustdocflags(&self) -> Vec<String> {
        self.rustflags()
            .into_iter()
            .filter(|f| f != "-Zpanic_abort_tests" && f != "-Cpanic=abort")
            .collect()
    }

    /// Environment handed to the build command
    #[must_use]
    pub fn env(&self) -> Vec<(String, String)> {
        vec![
            (
                "CARGO_INCREMENTAL".to_string(),
                if self.incremental { "1" } else { "0" }.to_string(),
            ),
            ("RUSTFLAGS".to_string(), self.rustflags().join(" ")),
            ("RUSTDOCFLAGS".to_string(), self.rustdocflags().join(" ")),
        ]
    }
}
