//! `dotnet publish` invocation
//!
//! # Behaviour
//!
//! - **Argument vector**: arguments go to `tokio::process::Command` as a list,
//!   never through a shell
//! - **Defaults**: `--configuration Release`, `--runtime linux-x64` and
//!   `--self-contained false` unless the user's flags already choose them
//! - **Output**: `--output` always points at the ephemeral output location
//! - **Tool-chain**: the tool-chain root is prepended to `PATH` and exported as
//!   `DOTNET_ROOT`
//! - **Diagnostics**: the child's stdout/stderr stream straight to the build log
//!
//! ```rust,no_run
//! use dotnet_publish::core::{BuildLogger, PublishInvoker};
//! use dotnet_publish::publish::DotnetPublishProcess;
//! use std::path::Path;
//!
//! # async fn run() -> Result<(), dotnet_publish::core::BuildError> {
//! let process = DotnetPublishProcess::new(BuildLogger::stdout());
//! process
//!     .execute(
//!         Path::new("/workspace"),
//!         Path::new("/layers/dotnet"),
//!         "src/app",
//!         Path::new("/tmp/out"),
//!         &[],
//!     )
//!     .await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::process::Command;

use crate::core::error::BuildError;
use crate::core::logger::BuildLogger;
use crate::core::traits::PublishInvoker;
use crate::security::redact_args;

const DEFAULT_EXECUTABLE: &str = "dotnet";
const DEFAULT_CONFIGURATION: &str = "Release";
const DEFAULT_RUNTIME: &str = "linux-x64";

/// Errors that can occur while running the publish command
#[derive(Error, Debug)]
pub enum CommandError {
    /// Working directory does not exist or is not accessible
    #[error("working directory does not exist: {}", .0.display())]
    InvalidWorkingDirectory(PathBuf),

    /// Command could not be started (binary not found, permission denied)
    #[error("command execution failed: {0}")]
    ExecutionFailed(String),

    /// Command ran and reported failure
    #[error("{}", describe_exit(.0))]
    NonZeroExit(Option<i32>),

    /// Command exceeded the caller-supplied timeout
    #[error("command timeout after {0:?}")]
    Timeout(Duration),
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit status {}", code),
        None => "terminated by signal".to_string(),
    }
}

/// Runs `dotnet publish` for one project
#[derive(Debug, Clone)]
pub struct DotnetPublishProcess {
    executable: PathBuf,
    runtime: String,
    search_path: Option<String>,
    timeout: Option<Duration>,
    logger: BuildLogger,
}

impl DotnetPublishProcess {
    pub fn new(logger: BuildLogger) -> Self {
        Self {
            executable: PathBuf::from(DEFAULT_EXECUTABLE),
            runtime: DEFAULT_RUNTIME.to_string(),
            search_path: None,
            timeout: None,
            logger,
        }
    }

    /// Use a different `dotnet` binary
    #[cfg(test)]
    pub(crate) fn with_executable(mut self, executable: impl Into<PathBuf>) -> Self {
        self.executable = executable.into();
        self
    }

    /// Runtime identifier passed to `--runtime` when the flags don't set one
    #[cfg(test)]
    pub(crate) fn with_runtime(mut self, runtime: impl Into<String>) -> Self {
        self.runtime = runtime.into();
        self
    }

    /// `PATH` the tool-chain root is prepended to
    pub fn with_search_path(mut self, search_path: Option<String>) -> Self {
        self.search_path = search_path;
        self
    }

    /// Kill the publish after `timeout`
    ///
    /// There is no timeout by default.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Argument list for `dotnet`, user flags last
    pub fn build_args(
        &self,
        working_dir: &Path,
        project_path: &str,
        output_dir: &Path,
        flags: &[String],
    ) -> Vec<String> {
        let project = if project_path.is_empty() {
            working_dir.to_path_buf()
        } else {
            working_dir.join(project_path)
        };
        let mut args = vec!["publish".to_string(), project.to_string_lossy().into_owned()];

        if !has_flag(flags, &["--configuration", "-c"]) {
            args.extend(["--configuration".to_string(), DEFAULT_CONFIGURATION.to_string()]);
        }

        if !has_flag(flags, &["--runtime", "-r"]) {
            args.extend(["--runtime".to_string(), self.runtime.clone()]);
        }

        if !has_flag(flags, &["--self-contained", "--sc", "--no-self-contained"]) {
            args.extend(["--self-contained".to_string(), "false".to_string()]);
        }

        args.extend([
            "--output".to_string(),
            output_dir.to_string_lossy().into_owned(),
        ]);
        args.extend(flags.iter().cloned());
        args
    }

    fn path_env(&self, root_dir: &Path) -> Option<String> {
        let root = root_dir.to_string_lossy();
        match (root.is_empty(), self.search_path.as_deref()) {
            (true, path) => path.map(str::to_string),
            (false, Some(path)) if !path.is_empty() => Some(format!("{}:{}", root, path)),
            (false, _) => Some(root.into_owned()),
        }
    }
}

/// `names` given either as a separate flag or in `--name=value` / `-n:value` form
fn has_flag(flags: &[String], names: &[&str]) -> bool {
    flags.iter().any(|flag| {
        names.iter().any(|name| {
            flag == name
                || flag
                    .strip_prefix(name)
                    .is_some_and(|rest| rest.starts_with('=') || rest.starts_with(':'))
        })
    })
}

#[async_trait]
impl PublishInvoker for DotnetPublishProcess {
    async fn execute(
        &self,
        working_dir: &Path,
        root_dir: &Path,
        project_path: &str,
        output_dir: &Path,
        flags: &[String],
    ) -> Result<(), BuildError> {
        if !working_dir.is_dir() {
            return Err(BuildError::PublishFailed {
                source: CommandError::InvalidWorkingDirectory(working_dir.to_path_buf()),
            });
        }

        let args = self.build_args(working_dir, project_path, output_dir, flags);

        self.logger.subprocess(format!(
            "Running '{} {}'",
            self.executable.display(),
            redact_args(&args).join(" ")
        ));

        let mut command = Command::new(&self.executable);
        command
            .args(&args)
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        if let Some(path) = self.path_env(root_dir) {
            command.env("PATH", path);
        }
        if !root_dir.as_os_str().is_empty() {
            command.env("DOTNET_ROOT", root_dir);
        }

        let started = Instant::now();
        let mut child = command.spawn().map_err(|e| BuildError::PublishFailed {
            source: CommandError::ExecutionFailed(format!(
                "{}: {}",
                self.executable.display(),
                e
            )),
        })?;

        let status = match self.timeout {
            Some(timeout) => match tokio::time::timeout(timeout, child.wait()).await {
                Ok(status) => status,
                Err(_) => {
                    if let Err(e) = child.kill().await {
                        tracing::warn!(error = %e, "failed to kill timed out publish process");
                    }
                    return Err(BuildError::PublishFailed {
                        source: CommandError::Timeout(timeout),
                    });
                }
            },
            None => child.wait().await,
        }
        .map_err(|e| BuildError::PublishFailed {
            source: CommandError::ExecutionFailed(e.to_string()),
        })?;

        let elapsed = started.elapsed();
        tracing::debug!(?status, ?elapsed, "dotnet publish finished");

        if !status.success() {
            self.logger
                .action(format!("Failed after {:.1}s", elapsed.as_secs_f64()));
            return Err(BuildError::PublishFailed {
                source: CommandError::NonZeroExit(status.code()),
            });
        }

        self.logger
            .action(format!("Completed in {:.1}s", elapsed.as_secs_f64()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::logger::SharedBuffer;
    use tempfile::TempDir;

    fn flags(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn process() -> (DotnetPublishProcess, SharedBuffer) {
        let buffer = SharedBuffer::new();
        (DotnetPublishProcess::new(BuildLogger::new(buffer.clone())), buffer)
    }

    #[test]
    fn test_default_args() {
        let (process, _) = process();

        let args = process.build_args(
            Path::new("/workspace"),
            "some/project/path",
            Path::new("/tmp/out"),
            &[],
        );

        assert_eq!(
            args,
            flags(&[
                "publish",
                "/workspace/some/project/path",
                "--configuration",
                "Release",
                "--runtime",
                "linux-x64",
                "--self-contained",
                "false",
                "--output",
                "/tmp/out",
            ])
        );
    }

    #[test]
    fn test_empty_project_path_targets_working_dir() {
        let (process, _) = process();

        let args = process.build_args(Path::new("/workspace"), "", Path::new("/tmp/out"), &[]);

        assert_eq!(args[1], "/workspace");
    }

    #[test]
    fn test_user_flags_replace_defaults() {
        let (process, _) = process();

        let args = process.build_args(
            Path::new("/workspace"),
            "",
            Path::new("/tmp/out"),
            &flags(&["-c", "Debug", "--runtime=linux-arm64", "--sc", "--verbosity", "normal"]),
        );

        assert_eq!(
            args,
            flags(&[
                "publish",
                "/workspace",
                "--output",
                "/tmp/out",
                "-c",
                "Debug",
                "--runtime=linux-arm64",
                "--sc",
                "--verbosity",
                "normal",
            ])
        );
    }

    #[test]
    fn test_custom_runtime() {
        let (process, _) = process();
        let process = process.with_runtime("linux-musl-x64");

        let args = process.build_args(Path::new("/w"), "", Path::new("/o"), &[]);

        assert!(args.windows(2).any(|w| w == ["--runtime", "linux-musl-x64"]));
    }

    #[test]
    fn test_has_flag_forms() {
        assert!(has_flag(&flags(&["--configuration"]), &["--configuration"]));
        assert!(has_flag(&flags(&["--configuration=Debug"]), &["--configuration"]));
        assert!(has_flag(&flags(&["-c:Debug"]), &["-c"]));
        assert!(!has_flag(&flags(&["--configfile"]), &["--configuration", "-c"]));
        assert!(!has_flag(&flags(&["-clp:NoSummary"]), &["-c"]));
    }

    #[test]
    fn test_path_env_prepends_root() {
        let (process, _) = process();
        let process = process.with_search_path(Some("/usr/bin:/bin".to_string()));

        assert_eq!(
            process.path_env(Path::new("/layers/dotnet")).as_deref(),
            Some("/layers/dotnet:/usr/bin:/bin")
        );
        assert_eq!(process.path_env(Path::new("")).as_deref(), Some("/usr/bin:/bin"));
    }

    #[tokio::test]
    async fn test_missing_executable_is_publish_failure() {
        let working_dir = TempDir::new().unwrap();
        let output_dir = TempDir::new().unwrap();
        let (process, _) = process();
        let process = process.with_executable("/nonexistent/dotnet-binary");

        let result = process
            .execute(working_dir.path(), Path::new(""), "", output_dir.path(), &[])
            .await;

        assert!(matches!(
            result,
            Err(BuildError::PublishFailed {
                source: CommandError::ExecutionFailed(_)
            })
        ));
    }

    #[tokio::test]
    async fn test_invalid_working_directory() {
        let output_dir = TempDir::new().unwrap();
        let (process, _) = process();

        let result = process
            .execute(
                Path::new("/nonexistent/working/dir"),
                Path::new(""),
                "",
                output_dir.path(),
                &[],
            )
            .await;

        assert!(matches!(
            result,
            Err(BuildError::PublishFailed {
                source: CommandError::InvalidWorkingDirectory(_)
            })
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_is_publish_failure() {
        let working_dir = TempDir::new().unwrap();
        let output_dir = TempDir::new().unwrap();
        let (process, buffer) = process();
        let process = process
            .with_executable("false")
            .with_search_path(std::env::var("PATH").ok());

        let result = process
            .execute(working_dir.path(), Path::new(""), "", output_dir.path(), &[])
            .await;

        assert!(matches!(
            result,
            Err(BuildError::PublishFailed {
                source: CommandError::NonZeroExit(Some(1))
            })
        ));
        assert!(buffer.contents().contains("Running 'false publish"));
        assert!(buffer.contents().contains("Failed after"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_successful_run_logs_duration() {
        let working_dir = TempDir::new().unwrap();
        let output_dir = TempDir::new().unwrap();
        let (process, buffer) = process();
        let process = process
            .with_executable("true")
            .with_search_path(std::env::var("PATH").ok());

        process
            .execute(
                working_dir.path(),
                Path::new(""),
                "",
                output_dir.path(),
                &flags(&["-p:Password=supersecretvalue"]),
            )
            .await
            .unwrap();

        let log = buffer.contents();
        assert!(log.contains("-p:Password=****"));
        assert!(!log.contains("supersecretvalue"));
        assert!(log.contains("Completed in"));
    }
}
