//! Error handling for the publish build step
//!
//! Every failure kind of the pipeline maps to one variant so callers can tell
//! configuration problems, tool-chain failures and filesystem failures apart.

use std::path::PathBuf;
use thiserror::Error;

use crate::publish::CommandError;

/// Main error type for the build pipeline
#[derive(Error, Debug)]
pub enum BuildError {
    // Configuration errors
    #[error("failed to parse {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    #[error("invalid buildpack configuration: {0}")]
    Config(String),

    // Credential binding errors
    #[error("failed to resolve nuget binding: {message}")]
    BindingResolution { message: String },

    #[error("could not remove staged credential file {}: {source}", .path.display())]
    CredentialCleanup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Tool-chain errors
    #[error("dotnet publish failed: {source}")]
    PublishFailed {
        #[source]
        source: CommandError,
    },

    // Filesystem errors
    #[error("{message}: {source}")]
    SourceRemoval {
        message: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{message}: {source}")]
    TempLifecycle {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

impl BuildError {
    pub(crate) fn parse(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.to_string(),
        }
    }

    pub(crate) fn binding(message: impl Into<String>) -> Self {
        Self::BindingResolution {
            message: message.into(),
        }
    }

    pub(crate) fn source_removal(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::SourceRemoval {
            message: message.into(),
            source,
        }
    }

    pub(crate) fn temp_lifecycle(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::TempLifecycle {
            message: message.into(),
            source,
        }
    }

    /// Get error code for this error
    pub fn code(&self) -> &'static str {
        match self {
            Self::Parse { .. } => "PARSE",
            Self::Config(_) => "CONFIG",
            Self::BindingResolution { .. } => "BINDING_RESOLUTION",
            Self::CredentialCleanup { .. } => "CREDENTIAL_CLEANUP",
            Self::PublishFailed { .. } => "PUBLISH_FAILED",
            Self::SourceRemoval { .. } => "SOURCE_REMOVAL",
            Self::TempLifecycle { .. } => "TEMP_LIFECYCLE",
        }
    }

    /// Whether the failure happened after the working directory was modified.
    ///
    /// Such builds cannot be re-run against the same directory.
    pub fn is_destructive(&self) -> bool {
        matches!(self, Self::SourceRemoval { .. })
    }

    /// Get suggested actions for this error
    pub fn suggested_actions(&self) -> Vec<&'static str> {
        match self {
            Self::Parse { .. } => vec![
                "Check the YAML syntax of buildpack.yml",
                "Prefer setting $BP_DOTNET_PROJECT_PATH over buildpack.yml",
                "Check quoting in $BP_DOTNET_PUBLISH_FLAGS",
            ],
            Self::Config(_) => vec!["Check buildpack.toml in the buildpack directory"],
            Self::BindingResolution { .. } => vec![
                "Provide at most one binding of type nuget",
                "The binding must contain a file named exactly NuGet.Config",
            ],
            Self::CredentialCleanup { .. } => {
                vec!["Remove NuGet.Config from the application image manually"]
            }
            Self::PublishFailed { .. } => vec![
                "Check the dotnet publish output above",
                "Make sure the project path points at a buildable project",
            ],
            Self::SourceRemoval { .. } => vec![
                "The working directory may be partially replaced, rebuild from a clean source",
            ],
            Self::TempLifecycle { .. } => vec!["Check that $TMPDIR exists and is writable"],
        }
    }
}
