//! Configuration structures for the publish build step
//!
//! Environment state is captured once into [`BuildConfig`] at pipeline entry;
//! no component reads the process environment afterwards.

use serde::Deserialize;
use std::path::PathBuf;

/// Overrides the project path, takes precedence over buildpack.yml
pub const PROJECT_PATH_ENV: &str = "BP_DOTNET_PROJECT_PATH";

/// Whitespace-delimited extra flags for `dotnet publish`
pub const PUBLISH_FLAGS_ENV: &str = "BP_DOTNET_PUBLISH_FLAGS";

/// Location of the installed .NET tool-chain
pub const DOTNET_ROOT_ENV: &str = "DOTNET_ROOT";

/// Overrides `<platform>/bindings` as the service binding root
pub const SERVICE_BINDING_ROOT_ENV: &str = "SERVICE_BINDING_ROOT";

/// Legacy metadata file at the working directory root
pub const BUILDPACK_YML: &str = "buildpack.yml";

/// Build-metadata files the source replacement must keep
pub const EXCLUDED_FILES: &[&str] = &[".dotnet_root"];

/// Buildpack identity, as declared in buildpack.toml
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BuildpackInfo {
    pub name: String,
    pub version: String,
}

/// Immutable input of one build invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildContext {
    /// Application source directory, replaced by the publish output
    pub working_dir: PathBuf,

    /// Platform directory provided by the lifecycle
    pub platform_dir: PathBuf,

    pub buildpack_info: BuildpackInfo,
}

/// Build configuration resolved from the environment
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BuildConfig {
    /// `BP_DOTNET_PROJECT_PATH`; `Some("")` still counts as set
    pub project_path: Option<String>,

    /// `BP_DOTNET_PUBLISH_FLAGS`
    pub publish_flags: Option<String>,

    /// `DOTNET_ROOT`, empty when unset
    pub dotnet_root: PathBuf,

    /// `SERVICE_BINDING_ROOT`
    pub service_binding_root: Option<PathBuf>,

    /// Inherited `PATH`, prefixed with the tool-chain root for publishing
    pub search_path: Option<String>,

    /// Parent directory for the ephemeral publish output
    pub temp_dir: PathBuf,
}

/// buildpack.toml layout, only the fields this step needs
#[derive(Debug, Deserialize)]
pub(crate) struct BuildpackDescriptor {
    pub buildpack: BuildpackInfo,
}
