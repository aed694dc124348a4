//! Configuration loader for the publish build step
//!
//! Builds a [`BuildConfig`] from an explicit environment map and reads the
//! buildpack identity from buildpack.toml.

use super::config::*;
use crate::core::error::BuildError;
use std::collections::HashMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Descriptor file name inside the buildpack directory
const BUILDPACK_TOML: &str = "buildpack.toml";

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Collect environment variables into a UTF-8 map
    ///
    /// Variables whose name or value is not valid UTF-8 are skipped; none of
    /// the variables this step reads can be used in that form anyway.
    pub fn env_map<I>(vars: I) -> HashMap<String, String>
    where
        I: IntoIterator<Item = (OsString, OsString)>,
    {
        vars.into_iter()
            .filter_map(|(key, value)| match (key.into_string(), value.into_string()) {
                (Ok(key), Ok(value)) => Some((key, value)),
                (key, _) => {
                    tracing::debug!(
                        variable = %key.unwrap_or_else(|k| k.to_string_lossy().into_owned()),
                        "skipping non UTF-8 environment variable"
                    );
                    None
                }
            })
            .collect()
    }

    /// Capture the build configuration from environment variables
    ///
    /// Only the variables this step consumes are read. A variable that is set
    /// to the empty string is kept as `Some("")` so that it still overrides
    /// lower-precedence sources.
    pub fn from_env(env: &HashMap<String, String>) -> BuildConfig {
        BuildConfig {
            project_path: env.get(PROJECT_PATH_ENV).cloned(),
            publish_flags: env.get(PUBLISH_FLAGS_ENV).cloned(),
            dotnet_root: env
                .get(DOTNET_ROOT_ENV)
                .map(PathBuf::from)
                .unwrap_or_default(),
            service_binding_root: env
                .get(SERVICE_BINDING_ROOT_ENV)
                .filter(|root| !root.is_empty())
                .map(PathBuf::from),
            search_path: env.get("PATH").cloned(),
            temp_dir: env
                .get("TMPDIR")
                .filter(|dir| !dir.is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(std::env::temp_dir),
        }
    }

    /// Load the buildpack name and version from `<dir>/buildpack.toml`
    ///
    /// Without a buildpack directory, or when the descriptor does not exist,
    /// the crate's own name and version are used.
    pub fn load_buildpack_info(buildpack_dir: Option<&Path>) -> Result<BuildpackInfo, BuildError> {
        let fallback = BuildpackInfo {
            name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        };

        let Some(dir) = buildpack_dir else {
            return Ok(fallback);
        };

        let descriptor_path = dir.join(BUILDPACK_TOML);
        if !descriptor_path.exists() {
            return Ok(fallback);
        }

        let content = std::fs::read_to_string(&descriptor_path).map_err(|e| {
            BuildError::Config(format!(
                "failed to read {}: {}",
                descriptor_path.display(),
                e
            ))
        })?;

        let descriptor: BuildpackDescriptor = toml::from_str(&content).map_err(|e| {
            BuildError::Config(format!(
                "failed to parse {}: {}",
                descriptor_path.display(),
                e
            ))
        })?;

        Ok(descriptor.buildpack)
    }
}
