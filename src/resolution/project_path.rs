//! Project path resolution
//!
//! Precedence (high to low):
//! 1. `BP_DOTNET_PROJECT_PATH`, even when set to the empty string
//! 2. `dotnet-build.project-path` in buildpack.yml (deprecated)
//! 3. Empty, meaning the whole working directory

use std::path::Path;

use crate::core::config::BuildConfig;
use crate::core::error::BuildError;
use crate::core::traits::ProjectPathParser;

/// Outcome of project path resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectPathResolution {
    pub project_path: String,

    /// The path came from buildpack.yml; callers should warn about it
    pub used_legacy: bool,
}

/// Resolves the project path from the environment override or buildpack.yml
pub struct ProjectPathResolver<'a> {
    parser: &'a dyn ProjectPathParser,
}

impl<'a> ProjectPathResolver<'a> {
    pub fn new(parser: &'a dyn ProjectPathParser) -> Self {
        Self { parser }
    }

    pub fn resolve(
        &self,
        config: &BuildConfig,
        metadata_file: &Path,
    ) -> Result<ProjectPathResolution, BuildError> {
        if let Some(project_path) = &config.project_path {
            return Ok(ProjectPathResolution {
                project_path: project_path.clone(),
                used_legacy: false,
            });
        }

        let project_path = self.parser.parse_project_path(metadata_file)?;
        let used_legacy = !project_path.is_empty();

        Ok(ProjectPathResolution {
            project_path,
            used_legacy,
        })
    }
}

/// Version named in the deprecation warning: the next major release
///
/// Returns `None` when `version` is not valid semver.
pub fn next_major_version(version: &str) -> Option<semver::Version> {
    let current = semver::Version::parse(version.trim_start_matches('v')).ok()?;
    Some(semver::Version::new(current.major + 1, 0, 0))
}
