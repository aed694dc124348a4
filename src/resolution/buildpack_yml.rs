//! Legacy buildpack.yml parsing
//!
//! ```yaml
//! dotnet-build:
//!   project-path: "src/app"
//! ```

use serde::Deserialize;
use std::path::Path;

use crate::core::error::BuildError;
use crate::core::traits::ProjectPathParser;

#[derive(Debug, Default, Deserialize)]
struct BuildpackYml {
    #[serde(rename = "dotnet-build", default)]
    dotnet_build: Option<DotnetBuild>,
}

#[derive(Debug, Default, Deserialize)]
struct DotnetBuild {
    #[serde(rename = "project-path", default)]
    project_path: Option<String>,
}

/// Reads `dotnet-build.project-path` from buildpack.yml
#[derive(Debug, Default, Clone, Copy)]
pub struct BuildpackYmlParser;

impl BuildpackYmlParser {
    pub fn new() -> Self {
        Self
    }
}

impl ProjectPathParser for BuildpackYmlParser {
    fn parse_project_path(&self, path: &Path) -> Result<String, BuildError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(String::new()),
            Err(e) => return Err(BuildError::parse(path, e)),
        };

        if content.trim().is_empty() {
            return Ok(String::new());
        }

        let parsed: Option<BuildpackYml> =
            serde_yaml::from_str(&content).map_err(|e| BuildError::parse(path, e))?;

        Ok(parsed
            .and_then(|yml| yml.dotnet_build)
            .and_then(|build| build.project_path)
            .unwrap_or_default())
    }
}
