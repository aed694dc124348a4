//! Collaborator seams of the build pipeline
//!
//! The orchestrator only talks to these traits, so each side-effecting step can
//! be replaced in tests or by an alternative tool-chain.

use async_trait::async_trait;
use std::path::Path;

use crate::core::error::BuildError;

/// Reads the project path from the legacy metadata file
pub trait ProjectPathParser: Send + Sync {
    /// Parse the project path out of `path`
    ///
    /// A missing file yields an empty path; malformed content is
    /// [`BuildError::Parse`].
    fn parse_project_path(&self, path: &Path) -> Result<String, BuildError>;
}

/// Turns the raw publish-flags value into discrete arguments
pub trait FlagsParser: Send + Sync {
    /// `None` means the variable was not set and yields no flags
    fn parse_flags(&self, raw: Option<&str>) -> Result<Vec<String>, BuildError>;
}

/// Runs the external publish tool-chain
#[async_trait]
pub trait PublishInvoker: Send + Sync {
    /// Publish `project_path` (relative to `working_dir`) into `output_dir`
    ///
    /// Implementations must either fully populate `output_dir` or fail, and
    /// must not touch `working_dir` outside tool-chain caches.
    async fn execute(
        &self,
        working_dir: &Path,
        root_dir: &Path,
        project_path: &str,
        output_dir: &Path,
        flags: &[String],
    ) -> Result<(), BuildError>;
}

/// Replaces the application source with the publish output
pub trait SourceReplacer: Send + Sync {
    fn replace(
        &self,
        working_dir: &Path,
        output_dir: &Path,
        exclusions: &[&str],
    ) -> Result<(), BuildError>;
}
