//! Build-time configuration resolution
//!
//! Turns [`BuildConfig`](crate::core::BuildConfig) and the legacy metadata file
//! into the [`ResolvedConfig`] the publish step consumes.

pub mod buildpack_yml;
pub mod flags;
pub mod project_path;

pub use buildpack_yml::BuildpackYmlParser;
pub use flags::FlagsResolver;
pub use project_path::{ProjectPathResolution, ProjectPathResolver, next_major_version};

/// Configuration handed to the publish invoker, fixed for one build
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResolvedConfig {
    /// Relative to the working directory; empty means the directory itself
    pub project_path: String,

    pub flags: Vec<String>,
}
