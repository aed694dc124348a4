pub mod core;
pub mod orchestration;
pub mod publish;
pub mod resolution;
pub mod security;

pub use core::*;
pub use orchestration::{BuildOrchestrator, BuildReport};
pub use publish::{CommandError, DotnetPublishProcess, FileSystemSourceReplacer};
pub use resolution::{BuildpackYmlParser, FlagsResolver, ResolvedConfig};
pub use security::{BindingResolver, CredentialStagingProvider, StagedCredential};
