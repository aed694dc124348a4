//! Side-effecting collaborators: the publish tool-chain and source replacement

pub mod publish_process;
pub mod source_replacer;

pub use publish_process::{CommandError, DotnetPublishProcess};
pub use source_replacer::FileSystemSourceReplacer;
