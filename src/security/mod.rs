pub mod bindings;
pub mod nuget_config;
pub mod redact;

pub use bindings::{Binding, BindingResolver};
pub use nuget_config::{
    CredentialStagingProvider, NUGET_BINDING_TYPE, NUGET_CONFIG_FILE, StagedCredential,
};
pub use redact::{MASK, redact_args};
