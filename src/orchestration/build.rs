//! Build orchestrator - runs the publish build step end to end
//!
//! Steps run strictly in order and the first error aborts the rest:
//! - Project path resolution (env override, then buildpack.yml)
//! - Publish flag resolution
//! - Optional NuGet.Config staging from a service binding
//! - Ephemeral output location creation
//! - `dotnet publish`
//! - Source replacement
//! - Output location removal
//!
//! A staged NuGet.Config is removed on every way out of [`BuildOrchestrator::run`],
//! including a dropped (cancelled) future. Source replacement is never rolled
//! back.

use std::ffi::OsStr;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;

use crate::core::config::{BUILDPACK_YML, BuildConfig, BuildContext, EXCLUDED_FILES};
use crate::core::error::BuildError;
use crate::core::logger::BuildLogger;
use crate::core::state_machine::{BuildState, BuildStateMachine, StateTransition};
use crate::core::traits::{FlagsParser, ProjectPathParser, PublishInvoker, SourceReplacer};
use crate::publish::{DotnetPublishProcess, FileSystemSourceReplacer};
use crate::resolution::{
    BuildpackYmlParser, FlagsResolver, ProjectPathResolver, ResolvedConfig, next_major_version,
};
use crate::security::{BindingResolver, CredentialStagingProvider, StagedCredential};

/// Name prefix of the ephemeral publish output directory
pub const OUTPUT_DIR_PREFIX: &str = "dotnet-publish-output";

/// Report of a successful build
#[derive(Debug, Clone)]
pub struct BuildReport {
    pub resolved: ResolvedConfig,
    pub transitions: Vec<StateTransition>,
    pub elapsed_ms: i64,
}

impl BuildReport {
    /// States visited after `Initial`, in order
    pub fn states(&self) -> Vec<BuildState> {
        self.transitions.iter().map(|t| t.to).collect()
    }
}

/// Composes the build step's collaborators
pub struct BuildOrchestrator {
    project_path_parser: Box<dyn ProjectPathParser>,
    flags_parser: Box<dyn FlagsParser>,
    publish_invoker: Box<dyn PublishInvoker>,
    source_replacer: Box<dyn SourceReplacer>,
    logger: BuildLogger,
}

impl BuildOrchestrator {
    pub fn new(
        project_path_parser: Box<dyn ProjectPathParser>,
        flags_parser: Box<dyn FlagsParser>,
        publish_invoker: Box<dyn PublishInvoker>,
        source_replacer: Box<dyn SourceReplacer>,
        logger: BuildLogger,
    ) -> Self {
        Self {
            project_path_parser,
            flags_parser,
            publish_invoker,
            source_replacer,
            logger,
        }
    }

    /// Orchestrator wired to the real `dotnet` tool-chain and filesystem
    pub fn dotnet(
        config: &BuildConfig,
        logger: BuildLogger,
        publish_timeout: Option<Duration>,
    ) -> Self {
        let publish_process = DotnetPublishProcess::new(logger.clone())
            .with_search_path(config.search_path.clone())
            .with_timeout(publish_timeout);

        Self::new(
            Box::new(BuildpackYmlParser::new()),
            Box::new(FlagsResolver::new()),
            Box::new(publish_process),
            Box::new(FileSystemSourceReplacer::new()),
            logger,
        )
    }

    /// Run the build step
    ///
    /// Returns the first error encountered. Any staged credential file is
    /// removed before this returns, whatever the outcome.
    pub async fn run(
        &self,
        context: &BuildContext,
        config: &BuildConfig,
    ) -> Result<BuildReport, BuildError> {
        let mut machine = BuildStateMachine::new();
        let mut staged: Option<StagedCredential> = None;

        let result = self.execute(context, config, &mut machine, &mut staged).await;

        let cleanup = match staged.take() {
            Some(credential) => credential.release(),
            None => Ok(()),
        };

        match (result, cleanup) {
            (Ok(resolved), Ok(())) => {
                machine.transition(BuildState::Done);
                tracing::debug!(history = %machine.get_history(), "build finished");
                Ok(BuildReport {
                    resolved,
                    transitions: machine.transitions().to_vec(),
                    elapsed_ms: machine.get_elapsed_time(),
                })
            }
            (Ok(_), Err(cleanup_error)) => {
                machine.fail(&cleanup_error);
                Err(cleanup_error)
            }
            (Err(error), cleanup) => {
                if let Err(cleanup_error) = cleanup {
                    tracing::warn!(error = %cleanup_error, "credential cleanup failed after build error");
                }
                machine.fail(&error);
                tracing::debug!(
                    visited = ?machine.visited(),
                    error = machine.get_last_error().unwrap_or_default(),
                    "build failed"
                );
                Err(error)
            }
        }
    }

    async fn execute(
        &self,
        context: &BuildContext,
        config: &BuildConfig,
        machine: &mut BuildStateMachine,
        staged: &mut Option<StagedCredential>,
    ) -> Result<ResolvedConfig, BuildError> {
        let info = &context.buildpack_info;
        self.logger.title(format!("{} {}", info.name, info.version));

        machine.transition(BuildState::ResolvingProjectPath);
        let resolution = ProjectPathResolver::new(self.project_path_parser.as_ref())
            .resolve(config, &context.working_dir.join(BUILDPACK_YML))?;
        if resolution.used_legacy {
            self.warn_buildpack_yml_deprecation(&info.version);
        }

        machine.transition(BuildState::ResolvingFlags);
        let flags = self
            .flags_parser
            .parse_flags(config.publish_flags.as_deref())?;

        let resolved = ResolvedConfig {
            project_path: resolution.project_path,
            flags,
        };

        machine.transition(BuildState::StagingCredentials);
        let stager = CredentialStagingProvider::new(BindingResolver::new(
            config.service_binding_root.clone(),
        ));
        if let Some(credential) = stager
            .stage(&context.platform_dir, &context.working_dir)
            .await?
        {
            self.logger.process("Using NuGet.Config binding");
            *staged = Some(credential);
        }

        machine.transition(BuildState::CreatingOutputLocation);
        let output_dir = create_output_location(&config.temp_dir)?;

        machine.transition(BuildState::Publishing);
        self.logger.process("Executing build process");
        self.publish_invoker
            .execute(
                &context.working_dir,
                &config.dotnet_root,
                &resolved.project_path,
                output_dir.path(),
                &resolved.flags,
            )
            .await?;

        machine.transition(BuildState::ReplacingSource);
        self.logger.process("Removing source code");
        self.logger.break_line();
        self.source_replacer
            .replace(&context.working_dir, output_dir.path(), EXCLUDED_FILES)?;

        machine.transition(BuildState::RemovingOutputLocation);
        output_dir
            .close()
            .map_err(|e| BuildError::temp_lifecycle("could not remove temp directory", e))?;

        Ok(resolved)
    }

    fn warn_buildpack_yml_deprecation(&self, version: &str) {
        let target = match next_major_version(version) {
            Some(next) => format!("v{}", next),
            None => {
                tracing::warn!(version, "buildpack version is not valid semver");
                "the next major version".to_string()
            }
        };

        self.logger.subprocess(format!(
            "WARNING: Setting the project path through buildpack.yml will be deprecated soon in Dotnet Publish Buildpack {}",
            target
        ));
        self.logger.subprocess(
            "Please specify the project path through the $BP_DOTNET_PROJECT_PATH environment variable instead. See README.md or the documentation on paketo.io for more information.",
        );
    }
}

/// Create the uniquely named output directory under `parent`
///
/// The directory is removed when the returned handle drops, so failed or
/// cancelled builds do not leave it behind.
fn create_output_location(parent: &Path) -> Result<TempDir, BuildError> {
    let output_dir = tempfile::Builder::new()
        .prefix(OUTPUT_DIR_PREFIX)
        .tempdir_in(parent)
        .map_err(|e| BuildError::temp_lifecycle("could not create temp directory", e))?;

    let name = output_dir.path().file_name().unwrap_or_default();
    if EXCLUDED_FILES
        .iter()
        .any(|excluded| name == OsStr::new(excluded))
    {
        return Err(BuildError::temp_lifecycle(
            "could not create temp directory",
            std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                format!("{} collides with an excluded file name", name.to_string_lossy()),
            ),
        ));
    }

    Ok(output_dir)
}
