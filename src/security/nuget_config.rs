//! NuGet.Config staging from a service binding
//!
//! A private feed's NuGet.Config may carry credentials. It is copied into the
//! working directory only for the duration of the publish, and the returned
//! [`StagedCredential`] guard removes it again.

use secrecy::{ExposeSecret, SecretSlice};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncRead, AsyncWriteExt};

use crate::core::error::BuildError;
use crate::security::bindings::BindingResolver;

/// Binding type carrying a NuGet.Config
pub const NUGET_BINDING_TYPE: &str = "nuget";

/// NuGet looks the file up case-sensitively on Linux.
pub const NUGET_CONFIG_FILE: &str = "NuGet.Config";

/// Copies a bound NuGet.Config into the working directory
#[derive(Debug, Clone, Default)]
pub struct CredentialStagingProvider {
    resolver: BindingResolver,
}

impl CredentialStagingProvider {
    pub fn new(resolver: BindingResolver) -> Self {
        Self { resolver }
    }

    /// Stage the NuGet.Config of the single `nuget` binding, if any
    ///
    /// Returns `Ok(None)` when no such binding exists. More than one binding,
    /// or a binding without a `NuGet.Config` entry, is
    /// [`BuildError::BindingResolution`].
    pub async fn stage(
        &self,
        platform_dir: &Path,
        working_dir: &Path,
    ) -> Result<Option<StagedCredential>, BuildError> {
        let Some(binding) = self
            .resolver
            .resolve_one(NUGET_BINDING_TYPE, platform_dir)?
        else {
            return Ok(None);
        };

        let Some(source) = binding.entries.get(NUGET_CONFIG_FILE) else {
            let miscased = binding
                .entries
                .keys()
                .find(|name| name.eq_ignore_ascii_case(NUGET_CONFIG_FILE));
            return Err(BuildError::binding(match miscased {
                Some(name) => format!(
                    "binding '{}' contains '{}', the file must be named exactly '{}'",
                    binding.name, name, NUGET_CONFIG_FILE
                ),
                None => format!(
                    "binding '{}' does not contain a '{}' entry",
                    binding.name, NUGET_CONFIG_FILE
                ),
            }));
        };

        let content: SecretSlice<u8> = tokio::fs::read(source)
            .await
            .map_err(|e| {
                BuildError::binding(format!("failed to read {}: {}", source.display(), e))
            })?
            .into();

        let staged =
            stage_file(working_dir.join(NUGET_CONFIG_FILE), &mut content.expose_secret()).await?;

        tracing::debug!(
            binding = %binding.name,
            binding_path = %binding.path.display(),
            provider = binding.provider.as_deref().unwrap_or("unknown"),
            path = %staged.path().display(),
            "staged NuGet.Config"
        );

        Ok(Some(staged))
    }
}

/// Write `content` to a fresh file at `destination`
///
/// Whatever the application already has at `destination` is unlinked first,
/// so a symlink there is replaced rather than written through. The guard
/// exists before the first byte is written: a failed or cancelled write
/// leaves nothing behind.
async fn stage_file<R>(
    destination: PathBuf,
    content: &mut R,
) -> Result<StagedCredential, BuildError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    remove_if_present(&destination).map_err(|e| {
        BuildError::binding(format!(
            "failed to replace existing {}: {}",
            destination.display(),
            e
        ))
    })?;

    let staged = StagedCredential::new(destination);
    write_restricted(staged.path(), content)
        .await
        .map_err(|e| {
            BuildError::binding(format!("failed to write {}: {}", staged.path().display(), e))
        })?;

    Ok(staged)
}

async fn write_restricted<R>(path: &Path, content: &mut R) -> std::io::Result<()>
where
    R: AsyncRead + Unpin + ?Sized,
{
    // `create_new` refuses to open through a symlink that appeared meanwhile.
    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options.open(path).await?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))
            .await?;
    }

    tokio::io::copy(content, &mut file).await?;
    file.flush().await?;

    Ok(())
}

/// Release guard for a staged credential file
///
/// [`release`](Self::release) removes the file and reports the outcome.
/// Dropping an unreleased guard (early return, panic, cancelled future)
/// removes it as well, logging any failure.
#[derive(Debug)]
pub struct StagedCredential {
    path: PathBuf,
    released: bool,
}

impl StagedCredential {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            released: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the staged file; an already missing file counts as removed
    pub fn release(mut self) -> Result<(), BuildError> {
        self.released = true;
        remove_if_present(&self.path).map_err(|source| BuildError::CredentialCleanup {
            path: self.path.clone(),
            source,
        })
    }
}

impl Drop for StagedCredential {
    fn drop(&mut self) {
        if self.released {
            return;
        }

        if let Err(e) = remove_if_present(&self.path) {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to remove staged credential file");
        }
    }
}

fn remove_if_present(path: &Path) -> std::io::Result<()> {
    match std::fs::remove_file(path) {
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        result => result,
    }
}
