//! Replacement of the application source with the publish output
//!
//! Deletion aborts on the first failure: a half-cleaned working directory is
//! not something to carry on from.

use std::ffi::OsStr;
use std::path::{Component, Path};
use walkdir::WalkDir;

use crate::core::error::BuildError;
use crate::core::traits::SourceReplacer;

/// Replaces the working directory's content on the local filesystem
#[derive(Debug, Default, Clone, Copy)]
pub struct FileSystemSourceReplacer;

impl FileSystemSourceReplacer {
    pub fn new() -> Self {
        Self
    }

    fn remove_sources(
        &self,
        working_dir: &Path,
        output_dir: &Path,
        exclusions: &[&str],
    ) -> Result<(), BuildError> {
        let output_dir = output_dir.canonicalize().map_err(|e| {
            BuildError::source_removal(
                format!("could not resolve output directory {}", output_dir.display()),
                e,
            )
        })?;

        let list_error = |e| {
            BuildError::source_removal(format!("could not list {}", working_dir.display()), e)
        };

        let mut doomed = Vec::new();
        for entry in std::fs::read_dir(working_dir).map_err(list_error)? {
            let entry = entry.map_err(list_error)?;
            let name = entry.file_name();

            if exclusions
                .iter()
                .any(|excluded| name.as_os_str() == OsStr::new(excluded))
            {
                continue;
            }

            let path = entry.path();
            let file_type = entry.file_type().map_err(|e| {
                BuildError::source_removal(format!("could not inspect {}", path.display()), e)
            })?;

            if file_type.is_dir() {
                let canonical = path.canonicalize().map_err(|e| {
                    BuildError::source_removal(format!("could not resolve {}", path.display()), e)
                })?;
                if canonical == output_dir {
                    continue;
                }
                if output_dir.starts_with(&canonical) {
                    return Err(BuildError::source_removal(
                        format!("refusing to remove {}", path.display()),
                        std::io::Error::new(
                            std::io::ErrorKind::InvalidInput,
                            format!("it contains the output directory {}", output_dir.display()),
                        ),
                    ));
                }
            }

            doomed.push((path, file_type.is_dir()));
        }

        for (path, is_dir) in doomed {
            tracing::debug!(path = %path.display(), "removing source entry");
            let result = if is_dir {
                std::fs::remove_dir_all(&path)
            } else {
                std::fs::remove_file(&path)
            };
            result.map_err(|e| {
                BuildError::source_removal(format!("could not remove {}", path.display()), e)
            })?;
        }

        Ok(())
    }

    fn copy_output(
        &self,
        working_dir: &Path,
        output_dir: &Path,
        exclusions: &[&str],
    ) -> Result<(), BuildError> {
        let walker = WalkDir::new(output_dir)
            .min_depth(1)
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| {
                entry.depth() != 1
                    || !exclusions
                        .iter()
                        .any(|excluded| entry.file_name() == OsStr::new(excluded))
            });

        for entry in walker {
            let entry = entry.map_err(|e| {
                let path = e.path().map(Path::to_path_buf).unwrap_or_default();
                BuildError::source_removal(
                    format!("could not read publish output {}", path.display()),
                    e.into(),
                )
            })?;

            let relative = entry
                .path()
                .strip_prefix(output_dir)
                .unwrap_or(entry.path());
            if relative
                .components()
                .any(|c| !matches!(c, Component::Normal(_)))
            {
                continue;
            }

            let destination = working_dir.join(relative);
            let copy_error = |e| {
                BuildError::source_removal(
                    format!(
                        "could not copy {} to {}",
                        entry.path().display(),
                        destination.display()
                    ),
                    e,
                )
            };

            let file_type = entry.file_type();
            if file_type.is_dir() {
                std::fs::create_dir_all(&destination).map_err(copy_error)?;
            } else if file_type.is_symlink() {
                copy_symlink(entry.path(), &destination).map_err(copy_error)?;
            } else {
                std::fs::copy(entry.path(), &destination).map_err(copy_error)?;
            }
        }

        Ok(())
    }
}

#[cfg(unix)]
fn copy_symlink(source: &Path, destination: &Path) -> std::io::Result<()> {
    let target = std::fs::read_link(source)?;
    std::os::unix::fs::symlink(target, destination)
}

#[cfg(not(unix))]
fn copy_symlink(source: &Path, destination: &Path) -> std::io::Result<()> {
    std::fs::copy(source, destination).map(|_| ())
}

impl SourceReplacer for FileSystemSourceReplacer {
    fn replace(
        &self,
        working_dir: &Path,
        output_dir: &Path,
        exclusions: &[&str],
    ) -> Result<(), BuildError> {
        self.remove_sources(working_dir, output_dir, exclusions)?;
        self.copy_output(working_dir, output_dir, exclusions)
    }
}
