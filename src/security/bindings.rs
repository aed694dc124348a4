//! Service binding discovery
//!
//! A binding is a directory under the bindings root. Its `type` file names its
//! kind, an optional `provider` file names who supplied it, and every other
//! regular file is an entry:
//!
//! ```text
//! <platform>/bindings/
//! └── my-nuget-feed/
//!     ├── type          # "nuget"
//!     ├── provider      # optional
//!     └── NuGet.Config
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::core::error::BuildError;

const TYPE_FILE: &str = "type";
const PROVIDER_FILE: &str = "provider";

/// A resolved service binding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub name: String,
    pub path: PathBuf,
    pub binding_type: String,
    pub provider: Option<String>,
    /// Entry file name to its path
    pub entries: BTreeMap<String, PathBuf>,
}

/// Finds bindings under the platform directory or `SERVICE_BINDING_ROOT`
#[derive(Debug, Clone, Default)]
pub struct BindingResolver {
    binding_root: Option<PathBuf>,
}

impl BindingResolver {
    /// `binding_root` overrides `<platform>/bindings` when set
    pub fn new(binding_root: Option<PathBuf>) -> Self {
        Self { binding_root }
    }

    fn root(&self, platform_dir: &Path) -> PathBuf {
        self.binding_root
            .clone()
            .unwrap_or_else(|| platform_dir.join("bindings"))
    }

    /// List every binding of `binding_type`
    ///
    /// Types are compared case-insensitively. A missing root directory means
    /// there are no bindings.
    pub fn resolve(
        &self,
        binding_type: &str,
        platform_dir: &Path,
    ) -> Result<Vec<Binding>, BuildError> {
        let root = self.root(platform_dir);

        let dir = match std::fs::read_dir(&root) {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(BuildError::binding(format!(
                    "failed to list {}: {}",
                    root.display(),
                    e
                )));
            }
        };

        let mut bindings = Vec::new();
        for entry in dir {
            let entry = entry.map_err(|e| {
                BuildError::binding(format!("failed to list {}: {}", root.display(), e))
            })?;

            if !entry.path().is_dir() {
                continue;
            }

            let Some(binding) = Self::load_binding(&entry.path())? else {
                continue;
            };

            if !binding.binding_type.eq_ignore_ascii_case(binding_type) {
                continue;
            }

            bindings.push(binding);
        }

        bindings.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(bindings)
    }

    /// Resolve zero or one binding of `binding_type`
    ///
    /// More than one match is ambiguous and therefore an error.
    pub fn resolve_one(
        &self,
        binding_type: &str,
        platform_dir: &Path,
    ) -> Result<Option<Binding>, BuildError> {
        let mut bindings = self.resolve(binding_type, platform_dir)?;

        match bindings.len() {
            0 => Ok(None),
            1 => Ok(bindings.pop()),
            n => Err(BuildError::binding(format!(
                "found {} bindings with type '{}' ({}), expected at most 1",
                n,
                binding_type,
                bindings
                    .iter()
                    .map(|b| b.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ))),
        }
    }

    /// Directories without a `type` file are not bindings
    fn load_binding(path: &Path) -> Result<Option<Binding>, BuildError> {
        let read = |file: &Path| {
            std::fs::read_to_string(file).map_err(|e| {
                BuildError::binding(format!("failed to read {}: {}", file.display(), e))
            })
        };

        let type_path = path.join(TYPE_FILE);
        if !type_path.is_file() {
            tracing::debug!(path = %path.display(), "skipping directory without a type file");
            return Ok(None);
        }
        let binding_type = read(&type_path)?.trim().to_string();

        let provider_path = path.join(PROVIDER_FILE);
        let provider = if provider_path.is_file() {
            Some(read(&provider_path)?.trim().to_string())
        } else {
            None
        };

        let mut entries = BTreeMap::new();
        let dir = std::fs::read_dir(path).map_err(|e| {
            BuildError::binding(format!("failed to list {}: {}", path.display(), e))
        })?;
        for entry in dir {
            let entry = entry.map_err(|e| {
                BuildError::binding(format!("failed to list {}: {}", path.display(), e))
            })?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name == TYPE_FILE || name == PROVIDER_FILE || name.starts_with('.') {
                continue;
            }
            if entry.path().is_file() {
                entries.insert(name, entry.path());
            }
        }

        Ok(Some(Binding {
            name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            path: path.to_path_buf(),
            binding_type,
            provider,
            entries,
        }))
    }
}
