//! Module resource lookup (bundled effect files).

use std::path::{Path, PathBuf};

/// Environment override for the resource directory.
pub const DATA_DIR_ENV: &str = "DEINT_DATA_DIR";

#[derive(Debug, Clone)]
pub struct ModuleResources {
    data_dir: PathBuf,
}

impl ModuleResources {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// The `data/` directory shipped with this crate.
    pub fn bundled() -> Self {
        Self::new(concat!(env!("CARGO_MANIFEST_DIR"), "/data"))
    }

    /// `DEINT_DATA_DIR` when set, otherwise the bundled directory.
    pub fn from_env() -> Self {
        match std::env::var_os(DATA_DIR_ENV) {
            Some(dir) if !dir.is_empty() => Self::new(dir),
            _ => Self::bundled(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Full path of a resource file, or `None` if it does not exist.
    pub fn module_file(&self, name: &str) -> Option<PathBuf> {
        let path = self.data_dir.join(name);
        if path.is_file() {
            Some(path)
        } else {
            tracing::debug!("Module resource missing: {}", path.display());
            None
        }
    }
}
