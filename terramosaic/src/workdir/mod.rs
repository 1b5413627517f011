//! Scratch directory lifecycle.
//!
//! All intermediate artifacts of a territory run live in one per-territory
//! scratch directory. The root is wiped when the assembler is constructed
//! and each territory directory is wiped at the start of its run, so no
//! state survives across runs. Successful runs leave their artifacts in
//! place for diagnosis until the next run or an explicit clean.
//!
//! Clearing uses native filesystem operations on directory entries; paths
//! are never handed to a shell.

use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

/// Handle to the assembler's scratch root.
#[derive(Debug, Clone)]
pub struct WorkDir {
    root: PathBuf,
}

impl WorkDir {
    /// Create (or wipe) the scratch root.
    pub fn create(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        if root.exists() {
            clear_dir(&root)?;
        } else {
            std::fs::create_dir_all(&root)?;
        }
        debug!(root = %root.display(), "Scratch root ready");
        Ok(Self { root })
    }

    /// The scratch root path.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Fresh scratch directory for one territory run.
    ///
    /// Created empty; wiped first when a previous run left artifacts.
    pub fn territory_dir(&self, territory_id: &str) -> io::Result<PathBuf> {
        let dir = self.root.join(territory_id);
        if dir.exists() {
            clear_dir(&dir)?;
        } else {
            std::fs::create_dir_all(&dir)?;
        }
        Ok(dir)
    }

    /// Wipe everything under the scratch root.
    pub fn clean(&self) -> io::Result<()> {
        clear_dir(&self.root)
    }
}

/// Remove every entry inside `dir`, keeping `dir` itself.
fn clear_dir(dir: &Path) -> io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            std::fs::remove_dir_all(&path)?;
        } else {
            std::fs::remove_file(&path)?;
        }
    }
    Ok(())
}
