// Copyright (c) 2020-present, UMD Database Group.
//
// This program is free software: you can use, redistribute, and/or modify
// it under the terms of the GNU Affero General Public License, version 3
// or later ("AGPL"), as published by the Free Software Foundation.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or
// FITNESS FOR A PARTICULAR PURPOSE.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <http://www.gnu.org/licenses/>.

//! Advisory locks serializing writers of a shared store path.
//!
//! The store directories are ambient filesystem state: independently
//! launched benchmark processes can target the same canonical or derived
//! file. Every check-then-write sequence runs under an exclusive lock on a
//! sibling `.lock` file, so concurrent writers queue up instead of racing.
//! Lock files are left in place after release; unlinking them would let a
//! third process lock a fresh inode while a queued writer still holds the
//! old one.

use crate::error::Result;
use fs4::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

/// An exclusive advisory lock scoped to one destination path. Released
/// when dropped.
#[derive(Debug)]
pub struct PathLock {
    file: File,
}

impl PathLock {
    /// Blocks until the lock guarding `path` is held.
    ///
    /// The parent directory must already exist; callers create it before
    /// locking.
    pub fn acquire(path: &Path) -> Result<PathLock> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(Self::lock_path(path))?;
        file.lock_exclusive()?;
        Ok(PathLock { file })
    }

    /// The sibling lock file guarding `path`.
    pub fn lock_path(path: &Path) -> PathBuf {
        let mut name = path.file_name().unwrap_or_default().to_os_string();
        name.push(".lock");
        path.with_file_name(name)
    }
}

impl Drop for PathLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_is_reacquirable_after_release() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let target = dir.path().join("artifact.parquet");

        let lock = PathLock::acquire(&target)?;
        assert!(PathLock::lock_path(&target).exists());
        drop(lock);

        // A second acquisition must not deadlock against the released one.
        let _lock = PathLock::acquire(&target)?;
        Ok(())
    }

    #[test]
    fn lock_path_is_a_sibling() {
        assert_eq!(
            PathBuf::from("/d/temp/x.snappy.parquet.lock"),
            PathLock::lock_path(Path::new("/d/temp/x.snappy.parquet"))
        );
    }
}
