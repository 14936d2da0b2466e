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

//! Path namespaces of the on-disk store.
//!
//! Three namespaces hang off a single data directory: small fixture files
//! committed to the repository (used by unit tests), canonical source files
//! fetched from remote storage, and derived artifacts produced by format
//! conversion under `temp/`. Resolution is a pure function of the layout
//! and its inputs; the only I/O is lazily creating the temp directory.

use crate::config::{COLBENCH_DATA_DIR_VAR, COLBENCH_TEMP_DIR};
use crate::encoding::{Compression, FileType};
use crate::error::Result;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Directory of fixture files committed to the repository.
fn repo_data_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("data")
}

/// Resolves dataset names and derived-artifact cases to concrete paths.
#[derive(Debug, Clone)]
pub struct DataLayout {
    fixture_dir: PathBuf,
    data_dir: PathBuf,
    temp_dir: PathBuf,
}

impl DataLayout {
    /// The layout benchmarks run against: fixtures live in the repository,
    /// canonical sources in the directory named by `COLBENCH_DATA_DIR`
    /// (falling back to the repository data directory).
    pub fn from_env() -> Self {
        let fixture_dir = repo_data_dir();
        let data_dir = env::var(COLBENCH_DATA_DIR_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|_| fixture_dir.clone());
        let temp_dir = data_dir.join(&*COLBENCH_TEMP_DIR);
        Self {
            fixture_dir,
            data_dir,
            temp_dir,
        }
    }

    /// A layout entirely rooted at `root`; used by tests and tooling that
    /// must not touch the shared store.
    pub fn at(root: impl Into<PathBuf>) -> Self {
        let data_dir: PathBuf = root.into();
        let temp_dir = data_dir.join(&*COLBENCH_TEMP_DIR);
        Self {
            fixture_dir: data_dir.clone(),
            data_dir,
            temp_dir,
        }
    }

    /// The canonical-source directory.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// The derived-artifact directory.
    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }

    /// The path of a fixture file committed to the repository.
    pub fn fixture(&self, file: &str) -> PathBuf {
        self.fixture_dir.join(file)
    }

    /// The path of a canonical source file, e.g.
    /// `data/nyctaxi_2010-01.csv.gz`. Partitioned keys keep their slashes
    /// and land in subdirectories.
    pub fn canonical(&self, file: &str) -> PathBuf {
        self.data_dir.join(file)
    }

    /// The path of a derived artifact, e.g.
    /// `data/temp/nyctaxi_sample.snappy.parquet`.
    ///
    /// The name encodes (dataset, compression, file type), so distinct
    /// cases never alias the same file and repeated requests for one case
    /// always land on the same file; that is what makes the temp directory
    /// a cache. Creates the temp directory if it is absent.
    pub fn derived(
        &self,
        name: &str,
        file_type: FileType,
        compression: Compression,
    ) -> Result<PathBuf> {
        fs::create_dir_all(&self.temp_dir)?;
        Ok(self
            .temp_dir
            .join(format!("{}.{}.{}", name, compression, file_type)))
    }
}
