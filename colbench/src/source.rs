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

//! The source facade benchmarks interact with: one handle per dataset,
//! bound to its registry entry, fetching eagerly where the registry says
//! so and memoizing the parsed table for the lifetime of the handle.

use crate::encoding::{self, Compression, FileType};
use crate::error::{ColbenchError, Result};
use crate::fetch;
use crate::integrity::{self, SizeTable, BUILTIN_SIZES};
use crate::lock::PathLock;
use crate::paths::DataLayout;
use crate::registry::{Descriptor, Location, Registry, BUILTIN_REGISTRY};
use crate::table::{self, Table};
use datafusion::datasource::MemTable;
use log::info;
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

/// The dataset store: the registry, the expected-size table, and the disk
/// layout, bundled so they travel together and tests can substitute all
/// three at once.
///
/// Example store on disk:
///
/// ```text
/// data
/// ├── chi_traffic_sample.parquet
/// ├── fanniemae_sample.csv
/// ├── nyctaxi_2010-01.csv.gz
/// ├── nyctaxi_sample.csv
/// └── temp
///     ├── fanniemae_sample.zstd.feather
///     ├── nyctaxi_2010-01.snappy.parquet
///     └── nyctaxi_sample.snappy.parquet
/// ```
///
/// Files directly under `data/` are canonical sources; a missing canonical
/// file is downloaded from its remote location on first use and kept for
/// subsequent runs. Files under `data/temp/` are derived from the
/// canonical sources by benchmarks and are safe to delete at any time.
#[derive(Debug, Clone)]
pub struct Store {
    registry: Arc<Registry>,
    sizes: Arc<SizeTable>,
    layout: Arc<DataLayout>,
}

impl Store {
    /// The store benchmarks run against: builtin registry and size table,
    /// disk layout from the environment.
    pub fn open() -> Self {
        Self {
            registry: BUILTIN_REGISTRY.clone(),
            sizes: BUILTIN_SIZES.clone(),
            layout: Arc::new(DataLayout::from_env()),
        }
    }

    /// A store over explicit tables and layout.
    pub fn with(registry: Registry, sizes: SizeTable, layout: DataLayout) -> Self {
        Self {
            registry: Arc::new(registry),
            sizes: Arc::new(sizes),
            layout: Arc::new(layout),
        }
    }

    /// Binds a source handle to the registry entry for `name`.
    ///
    /// Fails with [ColbenchError::UnknownDataset] before touching the disk
    /// or the network when the name is not registered. For eager datasets
    /// the canonical download happens here, synchronously; first use of a
    /// multi-gigabyte dataset blocks until the transfer completes, which is
    /// acceptable because setup is excluded from every timed region.
    pub fn source(&self, name: &str) -> Result<Source> {
        let descriptor = self
            .registry
            .get(name)
            .ok_or_else(|| ColbenchError::UnknownDataset(name.to_string()))?;
        if descriptor.eager() {
            fetch::ensure_available(&descriptor, &self.layout, &self.sizes)?;
        }
        Ok(Source {
            name: name.to_string(),
            descriptor,
            layout: self.layout.clone(),
            sizes: self.sizes.clone(),
            table: RefCell::new(None),
            mem_table: RefCell::new(None),
        })
    }

    /// The registry backing this store.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// The expected-size table backing this store.
    pub fn sizes(&self) -> &SizeTable {
        &self.sizes
    }

    /// The disk layout backing this store.
    pub fn layout(&self) -> &DataLayout {
        &self.layout
    }
}

/// A handle on one dataset. Owns the memoized in-memory representations;
/// the files on disk are shared state owned by nobody.
pub struct Source {
    name: String,
    descriptor: Arc<Descriptor>,
    layout: Arc<DataLayout>,
    sizes: Arc<SizeTable>,
    table: RefCell<Option<Arc<Table>>>,
    mem_table: RefCell<Option<Arc<MemTable>>>,
}

impl Source {
    /// Binds a handle to `name` in the default store.
    pub fn new(name: &str) -> Result<Self> {
        Store::open().source(name)
    }

    /// The logical dataset name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The registry entry this handle is bound to.
    pub fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    /// Identifying tags attached to every benchmark result produced
    /// against this dataset.
    pub fn tags(&self) -> HashMap<String, String> {
        HashMap::from([("dataset".to_string(), self.name.clone())])
    }

    /// The canonical on-disk path(s) of this dataset.
    pub fn canonical_paths(&self) -> Vec<PathBuf> {
        self.descriptor.canonical_paths(&self.layout)
    }

    /// The parsed canonical dataset. Computed at most once per handle;
    /// later calls return the cached table even if the files on disk have
    /// changed since.
    pub fn table(&self) -> Result<Arc<Table>> {
        if let Some(cached) = self.table.borrow().as_ref() {
            return Ok(cached.clone());
        }
        let loaded = Arc::new(self.load_table()?);
        *self.table.borrow_mut() = Some(loaded.clone());
        Ok(loaded)
    }

    /// The dataset as a DataFusion [MemTable], for benchmarks that query
    /// rather than scan. Memoized like [Source::table].
    pub fn mem_table(&self) -> Result<Arc<MemTable>> {
        if let Some(cached) = self.mem_table.borrow().as_ref() {
            return Ok(cached.clone());
        }
        let table = self.table()?;
        let mem = Arc::new(MemTable::try_new(
            table.schema.clone(),
            vec![table.batches.clone()],
        )?);
        *self.mem_table.borrow_mut() = Some(mem.clone());
        Ok(mem)
    }

    /// Ensures the derived rendition of this dataset for
    /// (`file_type`, `compression`) exists and is trusted, and returns its
    /// path.
    ///
    /// On a cache hit this returns without touching the in-memory table,
    /// which is the dominant path in repeated benchmark runs. On a miss the
    /// canonical table is parsed (at most once per handle), encoded, and
    /// written under the temp directory, then re-checked against the
    /// expected-size table. Calling this twice with the same arguments
    /// converts at most once.
    pub fn materialize(&self, file_type: FileType, compression: Compression) -> Result<PathBuf> {
        let path = self.layout.derived(&self.name, file_type, compression)?;
        if !integrity::is_stale(&path, &self.sizes) {
            return Ok(path);
        }
        let _lock = PathLock::acquire(&path)?;
        if !integrity::is_stale(&path, &self.sizes) {
            // Lost the race to another process; its artifact checks out.
            return Ok(path);
        }
        let table = self.table()?;
        info!("materializing {}", path.display());
        encoding::write_table(&table, &path, file_type, compression)?;
        integrity::verify(&path, &self.sizes)?;
        Ok(path)
    }

    fn load_table(&self) -> Result<Table> {
        // A previously materialized lz4 feather rendition decodes a lot
        // faster than re-parsing a csv canonical; prefer it when present.
        let cached = self
            .layout
            .derived(&self.name, FileType::Feather, Compression::Lz4)?;
        if cached.exists() {
            return table::read_feather(&cached);
        }

        if matches!(self.descriptor.location, Location::Partitioned { .. }) {
            return Err(ColbenchError::NotImplemented(format!(
                "{} is partitioned and is read in place from object storage",
                self.name
            )));
        }
        let paths = self.canonical_paths();
        let path = &paths[0];
        match self.descriptor.format {
            FileType::Csv => table::read_csv(
                path,
                self.descriptor.delimiter,
                self.descriptor.header,
                self.descriptor.schema.clone(),
            ),
            FileType::Parquet => table::read_parquet(path),
            FileType::Feather => table::read_feather(path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integrity::bytes_bucket;
    use std::fs;
    use std::path::Path;
    use std::thread;
    use std::time::Duration;

    const FIXTURE_CSV: &str = "id,tag,score\n1,a,0.5\n2,b,1.5\n3,c,2.5\n4,d,3.5\n";

    fn fixture_registry() -> Registry {
        let mut registry = Registry::new();
        registry.register(
            "ints_sample",
            Descriptor::local(FileType::Csv, "ints_sample.csv").csv_options(b',', true),
        );
        registry
    }

    fn fixture_store(root: &Path) -> Store {
        fs::write(root.join("ints_sample.csv"), FIXTURE_CSV).unwrap();
        Store::with(fixture_registry(), SizeTable::new(), DataLayout::at(root))
    }

    #[test]
    fn unknown_dataset_fails_before_any_io() {
        let missing_root = Path::new("/nonexistent/colbench-store");
        let store = Store::with(
            fixture_registry(),
            SizeTable::new(),
            DataLayout::at(missing_root),
        );
        let err = store
            .source("does-not-exist")
            .err()
            .expect("lookup must fail");
        match err {
            ColbenchError::UnknownDataset(name) => assert_eq!("does-not-exist", name),
            other => panic!("expected UnknownDataset, got {:?}", other),
        }
        // Nothing was fetched, created, or locked on the way out.
        assert!(!missing_root.exists());
    }

    #[test]
    fn table_is_memoized_per_handle() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let source = fixture_store(dir.path()).source("ints_sample")?;
        let first = source.table()?;
        let second = source.table()?;
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(4, first.num_rows());
        assert_eq!(vec!["id", "tag", "score"], first.column_names());

        let mem_first = source.mem_table()?;
        let mem_second = source.mem_table()?;
        assert!(Arc::ptr_eq(&mem_first, &mem_second));
        Ok(())
    }

    #[test]
    fn materialize_is_idempotent() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let source = fixture_store(dir.path()).source("ints_sample")?;

        let path = source.materialize(FileType::Parquet, Compression::Uncompressed)?;
        let written = fs::metadata(&path)?.modified()?;

        thread::sleep(Duration::from_millis(20));
        let again = source.materialize(FileType::Parquet, Compression::Uncompressed)?;
        assert_eq!(path, again);
        // The second call was a cache hit: no write happened.
        assert_eq!(written, fs::metadata(&again)?.modified()?);
        Ok(())
    }

    #[test]
    fn truncation_triggers_regeneration() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = fixture_store(dir.path())
            .source("ints_sample")?
            .materialize(FileType::Parquet, Compression::Uncompressed)?;
        let expected = fs::metadata(&path)?.len();

        // Record the healthy size, then clobber the artifact.
        let mut sizes = SizeTable::new();
        sizes.insert("ints_sample.uncompressed.parquet", expected);
        fs::write(&path, b"")?;

        let store = Store::with(fixture_registry(), sizes, DataLayout::at(dir.path()));
        let regenerated = store
            .source("ints_sample")?
            .materialize(FileType::Parquet, Compression::Uncompressed)?;
        assert_eq!(path, regenerated);
        assert_eq!(
            bytes_bucket(expected),
            bytes_bucket(fs::metadata(&regenerated)?.len())
        );
        Ok(())
    }

    #[test]
    fn parquet_round_trip_preserves_shape() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let source = fixture_store(dir.path()).source("ints_sample")?;
        let path = source.materialize(FileType::Parquet, Compression::Uncompressed)?;

        let read_back = table::read_parquet(&path)?;
        let original = source.table()?;
        assert_eq!(original.num_rows(), read_back.num_rows());
        assert_eq!(original.column_names(), read_back.column_names());
        Ok(())
    }

    #[test]
    fn feather_rendition_short_circuits_the_csv_parse() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = fixture_store(dir.path());
        store
            .source("ints_sample")?
            .materialize(FileType::Feather, Compression::Lz4)?;

        // With the rendition on disk the canonical csv is no longer read.
        fs::remove_file(dir.path().join("ints_sample.csv"))?;
        let table = store.source("ints_sample")?.table()?;
        assert_eq!(4, table.num_rows());
        Ok(())
    }

    #[test]
    fn gzip_csv_rendition_round_trips() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let source = fixture_store(dir.path()).source("ints_sample")?;
        let path = source.materialize(FileType::Csv, Compression::Gzip)?;
        assert_eq!(
            "ints_sample.gzip.csv",
            path.file_name().unwrap().to_str().unwrap()
        );

        let read_back = table::read_csv(&path, None, true, None)?;
        assert_eq!(4, read_back.num_rows());
        Ok(())
    }

    #[test]
    fn unsupported_rendition_is_rejected() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let source = fixture_store(dir.path()).source("ints_sample")?;
        assert!(matches!(
            source.materialize(FileType::Csv, Compression::Snappy),
            Err(ColbenchError::NotImplemented(_))
        ));
        Ok(())
    }

    #[test]
    fn tags_identify_the_dataset() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let source = fixture_store(dir.path()).source("ints_sample")?;
        assert_eq!(
            Some(&"ints_sample".to_string()),
            source.tags().get("dataset")
        );
        Ok(())
    }
}
