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

//! Decides whether on-disk artifacts can be trusted, using a table of
//! expected byte sizes as the staleness oracle.
//!
//! Sizes compare at a coarse, human-scale bucket resolution rather than
//! byte-for-byte: compression libraries do not produce identical output
//! across versions and platforms, and exact comparison would turn that
//! noise into spurious cache misses. Bucketing still catches truncated or
//! corrupt files, which miss the mark by orders of magnitude.

use crate::error::{ColbenchError, Result};
use lazy_static::lazy_static;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

const MIB: u64 = 1024 * 1024;
const GIB: u64 = 1024 * MIB;
const TIB: u64 = 1024 * GIB;

/// Partition files are named dynamically and their sizes are not known in
/// advance; presence is the only signal available for them.
const SKIP_BASENAMES: [&str; 2] = ["data.parquet", "data.feather"];

/// Formats a byte count at bucket resolution: "0", "small" below 1 MiB,
/// whole mebibytes to 1 GiB, then tenths of gibibytes and tebibytes.
pub fn bytes_bucket(value: u64) -> String {
    if value == 0 {
        "0".to_string()
    } else if value < MIB {
        "small".to_string()
    } else if value < GIB {
        format!("{:.0} Mi", value as f64 / MIB as f64)
    } else if value < TIB {
        format!("{:.1} Gi", value as f64 / GIB as f64)
    } else {
        format!("{:.1} Ti", value as f64 / TIB as f64)
    }
}

/// Expected byte sizes of canonical and derived files, keyed by basename.
/// Operators update the builtin table by hand when upstream data or an
/// encoder's output changes.
#[derive(Debug, Clone, Default)]
pub struct SizeTable {
    sizes: HashMap<String, u64>,
}

impl SizeTable {
    /// An empty table; every file is judged on presence alone.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the expected size of `basename`.
    pub fn insert(&mut self, basename: &str, size: u64) {
        self.sizes.insert(basename.to_string(), size);
    }

    /// The recorded size for `basename`, if any.
    pub fn expected(&self, basename: &str) -> Option<u64> {
        self.sizes.get(basename).copied()
    }

    /// Whether `basename` is exempt from size checks.
    pub fn is_exempt(&self, basename: &str) -> bool {
        SKIP_BASENAMES.contains(&basename)
    }

    /// The table of sizes for all registered datasets and their known
    /// derived artifacts.
    pub fn builtin() -> Self {
        let entries: [(&str, u64); 38] = [
            ("chi_traffic_2020_Q1.parquet", 182_895_135),
            ("chi_traffic_sample.parquet", 116_984),
            ("fanniemae_2016Q4.csv.gz", 262_125_134),
            ("fanniemae_sample.csv", 87_619),
            ("nyctaxi_2010-01.csv.gz", 591_876_633),
            ("nyctaxi_sample.csv", 182_665),
            ("type_dict.parquet", 2_890_770),
            ("type_floats.parquet", 23_851_672),
            ("type_integers.parquet", 15_882_666),
            ("type_nested.parquet", 130_538_033),
            ("type_simple_features.parquet", 28_637_722),
            ("type_strings.parquet", 87_174_822),
            ("fanniemae_2016Q4.gzip.csv", 278_668_126),
            ("fanniemae_2016Q4.lz4.feather", 817_112_994),
            ("fanniemae_2016Q4.snappy.parquet", 153_999_953),
            ("fanniemae_2016Q4.uncompressed.csv", 2_652_731_759),
            ("fanniemae_2016Q4.uncompressed.feather", 4_686_393_634),
            ("fanniemae_2016Q4.uncompressed.parquet", 570_952_947),
            ("fanniemae_sample.gzip.csv", 12_390),
            ("fanniemae_sample.lz4.feather", 44_442),
            ("fanniemae_sample.snappy.parquet", 18_743),
            ("fanniemae_sample.uncompressed.csv", 97_592),
            ("fanniemae_sample.uncompressed.feather", 250_938),
            ("fanniemae_sample.uncompressed.parquet", 24_696),
            ("nyctaxi_2010-01.gzip.csv", 503_844_947),
            ("nyctaxi_2010-01.lz4.feather", 1_175_111_122),
            ("nyctaxi_2010-01.lz4.parquet", 735_273_049),
            ("nyctaxi_2010-01.snappy.parquet", 754_527_953),
            ("nyctaxi_2010-01.uncompressed.csv", 2_005_778_964),
            ("nyctaxi_2010-01.uncompressed.feather", 2_505_803_578),
            ("nyctaxi_2010-01.uncompressed.parquet", 1_246_083_270),
            ("nyctaxi_2010-01.uncompressed.parquet.schema", 14_386),
            ("nyctaxi_sample.gzip.csv", 34_506),
            ("nyctaxi_sample.lz4.feather", 90_738),
            ("nyctaxi_sample.lz4.parquet", 76_861),
            ("nyctaxi_sample.snappy.parquet", 71_533),
            ("nyctaxi_sample.uncompressed.csv", 133_440),
            ("nyctaxi_sample.uncompressed.feather", 180_018),
            ("nyctaxi_sample.uncompressed.parquet", 103_892),
        ];
        let mut table = Self::new();
        for (basename, size) in entries {
            table.insert(basename, size);
        }
        table
    }
}

lazy_static! {
    /// Process-wide expected-size table for the builtin registry.
    pub static ref BUILTIN_SIZES: Arc<SizeTable> = Arc::new(SizeTable::builtin());
}

fn basename(path: &Path) -> &str {
    path.file_name().and_then(|n| n.to_str()).unwrap_or("")
}

/// Returns true when `path` must be (re)produced: it does not exist, or its
/// recorded expected size lands in a different bucket than the size on
/// disk. Files without a recorded size, and exempt basenames, are trusted
/// whenever they exist. Never deletes anything; overwriting a stale file is
/// the caller's job.
pub fn is_stale(path: &Path, sizes: &SizeTable) -> bool {
    let metadata = match fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(_) => return true,
    };
    let name = basename(path);
    if sizes.is_exempt(name) {
        return false;
    }
    match sizes.expected(name) {
        Some(expected) => bytes_bucket(metadata.len()) != bytes_bucket(expected),
        None => false,
    }
}

/// Re-checks `path` after a write and fails with the expected and observed
/// sizes embedded when it still misses its bucket. For basenames without a
/// recorded size, presence is the success criterion.
pub fn verify(path: &Path, sizes: &SizeTable) -> Result<()> {
    let actual = fs::metadata(path)?.len();
    let name = basename(path);
    if sizes.is_exempt(name) {
        return Ok(());
    }
    if let Some(expected) = sizes.expected(name) {
        if bytes_bucket(actual) != bytes_bucket(expected) {
            return Err(ColbenchError::SizeMismatch {
                path: path.to_path_buf(),
                expected: Some(expected),
                actual,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucket_boundaries() {
        assert_eq!("0", bytes_bucket(0));
        assert_eq!("small", bytes_bucket(1));
        assert_eq!("small", bytes_bucket(MIB - 1));
        assert_eq!("1 Mi", bytes_bucket(MIB));
        assert_eq!("150 Mi", bytes_bucket(150 * MIB));
        assert_eq!("1.0 Gi", bytes_bucket(GIB));
        assert_eq!("2.5 Gi", bytes_bucket(2 * GIB + GIB / 2));
        assert_eq!("1.0 Ti", bytes_bucket(TIB));
    }

    #[test]
    fn drift_within_a_bucket_is_not_stale() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("fanniemae_sample.snappy.parquet");
        // A little larger than recorded, but both sizes are "small".
        fs::write(&path, vec![0u8; 19_000])?;
        assert!(!is_stale(&path, &SizeTable::builtin()));
        verify(&path, &SizeTable::builtin())?;
        Ok(())
    }

    #[test]
    fn truncation_is_stale() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("probe.bin");
        let mut sizes = SizeTable::new();
        sizes.insert("probe.bin", 5 * MIB);
        fs::write(&path, vec![0u8; 64])?;
        assert!(is_stale(&path, &sizes));
        match verify(&path, &sizes) {
            Err(ColbenchError::SizeMismatch {
                expected, actual, ..
            }) => {
                assert_eq!(Some(5 * MIB), expected);
                assert_eq!(64, actual);
            }
            other => panic!("expected a size mismatch, got {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn missing_files_are_always_stale() {
        let sizes = SizeTable::new();
        assert!(is_stale(Path::new("/no/such/file"), &sizes));
    }

    #[test]
    fn unknown_basenames_trust_presence() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("anything.bin");
        fs::write(&path, b"x")?;
        assert!(!is_stale(&path, &SizeTable::new()));
        verify(&path, &SizeTable::new())?;
        Ok(())
    }

    #[test]
    fn partition_files_are_exempt() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("data.parquet");
        fs::write(&path, vec![0u8; 3])?;
        // Whatever size they have, existing partition files are trusted.
        assert!(!is_stale(&path, &BUILTIN_SIZES));
        verify(&path, &BUILTIN_SIZES)?;
        // A missing partition file still has to be produced.
        assert!(is_stale(&dir.path().join("missing/data.feather"), &BUILTIN_SIZES));
        Ok(())
    }
}
