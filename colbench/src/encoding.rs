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

//! Target file encodings for derived artifacts and the translation of
//! logical compression names into the token each encoder expects.
//!
//! The three encoders disagree about how "no compression" and codec names
//! are spelled: the csv writer wants the compression argument left out
//! entirely, Parquet wants an explicit none-sentinel, and the IPC writer
//! takes an `Option` of its own codec enum. Benchmarks speak a single
//! logical vocabulary and the translation lives here.

use crate::error::{ColbenchError, Result};
use crate::table::Table;
use arrow::csv::WriterBuilder;
use arrow::ipc::writer::{FileWriter, IpcWriteOptions};
use arrow::ipc::CompressionType;
use flate2::write::GzEncoder;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression as ParquetCompression, GzipLevel, ZstdLevel};
use parquet::file::properties::WriterProperties;
use std::fmt::{Display, Formatter};
use std::fs::File;
use std::path::Path;
use std::str::FromStr;

/// On-disk encodings a dataset can be materialized into. The same tags
/// describe the encoding of canonical source files in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileType {
    /// Row-oriented delimited text.
    Csv,
    /// Columnar format with per-column-chunk compression.
    Parquet,
    /// Arrow IPC on disk, a.k.a. Feather V2.
    Feather,
}

impl FileType {
    /// All target encodings, in a stable order.
    pub const ALL: [FileType; 3] = [FileType::Csv, FileType::Parquet, FileType::Feather];

    /// The file extension and registry tag for this encoding.
    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Csv => "csv",
            FileType::Parquet => "parquet",
            FileType::Feather => "feather",
        }
    }
}

impl Display for FileType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for FileType {
    type Err = ColbenchError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "csv" => Ok(FileType::Csv),
            "parquet" => Ok(FileType::Parquet),
            "feather" => Ok(FileType::Feather),
            _ => Err(ColbenchError::NotImplemented(format!(
                "unknown file type: {}",
                s
            ))),
        }
    }
}

/// Logical compression names shared by all benchmark cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Compression {
    /// No compression.
    Uncompressed,
    /// Snappy, Parquet's default codec.
    Snappy,
    /// DEFLATE-based gzip streams.
    Gzip,
    /// LZ4 frame format.
    Lz4,
    /// Zstandard.
    Zstd,
}

impl Compression {
    /// All logical compressions, in a stable order.
    pub const ALL: [Compression; 5] = [
        Compression::Uncompressed,
        Compression::Snappy,
        Compression::Gzip,
        Compression::Lz4,
        Compression::Zstd,
    ];

    /// The token used in derived file names and on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            Compression::Uncompressed => "uncompressed",
            Compression::Snappy => "snappy",
            Compression::Gzip => "gzip",
            Compression::Lz4 => "lz4",
            Compression::Zstd => "zstd",
        }
    }

    /// Translates to the Parquet writer's codec token. Every logical name
    /// has a Parquet spelling; "uncompressed" becomes the explicit
    /// none-sentinel rather than an absent argument.
    pub fn parquet(&self) -> ParquetCompression {
        match self {
            Compression::Uncompressed => ParquetCompression::UNCOMPRESSED,
            Compression::Snappy => ParquetCompression::SNAPPY,
            Compression::Gzip => ParquetCompression::GZIP(GzipLevel::default()),
            Compression::Lz4 => ParquetCompression::LZ4,
            Compression::Zstd => ParquetCompression::ZSTD(ZstdLevel::default()),
        }
    }

    /// Translates to the IPC writer's codec, where "uncompressed" means no
    /// compression option at all. Feather only buffers lz4 and zstd.
    pub fn feather(&self) -> Result<Option<CompressionType>> {
        match self {
            Compression::Uncompressed => Ok(None),
            Compression::Lz4 => Ok(Some(CompressionType::LZ4_FRAME)),
            Compression::Zstd => Ok(Some(CompressionType::ZSTD)),
            other => Err(ColbenchError::NotImplemented(format!(
                "feather does not support {} compression",
                other
            ))),
        }
    }

    /// Translates to the stream wrapper for csv output: nothing for
    /// "uncompressed", a gzip encoder level for "gzip".
    pub fn csv(&self) -> Result<Option<flate2::Compression>> {
        match self {
            Compression::Uncompressed => Ok(None),
            Compression::Gzip => Ok(Some(flate2::Compression::default())),
            other => Err(ColbenchError::NotImplemented(format!(
                "csv does not support {} compression",
                other
            ))),
        }
    }
}

impl Display for Compression {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Compression {
    type Err = ColbenchError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "uncompressed" => Ok(Compression::Uncompressed),
            "snappy" => Ok(Compression::Snappy),
            "gzip" => Ok(Compression::Gzip),
            "lz4" => Ok(Compression::Lz4),
            "zstd" => Ok(Compression::Zstd),
            _ => Err(ColbenchError::NotImplemented(format!(
                "unknown compression: {}",
                s
            ))),
        }
    }
}

/// Encodes and writes `table` to `path` in the requested encoding.
///
/// # Arguments
/// * `table` - The in-memory table to encode.
/// * `path` - The destination file.
/// * `file_type` - The target encoding.
/// * `compression` - The logical compression name to translate.
pub fn write_table(
    table: &Table,
    path: &Path,
    file_type: FileType,
    compression: Compression,
) -> Result<()> {
    match file_type {
        FileType::Csv => write_csv(table, path, compression),
        FileType::Parquet => write_parquet(table, path, compression),
        FileType::Feather => write_feather(table, path, compression),
    }
}

// Always writes a comma separated csv with a header, even if the canonical
// source file lacked a header or was pipe delimited.
fn write_csv(table: &Table, path: &Path, compression: Compression) -> Result<()> {
    let file = File::create(path)?;
    match compression.csv()? {
        Some(level) => {
            let mut writer = WriterBuilder::new()
                .with_header(true)
                .build(GzEncoder::new(file, level));
            for batch in &table.batches {
                writer.write(batch)?;
            }
            // Drop swallows encoder errors; finish the gzip stream by hand.
            writer.into_inner().finish()?;
        }
        None => {
            let mut writer = WriterBuilder::new().with_header(true).build(file);
            for batch in &table.batches {
                writer.write(batch)?;
            }
        }
    }
    Ok(())
}

fn write_parquet(table: &Table, path: &Path, compression: Compression) -> Result<()> {
    let file = File::create(path)?;
    let props = WriterProperties::builder()
        .set_compression(compression.parquet())
        .build();
    let mut writer = ArrowWriter::try_new(file, table.schema.clone(), Some(props))?;
    for batch in &table.batches {
        writer.write(batch)?;
    }
    writer.close()?;
    Ok(())
}

fn write_feather(table: &Table, path: &Path, compression: Compression) -> Result<()> {
    let file = File::create(path)?;
    let options = IpcWriteOptions::default().try_with_compression(compression.feather()?)?;
    let mut writer = FileWriter::try_new_with_options(file, table.schema.as_ref(), options)?;
    for batch in &table.batches {
        writer.write(batch)?;
    }
    writer.finish()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_compression_vocabulary() {
        assert!(matches!(Compression::Uncompressed.csv(), Ok(None)));
        assert!(matches!(Compression::Gzip.csv(), Ok(Some(_))));
        for unsupported in [Compression::Snappy, Compression::Lz4, Compression::Zstd] {
            assert!(unsupported.csv().is_err());
        }
    }

    #[test]
    fn parquet_compression_vocabulary() {
        // Parquet spells every logical name, including an explicit
        // none-sentinel for "uncompressed".
        assert_eq!(
            ParquetCompression::UNCOMPRESSED,
            Compression::Uncompressed.parquet()
        );
        assert_eq!(ParquetCompression::SNAPPY, Compression::Snappy.parquet());
        assert_eq!(
            ParquetCompression::GZIP(GzipLevel::default()),
            Compression::Gzip.parquet()
        );
        assert_eq!(ParquetCompression::LZ4, Compression::Lz4.parquet());
        assert_eq!(
            ParquetCompression::ZSTD(ZstdLevel::default()),
            Compression::Zstd.parquet()
        );
    }

    #[test]
    fn feather_compression_vocabulary() {
        assert_eq!(None, Compression::Uncompressed.feather().unwrap());
        assert_eq!(
            Some(CompressionType::LZ4_FRAME),
            Compression::Lz4.feather().unwrap()
        );
        assert_eq!(
            Some(CompressionType::ZSTD),
            Compression::Zstd.feather().unwrap()
        );
        for unsupported in [Compression::Snappy, Compression::Gzip] {
            assert!(unsupported.feather().is_err());
        }
    }

    #[test]
    fn every_pair_is_mapped_or_rejected() {
        // The translator must give a definite answer for the full grid;
        // none of these calls may panic.
        for compression in Compression::ALL {
            let _ = compression.csv();
            let _ = compression.feather();
            let _ = compression.parquet();
        }
    }

    #[test]
    fn tokens_round_trip_through_from_str() {
        for file_type in FileType::ALL {
            assert_eq!(file_type, file_type.as_str().parse().unwrap());
        }
        for compression in Compression::ALL {
            assert_eq!(compression, compression.as_str().parse().unwrap());
        }
        assert!("brotli".parse::<Compression>().is_err());
        assert!("orc".parse::<FileType>().is_err());
    }
}
