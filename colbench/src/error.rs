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

//! Colbench error types

use arrow::error::ArrowError;
use datafusion::error::DataFusionError;
use parquet::errors::ParquetError;

use std::error;
use std::fmt::{Display, Formatter};
use std::io;
use std::path::PathBuf;
use std::result;

/// Result type for operations that could result in an [ColbenchError]
pub type Result<T> = result::Result<T, ColbenchError>;

/// Colbench error
#[derive(Debug)]
pub enum ColbenchError {
    /// Error returned when a logical dataset name is not in the registry.
    UnknownDataset(String),
    /// Error returned when an on-disk artifact does not match its expected
    /// size after a download or a format conversion. A mismatch right after
    /// a download means the transfer was truncated.
    SizeMismatch {
        /// The offending artifact.
        path: PathBuf,
        /// Size recorded in the expected-size table, if any.
        expected: Option<u64>,
        /// Size observed on disk.
        actual: u64,
    },
    /// Error associated to I/O operations and associated traits.
    IoError(io::Error),
    /// Error returned when Arrow is unexpectedly executed.
    Arrow(ArrowError),
    /// Error returned when the Parquet encoder or decoder fails.
    Parquet(ParquetError),
    /// Error returned when DataFusion is unexpectedly executed.
    DataFusion(DataFusionError),
    /// Error returned when a download from remote object storage fails.
    Http(reqwest::Error),
    /// Error returned on a branch that we know it is possible but to which we
    /// still have no implementation for. Often, these errors are tracked in our
    /// issue tracker.
    NotImplemented(String),
    /// Error returned as a consequence of an error in Colbench.
    /// This error should not happen in normal usage of Colbench.
    /// Colbench has internal invariants that we are unable to ask the
    /// compiler to check for us. This error is raised when one of those
    /// invariants is not verified during execution.
    Internal(String),
}

impl From<io::Error> for ColbenchError {
    fn from(e: io::Error) -> Self {
        ColbenchError::IoError(e)
    }
}

impl From<ArrowError> for ColbenchError {
    fn from(e: ArrowError) -> Self {
        ColbenchError::Arrow(e)
    }
}

impl From<ParquetError> for ColbenchError {
    fn from(e: ParquetError) -> Self {
        ColbenchError::Parquet(e)
    }
}

impl From<DataFusionError> for ColbenchError {
    fn from(e: DataFusionError) -> Self {
        ColbenchError::DataFusion(e)
    }
}

impl From<reqwest::Error> for ColbenchError {
    fn from(e: reqwest::Error) -> Self {
        ColbenchError::Http(e)
    }
}

impl From<&str> for ColbenchError {
    fn from(e: &str) -> Self {
        ColbenchError::Internal(e.to_string())
    }
}

impl Display for ColbenchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match *self {
            ColbenchError::UnknownDataset(ref name) => {
                write!(f, "Unknown dataset: {} is not in the registry", name)
            }
            ColbenchError::SizeMismatch {
                ref path,
                expected,
                actual,
            } => write!(
                f,
                "Size mismatch for {}: expected {} bytes, observed {} bytes. \
                    Delete the file to force a fresh copy on the next run",
                path.display(),
                expected.map_or_else(|| "unknown".to_string(), |e| e.to_string()),
                actual
            ),
            ColbenchError::IoError(ref desc) => write!(f, "IO error: {}", desc),
            ColbenchError::Arrow(ref desc) => write!(f, "Arrow error: {}", desc),
            ColbenchError::Parquet(ref desc) => write!(f, "Parquet error: {}", desc),
            ColbenchError::DataFusion(ref desc) => write!(f, "DataFusion error: {:?}", desc),
            ColbenchError::Http(ref desc) => write!(f, "HTTP error: {}", desc),
            ColbenchError::NotImplemented(ref desc) => {
                write!(f, "This feature is not implemented: {}", desc)
            }
            ColbenchError::Internal(ref desc) => write!(
                f,
                "Internal error: {}. This was likely caused by a bug in Colbench's \
                    code and we would welcome that you file an bug report in our issue tracker",
                desc
            ),
        }
    }
}

impl error::Error for ColbenchError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn size_mismatch_names_the_offending_path() {
        let err = ColbenchError::SizeMismatch {
            path: Path::new("/data/temp/nyctaxi_sample.snappy.parquet").to_path_buf(),
            expected: Some(71533),
            actual: 12,
        };
        let msg = format!("{}", err);
        assert!(msg.contains("nyctaxi_sample.snappy.parquet"));
        assert!(msg.contains("71533"));
        assert!(msg.contains("12"));
    }

    #[test]
    fn unknown_dataset_names_the_request() {
        let msg = format!("{}", ColbenchError::UnknownDataset("nope".to_string()));
        assert!(msg.contains("nope"));
    }
}
