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

//! The in-memory columnar representation of a canonical dataset, and the
//! readers that produce it from each on-disk encoding.

use crate::error::Result;
use arrow::csv::reader::Format;
use arrow::csv::ReaderBuilder;
use arrow::datatypes::SchemaRef;
use arrow::error::ArrowError;
use arrow::ipc::reader::FileReader;
use arrow::record_batch::RecordBatch;
use flate2::read::GzDecoder;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::sync::Arc;

/// A fully parsed dataset: its schema and record batches. Never mutated
/// after creation.
#[derive(Debug, Clone)]
pub struct Table {
    /// The table schema, declared by the registry or inferred at parse time.
    pub schema: SchemaRef,
    /// The table data.
    pub batches: Vec<RecordBatch>,
}

impl Table {
    /// Total number of rows across all record batches.
    pub fn num_rows(&self) -> usize {
        self.batches.iter().map(|b| b.num_rows()).sum()
    }

    /// The column names, in schema order.
    pub fn column_names(&self) -> Vec<String> {
        self.schema
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect()
    }
}

/// Opens `path` for reading, transparently gunzipping compressed files.
/// Derived gzip renditions keep a `.csv` extension, so gzip is detected by
/// the stream's magic bytes rather than by name.
fn open_maybe_gzip(path: &Path) -> Result<Box<dyn Read>> {
    let mut probe = [0u8; 2];
    let read = File::open(path)?.read(&mut probe)?;
    let file = File::open(path)?;
    if read == 2 && probe == [0x1f, 0x8b] {
        Ok(Box::new(GzDecoder::new(file)))
    } else {
        Ok(Box::new(file))
    }
}

/// Reads a delimited text file into a [Table].
///
/// # Arguments
/// * `path` - The csv file, optionally gzip compressed.
/// * `delimiter` - The field delimiter; comma when not given.
/// * `header` - Whether the first line holds column names.
/// * `schema` - The declared column schema. When absent the schema is
///   inferred from the data, which costs an extra pass over the file.
pub fn read_csv(
    path: &Path,
    delimiter: Option<u8>,
    header: bool,
    schema: Option<SchemaRef>,
) -> Result<Table> {
    let delimiter = delimiter.unwrap_or(b',');
    let schema = match schema {
        Some(schema) => schema,
        None => {
            let format = Format::default()
                .with_header(header)
                .with_delimiter(delimiter);
            let (inferred, _) = format.infer_schema(open_maybe_gzip(path)?, None)?;
            Arc::new(inferred)
        }
    };

    let reader = ReaderBuilder::new(schema.clone())
        .with_header(header)
        .with_delimiter(delimiter)
        .build_buffered(BufReader::new(open_maybe_gzip(path)?))?;
    let batches = reader.collect::<std::result::Result<Vec<_>, ArrowError>>()?;
    Ok(Table { schema, batches })
}

/// Reads a Parquet file into a [Table].
pub fn read_parquet(path: &Path) -> Result<Table> {
    let builder = ParquetRecordBatchReaderBuilder::try_new(File::open(path)?)?;
    let schema = builder.schema().clone();
    let batches = builder
        .build()?
        .collect::<std::result::Result<Vec<_>, ArrowError>>()?;
    Ok(Table { schema, batches })
}

/// Reads an Arrow IPC (Feather V2) file into a [Table].
pub fn read_feather(path: &Path) -> Result<Table> {
    let reader = FileReader::try_new(File::open(path)?, None)?;
    let schema = reader.schema();
    let batches = reader.collect::<std::result::Result<Vec<_>, ArrowError>>()?;
    Ok(Table { schema, batches })
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::datatypes::{DataType, Field, Schema};
    use flate2::write::GzEncoder;
    use std::io::Write;

    fn scratch_csv(dir: &Path, name: &str, body: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn csv_with_declared_schema() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = scratch_csv(dir.path(), "t.csv", "1|a\n2|b\n3|c\n");
        let schema = Arc::new(Schema::new(vec![
            Field::new("id", DataType::Int64, true),
            Field::new("tag", DataType::Utf8, true),
        ]));
        let table = read_csv(&path, Some(b'|'), false, Some(schema))?;
        assert_eq!(3, table.num_rows());
        assert_eq!(vec!["id", "tag"], table.column_names());
        Ok(())
    }

    #[test]
    fn csv_with_inferred_schema() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = scratch_csv(dir.path(), "t.csv", "id,score\n1,0.5\n2,1.5\n");
        let table = read_csv(&path, None, true, None)?;
        assert_eq!(2, table.num_rows());
        assert_eq!(vec!["id", "score"], table.column_names());
        Ok(())
    }

    #[test]
    fn gzipped_csv_reads_transparently() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("t.csv.gz");
        let mut encoder = GzEncoder::new(File::create(&path)?, flate2::Compression::default());
        encoder.write_all(b"id,tag\n1,a\n2,b\n")?;
        encoder.finish()?;

        let table = read_csv(&path, None, true, None)?;
        assert_eq!(2, table.num_rows());
        Ok(())
    }
}
