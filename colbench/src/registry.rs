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

//! The dataset registry: a static mapping from logical dataset names to
//! descriptors saying where each dataset's bytes live and how to parse
//! them. Pure data; behavior lives in the fetcher and the source facade.

use crate::config::COLBENCH_S3_DOMAIN;
use crate::encoding::FileType;
use crate::error::{ColbenchError, Result};
use crate::paths::DataLayout;
use arrow::datatypes::{DataType, Field, Schema, SchemaRef, TimeUnit};
use itertools::iproduct;
use lazy_static::lazy_static;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Where a dataset's canonical bytes reside.
#[derive(Debug, Clone)]
pub enum Location {
    /// A small fixture committed to the repository data directory.
    Local {
        /// Basename of the fixture file.
        file: String,
    },
    /// A single file fetched from remote storage on first use and cached
    /// in the data directory.
    Remote {
        /// Basename of the cached file.
        file: String,
        /// Fully qualified download URL.
        url: String,
    },
    /// A sharded dataset addressed by object-storage keys. Benchmarks read
    /// these through their remote filesystem; the store never fetches them
    /// in full.
    Partitioned {
        /// Object keys, `{bucket}/{path...}`.
        keys: Vec<String>,
        /// Object storage region hosting the bucket.
        region: String,
    },
}

/// Registry entry describing one logical dataset. Every descriptor
/// resolves to concrete bytes on disk one way or another: a fixture path,
/// a cached download, or a list of precomputed remote keys.
#[derive(Debug, Clone)]
pub struct Descriptor {
    /// Encoding of the canonical file(s) themselves.
    pub format: FileType,
    /// Where the canonical bytes live.
    pub location: Location,
    /// Field delimiter for csv canonicals.
    pub delimiter: Option<u8>,
    /// Whether a csv canonical starts with a header line.
    pub header: bool,
    /// Declared column schema; csv parsing falls back to inference
    /// without one.
    pub schema: Option<SchemaRef>,
}

impl Descriptor {
    /// A fixture dataset committed to the repository.
    pub fn local(format: FileType, file: &str) -> Self {
        Self {
            format,
            location: Location::Local {
                file: file.to_string(),
            },
            delimiter: None,
            header: true,
            schema: None,
        }
    }

    /// A dataset downloaded from `url` and cached as `file`.
    pub fn remote(format: FileType, file: &str, url: &str) -> Self {
        Self {
            format,
            location: Location::Remote {
                file: file.to_string(),
                url: url.to_string(),
            },
            delimiter: None,
            header: true,
            schema: None,
        }
    }

    /// A sharded dataset resident in object storage.
    pub fn partitioned(format: FileType, keys: Vec<String>, region: &str) -> Self {
        Self {
            format,
            location: Location::Partitioned {
                keys,
                region: region.to_string(),
            },
            delimiter: None,
            header: true,
            schema: None,
        }
    }

    /// Sets the csv parse options.
    pub fn csv_options(mut self, delimiter: u8, header: bool) -> Self {
        self.delimiter = Some(delimiter);
        self.header = header;
        self
    }

    /// Sets the declared column schema.
    pub fn with_schema(mut self, schema: SchemaRef) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Whether the dataset is downloaded as soon as a source handle is
    /// constructed. Fixtures need no fetch and partitioned datasets are
    /// never fetched in full.
    pub fn eager(&self) -> bool {
        matches!(self.location, Location::Remote { .. })
    }

    /// The canonical on-disk path(s) of this dataset under `layout`.
    /// Partitioned datasets resolve to one path per key; everything else
    /// to exactly one path.
    pub fn canonical_paths(&self, layout: &DataLayout) -> Vec<PathBuf> {
        match &self.location {
            Location::Local { file } => vec![layout.fixture(file)],
            Location::Remote { file, .. } => vec![layout.canonical(file)],
            Location::Partitioned { keys, .. } => {
                keys.iter().map(|key| layout.canonical(key)).collect()
            }
        }
    }

    /// The download URL for the canonical path at `index`: the descriptor's
    /// own URL for remote datasets, or a URL synthesized from the bucket,
    /// region, and key for partitioned ones.
    pub fn object_url(&self, index: usize) -> Result<String> {
        match &self.location {
            Location::Remote { url, .. } => Ok(url.clone()),
            Location::Partitioned { keys, region } => {
                let key = keys.get(index).ok_or_else(|| {
                    ColbenchError::Internal(format!("no object key at index {}", index))
                })?;
                let (bucket, rest) = key.split_once('/').ok_or_else(|| {
                    ColbenchError::Internal(format!("malformed object key: {}", key))
                })?;
                Ok(format!(
                    "https://{}.s3.{}.{}/{}",
                    bucket,
                    region,
                    &*COLBENCH_S3_DOMAIN,
                    rest
                ))
            }
            Location::Local { file } => Err(ColbenchError::Internal(format!(
                "fixture {} has no remote location",
                file
            ))),
        }
    }
}

/// The mapping from logical dataset names to descriptors. Loaded once at
/// startup and passed by reference into everything that resolves datasets,
/// so tests can substitute fixture registries.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    entries: HashMap<String, Arc<Descriptor>>,
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `descriptor` under `name`, replacing any previous entry.
    pub fn register(&mut self, name: &str, descriptor: Descriptor) {
        self.entries.insert(name.to_string(), Arc::new(descriptor));
    }

    /// Looks up a dataset by logical name.
    pub fn get(&self, name: &str) -> Option<Arc<Descriptor>> {
        self.entries.get(name).cloned()
    }

    /// All registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(|k| k.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Number of registered datasets.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The datasets benchmarks run against.
    pub fn builtin() -> Self {
        let mut registry = Self::new();

        registry.register(
            "fanniemae_sample",
            Descriptor::local(FileType::Csv, "fanniemae_sample.csv")
                .csv_options(b'|', false)
                .with_schema(fannie_mae_schema()),
        );
        registry.register(
            "nyctaxi_sample",
            Descriptor::local(FileType::Csv, "nyctaxi_sample.csv")
                .csv_options(b',', true)
                .with_schema(nyctaxi_schema()),
        );
        registry.register(
            "chi_traffic_sample",
            Descriptor::local(FileType::Parquet, "chi_traffic_sample.parquet"),
        );

        registry.register(
            "fanniemae_2016Q4",
            Descriptor::remote(
                FileType::Csv,
                "fanniemae_2016Q4.csv.gz",
                "https://ursa-qa.s3.amazonaws.com/fanniemae_loanperf/2016Q4.csv.gz",
            )
            .csv_options(b'|', false)
            .with_schema(fannie_mae_schema()),
        );
        registry.register(
            "nyctaxi_2010-01",
            Descriptor::remote(
                FileType::Csv,
                "nyctaxi_2010-01.csv.gz",
                "https://ursa-qa.s3.amazonaws.com/nyctaxi/yellow_tripdata_2010-01.csv.gz",
            )
            .csv_options(b',', true)
            .with_schema(nyctaxi_schema()),
        );
        registry.register(
            "chi_traffic_2020_Q1",
            Descriptor::remote(
                FileType::Parquet,
                "chi_traffic_2020_Q1.parquet",
                "https://ursa-qa.s3.amazonaws.com/chitraffic/chi_traffic_2020_Q1.parquet",
            ),
        );
        for name in [
            "type_strings",
            "type_dict",
            "type_integers",
            "type_floats",
            "type_nested",
            "type_simple_features",
        ] {
            registry.register(
                name,
                Descriptor::remote(
                    FileType::Parquet,
                    &format!("{}.parquet", name),
                    &format!("https://ursa-qa.s3.amazonaws.com/single_types/{}.parquet", name),
                ),
            );
        }

        registry.register(
            "nyctaxi_multi_parquet_s3",
            Descriptor::partitioned(
                FileType::Parquet,
                (1..=4)
                    .map(|month| format!("ursa-labs-taxi-data/2009/{:02}/data.parquet", month))
                    .collect(),
                "us-east-2",
            )
            .with_schema(nyctaxi_schema()),
        );
        registry.register(
            "nyctaxi_multi_ipc_s3",
            Descriptor::partitioned(
                FileType::Feather,
                (1..=4)
                    .map(|month| format!("ursa-labs-taxi-data-ipc/2013/{:02}/data.feather", month))
                    .collect(),
                "us-east-2",
            )
            .with_schema(nyctaxi_schema()),
        );
        registry.register(
            "nyctaxi_multi_parquet_s3_sample",
            Descriptor::partitioned(
                FileType::Parquet,
                vec![
                    "ursa-labs-taxi-data-sample/2009/02/data.parquet".to_string(),
                    "ursa-labs-taxi-data-sample/2009/01/data.parquet".to_string(),
                ],
                "us-east-2",
            )
            .with_schema(nyctaxi_schema()),
        );
        registry.register(
            "nyctaxi_multi_ipc_s3_sample",
            Descriptor::partitioned(
                FileType::Feather,
                vec![
                    "ursa-labs-taxi-data-sample-ipc/2009/02/data.feather".to_string(),
                    "ursa-labs-taxi-data-sample-ipc/2009/01/data.feather".to_string(),
                ],
                "us-east-2",
            )
            .with_schema(nyctaxi_schema()),
        );
        registry.register(
            "nyctaxi_multi_parquet_s3_repartitioned",
            Descriptor::partitioned(FileType::Parquet, repartitioned_taxi_keys(), "us-east-2")
                .with_schema(nyctaxi_schema()),
        );

        registry
    }
}

lazy_static! {
    /// Process-wide dataset registry.
    pub static ref BUILTIN_REGISTRY: Arc<Registry> = Arc::new(Registry::builtin());
}

/// Object keys of the 10k-row repartitioned taxi dataset. The upstream data
/// ends in 2019/06 and is missing 2010/03.
fn repartitioned_taxi_keys() -> Vec<String> {
    iproduct!(2009..2020, 1..13, 0..101)
        .filter(|&(year, month, _)| !(year == 2019 && month > 6) && !(year == 2010 && month == 3))
        .map(|(year, month, part)| {
            format!(
                "ursa-labs-taxi-data-repartitioned-10k/{}/{:02}/{:04}/data.parquet",
                year, month, part
            )
        })
        .collect()
}

/// Reconstructed schema of the Fannie Mae single-family loan performance
/// data. Not authoritative, but serviceably accurate; names follow the
/// upstream data dictionary.
pub fn fannie_mae_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("LOAN_ID", DataType::Utf8, true),
        // Monthly reporting period, a date.
        Field::new("ACT_PERIOD", DataType::Utf8, true),
        Field::new("SERVICER", DataType::Utf8, true),
        Field::new("ORIG_RATE", DataType::Float64, true),
        Field::new("CURRENT_UPB", DataType::Float64, true),
        Field::new("LOAN_AGE", DataType::Int32, true),
        Field::new("REM_MONTHS", DataType::Int32, true),
        Field::new("ADJ_REM_MONTHS", DataType::Int32, true),
        // Maturity date.
        Field::new("MATR_DT", DataType::Utf8, true),
        // Metropolitan Statistical Area code.
        Field::new("MSA", DataType::Utf8, true),
        // Months of delinquency, but `X` is a valid value.
        Field::new("DLQ_STATUS", DataType::Utf8, true),
        Field::new("RELOCATION_MORTGAGE_INDICATOR", DataType::Utf8, true),
        // Zero-padded two digit categorical codes, e.g. "01".
        Field::new("Zero_Bal_Code", DataType::Utf8, true),
        Field::new("ZB_DTE", DataType::Utf8, true),
        Field::new("LAST_PAID_INSTALLMENT_DATE", DataType::Utf8, true),
        Field::new("FORECLOSURE_DATE", DataType::Utf8, true),
        Field::new("DISPOSITION_DATE", DataType::Utf8, true),
        Field::new("FORECLOSURE_COSTS", DataType::Float64, true),
        Field::new("PROPERTY_PRESERVATION_AND_REPAIR_COSTS", DataType::Float64, true),
        Field::new("ASSET_RECOVERY_COSTS", DataType::Float64, true),
        Field::new("MISCELLANEOUS_HOLDING_EXPENSES_AND_CREDITS", DataType::Float64, true),
        Field::new("ASSOCIATED_TAXES_FOR_HOLDING_PROPERTY", DataType::Float64, true),
        Field::new("NET_SALES_PROCEEDS", DataType::Float64, true),
        Field::new("CREDIT_ENHANCEMENT_PROCEEDS", DataType::Float64, true),
        Field::new("REPURCHASES_MAKE_WHOLE_PROCEEDS", DataType::Float64, true),
        Field::new("OTHER_FORECLOSURE_PROCEEDS", DataType::Float64, true),
        Field::new("NON_INTEREST_BEARING_UPB", DataType::Float64, true),
        // All null in the 2016Q4 extract.
        Field::new("MI_CANCEL_FLAG", DataType::Utf8, true),
        Field::new("RE_PROCS_FLAG", DataType::Utf8, true),
        // All null in the 2016Q4 extract.
        Field::new("LOAN_HOLDBACK_INDICATOR", DataType::Utf8, true),
        Field::new("SERV_IND", DataType::Utf8, true),
    ]))
}

/// Schema of the NYC yellow taxi trip records.
pub fn nyctaxi_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("vendor_id", DataType::Utf8, true),
        Field::new(
            "pickup_datetime",
            DataType::Timestamp(TimeUnit::Nanosecond, None),
            true,
        ),
        Field::new(
            "dropoff_datetime",
            DataType::Timestamp(TimeUnit::Nanosecond, None),
            true,
        ),
        Field::new("passenger_count", DataType::Int64, true),
        Field::new("trip_distance", DataType::Float64, true),
        Field::new("pickup_longitude", DataType::Float64, true),
        Field::new("pickup_latitude", DataType::Float64, true),
        Field::new("rate_code", DataType::Int64, true),
        Field::new("store_and_fwd_flag", DataType::Float64, true),
        Field::new("dropoff_longitude", DataType::Float64, true),
        Field::new("dropoff_latitude", DataType::Float64, true),
        Field::new("payment_type", DataType::Utf8, true),
        Field::new("fare_amount", DataType::Float64, true),
        Field::new("surcharge", DataType::Float64, true),
        Field::new("mta_tax", DataType::Float64, true),
        Field::new("tip_amount", DataType::Float64, true),
        Field::new("tolls_amount", DataType::Float64, true),
        Field::new("total_amount", DataType::Float64, true),
    ]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_is_complete() {
        let registry = Registry::builtin();
        for name in [
            "fanniemae_sample",
            "nyctaxi_sample",
            "chi_traffic_sample",
            "fanniemae_2016Q4",
            "nyctaxi_2010-01",
            "chi_traffic_2020_Q1",
            "type_strings",
            "type_dict",
            "type_integers",
            "type_floats",
            "type_nested",
            "type_simple_features",
            "nyctaxi_multi_parquet_s3",
            "nyctaxi_multi_ipc_s3",
            "nyctaxi_multi_parquet_s3_sample",
            "nyctaxi_multi_ipc_s3_sample",
            "nyctaxi_multi_parquet_s3_repartitioned",
        ] {
            assert!(registry.get(name).is_some(), "missing dataset: {}", name);
        }
        assert_eq!(17, registry.len());
    }

    #[test]
    fn every_descriptor_resolves_to_paths() {
        let registry = Registry::builtin();
        let layout = DataLayout::at("/data");
        for name in registry.names() {
            let descriptor = registry.get(name).unwrap();
            let paths = descriptor.canonical_paths(&layout);
            assert!(!paths.is_empty(), "{} resolves to nothing", name);
        }
    }

    #[test]
    fn only_remote_single_files_are_eager() {
        let registry = Registry::builtin();
        assert!(registry.get("fanniemae_2016Q4").unwrap().eager());
        assert!(!registry.get("fanniemae_sample").unwrap().eager());
        assert!(!registry.get("nyctaxi_multi_parquet_s3").unwrap().eager());
    }

    #[test]
    fn repartitioned_keys_skip_missing_months() {
        let keys = repartitioned_taxi_keys();
        // 11 years x 12 months x 101 parts, minus 2019/07-12 and 2010/03.
        assert_eq!(11 * 12 * 101 - 7 * 101, keys.len());
        assert_eq!(
            "ursa-labs-taxi-data-repartitioned-10k/2009/01/0000/data.parquet",
            keys[0]
        );
        assert!(!keys.iter().any(|k| k.contains("/2010/03/")));
        assert!(!keys.iter().any(|k| k.contains("/2019/07/")));
    }

    #[test]
    fn partitioned_urls_are_synthesized() -> Result<()> {
        let registry = Registry::builtin();
        let descriptor = registry.get("nyctaxi_multi_parquet_s3_sample").unwrap();
        assert_eq!(
            "https://ursa-labs-taxi-data-sample.s3.us-east-2.amazonaws.com/2009/02/data.parquet",
            descriptor.object_url(0)?
        );
        assert!(descriptor.object_url(99).is_err());
        Ok(())
    }

    #[test]
    fn schema_shapes() {
        assert_eq!(31, fannie_mae_schema().fields().len());
        assert_eq!(18, nyctaxi_schema().fields().len());
    }
}
