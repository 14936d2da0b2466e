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

//! Colbench CLI materializes derived renditions of a dataset, so benchmark
//! runs start from a warm cache.

use anyhow::Result;
use clap::{Arg, ArgMatches, Command};
use colbench::prelude::*;

pub fn command_args() -> Command<'static> {
    Command::new("materialize")
        .about("Materializes a derived rendition of a dataset")
        .arg(
            Arg::new("dataset")
                .value_name("DATASET")
                .help("The dataset to materialize")
                .required(true),
        )
        .arg(
            Arg::new("file type")
                .short('t')
                .long("file-type")
                .value_name("FILE_TYPE")
                .help("Target encoding: csv, parquet, or feather")
                .takes_value(true)
                .default_value("parquet"),
        )
        .arg(
            Arg::new("compression")
                .short('c')
                .long("compression")
                .value_name("COMPRESSION")
                .help("Logical compression: uncompressed, snappy, gzip, lz4, or zstd")
                .takes_value(true)
                .default_value("uncompressed"),
        )
}

pub fn command(matches: &ArgMatches) -> Result<()> {
    let name = matches.value_of("dataset").expect("No dataset provided");
    let file_type: FileType = matches.value_of("file type").unwrap().parse()?;
    let compression: Compression = matches.value_of("compression").unwrap().parse()?;

    let source = Store::open().source(name)?;
    let path = source.materialize(file_type, compression)?;
    println!("{}", path.display());
    Ok(())
}
