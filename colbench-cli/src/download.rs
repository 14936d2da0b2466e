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

//! Colbench CLI pre-downloads canonical sources, so the first benchmark
//! run does not pay for multi-gigabyte transfers.

use anyhow::{bail, Result};
use clap::{Arg, ArgMatches, Command};
use colbench::fetch;
use colbench::prelude::*;
use log::info;

pub fn command_args() -> Command<'static> {
    Command::new("download")
        .about("Downloads canonical sources ahead of a benchmark run")
        .arg(
            Arg::new("dataset")
                .value_name("DATASET")
                .help("Datasets to download; every downloadable dataset when omitted")
                .multiple_values(true),
        )
}

pub fn command(matches: &ArgMatches) -> Result<()> {
    let store = Store::open();
    let names: Vec<String> = match matches.values_of("dataset") {
        Some(values) => values.map(String::from).collect(),
        None => store
            .registry()
            .names()
            .into_iter()
            .filter(|name| store.registry().get(name).unwrap().eager())
            .map(String::from)
            .collect(),
    };

    for name in names {
        let descriptor = match store.registry().get(&name) {
            Some(descriptor) => descriptor,
            None => bail!("unknown dataset: {}", name),
        };
        if !descriptor.eager() {
            info!("skipping {}: nothing to download", name);
            continue;
        }
        fetch::ensure_available(&descriptor, store.layout(), store.sizes())?;
        println!("[OK] {}", name);
    }
    Ok(())
}
