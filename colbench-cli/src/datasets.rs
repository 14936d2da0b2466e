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

//! Colbench CLI lists the datasets in the registry.

use anyhow::Result;
use clap::{ArgMatches, Command};
use colbench::prelude::*;

pub fn command_args() -> Command<'static> {
    Command::new("list").about("Lists the registered datasets")
}

pub fn command(_matches: &ArgMatches) -> Result<()> {
    let store = Store::open();
    for name in store.registry().names() {
        let descriptor = store.registry().get(name).unwrap();
        let residence = match &descriptor.location {
            Location::Local { file } => format!("fixture {}", file),
            Location::Remote { url, .. } => format!("remote {}", url),
            Location::Partitioned { keys, region } => {
                format!("{} object keys in {}", keys.len(), region)
            }
        };
        println!("{:<42} {:<8} {}", name, descriptor.format, residence);
    }
    Ok(())
}
