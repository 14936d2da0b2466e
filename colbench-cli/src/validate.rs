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

//! Colbench CLI checks everything currently in the store against the
//! expected-size table and reports artifacts that would be regenerated.

use anyhow::{bail, Result};
use clap::{ArgMatches, Command};
use colbench::integrity;
use colbench::prelude::*;
use std::fs;

pub fn command_args() -> Command<'static> {
    Command::new("validate").about("Reports stale or corrupt files in the dataset store")
}

pub fn command(_matches: &ArgMatches) -> Result<()> {
    let store = Store::open();
    let mut stale = 0usize;

    // Canonical sources. Absent files are not an error; they download on
    // first use.
    for name in store.registry().names() {
        let descriptor = store.registry().get(name).unwrap();
        for path in descriptor.canonical_paths(store.layout()) {
            if path.exists() && integrity::is_stale(&path, store.sizes()) {
                println!("stale: {}", path.display());
                stale += 1;
            }
        }
    }

    // Derived artifacts.
    if store.layout().temp_dir().is_dir() {
        for entry in fs::read_dir(store.layout().temp_dir())? {
            let path = entry?.path();
            if !path.is_file() || path.extension().map_or(false, |ext| ext == "lock") {
                continue;
            }
            if integrity::is_stale(&path, store.sizes()) {
                println!("stale: {}", path.display());
                stale += 1;
            }
        }
    }

    if stale > 0 {
        bail!("{} stale file(s); delete them to force regeneration", stale);
    }
    println!("[OK] store is clean");
    Ok(())
}
