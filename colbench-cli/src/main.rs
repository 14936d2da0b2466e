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

mod datasets;
mod download;
mod materialize;
mod validate;

use anyhow::Result;
use clap::Command;

pub fn main() -> Result<()> {
    env_logger::init();

    let matches = Command::new("colbench-cli")
        .about("Manages the on-disk dataset store behind the colbench benchmarks")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(datasets::command_args())
        .subcommand(download::command_args())
        .subcommand(materialize::command_args())
        .subcommand(validate::command_args())
        .get_matches();

    match matches.subcommand() {
        Some(("list", matches)) => datasets::command(matches),
        Some(("download", matches)) => download::command(matches),
        Some(("materialize", matches)) => materialize::command(matches),
        Some(("validate", matches)) => validate::command(matches),
        _ => unreachable!(),
    }
}
