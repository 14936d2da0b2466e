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

//! Configuration settings that affect all crates in current system.

use ini::Ini;
use lazy_static::lazy_static;
use reqwest::blocking::Client;

/// Environment variable overriding the root data directory.
pub const COLBENCH_DATA_DIR_VAR: &str = "COLBENCH_DATA_DIR";

lazy_static! {
    /// Global settings.
    pub static ref COLBENCH_CONF: Ini = Ini::load_from_str(include_str!("./config.toml")).unwrap();
    /// Name of the subdirectory of the data directory holding derived artifacts.
    pub static ref COLBENCH_TEMP_DIR: String = COLBENCH_CONF["data"]["temp"].to_string();
    /// Object storage domain used to synthesize URLs for partitioned datasets.
    pub static ref COLBENCH_S3_DOMAIN: String = COLBENCH_CONF["s3"]["domain"].to_string();
    /// Shared blocking HTTP client used by the fetcher.
    pub static ref COLBENCH_HTTP_CLIENT: Client = Client::new();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setting_shows() {
        let conf = Ini::load_from_str(include_str!("./config.toml")).unwrap();

        for (sec, prop) in &conf {
            println!("Section: {:?}", sec);
            for (key, value) in prop.iter() {
                println!("{:?}:{:?}", key, value);
            }
        }

        assert_eq!("data", &conf["data"]["dir"]);
        assert_eq!("temp", &*COLBENCH_TEMP_DIR);
        assert_eq!("amazonaws.com", &*COLBENCH_S3_DOMAIN);
    }
}
