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

#![warn(missing_docs, clippy::needless_borrow)]
#![allow(clippy::upper_case_acronyms)]

//! Colbench is the dataset store behind a columnar benchmark suite. It
//! resolves logical dataset names to concrete files on disk, lazily
//! downloads canonical sources from remote object storage, materializes
//! derived (file type, compression) renditions on demand, and checks every
//! artifact against a table of expected sizes before trusting it.

pub mod config;
pub mod encoding;
pub mod error;
pub mod fetch;
pub mod integrity;
pub mod lock;
pub mod paths;
pub mod prelude;
pub mod registry;
pub mod source;
pub mod table;
