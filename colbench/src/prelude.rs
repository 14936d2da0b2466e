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

//! A "prelude" for users of the colbench crate.
//!
//! Like the standard library's prelude, this module simplifies importing of
//! common items. Unlike the standard prelude, the contents of this module must
//! be imported manually:
//!
//! ```
//! use colbench::prelude::*;
//! ```

pub use crate::config::COLBENCH_CONF;
pub use crate::encoding::{Compression, FileType};
pub use crate::error::{ColbenchError, Result};
pub use crate::integrity::SizeTable;
pub use crate::paths::DataLayout;
pub use crate::registry::{Descriptor, Location, Registry};
pub use crate::source::{Source, Store};
pub use crate::table::Table;
