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

//! Downloads canonical source files from remote object storage.
//!
//! Transfers are plain unauthenticated HTTPS GETs, blocking, with the
//! client's default timeouts. Every freshly written file is re-checked
//! against the expected-size table; a transfer that ends early leaves a
//! file the oracle rejects, so a half-written download can never pass for
//! a valid cache entry.

use crate::config::COLBENCH_HTTP_CLIENT;
use crate::error::Result;
use crate::integrity::{self, SizeTable};
use crate::lock::PathLock;
use crate::paths::DataLayout;
use crate::registry::Descriptor;
use log::{debug, info};
use std::fs::{self, File};
use std::io;
use std::path::Path;

/// Ensures every canonical file of `descriptor` exists locally and matches
/// its expected size, downloading whatever is missing or stale.
///
/// # Arguments
/// * `descriptor` - The dataset whose canonical files are wanted.
/// * `layout` - Resolves the canonical paths.
/// * `sizes` - The expected-size table consulted before and after each
///   download.
pub fn ensure_available(
    descriptor: &Descriptor,
    layout: &DataLayout,
    sizes: &SizeTable,
) -> Result<()> {
    for (index, path) in descriptor.canonical_paths(layout).iter().enumerate() {
        if !integrity::is_stale(path, sizes) {
            debug!("cache hit: {}", path.display());
            continue;
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let _lock = PathLock::acquire(path)?;
        if !integrity::is_stale(path, sizes) {
            // Another process finished the download while we waited.
            continue;
        }
        let url = descriptor.object_url(index)?;
        info!("downloading {} to {}", url, path.display());
        download(&url, path)?;
        integrity::verify(path, sizes)?;
    }
    Ok(())
}

/// Streams the body of `url` into `path`.
fn download(url: &str, path: &Path) -> Result<()> {
    let mut response = COLBENCH_HTTP_CLIENT.get(url).send()?.error_for_status()?;
    let mut file = File::create(path)?;
    io::copy(&mut response, &mut file)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::FileType;
    use crate::error::ColbenchError;
    use crate::registry::Descriptor;

    fn remote_descriptor(server: &mockito::ServerGuard, file: &str) -> Descriptor {
        Descriptor::remote(
            FileType::Parquet,
            file,
            &format!("{}/{}", server.url(), file),
        )
    }

    #[test]
    fn download_writes_and_verifies() -> Result<()> {
        let mut server = mockito::Server::new();
        let body = vec![0u8; 2048];
        let mock = server
            .mock("GET", "/blob.parquet")
            .with_status(200)
            .with_body(&body)
            .expect(1)
            .create();

        let dir = tempfile::tempdir()?;
        let layout = DataLayout::at(dir.path());
        let mut sizes = SizeTable::new();
        sizes.insert("blob.parquet", 2048);

        let descriptor = remote_descriptor(&server, "blob.parquet");
        ensure_available(&descriptor, &layout, &sizes)?;
        assert_eq!(2048, fs::metadata(layout.canonical("blob.parquet"))?.len());

        // The file is now trusted; a second pass must not re-download.
        ensure_available(&descriptor, &layout, &sizes)?;
        mock.assert();
        Ok(())
    }

    #[test]
    fn truncated_transfer_is_rejected() -> Result<()> {
        let mut server = mockito::Server::new();
        server
            .mock("GET", "/blob.parquet")
            .with_status(200)
            .with_body(vec![0u8; 16])
            .create();

        let dir = tempfile::tempdir()?;
        let layout = DataLayout::at(dir.path());
        let mut sizes = SizeTable::new();
        sizes.insert("blob.parquet", 8 * 1024 * 1024);

        let descriptor = remote_descriptor(&server, "blob.parquet");
        match ensure_available(&descriptor, &layout, &sizes) {
            Err(ColbenchError::SizeMismatch { actual, .. }) => assert_eq!(16, actual),
            other => panic!("expected a size mismatch, got {:?}", other),
        }
        // The stump stays behind but remains stale, so the next run
        // attempts the download again.
        assert!(integrity::is_stale(
            &layout.canonical("blob.parquet"),
            &sizes
        ));
        Ok(())
    }

    #[test]
    fn http_errors_propagate() -> Result<()> {
        let mut server = mockito::Server::new();
        server
            .mock("GET", "/blob.parquet")
            .with_status(404)
            .create();

        let dir = tempfile::tempdir()?;
        let layout = DataLayout::at(dir.path());
        let mut sizes = SizeTable::new();
        sizes.insert("blob.parquet", 1024);

        let descriptor = remote_descriptor(&server, "blob.parquet");
        assert!(matches!(
            ensure_available(&descriptor, &layout, &sizes),
            Err(ColbenchError::Http(_))
        ));
        Ok(())
    }
}
