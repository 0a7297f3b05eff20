//! Snapshot persistence for the flat index and the metadata store.
//!
//! Two artifacts live under the configured root directory:
//!
//! - `index.bin` - the [`FlatIndex`], bincode encoded
//! - `products.bin` - the [`MetadataStore`], bincode encoded
//!
//! Each artifact is written to a `.tmp` sibling first and then renamed over
//! the final name. Loading never fails: anything missing or unreadable comes
//! back empty and is logged, so a bad snapshot cannot keep the service down.

use crate::error::StoreError;
use crate::index::FlatIndex;
use crate::metadata::MetadataStore;
use bincode::Options;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

pub const INDEX_FILE: &str = "index.bin";
pub const PRODUCTS_FILE: &str = "products.bin";

/// In-memory state restored from disk.
#[derive(Debug)]
pub struct LoadedState {
    pub index: FlatIndex,
    pub records: MetadataStore,
}

#[derive(Debug, Clone)]
pub struct Persistence {
    root: PathBuf,
}

impl Persistence {
    pub fn new(root: impl Into<PathBuf>) -> Persistence {
        Persistence { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn index_path(&self) -> PathBuf {
        self.root.join(INDEX_FILE)
    }

    pub fn products_path(&self) -> PathBuf {
        self.root.join(PRODUCTS_FILE)
    }

    /// Writes both artifacts, creating the root directory if needed.
    ///
    /// If the index is written but the records fail, the on-disk pair is
    /// inconsistent until the next successful save. The caller still holds
    /// the authoritative in-memory copy.
    pub fn save(&self, index: &FlatIndex, records: &MetadataStore) -> Result<(), StoreError> {
        fs::create_dir_all(&self.root).map_err(|e| {
            StoreError::Persistence(format!(
                "Fail to create data directory '{}': {}",
                self.root.display(),
                e
            ))
        })?;

        write_artifact(&self.index_path(), index)?;
        write_artifact(&self.products_path(), records)?;

        tracing::debug!(
            "Saved {} vectors and {} products to {}",
            index.count(),
            records.count(),
            self.root.display()
        );
        Ok(())
    }

    /// Restores the last snapshot, falling back to empty structures.
    ///
    /// Each artifact is handled on its own. A stored index whose dimension
    /// differs from `dimension` is discarded. If the two artifacts disagree on
    /// their entry count both are discarded, since positions would no longer
    /// line up.
    pub fn load(&self, dimension: usize) -> LoadedState {
        let mut index = match read_artifact::<FlatIndex>(&self.index_path()) {
            Ok(Some(index)) if index.dimension() != dimension => {
                tracing::error!(
                    "Stored index has dimension {} but {} is configured, starting with an empty index",
                    index.dimension(),
                    dimension
                );
                FlatIndex::new(dimension)
            }
            Ok(Some(index)) if !index.is_well_formed() => {
                tracing::error!("Stored index is malformed, starting with an empty index");
                FlatIndex::new(dimension)
            }
            Ok(Some(index)) => {
                tracing::info!("Loaded flat index with {} products", index.count());
                index
            }
            Ok(None) => FlatIndex::new(dimension),
            Err(e) => {
                tracing::error!("Error loading index: {}", e);
                FlatIndex::new(dimension)
            }
        };

        let mut records = match read_artifact::<MetadataStore>(&self.products_path()) {
            Ok(Some(records)) => {
                tracing::info!("Loaded {} product metadata entries", records.count());
                records
            }
            Ok(None) => MetadataStore::new(),
            Err(e) => {
                tracing::error!("Error loading product metadata: {}", e);
                MetadataStore::new()
            }
        };

        if index.count() != records.count() {
            tracing::error!(
                "Snapshot is misaligned ({} vectors, {} products), starting empty",
                index.count(),
                records.count()
            );
            index.clear();
            records.clear();
        }

        LoadedState { index, records }
    }
}

fn write_artifact<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let tmp = path.with_extension("bin.tmp");

    let file = File::create(&tmp).map_err(|e| {
        StoreError::Persistence(format!("Fail to create file for saving '{}': {}", tmp.display(), e))
    })?;

    let mut writer = BufWriter::new(file);
    bincode::serialize_into(&mut writer, value)
        .map_err(|e| StoreError::Persistence(format!("Serialization failed: {}", e)))?;
    writer
        .flush()
        .map_err(|e| StoreError::Persistence(format!("Fail to flush '{}': {}", tmp.display(), e)))?;

    fs::rename(&tmp, path).map_err(|e| {
        StoreError::Persistence(format!("Fail to move '{}' into place: {}", tmp.display(), e))
    })?;

    Ok(())
}

/// `Ok(None)` when the artifact does not exist yet.
fn read_artifact<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    if !path.exists() {
        return Ok(None);
    }

    let file = File::open(path).map_err(|e| {
        StoreError::Persistence(format!("Fail to open '{}': {}", path.display(), e))
    })?;

    let len = file
        .metadata()
        .map_err(|e| StoreError::Persistence(format!("Fail to stat '{}': {}", path.display(), e)))?
        .len();

    // Same encoding as `bincode::serialize_into`, but no length prefix may
    // claim more bytes than the file holds.
    let reader = BufReader::new(file);
    let value = bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .allow_trailing_bytes()
        .with_limit(len)
        .deserialize_from(reader)
        .map_err(|e| StoreError::Persistence(format!("Deserialization of '{}' failed: {}", path.display(), e)))?;

    Ok(Some(value))
}
