//! On-disk snapshot of the in-memory engine
//!
//! The committed state is serialized with bincode and optionally gzipped.
//! The file starts with a small header so a reader can tell which encoding
//! was used without consulting the configuration.

use super::memory::StoreState;
use super::{BackendError, BackendResult};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

const SNAPSHOT_FILE: &str = "graph.snapshot";
const MAGIC_PLAIN: &[u8; 4] = b"SGS0";
const MAGIC_GZIP: &[u8; 4] = b"SGZ0";

impl From<bincode::Error> for BackendError {
    fn from(err: bincode::Error) -> Self {
        BackendError::Serialization(err.to_string())
    }
}

/// Snapshot location inside a store directory
pub fn snapshot_path(store_dir: &Path) -> PathBuf {
    store_dir.join(SNAPSHOT_FILE)
}

/// Write the state atomically: encode to a temporary file, then rename
pub(crate) fn write_snapshot(path: &Path, state: &StoreState, compress: bool) -> BackendResult<()> {
    let tmp = path.with_extension("tmp");
    {
        let mut out = BufWriter::new(File::create(&tmp)?);
        if compress {
            out.write_all(MAGIC_GZIP)?;
            let mut encoder = GzEncoder::new(out, Compression::default());
            bincode::serialize_into(&mut encoder, state)?;
            encoder.finish()?.flush()?;
        } else {
            out.write_all(MAGIC_PLAIN)?;
            bincode::serialize_into(&mut out, state)?;
            out.flush()?;
        }
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

pub(crate) fn read_snapshot(path: &Path) -> BackendResult<StoreState> {
    let mut input = BufReader::new(File::open(path)?);
    let mut magic = [0u8; 4];
    input.read_exact(&mut magic)?;

    match &magic {
        m if m == MAGIC_GZIP => Ok(bincode::deserialize_from(GzDecoder::new(input))?),
        m if m == MAGIC_PLAIN => Ok(bincode::deserialize_from(input)?),
        _ => Err(BackendError::Serialization(format!(
            "{} is not a graph snapshot",
            path.display()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{GraphBackend, GraphStore};
    use crate::config::GraphConfig;
    use crate::graph::{EntityRef, PropertyValue};

    fn populated(dir: &Path, compress: bool) {
        let mut config = GraphConfig::with_store_dir(dir);
        config.compress_snapshots = compress;
        let mut store = GraphStore::open(&config).unwrap();
        let tx = store.begin_transaction().unwrap();
        let node = store.create_node().unwrap();
        store
            .set_property(EntityRef::Node(node), "name", "test".into())
            .unwrap();
        store.commit_transaction(tx).unwrap();
        store.shutdown().unwrap();
    }

    #[test]
    fn test_snapshot_reload() {
        for compress in [true, false] {
            let dir = tempfile::tempdir().unwrap();
            populated(dir.path(), compress);
            assert!(snapshot_path(dir.path()).exists());

            let store = GraphStore::open(&GraphConfig::with_store_dir(dir.path())).unwrap();
            assert_eq!(store.node_count(), 2);
            let names: Vec<_> = store
                .all_nodes()
                .into_iter()
                .filter_map(|n| store.get_property(EntityRef::Node(n), "name").unwrap())
                .collect();
            assert_eq!(names, vec![PropertyValue::from("test")]);
        }
    }

    #[test]
    fn test_rejects_foreign_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = snapshot_path(dir.path());
        fs::write(&path, b"not a snapshot").unwrap();
        assert!(matches!(read_snapshot(&path), Err(BackendError::Serialization(_))));
    }
}
