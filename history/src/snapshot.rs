//! The snapshot artifact: a deterministic, self-validating export of a
//! store up to a chosen level.
//!
//! Layout: 4 magic bytes, a little-endian format version, a bincode
//! `SnapshotHeader`, then a gzip-compressed bincode `SnapshotPayload`
//! holding blocks `0..=export_level` and the export block's metadata (the
//! only metadata a snapshot carries; everything else is reconstructible by
//! replay).

use crate::errors::{HistoryError, HistoryResult};
use chainstore_database::prelude::StoreError;
use chainstore_hashes::Hash;
use chainstore_history_core::{block::Block, metadata::BlockMetadata, BlockLevel};
use flate2::{read::GzDecoder, write::GzEncoder, Compression};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

pub const SNAPSHOT_MAGIC: &[u8; 4] = b"CSNP";
pub const SNAPSHOT_VERSION: u16 = 1;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotHeader {
    pub export_level: BlockLevel,
    pub export_hash: Hash,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotPayload {
    pub blocks: Vec<Block>,
    pub export_metadata: BlockMetadata,
}

pub fn write_snapshot(path: &Path, header: &SnapshotHeader, payload: &SnapshotPayload) -> HistoryResult<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_all(SNAPSHOT_MAGIC)?;
    writer.write_all(&SNAPSHOT_VERSION.to_le_bytes())?;
    // An outbound serialization failure is an internal error, not a
    // malformed artifact
    bincode::serialize_into(&mut writer, header).map_err(StoreError::from)?;
    let mut encoder = GzEncoder::new(writer, Compression::default());
    bincode::serialize_into(&mut encoder, payload).map_err(StoreError::from)?;
    encoder.finish()?.flush()?;
    Ok(())
}

/// Reads and fully validates a snapshot file. All inbound decoding
/// failures surface as `MalformedSnapshot`: the artifact is untrusted.
pub fn read_snapshot(path: &Path) -> HistoryResult<(SnapshotHeader, SnapshotPayload)> {
    let mut reader = BufReader::new(File::open(path)?);

    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic)?;
    if &magic != SNAPSHOT_MAGIC {
        return Err(HistoryError::MalformedSnapshot("unrecognized magic bytes".into()));
    }
    let mut version = [0u8; 2];
    reader.read_exact(&mut version)?;
    let version = u16::from_le_bytes(version);
    if version != SNAPSHOT_VERSION {
        return Err(HistoryError::UnsupportedSnapshotVersion(version, SNAPSHOT_VERSION));
    }

    let header: SnapshotHeader =
        bincode::deserialize_from(&mut reader).map_err(|err| HistoryError::MalformedSnapshot(err.to_string()))?;
    let payload: SnapshotPayload = bincode::deserialize_from(GzDecoder::new(reader))
        .map_err(|err| HistoryError::MalformedSnapshot(err.to_string()))?;

    validate(&header, &payload)?;
    Ok((header, payload))
}

fn validate(header: &SnapshotHeader, payload: &SnapshotPayload) -> HistoryResult<()> {
    let blocks = &payload.blocks;
    if blocks.is_empty() || blocks[0].level() != 0 {
        return Err(HistoryError::MalformedSnapshot("snapshot does not start at genesis".into()));
    }
    let mut parent: Option<&Block> = None;
    for block in blocks {
        if block.header.computed_hash() != block.hash() {
            return Err(HistoryError::MalformedSnapshot(format!("header hash mismatch at level {}", block.level())));
        }
        if let Some(parent) = parent {
            if block.level() != parent.level() + 1 || block.header.parent != parent.hash() {
                return Err(HistoryError::MalformedSnapshot(format!("broken chain at level {}", block.level())));
            }
        }
        parent = Some(block);
    }
    let last = blocks.last().expect("blocks verified non-empty");
    if last.level() != header.export_level || last.hash() != header.export_hash {
        return Err(HistoryError::MalformedSnapshot("export block does not match the snapshot header".into()));
    }
    if payload.export_metadata.level != header.export_level || payload.export_metadata.hash != header.export_hash {
        return Err(HistoryError::MalformedSnapshot("export metadata does not match the export block".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processes::apply::apply_block;
    use chainstore_history_core::config::{params::SANDBOX_PARAMS, GENESIS};
    use std::io::{Seek, SeekFrom};

    fn chain(length: usize) -> Vec<Block> {
        let mut blocks = vec![GENESIS.build_block()];
        while blocks.len() < length {
            let parent = &blocks.last().unwrap().header;
            blocks.push(Block::child_of(parent, "bootstrap1".into(), vec![]));
        }
        blocks
    }

    fn snapshot_of(blocks: Vec<Block>) -> (SnapshotHeader, SnapshotPayload) {
        let last = blocks.last().unwrap();
        let header = SnapshotHeader { export_level: last.level(), export_hash: last.hash() };
        let export_metadata = apply_block(&SANDBOX_PARAMS, last);
        (header, SnapshotPayload { blocks, export_metadata })
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot_block_9.full");
        let (header, payload) = snapshot_of(chain(10));
        write_snapshot(&path, &header, &payload).unwrap();
        let (read_header, read_payload) = read_snapshot(&path).unwrap();
        assert_eq!(read_header, header);
        assert_eq!(read_payload, payload);
    }

    #[test]
    fn test_rejects_bad_magic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.full");
        let (header, payload) = snapshot_of(chain(3));
        write_snapshot(&path, &header, &payload).unwrap();

        let mut file = std::fs::OpenOptions::new().write(true).open(&path).unwrap();
        file.seek(SeekFrom::Start(0)).unwrap();
        file.write_all(b"XXXX").unwrap();
        drop(file);

        assert!(matches!(read_snapshot(&path), Err(HistoryError::MalformedSnapshot(_))));
    }

    #[test]
    fn test_rejects_unsupported_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.full");
        let (header, payload) = snapshot_of(chain(3));
        write_snapshot(&path, &header, &payload).unwrap();

        let mut file = std::fs::OpenOptions::new().write(true).open(&path).unwrap();
        file.seek(SeekFrom::Start(SNAPSHOT_MAGIC.len() as u64)).unwrap();
        file.write_all(&99u16.to_le_bytes()).unwrap();
        drop(file);

        assert!(matches!(read_snapshot(&path), Err(HistoryError::UnsupportedSnapshotVersion(99, SNAPSHOT_VERSION))));
    }

    #[test]
    fn test_rejects_broken_chain() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.full");
        let mut blocks = chain(5);
        // Forge a block that does not link to its parent
        blocks[3] = Block::child_of(&blocks[1].header, "bootstrap1".into(), vec![]);
        let last = blocks.last().unwrap().clone();
        let header = SnapshotHeader { export_level: last.level(), export_hash: last.hash() };
        let payload = SnapshotPayload { blocks, export_metadata: apply_block(&SANDBOX_PARAMS, &last) };
        write_snapshot(&path, &header, &payload).unwrap();

        assert!(matches!(read_snapshot(&path), Err(HistoryError::MalformedSnapshot(_))));
    }
}
