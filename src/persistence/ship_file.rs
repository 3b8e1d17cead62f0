use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::error::{corrupted_data, load_error, version_mismatch};
use super::{PersistenceResult, ShipSaveData};
use crate::constants::persistence_constants::{SHIP_FILE_EXTENSION, SHIP_FORMAT_VERSION, SHIP_MAGIC};
use crate::ship::ShipId;

const SHIPYARD_INDEX_FILE: &str = "shipyard.json";

/// Header in front of every encoded ship
#[derive(Debug, Serialize, Deserialize)]
struct ShipFileHeader {
    magic: [u8; 4],
    version: u32,
    payload_len: u64,
    checksum: u32,
}

/// Encode a ship as header plus bincode payload
pub fn encode_ship(data: &ShipSaveData) -> PersistenceResult<Vec<u8>> {
    let payload = bincode::serialize(data)?;
    let header = ShipFileHeader {
        magic: *SHIP_MAGIC,
        version: SHIP_FORMAT_VERSION,
        payload_len: payload.len() as u64,
        checksum: calculate_checksum(&payload),
    };

    let mut buffer = bincode::serialize(&header)?;
    buffer.extend_from_slice(&payload);
    Ok(buffer)
}

pub fn decode_ship(bytes: &[u8]) -> PersistenceResult<ShipSaveData> {
    let header: ShipFileHeader =
        bincode::deserialize(bytes).map_err(|_| corrupted_data("Data too small for ship header"))?;

    if header.magic != *SHIP_MAGIC {
        return Err(corrupted_data("Invalid ship magic"));
    }
    if header.version != SHIP_FORMAT_VERSION {
        return Err(version_mismatch(SHIP_FORMAT_VERSION, header.version));
    }

    let header_size = bincode::serialized_size(&header)? as usize;
    let payload = &bytes[header_size..];
    if payload.len() as u64 != header.payload_len {
        return Err(corrupted_data(format!(
            "Payload is {} bytes, header says {}",
            payload.len(),
            header.payload_len
        )));
    }
    if calculate_checksum(payload) != header.checksum {
        return Err(corrupted_data("Checksum mismatch"));
    }

    bincode::deserialize(payload).map_err(|e| corrupted_data(format!("Invalid ship payload: {}", e)))
}

pub fn ship_file_path(save_dir: impl AsRef<Path>, id: ShipId) -> PathBuf {
    save_dir
        .as_ref()
        .join(format!("ship_{}.{}", id.0, SHIP_FILE_EXTENSION))
}

/// Write a ship file through a temporary file and an atomic rename
pub fn save_ship(save_dir: impl AsRef<Path>, data: &ShipSaveData) -> PersistenceResult<PathBuf> {
    let save_dir = save_dir.as_ref();
    fs::create_dir_all(save_dir)?;

    let file_path = ship_file_path(save_dir, data.id);
    let temp_path = file_path.with_extension("tmp");
    fs::write(&temp_path, encode_ship(data)?)?;
    fs::rename(&temp_path, &file_path)?;

    log::debug!("Saved ship {} to {}", data.id, file_path.display());
    Ok(file_path)
}

pub fn load_ship(path: impl AsRef<Path>) -> PersistenceResult<ShipSaveData> {
    let path = path.as_ref();
    let bytes = fs::read(path)?;
    decode_ship(&bytes).map_err(|e| load_error(path, e))
}

/// Every ship file in `save_dir`, sorted by path
pub fn list_saved_ships(save_dir: impl AsRef<Path>) -> PersistenceResult<Vec<PathBuf>> {
    let save_dir = save_dir.as_ref();
    if !save_dir.exists() {
        return Ok(Vec::new());
    }

    let mut paths = Vec::new();
    for entry in fs::read_dir(save_dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) == Some(SHIP_FILE_EXTENSION) {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

/// Counters that must survive restarts so ids and claims are never reused
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipyardIndex {
    pub next_ship_id: u64,
    pub next_claim_index: i32,
}

impl ShipyardIndex {
    pub fn save(&self, save_dir: impl AsRef<Path>) -> PersistenceResult<()> {
        let save_dir = save_dir.as_ref();
        fs::create_dir_all(save_dir)?;

        let file_path = save_dir.join(SHIPYARD_INDEX_FILE);
        let temp_path = file_path.with_extension("tmp");
        fs::write(&temp_path, serde_json::to_string_pretty(self)?)?;
        fs::rename(&temp_path, &file_path)?;
        Ok(())
    }

    /// Stored index, or the default when none was saved yet
    pub fn load(save_dir: impl AsRef<Path>) -> PersistenceResult<Self> {
        let file_path = save_dir.as_ref().join(SHIPYARD_INDEX_FILE);
        if !file_path.exists() {
            return Ok(Self::default());
        }
        let json = fs::read_to_string(&file_path)?;
        serde_json::from_str(&json).map_err(|e| load_error(&file_path, e))
    }
}

/// Calculate CRC32 checksum
fn calculate_checksum(data: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claim::ChunkClaim;
    use crate::persistence::{PersistedRotation, PersistenceError};

    fn sample() -> ShipSaveData {
        ShipSaveData {
            id: ShipId(42),
            name: "oak-ember-tide".to_string(),
            position: [10.0, 80.0, -3.5],
            rotation: PersistedRotation::Quaternion([0.0, 0.0, 0.0, 1.0]),
            center_of_mass: [5_120_008.5, 64.5, 8.5],
            linear_velocity: [1.0, 0.0, 0.0],
            angular_velocity: [0.0, 0.1, 0.0],
            claim: ChunkClaim::new(320_031, 0, 7),
            physics_enabled: true,
        }
    }

    #[test]
    fn test_encode_decode() {
        let bytes = encode_ship(&sample()).expect("encode");
        assert_eq!(&bytes[..4], SHIP_MAGIC);
        assert_eq!(decode_ship(&bytes).expect("decode"), sample());
    }

    #[test]
    fn test_detects_corruption() {
        let mut bytes = encode_ship(&sample()).expect("encode");
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        assert!(matches!(decode_ship(&bytes), Err(PersistenceError::CorruptedData(_))));

        assert!(matches!(decode_ship(&bytes[..3]), Err(PersistenceError::CorruptedData(_))));

        let mut wrong_magic = encode_ship(&sample()).expect("encode");
        wrong_magic[0] = b'X';
        assert!(matches!(decode_ship(&wrong_magic), Err(PersistenceError::CorruptedData(_))));
    }

    #[test]
    fn test_rejects_other_versions() {
        let mut bytes = encode_ship(&sample()).expect("encode");
        // version follows the 4 magic bytes, little endian
        bytes[4] = 99;
        assert!(matches!(
            decode_ship(&bytes),
            Err(PersistenceError::VersionMismatch { expected: 1, found: 99 })
        ));
    }

    #[test]
    fn test_save_and_list() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = save_ship(dir.path(), &sample()).expect("save");
        assert_eq!(path, ship_file_path(dir.path(), ShipId(42)));
        assert_eq!(list_saved_ships(dir.path()).expect("list"), vec![path.clone()]);
        assert_eq!(load_ship(&path).expect("load"), sample());
    }

    #[test]
    fn test_shipyard_index() {
        let dir = tempfile::tempdir().expect("temp dir");
        assert_eq!(ShipyardIndex::load(dir.path()).expect("load"), ShipyardIndex::default());

        let index = ShipyardIndex {
            next_ship_id: 17,
            next_claim_index: 9,
        };
        index.save(dir.path()).expect("save");
        assert_eq!(ShipyardIndex::load(dir.path()).expect("load"), index);
    }
}
