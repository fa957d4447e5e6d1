use std::{
    fs::{self, File},
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use log::info;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

use super::QTable;

/// Everything that defines a trained [`QTableAgent`](super::QTableAgent)'s behavior
///
/// Produced by [`QTableAgent::snapshot`](super::QTableAgent::snapshot) and consumed whole by
/// [`QTableAgent::restore`](super::QTableAgent::restore).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub q_table: QTable,
    pub epsilon: f64,
    pub rewards_history: Vec<f64>,
    pub steps_history: Vec<usize>,
}

impl Snapshot {
    /// Encode with bincode; floats keep their exact bit patterns
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }
}

/// A directory holding one [`Snapshot`] file per map name
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// File backing the snapshot for `map`
    pub fn path(&self, map: &str) -> PathBuf {
        self.dir.join(format!("q_table_{map}.bin"))
    }

    pub fn exists(&self, map: &str) -> bool {
        self.path(map).is_file()
    }

    /// Write the snapshot for `map`, creating the directory if needed
    ///
    /// **Returns** the path written
    pub fn save(&self, map: &str, snapshot: &Snapshot) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| Error::io(format!("create {}", self.dir.display()), e))?;

        let path = self.path(map);
        let file = File::create(&path).map_err(|e| Error::io(describe("create", &path), e))?;
        let mut writer = BufWriter::new(file);
        bincode::serialize_into(&mut writer, snapshot)?;
        writer
            .flush()
            .map_err(|e| Error::io(describe("write", &path), e))?;

        info!("saved snapshot for '{map}' to {}", path.display());
        Ok(path)
    }

    /// Read the snapshot for `map`
    ///
    /// Fails with [`Error::Io`] if there is none and [`Error::Encoding`] if it is corrupt.
    pub fn load(&self, map: &str) -> Result<Snapshot> {
        let path = self.path(map);
        let file = File::open(&path).map_err(|e| Error::io(describe("open", &path), e))?;
        let snapshot: Snapshot = bincode::deserialize_from(BufReader::new(file))?;

        info!("loaded snapshot for '{map}' from {}", path.display());
        Ok(snapshot)
    }
}

fn describe(operation: &str, path: &Path) -> String {
    format!("{operation} {}", path.display())
}
