use std::{
    collections::BTreeMap,
    fs, io,
    path::PathBuf,
};

use maze_explorer_core::{Cell, CellCoord, CellKind, MapStore};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const FILE_PREFIX: &str = "map_save_";
const KEY_DELIMITER: char = ',';

/// Stores discovered maps as pretty-printed JSON, one file per world.
///
/// Entries are keyed by `"x,y"` so the files stay readable and diffable.
#[derive(Clone, Debug)]
pub(crate) struct JsonMapStore {
    dir: PathBuf,
}

impl JsonMapStore {
    /// Creates a store rooted at the provided directory.
    pub(crate) fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// File that holds the snapshot of the provided world.
    #[must_use]
    pub(crate) fn path_for(&self, world: &str) -> PathBuf {
        self.dir.join(format!("{FILE_PREFIX}{world}.json"))
    }
}

impl MapStore for JsonMapStore {
    type Error = SnapshotError;

    fn save(&mut self, world: &str, cells: &[Cell]) -> Result<(), Self::Error> {
        let entries: BTreeMap<String, SavedCell> = cells
            .iter()
            .map(|cell| (encode_key(cell.coord), SavedCell::from(cell)))
            .collect();
        let json = serde_json::to_string_pretty(&entries)?;

        fs::create_dir_all(&self.dir).map_err(|source| SnapshotError::Io {
            path: self.dir.clone(),
            source,
        })?;
        let path = self.path_for(world);
        fs::write(&path, json).map_err(|source| SnapshotError::Io { path, source })
    }

    fn load(&self, world: &str) -> Result<Vec<Cell>, Self::Error> {
        let path = self.path_for(world);
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                log::info!("no saved map at {}", path.display());
                return Ok(Vec::new());
            }
            Err(source) => return Err(SnapshotError::Io { path, source }),
        };

        let entries: BTreeMap<String, SavedCell> = serde_json::from_str(&contents)?;
        entries
            .into_iter()
            .map(|(key, saved)| {
                let coord = CellCoord::new(saved.absolute_x, saved.absolute_y);
                if decode_key(&key) != Some(coord) {
                    return Err(SnapshotError::BadKey { key, coord });
                }
                Ok(Cell::new(coord, saved.kind, saved.name))
            })
            .collect()
    }
}

/// Errors raised while reading or writing saved maps.
#[derive(Debug, Error)]
pub(crate) enum SnapshotError {
    /// The snapshot file could not be read or written.
    #[error("could not access {}: {source}", path.display())]
    Io {
        /// File or directory involved in the failure.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The snapshot was not valid JSON or used an unknown cell type.
    #[error("could not parse saved map: {0}")]
    Json(#[from] serde_json::Error),
    /// An entry key disagreed with the coordinates stored inside it.
    #[error("entry '{key}' does not match its coordinates {coord}")]
    BadKey {
        /// Key found in the file.
        key: String,
        /// Coordinates recorded in the entry.
        coord: CellCoord,
    },
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SavedCell {
    absolute_x: i32,
    absolute_y: i32,
    #[serde(default)]
    relative_x: i32,
    #[serde(default)]
    relative_y: i32,
    name: String,
    #[serde(rename = "Type")]
    kind: CellKind,
}

impl From<&Cell> for SavedCell {
    fn from(cell: &Cell) -> Self {
        // The absolute frame is anchored at the start marker, so both agree.
        Self {
            absolute_x: cell.coord.x(),
            absolute_y: cell.coord.y(),
            relative_x: cell.coord.x(),
            relative_y: cell.coord.y(),
            name: cell.name.clone(),
            kind: cell.kind.clone(),
        }
    }
}

fn encode_key(coord: CellCoord) -> String {
    format!("{}{KEY_DELIMITER}{}", coord.x(), coord.y())
}

fn decode_key(key: &str) -> Option<CellCoord> {
    let (x, y) = key.split_once(KEY_DELIMITER)?;
    Some(CellCoord::new(x.trim().parse().ok()?, y.trim().parse().ok()?))
}
