use crate::config::{data_dir, load_json, save_json};
use crate::core::scoreboard::{record_entry, ScoreEntry};
use std::path::PathBuf;

pub const GAME_MEMORY: &str = "memory";
pub const GAME_CALCULATION: &str = "calculation";

// One `<game>-top-players.json` file per game under the store root. The
// root is injectable so tests can point at a scratch directory.
pub struct ScoreStore {
    root: PathBuf,
}

impl ScoreStore {
    pub fn open_default() -> Self {
        Self { root: data_dir() }
    }

    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn file(&self, game: &str) -> PathBuf {
        self.root.join(format!("{game}-top-players.json"))
    }

    // Missing or unreadable lists read as empty.
    pub fn list(&self, game: &str) -> Vec<ScoreEntry> {
        load_json(&self.file(game))
    }

    pub fn record(&self, game: &str, entry: ScoreEntry) -> Vec<ScoreEntry> {
        let mut list = self.list(game);
        if record_entry(&mut list, entry) {
            let _ = save_json(&self.file(game), &list);
        }
        list
    }

    pub fn reset(&self, game: &str) {
        let _ = std::fs::remove_file(self.file(game));
    }
}
