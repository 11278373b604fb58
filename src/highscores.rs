//! Persist high scores to disk as a JSON array of integers.

use std::cell::RefCell;
use std::fs;
use std::path::PathBuf;
use thiserror::Error;
use tracing::debug;

/// Default file, relative to the working directory.
pub const DEFAULT_FILENAME: &str = "tetris_scores.json";

/// Length of the kept leaderboard.
pub const MAX_HIGH_SCORES: usize = 10;

#[derive(Debug, Error)]
pub enum HighScoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed score file: {0}")]
    Json(#[from] serde_json::Error),
}

impl HighScoreError {
    /// The score file does not exist yet, as on a first run.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Io(e) if e.kind() == std::io::ErrorKind::NotFound)
    }
}

/// Storage behind the leaderboard. Callers decide what to do with errors.
pub trait ScoreStore: std::fmt::Debug {
    /// Raw scores in any order.
    fn load(&self) -> Result<Vec<u32>, HighScoreError>;
    /// Overwrite the stored list with `scores`, in the given order.
    fn save(&self, scores: &[u32]) -> Result<(), HighScoreError>;
}

/// JSON file store (`[1200, 800, ...]`).
#[derive(Debug, Clone)]
pub struct JsonScoreStore {
    path: PathBuf,
}

impl JsonScoreStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Default for JsonScoreStore {
    fn default() -> Self {
        Self::new(DEFAULT_FILENAME)
    }
}

impl ScoreStore for JsonScoreStore {
    fn load(&self) -> Result<Vec<u32>, HighScoreError> {
        let content = fs::read(&self.path)?;
        let scores: Vec<u32> = serde_json::from_slice(&content)?;
        debug!(path = %self.path.display(), count = scores.len(), "loaded high scores");
        Ok(scores)
    }

    fn save(&self, scores: &[u32]) -> Result<(), HighScoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_vec(scores)?;
        fs::write(&self.path, json)?;
        debug!(path = %self.path.display(), count = scores.len(), "saved high scores");
        Ok(())
    }
}

/// In-memory store; nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryScoreStore {
    scores: RefCell<Vec<u32>>,
}

impl MemoryScoreStore {
    #[cfg(test)]
    pub fn with_scores(scores: Vec<u32>) -> Self {
        Self {
            scores: RefCell::new(scores),
        }
    }

    pub fn snapshot(&self) -> Vec<u32> {
        self.scores.borrow().clone()
    }
}

impl ScoreStore for MemoryScoreStore {
    fn load(&self) -> Result<Vec<u32>, HighScoreError> {
        Ok(self.snapshot())
    }

    fn save(&self, scores: &[u32]) -> Result<(), HighScoreError> {
        *self.scores.borrow_mut() = scores.to_vec();
        Ok(())
    }
}

/// Leaderboard: at most `MAX_HIGH_SCORES` entries, highest first. Equal scores are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HighScores(Vec<u32>);

impl HighScores {
    pub fn from_unsorted(mut scores: Vec<u32>) -> Self {
        scores.sort_unstable_by(|a, b| b.cmp(a));
        scores.truncate(MAX_HIGH_SCORES);
        Self(scores)
    }

    /// Add a score and keep the top entries.
    pub fn record(&mut self, score: u32) {
        self.0.push(score);
        self.0.sort_unstable_by(|a, b| b.cmp(a));
        self.0.truncate(MAX_HIGH_SCORES);
    }

    pub fn best(&self) -> Option<u32> {
        self.0.first().copied()
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.0
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn temp_path(name: &str) -> PathBuf {
        static COUNTER: AtomicU32 = AtomicU32::new(0);
        let n = COUNTER.fetch_add(1, Ordering::Relaxed);
        std::env::temp_dir().join(format!(
            "blocktui-{}-{}-{}.json",
            name,
            std::process::id(),
            n
        ))
    }

    #[test]
    fn missing_file_is_an_error() {
        let store = JsonScoreStore::new(temp_path("missing"));
        let err = store.load().unwrap_err();
        assert!(matches!(err, HighScoreError::Io(_)));
        assert!(err.is_not_found());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let path = temp_path("malformed");
        fs::write(&path, b"{not json").unwrap();
        let store = JsonScoreStore::new(&path);
        assert!(matches!(store.load(), Err(HighScoreError::Json(_))));
        fs::write(&path, b"[1, \"two\", 3]").unwrap();
        let err = store.load().unwrap_err();
        assert!(matches!(err, HighScoreError::Json(_)));
        assert!(!err.is_not_found());
        let _ = fs::remove_file(path);
    }

    #[test]
    fn save_then_load_keeps_order_on_disk() {
        let path = temp_path("roundtrip");
        let store = JsonScoreStore::new(&path);
        store.save(&[300, 1200, 800]).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "[300,1200,800]");
        assert_eq!(store.load().unwrap(), vec![300, 1200, 800]);
        let _ = fs::remove_file(path);
    }

    #[test]
    fn save_creates_parent_directory() {
        let dir = temp_path("dir");
        let path = dir.join("nested").join("scores.json");
        let store = JsonScoreStore::new(&path);
        store.save(&[1]).unwrap();
        assert_eq!(store.load().unwrap(), vec![1]);
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn from_unsorted_sorts_and_truncates() {
        let scores = HighScores::from_unsorted((1..=15).collect());
        assert_eq!(scores.as_slice(), &[15, 14, 13, 12, 11, 10, 9, 8, 7, 6]);
        assert_eq!(scores.best(), Some(15));
    }

    #[test]
    fn record_keeps_duplicates() {
        let mut scores = HighScores::from_unsorted(vec![500, 100]);
        scores.record(500);
        assert_eq!(scores.as_slice(), &[500, 500, 100]);
    }

    #[test]
    fn record_drops_low_score_when_full() {
        let mut scores = HighScores::from_unsorted((1..=10).map(|n| n * 100).collect());
        scores.record(50);
        assert_eq!(scores.len(), MAX_HIGH_SCORES);
        assert!(!scores.as_slice().contains(&50));
        scores.record(5000);
        assert_eq!(scores.best(), Some(5000));
        assert!(!scores.as_slice().contains(&100));
    }

    #[test]
    fn memory_store_overwrites() {
        let store = MemoryScoreStore::with_scores(vec![1, 2]);
        store.save(&[9]).unwrap();
        assert_eq!(store.load().unwrap(), vec![9]);
    }

    proptest! {
        #[test]
        fn leaderboard_stays_bounded_and_descending(
            initial in proptest::collection::vec(any::<u32>(), 0..30),
            recorded in proptest::collection::vec(any::<u32>(), 0..30),
        ) {
            let mut scores = HighScores::from_unsorted(initial);
            for s in recorded {
                scores.record(s);
                prop_assert!(scores.len() <= MAX_HIGH_SCORES);
                prop_assert!(scores.as_slice().windows(2).all(|w| w[0] >= w[1]));
            }
        }
    }
}
