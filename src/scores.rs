use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};

use tracing::{debug, warn};

/// How many entries the score file keeps.
pub const MAX_SCORES: usize = 20;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScoreEntry {
    pub name: String,
    pub score: u32,
}

/// High-score table backed by a `name,score` text file, best first.
pub struct ScoreManager {
    path: PathBuf,
    entries: Vec<ScoreEntry>,
}

impl ScoreManager {
    /// Reads the score file. A missing or unreadable file gives an empty
    /// table and bad lines are skipped.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut entries = match fs::read_to_string(&path) {
            Ok(text) => parse_scores(&text),
            Err(err) => {
                debug!(path = %path.display(), %err, "no score file loaded");
                Vec::new()
            }
        };

        entries.sort_by(|a, b| b.score.cmp(&a.score));
        entries.truncate(MAX_SCORES);

        ScoreManager { path, entries }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn add_score(&mut self, name: &str, score: u32) {
        // After every equal score, so ties keep arrival order
        let at = self.entries.partition_point(|e| e.score >= score);
        self.entries.insert(at, ScoreEntry { name: name.to_string(), score });
        self.entries.truncate(MAX_SCORES);
    }

    pub fn high_scores(&self, n: usize) -> Vec<ScoreEntry> {
        self.entries.iter().take(n).cloned().collect()
    }

    /// Writes a snapshot of the table on a background thread. Failures are
    /// logged; the returned handle only tells when the write is done.
    pub fn save_async(&self) -> PendingSave {
        let snapshot = self.entries.clone();
        let path = self.path.clone();

        let handle = thread::spawn(move || {
            if let Err(err) = write_scores(&path, &snapshot) {
                warn!(path = %path.display(), %err, "could not save scores");
            }
        });
        PendingSave(Some(handle))
    }
}

/// An in-flight score write. Dropping it blocks until the write is done, so
/// the file is never left half written on the way out.
#[must_use]
pub struct PendingSave(Option<JoinHandle<()>>);

impl PendingSave {
    pub fn wait(mut self) {
        self.join();
    }

    fn join(&mut self) {
        if let Some(handle) = self.0.take() {
            if handle.join().is_err() {
                warn!("score save thread panicked");
            }
        }
    }
}

impl Drop for PendingSave {
    fn drop(&mut self) {
        self.join();
    }
}

fn parse_scores(text: &str) -> Vec<ScoreEntry> {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| {
            let entry = parse_line(line);
            if entry.is_none() {
                warn!(line, "skipping malformed score line");
            }
            entry
        })
        .collect()
}

// Split on the last comma so names may contain commas
fn parse_line(line: &str) -> Option<ScoreEntry> {
    let (name, score) = line.rsplit_once(',')?;
    let score = score.trim().parse().ok()?;
    Some(ScoreEntry { name: name.to_string(), score })
}

fn write_scores(path: &Path, entries: &[ScoreEntry]) -> io::Result<()> {
    let mut out = String::new();
    for entry in entries {
        out.push_str(&format!("{},{}\n", entry.name, entry.score));
    }
    fs::write(path, out)
}
