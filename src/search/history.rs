use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

/// Default number of queries kept
pub const DEFAULT_HISTORY_CAPACITY: usize = 10;

/// Backing store for the search history list
pub trait HistoryStorage: Send + Sync {
    fn load(&self) -> Result<Vec<String>>;

    fn save(&self, entries: &[String]) -> Result<()>;
}

/// History persisted as a JSON array of strings
#[derive(Debug, Clone)]
pub struct FileHistoryStorage {
    path: PathBuf,
}

impl FileHistoryStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl HistoryStorage for FileHistoryStorage {
    fn load(&self) -> Result<Vec<String>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read history file {:?}", self.path))?;
        let entries: Vec<String> =
            serde_json::from_str(&content).context("Failed to parse history JSON")?;
        Ok(entries)
    }

    fn save(&self, entries: &[String]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create history directory {parent:?}"))?;
        }

        // Write-then-rename so a crash never leaves a truncated file
        let tmp_path = self.path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(entries)?;
        fs::write(&tmp_path, content)
            .with_context(|| format!("Failed to write history file {tmp_path:?}"))?;
        fs::rename(&tmp_path, &self.path)
            .with_context(|| format!("Failed to replace history file {:?}", self.path))?;
        Ok(())
    }
}

/// In-process storage, optionally failing every access
#[derive(Debug, Default)]
pub struct MemoryHistoryStorage {
    entries: Mutex<Vec<String>>,
    failing: bool,
}

impl MemoryHistoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage whose reads and writes always fail
    pub fn failing() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            failing: true,
        }
    }
}

impl HistoryStorage for MemoryHistoryStorage {
    fn load(&self) -> Result<Vec<String>> {
        if self.failing {
            anyhow::bail!("history storage unavailable");
        }
        let entries = self
            .entries
            .lock()
            .map_err(|_| anyhow::anyhow!("history storage lock poisoned"))?;
        Ok(entries.clone())
    }

    fn save(&self, entries: &[String]) -> Result<()> {
        if self.failing {
            anyhow::bail!("history storage unavailable");
        }
        let mut stored = self
            .entries
            .lock()
            .map_err(|_| anyhow::anyhow!("history storage lock poisoned"))?;
        *stored = entries.to_vec();
        Ok(())
    }
}

/// Bounded most-recent-first list of search queries.
///
/// The store keeps no copy of its own: every operation reads the storage,
/// and every mutation writes it back before returning. Storage failures
/// are logged and treated as an empty history.
pub struct SearchHistoryStore<S: HistoryStorage> {
    storage: S,
    capacity: usize,
}

impl<S: HistoryStorage> SearchHistoryStore<S> {
    pub fn new(storage: S) -> Self {
        Self::with_capacity(storage, DEFAULT_HISTORY_CAPACITY)
    }

    pub fn with_capacity(storage: S, capacity: usize) -> Self {
        Self { storage, capacity }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn read(&self) -> Vec<String> {
        match self.storage.load() {
            Ok(mut entries) => {
                entries.truncate(self.capacity);
                entries
            }
            Err(e) => {
                warn!("Failed to read search history: {:#}", e);
                Vec::new()
            }
        }
    }

    fn write(&self, entries: &[String]) {
        if let Err(e) = self.storage.save(entries) {
            warn!("Failed to write search history: {:#}", e);
        }
    }

    /// Record a query at the front, moving it up if already present
    pub fn add(&self, query: &str) {
        let query = query.trim();
        if query.is_empty() {
            return;
        }

        let mut entries = self.read();
        entries.retain(|entry| entry != query);
        entries.insert(0, query.to_string());
        entries.truncate(self.capacity);

        debug!("Search history now holds {} entries", entries.len());
        self.write(&entries);
    }

    pub fn remove(&self, query: &str) {
        let query = query.trim();
        let mut entries = self.read();
        let before = entries.len();
        entries.retain(|entry| entry != query);
        if entries.len() != before {
            self.write(&entries);
        }
    }

    pub fn clear(&self) {
        self.write(&[]);
    }

    /// Entries, most recent first
    pub fn list(&self) -> Vec<String> {
        self.read()
    }
}
