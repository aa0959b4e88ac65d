//! Processed-meeting ledger.
//!
//! A flat JSON file of meeting UUIDs that already have a published document.
//! It is read before a run and rewritten after it, which keeps repeated runs
//! idempotent per meeting.

use anyhow::{bail, Context, Result};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

#[derive(Debug, Default, Serialize, Deserialize)]
struct LedgerFile {
    #[serde(default)]
    processed_ids: Vec<String>,
}

#[derive(Debug)]
pub struct Ledger {
    path: PathBuf,
    ids: Vec<String>,
    seen: HashSet<String>,
}

/// Held for the duration of a run; released on drop.
#[derive(Debug)]
pub struct LedgerLock {
    file: File,
}

impl LedgerLock {
    /// Lock `<ledger_path>.lock`. Fails immediately if another run holds it.
    pub fn acquire(ledger_path: &Path) -> Result<Self> {
        let mut lock_path = ledger_path.as_os_str().to_os_string();
        lock_path.push(".lock");
        let lock_path = PathBuf::from(lock_path);

        if let Some(parent) = lock_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).context("Failed to create ledger directory")?;
            }
        }
        let file = std::fs::OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&lock_path)
            .with_context(|| format!("Failed to open {}", lock_path.display()))?;

        if file.try_lock_exclusive().is_err() {
            bail!(
                "Another run holds {}; refusing to process concurrently",
                lock_path.display()
            );
        }
        debug!("Acquired {}", lock_path.display());
        Ok(Self { file })
    }
}

impl Drop for LedgerLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

impl Ledger {
    /// A missing file is an empty ledger.
    pub fn load(path: &Path) -> Result<Self> {
        let file: LedgerFile = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read ledger {}", path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse ledger {}", path.display()))?
        } else {
            info!("No ledger at {}, starting empty", path.display());
            LedgerFile::default()
        };

        let mut ledger = Self {
            path: path.to_path_buf(),
            ids: Vec::new(),
            seen: HashSet::new(),
        };
        for id in file.processed_ids {
            ledger.record(id);
        }
        debug!("Loaded {} processed meeting ids", ledger.ids.len());
        Ok(ledger)
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn processed(&self) -> &HashSet<String> {
        &self.seen
    }

    /// Returns false if `id` was already recorded.
    pub fn record(&mut self, id: impl Into<String>) -> bool {
        let id = id.into();
        if !self.seen.insert(id.clone()) {
            return false;
        }
        self.ids.push(id);
        true
    }

    /// Write through a temp file in the same directory, then rename over the
    /// ledger.
    pub fn save(&self) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).context("Failed to create ledger directory")?;

        let content = serde_json::to_string_pretty(&LedgerFile {
            processed_ids: self.ids.clone(),
        })
        .context("Failed to serialize ledger")?;

        let mut tmp = NamedTempFile::new_in(&dir).context("Failed to create temp ledger")?;
        tmp.write_all(content.as_bytes())
            .context("Failed to write temp ledger")?;
        tmp.persist(&self.path)
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;

        info!("Saved {} processed ids to {}", self.ids.len(), self.path.display());
        Ok(())
    }
}
