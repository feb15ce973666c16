use serde::{Deserialize, Serialize};

/// Column order of the backing CSV. Fixed; no index column is persisted.
pub const COLUMNS: [&str; 3] = ["role", "stored_filename", "original_filename"];

/// One job role and the document uploaded for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobEntry {
    pub role: String,
    /// On-disk blob key: `<hex token>_<original_filename>`.
    pub stored_filename: String,
    pub original_filename: String,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TableError {
    #[error("No job at position {position} (table has {len} rows)")]
    OutOfRange { position: usize, len: usize },

    #[error("Selection '{0}' does not match the current job list")]
    StaleLabel(String),
}

/// The ordered job table. Row positions are contiguous from zero and only
/// meaningful for the current unfiltered contents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobTable {
    entries: Vec<JobEntry>,
}

impl JobTable {
    pub fn new(entries: Vec<JobEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[JobEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Adds an entry at the end. In-memory only.
    pub fn append(&mut self, entry: JobEntry) -> &Self {
        self.entries.push(entry);
        self
    }

    /// Takes back the most recent append.
    pub fn pop(&mut self) -> Option<JobEntry> {
        self.entries.pop()
    }

    /// Removes the entry at `position`; later rows shift down by one. In-memory only.
    pub fn delete(&mut self, position: usize) -> Result<JobEntry, TableError> {
        if position >= self.entries.len() {
            return Err(TableError::OutOfRange {
                position,
                len: self.entries.len(),
            });
        }
        Ok(self.entries.remove(position))
    }

    /// Puts a previously removed entry back where it was.
    pub fn restore(&mut self, position: usize, entry: JobEntry) {
        let position = position.min(self.entries.len());
        self.entries.insert(position, entry);
    }

    pub fn position_of(&self, stored_filename: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.stored_filename == stored_filename)
    }

    /// Entries whose role contains `query`, ignoring case, with their
    /// unfiltered positions. A blank query matches everything.
    pub fn search(&self, query: &str) -> Vec<(usize, &JobEntry)> {
        let needle = query.trim().to_lowercase();
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| needle.is_empty() || role_matches(&e.role, &needle))
            .collect()
    }

    /// Admin selection labels, always built from the full table.
    pub fn labels(&self) -> Vec<String> {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, e)| entry_label(i, e))
            .collect()
    }

    /// Resolves an admin label back to a row position, rejecting labels that
    /// no longer describe the row at that position.
    pub fn resolve_label(&self, label: &str) -> Result<usize, TableError> {
        let stale = || TableError::StaleLabel(label.to_string());

        let (index, _) = label.split_once(':').ok_or_else(stale)?;
        let position: usize = index.trim().parse().map_err(|_| stale())?;
        let entry = self.entries.get(position).ok_or_else(stale)?;

        // Form posts normalise line breaks in option values to CRLF.
        if entry_label(position, entry) != label.replace("\r\n", "\n") {
            return Err(stale());
        }
        Ok(position)
    }
}

pub fn entry_label(position: usize, entry: &JobEntry) -> String {
    format!("{position}: {}", entry.role)
}

fn role_matches(role: &str, needle: &str) -> bool {
    !role.is_empty() && role.to_lowercase().contains(needle)
}

#[cfg(test)]
pub(crate) fn entry(role: &str, stored: &str) -> JobEntry {
    JobEntry {
        role: role.to_string(),
        stored_filename: stored.to_string(),
        original_filename: stored
            .split_once('_')
            .map(|(_, name)| name)
            .unwrap_or(stored)
            .to_string(),
    }
}
