/*!
 * Flat KEY=VALUE environment file editing
 */

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvEntry {
    pub key: String,
    pub value: String,
}

impl EnvEntry {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Entries of an env file in file order. Blank lines, `#` comments and lines
/// without `=` are skipped. Keys are trimmed, values kept verbatim.
pub fn parse_entries(text: &str) -> Vec<EnvEntry> {
    text.lines()
        .filter(|line| {
            let trimmed = line.trim();
            !trimmed.is_empty() && !trimmed.starts_with('#')
        })
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| EnvEntry::new(key.trim(), value))
        .collect()
}

/// Reject keys that would not read back as the same key: ones containing
/// `=` or a line break, or starting with `#`. Blank keys pass; they are
/// dropped on save.
pub fn validate_key(key: &str) -> Result<()> {
    let key = key.trim();
    if key.starts_with('#') {
        return Err(Error::InvalidEnvEntry(format!("key '{}' would be read back as a comment", key)));
    }
    if key.contains('=') {
        return Err(Error::InvalidEnvEntry(format!("key '{}' must not contain '='", key)));
    }
    if key.contains(&['\n', '\r'][..]) {
        return Err(Error::InvalidEnvEntry("key must not contain a line break".to_string()));
    }
    Ok(())
}

/// Values are free text on a single line.
pub fn validate_value(value: &str) -> Result<()> {
    if value.contains(&['\n', '\r'][..]) {
        return Err(Error::InvalidEnvEntry("value must not contain a line break".to_string()));
    }
    Ok(())
}

fn checked_entry(key: &str, value: &str) -> Result<EnvEntry> {
    validate_key(key)?;
    validate_value(value)?;
    Ok(EnvEntry::new(key.trim(), value))
}

/// `KEY=VALUE` lines for every entry whose key is not blank.
pub fn render_entries(entries: &[EnvEntry], trailing_newline: bool) -> String {
    let mut text = entries
        .iter()
        .filter_map(|entry| {
            let key = entry.key.trim();
            (!key.is_empty()).then(|| format!("{}={}", key, entry.value))
        })
        .collect::<Vec<_>>()
        .join("\n");

    if trailing_newline && !text.is_empty() {
        text.push('\n');
    }
    text
}

/// In-memory copy of an env file. Edits stay in memory until [`EnvFile::save`]
/// overwrites the file.
#[derive(Debug, Clone)]
pub struct EnvFile {
    path: PathBuf,
    entries: Vec<EnvEntry>,
    trailing_newline: bool,
}

impl EnvFile {
    /// Empty file at `path`; nothing is written until saved.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: Vec::new(),
            trailing_newline: true,
        }
    }

    /// Load `path`, treating a missing file as empty.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let (entries, trailing_newline) = match fs::read_to_string(&path) {
            Ok(text) => (parse_entries(&text), text.is_empty() || text.ends_with('\n')),
            Err(e) if e.kind() == ErrorKind::NotFound => (Vec::new(), true),
            Err(e) => return Err(Error::io("failed to read", path, e)),
        };

        tracing::debug!("Loaded {} entries from {}", entries.len(), path.display());
        Ok(Self {
            path,
            entries,
            trailing_newline,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn entries(&self) -> &[EnvEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append an entry. The key is trimmed.
    pub fn add(&mut self, key: &str, value: &str) -> Result<()> {
        let entry = checked_entry(key, value)?;
        self.entries.push(entry);
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> Option<EnvEntry> {
        (index < self.entries.len()).then(|| self.entries.remove(index))
    }

    /// Replace the entry at `index`. Returns false when out of range.
    pub fn edit(&mut self, index: usize, key: &str, value: &str) -> Result<bool> {
        let entry = checked_entry(key, value)?;
        match self.entries.get_mut(index) {
            Some(slot) => {
                *slot = entry;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Update the first entry with `key`, or append one.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let entry = checked_entry(key, value)?;
        match self.entries.iter_mut().find(|e| e.key == entry.key) {
            Some(existing) => existing.value = entry.value,
            None => self.entries.push(entry),
        }
        Ok(())
    }

    /// Remove every entry with `key`, returning how many went.
    pub fn unset(&mut self, key: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.key != key);
        before - self.entries.len()
    }

    pub fn render(&self) -> String {
        render_entries(&self.entries, self.trailing_newline)
    }

    /// Overwrite the file with the current entries, dropping blank keys.
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| Error::io("failed to create", parent, e))?;
        }
        fs::write(&self.path, self.render()).map_err(|e| Error::io("failed to write", &self.path, e))?;

        tracing::info!("Saved {} entries to {}", self.entries.len(), self.path.display());
        Ok(())
    }
}
