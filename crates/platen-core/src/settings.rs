// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// User-chosen print option overrides, applied at job submission time.
//
// The store keeps insertion order: dialogs present settings in the order the
// user picked them, and the wire serialization preserves that order. The
// on-disk format is a count line followed by one `name#value#` line per
// entry; `#` therefore cannot appear in names or values.

use std::path::Path;

use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Insertion-ordered option-name → chosen-value store.
///
/// Setting an existing name replaces its value in place without changing
/// order or count. The entry count always equals the number of distinct
/// names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    entries: Vec<(String, String)>,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct settings.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Set an option value, replacing any previous value in place.
    pub fn set(&mut self, name: &str, value: &str) {
        if name.is_empty() {
            warn!("ignoring setting with empty name");
            return;
        }
        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some((_, v)) => *v = value.to_string(),
            None => self.entries.push((name.to_string(), value.to_string())),
        }
    }

    /// Look up a value by option name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Clear a setting. Returns `false` when the name was not set, which
    /// callers report as a failed clear.
    pub fn clear(&mut self, name: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(n, _)| n != name);
        self.entries.len() != before
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Owned `(name, value)` pairs in insertion order, as handed to the
    /// transport when submitting a job.
    pub fn pairs(&self) -> Vec<(String, String)> {
        self.entries.clone()
    }

    /// Copy every entry of `source` into `self`, overwriting values for
    /// names that already exist.
    pub fn merge_from(&mut self, source: &Settings) {
        for (name, value) in source.iter() {
            self.set(name, value);
        }
    }

    // -- flat-file codec ----------------------------------------------------

    /// Encode to the flat settings format: count line, then `name#value#`
    /// lines in insertion order.
    pub fn encode(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("{}\n", self.entries.len()));
        for (name, value) in &self.entries {
            out.push_str(&format!("{name}#{value}#\n"));
        }
        out
    }

    /// Decode the flat settings format. `origin` is used only for error
    /// context.
    pub fn decode(text: &str, origin: &Path) -> Result<Settings> {
        let mut lines = text.lines();
        Self::decode_stream(&mut lines, origin)
    }

    /// Decode a settings block (count line plus entries) from a line
    /// iterator, leaving any following lines unconsumed. The pickle codec
    /// embeds a settings block after the printer fields and reuses this.
    pub fn decode_stream(lines: &mut std::str::Lines<'_>, origin: &Path) -> Result<Settings> {
        let count_line = lines.next().ok_or_else(|| Error::Malformed {
            path: origin.to_path_buf(),
            reason: "missing settings count line".into(),
        })?;
        let count: usize = count_line.trim().parse().map_err(|_| Error::Malformed {
            path: origin.to_path_buf(),
            reason: format!("invalid settings count {count_line:?}"),
        })?;

        let mut settings = Settings::new();
        for i in 0..count {
            let line = lines.next().ok_or_else(|| Error::Malformed {
                path: origin.to_path_buf(),
                reason: format!("truncated after {i} of {count} settings"),
            })?;
            let (name, value) = parse_entry(line).ok_or_else(|| Error::Malformed {
                path: origin.to_path_buf(),
                reason: format!("invalid settings entry {line:?}"),
            })?;
            settings.set(name, value);
        }
        Ok(settings)
    }

    /// Write the store to `path` in the flat settings format.
    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.encode())?;
        debug!(path = %path.display(), count = self.len(), "settings saved");
        Ok(())
    }

    /// Read a store previously written by [`save`](Self::save).
    pub fn load(path: &Path) -> Result<Settings> {
        let text = std::fs::read_to_string(path)?;
        let settings = Self::decode(&text, path)?;
        debug!(path = %path.display(), count = settings.len(), "settings loaded");
        Ok(settings)
    }
}

/// Split one `name#value#` line. The trailing `#` is tolerated but not
/// required; text after the second `#` is ignored.
fn parse_entry(line: &str) -> Option<(&str, &str)> {
    let line = line.trim_end_matches(['\r', '\n']);
    let mut parts = line.splitn(3, '#');
    let name = parts.next()?;
    let value = parts.next()?;
    if name.is_empty() {
        return None;
    }
    Some((name, value))
}
