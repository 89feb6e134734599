//! In-memory file store using dashmap.

use std::io::{Cursor, Write};
use std::sync::Arc;

use bytes::Bytes;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::debug;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::error::WorkspaceError;

/// Shared virtual workspace.
///
/// Cloning is cheap and every clone sees the same entries. Names are
/// compared byte-for-byte; writing an existing name replaces its content.
#[derive(Debug, Clone, Default)]
pub struct VirtualWorkspace {
    entries: Arc<DashMap<String, Bytes>>,
}

impl VirtualWorkspace {
    /// Creates an empty workspace.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `content` under `name`, replacing any previous entry.
    pub fn write(&self, name: &str, content: impl Into<Bytes>) {
        let content = content.into();
        debug!(name, size = content.len(), "Workspace write");
        self.entries.insert(name.to_string(), content);
    }

    /// Stores `content` under `name` without replacing anything.
    ///
    /// A taken name becomes `<stem> (n).<ext>` with the smallest free `n`.
    /// Returns the name actually used.
    pub fn write_unique(&self, name: &str, content: impl Into<Bytes>) -> String {
        let content = content.into();
        let (stem, extension) = split_extension(name);
        let mut candidate = name.to_string();
        let mut counter = 0usize;
        loop {
            match self.entries.entry(candidate.clone()) {
                Entry::Vacant(slot) => {
                    debug!(name = %candidate, size = content.len(), "Workspace write");
                    slot.insert(content);
                    return candidate;
                }
                Entry::Occupied(_) => {
                    counter += 1;
                    candidate = format!("{stem} ({counter}){extension}");
                }
            }
        }
    }

    /// Content stored under `name`.
    pub fn read(&self, name: &str) -> Result<Bytes, WorkspaceError> {
        self.entries
            .get(name)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| WorkspaceError::NotFound {
                name: name.to_string(),
            })
    }

    /// Removes `name`. Removing a missing entry is not an error.
    pub fn remove(&self, name: &str) -> bool {
        let removed = self.entries.remove(name).is_some();
        if removed {
            debug!(name, "Workspace remove");
        }
        removed
    }

    /// Whether `name` exists.
    pub fn exists(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// All entry names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the workspace is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all entry sizes.
    pub fn total_bytes(&self) -> u64 {
        self.entries.iter().map(|e| e.value().len() as u64).sum()
    }

    /// Drops every entry.
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Packs `names` into a zip archive, in the given order.
    ///
    /// Fails with [`WorkspaceError::NotFound`] on the first missing entry.
    pub fn bundle_zip<S: AsRef<str>>(&self, names: &[S]) -> Result<Bytes, WorkspaceError> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

        for name in names {
            let name = name.as_ref();
            let content = self.read(name)?;
            writer.start_file(name, options)?;
            writer.write_all(&content)?;
        }

        let cursor = writer.finish()?;
        let archive = cursor.into_inner();
        debug!(files = names.len(), size = archive.len(), "Workspace archive built");
        Ok(Bytes::from(archive))
    }
}

fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) if idx > 0 => name.split_at(idx),
        _ => (name, ""),
    }
}
