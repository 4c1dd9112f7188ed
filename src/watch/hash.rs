// src/watch/hash.rs

//! Content hashing used to drop `changed` events that did not change a
//! file's bytes (editors that touch on save, `git checkout` of the same
//! revision, ...).

use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use blake3::Hasher;
use tracing::debug;

use crate::fs::FileSystem;
use crate::types::FileEventKind;

/// Compute the hash of a single file.
pub fn compute_file_hash(fs: &dyn FileSystem, path: &Path) -> Result<String> {
    let mut hasher = Hasher::new();
    let mut file = fs
        .open_read(path)
        .with_context(|| format!("opening file for hashing: {:?}", path))?;
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().to_hex().to_string())
}

/// Last seen content hash per path, for one watch task.
#[derive(Debug, Default)]
pub struct ContentHashes {
    hashes: HashMap<PathBuf, String>,
}

impl ContentHashes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome of an event and decide whether it should be
    /// handled.
    ///
    /// `hash` is the file's current hash (`None` for deletions or when the
    /// file could not be read). Only a `Changed` event whose hash equals the
    /// previously recorded one is suppressed.
    pub fn observe(&mut self, kind: FileEventKind, path: &Path, hash: Option<String>) -> bool {
        match (kind, hash) {
            (FileEventKind::Deleted, _) | (_, None) => {
                self.hashes.remove(path);
                true
            }
            (FileEventKind::Added, Some(h)) => {
                self.hashes.insert(path.to_path_buf(), h);
                true
            }
            (FileEventKind::Changed, Some(h)) => {
                let unchanged = self.hashes.get(path).is_some_and(|old| *old == h);
                if unchanged {
                    debug!(?path, "content hash unchanged; suppressing event");
                    return false;
                }
                self.hashes.insert(path.to_path_buf(), h);
                true
            }
        }
    }
}
