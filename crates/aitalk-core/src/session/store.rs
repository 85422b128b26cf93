//! Session persistence: list, save and load session files.

use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

use crate::types::Session;
use crate::utils;

/// Upper bound on numeric suffixes tried when a generated filename is taken.
const MAX_NAME_ATTEMPTS: u32 = 1000;

/// Errors from reading or writing session files.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid session file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

// ─────────────────────────────────────────────
// Free functions
// ─────────────────────────────────────────────

/// List the `.json` session files in `directory`, sorted by name.
///
/// Only regular files directly inside the directory are considered.
pub fn list_sessions(directory: &Path) -> Result<Vec<String>, StoreError> {
    let entries = std::fs::read_dir(directory).map_err(|e| StoreError::io(directory, e))?;

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| StoreError::io(directory, e))?;
        let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
        if !is_file {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            if name.ends_with(".json") {
                names.push(name.to_string());
            }
        }
    }

    names.sort();
    Ok(names)
}

/// Save `session` as `{base_name}_{timestamp}.json` inside `directory`.
///
/// Returns the filename that was written. If the timestamped name is already
/// taken a `-2`, `-3`, … suffix is added; existing files are never overwritten.
pub fn save_session(directory: &Path, base_name: &str, session: &Session) -> Result<String, StoreError> {
    let stem = session_stem(base_name);
    let timestamp = utils::file_timestamp();
    let json = serde_json::to_string_pretty(session).map_err(|e| StoreError::Parse {
        path: directory.to_path_buf(),
        source: e,
    })?;

    for attempt in 1..=MAX_NAME_ATTEMPTS {
        let filename = candidate_name(&stem, &timestamp, attempt);
        let path = directory.join(&filename);

        let file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                debug!(file = %filename, "session filename taken, trying next suffix");
                continue;
            }
            Err(e) => return Err(StoreError::io(&path, e)),
        };

        fill_new_file(&path, file, json.as_bytes())?;

        debug!(
            file = %filename,
            messages = session.messages.len(),
            "saved session"
        );
        return Ok(filename);
    }

    Err(StoreError::io(
        directory,
        std::io::Error::new(ErrorKind::AlreadyExists, "no free session filename"),
    ))
}

/// Write `bytes` into a file just created at `path`, removing it again on failure.
fn fill_new_file(path: &Path, mut file: impl Write, bytes: &[u8]) -> Result<(), StoreError> {
    if let Err(e) = file.write_all(bytes).and_then(|_| file.flush()) {
        drop(file);
        if let Err(remove_err) = std::fs::remove_file(path) {
            warn!(file = %path.display(), error = %remove_err, "failed to remove partial session file");
        }
        return Err(StoreError::io(path, e));
    }
    Ok(())
}

/// Load a session file. Missing fields fall back to empty values.
pub fn load_session(path: &Path) -> Result<Session, StoreError> {
    let content = std::fs::read_to_string(path).map_err(|e| StoreError::io(path, e))?;
    let session: Session = serde_json::from_str(&content).map_err(|e| StoreError::Parse {
        path: path.to_path_buf(),
        source: e,
    })?;

    debug!(
        file = %path.display(),
        messages = session.messages.len(),
        "loaded session"
    );
    Ok(session)
}

/// Reduce a user-supplied name to a safe filename stem.
///
/// Directory components and a trailing `.json` are dropped.
fn session_stem(base_name: &str) -> String {
    let file_part = base_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(base_name)
        .trim();
    let stem = file_part.strip_suffix(".json").unwrap_or(file_part);
    let safe = utils::safe_filename(stem);
    if safe.is_empty() {
        "session".to_string()
    } else {
        safe
    }
}

fn candidate_name(stem: &str, timestamp: &str, attempt: u32) -> String {
    if attempt == 1 {
        format!("{stem}_{timestamp}.json")
    } else {
        format!("{stem}_{timestamp}-{attempt}.json")
    }
}

// ─────────────────────────────────────────────
// SessionStore
// ─────────────────────────────────────────────

/// A session directory with list/save/load bound to it.
#[derive(Clone, Debug)]
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    /// Open a store rooted at `dir` (default `~/.aitalk/sessions/`).
    ///
    /// The directory is created if it doesn't exist.
    pub fn new(dir: Option<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.unwrap_or_else(utils::get_sessions_path);
        std::fs::create_dir_all(&dir).map_err(|e| StoreError::io(&dir, e))?;
        Ok(SessionStore { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Full path of a session file in this store.
    ///
    /// Absolute paths are returned unchanged so callers can load files from elsewhere.
    pub fn path_for(&self, filename: &str) -> PathBuf {
        let candidate = Path::new(filename);
        if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            self.dir.join(filename)
        }
    }

    pub fn list(&self) -> Result<Vec<String>, StoreError> {
        list_sessions(&self.dir)
    }

    pub fn save(&self, base_name: &str, session: &Session) -> Result<String, StoreError> {
        save_session(&self.dir, base_name, session)
    }

    pub fn load(&self, filename: &str) -> Result<Session, StoreError> {
        load_session(&self.path_for(filename))
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
