use std::fs;
use std::io::{ErrorKind, Write};
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::codec::{decode, encode};
use crate::domain::DurationLedger;
use crate::error::TrackError;

/// Reads the ledger at `path`. A zero-length or blank file is an empty ledger.
pub fn load_ledger(path: &Path) -> Result<DurationLedger, TrackError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            return Err(TrackError::StorageNotFound(path.to_path_buf()));
        }
        Err(err) => return Err(TrackError::io(path, err)),
    };
    let raw = String::from_utf8(bytes).map_err(|err| {
        TrackError::corrupt(format!(
            "{} is not valid UTF-8 (byte {})",
            path.display(),
            err.utf8_error().valid_up_to()
        ))
    })?;

    if raw.trim().is_empty() {
        debug!(path = %path.display(), "ledger file is empty");
        return Ok(DurationLedger::new());
    }

    decode(&raw)
}

/// Like [`load_ledger`], but a missing file counts as the first run: the
/// parent directories and an empty file are created.
pub fn load_or_create_ledger(path: &Path) -> Result<DurationLedger, TrackError> {
    match load_ledger(path) {
        Err(TrackError::StorageNotFound(_)) => {
            info!(path = %path.display(), "no ledger yet, starting a new one");
            ensure_parent(path)?;
            fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|err| TrackError::io(path, err))?;
            Ok(DurationLedger::new())
        }
        other => other,
    }
}

/// Replaces the file at `path` with the encoded ledger. The content goes to a
/// temporary file in the same directory first and is renamed into place, so
/// readers never see a half-written ledger.
pub fn save_ledger(path: &Path, ledger: &DurationLedger) -> Result<(), TrackError> {
    let parent = ensure_parent(path)?;
    let text = encode(ledger);

    let mut temp_file = NamedTempFile::new_in(parent).map_err(|err| TrackError::io(parent, err))?;
    temp_file
        .write_all(text.as_bytes())
        .and_then(|()| temp_file.write_all(b"\n"))
        .and_then(|()| temp_file.as_file().sync_all())
        .map_err(|err| TrackError::io(temp_file.path(), err))?;
    temp_file
        .persist(path)
        .map_err(|err| TrackError::io(path, err.error))?;

    debug!(path = %path.display(), bytes = text.len(), "ledger saved");
    Ok(())
}

fn ensure_parent(path: &Path) -> Result<&Path, TrackError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(|err| TrackError::io(parent, err))?;
    Ok(parent)
}
