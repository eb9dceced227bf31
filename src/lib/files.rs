// SPDX-License-Identifier: Apache-2.0

use std::fs;
use std::io::ErrorKind as IoErrorKind;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use crate::{ErrorKind, NetCfgError};

pub(crate) const DEFAULT_FILE_MODE: u32 = 0o644;
pub(crate) const PRIVATE_FILE_MODE: u32 = 0o600;

/// Resolve a path relative to the target root. Leading `/` is ignored so
/// both `etc/foo` and `/etc/foo` land inside the root.
pub fn target_path(root: &Path, path: &str) -> PathBuf {
    root.join(path.trim_start_matches('/'))
}

/// Current content of a file, `None` when it does not exist.
pub(crate) fn read_file(path: &Path) -> Result<Option<String>, NetCfgError> {
    match fs::read_to_string(path) {
        Ok(s) => Ok(Some(s)),
        Err(e) if e.kind() == IoErrorKind::NotFound => Ok(None),
        Err(e) => Err(NetCfgError::new(
            ErrorKind::IoError,
            format!("Failed to read {}: {e}", path.display()),
        )),
    }
}

/// Write content with explicit permission bits, creating parent folders.
/// Returns whether the file content changed.
pub(crate) fn write_file(
    path: &Path,
    content: &str,
    mode: u32,
) -> Result<bool, NetCfgError> {
    let changed = read_file(path)?.as_deref() != Some(content);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            NetCfgError::new(
                ErrorKind::IoError,
                format!("Failed to create folder {}: {e}", parent.display()),
            )
        })?;
    }
    if changed {
        fs::write(path, content).map_err(|e| {
            NetCfgError::new(
                ErrorKind::IoError,
                format!("Failed to write {}: {e}", path.display()),
            )
        })?;
        log::debug!("Wrote {}", path.display());
    } else {
        log::debug!("Content of {} unchanged", path.display());
    }
    fs::set_permissions(path, fs::Permissions::from_mode(mode)).map_err(
        |e| {
            NetCfgError::new(
                ErrorKind::IoError,
                format!("Failed to set mode of {}: {e}", path.display()),
            )
        },
    )?;
    Ok(changed)
}

pub(crate) fn remove_file(path: &Path) -> Result<(), NetCfgError> {
    match fs::remove_file(path) {
        Ok(()) => {
            log::info!("Removed {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == IoErrorKind::NotFound => Ok(()),
        Err(e) => Err(NetCfgError::new(
            ErrorKind::IoError,
            format!("Failed to remove {}: {e}", path.display()),
        )),
    }
}
