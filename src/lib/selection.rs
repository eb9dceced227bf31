// SPDX-License-Identifier: Apache-2.0

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::{files::target_path, ErrorKind, NetCfgError};

/// Side effect free look up of tools and marker files under a target root.
/// Answers are cached, so renderer and activator selection of the same
/// invocation share the probes.
#[derive(Debug)]
pub struct SystemProbe {
    root: PathBuf,
    path_dirs: Vec<String>,
    cache: RefCell<HashMap<String, bool>>,
}

impl SystemProbe {
    /// Probe under `root` searching the `PATH` of current process in
    /// addition to the folders each backend names.
    pub fn new(root: &Path) -> Self {
        let path_dirs = std::env::var_os("PATH")
            .map(|p| {
                std::env::split_paths(&p)
                    .map(|d| d.to_string_lossy().to_string())
                    .collect()
            })
            .unwrap_or_default();
        Self::with_path(root, path_dirs)
    }

    pub fn with_path(root: &Path, path_dirs: Vec<String>) -> Self {
        Self {
            root: root.to_path_buf(),
            path_dirs,
            cache: RefCell::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        self.root.as_path()
    }

    fn cached<F>(&self, key: String, probe: F) -> bool
    where
        F: FnOnce() -> bool,
    {
        if let Some(found) = self.cache.borrow().get(&key) {
            return *found;
        }
        let found = probe();
        log::debug!("Probe {key}: {found}");
        self.cache.borrow_mut().insert(key, found);
        found
    }

    /// Whether an executable named `binary` exists in one of `dirs` or the
    /// `PATH` folders, all taken relative to the target root.
    pub fn has_binary(&self, binary: &str, dirs: &[&str]) -> bool {
        let key = format!("binary:{binary}:{}", dirs.join(":"));
        self.cached(key, || {
            let search_dirs: Vec<PathBuf> = dirs
                .iter()
                .copied()
                .chain(self.path_dirs.iter().map(String::as_str))
                .map(|d| target_path(&self.root, d))
                .collect();
            match std::env::join_paths(search_dirs) {
                Ok(paths) => {
                    which::which_in(binary, Some(paths), &self.root).is_ok()
                }
                Err(e) => {
                    log::warn!("Invalid search path for {binary}: {e}");
                    false
                }
            }
        })
    }

    pub fn has_file(&self, path: &str) -> bool {
        self.cached(format!("file:{path}"), || {
            target_path(&self.root, path).is_file()
        })
    }
}

/// A candidate mechanism with a side effect free availability check.
pub trait Backend: Copy + std::fmt::Display {
    fn available(&self, probe: &SystemProbe) -> bool;
}

/// Every available backend, in priority order.
pub fn search<B: Backend>(priority: &[B], probe: &SystemProbe) -> Vec<B> {
    priority
        .iter()
        .copied()
        .filter(|b| b.available(probe))
        .collect()
}

/// First available backend, or an error of `kind` listing every candidate
/// tried.
pub(crate) fn select<B: Backend>(
    priority: &[B],
    probe: &SystemProbe,
    kind: ErrorKind,
) -> Result<B, NetCfgError> {
    match search(priority, probe).first() {
        Some(b) => {
            log::debug!("Selected {b} from {}", join(priority));
            Ok(*b)
        }
        None => Err(NetCfgError::new(
            kind,
            format!(
                "No available backend under {} after trying: {}",
                probe.root.display(),
                join(priority)
            ),
        )),
    }
}

/// Convert configured names into backends, rejecting all unknown names at
/// once.
pub fn parse_priority<B>(names: &[String]) -> Result<Vec<B>, NetCfgError>
where
    B: FromStr<Err = NetCfgError>,
{
    let mut ret = Vec::new();
    let mut unknown = Vec::new();
    for name in names {
        match B::from_str(name) {
            Ok(b) => ret.push(b),
            Err(_) => unknown.push(name.as_str()),
        }
    }
    if !unknown.is_empty() {
        return Err(NetCfgError::new(
            ErrorKind::InvalidArgument,
            format!("Unknown names in priority list: {}", unknown.join(", ")),
        ));
    }
    Ok(ret)
}

fn join<B: Backend>(items: &[B]) -> String {
    items
        .iter()
        .map(|b| b.to_string())
        .collect::<Vec<String>>()
        .join(", ")
}
