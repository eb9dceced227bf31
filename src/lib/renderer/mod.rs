// SPDX-License-Identifier: Apache-2.0

mod eni;
mod netplan;
mod network_manager;
mod networkd;
mod sysconfig;

use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use self::eni::{EniOptions, EniRenderer};
pub use self::netplan::{NetplanOptions, NetplanRenderer};
pub use self::network_manager::{NetworkManagerOptions, NetworkManagerRenderer};
pub use self::networkd::{NetworkdOptions, NetworkdRenderer};
pub use self::sysconfig::{SysconfigFlavor, SysconfigOptions, SysconfigRenderer};

pub(crate) use self::network_manager::connection_file_path;

use crate::{
    files::{target_path, write_file},
    selection::{select, Backend, SystemProbe},
    CommandRunner, ErrorKind, NetCfgError, NetworkState,
};

const SBIN_DIRS: [&str; 4] = ["sbin", "usr/sbin", "bin", "usr/bin"];

/// One generated file, path relative to the target root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[non_exhaustive]
pub struct RenderedFile {
    pub path: String,
    pub content: String,
    #[serde(skip)]
    pub mode: u32,
}

impl RenderedFile {
    pub(crate) fn new(path: &str, content: String, mode: u32) -> Self {
        Self {
            path: path.trim_start_matches('/').to_string(),
            content,
            mode,
        }
    }
}

/// Where and with what a renderer writes.
pub struct RenderContext<'a> {
    pub target_root: &'a Path,
    pub runner: &'a dyn CommandRunner,
}

impl<'a> RenderContext<'a> {
    pub fn new(target_root: &'a Path, runner: &'a dyn CommandRunner) -> Self {
        Self {
            target_root,
            runner,
        }
    }

    pub(crate) fn is_root_fs(&self) -> bool {
        self.target_root == Path::new("/")
    }
}

pub trait Renderer {
    fn kind(&self) -> RendererKind;

    /// Content of every file this renderer would write, with no side effect.
    fn gen_conf(
        &self,
        state: &NetworkState,
    ) -> Result<Vec<RenderedFile>, NetCfgError>;

    /// Write generated files under the target root. Nothing is written when
    /// generation fails. Returns whether any file content changed.
    fn render(
        &self,
        state: &NetworkState,
        ctx: &RenderContext,
    ) -> Result<bool, NetCfgError> {
        let files = self.gen_conf(state)?;
        write_rendered(&files, ctx.target_root)
    }
}

pub(crate) fn write_rendered(
    files: &[RenderedFile],
    root: &Path,
) -> Result<bool, NetCfgError> {
    let mut changed = false;
    for file in files {
        if write_file(&target_path(root, &file.path), &file.content, file.mode)?
        {
            log::info!("Updated {}", file.path);
            changed = true;
        }
    }
    Ok(changed)
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize,
    Deserialize,
)]
#[serde(rename_all = "kebab-case")]
#[non_exhaustive]
pub enum RendererKind {
    Eni,
    Sysconfig,
    Netplan,
    NetworkManager,
    Networkd,
}

impl RendererKind {
    pub const DEFAULT_PRIORITY: [Self; 5] = [
        Self::Eni,
        Self::Sysconfig,
        Self::Netplan,
        Self::NetworkManager,
        Self::Networkd,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Eni => "eni",
            Self::Sysconfig => "sysconfig",
            Self::Netplan => "netplan",
            Self::NetworkManager => "network-manager",
            Self::Networkd => "networkd",
        }
    }

    /// Renderer of this kind configured from its section of `opts`.
    pub fn build(&self, opts: &RendererOptions) -> Box<dyn Renderer> {
        match self {
            Self::Eni => Box::new(EniRenderer::new(opts.eni.clone())),
            Self::Sysconfig => {
                Box::new(SysconfigRenderer::new(opts.sysconfig.clone()))
            }
            Self::Netplan => {
                Box::new(NetplanRenderer::new(opts.netplan.clone()))
            }
            Self::NetworkManager => Box::new(NetworkManagerRenderer::new(
                opts.network_manager.clone(),
            )),
            Self::Networkd => {
                Box::new(NetworkdRenderer::new(opts.networkd.clone()))
            }
        }
    }
}

impl std::fmt::Display for RendererKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for RendererKind {
    type Err = NetCfgError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::DEFAULT_PRIORITY
            .iter()
            .find(|k| k.name() == s)
            .copied()
            .ok_or_else(|| {
                NetCfgError::new(
                    ErrorKind::InvalidArgument,
                    format!(
                        "Unknown renderer {s}, supported: {}",
                        Self::DEFAULT_PRIORITY
                            .iter()
                            .map(|k| k.name())
                            .collect::<Vec<&str>>()
                            .join(", ")
                    ),
                )
            })
    }
}

impl Backend for RendererKind {
    fn available(&self, probe: &SystemProbe) -> bool {
        match self {
            Self::Eni => {
                probe.has_file("etc/network/interfaces")
                    && ["ifquery", "ifup", "ifdown"]
                        .iter()
                        .all(|b| probe.has_binary(b, &SBIN_DIRS))
            }
            Self::Sysconfig => {
                ["ifup", "ifdown"]
                    .iter()
                    .all(|b| probe.has_binary(b, &SBIN_DIRS))
                    && [
                        "etc/sysconfig/network-scripts/network-functions",
                        "etc/sysconfig/config",
                        "etc/sysconfig/network/config",
                    ]
                    .iter()
                    .any(|f| probe.has_file(f))
            }
            Self::Netplan => probe.has_binary("netplan", &SBIN_DIRS),
            Self::NetworkManager => {
                probe.has_binary("nmcli", &SBIN_DIRS)
                    && probe.has_binary("NetworkManager", &SBIN_DIRS)
            }
            Self::Networkd => {
                ["ip", "systemctl"]
                    .iter()
                    .all(|b| probe.has_binary(b, &SBIN_DIRS))
                    && [
                        "lib/systemd/systemd-networkd",
                        "usr/lib/systemd/systemd-networkd",
                    ]
                    .iter()
                    .any(|f| probe.has_file(f))
            }
        }
    }
}

/// First available renderer in `priority` order.
pub fn select_renderer(
    priority: &[RendererKind],
    probe: &SystemProbe,
) -> Result<RendererKind, NetCfgError> {
    let kind = select(priority, probe, ErrorKind::RendererNotFound)?;
    log::info!("Selected renderer {kind}");
    Ok(kind)
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields, default)]
#[non_exhaustive]
pub struct RendererOptions {
    pub eni: EniOptions,
    pub sysconfig: SysconfigOptions,
    pub netplan: NetplanOptions,
    pub networkd: NetworkdOptions,
    pub network_manager: NetworkManagerOptions,
}
