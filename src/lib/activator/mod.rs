// SPDX-License-Identifier: Apache-2.0

mod eni;
mod netplan;
mod network_manager;
mod networkd;

use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use self::eni::IfUpDownActivator;
pub use self::netplan::NetplanActivator;
pub use self::network_manager::NetworkManagerActivator;
pub use self::networkd::NetworkdActivator;

use crate::{
    selection::{select, Backend, SystemProbe},
    CommandRunner, ErrorKind, InterfaceType, NetCfgError, NetworkState,
    RendererKind, RendererOptions,
};

// Tool output meaning the requested state is already in place.
const ALREADY_DONE_MSGS: [&str; 3] =
    ["already configured", "already up", "already active"];

/// Brings rendered configuration live.
///
/// Failure of one interface never stops the others: the batch operations
/// attempt every interface and report whether all of them succeeded.
pub trait Activator {
    fn kind(&self) -> ActivatorKind;

    fn bring_up_interface(&self, iface_name: &str) -> Result<(), NetCfgError>;

    fn bring_down_interface(&self, iface_name: &str)
        -> Result<(), NetCfgError>;

    fn bring_up_interfaces(&self, iface_names: &[&str]) -> bool {
        let mut all_ok = true;
        for iface_name in iface_names {
            if let Err(e) = self.bring_up_interface(iface_name) {
                log::warn!("Failed to bring up {iface_name}: {e}");
                all_ok = false;
            }
        }
        all_ok
    }

    fn bring_down_interfaces(&self, iface_names: &[&str]) -> bool {
        let mut all_ok = true;
        for iface_name in iface_names {
            if let Err(e) = self.bring_down_interface(iface_name) {
                log::warn!("Failed to bring down {iface_name}: {e}");
                all_ok = false;
            }
        }
        all_ok
    }

    fn bring_up_all_interfaces(&self, state: &NetworkState) -> bool {
        self.bring_up_interfaces(&managed_iface_names(state))
    }

    fn bring_down_all_interfaces(&self, state: &NetworkState) -> bool {
        self.bring_down_interfaces(&managed_iface_names(state))
    }
}

// Every non loopback interface, lower devices first.
fn managed_iface_names(state: &NetworkState) -> Vec<&str> {
    state
        .interfaces_in_creation_order()
        .into_iter()
        .filter(|i| i.iface_type != InterfaceType::Loopback)
        .map(|i| i.name.as_str())
        .collect()
}

/// Run a command, treating "already up" style failures as success.
pub(crate) fn run_idempotent(
    runner: &dyn CommandRunner,
    cmd: &[&str],
) -> Result<(), NetCfgError> {
    match runner.run(cmd) {
        Ok(_) => Ok(()),
        Err(e) => {
            let output = format!("{}\n{}", e.stdout, e.stderr).to_lowercase();
            if ALREADY_DONE_MSGS.iter().any(|m| output.contains(m)) {
                log::debug!("{} reports nothing to do", cmd.join(" "));
                Ok(())
            } else {
                Err(e.into())
            }
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize,
    Deserialize,
)]
#[serde(rename_all = "kebab-case")]
#[non_exhaustive]
pub enum ActivatorKind {
    Eni,
    Netplan,
    NetworkManager,
    Networkd,
}

impl ActivatorKind {
    pub const DEFAULT_PRIORITY: [Self; 4] = [
        Self::Eni,
        Self::Netplan,
        Self::NetworkManager,
        Self::Networkd,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Eni => "eni",
            Self::Netplan => "netplan",
            Self::NetworkManager => "network-manager",
            Self::Networkd => "networkd",
        }
    }

    pub fn build<'a>(
        &self,
        runner: &'a dyn CommandRunner,
        opts: &RendererOptions,
    ) -> Box<dyn Activator + 'a> {
        match self {
            Self::Eni => Box::new(IfUpDownActivator::new(runner)),
            Self::Netplan => Box::new(NetplanActivator::new(runner)),
            Self::NetworkManager => Box::new(NetworkManagerActivator::new(
                runner,
                &opts.network_manager.connection_dir,
            )),
            Self::Networkd => Box::new(NetworkdActivator::new(runner)),
        }
    }
}

impl std::fmt::Display for ActivatorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for ActivatorKind {
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
                        "Unknown activator {s}, supported: {}",
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

// Activation needs the same tooling the matching renderer probes for.
impl Backend for ActivatorKind {
    fn available(&self, probe: &SystemProbe) -> bool {
        match self {
            Self::Eni => RendererKind::Eni.available(probe),
            Self::Netplan => RendererKind::Netplan.available(probe),
            Self::NetworkManager => {
                RendererKind::NetworkManager.available(probe)
            }
            Self::Networkd => RendererKind::Networkd.available(probe),
        }
    }
}

/// First available activator in `priority` order.
pub fn select_activator(
    priority: &[ActivatorKind],
    probe: &SystemProbe,
) -> Result<ActivatorKind, NetCfgError> {
    let kind = select(priority, probe, ErrorKind::NoActivator)?;
    log::info!("Selected activator {kind}");
    Ok(kind)
}
