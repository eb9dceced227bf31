// SPDX-License-Identifier: Apache-2.0

use super::{run_idempotent, Activator, ActivatorKind};
use crate::{CommandRunner, NetCfgError, NetworkState};

/// `netplan apply` has no per interface granularity, so any bring up request
/// turns into one apply of the whole configuration.
pub struct NetplanActivator<'a> {
    runner: &'a dyn CommandRunner,
}

impl<'a> NetplanActivator<'a> {
    pub fn new(runner: &'a dyn CommandRunner) -> Self {
        Self { runner }
    }

    fn apply(&self) -> Result<(), NetCfgError> {
        log::debug!("Applying netplan configuration");
        run_idempotent(self.runner, &["netplan", "apply"])
    }
}

impl Activator for NetplanActivator<'_> {
    fn kind(&self) -> ActivatorKind {
        ActivatorKind::Netplan
    }

    fn bring_up_interface(&self, iface_name: &str) -> Result<(), NetCfgError> {
        log::debug!("netplan applies all interfaces, requested {iface_name}");
        self.apply()
    }

    fn bring_down_interface(
        &self,
        iface_name: &str,
    ) -> Result<(), NetCfgError> {
        run_idempotent(
            self.runner,
            &["ip", "link", "set", "dev", iface_name, "down"],
        )
    }

    fn bring_up_interfaces(&self, iface_names: &[&str]) -> bool {
        log::debug!(
            "netplan applies all interfaces, requested {}",
            iface_names.join(" ")
        );
        match self.apply() {
            Ok(()) => true,
            Err(e) => {
                log::warn!("netplan apply failed: {e}");
                false
            }
        }
    }

    fn bring_up_all_interfaces(&self, _state: &NetworkState) -> bool {
        self.bring_up_interfaces(&[])
    }
}
