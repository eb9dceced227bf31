// SPDX-License-Identifier: Apache-2.0

use super::{run_idempotent, Activator, ActivatorKind};
use crate::{CommandRunner, NetCfgError, NetworkState};

pub struct NetworkdActivator<'a> {
    runner: &'a dyn CommandRunner,
}

impl<'a> NetworkdActivator<'a> {
    pub fn new(runner: &'a dyn CommandRunner) -> Self {
        Self { runner }
    }
}

impl Activator for NetworkdActivator<'_> {
    fn kind(&self) -> ActivatorKind {
        ActivatorKind::Networkd
    }

    fn bring_up_interface(&self, iface_name: &str) -> Result<(), NetCfgError> {
        run_idempotent(
            self.runner,
            &["ip", "link", "set", "dev", iface_name, "up"],
        )
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

    // Restarting the daemons makes networkd re-read every unit.
    fn bring_up_all_interfaces(&self, _state: &NetworkState) -> bool {
        match run_idempotent(
            self.runner,
            &[
                "systemctl",
                "restart",
                "systemd-networkd",
                "systemd-resolved",
            ],
        ) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Failed to restart systemd-networkd: {e}");
                false
            }
        }
    }
}
