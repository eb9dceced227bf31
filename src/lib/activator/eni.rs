// SPDX-License-Identifier: Apache-2.0

use super::{run_idempotent, Activator, ActivatorKind};
use crate::{CommandRunner, NetCfgError};

/// ifupdown `ifup`/`ifdown`.
pub struct IfUpDownActivator<'a> {
    runner: &'a dyn CommandRunner,
}

impl<'a> IfUpDownActivator<'a> {
    pub fn new(runner: &'a dyn CommandRunner) -> Self {
        Self { runner }
    }
}

impl Activator for IfUpDownActivator<'_> {
    fn kind(&self) -> ActivatorKind {
        ActivatorKind::Eni
    }

    fn bring_up_interface(&self, iface_name: &str) -> Result<(), NetCfgError> {
        log::debug!("Bringing up {iface_name} with ifup");
        run_idempotent(self.runner, &["ifup", iface_name])
    }

    fn bring_down_interface(
        &self,
        iface_name: &str,
    ) -> Result<(), NetCfgError> {
        log::debug!("Bringing down {iface_name} with ifdown");
        run_idempotent(self.runner, &["ifdown", iface_name])
    }
}
