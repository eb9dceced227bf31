// SPDX-License-Identifier: Apache-2.0

use super::{run_idempotent, Activator, ActivatorKind};
use crate::{renderer::connection_file_path, CommandRunner, NetCfgError};

/// `nmcli` driven activation of the rendered keyfiles.
pub struct NetworkManagerActivator<'a> {
    runner: &'a dyn CommandRunner,
    connection_dir: String,
}

impl<'a> NetworkManagerActivator<'a> {
    pub fn new(runner: &'a dyn CommandRunner, connection_dir: &str) -> Self {
        Self {
            runner,
            connection_dir: format!(
                "/{}",
                connection_dir.trim_start_matches('/')
            ),
        }
    }
}

impl Activator for NetworkManagerActivator<'_> {
    fn kind(&self) -> ActivatorKind {
        ActivatorKind::NetworkManager
    }

    fn bring_up_interface(&self, iface_name: &str) -> Result<(), NetCfgError> {
        let file_path = connection_file_path(&self.connection_dir, iface_name);
        let by_file = run_idempotent(
            self.runner,
            &["nmcli", "connection", "load", file_path.as_str()],
        )
        .and_then(|()| {
            run_idempotent(
                self.runner,
                &[
                    "nmcli",
                    "connection",
                    "up",
                    "filename",
                    file_path.as_str(),
                ],
            )
        });
        match by_file {
            Ok(()) => Ok(()),
            Err(e) => {
                log::info!(
                    "Failed to activate {file_path}: {e}, retrying by \
                    interface name"
                );
                run_idempotent(
                    self.runner,
                    &["nmcli", "connection", "reload"],
                )?;
                run_idempotent(
                    self.runner,
                    &["nmcli", "connection", "up", "ifname", iface_name],
                )
            }
        }
    }

    fn bring_down_interface(
        &self,
        iface_name: &str,
    ) -> Result<(), NetCfgError> {
        run_idempotent(
            self.runner,
            &["nmcli", "device", "disconnect", iface_name],
        )
    }
}
