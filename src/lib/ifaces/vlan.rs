// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

use crate::{ErrorKind, NetCfgError};

const VLAN_ID_MAX: u32 = 4094;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
#[non_exhaustive]
pub struct VlanConfig {
    pub base_iface: String,
    pub id: u16,
}

impl VlanConfig {
    pub(crate) fn new(base_iface: &str, id: u32) -> Result<Self, NetCfgError> {
        if id == 0 || id > VLAN_ID_MAX {
            return Err(NetCfgError::new(
                ErrorKind::InvalidCommand,
                format!("VLAN id {id} is out of range 1-{VLAN_ID_MAX}"),
            ));
        }
        Ok(Self {
            base_iface: base_iface.to_string(),
            id: id as u16,
        })
    }
}
