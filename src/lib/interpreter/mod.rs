// SPDX-License-Identifier: Apache-2.0

mod builder;
mod v1;
mod v2;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use self::builder::NetworkStateBuilder;
use crate::{ErrorKind, NetCfgError, NetworkState};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields, default)]
#[non_exhaustive]
pub struct ParseOptions {
    /// Log and skip malformed v1 commands instead of failing.
    pub skip_broken: bool,
    /// Rendering for netplan, which consumes `wifis` natively.
    pub netplan_target: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            skip_broken: true,
            netplan_target: false,
        }
    }
}

impl ParseOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn skip_broken(mut self, value: bool) -> Self {
        self.skip_broken = value;
        self
    }

    pub fn netplan_target(mut self, value: bool) -> Self {
        self.netplan_target = value;
        self
    }
}

/// Build the canonical [NetworkState] from a v1 or v2 network configuration.
/// A top level `network` key wrapping the configuration is accepted.
pub fn parse_net_config(
    config: &Value,
    opts: &ParseOptions,
) -> Result<NetworkState, NetCfgError> {
    let config = match config.get("network") {
        Some(inner) if config.get("version").is_none() => inner,
        _ => config,
    };
    let config_map = config.as_object().ok_or_else(|| {
        NetCfgError::new(
            ErrorKind::InvalidArgument,
            format!("Network configuration should be a mapping, got {config}"),
        )
    })?;
    let version = match config_map.get("version") {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    let mut builder = NetworkStateBuilder::new();
    match version {
        Some(1) => {
            let commands: &[Value] = match config_map.get("config") {
                Some(Value::Array(cmds)) => cmds.as_slice(),
                None | Some(Value::Null) => {
                    log::warn!("Network configuration v1 has no commands");
                    &[]
                }
                Some(v) => {
                    return Err(NetCfgError::new(
                        ErrorKind::InvalidArgument,
                        format!("Key 'config' should be a list, got {v}"),
                    ));
                }
            };
            v1::interpret_v1(&mut builder, commands, opts)?;
            log::debug!("Parsed {} v1 commands", commands.len());
            builder.build(1, None)
        }
        Some(2) => {
            v2::interpret_v2(&mut builder, config_map, opts)?;
            builder.build(2, Some(config.clone()))
        }
        _ => Err(NetCfgError::new(
            ErrorKind::InvalidArgument,
            format!(
                "Unsupported network configuration version {}, \
                expecting 1 or 2",
                config_map
                    .get("version")
                    .map(|v| v.to_string())
                    .unwrap_or_else(|| "<missing>".to_string())
            ),
        )),
    }
}
