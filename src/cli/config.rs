// SPDX-License-Identifier: Apache-2.0

use std::io::Read;

use netcfg::{
    parse_priority, ActivatorKind, EniOptions, NetplanOptions,
    NetworkManagerOptions, NetworkdOptions, ParseOptions, RendererKind,
    RendererOptions, SysconfigOptions,
};
use serde::Deserialize;

use crate::error::CliError;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Config {
    #[serde(default)]
    pub(crate) interpreter: InterpreterConfig,
    #[serde(default)]
    pub(crate) renderer: RendererConfig,
    #[serde(default)]
    pub(crate) activator: ActivatorConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct InterpreterConfig {
    #[serde(default)]
    pub(crate) skip_broken: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct RendererConfig {
    #[serde(default)]
    pub(crate) priority: Vec<String>,
    #[serde(default)]
    pub(crate) eni: EniOptions,
    #[serde(default)]
    pub(crate) sysconfig: SysconfigOptions,
    #[serde(default)]
    pub(crate) netplan: NetplanOptions,
    #[serde(default)]
    pub(crate) networkd: NetworkdOptions,
    #[serde(default, rename = "network-manager")]
    pub(crate) network_manager: NetworkManagerOptions,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ActivatorConfig {
    #[serde(default)]
    pub(crate) priority: Vec<String>,
}

impl Config {
    pub(crate) const DEFAULT_CONFIG_PATH: &'static str =
        "/etc/netcfg/netcfg.conf";

    pub(crate) fn load(path: &str) -> Result<Self, CliError> {
        let path = std::path::Path::new(path);
        if !path.exists() {
            log::debug!("{} not found, using defaults", path.display());
            return Ok(Config::default());
        }
        let mut fd = std::fs::File::open(path)?;
        let mut content = String::new();
        fd.read_to_string(&mut content)?;
        match toml::from_str::<Config>(&content) {
            Ok(c) => {
                log::info!("Configuration loaded:\n{content}");
                Ok(c)
            }
            Err(e) => Err(CliError::from(format!(
                "Failed to read configuration from {}: {e}",
                path.display()
            ))),
        }
    }

    pub(crate) fn parse_options(&self) -> ParseOptions {
        let mut opts = ParseOptions::new();
        if let Some(skip_broken) = self.interpreter.skip_broken {
            opts = opts.skip_broken(skip_broken);
        }
        opts
    }

    pub(crate) fn renderer_options(&self) -> RendererOptions {
        let mut opts = RendererOptions::default();
        opts.eni = self.renderer.eni.clone();
        opts.sysconfig = self.renderer.sysconfig.clone();
        opts.netplan = self.renderer.netplan.clone();
        opts.networkd = self.renderer.networkd.clone();
        opts.network_manager = self.renderer.network_manager.clone();
        opts
    }

    pub(crate) fn renderer_priority(
        &self,
    ) -> Result<Vec<RendererKind>, CliError> {
        if self.renderer.priority.is_empty() {
            Ok(RendererKind::DEFAULT_PRIORITY.to_vec())
        } else {
            Ok(parse_priority(&self.renderer.priority)?)
        }
    }

    pub(crate) fn activator_priority(
        &self,
    ) -> Result<Vec<ActivatorKind>, CliError> {
        if self.activator.priority.is_empty() {
            Ok(ActivatorKind::DEFAULT_PRIORITY.to_vec())
        } else {
            Ok(parse_priority(&self.activator.priority)?)
        }
    }
}
