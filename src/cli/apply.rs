// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;

use netcfg::{apply_network_config, ApplyOptions, SystemRunner};

use crate::{config::Config, error::CliError, state::config_from_file};

/// Render and, when anything changed, bring the interfaces up.
pub(crate) fn apply(
    matches: &clap::ArgMatches,
    config: &Config,
) -> Result<String, CliError> {
    let file_path = matches
        .value_of("CONFIG_FILE")
        .ok_or("Please define the network configuration file")?;
    let net_config = config_from_file(file_path)?;

    let mut opts = ApplyOptions::default();
    if let Some(root) = matches.value_of("TARGET_ROOT") {
        opts.target_root = PathBuf::from(root);
    }
    opts.parse = config.parse_options();
    opts.renderer_priority = config.renderer_priority()?;
    opts.activator_priority = config.activator_priority()?;
    opts.renderers = config.renderer_options();
    opts.activate = !matches.is_present("NO_ACTIVATE");

    let result =
        apply_network_config(&net_config, &opts, &SystemRunner::new())?;
    if !result.all_up {
        log::warn!("Not every interface could be brought up");
    }
    Ok(serde_yaml::to_string(&result)?)
}
