// SPDX-License-Identifier: Apache-2.0

use crate::{config::Config, error::CliError, state::state_from_file};

// Canonical model of the configuration file, YAML unless asked for JSON
pub(crate) fn show(
    matches: &clap::ArgMatches,
    config: &Config,
) -> Result<String, CliError> {
    let file_path = matches
        .value_of("CONFIG_FILE")
        .ok_or("Please define the network configuration file")?;
    let net_state = state_from_file(file_path, &config.parse_options())?;
    Ok(if matches.is_present("JSON") {
        serde_json::to_string_pretty(&net_state)?
    } else {
        serde_yaml::to_string(&net_state)?
    })
}
