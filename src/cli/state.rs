// SPDX-License-Identifier: Apache-2.0

use std::io::Read;

use netcfg::{parse_net_config, NetworkState, ParseOptions};
use serde_json::Value;

use crate::error::CliError;

/// Raw v1 or v2 network configuration from a YAML or JSON file, `-` for
/// stdin.
pub(crate) fn config_from_file(file_path: &str) -> Result<Value, CliError> {
    let mut content = String::new();
    if file_path == "-" {
        std::io::stdin().read_to_string(&mut content)?;
    } else {
        std::fs::File::open(file_path)?.read_to_string(&mut content)?;
    };
    // Replace non-breaking space '\u{A0}'  to normal space
    let content = content.replace('\u{A0}', " ");

    Ok(serde_yaml::from_str(&content)?)
}

pub(crate) fn state_from_file(
    file_path: &str,
    opts: &ParseOptions,
) -> Result<NetworkState, CliError> {
    Ok(parse_net_config(&config_from_file(file_path)?, opts)?)
}
