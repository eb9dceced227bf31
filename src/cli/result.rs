// SPDX-License-Identifier: Apache-2.0

use crate::error::CliError;

/// Print the command output and exit with 0, or print the error and exit
/// with its code.
pub(crate) fn print_result_and_exit(result: Result<String, CliError>) -> ! {
    let code = match result {
        Ok(output) => {
            // YAML documents already end with a newline
            if output.ends_with('\n') {
                print!("{output}");
            } else if !output.is_empty() {
                println!("{output}");
            }
            0
        }
        Err(e) => {
            log::debug!("Exiting with code {}", e.code);
            eprintln!("{e}");
            e.code
        }
    };
    std::process::exit(code)
}
