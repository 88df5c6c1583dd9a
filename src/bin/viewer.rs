//! `handfield-viewer [config.json]`
//!
//! Opens the desktop viewer. The optional argument is a JSON
//! [`EngineConfig`]; omitted fields keep the desktop defaults.

use std::process::ExitCode;

use handfield::viewer;
use handfield::EngineConfig;

fn main() -> ExitCode {
    env_logger::init();

    let config = match std::env::args_os().nth(1) {
        Some(path) => match viewer::load_config(&path) {
            Ok(config) => config,
            Err(err) => {
                log::error!("{}: {err}", path.to_string_lossy());
                return ExitCode::FAILURE;
            }
        },
        None => EngineConfig::default(),
    };

    match viewer::run(config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err}");
            ExitCode::FAILURE
        }
    }
}
