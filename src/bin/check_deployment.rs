//! Validates deployment files before they are embedded: `check_deployment deployments/*.json`.
//! With no arguments, checks the built-in deployments.

use puzzle_gate::{ConfigError, GateConfig};
use std::process::ExitCode;

fn report(label: &str, result: Result<GateConfig, ConfigError>) -> bool {
    match result {
        Ok(config) => {
            println!(
                "{}: ok ({} tiles, {:?} matching, message {:?}, reorder {:?}, reveal {:?})",
                label,
                config.tile_count(),
                config.policy,
                config.secret_message(),
                config.reorder_delay,
                config.reveal_delay
            );
            true
        }
        Err(e) => {
            eprintln!("{}: {}", label, e);
            false
        }
    }
}

fn main() -> ExitCode {
    let paths: Vec<String> = std::env::args().skip(1).collect();
    let mut all_ok = true;

    if paths.is_empty() {
        for name in GateConfig::builtin_names() {
            all_ok &= report(name, GateConfig::builtin(name));
        }
    } else {
        for path in &paths {
            all_ok &= report(path, GateConfig::from_path(path));
        }
    }

    if all_ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
