//! Jump Flap entry point
//!
//! Loads settings, sets up logging and runs the game in the terminal.

use std::fs::File;
use std::path::Path;
use std::process::ExitCode;

use env_logger::{Env, Target};

use jump_flap::Settings;
use jump_flap::app;

/// Log to `path` when given; the terminal belongs to the game while it runs
fn init_logging(path: Option<&Path>) {
    let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or("info"));
    let mut fallback = None;
    if let Some(path) = path {
        match File::create(path) {
            Ok(file) => {
                builder.target(Target::Pipe(Box::new(file)));
            }
            Err(e) => fallback = Some((path.to_path_buf(), e)),
        }
    }
    builder.init();

    if let Some((path, e)) = fallback {
        log::warn!("Cannot open log file {}: {}; logging to stderr", path.display(), e);
    }
}

fn main() -> ExitCode {
    // Settings come first so they can name the log file
    let settings_path = Settings::path();
    let settings = match Settings::load_from(&settings_path) {
        Ok(settings) => settings,
        Err(e) => {
            env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
            log::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    init_logging(settings.log_file.as_deref());
    log::info!("Jump Flap starting...");
    if !settings_path.exists() {
        log::info!("No settings at {}; using defaults", settings_path.display());
    }
    log::debug!("Settings: {:?}", settings);

    match app::run(&settings) {
        Ok(()) => {
            log::info!("Bye");
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("{}", e);
            eprintln!("jump-flap: {}", e);
            ExitCode::FAILURE
        }
    }
}
