use std::env;
use std::io;
use std::path::PathBuf;

use tracing::{info, warn};

use crate::audio::AudioPlayer;

mod console;
mod logging;
mod report;
mod settings;
mod startup;

pub use startup::build_playlist;

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let (settings, problem) = settings::load_settings();
    logging::init(&settings.logging);
    if let Some(problem) = problem {
        warn!("{problem}");
    }

    let target = match env::args_os().nth(1) {
        Some(arg) => PathBuf::from(arg),
        None => env::current_dir()?,
    };

    let (playlist, resolver) = build_playlist(&target, &settings.library)?;
    let names: Vec<String> = playlist
        .tracks()
        .iter()
        .map(|t| t.display_name.clone())
        .collect();

    let player = AudioPlayer::new(playlist, settings.engine.clone(), resolver)?;
    let reporter = report::spawn_reporter(player.subscribe(), names.clone())?;

    let stdin = io::stdin();
    let run_result = console::run(stdin.lock(), io::stdout(), &player, &names);

    player.quit();
    let _ = reporter.join();
    info!("bye");

    run_result.map_err(Into::into)
}
