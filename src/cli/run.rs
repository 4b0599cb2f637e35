//! Run command implementation.

use std::path::Path;

use tessera::replay::{Recording, render_text};
use tessera::session::Match;

use super::output::format_match_text;
use super::{CliError, OutputFormat, load_config, seed_or_clock};

/// Execute the run command.
///
/// # Errors
///
/// Returns an error if the configuration is unusable or the recording
/// cannot be written.
pub(crate) fn execute(
    seed: Option<u64>,
    config: Option<&Path>,
    format: OutputFormat,
    save: Option<&Path>,
    quiet: bool,
) -> Result<(), CliError> {
    let config = load_config(config)?;
    let seed = seed_or_clock(seed);

    if !quiet && format == OutputFormat::Text {
        let names: Vec<&str> = config.combatants.iter().map(|c| c.name.as_str()).collect();
        println!("Running match with seed {seed}...");
        println!("Combatants: {}", names.join(", "));
        println!();
    }

    let game = Match::new(&config, seed)?;
    let opening = render_text(&game.context().store, 0);
    let result = game.run();

    if let Some(save_path) = save {
        Recording::new(seed, config)
            .save(save_path)
            .map_err(|e| CliError::new(format!("Failed to save recording: {e}")))?;
        if !quiet && format == OutputFormat::Text {
            println!("Recording saved to: {}", save_path.display());
            println!();
        }
    }

    match format {
        OutputFormat::Text => {
            if !quiet {
                print!("{opening}");
                println!();
            }
            print!("{}", format_match_text(&result));
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
    }

    Ok(())
}
