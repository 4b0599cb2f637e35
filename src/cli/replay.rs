//! Replay command implementation.

use std::path::Path;

use tessera::replay::{Recording, ReplayEngine};
use tessera::snapshot::WorldDigest;

use super::{CliError, OutputFormat};

/// Execute the replay command.
///
/// With `step` the position after that many actions is shown; otherwise
/// the final position. `every` prints each action on the way.
///
/// # Errors
///
/// Returns an error if the recording cannot be loaded or `step` lies past
/// the end of the match.
pub(crate) fn execute(
    path: &Path,
    step: Option<usize>,
    every: bool,
    format: OutputFormat,
) -> Result<(), CliError> {
    let recording = Recording::load(path).map_err(|e| {
        CliError::new(format!("Failed to load {}: {e}", path.display()))
    })?;
    let mut engine = ReplayEngine::new(recording)?;

    let show = |engine: &ReplayEngine| -> Result<(), CliError> {
        match format {
            OutputFormat::Text => println!("{}", engine.render_text()),
            OutputFormat::Json => println!(
                "{}",
                WorldDigest::capture(&engine.context().store).to_json()?
            ),
        }
        Ok(())
    };

    if every {
        show(&engine)?;
    }
    loop {
        if step.is_some_and(|s| engine.action() >= s) {
            break;
        }
        match engine.step_forward() {
            Ok(()) if every => show(&engine)?,
            Ok(()) => {}
            Err(_) if step.is_none() => break,
            Err(e) => return Err(e.into()),
        }
    }
    if !every {
        show(&engine)?;
    }

    if engine.is_over() && format == OutputFormat::Text {
        let result = engine.result();
        match result.winner {
            Some(name) => println!("Winner: {name}"),
            None => println!("Result: Draw"),
        }
    }
    Ok(())
}
