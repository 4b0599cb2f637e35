//! Tournament command implementation.

use std::path::Path;
use std::time::Instant;

use indicatif::{ProgressBar, ProgressStyle};
use tessera::tournament::run_tournament_with;

use super::output::{JsonTournamentResult, format_tournament_csv, format_tournament_text};
use super::{CliError, TournamentFormat, load_config, seed_or_clock};

fn progress_bar(games: u64) -> ProgressBar {
    let bar = ProgressBar::new(games);
    let style = ProgressStyle::default_bar()
        .template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} games ({per_sec})",
        )
        .map_or_else(|_| ProgressStyle::default_bar(), |s| s.progress_chars("=>-"));
    bar.set_style(style);
    bar
}

/// Execute the tournament command.
///
/// # Errors
///
/// Returns an error if the configuration is unusable or the worker pool
/// cannot be built.
pub(crate) fn execute(
    games: u64,
    seed: Option<u64>,
    threads: Option<usize>,
    config: Option<&Path>,
    format: TournamentFormat,
    progress: bool,
) -> Result<(), CliError> {
    let config = load_config(config)?;
    let base_seed = seed_or_clock(seed);
    let seeds: Vec<u64> = (0..games).map(|i| base_seed.wrapping_add(i)).collect();

    let bar = progress.then(|| progress_bar(games));
    let start = Instant::now();
    let stats = run_tournament_with(&config, &seeds, threads, |_| {
        if let Some(bar) = &bar {
            bar.inc(1);
        }
    })?;
    if let Some(bar) = bar {
        bar.finish_with_message("done");
    }
    let duration = start.elapsed();

    #[allow(clippy::cast_precision_loss)]
    let games_per_sec = if duration.as_secs_f64() > 0.0 {
        stats.games_played as f64 / duration.as_secs_f64()
    } else {
        0.0
    };

    match format {
        TournamentFormat::Text => {
            println!();
            print!("{}", format_tournament_text(&stats));
            println!();
            println!(
                "Duration: {:.2}s ({games_per_sec:.0} games/sec)",
                duration.as_secs_f64()
            );
        }
        TournamentFormat::Json => {
            let json = serde_json::to_string_pretty(&JsonTournamentResult::from_stats(&stats))?;
            println!("{json}");
        }
        TournamentFormat::Csv => {
            print!("{}", format_tournament_csv(&stats));
        }
    }

    Ok(())
}
