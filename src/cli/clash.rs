//! Clash command implementation.

use std::path::Path;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tessera::game::{RegimentStats, resolve_clash};

use super::output::{JsonClashResult, format_clash_text};
use super::{CliError, OutputFormat, load_config, seed_or_clock};

/// Parse `MEN[,SKILL[,ARMOR[,MANEUVER[,MORALE[,READINESS]]]]]`; omitted
/// fields keep their defaults.
pub(crate) fn parse_regiment(text: &str) -> Result<RegimentStats, String> {
    let mut parts = text.split(',').map(str::trim);
    let men = parts
        .next()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| "missing head count".to_string())?
        .parse::<u32>()
        .map_err(|e| format!("bad head count: {e}"))?;
    let mut stats = RegimentStats {
        men,
        ..RegimentStats::default()
    };
    let fields: [&mut f64; 5] = [
        &mut stats.combat_skill,
        &mut stats.armor,
        &mut stats.maneuver,
        &mut stats.morale,
        &mut stats.readiness,
    ];
    for field in fields {
        let Some(part) = parts.next() else {
            break;
        };
        *field = part.parse::<f64>().map_err(|e| format!("bad value {part:?}: {e}"))?;
    }
    if parts.next().is_some() {
        return Err("too many fields (at most 6)".to_string());
    }
    Ok(stats)
}

/// Execute the clash command.
///
/// # Errors
///
/// Returns an error if the configuration cannot be loaded.
pub(crate) fn execute(
    attacker: &RegimentStats,
    defender: &RegimentStats,
    randomize: bool,
    seed: Option<u64>,
    config: Option<&Path>,
    format: OutputFormat,
) -> Result<(), CliError> {
    let config = load_config(config)?;
    let outcome = if randomize {
        let mut rng = StdRng::seed_from_u64(seed_or_clock(seed));
        resolve_clash(attacker, defender, &config.clash, Some(&mut rng))
    } else {
        resolve_clash(attacker, defender, &config.clash, None)
    };

    match format {
        OutputFormat::Text => print!("{}", format_clash_text(attacker, defender, &outcome)),
        OutputFormat::Json => {
            let report = JsonClashResult {
                attacker,
                defender,
                outcome: &outcome,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_regiment_fills_defaults() {
        let stats = parse_regiment("120, 2.5").unwrap();
        assert_eq!(stats.men, 120);
        assert!((stats.combat_skill - 2.5).abs() < f64::EPSILON);
        assert!((stats.armor - RegimentStats::default().armor).abs() < f64::EPSILON);
    }

    #[test]
    fn test_parse_regiment_rejects_garbage() {
        assert!(parse_regiment("").is_err());
        assert!(parse_regiment("ten").is_err());
        assert!(parse_regiment("1,2,3,4,5,6,7").is_err());
    }
}
