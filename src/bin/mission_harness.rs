use std::fs::{self, File};

use anyhow::{anyhow, bail, Context, Result};
use sortie_script::cli::HarnessArgs;
use sortie_script::config::MatchConfig;
use sortie_script::harness::{load_fixture, run_fixture_with_config, HarnessOutput};
use sortie_script::logging::init_logging;

fn main() {
    if let Err(err) = run_cli() {
        eprintln!("[mission-harness] error: {err:?}");
        std::process::exit(1);
    }
}

fn run_cli() -> Result<()> {
    let args = HarnessArgs::parse_from_env()?;
    if args.help {
        print_help();
        return Ok(());
    }
    let Some(fixture_path) = &args.fixture else {
        return Err(anyhow!("--fixture <path> is required"));
    };

    let mut fixture = load_fixture(fixture_path)?;
    if let Some(ticks) = args.ticks {
        fixture.ticks = ticks;
    }
    let mut config = MatchConfig { seed: fixture.seed, ..MatchConfig::default() };
    let overrides = args.config_overrides();
    if !overrides.is_empty() {
        config.apply_overrides(&overrides);
        println!("[mission-harness] overrides: {}", overrides.applied_fields().join(", "));
    }
    let _log_guard = init_logging(config.scripting.log_dir.as_deref()).context("initialising logging")?;

    let output = run_fixture_with_config(&fixture, config)?;

    if let Some(path) = &args.write_output {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("creating output directory '{}'", parent.display()))?;
            }
        }
        let file = File::create(path).with_context(|| format!("writing harness output to '{}'", path.display()))?;
        serde_json::to_writer_pretty(file, &output).with_context(|| "serializing harness output")?;
        println!("[mission-harness] wrote {}", path.display());
    }

    if let Some(path) = &args.golden {
        let file = File::open(path).with_context(|| format!("opening golden file '{}'", path.display()))?;
        let expected: HarnessOutput = serde_json::from_reader(file).with_context(|| "parsing golden JSON")?;
        if expected != output {
            bail!(
                "golden mismatch for {} (use --write-output to refresh):\nexpected: {}\nactual:   {}",
                fixture_path.display(),
                serde_json::to_string(&expected).unwrap_or_default(),
                serde_json::to_string(&output).unwrap_or_default(),
            );
        }
        println!("[mission-harness] matched golden {}", path.display());
    } else if args.write_output.is_none() {
        serde_json::to_writer_pretty(std::io::stdout(), &output)?;
        println!();
    }

    Ok(())
}

fn print_help() {
    println!("Usage: mission_harness --fixture <path> [--ticks <n>] [--seed <n>] [--golden <path>] [--write-output <path>]");
    println!("  --fixture        Path to a mission fixture JSON file");
    println!("  --ticks          Override the fixture's tick count");
    println!("  --seed           Override the shared RNG seed");
    println!("  --golden         Optional golden output file to compare against");
    println!("  --write-output   Optional path to write the actual output JSON");
    println!("  --log-dir        Directory for script.log");
    println!("  --echo           Mirror script output to stdout (on/off)");
}
