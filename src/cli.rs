use crate::config::MatchConfigOverrides;
use anyhow::{anyhow, bail, Context, Result};
use std::env;
use std::path::PathBuf;

/// Flags accepted by the `mission_harness` binary.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HarnessArgs {
    pub fixture: Option<PathBuf>,
    pub ticks: Option<u64>,
    pub golden: Option<PathBuf>,
    pub write_output: Option<PathBuf>,
    pub help: bool,
    seed: Option<u64>,
    log_dir: Option<PathBuf>,
    echo: Option<bool>,
}

impl HarnessArgs {
    pub fn parse_from_env() -> Result<Self> {
        Self::parse(env::args())
    }

    pub fn parse<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut parsed = HarnessArgs::default();
        let mut iter = args.into_iter();
        let _ = iter.next(); // skip program name if present
        while let Some(raw_flag) = iter.next() {
            let flag = raw_flag.as_ref();
            if flag == "--help" || flag == "-h" {
                parsed.help = true;
                continue;
            }
            if !flag.starts_with("--") {
                bail!("Unexpected argument '{flag}'. Flags take the form --name <value>.");
            }
            let key = &flag[2..];
            let value = iter.next().ok_or_else(|| anyhow!("Expected a value after '{flag}'"))?.as_ref().to_string();
            match key {
                "fixture" => parsed.fixture = Some(PathBuf::from(value)),
                "ticks" => {
                    parsed.ticks = Some(value.parse::<u64>().with_context(|| format!("Invalid ticks '{value}'"))?);
                }
                "seed" => {
                    parsed.seed = Some(value.parse::<u64>().with_context(|| format!("Invalid seed '{value}'"))?);
                }
                "golden" => parsed.golden = Some(PathBuf::from(value)),
                "write-output" => parsed.write_output = Some(PathBuf::from(value)),
                "log-dir" => parsed.log_dir = Some(PathBuf::from(value)),
                "echo" => parsed.echo = Some(parse_bool_flag("echo", &value)?),
                _ => bail!(
                    "Unknown flag '{flag}'. Supported flags: --fixture, --ticks, --seed, --golden, --write-output, --log-dir, --echo."
                ),
            }
        }
        Ok(parsed)
    }

    pub fn config_overrides(&self) -> MatchConfigOverrides {
        MatchConfigOverrides { seed: self.seed, log_dir: self.log_dir.clone(), echo_to_console: self.echo }
    }
}

fn parse_bool_flag(flag: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Ok(true),
        "0" | "false" | "off" | "no" => Ok(false),
        other => bail!("Invalid {flag} value '{other}'. Use on/off or true/false."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fixture_ticks_and_seed() {
        let args = ["harness", "--fixture", "missions/intro.json", "--ticks", "120", "--seed", "3"];
        let parsed = HarnessArgs::parse(args).expect("parse args");
        assert_eq!(parsed.fixture, Some(PathBuf::from("missions/intro.json")));
        assert_eq!(parsed.ticks, Some(120));
        let overrides = parsed.config_overrides();
        assert_eq!(overrides.seed, Some(3));
        assert_eq!(overrides.applied_fields(), vec!["seed"]);
    }

    #[test]
    fn latest_flag_wins() {
        let args = ["harness", "--ticks", "5", "--ticks", "9", "--echo", "on", "--echo", "off"];
        let parsed = HarnessArgs::parse(args).expect("parse args");
        assert_eq!(parsed.ticks, Some(9));
        assert_eq!(parsed.config_overrides().echo_to_console, Some(false));
    }

    #[test]
    fn help_needs_no_value() {
        let parsed = HarnessArgs::parse(["harness", "-h"]).expect("parse args");
        assert!(parsed.help);
    }

    #[test]
    fn missing_value_errors() {
        let err = HarnessArgs::parse(["harness", "--fixture"]).unwrap_err();
        assert!(err.to_string().contains("Expected a value"), "error should mention missing value");
    }

    #[test]
    fn rejects_unknown_flags_and_bad_numbers() {
        let err = HarnessArgs::parse(["harness", "--foo", "bar"]).unwrap_err();
        assert!(err.to_string().contains("Unknown flag"));
        let err = HarnessArgs::parse(["harness", "--ticks", "many"]).unwrap_err();
        assert!(err.to_string().contains("Invalid ticks"));
    }
}
