use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "carecal",
    version,
    about = "Caregiver shift calendar: week and month views over a shift list"
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true)]
    pub quiet: u8,

    #[arg(long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Calendar timezone, e.g. America/Chicago.
    #[arg(long = "timezone", global = true)]
    pub timezone: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Print the week containing the anchor date.
    Week(ViewArgs),
    /// Print the month grid containing the anchor date.
    Month(ViewArgs),
    /// Dump the date -> shift id buckets of a view as JSON.
    Buckets {
        #[command(flatten)]
        view: ViewArgs,
        /// week or month; falls back to calendar.default_view.
        #[arg(long = "view")]
        mode: Option<String>,
    },
    /// Print the outline of an assessment template JSON file.
    Template { file: PathBuf },
}

#[derive(Args, Debug, Clone)]
pub struct ViewArgs {
    /// JSON array or JSON-lines file of shifts.
    #[arg(long = "shifts")]
    pub shifts: PathBuf,

    /// today, tomorrow, +2w, -1m, 2024-06-12, ...
    #[arg(long = "anchor")]
    pub anchor: Option<String>,

    /// Pages forward (positive) or back (negative) from the anchor.
    #[arg(long = "step", default_value_t = 0, allow_hyphen_values = true)]
    pub step: i64,

    #[arg(long = "caregiver")]
    pub caregiver: Option<String>,

    #[arg(long = "client")]
    pub client: Option<String>,
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_week_with_negative_step() {
        let cli = GlobalCli::try_parse_from([
            "carecal",
            "-vv",
            "week",
            "--shifts",
            "shifts.json",
            "--step",
            "-2",
            "--caregiver",
            "cg-1",
        ])
        .expect("parse args");
        assert_eq!(cli.verbose, 2);
        let Command::Week(args) = cli.command else {
            panic!("expected week command");
        };
        assert_eq!(args.step, -2);
        assert_eq!(args.caregiver.as_deref(), Some("cg-1"));
        assert_eq!(args.anchor, None);
    }

    #[test]
    fn buckets_view_is_optional() {
        let cli = GlobalCli::try_parse_from([
            "carecal",
            "buckets",
            "--shifts",
            "s.json",
            "--timezone",
            "America/Chicago",
        ])
        .expect("parse args");
        assert_eq!(cli.timezone.as_deref(), Some("America/Chicago"));
        let Command::Buckets { mode, .. } = cli.command else {
            panic!("expected buckets command");
        };
        assert_eq!(mode, None);
    }

    #[test]
    fn shifts_file_is_required() {
        assert!(GlobalCli::try_parse_from(["carecal", "month"]).is_err());
    }
}
