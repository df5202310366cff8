pub mod bucket;
pub mod calendar;
pub mod cli;
pub mod commands;
pub mod config;
pub mod datetime;
pub mod render;
pub mod shift;
pub mod source;
pub mod template;

use std::ffi::OsString;

use clap::Parser;
use tracing::{
  debug,
  info
};

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let cli =
    cli::GlobalCli::parse_from(raw_args);

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting carecal"
  );

  let cfg = config::Config::load(
    cli.config.as_deref()
  )?;
  debug!(loaded_from = ?cfg.loaded_from, "config ready");

  let timezone =
    datetime::resolve_calendar_timezone(
      cli.timezone.as_deref(),
      cfg.timezone.as_deref()
    );
  let calendar =
    datetime::LocalCalendar::new(
      timezone,
      cfg.week_start()
    );
  let renderer = render::Renderer::new(
    &cfg, timezone
  );

  commands::dispatch(
    &cfg,
    &calendar,
    &renderer,
    cli.command
  )?;

  info!("done");
  Ok(())
}
