use std::fs;
use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, anyhow};
use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::bucket::{DateBucketMap, PeriodStats, bucket_shifts_within};
use crate::calendar::{GridRows, ViewMode, ViewState, month_grid};
use crate::cli::{Command, ViewArgs};
use crate::config::Config;
use crate::datetime::{LocalCalendar, parse_anchor_expr};
use crate::render::Renderer;
use crate::shift::Shift;
use crate::source::{InMemoryShiftSource, ShiftQuery, ShiftSource, load_shifts_json};
use crate::template::AssessmentTemplate;

/// Shifts and buckets for one visible period.
#[derive(Debug)]
pub struct PeriodView {
    pub state: ViewState,
    pub dates: Vec<NaiveDate>,
    pub shifts: Vec<Shift>,
}

impl PeriodView {
    pub fn buckets(&self, calendar: &LocalCalendar) -> DateBucketMap<'_> {
        let (first, last) = self.range();
        bucket_shifts_within(&self.shifts, calendar.timezone, first, last)
    }

    pub fn range(&self) -> (NaiveDate, NaiveDate) {
        match (self.dates.first(), self.dates.last()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => (self.state.anchor, self.state.anchor),
        }
    }
}

#[derive(Debug, Serialize)]
struct BucketReport<'a> {
    view: &'a ViewState,
    dates: Vec<String>,
    buckets: std::collections::BTreeMap<String, Vec<String>>,
    stats: PeriodStats,
}

#[instrument(skip(cfg, calendar, renderer, command))]
pub fn dispatch(
    cfg: &Config,
    calendar: &LocalCalendar,
    renderer: &Renderer,
    command: Command,
) -> anyhow::Result<()> {
    let mut out = io::stdout().lock();
    dispatch_to(cfg, calendar, renderer, command, &mut out)?;
    out.flush()?;
    Ok(())
}

/// Runs one command against an arbitrary writer.
pub fn dispatch_to<W: Write>(
    cfg: &Config,
    calendar: &LocalCalendar,
    renderer: &Renderer,
    command: Command,
    mut out: W,
) -> anyhow::Result<()> {
    let today = calendar.today();
    let rows = cfg.calendar.month_rows;
    debug!(?command, %today, "dispatching command");

    match command {
        Command::Week(args) => {
            cmd_view(&mut out, calendar, renderer, rows, ViewMode::Week, &args, today)
        }
        Command::Month(args) => {
            cmd_view(&mut out, calendar, renderer, rows, ViewMode::Month, &args, today)
        }
        Command::Buckets { view, mode } => {
            let mode = match mode.as_deref() {
                Some(key) => ViewMode::from_key(key)
                    .ok_or_else(|| anyhow!("unknown view: {key} (expected week or month)"))?,
                None => cfg.default_view(),
            };
            cmd_buckets(&mut out, calendar, rows, mode, &view, today)
        }
        Command::Template { file } => cmd_template(&mut out, renderer, &file),
    }
}

/// Loads shifts and narrows them to the period the view state shows.
#[instrument(skip(source, calendar, args))]
pub fn load_period(
    source: &dyn ShiftSource,
    calendar: &LocalCalendar,
    rows: GridRows,
    state: ViewState,
    args: &ViewArgs,
) -> anyhow::Result<PeriodView> {
    let dates = state.visible_dates(calendar.week_start, rows);
    let (from, to) = state.visible_range(calendar.week_start, rows);
    let query = ShiftQuery {
        from: Some(from),
        to: Some(to),
        caregiver_id: args.caregiver.clone(),
        client_id: args.client.clone(),
    };
    let shifts = source.list(&query)?;
    info!(
        anchor = %state.anchor,
        mode = state.mode.as_key(),
        shifts = shifts.len(),
        "loaded calendar period"
    );
    Ok(PeriodView { state, dates, shifts })
}

fn resolve_state(args: &ViewArgs, mode: ViewMode, today: NaiveDate) -> anyhow::Result<ViewState> {
    let anchor = match args.anchor.as_deref() {
        Some(expr) => parse_anchor_expr(expr, today)?,
        None => today,
    };
    Ok(ViewState::new(anchor, mode).step(args.step))
}

fn open_source(args: &ViewArgs, calendar: &LocalCalendar) -> anyhow::Result<InMemoryShiftSource> {
    let shifts = load_shifts_json(&args.shifts)
        .with_context(|| format!("failed to load shifts from {}", args.shifts.display()))?;
    Ok(InMemoryShiftSource::new(shifts, calendar.timezone))
}

fn cmd_view<W: Write>(
    mut out: W,
    calendar: &LocalCalendar,
    renderer: &Renderer,
    rows: GridRows,
    mode: ViewMode,
    args: &ViewArgs,
    today: NaiveDate,
) -> anyhow::Result<()> {
    let source = open_source(args, calendar)?;
    let state = resolve_state(args, mode, today)?;
    let period = load_period(&source, calendar, rows, state, args)?;
    let buckets = period.buckets(calendar);
    let (first, last) = period.range();
    let title = period.state.title(calendar.week_start);

    match mode {
        ViewMode::Week => renderer.write_week(&mut out, &title, &period.dates, &buckets, today)?,
        ViewMode::Month => {
            let grid = month_grid(period.state.anchor, calendar.week_start, rows);
            renderer.write_month(&mut out, &title, &grid, calendar.week_start, &buckets, today)?
        }
    }
    renderer.write_stats(&mut out, &PeriodStats::from_buckets(&buckets, first, last))
}

fn cmd_buckets<W: Write>(
    mut out: W,
    calendar: &LocalCalendar,
    rows: GridRows,
    mode: ViewMode,
    args: &ViewArgs,
    today: NaiveDate,
) -> anyhow::Result<()> {
    let source = open_source(args, calendar)?;
    let state = resolve_state(args, mode, today)?;
    let period = load_period(&source, calendar, rows, state, args)?;
    let buckets = period.buckets(calendar);
    let (first, last) = period.range();

    let report = BucketReport {
        view: &period.state,
        dates: period
            .dates
            .iter()
            .map(|date| date.format("%Y-%m-%d").to_string())
            .collect(),
        buckets: buckets.to_id_map(),
        stats: PeriodStats::from_buckets(&buckets, first, last),
    };

    serde_json::to_writer_pretty(&mut out, &report)?;
    writeln!(out)?;
    Ok(())
}

fn cmd_template<W: Write>(out: W, renderer: &Renderer, file: &Path) -> anyhow::Result<()> {
    let raw = fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let template: AssessmentTemplate = serde_json::from_str(&raw)
        .with_context(|| format!("failed parsing template {}", file.display()))?;
    renderer.write_template(out, &template)
}
