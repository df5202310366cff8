use std::io::{self, IsTerminal, Write};

use chrono::{Datelike, NaiveDate, Weekday};
use chrono_tz::Tz;
use unicode_width::UnicodeWidthStr;

use crate::bucket::{DateBucketMap, PeriodStats};
use crate::calendar::GridDay;
use crate::config::Config;
use crate::shift::Shift;
use crate::template::{AssessmentTemplate, ResponseKind};

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
    timezone: Tz,
    max_per_day: usize,
}

impl Renderer {
    pub fn new(cfg: &Config, timezone: Tz) -> Self {
        Self {
            color: cfg.display.color && io::stdout().is_terminal(),
            timezone,
            max_per_day: cfg.display.max_shifts_per_day,
        }
    }

    pub fn plain(timezone: Tz, max_per_day: usize) -> Self {
        Self {
            color: false,
            timezone,
            max_per_day,
        }
    }

    #[tracing::instrument(skip_all, fields(days = dates.len()))]
    pub fn write_week<W: Write>(
        &self,
        mut out: W,
        title: &str,
        dates: &[NaiveDate],
        buckets: &DateBucketMap<'_>,
        today: NaiveDate,
    ) -> anyhow::Result<()> {
        writeln!(out, "{title}")?;

        let headers = vec![
            "Day".to_string(),
            "Time".to_string(),
            "Shift".to_string(),
            "Status".to_string(),
        ];
        let mut rows = Vec::new();

        for date in dates {
            let mut label = date.format("%a %m-%d").to_string();
            if *date == today {
                label = self.paint(&format!("{label} *"), "1");
            }

            let preview = buckets.preview(*date, self.max_per_day);
            if preview.visible.is_empty() {
                rows.push(vec![label, "-".to_string(), String::new(), String::new()]);
                continue;
            }

            for (idx, shift) in preview.visible.iter().enumerate() {
                let day = if idx == 0 { label.clone() } else { String::new() };
                rows.push(vec![
                    day,
                    self.time_span(shift),
                    shift.display_title(),
                    shift.status.as_key().to_string(),
                ]);
            }
            if let Some(more) = preview.more_label() {
                rows.push(vec![String::new(), String::new(), self.paint(&more, "2"), String::new()]);
            }
        }

        write_table(&mut out, headers, rows)
    }

    #[tracing::instrument(skip_all, fields(cells = grid.len()))]
    pub fn write_month<W: Write>(
        &self,
        mut out: W,
        title: &str,
        grid: &[GridDay],
        week_start: Weekday,
        buckets: &DateBucketMap<'_>,
        today: NaiveDate,
    ) -> anyhow::Result<()> {
        writeln!(out, "{title}")?;

        let headers = weekday_labels(week_start)
            .into_iter()
            .map(str::to_string)
            .collect::<Vec<_>>();

        let rows: Vec<Vec<String>> = grid
            .chunks(7)
            .map(|week| {
                week.iter()
                    .map(|cell| {
                        let count = buckets.shifts_on(cell.date).len();
                        let text = if count > 0 {
                            format!("{:>2} ({count})", cell.date.day())
                        } else {
                            format!("{:>2}", cell.date.day())
                        };
                        if cell.date == today {
                            self.paint(&text, "7")
                        } else if !cell.in_current_month {
                            self.paint(&text, "2")
                        } else {
                            text
                        }
                    })
                    .collect::<Vec<_>>()
            })
            .collect();

        write_table(&mut out, headers, rows)
    }

    pub fn write_stats<W: Write>(&self, mut out: W, stats: &PeriodStats) -> anyhow::Result<()> {
        writeln!(
            out,
            "{} shifts: {} scheduled, {} in progress, {} completed, {} cancelled",
            stats.total, stats.scheduled, stats.in_progress, stats.completed, stats.cancelled
        )?;
        Ok(())
    }

    pub fn write_template<W: Write>(
        &self,
        mut out: W,
        template: &AssessmentTemplate,
    ) -> anyhow::Result<()> {
        writeln!(out, "{} ({} items)", template.name, template.item_count())?;
        for (section_idx, section) in template.sections.iter().enumerate() {
            writeln!(out, "{}. {}", section_idx + 1, section.title)?;
            for (item_idx, item) in section.items.iter().enumerate() {
                let required = if item.required { "*" } else { "" };
                writeln!(
                    out,
                    "   {}.{} {}{} [{}]",
                    section_idx + 1,
                    item_idx + 1,
                    item.prompt,
                    required,
                    response_label(&item.response)
                )?;
            }
        }
        Ok(())
    }

    fn time_span(&self, shift: &Shift) -> String {
        let start = shift.start.with_timezone(&self.timezone);
        let end = shift.end.with_timezone(&self.timezone);
        if start.date_naive() == end.date_naive() {
            format!("{}-{}", start.format("%H:%M"), end.format("%H:%M"))
        } else {
            format!("{}-{}", start.format("%m-%d %H:%M"), end.format("%m-%d %H:%M"))
        }
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

pub fn weekday_labels(week_start: Weekday) -> Vec<&'static str> {
    match week_start {
        Weekday::Mon => vec!["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"],
        _ => vec!["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"],
    }
}

fn response_label(response: &ResponseKind) -> String {
    match response {
        ResponseKind::Scale { min, max, .. } => format!("scale {min}-{max}"),
        ResponseKind::SingleChoice { options } => format!("one of {}", options.len()),
        ResponseKind::MultipleChoice { options, .. } => format!("any of {}", options.len()),
        ResponseKind::Text { .. } => "text".to_string(),
        ResponseKind::Number { unit: Some(unit), .. } => format!("number ({unit})"),
        ResponseKind::Number { .. } => "number".to_string(),
        ResponseKind::Date => "date".to_string(),
        ResponseKind::YesNo => "yes/no".to_string(),
    }
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate().take(column_count) {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for idx in 0..column_count {
        write!(writer, "{:width$} ", headers[idx], width = widths[idx])?;
    }
    writeln!(writer)?;

    for idx in 0..column_count {
        write!(writer, "{:-<width$} ", "", width = widths[idx])?;
    }
    writeln!(writer)?;

    for row in rows {
        for (idx, cell) in row.iter().enumerate().take(column_count) {
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}
