use anyhow::{
  Context,
  anyhow
};
use chrono::{
  DateTime,
  Datelike,
  NaiveDate,
  TimeDelta,
  Utc,
  Weekday
};
use chrono_tz::Tz;
use regex::Regex;

pub const TIMEZONE_ENV_VAR: &str =
  "CARECAL_TIMEZONE";
const DEFAULT_CALENDAR_TIMEZONE: &str =
  "UTC";

/// The single local calendar every
/// instant is truncated in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalCalendar {
  pub timezone:   Tz,
  pub week_start: Weekday
}

impl Default for LocalCalendar {
  fn default() -> Self {
    Self {
      timezone:   chrono_tz::UTC,
      week_start: Weekday::Sun
    }
  }
}

impl LocalCalendar {
  pub fn new(
    timezone: Tz,
    week_start: Weekday
  ) -> Self {
    Self {
      timezone,
      week_start
    }
  }

  #[must_use]
  pub fn date_of(
    &self,
    instant: DateTime<Utc>
  ) -> NaiveDate {
    calendar_date(
      instant,
      self.timezone
    )
  }

  #[must_use]
  pub fn today(&self) -> NaiveDate {
    today_in_timezone(self.timezone)
  }

  pub fn is_same_day(
    &self,
    a: DateTime<Utc>,
    b: DateTime<Utc>
  ) -> bool {
    is_same_day(a, b, self.timezone)
  }

  pub fn is_today(
    &self,
    instant: DateTime<Utc>
  ) -> bool {
    is_today(instant, self.timezone)
  }
}

#[must_use]
pub fn calendar_date(
  instant: DateTime<Utc>,
  timezone: Tz
) -> NaiveDate {
  instant
    .with_timezone(&timezone)
    .date_naive()
}

pub fn is_same_day(
  a: DateTime<Utc>,
  b: DateTime<Utc>,
  timezone: Tz
) -> bool {
  let a = calendar_date(a, timezone);
  let b = calendar_date(b, timezone);
  a.year() == b.year()
    && a.month() == b.month()
    && a.day() == b.day()
}

pub fn is_today(
  instant: DateTime<Utc>,
  timezone: Tz
) -> bool {
  is_today_at(
    instant,
    Utc::now(),
    timezone
  )
}

pub fn is_today_at(
  instant: DateTime<Utc>,
  now: DateTime<Utc>,
  timezone: Tz
) -> bool {
  is_same_day(instant, now, timezone)
}

#[must_use]
pub fn today_in_timezone(
  timezone: Tz
) -> NaiveDate {
  calendar_date(Utc::now(), timezone)
}

/// Picks the calendar timezone: explicit
/// override, then `CARECAL_TIMEZONE`, then
/// the config file value, then UTC.
pub fn resolve_calendar_timezone(
  cli_override: Option<&str>,
  configured: Option<&str>
) -> Tz {
  if let Some(raw) = cli_override
    && let Some(tz) =
      parse_timezone(raw, "--timezone")
  {
    return tz;
  }

  if let Ok(raw) =
    std::env::var(TIMEZONE_ENV_VAR)
    && let Some(tz) = parse_timezone(
      &raw,
      TIMEZONE_ENV_VAR
    )
  {
    return tz;
  }

  if let Some(raw) = configured
    && let Some(tz) =
      parse_timezone(raw, "config")
  {
    return tz;
  }

  parse_timezone(
    DEFAULT_CALENDAR_TIMEZONE,
    "calendar-default"
  )
  .unwrap_or(chrono_tz::UTC)
}

pub fn parse_timezone(
  raw: &str,
  source: &str
) -> Option<Tz> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    tracing::warn!(
      source,
      "timezone source was empty"
    );
    return None;
  }

  match trimmed.parse::<Tz>() {
    | Ok(tz) => {
      tracing::debug!(
        source,
        timezone = %trimmed,
        "resolved calendar timezone"
      );
      Some(tz)
    }
    | Err(error) => {
      tracing::error!(
        source,
        timezone = %trimmed,
        error = %error,
        "invalid timezone id"
      );
      None
    }
  }
}

/// Anything that is not `monday` means
/// Sunday-first weeks.
pub fn parse_week_start(
  raw: &str
) -> Weekday {
  match raw
    .trim()
    .to_ascii_lowercase()
    .as_str()
  {
    | "monday" | "mon" => Weekday::Mon,
    | _ => Weekday::Sun
  }
}

pub fn checked_add_days(
  date: NaiveDate,
  days: i64
) -> Option<NaiveDate> {
  TimeDelta::try_days(days).and_then(
    |delta| {
      date.checked_add_signed(delta)
    }
  )
}

/// Saturates at the ends of the
/// representable date range.
pub fn add_days(
  date: NaiveDate,
  days: i64
) -> NaiveDate {
  checked_add_days(date, days)
    .unwrap_or_else(|| {
      range_bound(days)
    })
}

fn range_bound(
  direction: i64
) -> NaiveDate {
  if direction < 0 {
    NaiveDate::MIN
  } else {
    NaiveDate::MAX
  }
}

pub fn first_day_of_month(
  year: i32,
  month: u32
) -> NaiveDate {
  NaiveDate::from_ymd_opt(
    year, month, 1
  )
  .unwrap_or(NaiveDate::MIN)
}

pub fn last_day_of_month(
  year: i32,
  month: u32
) -> NaiveDate {
  (28..=31)
    .rev()
    .find_map(|day| {
      NaiveDate::from_ymd_opt(
        year, month, day
      )
    })
    .unwrap_or(NaiveDate::MIN)
}

pub fn days_in_month(
  year: i32,
  month: u32
) -> u32 {
  last_day_of_month(year, month).day()
}

/// Moves by whole months, clamping the
/// day to the target month's length.
pub fn checked_shift_months(
  date: NaiveDate,
  months: i64
) -> Option<NaiveDate> {
  let total = (date.year() as i64 * 12
    + (date.month() as i64 - 1))
    .checked_add(months)?;
  let year =
    i32::try_from(total.div_euclid(12))
      .ok()?;
  let month =
    total.rem_euclid(12) as u32 + 1;

  // Rejects years outside chrono's range.
  let first = NaiveDate::from_ymd_opt(
    year, month, 1
  )?;
  let day = date
    .day()
    .min(days_in_month(year, month));
  first.with_day(day)
}

/// Like [`checked_shift_months`] but
/// saturates at the range ends.
pub fn shift_months(
  date: NaiveDate,
  months: i64
) -> NaiveDate {
  checked_shift_months(date, months)
    .unwrap_or_else(|| {
      range_bound(months)
    })
}

pub fn start_of_week(
  day: NaiveDate,
  week_start: Weekday
) -> NaiveDate {
  let day_idx = day
    .weekday()
    .num_days_from_monday()
    as i64;
  let start_idx = week_start
    .num_days_from_monday()
    as i64;
  let diff =
    (7 + day_idx - start_idx) % 7;
  add_days(day, -diff)
}

#[tracing::instrument(skip(today), fields(input = input))]
pub fn parse_anchor_expr(
  input: &str,
  today: NaiveDate
) -> anyhow::Result<NaiveDate> {
  let token = input.trim();
  let lower =
    token.to_ascii_lowercase();

  match lower.as_str() {
    | "today" | "now" => {
      return Ok(today);
    }
    | "tomorrow" => {
      return Ok(add_days(today, 1));
    }
    | "yesterday" => {
      return Ok(add_days(today, -1));
    }
    | _ => {}
  }

  let rel_re = Regex::new(
    r"^(?P<sign>[+-])(?P<num>\d+)(?P<unit>[dwm])$"
  )
  .map_err(|e| {
    anyhow!(
      "internal regex compile \
       failure: {e}"
    )
  })?;

  if let Some(caps) =
    rel_re.captures(&lower)
  {
    let num: i64 = caps
      .name("num")
      .map(|m| m.as_str())
      .ok_or_else(|| {
        anyhow!(
          "missing relative amount"
        )
      })?
      .parse()
      .context(
        "invalid relative number"
      )?;
    let num = if caps
      .name("sign")
      .is_some_and(|m| m.as_str() == "-")
    {
      -num
    } else {
      num
    };

    return match caps
      .name("unit")
      .map(|m| m.as_str())
    {
      | Some("d") => {
        checked_add_days(today, num)
          .ok_or_else(|| {
            anyhow!(
              "relative day offset out \
               of range: {input}"
            )
          })
      }
      | Some("w") => {
        num
          .checked_mul(7)
          .and_then(|days| {
            checked_add_days(today, days)
          })
          .ok_or_else(|| {
            anyhow!(
              "relative week offset out \
               of range: {input}"
            )
          })
      }
      | Some("m") => {
        checked_shift_months(today, num)
          .ok_or_else(|| {
            anyhow!(
              "relative month offset out \
               of range: {input}"
            )
          })
      }
      | other => {
        Err(anyhow!(
          "unknown relative unit: \
           {other:?}"
        ))
      }
    };
  }

  if let Ok(date) =
    NaiveDate::parse_from_str(
      token, "%Y-%m-%d"
    )
  {
    return Ok(date);
  }

  if let Ok(dt) =
    DateTime::parse_from_rfc3339(token)
  {
    return Ok(dt.date_naive());
  }

  Err(anyhow!(
    "unrecognized anchor expression: \
     {input}"
  ))
  .with_context(|| {
    "supported formats: \
     today/tomorrow/yesterday, \
     +Nd/-Nd, +Nw/-Nw, +Nm/-Nm, \
     YYYY-MM-DD, RFC3339"
  })
}
