use std::collections::{
  BTreeMap,
  BTreeSet
};

use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::Serialize;

use crate::datetime::{
  add_days,
  calendar_date
};
use crate::shift::{
  Shift,
  ShiftStatus
};

/// Calendar date to the shifts touching
/// it. Borrows the shift list it was
/// built from.
#[derive(Debug, Clone, Default)]
pub struct DateBucketMap<'a> {
  buckets:
    BTreeMap<NaiveDate, Vec<&'a Shift>>
}

impl<'a> DateBucketMap<'a> {
  pub fn shifts_on(
    &self,
    date: NaiveDate
  ) -> &[&'a Shift] {
    self
      .buckets
      .get(&date)
      .map(Vec::as_slice)
      .unwrap_or(&[])
  }

  /// Bucket contents ordered by
  /// scheduled start; buckets themselves
  /// keep input order.
  pub fn sorted_on(
    &self,
    date: NaiveDate
  ) -> Vec<&'a Shift> {
    let mut shifts =
      self.shifts_on(date).to_vec();
    shifts.sort_by_key(|shift| {
      (shift.start, shift.id.clone())
    });
    shifts
  }

  pub fn dates(
    &self
  ) -> impl Iterator<Item = &NaiveDate>
  {
    self.buckets.keys()
  }

  pub fn iter(
    &self
  ) -> impl Iterator<
    Item = (&NaiveDate, &Vec<&'a Shift>)
  > {
    self.buckets.iter()
  }

  pub fn len(&self) -> usize {
    self.buckets.len()
  }

  pub fn is_empty(&self) -> bool {
    self.buckets.is_empty()
  }

  /// Plain ids keyed by ISO date, for
  /// handing to a renderer or JSON.
  pub fn to_id_map(
    &self
  ) -> BTreeMap<String, Vec<String>> {
    self
      .buckets
      .iter()
      .map(|(date, shifts)| {
        (
          date
            .format("%Y-%m-%d")
            .to_string(),
          shifts
            .iter()
            .map(|shift| {
              shift.id.clone()
            })
            .collect()
        )
      })
      .collect()
  }

  pub fn preview(
    &self,
    date: NaiveDate,
    limit: usize
  ) -> DayPreview<'a> {
    let sorted = self.sorted_on(date);
    let hidden =
      sorted.len().saturating_sub(limit);
    DayPreview {
      visible: sorted
        .into_iter()
        .take(limit)
        .collect(),
      hidden
    }
  }

  fn push(
    &mut self,
    date: NaiveDate,
    shift: &'a Shift
  ) {
    self
      .buckets
      .entry(date)
      .or_default()
      .push(shift);
  }
}

/// The first few shifts of a day plus
/// the count behind "+N more".
#[derive(Debug, Clone)]
pub struct DayPreview<'a> {
  pub visible: Vec<&'a Shift>,
  pub hidden:  usize
}

impl DayPreview<'_> {
  pub fn more_label(
    &self
  ) -> Option<String> {
    (self.hidden > 0).then(|| {
      format!("+{} more", self.hidden)
    })
  }
}

#[tracing::instrument(skip_all, fields(shifts = shifts.len(), timezone = %timezone))]
pub fn bucket_shifts(
  shifts: &[Shift],
  timezone: Tz
) -> DateBucketMap<'_> {
  bucket_into(shifts, timezone, None)
}

/// Like [`bucket_shifts`], but only
/// produces keys inside `first..=last`.
#[tracing::instrument(skip_all, fields(shifts = shifts.len(), %first, %last))]
pub fn bucket_shifts_within(
  shifts: &[Shift],
  timezone: Tz,
  first: NaiveDate,
  last: NaiveDate
) -> DateBucketMap<'_> {
  bucket_into(
    shifts,
    timezone,
    Some((first, last))
  )
}

fn bucket_into(
  shifts: &[Shift],
  timezone: Tz,
  window: Option<(
    NaiveDate,
    NaiveDate
  )>
) -> DateBucketMap<'_> {
  let mut map = DateBucketMap::default();

  for shift in shifts {
    let start_day = calendar_date(
      shift.start,
      timezone
    );
    let end_day =
      calendar_date(shift.end, timezone);

    if end_day < start_day {
      tracing::debug!(
        id = %shift.id,
        start = %shift.start,
        end = %shift.end,
        "shift ends before it starts; \
         bucketing under start date only"
      );
      if in_window(start_day, window) {
        map.push(start_day, shift);
      }
      continue;
    }

    let (from, to) = match window {
      | Some((first, last)) => {
        (
          start_day.max(first),
          end_day.min(last)
        )
      }
      | None => (start_day, end_day)
    };

    let mut day = from;
    while day <= to {
      map.push(day, shift);
      let next = add_days(day, 1);
      if next == day {
        break;
      }
      day = next;
    }
  }

  tracing::debug!(
    days = map.len(),
    "bucketed shifts"
  );
  map
}

fn in_window(
  day: NaiveDate,
  window: Option<(
    NaiveDate,
    NaiveDate
  )>
) -> bool {
  window.is_none_or(|(first, last)| {
    day >= first && day <= last
  })
}

/// Status counts over a visible window.
/// A multi-day shift counts once. Records
/// are told apart by identity, so two
/// entries sharing an id both count.
#[derive(
  Debug,
  Clone,
  Default,
  PartialEq,
  Eq,
  Serialize,
)]
pub struct PeriodStats {
  pub total:       usize,
  pub scheduled:   usize,
  pub in_progress: usize,
  pub completed:   usize,
  pub cancelled:   usize
}

impl PeriodStats {
  pub fn from_buckets(
    buckets: &DateBucketMap<'_>,
    first: NaiveDate,
    last: NaiveDate
  ) -> Self {
    let mut seen = BTreeSet::new();
    let mut stats = Self::default();

    for (date, shifts) in buckets.iter() {
      if *date < first || *date > last {
        continue;
      }
      for shift in shifts {
        let key: *const Shift = *shift;
        if seen.insert(key) {
          stats.push(shift.status);
        }
      }
    }

    stats
  }

  fn push(
    &mut self,
    status: ShiftStatus
  ) {
    self.total += 1;
    match status {
      | ShiftStatus::Scheduled => {
        self.scheduled += 1;
      }
      | ShiftStatus::InProgress => {
        self.in_progress += 1;
      }
      | ShiftStatus::Completed => {
        self.completed += 1;
      }
      | ShiftStatus::Cancelled => {
        self.cancelled += 1;
      }
    }
  }
}
