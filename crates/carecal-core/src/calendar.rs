use chrono::{
  Datelike,
  NaiveDate,
  Weekday
};
use serde::{
  Deserialize,
  Serialize
};

use crate::datetime::{
  add_days,
  checked_add_days,
  first_day_of_month,
  last_day_of_month,
  shift_months,
  start_of_week
};

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
  Week,
  Month
}

impl ViewMode {
  pub fn as_key(self) -> &'static str {
    match self {
      | Self::Week => "week",
      | Self::Month => "month"
    }
  }

  pub fn from_key(
    key: &str
  ) -> Option<Self> {
    match key.trim() {
      | "week" => Some(Self::Week),
      | "month" => Some(Self::Month),
      | _ => None
    }
  }
}

/// How many rows a month grid spans.
#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum GridRows {
  /// Just enough whole weeks to cover
  /// the month.
  #[default]
  Fit,
  /// Always six weeks.
  Fixed
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub struct GridDay {
  pub date:             NaiveDate,
  pub in_current_month: bool
}

pub fn week_dates(
  anchor: NaiveDate,
  week_start: Weekday
) -> Vec<NaiveDate> {
  date_window(
    start_of_week(anchor, week_start),
    7
  )
}

pub fn month_dates(
  anchor: NaiveDate,
  week_start: Weekday,
  rows: GridRows
) -> Vec<NaiveDate> {
  let first = first_day_of_month(
    anchor.year(),
    anchor.month()
  );
  let last = last_day_of_month(
    anchor.year(),
    anchor.month()
  );
  let grid_start =
    start_of_week(first, week_start);

  let cells = match rows {
    | GridRows::Fixed => 42_i64,
    | GridRows::Fit => {
      let span = (last - grid_start)
        .num_days()
        + 1;
      (span + 6) / 7 * 7
    }
  };

  date_window(grid_start, cells)
}

/// `len` consecutive days from `start`.
/// At the top of chrono's date range the
/// window slides back so every cell is a
/// distinct real day.
fn date_window(
  start: NaiveDate,
  len: i64
) -> Vec<NaiveDate> {
  let start =
    match checked_add_days(start, len - 1)
    {
      | Some(_) => start,
      | None => {
        add_days(NaiveDate::MAX, 1 - len)
      }
    };
  (0..len)
    .map(|offset| {
      add_days(start, offset)
    })
    .collect()
}

pub fn month_grid(
  anchor: NaiveDate,
  week_start: Weekday,
  rows: GridRows
) -> Vec<GridDay> {
  month_dates(anchor, week_start, rows)
    .into_iter()
    .map(|date| {
      GridDay {
        date,
        in_current_month: date.year()
          == anchor.year()
          && date.month()
            == anchor.month()
      }
    })
    .collect()
}

pub fn shift_anchor(
  anchor: NaiveDate,
  mode: ViewMode,
  step: i64
) -> NaiveDate {
  match mode {
    | ViewMode::Week => {
      add_days(
        anchor,
        step.saturating_mul(7)
      )
    }
    | ViewMode::Month => {
      shift_months(anchor, step)
    }
  }
}

/// Everything a calendar screen needs
/// to recompute its grid.
#[derive(
  Debug,
  Clone,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
)]
pub struct ViewState {
  pub anchor:         NaiveDate,
  pub mode:           ViewMode,
  #[serde(default)]
  pub selected_shift: Option<String>
}

impl ViewState {
  pub fn new(
    anchor: NaiveDate,
    mode: ViewMode
  ) -> Self {
    Self {
      anchor,
      mode,
      selected_shift: None
    }
  }

  #[must_use]
  pub fn previous(&self) -> Self {
    self.step(-1)
  }

  #[must_use]
  pub fn next(&self) -> Self {
    self.step(1)
  }

  #[must_use]
  pub fn step(
    &self,
    step: i64
  ) -> Self {
    Self {
      anchor: shift_anchor(
        self.anchor,
        self.mode,
        step
      ),
      ..self.clone()
    }
  }

  #[must_use]
  pub fn today(
    &self,
    today: NaiveDate
  ) -> Self {
    Self {
      anchor: today,
      ..self.clone()
    }
  }

  #[must_use]
  pub fn with_mode(
    &self,
    mode: ViewMode
  ) -> Self {
    Self {
      mode,
      ..self.clone()
    }
  }

  #[must_use]
  pub fn select_shift(
    &self,
    id: impl Into<String>
  ) -> Self {
    Self {
      selected_shift: Some(id.into()),
      ..self.clone()
    }
  }

  #[must_use]
  pub fn clear_selection(
    &self
  ) -> Self {
    Self {
      selected_shift: None,
      ..self.clone()
    }
  }

  pub fn visible_dates(
    &self,
    week_start: Weekday,
    rows: GridRows
  ) -> Vec<NaiveDate> {
    match self.mode {
      | ViewMode::Week => {
        week_dates(
          self.anchor,
          week_start
        )
      }
      | ViewMode::Month => {
        month_dates(
          self.anchor,
          week_start,
          rows
        )
      }
    }
  }

  /// Inclusive first and last visible
  /// dates.
  pub fn visible_range(
    &self,
    week_start: Weekday,
    rows: GridRows
  ) -> (NaiveDate, NaiveDate) {
    let dates = self
      .visible_dates(week_start, rows);
    match (dates.first(), dates.last())
    {
      | (Some(first), Some(last)) => {
        (*first, *last)
      }
      | _ => (self.anchor, self.anchor)
    }
  }

  pub fn title(
    &self,
    week_start: Weekday
  ) -> String {
    match self.mode {
      | ViewMode::Month => {
        format!(
          "Month View {}",
          self.anchor.format("%B %Y")
        )
      }
      | ViewMode::Week => {
        let dates = week_dates(
          self.anchor,
          week_start
        );
        let start = dates
          .first()
          .copied()
          .unwrap_or(self.anchor);
        let end = dates
          .last()
          .copied()
          .unwrap_or(self.anchor);
        format!(
          "Week View {} - {}",
          start.format("%Y-%m-%d"),
          end.format("%Y-%m-%d")
        )
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::datetime::days_in_month;

  fn date(
    y: i32,
    m: u32,
    d: u32
  ) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d)
      .expect("valid date")
  }

  fn assert_consecutive(
    dates: &[NaiveDate]
  ) {
    for pair in dates.windows(2) {
      assert_eq!(
        add_days(pair[0], 1),
        pair[1]
      );
    }
  }

  #[test]
  fn week_of_wednesday_starts_sunday() {
    let dates = week_dates(
      date(2024, 6, 12),
      Weekday::Sun
    );
    let expected = (9..=15)
      .map(|d| date(2024, 6, d))
      .collect::<Vec<_>>();
    assert_eq!(dates, expected);
  }

  #[test]
  fn week_always_holds_anchor() {
    let mut anchor = date(2023, 12, 20);
    for _ in 0..60 {
      for week_start in
        [Weekday::Sun, Weekday::Mon]
      {
        let dates =
          week_dates(anchor, week_start);
        assert_eq!(dates.len(), 7);
        assert_consecutive(&dates);
        assert!(dates.contains(&anchor));
        assert_eq!(
          dates[0].weekday(),
          week_start
        );
      }
      anchor = add_days(anchor, 1);
    }
  }

  #[test]
  fn month_grid_covers_whole_month() {
    for (year, month) in [
      (2024, 2),
      (2023, 2),
      (2024, 6),
      (2026, 2),
      (2024, 12)
    ] {
      for rows in
        [GridRows::Fit, GridRows::Fixed]
      {
        let anchor =
          date(year, month, 15);
        let dates = month_dates(
          anchor,
          Weekday::Sun,
          rows
        );
        assert_eq!(dates.len() % 7, 0);
        assert_consecutive(&dates);
        let in_month = dates
          .iter()
          .filter(|d| {
            d.year() == year
              && d.month() == month
          })
          .count();
        assert_eq!(
          in_month as u32,
          days_in_month(year, month)
        );
        if rows == GridRows::Fixed {
          assert_eq!(dates.len(), 42);
        }
      }
    }
  }

  #[test]
  fn fit_grid_uses_minimal_rows() {
    // February 2026 starts on a Sunday
    // and has 28 days.
    let dates = month_dates(
      date(2026, 2, 10),
      Weekday::Sun,
      GridRows::Fit
    );
    assert_eq!(dates.len(), 28);

    // June 2024 starts on a Saturday.
    let dates = month_dates(
      date(2024, 6, 1),
      Weekday::Sun,
      GridRows::Fit
    );
    assert_eq!(dates.len(), 42);
    assert_eq!(dates[0], date(2024, 5, 26));
  }

  #[test]
  fn grid_marks_padding_days() {
    let grid = month_grid(
      date(2024, 6, 12),
      Weekday::Sun,
      GridRows::Fit
    );
    assert!(!grid[0].in_current_month);
    assert!(grid[6].in_current_month);
    assert_eq!(
      grid
        .iter()
        .filter(|d| d.in_current_month)
        .count(),
      30
    );
  }

  #[test]
  fn month_navigation_clamps_day() {
    let leap = ViewState::new(
      date(2024, 1, 31),
      ViewMode::Month
    );
    assert_eq!(
      leap.next().anchor,
      date(2024, 2, 29)
    );

    let common = ViewState::new(
      date(2023, 1, 31),
      ViewMode::Month
    );
    assert_eq!(
      common.next().anchor,
      date(2023, 2, 28)
    );
    assert_eq!(
      common.previous().anchor,
      date(2022, 12, 31)
    );
  }

  #[test]
  fn week_navigation_moves_seven_days() {
    let state = ViewState::new(
      date(2024, 6, 12),
      ViewMode::Week
    );
    assert_eq!(
      state.next().anchor,
      date(2024, 6, 19)
    );
    assert_eq!(
      state.previous().anchor,
      date(2024, 6, 5)
    );
    assert_eq!(state.step(0), state);
  }

  #[test]
  fn huge_steps_saturate() {
    let week = ViewState::new(
      date(2024, 6, 12),
      ViewMode::Week
    );
    assert_eq!(
      week.step(i64::MAX / 2).anchor,
      NaiveDate::MAX
    );
    assert_eq!(
      week.step(i64::MIN).anchor,
      NaiveDate::MIN
    );
    assert_eq!(
      shift_anchor(
        date(2024, 6, 12),
        ViewMode::Week,
        10_000_000_000_000
      ),
      NaiveDate::MAX
    );

    let month =
      week.with_mode(ViewMode::Month);
    assert_eq!(
      month.step(i64::MAX).anchor,
      NaiveDate::MAX
    );
    assert_eq!(
      month.step(-(i64::MAX / 2)).anchor,
      NaiveDate::MIN
    );
  }

  #[test]
  fn windows_stay_distinct_at_range_ends() {
    for anchor in [
      NaiveDate::MAX,
      add_days(NaiveDate::MAX, -2),
      NaiveDate::MIN
    ] {
      for week_start in
        [Weekday::Sun, Weekday::Mon]
      {
        let dates =
          week_dates(anchor, week_start);
        assert_eq!(dates.len(), 7);
        assert_consecutive(&dates);
        assert!(dates.contains(&anchor));

        let grid = month_dates(
          anchor,
          week_start,
          GridRows::Fixed
        );
        assert_eq!(grid.len(), 42);
        assert_consecutive(&grid);
        assert!(grid.contains(&anchor));
      }
    }
  }

  #[test]
  fn transitions_leave_other_fields() {
    let state = ViewState::new(
      date(2024, 6, 12),
      ViewMode::Week
    )
    .select_shift("s-1");

    let moved =
      state.today(date(2024, 7, 1));
    assert_eq!(
      moved.anchor,
      date(2024, 7, 1)
    );
    assert_eq!(
      moved.selected_shift.as_deref(),
      Some("s-1")
    );

    let switched =
      moved.with_mode(ViewMode::Month);
    assert_eq!(
      switched.mode,
      ViewMode::Month
    );
    assert_eq!(
      switched.clear_selection()
        .selected_shift,
      None
    );
    assert_eq!(
      state.anchor,
      date(2024, 6, 12)
    );
  }

  #[test]
  fn visible_range_and_title() {
    let state = ViewState::new(
      date(2024, 6, 12),
      ViewMode::Week
    );
    assert_eq!(
      state.visible_range(
        Weekday::Sun,
        GridRows::Fit
      ),
      (date(2024, 6, 9), date(2024, 6, 15))
    );
    assert_eq!(
      state.title(Weekday::Sun),
      "Week View 2024-06-09 - 2024-06-15"
    );
    assert_eq!(
      state
        .with_mode(ViewMode::Month)
        .title(Weekday::Sun),
      "Month View June 2024"
    );
  }

  #[test]
  fn view_state_serializes() {
    let state = ViewState::new(
      date(2024, 6, 12),
      ViewMode::Month
    );
    let raw = serde_json::to_string(
      &state
    )
    .expect("serialize state");
    assert_eq!(
      raw,
      r#"{"anchor":"2024-06-12","mode":"month","selected_shift":null}"#
    );
    let back: ViewState =
      serde_json::from_str(&raw)
        .expect("deserialize state");
    assert_eq!(back, state);
  }
}
