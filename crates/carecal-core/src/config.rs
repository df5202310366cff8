use std::fs;
use std::path::{
  Path,
  PathBuf
};

use anyhow::{
  Context,
  anyhow
};
use chrono::Weekday;
use serde::{
  Deserialize,
  Serialize
};
use tracing::{
  debug,
  info,
  warn
};

use crate::calendar::{
  GridRows,
  ViewMode
};
use crate::datetime::parse_week_start;

pub const CONFIG_ENV_VAR: &str =
  "CARECAL_CONFIG";
const CONFIG_FILE_NAME: &str =
  "carecal.toml";

fn default_week_start() -> String {
  "sunday".to_string()
}

fn default_view() -> String {
  "week".to_string()
}

fn default_max_shifts_per_day() -> usize
{
  2
}

fn default_true() -> bool {
  true
}

#[derive(
  Debug,
  Clone,
  Default,
  PartialEq,
  Serialize,
  Deserialize,
)]
pub struct Config {
  #[serde(default)]
  pub timezone: Option<String>,
  #[serde(default)]
  pub calendar: CalendarSection,
  #[serde(default)]
  pub display:  DisplaySection,
  #[serde(skip)]
  pub loaded_from: Option<PathBuf>
}

#[derive(
  Debug,
  Clone,
  PartialEq,
  Serialize,
  Deserialize,
)]
pub struct CalendarSection {
  #[serde(default = "default_week_start")]
  pub week_start:   String,
  #[serde(default)]
  pub month_rows:   GridRows,
  #[serde(default = "default_view")]
  pub default_view: String
}

impl Default for CalendarSection {
  fn default() -> Self {
    Self {
      week_start:   default_week_start(),
      month_rows:   GridRows::Fit,
      default_view: default_view()
    }
  }
}

#[derive(
  Debug,
  Clone,
  PartialEq,
  Serialize,
  Deserialize,
)]
pub struct DisplaySection {
  #[serde(
    default = "default_max_shifts_per_day"
  )]
  pub max_shifts_per_day: usize,
  #[serde(default = "default_true")]
  pub color: bool
}

impl Default for DisplaySection {
  fn default() -> Self {
    Self {
      max_shifts_per_day:
        default_max_shifts_per_day(),
      color: true
    }
  }
}

impl Config {
  /// Reads the first config file found;
  /// a missing file means defaults.
  #[tracing::instrument(skip(
    path_override
  ))]
  pub fn load(
    path_override: Option<&Path>
  ) -> anyhow::Result<Self> {
    let Some(path) =
      resolve_config_path(path_override)?
    else {
      warn!(
        "no carecal.toml found; using \
         defaults"
      );
      return Ok(Self::default());
    };

    info!(config = %path.display(), "loading config");
    let text = fs::read_to_string(&path)
      .with_context(|| {
        format!(
          "failed to read {}",
          path.display()
        )
      })?;
    let mut cfg = Self::from_toml(&text)
      .with_context(|| {
        format!(
          "failed to parse {}",
          path.display()
        )
      })?;
    cfg.loaded_from = Some(path);
    Ok(cfg)
  }

  pub fn from_toml(
    text: &str
  ) -> anyhow::Result<Self> {
    let mut cfg: Self =
      toml::from_str(text)?;
    cfg.sanitize();
    debug!(
      timezone = ?cfg.timezone,
      week_start = %cfg.calendar.week_start,
      max_shifts_per_day = cfg.display.max_shifts_per_day,
      "parsed config"
    );
    Ok(cfg)
  }

  fn sanitize(&mut self) {
    if self
      .calendar
      .week_start
      .trim()
      .is_empty()
    {
      self.calendar.week_start =
        default_week_start();
    }

    if ViewMode::from_key(
      &self.calendar.default_view
    )
    .is_none()
    {
      warn!(
        view = %self.calendar.default_view,
        "unknown default view; using week"
      );
      self.calendar.default_view =
        default_view();
    }

    if self.display.max_shifts_per_day
      == 0
    {
      self.display.max_shifts_per_day =
        default_max_shifts_per_day();
    }

    if self
      .timezone
      .as_deref()
      .is_some_and(|tz| {
        tz.trim().is_empty()
      })
    {
      self.timezone = None;
    }
  }

  pub fn week_start(&self) -> Weekday {
    parse_week_start(
      &self.calendar.week_start
    )
  }

  pub fn default_view(
    &self
  ) -> ViewMode {
    ViewMode::from_key(
      &self.calendar.default_view
    )
    .unwrap_or(ViewMode::Week)
  }
}

#[tracing::instrument(skip(
  path_override
))]
fn resolve_config_path(
  path_override: Option<&Path>
) -> anyhow::Result<Option<PathBuf>> {
  if let Some(path) = path_override {
    if !path.exists() {
      return Err(anyhow!(
        "config file does not exist: {}",
        path.display()
      ));
    }
    return Ok(Some(path.to_path_buf()));
  }

  if let Ok(raw) =
    std::env::var(CONFIG_ENV_VAR)
  {
    let trimmed = raw.trim();
    if trimmed == "/dev/null" {
      return Ok(None);
    }
    if !trimmed.is_empty() {
      return Ok(Some(PathBuf::from(
        trimmed
      )));
    }
  }

  let candidate =
    dirs::config_dir().map(|dir| {
      dir
        .join("carecal")
        .join(CONFIG_FILE_NAME)
    });
  Ok(candidate.filter(|path| {
    path.exists()
  }))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn empty_file_gives_defaults() {
    let cfg = Config::from_toml("")
      .expect("parse empty");
    assert_eq!(cfg, Config::default());
    assert_eq!(
      cfg.week_start(),
      Weekday::Sun
    );
    assert_eq!(
      cfg.default_view(),
      ViewMode::Week
    );
    assert_eq!(
      cfg.display.max_shifts_per_day,
      2
    );
  }

  #[test]
  fn reads_all_sections() {
    let cfg = Config::from_toml(
      r#"
timezone = "America/Chicago"

[calendar]
week_start = "monday"
month_rows = "fixed"
default_view = "month"

[display]
max_shifts_per_day = 4
color = false
"#
    )
    .expect("parse config");
    assert_eq!(
      cfg.timezone.as_deref(),
      Some("America/Chicago")
    );
    assert_eq!(
      cfg.week_start(),
      Weekday::Mon
    );
    assert_eq!(
      cfg.calendar.month_rows,
      GridRows::Fixed
    );
    assert_eq!(
      cfg.default_view(),
      ViewMode::Month
    );
    assert_eq!(
      cfg.display.max_shifts_per_day,
      4
    );
    assert!(!cfg.display.color);
  }

  #[test]
  fn sanitizes_degenerate_values() {
    let cfg = Config::from_toml(
      r#"
timezone = "  "

[calendar]
week_start = ""
default_view = "agenda"

[display]
max_shifts_per_day = 0
"#
    )
    .expect("parse config");
    assert_eq!(cfg.timezone, None);
    assert_eq!(
      cfg.calendar.week_start,
      "sunday"
    );
    assert_eq!(
      cfg.calendar.default_view,
      "week"
    );
    assert_eq!(
      cfg.display.max_shifts_per_day,
      2
    );
  }

  #[test]
  fn rejects_malformed_toml() {
    assert!(
      Config::from_toml(
        "[calendar\nweek_start"
      )
      .is_err()
    );
  }

  #[test]
  fn missing_override_path_is_error() {
    let err = Config::load(Some(
      Path::new(
        "/definitely/not/here.toml"
      )
    ))
    .expect_err("missing file");
    assert!(
      err
        .to_string()
        .contains("does not exist")
    );
  }
}
