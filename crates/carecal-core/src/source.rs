use std::fs;
use std::path::Path;

use anyhow::{Context, anyhow};
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::datetime::calendar_date;
use crate::shift::{CaregiverRef, ClientRef, Shift, ShiftStatus};

/// Filter for listing shifts. Empty fields match everything.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftQuery {
    #[serde(default)]
    pub from: Option<NaiveDate>,
    #[serde(default)]
    pub to: Option<NaiveDate>,
    #[serde(default)]
    pub caregiver_id: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
}

impl ShiftQuery {
    /// Date bounds use overlap semantics in the calendar timezone.
    pub fn matches(&self, shift: &Shift, timezone: Tz) -> bool {
        if let Some(id) = &self.caregiver_id
            && &shift.caregiver.id != id
        {
            return false;
        }
        if let Some(id) = &self.client_id
            && &shift.client.id != id
        {
            return false;
        }

        let start_day = calendar_date(shift.start, timezone);
        let end_day = calendar_date(shift.end, timezone).max(start_day);
        if let Some(from) = self.from
            && end_day < from
        {
            return false;
        }
        if let Some(to) = self.to
            && start_day > to
        {
            return false;
        }
        true
    }
}

/// Create (no id) or update (with id) payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftUpsert {
    #[serde(default)]
    pub id: Option<String>,
    pub caregiver: CaregiverRef,
    pub client: ClientRef,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub status: Option<ShiftStatus>,
}

/// The remote collaborator that owns shift records.
pub trait ShiftSource {
    fn list(&self, query: &ShiftQuery) -> anyhow::Result<Vec<Shift>>;

    fn get(&self, id: &str) -> anyhow::Result<Option<Shift>>;

    fn upsert(&mut self, upsert: ShiftUpsert) -> anyhow::Result<Shift>;
}

#[derive(Debug, Clone)]
pub struct InMemoryShiftSource {
    shifts: Vec<Shift>,
    timezone: Tz,
}

impl InMemoryShiftSource {
    pub fn new(shifts: Vec<Shift>, timezone: Tz) -> Self {
        Self { shifts, timezone }
    }

    pub fn len(&self) -> usize {
        self.shifts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shifts.is_empty()
    }
}

impl ShiftSource for InMemoryShiftSource {
    #[tracing::instrument(skip(self))]
    fn list(&self, query: &ShiftQuery) -> anyhow::Result<Vec<Shift>> {
        let out: Vec<Shift> = self
            .shifts
            .iter()
            .filter(|shift| query.matches(shift, self.timezone))
            .cloned()
            .collect();
        debug!(matched = out.len(), total = self.shifts.len(), "listed shifts");
        Ok(out)
    }

    fn get(&self, id: &str) -> anyhow::Result<Option<Shift>> {
        Ok(self.shifts.iter().find(|shift| shift.id == id).cloned())
    }

    #[tracing::instrument(skip(self, upsert), fields(id = ?upsert.id))]
    fn upsert(&mut self, upsert: ShiftUpsert) -> anyhow::Result<Shift> {
        let Some(id) = upsert.id else {
            let mut shift = Shift::new_scheduled(
                Uuid::new_v4().to_string(),
                upsert.start,
                upsert.end,
                upsert.caregiver,
                upsert.client,
            );
            if let Some(status) = upsert.status {
                shift.status = status;
            }
            info!(id = %shift.id, "created shift");
            self.shifts.push(shift.clone());
            return Ok(shift);
        };

        let shift = self
            .shifts
            .iter_mut()
            .find(|shift| shift.id == id)
            .ok_or_else(|| anyhow!("shift not found: {id}"))?;
        shift.caregiver = upsert.caregiver;
        shift.client = upsert.client;
        shift.start = upsert.start;
        shift.end = upsert.end;
        if let Some(status) = upsert.status {
            shift.status = status;
        }
        info!(id = %shift.id, "updated shift");
        Ok(shift.clone())
    }
}

/// Reads a JSON array of shifts, or one shift per line.
#[tracing::instrument(skip(path))]
pub fn load_shifts_json(path: &Path) -> anyhow::Result<Vec<Shift>> {
    debug!(file = %path.display(), "loading shifts");
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let trimmed = raw.trim();

    if trimmed.is_empty() {
        return Ok(vec![]);
    }

    if trimmed.starts_with('[') {
        let shifts: Vec<Shift> = serde_json::from_str(trimmed)
            .with_context(|| format!("failed parsing {}", path.display()))?;
        debug!(count = shifts.len(), "loaded shifts from json array");
        return Ok(shifts);
    }

    let mut out = Vec::new();
    for (idx, line) in raw.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let shift: Shift = serde_json::from_str(line)
            .with_context(|| format!("failed parsing {} line {}", path.display(), idx + 1))?;
        out.push(shift);
    }

    debug!(count = out.len(), "loaded shifts from jsonl");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn caregiver(id: &str) -> CaregiverRef {
        CaregiverRef {
            id: id.to_string(),
            first_name: "Ana".to_string(),
            last_name: "Reyes".to_string(),
        }
    }

    fn client(id: &str) -> ClientRef {
        ClientRef {
            id: id.to_string(),
            first_name: "Joan".to_string(),
            last_name: "Miller".to_string(),
            address: None,
        }
    }

    fn at(d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, d, h, 0, 0)
            .single()
            .expect("valid instant")
    }

    fn upsert(cg: &str, cl: &str, start: DateTime<Utc>, hours: i64) -> ShiftUpsert {
        ShiftUpsert {
            id: None,
            caregiver: caregiver(cg),
            client: client(cl),
            start,
            end: start + Duration::hours(hours),
            status: None,
        }
    }

    #[test]
    fn create_then_update() {
        let mut source = InMemoryShiftSource::new(vec![], chrono_tz::UTC);
        let created = source
            .upsert(upsert("cg-1", "cl-1", at(10, 9), 8))
            .expect("create");
        assert_eq!(created.status, ShiftStatus::Scheduled);
        assert!(Uuid::parse_str(&created.id).is_ok());

        let mut change = upsert("cg-2", "cl-1", at(10, 10), 4);
        change.id = Some(created.id.clone());
        change.status = Some(ShiftStatus::Cancelled);
        let updated = source.upsert(change).expect("update");
        assert_eq!(updated.caregiver.id, "cg-2");
        assert_eq!(updated.status, ShiftStatus::Cancelled);
        assert_eq!(source.len(), 1);

        let fetched = source.get(&created.id).expect("get").expect("present");
        assert_eq!(fetched, updated);
    }

    #[test]
    fn update_of_unknown_id_fails() {
        let mut source = InMemoryShiftSource::new(vec![], chrono_tz::UTC);
        let mut change = upsert("cg-1", "cl-1", at(10, 9), 8);
        change.id = Some("missing".to_string());
        assert!(source.upsert(change).is_err());
        assert!(source.is_empty());
    }

    #[test]
    fn list_filters_by_overlap_and_people() {
        let mut source = InMemoryShiftSource::new(vec![], chrono_tz::UTC);
        source
            .upsert(upsert("cg-1", "cl-1", at(9, 22), 10))
            .expect("overnight into the 10th");
        source
            .upsert(upsert("cg-2", "cl-2", at(12, 9), 8))
            .expect("day shift");

        let tenth = NaiveDate::from_ymd_opt(2024, 6, 10).expect("valid date");
        let query = ShiftQuery {
            from: Some(tenth),
            to: Some(tenth),
            ..ShiftQuery::default()
        };
        assert_eq!(source.list(&query).expect("list").len(), 1);

        let query = ShiftQuery {
            client_id: Some("cl-2".to_string()),
            ..ShiftQuery::default()
        };
        let listed = source.list(&query).expect("list");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].caregiver.id, "cg-2");

        assert_eq!(source.list(&ShiftQuery::default()).expect("list").len(), 2);
    }
}
