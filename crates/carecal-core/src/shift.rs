use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShiftStatus {
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
}

impl ShiftStatus {
    pub fn as_key(self) -> &'static str {
        match self {
            Self::Scheduled => "SCHEDULED",
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CaregiverRef {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ClientRef {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VisitNoteSummary {
    pub id: String,
    #[serde(default)]
    pub note_type: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Shift {
    pub id: String,

    #[serde(alias = "startTime")]
    pub start: DateTime<Utc>,

    #[serde(alias = "endTime")]
    pub end: DateTime<Utc>,

    #[serde(default)]
    pub actual_start: Option<DateTime<Utc>>,

    #[serde(default)]
    pub actual_end: Option<DateTime<Utc>>,

    pub status: ShiftStatus,

    pub caregiver: CaregiverRef,

    pub client: ClientRef,

    #[serde(default)]
    pub visit_notes: Vec<VisitNoteSummary>,

    #[serde(default)]
    pub client_signature: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShiftError {
    #[error("shift {id} cannot {action} while {}", .status.as_key())]
    InvalidTransition {
        id: String,
        action: &'static str,
        status: ShiftStatus,
    },
}

impl Shift {
    pub fn new_scheduled(
        id: String,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        caregiver: CaregiverRef,
        client: ClientRef,
    ) -> Self {
        Self {
            id,
            start,
            end,
            actual_start: None,
            actual_end: None,
            status: ShiftStatus::Scheduled,
            caregiver,
            client,
            visit_notes: vec![],
            client_signature: None,
        }
    }

    /// Can be negative for malformed records; nothing here corrects them.
    pub fn scheduled_duration(&self) -> Duration {
        self.end - self.start
    }

    pub fn display_title(&self) -> String {
        format!(
            "{} {} / {} {}",
            self.client.first_name,
            self.client.last_name,
            self.caregiver.first_name,
            self.caregiver.last_name
        )
    }

    #[tracing::instrument(skip(self), fields(id = %self.id))]
    pub fn check_in(&mut self, at: DateTime<Utc>) -> Result<(), ShiftError> {
        if self.status != ShiftStatus::Scheduled {
            return Err(self.invalid("check in"));
        }
        self.actual_start = Some(at);
        self.status = ShiftStatus::InProgress;
        tracing::debug!("checked in");
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(id = %self.id))]
    pub fn check_out(&mut self, at: DateTime<Utc>) -> Result<(), ShiftError> {
        if self.status != ShiftStatus::InProgress {
            return Err(self.invalid("check out"));
        }
        self.actual_end = Some(at);
        self.status = ShiftStatus::Completed;
        tracing::debug!("checked out");
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(id = %self.id))]
    pub fn cancel(&mut self) -> Result<(), ShiftError> {
        if self.status == ShiftStatus::Completed {
            return Err(self.invalid("cancel"));
        }
        self.status = ShiftStatus::Cancelled;
        Ok(())
    }

    fn invalid(&self, action: &'static str) -> ShiftError {
        ShiftError::InvalidTransition {
            id: self.id.clone(),
            action,
            status: self.status,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn sample() -> Shift {
        let start = Utc
            .with_ymd_and_hms(2024, 6, 10, 9, 0, 0)
            .single()
            .expect("valid start");
        Shift::new_scheduled(
            "shift-1".to_string(),
            start,
            start + Duration::hours(8),
            CaregiverRef {
                id: "cg-1".to_string(),
                first_name: "Ana".to_string(),
                last_name: "Reyes".to_string(),
            },
            ClientRef {
                id: "cl-1".to_string(),
                first_name: "Joan".to_string(),
                last_name: "Miller".to_string(),
                address: None,
            },
        )
    }

    #[test]
    fn check_in_then_out_completes() {
        let mut shift = sample();
        let at = shift.start;
        shift.check_in(at).expect("check in");
        assert_eq!(shift.status, ShiftStatus::InProgress);
        shift
            .check_out(at + Duration::hours(8))
            .expect("check out");
        assert_eq!(shift.status, ShiftStatus::Completed);
        assert_eq!(shift.actual_start, Some(at));
        assert!(shift.cancel().is_err());
    }

    #[test]
    fn check_out_requires_check_in() {
        let mut shift = sample();
        let err = shift.check_out(shift.end).expect_err("not started");
        assert_eq!(
            err.to_string(),
            "shift shift-1 cannot check out while SCHEDULED"
        );
        assert_eq!(shift.status, ShiftStatus::Scheduled);
    }

    #[test]
    fn deserializes_api_payload() {
        let raw = r#"{
            "id": "abc",
            "startTime": "2024-06-11T22:00:00Z",
            "endTime": "2024-06-12T06:00:00Z",
            "status": "IN_PROGRESS",
            "caregiver": {"id": "cg", "firstName": "Ana", "lastName": "Reyes"},
            "client": {"id": "cl", "firstName": "Joan", "lastName": "Miller", "address": "12 Elm St"},
            "visitNotes": [{"id": "vn-1", "noteType": "SKILLED_NURSING"}]
        }"#;
        let shift: Shift = serde_json::from_str(raw).expect("parse shift");
        assert_eq!(shift.status, ShiftStatus::InProgress);
        assert_eq!(shift.scheduled_duration(), Duration::hours(8));
        assert_eq!(shift.visit_notes.len(), 1);
        assert_eq!(shift.client.address.as_deref(), Some("12 Elm St"));
        assert_eq!(shift.display_title(), "Joan Miller / Ana Reyes");
    }
}
