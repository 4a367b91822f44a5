/*
 * Responsibility
 * - /leave 系の request/response DTO
 */
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::repos::LeaveDetails;
use crate::services::approval::ApprovalAction;

#[derive(Debug, Deserialize)]
pub struct CreateLeaveRequest {
    pub leave_type: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub reason: Option<String>,
}

impl CreateLeaveRequest {
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.leave_type.trim().is_empty() {
            return Err("leave_type is required");
        }
        if self.end_date < self.start_date {
            return Err("end_date must not be before start_date");
        }
        if let Some(reason) = &self.reason
            && reason.len() > 2000
        {
            return Err("reason must be <= 2000 chars");
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct DecisionRequest {
    pub action: ApprovalAction,
}

/// `?token=` on the emailed links.
#[derive(Debug, Default, Deserialize)]
pub struct TokenQuery {
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LeaveResponse {
    pub id: Uuid,
    pub employee_id: Uuid,
    pub employee_name: String,
    pub employee_email: String,
    pub manager_id: Uuid,
    pub manager_name: String,
    pub leave_type: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub days: i32,
    pub reason: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
}

impl From<LeaveDetails> for LeaveResponse {
    fn from(l: LeaveDetails) -> Self {
        Self {
            id: l.id,
            employee_id: l.employee_id,
            employee_name: l.employee_name,
            employee_email: l.employee_email,
            manager_id: l.manager_id,
            manager_name: l.manager_name,
            leave_type: l.leave_type,
            start_date: l.start_date,
            end_date: l.end_date,
            days: l.days,
            reason: l.reason,
            status: l.status,
            created_at: l.created_at,
            updated_at: l.updated_at,
            decided_at: l.decided_at,
        }
    }
}

/// Body rendered by the AMP form's submit-success / submit-error templates.
#[derive(Debug, Serialize)]
pub struct AmpDecisionResponse {
    pub status: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(start: &str, end: &str) -> CreateLeaveRequest {
        CreateLeaveRequest {
            leave_type: "Annual".into(),
            start_date: start.parse().unwrap(),
            end_date: end.parse().unwrap(),
            reason: None,
        }
    }

    #[test]
    fn end_before_start_is_rejected() {
        assert!(req("2025-03-10", "2025-03-09").validate().is_err());
        assert!(req("2025-03-10", "2025-03-10").validate().is_ok());
    }

    #[test]
    fn leave_response_carries_timestamps() {
        let details = crate::repos::leave_repo::sample_details();
        let updated_at = details.updated_at;

        let json = serde_json::to_value(LeaveResponse::from(details)).unwrap();
        assert_eq!(json["updated_at"], serde_json::to_value(updated_at).unwrap());
        assert!(json["created_at"].is_string());
        assert!(json["decided_at"].is_null());
    }

    #[test]
    fn action_is_lowercase_json() {
        let d: DecisionRequest = serde_json::from_str(r#"{"action":"reject"}"#).unwrap();
        assert_eq!(d.action, ApprovalAction::Reject);
        assert!(serde_json::from_str::<DecisionRequest>(r#"{"action":"maybe"}"#).is_err());
    }
}
