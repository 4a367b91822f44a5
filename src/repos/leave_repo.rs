/*
 * Responsibility
 * - leaves テーブル向け SQLx 操作
 * - 読み取りは社員・マネージャーを JOIN した LeaveDetails を返す
 * - 状態遷移は pending からのみ (条件付き UPDATE)
 */
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::repos::error::RepoResult;

pub const STATUS_PENDING: &str = "pending";

#[derive(Debug, Clone, FromRow)]
pub struct LeaveDetails {
    pub id: Uuid,
    pub employee_id: Uuid,
    pub employee_name: String,
    pub employee_email: String,
    pub employee_department: Option<String>,
    pub manager_id: Uuid,
    pub manager_name: String,
    pub manager_email: String,
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

pub struct NewLeave<'a> {
    pub employee_id: Uuid,
    pub manager_id: Uuid,
    pub leave_type: &'a str,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub days: i32,
    pub reason: Option<&'a str>,
}

const DETAILS_SELECT: &str = r#"
    SELECT
        l.id, l.employee_id,
        e.name AS employee_name, e.email AS employee_email, e.department AS employee_department,
        l.manager_id, m.name AS manager_name, m.email AS manager_email,
        l.leave_type, l.start_date, l.end_date, l.days, l.reason, l.status,
        l.created_at, l.updated_at, l.decided_at
"#;

#[derive(Clone, Debug)]
pub struct LeaveRepo {
    pool: PgPool,
}

impl LeaveRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, leave: NewLeave<'_>) -> RepoResult<LeaveDetails> {
        let sql = format!(
            r#"
            WITH inserted AS (
                INSERT INTO leaves
                    (employee_id, manager_id, leave_type, start_date, end_date, days, reason)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                RETURNING *
            )
            {DETAILS_SELECT}
            FROM inserted l
            JOIN users e ON e.id = l.employee_id
            JOIN users m ON m.id = l.manager_id
            "#
        );
        let row = sqlx::query_as::<_, LeaveDetails>(&sql)
            .bind(leave.employee_id)
            .bind(leave.manager_id)
            .bind(leave.leave_type)
            .bind(leave.start_date)
            .bind(leave.end_date)
            .bind(leave.days)
            .bind(leave.reason)
            .fetch_one(&self.pool)
            .await?;

        Ok(row)
    }

    pub async fn get(&self, id: Uuid) -> RepoResult<Option<LeaveDetails>> {
        let sql = format!(
            r#"
            {DETAILS_SELECT}
            FROM leaves l
            JOIN users e ON e.id = l.employee_id
            JOIN users m ON m.id = l.manager_id
            WHERE l.id = $1
            "#
        );
        let row = sqlx::query_as::<_, LeaveDetails>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    pub async fn list_for_employee(&self, employee_id: Uuid) -> RepoResult<Vec<LeaveDetails>> {
        let sql = format!(
            r#"
            {DETAILS_SELECT}
            FROM leaves l
            JOIN users e ON e.id = l.employee_id
            JOIN users m ON m.id = l.manager_id
            WHERE l.employee_id = $1
            ORDER BY l.created_at DESC
            "#
        );
        let rows = sqlx::query_as::<_, LeaveDetails>(&sql)
            .bind(employee_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    pub async fn list_pending_for_manager(&self, manager_id: Uuid) -> RepoResult<Vec<LeaveDetails>> {
        let sql = format!(
            r#"
            {DETAILS_SELECT}
            FROM leaves l
            JOIN users e ON e.id = l.employee_id
            JOIN users m ON m.id = l.manager_id
            WHERE l.manager_id = $1 AND l.status = 'pending'
            ORDER BY l.created_at ASC
            "#
        );
        let rows = sqlx::query_as::<_, LeaveDetails>(&sql)
            .bind(manager_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    /// Move a pending request to `status`. `None` when it is missing or no longer pending.
    pub async fn decide(
        &self,
        id: Uuid,
        status: &str,
        now: DateTime<Utc>,
    ) -> RepoResult<Option<LeaveDetails>> {
        let sql = format!(
            r#"
            WITH updated AS (
                UPDATE leaves
                SET status = $2, decided_at = $3, updated_at = $3
                WHERE id = $1 AND status = 'pending'
                RETURNING *
            )
            {DETAILS_SELECT}
            FROM updated l
            JOIN users e ON e.id = l.employee_id
            JOIN users m ON m.id = l.manager_id
            "#
        );
        let row = sqlx::query_as::<_, LeaveDetails>(&sql)
            .bind(id)
            .bind(status)
            .bind(now)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }
}

/// Inclusive number of calendar days between two dates.
pub fn inclusive_days(start: NaiveDate, end: NaiveDate) -> Option<i32> {
    let days = (end - start).num_days() + 1;
    if days < 1 {
        return None;
    }
    i32::try_from(days).ok()
}

#[cfg(test)]
pub(crate) fn sample_details() -> LeaveDetails {
    LeaveDetails {
        id: Uuid::new_v4(),
        employee_id: Uuid::new_v4(),
        employee_name: "Dana Ortiz".into(),
        employee_email: "dana@example.com".into(),
        employee_department: None,
        manager_id: Uuid::new_v4(),
        manager_name: "Sam Lee".into(),
        manager_email: "sam@example.com".into(),
        leave_type: "Annual".into(),
        start_date: NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
        end_date: NaiveDate::from_ymd_opt(2025, 3, 12).unwrap(),
        days: 3,
        reason: Some("Family <trip>".into()),
        status: STATUS_PENDING.into(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
        decided_at: None,
    }
}
