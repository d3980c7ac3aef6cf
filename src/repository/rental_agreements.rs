//! Rental agreements repository for database operations

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection, Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{CreateRentalAgreement, RentalAgreement, RentalAgreementStatus},
};

#[derive(FromRow)]
struct RentalAgreementRow {
    id: i32,
    number: String,
    equipment_id: i32,
    project_id: Option<i32>,
    status: String,
    dated_on: DateTime<Utc>,
    estimate_hours: Option<i32>,
    estimate_start_work: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<RentalAgreementRow> for RentalAgreement {
    type Error = AppError;

    fn try_from(row: RentalAgreementRow) -> Result<Self, Self::Error> {
        Ok(RentalAgreement {
            id: row.id,
            number: row.number,
            equipment_id: row.equipment_id,
            project_id: row.project_id,
            status: row.status.parse().map_err(AppError::Internal)?,
            dated_on: row.dated_on,
            estimate_hours: row.estimate_hours,
            estimate_start_work: row.estimate_start_work,
            created_at: row.created_at,
        })
    }
}

#[derive(Clone)]
pub struct RentalAgreementsRepository {
    pool: Pool<Postgres>,
}

impl RentalAgreementsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Whether the equipment is currently working under an active agreement
    pub async fn has_active(&self, equipment_id: i32) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM rental_agreements WHERE equipment_id = $1 AND LOWER(status) = LOWER($2))",
        )
        .bind(equipment_id)
        .bind(RentalAgreementStatus::Active.as_str())
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    /// Count agreements for equipment registered in a local area since a date
    pub async fn count_in_area_since(
        &self,
        local_area_id: i32,
        since: DateTime<Utc>,
    ) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM rental_agreements ra
            JOIN equipment e ON e.id = ra.equipment_id
            WHERE e.local_area_id = $1 AND ra.created_at >= $2
            "#,
        )
        .bind(local_area_id)
        .bind(since)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    /// Create a rental agreement. A number already in use is a `Conflict`.
    pub async fn create(
        conn: &mut PgConnection,
        data: &CreateRentalAgreement,
    ) -> AppResult<RentalAgreement> {
        let row = sqlx::query_as::<_, RentalAgreementRow>(
            r#"
            INSERT INTO rental_agreements
                (number, equipment_id, project_id, status, dated_on, estimate_hours, estimate_start_work)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, number, equipment_id, project_id, status, dated_on,
                      estimate_hours, estimate_start_work, created_at
            "#,
        )
        .bind(&data.number)
        .bind(data.equipment_id)
        .bind(data.project_id)
        .bind(data.status.as_str())
        .bind(data.dated_on)
        .bind(data.estimate_hours)
        .bind(data.estimate_start_work)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => AppError::Conflict(format!(
                "Rental agreement number {} is already in use",
                data.number
            )),
            e => e.into(),
        })?;

        row.try_into()
    }
}
