//! Rental requests repository for database operations

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection, Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{
        CreateRentalRequest, RentalRequest, RentalRequestAttachment, RentalRequestQuery,
        RentalRequestStatus,
    },
};

#[derive(FromRow)]
struct RentalRequestRow {
    id: i32,
    local_area_id: i32,
    district_equipment_type_id: i32,
    project_id: Option<i32>,
    equipment_count: i32,
    status: String,
    first_on_rotation_list_id: Option<i32>,
    expected_hours: Option<i32>,
    expected_start_date: Option<DateTime<Utc>>,
    expected_end_date: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    concurrency_control_number: i32,
}

impl TryFrom<RentalRequestRow> for RentalRequest {
    type Error = AppError;

    fn try_from(row: RentalRequestRow) -> Result<Self, Self::Error> {
        Ok(RentalRequest {
            id: row.id,
            local_area_id: row.local_area_id,
            district_equipment_type_id: row.district_equipment_type_id,
            project_id: row.project_id,
            equipment_count: row.equipment_count,
            status: row.status.parse().map_err(AppError::Internal)?,
            first_on_rotation_list_id: row.first_on_rotation_list_id,
            expected_hours: row.expected_hours,
            expected_start_date: row.expected_start_date,
            expected_end_date: row.expected_end_date,
            created_at: row.created_at,
            concurrency_control_number: row.concurrency_control_number,
        })
    }
}

#[derive(FromRow)]
struct AttachmentRow {
    id: i32,
    rental_request_id: i32,
    attachment: String,
}

impl From<AttachmentRow> for RentalRequestAttachment {
    fn from(row: AttachmentRow) -> Self {
        RentalRequestAttachment {
            id: row.id,
            rental_request_id: row.rental_request_id,
            attachment: row.attachment,
        }
    }
}

const REQUEST_COLUMNS: &str = "id, local_area_id, district_equipment_type_id, project_id, \
                               equipment_count, status, first_on_rotation_list_id, expected_hours, \
                               expected_start_date, expected_end_date, created_at, \
                               concurrency_control_number";

#[derive(Clone)]
pub struct RentalRequestsRepository {
    pool: Pool<Postgres>,
}

impl RentalRequestsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get rental request by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Option<RentalRequest>> {
        let query = format!("SELECT {} FROM rental_requests WHERE id = $1", REQUEST_COLUMNS);
        sqlx::query_as::<_, RentalRequestRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(RentalRequest::try_from)
            .transpose()
    }

    /// Search rental requests
    pub async fn search(&self, filter: &RentalRequestQuery) -> AppResult<Vec<RentalRequest>> {
        let mut conditions = Vec::new();
        let mut idx = 1;

        if !filter.local_areas.is_empty() {
            conditions.push(format!("local_area_id = ANY(${})", idx));
            idx += 1;
        }
        if filter.district_equipment_type_id.is_some() {
            conditions.push(format!("district_equipment_type_id = ${}", idx));
            idx += 1;
        }
        if filter.status.is_some() {
            conditions.push(format!("LOWER(status) = LOWER(${})", idx));
            idx += 1;
        }
        if filter.start_date.is_some() {
            conditions.push(format!("expected_start_date >= ${}", idx));
            idx += 1;
        }
        if filter.end_date.is_some() {
            conditions.push(format!("expected_start_date <= ${}", idx));
            idx += 1;
        }
        if filter.project.is_some() {
            conditions.push(format!(
                "project_id IN (SELECT id FROM projects WHERE POSITION(LOWER(${}) IN LOWER(name)) > 0)",
                idx
            ));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let query = format!(
            "SELECT {} FROM rental_requests {} ORDER BY expected_start_date, id",
            REQUEST_COLUMNS, where_clause
        );

        let mut builder = sqlx::query_as::<_, RentalRequestRow>(&query);
        if !filter.local_areas.is_empty() {
            builder = builder.bind(filter.local_areas.clone());
        }
        if let Some(type_id) = filter.district_equipment_type_id {
            builder = builder.bind(type_id);
        }
        if let Some(status) = filter.status {
            builder = builder.bind(status.as_str());
        }
        if let Some(start) = filter.start_date {
            builder = builder.bind(start);
        }
        if let Some(end) = filter.end_date {
            builder = builder.bind(end);
        }
        if let Some(project) = &filter.project {
            builder = builder.bind(project);
        }

        builder
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(RentalRequest::try_from)
            .collect()
    }

    /// Most recent request for an area and equipment type created on or after `since`
    pub async fn latest_since(
        &self,
        local_area_id: i32,
        district_equipment_type_id: i32,
        since: DateTime<Utc>,
        before_id: Option<i32>,
    ) -> AppResult<Option<RentalRequest>> {
        let query = format!(
            r#"
            SELECT {} FROM rental_requests
            WHERE local_area_id = $1
              AND district_equipment_type_id = $2
              AND created_at >= $3
              AND ($4::INTEGER IS NULL OR id < $4)
            ORDER BY id DESC
            LIMIT 1
            "#,
            REQUEST_COLUMNS
        );

        sqlx::query_as::<_, RentalRequestRow>(&query)
            .bind(local_area_id)
            .bind(district_equipment_type_id)
            .bind(since)
            .bind(before_id)
            .fetch_optional(&self.pool)
            .await?
            .map(RentalRequest::try_from)
            .transpose()
    }

    /// Create a new rental request
    pub async fn create(
        conn: &mut PgConnection,
        data: &CreateRentalRequest,
        status: RentalRequestStatus,
        first_on_rotation_list_id: Option<i32>,
        created_at: DateTime<Utc>,
    ) -> AppResult<RentalRequest> {
        let query = format!(
            r#"
            INSERT INTO rental_requests
                (local_area_id, district_equipment_type_id, project_id, equipment_count, status,
                 first_on_rotation_list_id, expected_hours, expected_start_date,
                 expected_end_date, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {}
            "#,
            REQUEST_COLUMNS
        );

        let row = sqlx::query_as::<_, RentalRequestRow>(&query)
            .bind(data.local_area_id)
            .bind(data.district_equipment_type_id)
            .bind(data.project_id)
            .bind(data.equipment_count)
            .bind(status.as_str())
            .bind(first_on_rotation_list_id)
            .bind(data.expected_hours)
            .bind(data.expected_start_date)
            .bind(data.expected_end_date)
            .bind(created_at)
            .fetch_one(&mut *conn)
            .await?;

        row.try_into()
    }

    /// Update a rental request, guarded by its concurrency control number
    pub async fn update(conn: &mut PgConnection, request: &RentalRequest) -> AppResult<RentalRequest> {
        let query = format!(
            r#"
            UPDATE rental_requests SET
                project_id = $3,
                equipment_count = $4,
                status = $5,
                first_on_rotation_list_id = $6,
                expected_hours = $7,
                expected_start_date = $8,
                expected_end_date = $9,
                concurrency_control_number = concurrency_control_number + 1
            WHERE id = $1 AND concurrency_control_number = $2
            RETURNING {}
            "#,
            REQUEST_COLUMNS
        );

        let row = sqlx::query_as::<_, RentalRequestRow>(&query)
            .bind(request.id)
            .bind(request.concurrency_control_number)
            .bind(request.project_id)
            .bind(request.equipment_count)
            .bind(request.status.as_str())
            .bind(request.first_on_rotation_list_id)
            .bind(request.expected_hours)
            .bind(request.expected_start_date)
            .bind(request.expected_end_date)
            .fetch_optional(&mut *conn)
            .await?;

        match row {
            Some(row) => row.try_into(),
            None => Err(AppError::Conflict(format!(
                "Rental request {} was modified by another user",
                request.id
            ))),
        }
    }

    /// Delete a rental request along with its rotation list and attachments
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM rental_request_attachments WHERE rental_request_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM rental_request_rotation_lists WHERE rental_request_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM rental_requests WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Rental request", id));
        }

        tx.commit().await?;
        Ok(())
    }

    /// Attachments of a rental request
    pub async fn attachments(&self, rental_request_id: i32) -> AppResult<Vec<RentalRequestAttachment>> {
        let rows = sqlx::query_as::<_, AttachmentRow>(
            "SELECT id, rental_request_id, attachment FROM rental_request_attachments \
             WHERE rental_request_id = $1 ORDER BY id",
        )
        .bind(rental_request_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}
