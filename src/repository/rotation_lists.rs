//! Rental request rotation list repository for database operations

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection, Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{NewRotationListEntry, OfferResponse, RotationListEntry},
};

#[derive(FromRow)]
struct RotationListRow {
    id: i32,
    rental_request_id: i32,
    equipment_id: i32,
    rotation_list_sort_order: i32,
    is_force_hire: Option<bool>,
    was_asked: Option<bool>,
    asked_date_time: Option<DateTime<Utc>>,
    offer_response: Option<String>,
    offer_response_datetime: Option<DateTime<Utc>>,
    offer_refusal_reason: Option<String>,
    offer_response_note: Option<String>,
    note: Option<String>,
    rental_agreement_id: Option<i32>,
    block_number: Option<i32>,
    seniority: Option<f32>,
}

impl From<RotationListRow> for RotationListEntry {
    fn from(row: RotationListRow) -> Self {
        RotationListEntry {
            id: row.id,
            rental_request_id: row.rental_request_id,
            equipment_id: row.equipment_id,
            rotation_list_sort_order: row.rotation_list_sort_order,
            is_force_hire: row.is_force_hire,
            was_asked: row.was_asked,
            asked_date_time: row.asked_date_time,
            offer_response: OfferResponse::parse_stored(row.offer_response.as_deref()),
            offer_response_datetime: row.offer_response_datetime,
            offer_refusal_reason: row.offer_refusal_reason,
            offer_response_note: row.offer_response_note,
            note: row.note,
            rental_agreement_id: row.rental_agreement_id,
            block_number: row.block_number,
            seniority: row.seniority,
        }
    }
}

const ENTRY_SELECT: &str = r#"
    SELECT rl.id, rl.rental_request_id, rl.equipment_id, rl.rotation_list_sort_order,
           rl.is_force_hire, rl.was_asked, rl.asked_date_time, rl.offer_response,
           rl.offer_response_datetime, rl.offer_refusal_reason, rl.offer_response_note,
           rl.note, rl.rental_agreement_id, e.block_number, e.seniority
    FROM rental_request_rotation_lists rl
    JOIN equipment e ON e.id = rl.equipment_id
"#;

#[derive(Clone)]
pub struct RotationListsRepository {
    pool: Pool<Postgres>,
}

impl RotationListsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Entries of a request in call-out order
    pub async fn list_for_request(&self, rental_request_id: i32) -> AppResult<Vec<RotationListEntry>> {
        let query = format!(
            "{} WHERE rl.rental_request_id = $1 ORDER BY rl.rotation_list_sort_order, rl.id",
            ENTRY_SELECT
        );

        let rows = sqlx::query_as::<_, RotationListRow>(&query)
            .bind(rental_request_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Drop the request's entries and insert `entries` in their place
    pub async fn replace(
        conn: &mut PgConnection,
        rental_request_id: i32,
        entries: &[NewRotationListEntry],
    ) -> AppResult<()> {
        sqlx::query("DELETE FROM rental_request_rotation_lists WHERE rental_request_id = $1")
            .bind(rental_request_id)
            .execute(&mut *conn)
            .await?;

        for entry in entries {
            sqlx::query(
                r#"
                INSERT INTO rental_request_rotation_lists
                    (rental_request_id, equipment_id, rotation_list_sort_order)
                VALUES ($1, $2, $3)
                "#,
            )
            .bind(rental_request_id)
            .bind(entry.equipment_id)
            .bind(entry.rotation_list_sort_order)
            .execute(&mut *conn)
            .await?;
        }

        Ok(())
    }

    /// Persist the offer outcome fields of an entry
    pub async fn update(conn: &mut PgConnection, entry: &RotationListEntry) -> AppResult<RotationListEntry> {
        let result = sqlx::query(
            r#"
            UPDATE rental_request_rotation_lists SET
                is_force_hire = $2,
                was_asked = $3,
                asked_date_time = $4,
                offer_response = $5,
                offer_response_datetime = $6,
                offer_refusal_reason = $7,
                offer_response_note = $8,
                note = $9,
                rental_agreement_id = $10
            WHERE id = $1 AND rental_request_id = $11
            "#,
        )
        .bind(entry.id)
        .bind(entry.is_force_hire)
        .bind(entry.was_asked)
        .bind(entry.asked_date_time)
        .bind(entry.offer_response.map(|r| r.as_str()))
        .bind(entry.offer_response_datetime)
        .bind(&entry.offer_refusal_reason)
        .bind(&entry.offer_response_note)
        .bind(&entry.note)
        .bind(entry.rental_agreement_id)
        .bind(entry.rental_request_id)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Rotation list entry", entry.id));
        }

        let query = format!("{} WHERE rl.id = $1", ENTRY_SELECT);
        sqlx::query_as::<_, RotationListRow>(&query)
            .bind(entry.id)
            .fetch_optional(&mut *conn)
            .await?
            .map(Into::into)
            .ok_or_else(|| AppError::not_found("Rotation list entry", entry.id))
    }
}
