//! Local area rotation list (ask-next pointer) repository

use sqlx::{FromRow, PgConnection, Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::LocalAreaRotationList,
};

#[derive(FromRow)]
struct LocalAreaRotationListRow {
    id: i32,
    local_area_id: i32,
    district_equipment_type_id: i32,
    ask_next_block1_id: Option<i32>,
    ask_next_block1_seniority: Option<f32>,
    ask_next_block2_id: Option<i32>,
    ask_next_block2_seniority: Option<f32>,
    ask_next_block_open_id: Option<i32>,
    ask_next_block_open_seniority: Option<f32>,
    concurrency_control_number: i32,
}

impl From<LocalAreaRotationListRow> for LocalAreaRotationList {
    fn from(row: LocalAreaRotationListRow) -> Self {
        LocalAreaRotationList {
            id: row.id,
            local_area_id: row.local_area_id,
            district_equipment_type_id: row.district_equipment_type_id,
            ask_next: LocalAreaRotationList::ask_next_from_columns(
                (row.ask_next_block1_id, row.ask_next_block1_seniority),
                (row.ask_next_block2_id, row.ask_next_block2_seniority),
                (row.ask_next_block_open_id, row.ask_next_block_open_seniority),
            ),
            concurrency_control_number: row.concurrency_control_number,
        }
    }
}

const POINTER_COLUMNS: &str = "id, local_area_id, district_equipment_type_id, \
                               ask_next_block1_id, ask_next_block1_seniority, \
                               ask_next_block2_id, ask_next_block2_seniority, \
                               ask_next_block_open_id, ask_next_block_open_seniority, \
                               concurrency_control_number";

#[derive(Clone)]
pub struct LocalAreaRotationListsRepository {
    pool: Pool<Postgres>,
}

impl LocalAreaRotationListsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Pointer for a local area and district equipment type
    pub async fn get(
        &self,
        local_area_id: i32,
        district_equipment_type_id: i32,
    ) -> AppResult<Option<LocalAreaRotationList>> {
        let query = format!(
            "SELECT {} FROM local_area_rotation_lists \
             WHERE local_area_id = $1 AND district_equipment_type_id = $2",
            POINTER_COLUMNS
        );

        let row = sqlx::query_as::<_, LocalAreaRotationListRow>(&query)
            .bind(local_area_id)
            .bind(district_equipment_type_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Into::into))
    }

    /// Insert a new pointer or update an existing one
    pub async fn save(
        conn: &mut PgConnection,
        list: &LocalAreaRotationList,
    ) -> AppResult<LocalAreaRotationList> {
        let (block1, block2, open) = list.to_columns();

        let row = if list.id == 0 {
            let query = format!(
                r#"
                INSERT INTO local_area_rotation_lists
                    (local_area_id, district_equipment_type_id,
                     ask_next_block1_id, ask_next_block1_seniority,
                     ask_next_block2_id, ask_next_block2_seniority,
                     ask_next_block_open_id, ask_next_block_open_seniority)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                ON CONFLICT (local_area_id, district_equipment_type_id) DO UPDATE SET
                    ask_next_block1_id = EXCLUDED.ask_next_block1_id,
                    ask_next_block1_seniority = EXCLUDED.ask_next_block1_seniority,
                    ask_next_block2_id = EXCLUDED.ask_next_block2_id,
                    ask_next_block2_seniority = EXCLUDED.ask_next_block2_seniority,
                    ask_next_block_open_id = EXCLUDED.ask_next_block_open_id,
                    ask_next_block_open_seniority = EXCLUDED.ask_next_block_open_seniority,
                    concurrency_control_number = local_area_rotation_lists.concurrency_control_number + 1
                RETURNING {}
                "#,
                POINTER_COLUMNS
            );

            sqlx::query_as::<_, LocalAreaRotationListRow>(&query)
                .bind(list.local_area_id)
                .bind(list.district_equipment_type_id)
                .bind(block1.0)
                .bind(block1.1)
                .bind(block2.0)
                .bind(block2.1)
                .bind(open.0)
                .bind(open.1)
                .fetch_optional(&mut *conn)
                .await?
        } else {
            let query = format!(
                r#"
                UPDATE local_area_rotation_lists SET
                    ask_next_block1_id = $3,
                    ask_next_block1_seniority = $4,
                    ask_next_block2_id = $5,
                    ask_next_block2_seniority = $6,
                    ask_next_block_open_id = $7,
                    ask_next_block_open_seniority = $8,
                    concurrency_control_number = concurrency_control_number + 1
                WHERE id = $1 AND concurrency_control_number = $2
                RETURNING {}
                "#,
                POINTER_COLUMNS
            );

            sqlx::query_as::<_, LocalAreaRotationListRow>(&query)
                .bind(list.id)
                .bind(list.concurrency_control_number)
                .bind(block1.0)
                .bind(block1.1)
                .bind(block2.0)
                .bind(block2.1)
                .bind(open.0)
                .bind(open.1)
                .fetch_optional(&mut *conn)
                .await?
        };

        row.map(Into::into).ok_or_else(|| {
            AppError::Conflict(format!(
                "Rotation list for local area {} was modified by another user",
                list.local_area_id
            ))
        })
    }
}
