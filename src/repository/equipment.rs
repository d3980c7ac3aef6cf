//! Equipment repository for database operations

use sqlx::{FromRow, Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{DistrictEquipmentType, Equipment, EquipmentStatus, EquipmentType, LocalArea},
};

#[derive(FromRow)]
struct EquipmentRow {
    id: i32,
    local_area_id: i32,
    district_equipment_type_id: i32,
    block_number: Option<i32>,
    number_in_block: Option<i32>,
    seniority: Option<f32>,
    status: String,
}

impl TryFrom<EquipmentRow> for Equipment {
    type Error = AppError;

    fn try_from(row: EquipmentRow) -> Result<Self, Self::Error> {
        Ok(Equipment {
            id: row.id,
            local_area_id: row.local_area_id,
            district_equipment_type_id: row.district_equipment_type_id,
            block_number: row.block_number,
            number_in_block: row.number_in_block,
            seniority: row.seniority,
            status: row.status.parse().map_err(AppError::Internal)?,
        })
    }
}

#[derive(FromRow)]
struct DistrictEquipmentTypeRow {
    id: i32,
    name: String,
    equipment_type_id: Option<i32>,
    equipment_type_name: Option<String>,
    is_dump_truck: Option<bool>,
}

impl From<DistrictEquipmentTypeRow> for DistrictEquipmentType {
    fn from(row: DistrictEquipmentTypeRow) -> Self {
        let equipment_type = match (row.equipment_type_id, row.equipment_type_name) {
            (Some(id), Some(name)) => Some(EquipmentType {
                id,
                name,
                is_dump_truck: row.is_dump_truck.unwrap_or(false),
            }),
            _ => None,
        };

        DistrictEquipmentType {
            id: row.id,
            name: row.name,
            equipment_type,
        }
    }
}

const EQUIPMENT_COLUMNS: &str = "id, local_area_id, district_equipment_type_id, block_number, \
                                 number_in_block, seniority, status";

#[derive(Clone)]
pub struct EquipmentRepository {
    pool: Pool<Postgres>,
}

impl EquipmentRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get a local area by ID
    pub async fn get_local_area(&self, id: i32) -> AppResult<Option<LocalArea>> {
        let row = sqlx::query_as::<_, (i32, i32, String)>(
            "SELECT id, local_area_number, name FROM local_areas WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(id, local_area_number, name)| LocalArea {
            id,
            local_area_number,
            name,
        }))
    }

    /// Get a district equipment type, resolving its provincial equipment type
    pub async fn get_district_type(
        &self,
        id: i32,
    ) -> AppResult<Option<DistrictEquipmentType>> {
        let row = sqlx::query_as::<_, DistrictEquipmentTypeRow>(
            r#"
            SELECT det.id, det.name,
                   et.id AS equipment_type_id,
                   et.name AS equipment_type_name,
                   et.is_dump_truck
            FROM district_equipment_types det
            LEFT JOIN equipment_types et ON et.id = det.equipment_type_id
            WHERE det.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Approved equipment of one seniority block, ordered by position in block
    pub async fn list_block(
        &self,
        local_area_id: i32,
        district_equipment_type_id: i32,
        block_number: i32,
    ) -> AppResult<Vec<Equipment>> {
        let query = format!(
            r#"
            SELECT {} FROM equipment
            WHERE local_area_id = $1
              AND district_equipment_type_id = $2
              AND block_number = $3
              AND LOWER(status) = LOWER($4)
            ORDER BY number_in_block, id
            "#,
            EQUIPMENT_COLUMNS
        );

        sqlx::query_as::<_, EquipmentRow>(&query)
            .bind(local_area_id)
            .bind(district_equipment_type_id)
            .bind(block_number)
            .bind(EquipmentStatus::Approved.as_str())
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Equipment::try_from)
            .collect()
    }
}
