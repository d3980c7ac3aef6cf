//! Equipment, local area and equipment type records

use serde::{Deserialize, Serialize};

use super::enums::EquipmentStatus;

/// A registered piece of equipment, reduced to the fields the rotation engine reads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Equipment {
    pub id: i32,
    pub local_area_id: i32,
    pub district_equipment_type_id: i32,
    /// Seniority block (1, 2, ...). The open block is `total_blocks + 1`.
    pub block_number: Option<i32>,
    /// Position within the block
    pub number_in_block: Option<i32>,
    pub seniority: Option<f32>,
    pub status: EquipmentStatus,
}

/// Geographic administrative unit equipment registers under
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalArea {
    pub id: i32,
    /// Number printed in rental agreement numbers
    pub local_area_number: i32,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquipmentType {
    pub id: i32,
    pub name: String,
    pub is_dump_truck: bool,
}

/// District-specific equipment type with its resolved provincial type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistrictEquipmentType {
    pub id: i32,
    pub name: String,
    /// `None` when the provincial equipment type could not be resolved
    pub equipment_type: Option<EquipmentType>,
}
