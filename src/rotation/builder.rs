//! Rotation list construction
//!
//! Blocks are concatenated in block order. Sort order is one running counter
//! over the whole list, starting at 1; nothing is shuffled here.

use crate::models::{Equipment, NewRotationListEntry};

/// Approved, available equipment of one block, as fetched from the store
#[derive(Debug, Clone)]
pub struct BlockRoster {
    pub block_number: i32,
    pub equipment: Vec<Equipment>,
}

/// Concatenate block rosters into a new rotation list
pub fn assemble(mut rosters: Vec<BlockRoster>) -> Vec<NewRotationListEntry> {
    rosters.sort_by_key(|roster| roster.block_number);

    let mut sort_order = 0;
    let mut list = Vec::new();

    for mut roster in rosters {
        // Stable: equal or missing positions keep store order
        roster
            .equipment
            .sort_by_key(|e| e.number_in_block.unwrap_or(i32::MAX));

        for equipment in roster.equipment {
            sort_order += 1;
            list.push(NewRotationListEntry {
                equipment_id: equipment.id,
                block_number: roster.block_number,
                seniority: equipment.seniority,
                rotation_list_sort_order: sort_order,
            });
        }
    }

    list
}
