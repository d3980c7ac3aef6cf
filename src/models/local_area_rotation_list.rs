//! Per-area "ask next" pointer for a district equipment type

use serde::{Deserialize, Serialize};

/// Which of the three pointer slots a block maps to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockSlot {
    Block1,
    Block2,
    Open,
}

impl BlockSlot {
    /// Classify an equipment block number against the configured block count.
    /// Anything outside the numbered blocks (including a missing number) is the open block.
    pub fn classify(block_number: Option<i32>, total_blocks: i32) -> Self {
        match block_number {
            Some(1) if total_blocks >= 1 => BlockSlot::Block1,
            Some(2) if total_blocks >= 2 => BlockSlot::Block2,
            _ => BlockSlot::Open,
        }
    }
}

/// The single populated pointer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AskNext {
    pub slot: BlockSlot,
    pub equipment_id: i32,
    pub seniority: Option<f32>,
}

/// Nullable column pair as stored for one slot
pub type SlotColumns = (Option<i32>, Option<f32>);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalAreaRotationList {
    /// 0 until persisted
    pub id: i32,
    pub local_area_id: i32,
    pub district_equipment_type_id: i32,
    pub ask_next: Option<AskNext>,
    pub concurrency_control_number: i32,
}

impl LocalAreaRotationList {
    pub fn new(local_area_id: i32, district_equipment_type_id: i32) -> Self {
        Self {
            id: 0,
            local_area_id,
            district_equipment_type_id,
            ask_next: None,
            concurrency_control_number: 0,
        }
    }

    /// Point at `equipment_id`, clearing the other two slots
    pub fn set_next(&mut self, slot: BlockSlot, equipment_id: i32, seniority: Option<f32>) {
        self.ask_next = Some(AskNext {
            slot,
            equipment_id,
            seniority,
        });
    }

    pub fn next_equipment_id(&self) -> Option<i32> {
        self.ask_next.map(|next| next.equipment_id)
    }

    /// Split into (block 1, block 2, open) column pairs; at most one is populated
    pub fn to_columns(&self) -> (SlotColumns, SlotColumns, SlotColumns) {
        let mut block1 = (None, None);
        let mut block2 = (None, None);
        let mut open = (None, None);

        if let Some(next) = self.ask_next {
            let pair = (Some(next.equipment_id), next.seniority);
            match next.slot {
                BlockSlot::Block1 => block1 = pair,
                BlockSlot::Block2 => block2 = pair,
                BlockSlot::Open => open = pair,
            }
        }

        (block1, block2, open)
    }

    /// Rebuild the pointer from stored columns. Block 1 wins over block 2, which wins over open.
    pub fn ask_next_from_columns(
        block1: SlotColumns,
        block2: SlotColumns,
        open: SlotColumns,
    ) -> Option<AskNext> {
        [
            (BlockSlot::Block1, block1),
            (BlockSlot::Block2, block2),
            (BlockSlot::Open, open),
        ]
        .into_iter()
        .find_map(|(slot, (id, seniority))| {
            id.map(|equipment_id| AskNext {
                slot,
                equipment_id,
                seniority,
            })
        })
    }
}
