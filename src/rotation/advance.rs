//! "Ask next" resolution on an existing rotation list

use crate::models::{BlockSlot, RotationListEntry};

/// Where an entry stands in the offer flow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    /// Answered yes or no
    Resolved,
    /// Hired by administrative override, no answer recorded
    ForceHired,
    /// Still waiting to be asked or to answer
    AwaitingResponse,
}

pub fn classify(entry: &RotationListEntry) -> EntryState {
    if entry.offer_response.is_some() {
        EntryState::Resolved
    } else if entry.is_force_hire() {
        EntryState::ForceHired
    } else {
        EntryState::AwaitingResponse
    }
}

/// Next entry to offer work to.
///
/// Scans the list in sort order from just after `current` (the equipment the
/// area pointer names) for the first entry still awaiting a response. With no
/// pointer, a pointer not on this list, or nothing left after it, the
/// sort-order-1 entry is returned.
pub fn next_to_ask(list: &[RotationListEntry], current: Option<i32>) -> Option<&RotationListEntry> {
    let mut sorted: Vec<&RotationListEntry> = list.iter().collect();
    sorted.sort_by_key(|e| e.rotation_list_sort_order);

    let first = sorted.first().copied()?;

    let Some(current) = current else {
        return Some(first);
    };

    let next = sorted
        .iter()
        .position(|e| e.equipment_id == current)
        .and_then(|pos| {
            sorted[pos + 1..]
                .iter()
                .find(|e| classify(e) == EntryState::AwaitingResponse)
                .copied()
        });

    Some(next.unwrap_or(first))
}

/// Pointer slot for an entry, given the numbered block count
pub fn slot_for(entry: &RotationListEntry, total_blocks: i32) -> BlockSlot {
    BlockSlot::classify(entry.block_number, total_blocks)
}

/// "Yes" responses plus force hires, each entry counted once
pub fn hired_count(list: &[RotationListEntry]) -> i32 {
    list.iter().filter(|e| e.is_hired()).count() as i32
}
