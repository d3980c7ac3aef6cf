//! New-list setup: continue the rotation from the previous request of the fiscal year
//!
//! Each block of the new list restarts at the first piece of equipment the
//! previous request never got an answer from. A block whose previous entries
//! were all answered restarts at its first entry again. The list is then
//! renumbered block by block, wrapping inside each block.

use crate::models::{NewRotationListEntry, RotationListEntry};

/// Equipment chosen as first on the new list
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Continuation {
    pub equipment_id: i32,
    pub block_number: i32,
    pub seniority: Option<f32>,
}

/// Pick the continuation point and renumber `new_list` in place.
///
/// `previous` is the rotation list of the most recent prior request in the
/// same fiscal year, or `None` when this is the first one. On return the
/// list is sorted by its new sort order. Returns `None` for an empty list.
pub fn setup_new_rotation(
    new_list: &mut [NewRotationListEntry],
    previous: Option<&[RotationListEntry]>,
) -> Option<Continuation> {
    if new_list.is_empty() {
        return None;
    }
    new_list.sort_by_key(|e| e.rotation_list_sort_order);

    let Some(previous) = previous else {
        return Some(continuation_at(new_list, 0));
    };

    let mut prior: Vec<&RotationListEntry> = previous.iter().collect();
    prior.sort_by_key(|e| e.rotation_list_sort_order);

    let mut blocks: Vec<i32> = new_list.iter().map(|e| e.block_number).collect();
    blocks.sort_unstable();
    blocks.dedup();

    let starts: Vec<Option<usize>> = blocks
        .iter()
        .map(|&block| block_continuation(block, &prior, new_list))
        .collect();

    // The lowest block present in the new list leads; unset falls back to the first entry
    let start_index = starts[0].unwrap_or(0);
    let continuation = continuation_at(new_list, start_index);

    tracing::debug!(
        equipment_id = continuation.equipment_id,
        block = continuation.block_number,
        "Rotation continues from previous request"
    );

    let mut sort_order = 0;
    for (pos, &block) in blocks.iter().enumerate() {
        let from = if pos == 0 {
            start_index
        } else {
            starts[pos].unwrap_or(0)
        };

        let members: Vec<usize> = (0..new_list.len())
            .filter(|&i| new_list[i].block_number == block)
            .collect();
        let rotated: Vec<usize> = members
            .iter()
            .copied()
            .filter(|&i| i >= from)
            .chain(members.iter().copied().filter(|&i| i < from))
            .collect();

        for i in rotated {
            sort_order += 1;
            new_list[i].rotation_list_sort_order = sort_order;
        }
    }

    new_list.sort_by_key(|e| e.rotation_list_sort_order);
    Some(continuation)
}

/// Index in `new_list` where `block` should restart, if the previous list says so
fn block_continuation(
    block: i32,
    prior: &[&RotationListEntry],
    new_list: &[NewRotationListEntry],
) -> Option<usize> {
    let new_block_size = new_list.iter().filter(|e| e.block_number == block).count();

    let mut seen = 0;
    let mut first: Option<&RotationListEntry> = None;
    let mut wrap = None;

    for &entry in prior.iter().filter(|e| e.block_number == Some(block)) {
        seen += 1;
        let first = *first.get_or_insert(entry);

        // Answered either way: skip. Force hires without an answer are where we continue.
        if entry.offer_response.is_some() {
            if seen >= new_block_size && new_block_size > 1 {
                wrap = position_of(new_list, first.equipment_id);
            }
            continue;
        }

        if let Some(index) = position_of(new_list, entry.equipment_id) {
            return Some(index);
        }
    }

    wrap
}

fn position_of(new_list: &[NewRotationListEntry], equipment_id: i32) -> Option<usize> {
    new_list.iter().position(|e| e.equipment_id == equipment_id)
}

fn continuation_at(new_list: &[NewRotationListEntry], index: usize) -> Continuation {
    let entry = &new_list[index];
    Continuation {
        equipment_id: entry.equipment_id,
        block_number: entry.block_number,
        seniority: entry.seniority,
    }
}
