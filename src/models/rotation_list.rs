//! Rental request rotation list entries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::OfferResponse;
use super::local_area_rotation_list::LocalAreaRotationList;
use super::rental_agreement::CreateRentalAgreement;
use super::rental_request::RentalRequest;

/// One (request, equipment) pairing on a rotation list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RotationListEntry {
    pub id: i32,
    pub rental_request_id: i32,
    pub equipment_id: i32,
    /// Call-out sequence within the request, starting at 1
    pub rotation_list_sort_order: i32,
    pub is_force_hire: Option<bool>,
    pub was_asked: Option<bool>,
    pub asked_date_time: Option<DateTime<Utc>>,
    pub offer_response: Option<OfferResponse>,
    pub offer_response_datetime: Option<DateTime<Utc>>,
    pub offer_refusal_reason: Option<String>,
    pub offer_response_note: Option<String>,
    pub note: Option<String>,
    pub rental_agreement_id: Option<i32>,
    /// Joined from the equipment record
    pub block_number: Option<i32>,
    /// Joined from the equipment record
    pub seniority: Option<f32>,
}

impl RotationListEntry {
    pub fn is_force_hire(&self) -> bool {
        self.is_force_hire == Some(true)
    }

    /// Accepted or force hired
    pub fn is_hired(&self) -> bool {
        self.offer_response == Some(OfferResponse::Yes) || self.is_force_hire()
    }
}

/// Entry produced by list construction, before it is persisted
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewRotationListEntry {
    pub equipment_id: i32,
    pub block_number: i32,
    pub seniority: Option<f32>,
    pub rotation_list_sort_order: i32,
}

/// Outcome recorded against a rotation list entry
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateRotationListEntry {
    pub id: i32,
    pub is_force_hire: Option<bool>,
    pub was_asked: Option<bool>,
    pub asked_date_time: Option<DateTime<Utc>>,
    pub offer_response: Option<OfferResponse>,
    pub offer_response_datetime: Option<DateTime<Utc>>,
    pub offer_refusal_reason: Option<String>,
    pub offer_response_note: Option<String>,
    pub note: Option<String>,
}

impl UpdateRotationListEntry {
    /// Whether this outcome hires the equipment
    pub fn hires(&self) -> bool {
        self.is_force_hire == Some(true) || self.offer_response == Some(OfferResponse::Yes)
    }

    pub fn apply_to(&self, entry: &mut RotationListEntry) {
        entry.is_force_hire = self.is_force_hire;
        entry.was_asked = self.was_asked;
        entry.asked_date_time = self.asked_date_time;
        entry.offer_response = self.offer_response;
        entry.offer_response_datetime = self.offer_response_datetime;
        entry.offer_refusal_reason = self.offer_refusal_reason.clone();
        entry.offer_response_note = self.offer_response_note.clone();
        entry.note = self.note.clone();
    }
}

/// A freshly built rotation list, stored together with its first-on equipment and pointer
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RotationListPlan {
    /// Replaces every existing entry of the request
    pub entries: Vec<NewRotationListEntry>,
    pub first_on_rotation_list_id: Option<i32>,
    /// Ask-next pointer of the request's (local area, equipment type) pair
    pub pointer: Option<LocalAreaRotationList>,
}

/// Writes caused by one offer outcome; stored together or not at all
#[derive(Debug, Clone)]
pub struct OfferOutcome {
    pub entry: RotationListEntry,
    /// Agreement to create and link to `entry`
    pub agreement: Option<CreateRentalAgreement>,
    /// The request, when this outcome completed it
    pub completed_request: Option<RentalRequest>,
    pub pointer: Option<LocalAreaRotationList>,
}
