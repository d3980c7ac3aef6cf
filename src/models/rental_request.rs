//! Rental request model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::enums::RentalRequestStatus;
use super::rotation_list::RotationListEntry;

/// Rental request record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RentalRequest {
    pub id: i32,
    pub local_area_id: i32,
    pub district_equipment_type_id: i32,
    pub project_id: Option<i32>,
    /// Number of pieces of equipment requested
    pub equipment_count: i32,
    pub status: RentalRequestStatus,
    /// Equipment id to contact first; cleared once the request is complete
    pub first_on_rotation_list_id: Option<i32>,
    pub expected_hours: Option<i32>,
    pub expected_start_date: Option<DateTime<Utc>>,
    pub expected_end_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub concurrency_control_number: i32,
}

impl RentalRequest {
    pub fn is_in_progress(&self) -> bool {
        self.status == RentalRequestStatus::InProgress
    }
}

/// Create rental request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateRentalRequest {
    pub local_area_id: i32,
    pub district_equipment_type_id: i32,
    pub project_id: Option<i32>,
    #[validate(range(min = 1, message = "At least one piece of equipment must be requested"))]
    pub equipment_count: i32,
    #[validate(range(min = 0, message = "Expected hours cannot be negative"))]
    pub expected_hours: Option<i32>,
    pub expected_start_date: Option<DateTime<Utc>>,
    pub expected_end_date: Option<DateTime<Utc>>,
}

/// Update rental request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateRentalRequest {
    #[validate(range(min = 1, message = "At least one piece of equipment must be requested"))]
    pub equipment_count: i32,
    #[validate(range(min = 0, message = "Expected hours cannot be negative"))]
    pub expected_hours: Option<i32>,
    pub expected_start_date: Option<DateTime<Utc>>,
    pub expected_end_date: Option<DateTime<Utc>>,
}

/// Rental request search filter
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RentalRequestQuery {
    /// Restrict to these local areas (empty = all)
    #[serde(default)]
    pub local_areas: Vec<i32>,
    pub district_equipment_type_id: Option<i32>,
    pub status: Option<RentalRequestStatus>,
    /// Expected start on or after
    pub start_date: Option<DateTime<Utc>>,
    /// Expected start on or before
    pub end_date: Option<DateTime<Utc>>,
    /// Case-insensitive fragment of the project name
    pub project: Option<String>,
}

impl RentalRequestQuery {
    /// `project_name` is the name of the request's project, if it has one
    pub fn matches(&self, request: &RentalRequest, project_name: Option<&str>) -> bool {
        if !self.local_areas.is_empty() && !self.local_areas.contains(&request.local_area_id) {
            return false;
        }
        if let Some(type_id) = self.district_equipment_type_id {
            if request.district_equipment_type_id != type_id {
                return false;
            }
        }
        if let Some(status) = self.status {
            if request.status != status {
                return false;
            }
        }
        if let Some(start) = self.start_date {
            if !matches!(request.expected_start_date, Some(d) if d >= start) {
                return false;
            }
        }
        if let Some(end) = self.end_date {
            if !matches!(request.expected_start_date, Some(d) if d <= end) {
                return false;
            }
        }
        if let Some(fragment) = &self.project {
            let fragment = fragment.to_lowercase();
            if !project_name.is_some_and(|name| name.to_lowercase().contains(&fragment)) {
                return false;
            }
        }
        true
    }
}

/// Document attached to a rental request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RentalRequestAttachment {
    pub id: i32,
    pub rental_request_id: i32,
    /// File name
    pub attachment: String,
}

/// Rental request with its rotation list, as rendered to users
#[derive(Debug, Clone, Serialize)]
pub struct RentalRequestDetails {
    pub request: RentalRequest,
    /// Sorted by rotation list sort order
    pub rotation_list: Vec<RotationListEntry>,
    /// "Yes" responses plus force hires
    pub yes_count: i32,
    /// Seniority blocks including the open block
    pub number_of_blocks: i32,
}
