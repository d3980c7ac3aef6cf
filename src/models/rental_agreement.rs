//! Rental agreement model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::RentalAgreementStatus;

/// Rental agreement created when equipment is hired off a rotation list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RentalAgreement {
    pub id: i32,
    /// `{fiscalYear}-{localAreaNumber}-{sequence:04}`
    pub number: String,
    pub equipment_id: i32,
    pub project_id: Option<i32>,
    pub status: RentalAgreementStatus,
    pub dated_on: DateTime<Utc>,
    pub estimate_hours: Option<i32>,
    pub estimate_start_work: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Create rental agreement
#[derive(Debug, Clone)]
pub struct CreateRentalAgreement {
    pub number: String,
    pub equipment_id: i32,
    pub project_id: Option<i32>,
    pub status: RentalAgreementStatus,
    pub dated_on: DateTime<Utc>,
    pub estimate_hours: Option<i32>,
    pub estimate_start_work: Option<DateTime<Utc>>,
}
