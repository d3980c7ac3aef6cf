//! Shared domain enums (stored as text in the HETS schema)

use serde::{Deserialize, Serialize};
use std::str::FromStr;

// ---------------------------------------------------------------------------
// RentalRequestStatus
// ---------------------------------------------------------------------------

/// Rental request status. Cancellation deletes the request, so it has no variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RentalRequestStatus {
    New,
    #[serde(rename = "In Progress")]
    InProgress,
    Complete,
}

impl RentalRequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RentalRequestStatus::New => "New",
            RentalRequestStatus::InProgress => "In Progress",
            RentalRequestStatus::Complete => "Complete",
        }
    }
}

impl FromStr for RentalRequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "new" => Ok(RentalRequestStatus::New),
            "in progress" => Ok(RentalRequestStatus::InProgress),
            "complete" => Ok(RentalRequestStatus::Complete),
            other => Err(format!("unknown rental request status '{}'", other)),
        }
    }
}

impl std::fmt::Display for RentalRequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// EquipmentStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EquipmentStatus {
    Approved,
    Pending,
    Archived,
}

impl EquipmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EquipmentStatus::Approved => "Approved",
            EquipmentStatus::Pending => "Pending",
            EquipmentStatus::Archived => "Archived",
        }
    }
}

impl FromStr for EquipmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "approved" => Ok(EquipmentStatus::Approved),
            "pending" => Ok(EquipmentStatus::Pending),
            "archived" => Ok(EquipmentStatus::Archived),
            other => Err(format!("unknown equipment status '{}'", other)),
        }
    }
}

// ---------------------------------------------------------------------------
// RentalAgreementStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RentalAgreementStatus {
    Active,
    Complete,
}

impl RentalAgreementStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RentalAgreementStatus::Active => "Active",
            RentalAgreementStatus::Complete => "Complete",
        }
    }
}

impl FromStr for RentalAgreementStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(RentalAgreementStatus::Active),
            "complete" => Ok(RentalAgreementStatus::Complete),
            other => Err(format!("unknown rental agreement status '{}'", other)),
        }
    }
}

// ---------------------------------------------------------------------------
// OfferResponse
// ---------------------------------------------------------------------------

/// Owner's answer to an offer of work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OfferResponse {
    Yes,
    No,
}

impl OfferResponse {
    pub fn as_str(&self) -> &'static str {
        match self {
            OfferResponse::Yes => "Yes",
            OfferResponse::No => "No",
        }
    }

    /// Lenient parse of a stored response: anything but yes/no counts as unanswered.
    pub fn parse_stored(value: Option<&str>) -> Option<Self> {
        match value.map(|v| v.trim().to_ascii_lowercase()) {
            Some(v) if v == "yes" => Some(OfferResponse::Yes),
            Some(v) if v == "no" => Some(OfferResponse::No),
            _ => None,
        }
    }
}
