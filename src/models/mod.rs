//! Data models for HETS rotation lists

pub mod enums;
pub mod equipment;
pub mod local_area_rotation_list;
pub mod project;
pub mod rental_agreement;
pub mod rental_request;
pub mod rotation_list;

// Re-export commonly used types
pub use enums::{EquipmentStatus, OfferResponse, RentalAgreementStatus, RentalRequestStatus};
pub use equipment::{DistrictEquipmentType, Equipment, EquipmentType, LocalArea};
pub use local_area_rotation_list::{AskNext, BlockSlot, LocalAreaRotationList};
pub use project::Project;
pub use rental_agreement::{CreateRentalAgreement, RentalAgreement};
pub use rental_request::{
    CreateRentalRequest, RentalRequest, RentalRequestAttachment, RentalRequestDetails,
    RentalRequestQuery, UpdateRentalRequest,
};
pub use rotation_list::{
    NewRotationListEntry, OfferOutcome, RotationListEntry, RotationListPlan,
    UpdateRotationListEntry,
};
