//! Store contract consumed by the rental request service

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    error::AppResult,
    models::{
        CreateRentalRequest, DistrictEquipmentType, Equipment, LocalArea, LocalAreaRotationList,
        OfferOutcome, RentalRequest, RentalRequestAttachment, RentalRequestQuery,
        RentalRequestStatus, RotationListEntry, RotationListPlan,
    },
};

/// Durable storage for rental requests, rotation lists, equipment and area pointers.
///
/// Every write method is a unit of work: it either stores all of its changes
/// or none of them. Pointer and request writes are optimistic and fail with
/// `Conflict` when the stored concurrency number moved.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RequestStore: Send + Sync {
    // ---- Reference data ----

    async fn get_local_area(&self, id: i32) -> AppResult<Option<LocalArea>>;

    /// District equipment type with its provincial type resolved when possible
    async fn get_district_equipment_type(&self, id: i32)
        -> AppResult<Option<DistrictEquipmentType>>;

    /// Approved equipment of one block, ordered by position in block
    async fn list_block_equipment(
        &self,
        local_area_id: i32,
        district_equipment_type_id: i32,
        block_number: i32,
    ) -> AppResult<Vec<Equipment>>;

    // ---- Rental agreements ----

    async fn has_active_agreement(&self, equipment_id: i32) -> AppResult<bool>;

    /// Agreements created for equipment of a local area since `since`
    async fn count_agreements_in_area_since(
        &self,
        local_area_id: i32,
        since: DateTime<Utc>,
    ) -> AppResult<i64>;

    // ---- Rental requests ----

    async fn get_rental_request(&self, id: i32) -> AppResult<Option<RentalRequest>>;

    async fn search_rental_requests(
        &self,
        query: &RentalRequestQuery,
    ) -> AppResult<Vec<RentalRequest>>;

    /// Most recently created request for the pair created at or after `since`.
    /// `before_id` restricts to requests created before that one.
    async fn latest_rental_request_since(
        &self,
        local_area_id: i32,
        district_equipment_type_id: i32,
        since: DateTime<Utc>,
        before_id: Option<i32>,
    ) -> AppResult<Option<RentalRequest>>;

    /// Insert a request together with its rotation list and pointer
    async fn create_rental_request(
        &self,
        data: &CreateRentalRequest,
        status: RentalRequestStatus,
        created_at: DateTime<Utc>,
        rotation: &RotationListPlan,
    ) -> AppResult<RentalRequest>;

    /// Optimistic update of the request record alone
    async fn update_rental_request(&self, request: &RentalRequest) -> AppResult<RentalRequest>;

    /// Delete a request with its rotation list and attachments
    async fn delete_rental_request(&self, id: i32) -> AppResult<()>;

    /// Attachments of a request, oldest first
    async fn rental_request_attachments(
        &self,
        rental_request_id: i32,
    ) -> AppResult<Vec<RentalRequestAttachment>>;

    // ---- Rotation lists ----

    /// Entries of a request, sorted by rotation list sort order
    async fn rotation_list(&self, rental_request_id: i32) -> AppResult<Vec<RotationListEntry>>;

    /// Swap the request's rotation list for `rotation` and save the request's
    /// first-on equipment and the pointer with it
    async fn rebuild_rotation_list(
        &self,
        request: &RentalRequest,
        rotation: &RotationListPlan,
    ) -> AppResult<RentalRequest>;

    /// Store an offer outcome with the agreement, completion and pointer it causes.
    /// Returns the entry as stored, linked to the new agreement if one was created.
    async fn record_offer_outcome(&self, outcome: &OfferOutcome) -> AppResult<RotationListEntry>;

    // ---- Local area rotation pointer ----

    async fn get_area_rotation_list(
        &self,
        local_area_id: i32,
        district_equipment_type_id: i32,
    ) -> AppResult<Option<LocalAreaRotationList>>;
}
