//! Repository layer for database operations

pub mod equipment;
pub mod local_area_rotation_lists;
pub mod memory;
pub mod rental_agreements;
pub mod rental_requests;
pub mod rotation_lists;
pub mod store;

pub use memory::MemoryStore;
pub use store::RequestStore;

#[cfg(test)]
pub use store::MockRequestStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};

use crate::{
    error::AppResult,
    models::{
        CreateRentalRequest, DistrictEquipmentType, Equipment, LocalArea, LocalAreaRotationList,
        OfferOutcome, RentalRequest, RentalRequestAttachment, RentalRequestQuery,
        RentalRequestStatus, RotationListEntry, RotationListPlan,
    },
};

use local_area_rotation_lists::LocalAreaRotationListsRepository;
use rental_agreements::RentalAgreementsRepository;
use rental_requests::RentalRequestsRepository;
use rotation_lists::RotationListsRepository;

/// Main repository struct holding database connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
    pub equipment: equipment::EquipmentRepository,
    pub rental_requests: RentalRequestsRepository,
    pub rotation_lists: RotationListsRepository,
    pub rental_agreements: RentalAgreementsRepository,
    pub local_area_rotation_lists: LocalAreaRotationListsRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            equipment: equipment::EquipmentRepository::new(pool.clone()),
            rental_requests: RentalRequestsRepository::new(pool.clone()),
            rotation_lists: RotationListsRepository::new(pool.clone()),
            rental_agreements: RentalAgreementsRepository::new(pool.clone()),
            local_area_rotation_lists: LocalAreaRotationListsRepository::new(pool.clone()),
            pool,
        }
    }
}

#[async_trait]
impl RequestStore for Repository {
    async fn get_local_area(&self, id: i32) -> AppResult<Option<LocalArea>> {
        self.equipment.get_local_area(id).await
    }

    async fn get_district_equipment_type(
        &self,
        id: i32,
    ) -> AppResult<Option<DistrictEquipmentType>> {
        self.equipment.get_district_type(id).await
    }

    async fn list_block_equipment(
        &self,
        local_area_id: i32,
        district_equipment_type_id: i32,
        block_number: i32,
    ) -> AppResult<Vec<Equipment>> {
        self.equipment
            .list_block(local_area_id, district_equipment_type_id, block_number)
            .await
    }

    async fn has_active_agreement(&self, equipment_id: i32) -> AppResult<bool> {
        self.rental_agreements.has_active(equipment_id).await
    }

    async fn count_agreements_in_area_since(
        &self,
        local_area_id: i32,
        since: DateTime<Utc>,
    ) -> AppResult<i64> {
        self.rental_agreements
            .count_in_area_since(local_area_id, since)
            .await
    }

    async fn get_rental_request(&self, id: i32) -> AppResult<Option<RentalRequest>> {
        self.rental_requests.get_by_id(id).await
    }

    async fn search_rental_requests(
        &self,
        query: &RentalRequestQuery,
    ) -> AppResult<Vec<RentalRequest>> {
        self.rental_requests.search(query).await
    }

    async fn latest_rental_request_since(
        &self,
        local_area_id: i32,
        district_equipment_type_id: i32,
        since: DateTime<Utc>,
        before_id: Option<i32>,
    ) -> AppResult<Option<RentalRequest>> {
        self.rental_requests
            .latest_since(local_area_id, district_equipment_type_id, since, before_id)
            .await
    }

    async fn create_rental_request(
        &self,
        data: &CreateRentalRequest,
        status: RentalRequestStatus,
        created_at: DateTime<Utc>,
        rotation: &RotationListPlan,
    ) -> AppResult<RentalRequest> {
        let mut tx = self.pool.begin().await?;

        let request = RentalRequestsRepository::create(
            &mut tx,
            data,
            status,
            rotation.first_on_rotation_list_id,
            created_at,
        )
        .await?;
        RotationListsRepository::replace(&mut tx, request.id, &rotation.entries).await?;
        if let Some(pointer) = &rotation.pointer {
            LocalAreaRotationListsRepository::save(&mut tx, pointer).await?;
        }

        tx.commit().await?;
        Ok(request)
    }

    async fn update_rental_request(&self, request: &RentalRequest) -> AppResult<RentalRequest> {
        let mut conn = self.pool.acquire().await?;
        RentalRequestsRepository::update(&mut conn, request).await
    }

    async fn delete_rental_request(&self, id: i32) -> AppResult<()> {
        self.rental_requests.delete(id).await
    }

    async fn rental_request_attachments(
        &self,
        rental_request_id: i32,
    ) -> AppResult<Vec<RentalRequestAttachment>> {
        self.rental_requests.attachments(rental_request_id).await
    }

    async fn rotation_list(&self, rental_request_id: i32) -> AppResult<Vec<RotationListEntry>> {
        self.rotation_lists.list_for_request(rental_request_id).await
    }

    async fn rebuild_rotation_list(
        &self,
        request: &RentalRequest,
        rotation: &RotationListPlan,
    ) -> AppResult<RentalRequest> {
        let mut tx = self.pool.begin().await?;

        RotationListsRepository::replace(&mut tx, request.id, &rotation.entries).await?;
        let request = RentalRequestsRepository::update(
            &mut tx,
            &RentalRequest {
                first_on_rotation_list_id: rotation.first_on_rotation_list_id,
                ..request.clone()
            },
        )
        .await?;
        if let Some(pointer) = &rotation.pointer {
            LocalAreaRotationListsRepository::save(&mut tx, pointer).await?;
        }

        tx.commit().await?;
        Ok(request)
    }

    async fn record_offer_outcome(&self, outcome: &OfferOutcome) -> AppResult<RotationListEntry> {
        let mut tx = self.pool.begin().await?;

        let mut entry = outcome.entry.clone();
        if let Some(agreement) = &outcome.agreement {
            entry.rental_agreement_id =
                Some(RentalAgreementsRepository::create(&mut tx, agreement).await?.id);
        }
        let entry = RotationListsRepository::update(&mut tx, &entry).await?;
        if let Some(request) = &outcome.completed_request {
            RentalRequestsRepository::update(&mut tx, request).await?;
        }
        if let Some(pointer) = &outcome.pointer {
            LocalAreaRotationListsRepository::save(&mut tx, pointer).await?;
        }

        tx.commit().await?;
        Ok(entry)
    }

    async fn get_area_rotation_list(
        &self,
        local_area_id: i32,
        district_equipment_type_id: i32,
    ) -> AppResult<Option<LocalAreaRotationList>> {
        self.local_area_rotation_lists
            .get(local_area_id, district_equipment_type_id)
            .await
    }
}
