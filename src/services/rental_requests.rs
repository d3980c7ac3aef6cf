//! Rental request service: list building, offer outcomes and lifecycle checks
//!
//! Every operation reads what it needs, computes its changes in memory and
//! hands them to the store as one unit of work.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use validator::Validate;

use crate::{
    error::{AppError, AppResult, ErrorCode},
    models::{
        BlockSlot, CreateRentalAgreement, CreateRentalRequest, LocalArea, LocalAreaRotationList,
        OfferOutcome, RentalAgreementStatus, RentalRequest, RentalRequestAttachment,
        RentalRequestDetails, RentalRequestQuery, RentalRequestStatus, RotationListEntry,
        RotationListPlan, UpdateRentalRequest, UpdateRotationListEntry,
    },
    repository::RequestStore,
    rotation::{
        advance::slot_for,
        assemble,
        fiscal::{agreement_fiscal_year, agreement_number, fiscal_year_start},
        hired_count, next_to_ask, setup_new_rotation, BlockRoster, BlockRules,
    },
};

/// Source of the current time
pub type Clock = fn() -> DateTime<Utc>;

/// What list building needs resolved before it can run
struct ListContext {
    local_area: LocalArea,
    is_dump_truck: bool,
}

#[derive(Clone)]
pub struct RentalRequestService {
    store: Arc<dyn RequestStore>,
    rules: Arc<dyn BlockRules>,
    clock: Clock,
}

impl RentalRequestService {
    pub fn new(store: Arc<dyn RequestStore>, rules: Arc<dyn BlockRules>) -> Self {
        Self {
            store,
            rules,
            clock: Utc::now,
        }
    }

    /// Replace the clock, e.g. to pin the fiscal year in tests
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Numbered seniority blocks for an equipment category
    pub fn block_count(&self, is_dump_truck: bool) -> i32 {
        self.rules.total_blocks(is_dump_truck)
    }

    /// Get a rental request with its rotation list
    pub async fn get(&self, id: i32) -> AppResult<RentalRequestDetails> {
        let request = self.load_request(id).await?;
        self.details(request).await
    }

    /// Search rental requests
    pub async fn search(&self, query: &RentalRequestQuery) -> AppResult<Vec<RentalRequest>> {
        self.store.search_rental_requests(query).await
    }

    /// Documents attached to a rental request
    pub async fn attachments(&self, id: i32) -> AppResult<Vec<RentalRequestAttachment>> {
        self.load_request(id).await?;
        self.store.rental_request_attachments(id).await
    }

    /// Create a rental request and build its rotation list
    pub async fn create(&self, data: CreateRentalRequest) -> AppResult<RentalRequestDetails> {
        data.validate()?;

        let in_progress = self
            .store
            .search_rental_requests(&RentalRequestQuery {
                local_areas: vec![data.local_area_id],
                district_equipment_type_id: Some(data.district_equipment_type_id),
                status: Some(RentalRequestStatus::InProgress),
                ..Default::default()
            })
            .await?;
        if !in_progress.is_empty() {
            return Err(AppError::BusinessRule(ErrorCode::DuplicateInProgress));
        }

        let (status, rotation) = match self
            .list_context(data.local_area_id, data.district_equipment_type_id)
            .await?
        {
            Some(context) => (
                RentalRequestStatus::InProgress,
                self.plan_rotation_list(
                    data.local_area_id,
                    data.district_equipment_type_id,
                    None,
                    &context,
                )
                .await?,
            ),
            None => (RentalRequestStatus::New, RotationListPlan::default()),
        };

        let request = self
            .store
            .create_rental_request(&data, status, (self.clock)(), &rotation)
            .await?;

        tracing::info!(
            "Created rental request {} for local area {} (status {}, {} on rotation list)",
            request.id,
            request.local_area_id,
            request.status,
            rotation.entries.len()
        );

        self.details(request).await
    }

    /// Update the requested count and expected dates
    pub async fn update(&self, id: i32, data: UpdateRentalRequest) -> AppResult<RentalRequest> {
        data.validate()?;

        let mut request = self.load_request(id).await?;
        let list = self.store.rotation_list(id).await?;
        let hired = hired_count(&list);

        if data.equipment_count != request.equipment_count && hired > data.equipment_count {
            return Err(AppError::BusinessRule(ErrorCode::CountBelowHired));
        }

        request.equipment_count = data.equipment_count;
        request.expected_hours = data.expected_hours;
        request.expected_start_date = data.expected_start_date;
        request.expected_end_date = data.expected_end_date;

        if hired >= request.equipment_count {
            request.status = RentalRequestStatus::Complete;
            request.first_on_rotation_list_id = None;
            tracing::info!("Rental request {} is complete ({} hired)", id, hired);
        }

        self.store.update_rental_request(&request).await
    }

    /// Cancel (delete) a rental request that has not hired anything
    pub async fn cancel(&self, id: i32) -> AppResult<()> {
        let request = self.load_request(id).await?;
        let list = self.store.rotation_list(id).await?;

        if list.iter().any(|e| e.rental_agreement_id.is_some()) {
            return Err(AppError::BusinessRule(ErrorCode::AgreementsExist));
        }
        if request.status == RentalRequestStatus::Complete {
            return Err(AppError::BusinessRule(ErrorCode::RequestComplete));
        }

        self.store.delete_rental_request(id).await?;
        tracing::info!("Cancelled rental request {}", id);
        Ok(())
    }

    /// Rebuild the rotation list of an in-progress request from scratch
    pub async fn recalculate(&self, id: i32) -> AppResult<RentalRequestDetails> {
        let request = self.load_request(id).await?;

        if !request.is_in_progress() {
            return self.details(request).await;
        }

        // Without its prerequisites the old list is still dropped
        let rotation = match self
            .list_context(request.local_area_id, request.district_equipment_type_id)
            .await?
        {
            Some(context) => {
                self.plan_rotation_list(
                    request.local_area_id,
                    request.district_equipment_type_id,
                    Some(request.id),
                    &context,
                )
                .await?
            }
            None => RotationListPlan::default(),
        };

        let request = self.store.rebuild_rotation_list(&request, &rotation).await?;

        tracing::info!(
            "Recalculated rotation list for rental request {} ({} entries)",
            id,
            rotation.entries.len()
        );
        self.details(request).await
    }

    /// Record an offer outcome on one entry and move the area pointer on
    pub async fn update_rotation_entry(
        &self,
        rental_request_id: i32,
        data: UpdateRotationListEntry,
    ) -> AppResult<RentalRequestDetails> {
        let request = self.load_request(rental_request_id).await?;
        if !request.is_in_progress() {
            return Err(AppError::BusinessRule(ErrorCode::RequestNotInProgress));
        }

        let mut list = self.store.rotation_list(rental_request_id).await?;
        let position = list
            .iter()
            .position(|e| e.id == data.id)
            .ok_or_else(|| AppError::not_found("Rotation list entry", data.id))?;

        let mut entry = list[position].clone();
        data.apply_to(&mut entry);

        let agreement = if data.hires() && entry.rental_agreement_id.is_none() {
            Some(self.plan_agreement(&request, entry.equipment_id).await?)
        } else {
            None
        };

        list[position] = entry.clone();

        let completed_request = if hired_count(&list) >= request.equipment_count {
            Some(RentalRequest {
                status: RentalRequestStatus::Complete,
                first_on_rotation_list_id: None,
                ..request.clone()
            })
        } else {
            None
        };

        let total_blocks = self
            .total_blocks_for(request.district_equipment_type_id)
            .await?;
        let pointer = self
            .next_area_pointer(&request, &list, total_blocks)
            .await?;

        let outcome = OfferOutcome {
            entry,
            agreement,
            completed_request,
            pointer,
        };
        let entry = self.store.record_offer_outcome(&outcome).await?;

        if let Some(agreement) = &outcome.agreement {
            tracing::info!(
                "Created rental agreement {} for equipment {}",
                agreement.number,
                entry.equipment_id
            );
        }
        if outcome.completed_request.is_some() {
            tracing::info!("Rental request {} is complete", rental_request_id);
        }

        let request = self.load_request(rental_request_id).await?;
        self.details(request).await
    }

    async fn load_request(&self, id: i32) -> AppResult<RentalRequest> {
        self.store
            .get_rental_request(id)
            .await?
            .ok_or_else(|| AppError::not_found("Rental request", id))
    }

    async fn details(&self, request: RentalRequest) -> AppResult<RentalRequestDetails> {
        let rotation_list = self.store.rotation_list(request.id).await?;
        let is_dump_truck = self.is_dump_truck(request.district_equipment_type_id).await?;

        Ok(RentalRequestDetails {
            yes_count: hired_count(&rotation_list),
            number_of_blocks: self.rules.blocks_including_open(is_dump_truck),
            request,
            rotation_list,
        })
    }

    /// Unresolved equipment types count as the default category
    async fn is_dump_truck(&self, district_equipment_type_id: i32) -> AppResult<bool> {
        Ok(self
            .store
            .get_district_equipment_type(district_equipment_type_id)
            .await?
            .and_then(|det| det.equipment_type)
            .is_some_and(|et| et.is_dump_truck))
    }

    async fn total_blocks_for(&self, district_equipment_type_id: i32) -> AppResult<i32> {
        let is_dump_truck = self.is_dump_truck(district_equipment_type_id).await?;
        Ok(self.rules.total_blocks(is_dump_truck))
    }

    async fn list_context(
        &self,
        local_area_id: i32,
        district_equipment_type_id: i32,
    ) -> AppResult<Option<ListContext>> {
        let Some(local_area) = self.store.get_local_area(local_area_id).await? else {
            tracing::warn!("Local area {} not found, rotation list not built", local_area_id);
            return Ok(None);
        };

        let Some(district_type) = self
            .store
            .get_district_equipment_type(district_equipment_type_id)
            .await?
        else {
            tracing::warn!(
                "District equipment type {} not found, rotation list not built",
                district_equipment_type_id
            );
            return Ok(None);
        };

        let Some(equipment_type) = district_type.equipment_type else {
            tracing::warn!(
                "District equipment type {} has no equipment type, rotation list not built",
                district_equipment_type_id
            );
            return Ok(None);
        };

        Ok(Some(ListContext {
            local_area,
            is_dump_truck: equipment_type.is_dump_truck,
        }))
    }

    /// Build the rotation list for an (area, type) pair, continuing the rotation
    /// of the latest earlier request of the fiscal year.
    ///
    /// `rental_request_id` is the request being rebuilt, `None` for a new one.
    async fn plan_rotation_list(
        &self,
        local_area_id: i32,
        district_equipment_type_id: i32,
        rental_request_id: Option<i32>,
        context: &ListContext,
    ) -> AppResult<RotationListPlan> {
        let total_blocks = self.rules.total_blocks(context.is_dump_truck);

        let mut rosters = Vec::new();
        for block_number in 1..=self.rules.blocks_including_open(context.is_dump_truck) {
            let mut equipment = Vec::new();
            for candidate in self
                .store
                .list_block_equipment(local_area_id, district_equipment_type_id, block_number)
                .await?
            {
                if self.store.has_active_agreement(candidate.id).await? {
                    tracing::debug!("Equipment {} is on an active agreement, skipped", candidate.id);
                    continue;
                }
                equipment.push(candidate);
            }
            rosters.push(BlockRoster {
                block_number,
                equipment,
            });
        }

        let mut entries = assemble(rosters);

        let since = fiscal_year_start((self.clock)());
        let previous = match self
            .store
            .latest_rental_request_since(
                local_area_id,
                district_equipment_type_id,
                since,
                rental_request_id,
            )
            .await?
        {
            Some(prior) => {
                tracing::debug!("Continuing rotation from rental request {}", prior.id);
                Some(self.store.rotation_list(prior.id).await?)
            }
            None => None,
        };

        let continuation = setup_new_rotation(&mut entries, previous.as_deref());

        tracing::debug!(
            "Built rotation list for local area {} ({} entries)",
            context.local_area.local_area_number,
            entries.len()
        );

        let pointer = match continuation {
            Some(continuation) => {
                let mut pointer = self
                    .area_pointer(local_area_id, district_equipment_type_id)
                    .await?;
                pointer.set_next(
                    BlockSlot::classify(Some(continuation.block_number), total_blocks),
                    continuation.equipment_id,
                    continuation.seniority,
                );
                Some(pointer)
            }
            None => None,
        };

        Ok(RotationListPlan {
            entries,
            first_on_rotation_list_id: continuation.map(|c| c.equipment_id),
            pointer,
        })
    }

    async fn area_pointer(
        &self,
        local_area_id: i32,
        district_equipment_type_id: i32,
    ) -> AppResult<LocalAreaRotationList> {
        Ok(self
            .store
            .get_area_rotation_list(local_area_id, district_equipment_type_id)
            .await?
            .unwrap_or_else(|| LocalAreaRotationList::new(local_area_id, district_equipment_type_id)))
    }

    /// The area pointer moved to the next entry to ask, if any entry is left
    async fn next_area_pointer(
        &self,
        request: &RentalRequest,
        list: &[RotationListEntry],
        total_blocks: i32,
    ) -> AppResult<Option<LocalAreaRotationList>> {
        let mut pointer = self
            .area_pointer(request.local_area_id, request.district_equipment_type_id)
            .await?;

        let Some(next) = next_to_ask(list, pointer.next_equipment_id()) else {
            return Ok(None);
        };

        tracing::debug!(
            "Next to ask in local area {}: equipment {}",
            request.local_area_id,
            next.equipment_id
        );

        pointer.set_next(slot_for(next, total_blocks), next.equipment_id, next.seniority);
        Ok(Some(pointer))
    }

    /// Number and terms of the agreement hiring `equipment_id` for `request`
    async fn plan_agreement(
        &self,
        request: &RentalRequest,
        equipment_id: i32,
    ) -> AppResult<CreateRentalAgreement> {
        let local_area = self
            .store
            .get_local_area(request.local_area_id)
            .await?
            .ok_or_else(|| AppError::not_found("Local area", request.local_area_id))?;

        let now = (self.clock)();
        let issued = self
            .store
            .count_agreements_in_area_since(local_area.id, fiscal_year_start(now))
            .await?;

        Ok(CreateRentalAgreement {
            number: agreement_number(
                agreement_fiscal_year(now),
                local_area.local_area_number,
                issued + 1,
            ),
            equipment_id,
            project_id: request.project_id,
            status: RentalAgreementStatus::Active,
            dated_on: now,
            estimate_hours: request.expected_hours,
            estimate_start_work: request.expected_start_date,
        })
    }
}
