//! In-memory store, used by tests and local tooling

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::RequestStore;
use crate::{
    error::{AppError, AppResult},
    models::{
        CreateRentalAgreement, CreateRentalRequest, DistrictEquipmentType, Equipment,
        EquipmentStatus, LocalArea, LocalAreaRotationList, NewRotationListEntry, OfferOutcome,
        Project, RentalAgreement, RentalAgreementStatus, RentalRequest, RentalRequestAttachment,
        RentalRequestQuery, RentalRequestStatus, RotationListEntry, RotationListPlan,
    },
};

#[derive(Default, Clone)]
struct State {
    next_id: i32,
    local_areas: HashMap<i32, LocalArea>,
    district_equipment_types: HashMap<i32, DistrictEquipmentType>,
    equipment: HashMap<i32, Equipment>,
    projects: HashMap<i32, Project>,
    agreements: BTreeMap<i32, RentalAgreement>,
    requests: BTreeMap<i32, RentalRequest>,
    entries: BTreeMap<i32, RotationListEntry>,
    attachments: BTreeMap<i32, RentalRequestAttachment>,
    area_lists: HashMap<(i32, i32), LocalAreaRotationList>,
}

impl State {
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    /// Refresh the equipment columns joined onto an entry
    fn joined(&self, entry: &RotationListEntry) -> RotationListEntry {
        let mut entry = entry.clone();
        if let Some(equipment) = self.equipment.get(&entry.equipment_id) {
            entry.block_number = equipment.block_number;
            entry.seniority = equipment.seniority;
        }
        entry
    }

    fn project_name(&self, project_id: Option<i32>) -> Option<&str> {
        project_id
            .and_then(|id| self.projects.get(&id))
            .map(|p| p.name.as_str())
    }

    fn rotation_list(&self, rental_request_id: i32) -> Vec<RotationListEntry> {
        let mut list: Vec<RotationListEntry> = self
            .entries
            .values()
            .filter(|e| e.rental_request_id == rental_request_id)
            .map(|e| self.joined(e))
            .collect();
        list.sort_by_key(|e| (e.rotation_list_sort_order, e.id));
        list
    }

    fn insert_request(
        &mut self,
        data: &CreateRentalRequest,
        status: RentalRequestStatus,
        first_on_rotation_list_id: Option<i32>,
        created_at: DateTime<Utc>,
    ) -> RentalRequest {
        let request = RentalRequest {
            id: self.next_id(),
            local_area_id: data.local_area_id,
            district_equipment_type_id: data.district_equipment_type_id,
            project_id: data.project_id,
            equipment_count: data.equipment_count,
            status,
            first_on_rotation_list_id,
            expected_hours: data.expected_hours,
            expected_start_date: data.expected_start_date,
            expected_end_date: data.expected_end_date,
            created_at,
            concurrency_control_number: 0,
        };
        self.requests.insert(request.id, request.clone());
        request
    }

    fn update_request(&mut self, request: &RentalRequest) -> AppResult<RentalRequest> {
        let stored = self
            .requests
            .get_mut(&request.id)
            .ok_or_else(|| AppError::not_found("Rental request", request.id))?;

        if stored.concurrency_control_number != request.concurrency_control_number {
            return Err(AppError::Conflict(format!(
                "Rental request {} was modified by another user",
                request.id
            )));
        }

        *stored = RentalRequest {
            concurrency_control_number: request.concurrency_control_number + 1,
            ..request.clone()
        };
        Ok(stored.clone())
    }

    fn replace_entries(&mut self, rental_request_id: i32, entries: &[NewRotationListEntry]) {
        self.entries
            .retain(|_, e| e.rental_request_id != rental_request_id);

        for new in entries {
            let entry = RotationListEntry {
                id: self.next_id(),
                rental_request_id,
                equipment_id: new.equipment_id,
                rotation_list_sort_order: new.rotation_list_sort_order,
                is_force_hire: None,
                was_asked: None,
                asked_date_time: None,
                offer_response: None,
                offer_response_datetime: None,
                offer_refusal_reason: None,
                offer_response_note: None,
                note: None,
                rental_agreement_id: None,
                block_number: Some(new.block_number),
                seniority: new.seniority,
            };
            self.entries.insert(entry.id, entry);
        }
    }

    fn update_entry(&mut self, entry: &RotationListEntry) -> AppResult<RotationListEntry> {
        match self.entries.get(&entry.id) {
            Some(stored) if stored.rental_request_id == entry.rental_request_id => {}
            _ => return Err(AppError::not_found("Rotation list entry", entry.id)),
        }
        self.entries.insert(entry.id, entry.clone());
        Ok(self.joined(entry))
    }

    fn insert_agreement(&mut self, data: &CreateRentalAgreement) -> AppResult<RentalAgreement> {
        if self.agreements.values().any(|a| a.number == data.number) {
            return Err(AppError::Conflict(format!(
                "Rental agreement number {} is already in use",
                data.number
            )));
        }

        let agreement = RentalAgreement {
            id: self.next_id(),
            number: data.number.clone(),
            equipment_id: data.equipment_id,
            project_id: data.project_id,
            status: data.status,
            dated_on: data.dated_on,
            estimate_hours: data.estimate_hours,
            estimate_start_work: data.estimate_start_work,
            created_at: data.dated_on,
        };
        self.agreements.insert(agreement.id, agreement.clone());
        Ok(agreement)
    }

    fn save_area_list(&mut self, list: &LocalAreaRotationList) -> AppResult<LocalAreaRotationList> {
        let key = (list.local_area_id, list.district_equipment_type_id);
        let existing = self.area_lists.get(&key).cloned();

        let saved = match existing {
            // A concurrent first save of the same pair behaves as an upsert
            Some(existing) if list.id == 0 => LocalAreaRotationList {
                id: existing.id,
                concurrency_control_number: existing.concurrency_control_number + 1,
                ..list.clone()
            },
            Some(existing) if existing.id == list.id => {
                if existing.concurrency_control_number != list.concurrency_control_number {
                    return Err(AppError::Conflict(format!(
                        "Rotation list for local area {} was modified by another user",
                        list.local_area_id
                    )));
                }
                LocalAreaRotationList {
                    concurrency_control_number: list.concurrency_control_number + 1,
                    ..list.clone()
                }
            }
            None if list.id == 0 => LocalAreaRotationList {
                id: self.next_id(),
                concurrency_control_number: 0,
                ..list.clone()
            },
            _ => {
                return Err(AppError::Conflict(format!(
                    "Rotation list {} does not belong to local area {}",
                    list.id, list.local_area_id
                )))
            }
        };

        self.area_lists.insert(key, saved.clone());
        Ok(saved)
    }
}

/// [`RequestStore`] backed by maps behind a tokio `RwLock`
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_local_area(mut self, area: LocalArea) -> Self {
        self.state.get_mut().local_areas.insert(area.id, area);
        self
    }

    pub fn with_district_equipment_type(mut self, det: DistrictEquipmentType) -> Self {
        self.state
            .get_mut()
            .district_equipment_types
            .insert(det.id, det);
        self
    }

    pub fn with_equipment(mut self, equipment: Equipment) -> Self {
        self.state.get_mut().equipment.insert(equipment.id, equipment);
        self
    }

    pub fn with_project(mut self, project: Project) -> Self {
        self.state.get_mut().projects.insert(project.id, project);
        self
    }

    pub fn with_rental_agreement(mut self, agreement: RentalAgreement) -> Self {
        self.state
            .get_mut()
            .agreements
            .insert(agreement.id, agreement);
        self
    }

    /// Add or replace an equipment record after construction
    pub async fn put_equipment(&self, equipment: Equipment) {
        self.state
            .write()
            .await
            .equipment
            .insert(equipment.id, equipment);
    }

    /// Add or replace a district equipment type after construction
    pub async fn put_district_equipment_type(&self, det: DistrictEquipmentType) {
        self.state
            .write()
            .await
            .district_equipment_types
            .insert(det.id, det);
    }

    /// Attach a document to a request, returning the attachment id
    pub async fn add_attachment(&self, rental_request_id: i32, attachment: &str) -> i32 {
        let mut state = self.state.write().await;
        let id = state.next_id();
        state.attachments.insert(
            id,
            RentalRequestAttachment {
                id,
                rental_request_id,
                attachment: attachment.to_string(),
            },
        );
        id
    }

    /// All agreements, in creation order
    pub async fn rental_agreements(&self) -> Vec<RentalAgreement> {
        self.state.read().await.agreements.values().cloned().collect()
    }

    /// Apply `write` to the state; on error the state is restored as it was
    async fn atomically<T>(&self, write: impl FnOnce(&mut State) -> AppResult<T>) -> AppResult<T> {
        let mut state = self.state.write().await;
        let snapshot = state.clone();
        let result = write(&mut *state);
        if result.is_err() {
            *state = snapshot;
        }
        result
    }
}

#[async_trait]
impl RequestStore for MemoryStore {
    async fn get_local_area(&self, id: i32) -> AppResult<Option<LocalArea>> {
        Ok(self.state.read().await.local_areas.get(&id).cloned())
    }

    async fn get_district_equipment_type(
        &self,
        id: i32,
    ) -> AppResult<Option<DistrictEquipmentType>> {
        Ok(self
            .state
            .read()
            .await
            .district_equipment_types
            .get(&id)
            .cloned())
    }

    async fn list_block_equipment(
        &self,
        local_area_id: i32,
        district_equipment_type_id: i32,
        block_number: i32,
    ) -> AppResult<Vec<Equipment>> {
        let state = self.state.read().await;
        let mut equipment: Vec<Equipment> = state
            .equipment
            .values()
            .filter(|e| {
                e.local_area_id == local_area_id
                    && e.district_equipment_type_id == district_equipment_type_id
                    && e.block_number == Some(block_number)
                    && e.status == EquipmentStatus::Approved
            })
            .cloned()
            .collect();
        equipment.sort_by_key(|e| (e.number_in_block, e.id));
        Ok(equipment)
    }

    async fn has_active_agreement(&self, equipment_id: i32) -> AppResult<bool> {
        Ok(self
            .state
            .read()
            .await
            .agreements
            .values()
            .any(|a| a.equipment_id == equipment_id && a.status == RentalAgreementStatus::Active))
    }

    async fn count_agreements_in_area_since(
        &self,
        local_area_id: i32,
        since: DateTime<Utc>,
    ) -> AppResult<i64> {
        let state = self.state.read().await;
        let count = state
            .agreements
            .values()
            .filter(|a| a.created_at >= since)
            .filter(|a| {
                state
                    .equipment
                    .get(&a.equipment_id)
                    .is_some_and(|e| e.local_area_id == local_area_id)
            })
            .count();
        Ok(count as i64)
    }

    async fn get_rental_request(&self, id: i32) -> AppResult<Option<RentalRequest>> {
        Ok(self.state.read().await.requests.get(&id).cloned())
    }

    async fn search_rental_requests(
        &self,
        query: &RentalRequestQuery,
    ) -> AppResult<Vec<RentalRequest>> {
        let state = self.state.read().await;
        let mut found: Vec<RentalRequest> = state
            .requests
            .values()
            .filter(|r| query.matches(r, state.project_name(r.project_id)))
            .cloned()
            .collect();
        found.sort_by_key(|r| (r.expected_start_date, r.id));
        Ok(found)
    }

    async fn latest_rental_request_since(
        &self,
        local_area_id: i32,
        district_equipment_type_id: i32,
        since: DateTime<Utc>,
        before_id: Option<i32>,
    ) -> AppResult<Option<RentalRequest>> {
        let state = self.state.read().await;
        Ok(state
            .requests
            .values()
            .rev()
            .find(|r| {
                r.local_area_id == local_area_id
                    && r.district_equipment_type_id == district_equipment_type_id
                    && r.created_at >= since
                    && before_id.map_or(true, |before| r.id < before)
            })
            .cloned())
    }

    async fn create_rental_request(
        &self,
        data: &CreateRentalRequest,
        status: RentalRequestStatus,
        created_at: DateTime<Utc>,
        rotation: &RotationListPlan,
    ) -> AppResult<RentalRequest> {
        self.atomically(|state| {
            let request =
                state.insert_request(data, status, rotation.first_on_rotation_list_id, created_at);
            state.replace_entries(request.id, &rotation.entries);
            if let Some(pointer) = &rotation.pointer {
                state.save_area_list(pointer)?;
            }
            Ok(request)
        })
        .await
    }

    async fn update_rental_request(&self, request: &RentalRequest) -> AppResult<RentalRequest> {
        self.state.write().await.update_request(request)
    }

    async fn delete_rental_request(&self, id: i32) -> AppResult<()> {
        let mut state = self.state.write().await;
        if state.requests.remove(&id).is_none() {
            return Err(AppError::not_found("Rental request", id));
        }
        state.entries.retain(|_, e| e.rental_request_id != id);
        state.attachments.retain(|_, a| a.rental_request_id != id);
        Ok(())
    }

    async fn rental_request_attachments(
        &self,
        rental_request_id: i32,
    ) -> AppResult<Vec<RentalRequestAttachment>> {
        Ok(self
            .state
            .read()
            .await
            .attachments
            .values()
            .filter(|a| a.rental_request_id == rental_request_id)
            .cloned()
            .collect())
    }

    async fn rotation_list(&self, rental_request_id: i32) -> AppResult<Vec<RotationListEntry>> {
        Ok(self.state.read().await.rotation_list(rental_request_id))
    }

    async fn rebuild_rotation_list(
        &self,
        request: &RentalRequest,
        rotation: &RotationListPlan,
    ) -> AppResult<RentalRequest> {
        self.atomically(|state| {
            state.replace_entries(request.id, &rotation.entries);
            let request = state.update_request(&RentalRequest {
                first_on_rotation_list_id: rotation.first_on_rotation_list_id,
                ..request.clone()
            })?;
            if let Some(pointer) = &rotation.pointer {
                state.save_area_list(pointer)?;
            }
            Ok(request)
        })
        .await
    }

    async fn record_offer_outcome(&self, outcome: &OfferOutcome) -> AppResult<RotationListEntry> {
        self.atomically(|state| {
            let mut entry = outcome.entry.clone();
            if let Some(agreement) = &outcome.agreement {
                entry.rental_agreement_id = Some(state.insert_agreement(agreement)?.id);
            }
            let entry = state.update_entry(&entry)?;
            if let Some(request) = &outcome.completed_request {
                state.update_request(request)?;
            }
            if let Some(pointer) = &outcome.pointer {
                state.save_area_list(pointer)?;
            }
            Ok(entry)
        })
        .await
    }

    async fn get_area_rotation_list(
        &self,
        local_area_id: i32,
        district_equipment_type_id: i32,
    ) -> AppResult<Option<LocalAreaRotationList>> {
        Ok(self
            .state
            .read()
            .await
            .area_lists
            .get(&(local_area_id, district_equipment_type_id))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BlockSlot, OfferResponse};
    use chrono::TimeZone;

    fn equipment(id: i32, block: i32, number_in_block: i32, status: EquipmentStatus) -> Equipment {
        Equipment {
            id,
            local_area_id: 1,
            district_equipment_type_id: 2,
            block_number: Some(block),
            number_in_block: Some(number_in_block),
            seniority: Some(100.0 - id as f32),
            status,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 2, 15, 9, 0, 0).unwrap()
    }

    fn request_data() -> CreateRentalRequest {
        CreateRentalRequest {
            local_area_id: 1,
            district_equipment_type_id: 2,
            project_id: None,
            equipment_count: 1,
            expected_hours: None,
            expected_start_date: None,
            expected_end_date: None,
        }
    }

    fn plan(first_on: i32, pointer: LocalAreaRotationList) -> RotationListPlan {
        RotationListPlan {
            entries: vec![NewRotationListEntry {
                equipment_id: first_on,
                block_number: 1,
                seniority: None,
                rotation_list_sort_order: 1,
            }],
            first_on_rotation_list_id: Some(first_on),
            pointer: Some(pointer),
        }
    }

    fn pointing_at(mut pointer: LocalAreaRotationList, equipment_id: i32) -> LocalAreaRotationList {
        pointer.set_next(BlockSlot::Block1, equipment_id, None);
        pointer
    }

    #[tokio::test]
    async fn test_list_block_equipment_filters_and_orders() {
        let store = MemoryStore::new()
            .with_equipment(equipment(1, 1, 2, EquipmentStatus::Approved))
            .with_equipment(equipment(2, 1, 1, EquipmentStatus::Approved))
            .with_equipment(equipment(3, 1, 3, EquipmentStatus::Pending))
            .with_equipment(equipment(4, 2, 1, EquipmentStatus::Approved));

        let block: Vec<i32> = store
            .list_block_equipment(1, 2, 1)
            .await
            .unwrap()
            .iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(block, vec![2, 1]);
    }

    #[tokio::test]
    async fn test_stale_pointer_rolls_back_whole_create() {
        let store = MemoryStore::new()
            .with_equipment(equipment(1, 1, 1, EquipmentStatus::Approved))
            .with_equipment(equipment(2, 1, 2, EquipmentStatus::Approved));

        let fresh = LocalAreaRotationList::new(1, 2);
        store
            .create_rental_request(
                &request_data(),
                RentalRequestStatus::InProgress,
                now(),
                &plan(1, pointing_at(fresh, 1)),
            )
            .await
            .unwrap();
        let read = store.get_area_rotation_list(1, 2).await.unwrap().unwrap();

        // Another writer moves the pointer after `read` was taken
        store
            .create_rental_request(
                &request_data(),
                RentalRequestStatus::InProgress,
                now(),
                &plan(2, pointing_at(read.clone(), 2)),
            )
            .await
            .unwrap();

        let err = store
            .create_rental_request(
                &request_data(),
                RentalRequestStatus::InProgress,
                now(),
                &plan(1, pointing_at(read, 1)),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let requests = store.search_rental_requests(&Default::default()).await.unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(store.state.read().await.entries.len(), 2);

        let current = store.get_area_rotation_list(1, 2).await.unwrap().unwrap();
        assert_eq!(current.next_equipment_id(), Some(2));
        assert_eq!(current.concurrency_control_number, 1);
    }

    #[tokio::test]
    async fn test_taken_agreement_number_rolls_back_outcome() {
        let store = MemoryStore::new()
            .with_equipment(equipment(1, 1, 1, EquipmentStatus::Approved))
            .with_rental_agreement(RentalAgreement {
                id: 500,
                number: "2024-7-0001".to_string(),
                equipment_id: 77,
                project_id: None,
                status: RentalAgreementStatus::Active,
                dated_on: now(),
                estimate_hours: None,
                estimate_start_work: None,
                created_at: now(),
            });

        let request = store
            .create_rental_request(
                &request_data(),
                RentalRequestStatus::InProgress,
                now(),
                &plan(1, pointing_at(LocalAreaRotationList::new(1, 2), 1)),
            )
            .await
            .unwrap();

        let mut entry = store.rotation_list(request.id).await.unwrap().remove(0);
        entry.offer_response = Some(OfferResponse::Yes);
        let outcome = OfferOutcome {
            entry,
            agreement: Some(CreateRentalAgreement {
                number: "2024-7-0001".to_string(),
                equipment_id: 1,
                project_id: None,
                status: RentalAgreementStatus::Active,
                dated_on: now(),
                estimate_hours: None,
                estimate_start_work: None,
            }),
            completed_request: Some(RentalRequest {
                status: RentalRequestStatus::Complete,
                first_on_rotation_list_id: None,
                ..request.clone()
            }),
            pointer: None,
        };

        let err = store.record_offer_outcome(&outcome).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let stored = store.rotation_list(request.id).await.unwrap().remove(0);
        assert_eq!(stored.offer_response, None);
        assert_eq!(stored.rental_agreement_id, None);
        assert_eq!(store.rental_agreements().await.len(), 1);

        let request = store.get_rental_request(request.id).await.unwrap().unwrap();
        assert_eq!(request.status, RentalRequestStatus::InProgress);
        assert_eq!(request.concurrency_control_number, 0);
    }

    #[tokio::test]
    async fn test_outcome_for_entry_of_other_request_is_not_found() {
        let store = MemoryStore::new().with_equipment(equipment(1, 1, 1, EquipmentStatus::Approved));
        let request = store
            .create_rental_request(
                &request_data(),
                RentalRequestStatus::InProgress,
                now(),
                &plan(1, pointing_at(LocalAreaRotationList::new(1, 2), 1)),
            )
            .await
            .unwrap();

        let mut entry = store.rotation_list(request.id).await.unwrap().remove(0);
        entry.rental_request_id += 1;
        let err = store
            .record_offer_outcome(&OfferOutcome {
                entry,
                agreement: None,
                completed_request: None,
                pointer: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_search_by_project_name() {
        let store = MemoryStore::new()
            .with_project(Project {
                id: 40,
                name: "Highway 97 Widening".to_string(),
            })
            .with_project(Project {
                id: 41,
                name: "Coquihalla Resurfacing".to_string(),
            });

        for project_id in [Some(40), Some(41), None] {
            store
                .create_rental_request(
                    &CreateRentalRequest {
                        project_id,
                        ..request_data()
                    },
                    RentalRequestStatus::New,
                    now(),
                    &RotationListPlan::default(),
                )
                .await
                .unwrap();
        }

        let found = store
            .search_rental_requests(&RentalRequestQuery {
                project: Some("highway".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].project_id, Some(40));
    }
}
