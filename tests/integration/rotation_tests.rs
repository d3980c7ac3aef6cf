//! Rotation engine integration tests
//!
//! The scenarios run against the in-memory store. The Postgres test at the
//! bottom needs DATABASE_URL and is ignored by default.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use tokio_test::{assert_err, assert_ok};

use hets_rotation::{
    models::{
        BlockSlot, CreateRentalRequest, DistrictEquipmentType, Equipment, EquipmentStatus,
        EquipmentType, LocalArea, OfferResponse, RentalRequestDetails, RentalRequestStatus,
        UpdateRotationListEntry,
    },
    repository::{MemoryStore, RequestStore},
    rotation::SeniorityScoringRules,
    services::rental_requests::{Clock, RentalRequestService},
    ErrorCode,
};

const AREA: i32 = 5;
const EXCAVATOR: i32 = 9;
const DUMP_TRUCK: i32 = 10;

fn winter_2024() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 2, 15, 9, 0, 0).unwrap()
}

fn march_2024() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 28, 15, 30, 0).unwrap()
}

fn april_2024() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 4, 2, 8, 0, 0).unwrap()
}

fn equipment(id: i32, district_equipment_type_id: i32, block: i32, position: i32) -> Equipment {
    Equipment {
        id,
        local_area_id: AREA,
        district_equipment_type_id,
        block_number: Some(block),
        number_in_block: Some(position),
        seniority: Some(500.0 - id as f32),
        status: EquipmentStatus::Approved,
    }
}

/// Area 5 (number 7) with an excavator and a dump truck district type
fn base_store() -> MemoryStore {
    MemoryStore::new()
        .with_local_area(LocalArea {
            id: AREA,
            local_area_number: 7,
            name: "Salmon Arm".to_string(),
        })
        .with_district_equipment_type(DistrictEquipmentType {
            id: EXCAVATOR,
            name: "Excavator".to_string(),
            equipment_type: Some(EquipmentType {
                id: 1,
                name: "Excavator".to_string(),
                is_dump_truck: false,
            }),
        })
        .with_district_equipment_type(DistrictEquipmentType {
            id: DUMP_TRUCK,
            name: "Tandem Dump Truck".to_string(),
            equipment_type: Some(EquipmentType {
                id: 2,
                name: "Dump Truck".to_string(),
                is_dump_truck: true,
            }),
        })
}

fn service(store: &Arc<MemoryStore>, clock: Clock) -> RentalRequestService {
    RentalRequestService::new(store.clone(), Arc::new(SeniorityScoringRules::default()))
        .with_clock(clock)
}

fn request(district_equipment_type_id: i32, equipment_count: i32) -> CreateRentalRequest {
    CreateRentalRequest {
        local_area_id: AREA,
        district_equipment_type_id,
        project_id: Some(77),
        equipment_count,
        expected_hours: Some(200),
        expected_start_date: None,
        expected_end_date: None,
    }
}

fn entry_id(details: &RentalRequestDetails, equipment_id: i32) -> i32 {
    details
        .rotation_list
        .iter()
        .find(|e| e.equipment_id == equipment_id)
        .map(|e| e.id)
        .expect("equipment is on the rotation list")
}

fn answer(details: &RentalRequestDetails, equipment_id: i32, response: OfferResponse) -> UpdateRotationListEntry {
    UpdateRotationListEntry {
        id: entry_id(details, equipment_id),
        was_asked: Some(true),
        asked_date_time: Some(winter_2024()),
        offer_response: Some(response),
        offer_response_datetime: Some(winter_2024()),
        ..Default::default()
    }
}

fn force_hire(details: &RentalRequestDetails, equipment_id: i32) -> UpdateRotationListEntry {
    UpdateRotationListEntry {
        id: entry_id(details, equipment_id),
        is_force_hire: Some(true),
        note: Some("Owner on site".to_string()),
        ..Default::default()
    }
}

fn call_out(details: &RentalRequestDetails) -> Vec<i32> {
    details.rotation_list.iter().map(|e| e.equipment_id).collect()
}

fn assert_contiguous(details: &RentalRequestDetails) {
    let orders: Vec<i32> = details
        .rotation_list
        .iter()
        .map(|e| e.rotation_list_sort_order)
        .collect();
    let expected: Vec<i32> = (1..=details.rotation_list.len() as i32).collect();
    assert_eq!(orders, expected);
}

async fn assert_single_pointer(store: &MemoryStore, district_equipment_type_id: i32) -> Option<i32> {
    let pointer = store
        .get_area_rotation_list(AREA, district_equipment_type_id)
        .await
        .unwrap()?;
    let (block1, block2, open) = pointer.to_columns();
    let populated = [block1, block2, open]
        .iter()
        .filter(|(id, _)| id.is_some())
        .count();
    assert!(populated <= 1, "more than one ask-next slot populated");
    pointer.next_equipment_id()
}

#[tokio::test]
async fn test_excavator_first_request_of_year() {
    let store = Arc::new(
        base_store()
            .with_equipment(equipment(1, EXCAVATOR, 1, 1))
            .with_equipment(equipment(2, EXCAVATOR, 1, 2))
            .with_equipment(equipment(3, EXCAVATOR, 2, 1)),
    );
    let service = service(&store, winter_2024);

    let details = assert_ok!(service.create(request(EXCAVATOR, 1)).await);

    assert_eq!(call_out(&details), vec![1, 2, 3]);
    assert_contiguous(&details);
    assert_eq!(details.request.first_on_rotation_list_id, Some(1));
    assert_eq!(details.number_of_blocks, 3);
    assert_eq!(assert_single_pointer(&store, EXCAVATOR).await, Some(1));
}

#[tokio::test]
async fn test_open_block_follows_numbered_blocks() {
    let store = Arc::new(
        base_store()
            .with_equipment(equipment(1, EXCAVATOR, 3, 1))
            .with_equipment(equipment(2, EXCAVATOR, 1, 1))
            .with_equipment(equipment(3, EXCAVATOR, 2, 1))
            .with_equipment(Equipment {
                status: EquipmentStatus::Archived,
                ..equipment(4, EXCAVATOR, 1, 2)
            }),
    );

    let details = service(&store, winter_2024)
        .create(request(EXCAVATOR, 1))
        .await
        .unwrap();

    assert_eq!(call_out(&details), vec![2, 3, 1]);
    assert_contiguous(&details);
}

#[tokio::test]
async fn test_dump_trucks_use_three_blocks() {
    let store = Arc::new(
        base_store()
            .with_equipment(equipment(21, DUMP_TRUCK, 3, 1))
            .with_equipment(equipment(22, DUMP_TRUCK, 4, 1))
            .with_equipment(equipment(23, DUMP_TRUCK, 1, 1))
            .with_equipment(equipment(24, DUMP_TRUCK, 5, 1)),
    );

    let details = service(&store, winter_2024)
        .create(request(DUMP_TRUCK, 2))
        .await
        .unwrap();

    // Block 5 is beyond the open block and never offered work
    assert_eq!(call_out(&details), vec![23, 21, 22]);
    assert_eq!(details.number_of_blocks, 4);
}

#[tokio::test]
async fn test_offer_cycle_completes_request() {
    let store = Arc::new(
        base_store()
            .with_equipment(equipment(1, EXCAVATOR, 1, 1))
            .with_equipment(equipment(2, EXCAVATOR, 1, 2))
            .with_equipment(equipment(3, EXCAVATOR, 2, 1))
            .with_equipment(equipment(4, EXCAVATOR, 2, 2)),
    );
    let service = service(&store, winter_2024);
    let details = service.create(request(EXCAVATOR, 2)).await.unwrap();
    let id = details.request.id;

    let details = assert_ok!(
        service
            .update_rotation_entry(id, answer(&details, 1, OfferResponse::No))
            .await
    );
    assert_eq!(details.yes_count, 0);
    assert_eq!(assert_single_pointer(&store, EXCAVATOR).await, Some(2));

    let details = assert_ok!(
        service
            .update_rotation_entry(id, answer(&details, 2, OfferResponse::Yes))
            .await
    );
    assert_eq!(details.request.status, RentalRequestStatus::InProgress);
    assert_eq!(details.request.first_on_rotation_list_id, Some(1));
    assert_eq!(assert_single_pointer(&store, EXCAVATOR).await, Some(3));

    let details = assert_ok!(service.update_rotation_entry(id, force_hire(&details, 3)).await);
    assert_eq!(details.yes_count, 2);
    assert_eq!(details.request.status, RentalRequestStatus::Complete);
    assert_eq!(details.request.first_on_rotation_list_id, None);
    assert_eq!(assert_single_pointer(&store, EXCAVATOR).await, Some(4));
    assert_contiguous(&details);

    let agreements = store.rental_agreements().await;
    let numbers: Vec<&str> = agreements.iter().map(|a| a.number.as_str()).collect();
    assert_eq!(numbers, vec!["2024-7-0001", "2024-7-0002"]);
    assert!(agreements.iter().all(|a| a.project_id == Some(77)));
    assert!(agreements.iter().all(|a| a.estimate_hours == Some(200)));

    let hired: Vec<Option<i32>> = details
        .rotation_list
        .iter()
        .map(|e| e.rental_agreement_id)
        .collect();
    assert_eq!(
        hired,
        vec![None, Some(agreements[0].id), Some(agreements[1].id), None]
    );
}

#[tokio::test]
async fn test_repeat_yes_does_not_issue_second_agreement() {
    let store = Arc::new(
        base_store()
            .with_equipment(equipment(1, EXCAVATOR, 1, 1))
            .with_equipment(equipment(2, EXCAVATOR, 1, 2)),
    );
    let service = service(&store, winter_2024);
    let details = service.create(request(EXCAVATOR, 2)).await.unwrap();
    let id = details.request.id;

    service
        .update_rotation_entry(id, answer(&details, 1, OfferResponse::Yes))
        .await
        .unwrap();
    let details = service
        .update_rotation_entry(id, answer(&details, 1, OfferResponse::Yes))
        .await
        .unwrap();

    assert_eq!(store.rental_agreements().await.len(), 1);
    assert_eq!(details.yes_count, 1);
}

#[tokio::test]
async fn test_cancel_with_agreement_is_rejected() {
    let store = Arc::new(
        base_store()
            .with_equipment(equipment(1, EXCAVATOR, 1, 1))
            .with_equipment(equipment(2, EXCAVATOR, 1, 2)),
    );
    let service = service(&store, winter_2024);
    let details = service.create(request(EXCAVATOR, 2)).await.unwrap();
    let id = details.request.id;
    store.add_attachment(id, "quote.pdf").await;
    store.add_attachment(id, "insurance.pdf").await;

    service
        .update_rotation_entry(id, force_hire(&details, 1))
        .await
        .unwrap();

    let err = assert_err!(service.cancel(id).await);
    assert_eq!(err.code(), Some(ErrorCode::AgreementsExist));
    assert_eq!(err.code().map(|c| c.as_str()), Some("HETS-09"));

    let kept = assert_ok!(service.get(id).await);
    assert_eq!(kept.rotation_list.len(), 2);
    assert_eq!(service.attachments(id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_cancel_complete_request_is_rejected() {
    let store = Arc::new(base_store());
    let service = service(&store, winter_2024);
    // Nothing to hire here, so mark it complete directly in the store
    let id = service.create(request(EXCAVATOR, 1)).await.unwrap().request.id;

    let mut completed = store.get_rental_request(id).await.unwrap().unwrap();
    completed.status = RentalRequestStatus::Complete;
    store.update_rental_request(&completed).await.unwrap();

    let err = assert_err!(service.cancel(id).await);
    assert_eq!(err.code(), Some(ErrorCode::RequestComplete));
}

#[tokio::test]
async fn test_duplicate_in_progress_request() {
    let store = Arc::new(base_store().with_equipment(equipment(1, EXCAVATOR, 1, 1)));
    let service = service(&store, winter_2024);
    service.create(request(EXCAVATOR, 1)).await.unwrap();

    let err = assert_err!(service.create(request(EXCAVATOR, 1)).await);
    assert_eq!(err.code(), Some(ErrorCode::DuplicateInProgress));

    // Other equipment types in the same area are independent
    assert_ok!(service.create(request(DUMP_TRUCK, 1)).await);
}

#[tokio::test]
async fn test_exhausted_block_wraps_to_its_first_entry() {
    let store = Arc::new(
        base_store()
            .with_equipment(equipment(1, EXCAVATOR, 1, 1))
            .with_equipment(equipment(2, EXCAVATOR, 1, 2))
            .with_equipment(equipment(3, EXCAVATOR, 1, 3))
            .with_equipment(equipment(4, EXCAVATOR, 2, 1))
            .with_equipment(equipment(5, EXCAVATOR, 2, 2)),
    );
    let service = service(&store, winter_2024);

    // First request: 1 declines, 2 is hired
    let a = service.create(request(EXCAVATOR, 1)).await.unwrap();
    service
        .update_rotation_entry(a.request.id, answer(&a, 1, OfferResponse::No))
        .await
        .unwrap();
    service
        .update_rotation_entry(a.request.id, answer(&a, 2, OfferResponse::Yes))
        .await
        .unwrap();

    // Second request picks up at 3, the first block-1 entry never answered
    let b = service.create(request(EXCAVATOR, 1)).await.unwrap();
    assert_eq!(call_out(&b), vec![3, 1, 4, 5]);
    assert_eq!(b.request.first_on_rotation_list_id, Some(3));
    assert_contiguous(&b);

    // Every block-1 entry answers, then block 2 fills the request
    for equipment_id in [3, 1] {
        service
            .update_rotation_entry(b.request.id, answer(&b, equipment_id, OfferResponse::No))
            .await
            .unwrap();
    }
    let b = service
        .update_rotation_entry(b.request.id, answer(&b, 4, OfferResponse::Yes))
        .await
        .unwrap();
    assert_eq!(b.request.status, RentalRequestStatus::Complete);

    // Block 1 is exhausted and still has two members: it wraps rather than moving to block 2
    let c = service.create(request(EXCAVATOR, 1)).await.unwrap();
    assert_eq!(call_out(&c), vec![3, 1, 5]);
    assert_eq!(c.request.first_on_rotation_list_id, Some(3));

    let pointer = store
        .get_area_rotation_list(AREA, EXCAVATOR)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(pointer.ask_next.map(|n| n.slot), Some(BlockSlot::Block1));
    assert_eq!(pointer.next_equipment_id(), Some(3));
}

#[tokio::test]
async fn test_new_fiscal_year_restarts_rotation() {
    let store = Arc::new(
        base_store()
            .with_equipment(equipment(1, EXCAVATOR, 1, 1))
            .with_equipment(equipment(2, EXCAVATOR, 1, 2))
            .with_equipment(equipment(3, EXCAVATOR, 1, 3)),
    );

    let march = service(&store, march_2024);
    let last = march.create(request(EXCAVATOR, 1)).await.unwrap();
    march
        .update_rotation_entry(last.request.id, answer(&last, 1, OfferResponse::No))
        .await
        .unwrap();
    march
        .update_rotation_entry(last.request.id, answer(&last, 2, OfferResponse::Yes))
        .await
        .unwrap();

    // April 1 starts a new fiscal year: back to sort order 1 rather than on to 3
    let april = service(&store, april_2024);
    let first = april.create(request(EXCAVATOR, 1)).await.unwrap();
    assert_eq!(call_out(&first), vec![1, 3]);
    assert_eq!(first.request.first_on_rotation_list_id, Some(1));

    let done = april
        .update_rotation_entry(first.request.id, force_hire(&first, 1))
        .await
        .unwrap();
    assert_eq!(done.request.status, RentalRequestStatus::Complete);

    let numbers: Vec<String> = store
        .rental_agreements()
        .await
        .into_iter()
        .map(|a| a.number)
        .collect();
    assert_eq!(numbers, vec!["2024-7-0001", "2025-7-0001"]);
}

#[tokio::test]
async fn test_recalculate_only_touches_in_progress_requests() {
    let store = Arc::new(base_store().with_equipment(equipment(1, EXCAVATOR, 1, 1)));
    let service = service(&store, winter_2024);
    let details = service.create(request(EXCAVATOR, 1)).await.unwrap();
    let id = details.request.id;

    service
        .update_rotation_entry(id, answer(&details, 1, OfferResponse::Yes))
        .await
        .unwrap();
    store.put_equipment(equipment(2, EXCAVATOR, 1, 2)).await;

    let after = assert_ok!(service.recalculate(id).await);
    assert_eq!(after.request.status, RentalRequestStatus::Complete);
    assert_eq!(call_out(&after), vec![1]);
    assert_eq!(after.rotation_list[0].offer_response, Some(OfferResponse::Yes));
}

/// Requires a migrated database: DATABASE_URL=... cargo test -- --ignored
#[tokio::test]
#[ignore]
async fn test_postgres_store_builds_rotation_list() {
    use hets_rotation::repository::Repository;
    use sqlx::postgres::PgPoolOptions;

    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&url)
        .await
        .expect("Failed to connect to database");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    // A fresh area number per run keeps agreement numbers unique
    let area_id: i32 = sqlx::query_scalar(
        r#"
        INSERT INTO local_areas (local_area_number, name)
        SELECT COALESCE(MAX(local_area_number), 0) + 1, 'Test Area' FROM local_areas
        RETURNING id
        "#,
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    let type_id: i32 = sqlx::query_scalar(
        "INSERT INTO equipment_types (name, is_dump_truck) VALUES ('Grader', FALSE) RETURNING id",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    let det_id: i32 = sqlx::query_scalar(
        "INSERT INTO district_equipment_types (name, equipment_type_id) VALUES ('Grader', $1) RETURNING id",
    )
    .bind(type_id)
    .fetch_one(&pool)
    .await
    .unwrap();

    for (block, position) in [(1, 1), (1, 2), (2, 1)] {
        sqlx::query(
            r#"
            INSERT INTO equipment
                (local_area_id, district_equipment_type_id, block_number, number_in_block, seniority, status)
            VALUES ($1, $2, $3, $4, 100, 'approved')
            "#,
        )
        .bind(area_id)
        .bind(det_id)
        .bind(block)
        .bind(position)
        .execute(&pool)
        .await
        .unwrap();
    }

    let service = RentalRequestService::new(
        Arc::new(Repository::new(pool)),
        Arc::new(SeniorityScoringRules::default()),
    );

    let details = service
        .create(CreateRentalRequest {
            local_area_id: area_id,
            district_equipment_type_id: det_id,
            ..request(det_id, 1)
        })
        .await
        .unwrap();

    assert_eq!(details.request.status, RentalRequestStatus::InProgress);
    assert_eq!(details.rotation_list.len(), 3);
    assert_contiguous(&details);
    assert_eq!(
        details.request.first_on_rotation_list_id,
        Some(details.rotation_list[0].equipment_id)
    );

    let details = service
        .update_rotation_entry(details.request.id, force_hire(&details, details.rotation_list[0].equipment_id))
        .await
        .unwrap();
    assert_eq!(details.request.status, RentalRequestStatus::Complete);
    assert!(details.rotation_list[0].rental_agreement_id.is_some());
}
