//! Query-path tests for the in-memory backend: listing filters, ordering,
//! pagination, overview rows, and the emoji refresher write.

use rust_decimal::Decimal;
use time::macros::datetime;
use time::OffsetDateTime;
use uuid::Uuid;

use fleetline_core::DispatchStatus;
use fleetline_storage::{
    CargoRecord, DispatchStorage, DriverRecord, LogisticFilter, LogisticRecord, MemoryStorage,
};

const T0: OffsetDateTime = datetime!(2025-03-01 00:00 UTC);

fn driver(company_id: Uuid, surname: &str) -> DriverRecord {
    DriverRecord {
        id: Uuid::new_v4(),
        name: "Sam".to_string(),
        surname: surname.to_string(),
        driver_type: "SOLO".to_string(),
        position: "OW".to_string(),
        company_id,
    }
}

fn logistic(driver_id: Uuid, status: DispatchStatus) -> LogisticRecord {
    LogisticRecord {
        id: Uuid::new_v4(),
        driver_id,
        post: false,
        status,
        effective_since: T0,
        estimated_at: None,
        scheduled_at: None,
        state: "IL".to_string(),
        location: "Chicago, IL".to_string(),
        emoji: String::new(),
        note: String::new(),
        cargo_id: None,
        version: 0,
        updated_at: T0,
    }
}

async fn seed(storage: &MemoryStorage, rows: &[(DriverRecord, DispatchStatus)]) {
    let mut tx = storage.begin().await.unwrap();
    for (d, status) in rows {
        storage.insert_driver(&mut tx, d.clone()).await.unwrap();
        storage
            .insert_logistic(&mut tx, logistic(d.id, *status))
            .await
            .unwrap();
    }
    storage.commit(tx).await.unwrap();
}

#[tokio::test]
async fn listing_orders_by_company_then_status_rank() {
    let storage = MemoryStorage::new();
    let company_a = Uuid::from_u128(1);
    let company_b = Uuid::from_u128(2);

    seed(
        &storage,
        &[
            (driver(company_b, "Baker"), DispatchStatus::Ready),
            (driver(company_a, "Cole"), DispatchStatus::AtHome),
            (driver(company_a, "Ames"), DispatchStatus::Ready),
            (driver(company_a, "Dunn"), DispatchStatus::Covered),
        ],
    )
    .await;

    let (rows, total) = storage
        .list_logistics(&LogisticFilter::default())
        .await
        .unwrap();
    assert_eq!(total, 4);

    let order: Vec<(Uuid, DispatchStatus)> = rows
        .iter()
        .map(|r| (r.company_id, r.logistic.status))
        .collect();
    assert_eq!(
        order,
        vec![
            (company_a, DispatchStatus::Ready),
            (company_a, DispatchStatus::Covered),
            (company_a, DispatchStatus::AtHome),
            (company_b, DispatchStatus::Ready),
        ]
    );
}

#[tokio::test]
async fn listing_filters_by_status_and_company() {
    let storage = MemoryStorage::new();
    let company_a = Uuid::from_u128(1);
    let company_b = Uuid::from_u128(2);

    seed(
        &storage,
        &[
            (driver(company_a, "Ames"), DispatchStatus::Ready),
            (driver(company_a, "Cole"), DispatchStatus::AtHome),
            (driver(company_b, "Baker"), DispatchStatus::Ready),
        ],
    )
    .await;

    let filter = LogisticFilter {
        status: Some(DispatchStatus::Ready),
        company_ids: vec![company_a],
        ..LogisticFilter::default()
    };
    let (rows, total) = storage.list_logistics(&filter).await.unwrap();
    assert_eq!(total, 1);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].driver_surname, "Ames");
}

#[tokio::test]
async fn listing_paginates_and_reports_full_count() {
    let storage = MemoryStorage::new();
    let company = Uuid::from_u128(7);
    let seeded: Vec<(DriverRecord, DispatchStatus)> = (0..5)
        .map(|i| (driver(company, &format!("S{i}")), DispatchStatus::Ready))
        .collect();
    seed(&storage, &seeded).await;

    let filter = LogisticFilter {
        page: 2,
        limit: 2,
        ..LogisticFilter::default()
    };
    let (rows, total) = storage.list_logistics(&filter).await.unwrap();
    assert_eq!(total, 5);
    assert_eq!(rows.len(), 2);
}

#[tokio::test]
async fn overview_rows_join_company_ids() {
    let storage = MemoryStorage::new();
    let company_a = Uuid::from_u128(1);
    let company_b = Uuid::from_u128(2);

    seed(
        &storage,
        &[
            (driver(company_a, "Ames"), DispatchStatus::Ready),
            (driver(company_b, "Baker"), DispatchStatus::AtHome),
        ],
    )
    .await;

    let mut rows = storage.overview_rows().await.unwrap();
    rows.sort_by_key(|r| r.company_id);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].company_id, company_a);
    assert_eq!(rows[0].status, DispatchStatus::Ready);
    assert_eq!(rows[1].company_id, company_b);
}

#[tokio::test]
async fn refresh_emojis_rewrites_every_row() {
    let storage = MemoryStorage::new();
    let company = Uuid::from_u128(3);
    seed(
        &storage,
        &[
            (driver(company, "Ames"), DispatchStatus::Ready),
            (driver(company, "Baker"), DispatchStatus::Covered),
        ],
    )
    .await;

    fn pick(status: DispatchStatus) -> &'static str {
        match status {
            DispatchStatus::Ready => "R",
            _ => "X",
        }
    }

    let touched = storage.refresh_emojis(pick).await.unwrap();
    assert_eq!(touched, 2);

    let (rows, _) = storage
        .list_logistics(&LogisticFilter::default())
        .await
        .unwrap();
    for row in rows {
        let expected = pick(row.logistic.status);
        assert_eq!(row.logistic.emoji, expected);
    }
}

#[tokio::test]
async fn cargo_rate_survives_round_trip() {
    // Decimal rates must come back exactly, not as floats.
    let storage = MemoryStorage::new();
    let d = driver(Uuid::from_u128(9), "Ames");
    let mut rec = logistic(d.id, DispatchStatus::Covered);
    let cargo = CargoRecord {
        id: Uuid::new_v4(),
        external_id: "LD-7".to_string(),
        provider: "TQL".to_string(),
        loaded_miles: 900,
        free_miles: 25,
        origin: "Chicago, IL".to_string(),
        destination: "Denver, CO".to_string(),
        cost: 2400,
        rate: Decimal::new(275, 2),
        pickup_at: datetime!(2025-03-02 08:00 UTC),
        delivery_at: datetime!(2025-03-04 16:00 UTC),
        booked_by: Uuid::new_v4(),
        created_at: T0,
        updated_at: T0,
    };
    rec.cargo_id = Some(cargo.id);

    let mut tx = storage.begin().await.unwrap();
    storage.insert_driver(&mut tx, d).await.unwrap();
    storage.insert_cargo(&mut tx, cargo.clone()).await.unwrap();
    storage.insert_logistic(&mut tx, rec.clone()).await.unwrap();
    storage.commit(tx).await.unwrap();

    let joined = storage.get_logistic(rec.id).await.unwrap();
    let got = joined.cargo.expect("joined cargo");
    assert_eq!(got.rate, Decimal::new(275, 2));
    assert_eq!(got.rate.to_string(), "2.75");
}
