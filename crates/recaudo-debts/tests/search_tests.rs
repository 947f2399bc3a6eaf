use std::sync::Arc;

use chrono::{NaiveDate, TimeZone, Utc};
use recaudo_core::{Client, DebtLineItem, RecaudoError, Settlement};
use recaudo_debts::{ArrearsPolicy, DebtQueryEngine, SearchKind, page_request};
use recaudo_ledger::InMemoryLedgerStore;
use rust_decimal::Decimal;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn client(codigo: &str, dni: &str) -> Client {
    Client {
        codigo: codigo.to_string(),
        documento: Some(dni.to_string()),
        nombre: Some("Ana".to_string()),
        apellido: Some("Pereyra".to_string()),
        email: Some("ana@example.com".to_string()),
        telefono: None,
    }
}

async fn seeded() -> InMemoryLedgerStore {
    let store = InMemoryLedgerStore::new();
    store.insert_client(client("0012345", "12345678")).await;

    let mut property = DebtLineItem::debt(10, "0012345", Decimal::new(1000, 0));
    property.detalle = Some("TASA INMOBILIARIA".to_string());
    property.tipo_bien = Some("INMU".to_string());
    property.fecha = Some(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
    property.fecha_vto = Some(date(2025, 1, 1));
    property.ano_cuota = Some(2025);
    property.nro_cuota = Some(1);
    store.insert_line_item(property).await;

    let mut newer = DebtLineItem::debt(11, "0012345", Decimal::new(250, 0));
    newer.tipo_bien = Some("INMU".to_string());
    newer.fecha = Some(Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap());
    store.insert_line_item(newer).await;

    let mut paid = DebtLineItem::debt(12, "0012345", Decimal::new(300, 0));
    paid.saldo = Decimal::ZERO;
    paid.es_pago = Some(1);
    store.insert_line_item(paid).await;

    let mut vehicle = DebtLineItem::debt(20, "0099999", Decimal::new(800, 0));
    vehicle.detalle = Some("PATENTE".to_string());
    vehicle.tipo_bien = Some("AUAU".to_string());
    vehicle.dominio = Some("ABC123".to_string());
    store.insert_line_item(vehicle).await;

    store
}

fn engine(store: &InMemoryLedgerStore) -> DebtQueryEngine<InMemoryLedgerStore> {
    DebtQueryEngine::new(Arc::new(store.clone()), ArrearsPolicy::default())
}

#[tokio::test]
async fn document_search_resolves_client_and_lists_unpaid_newest_first() {
    let store = seeded().await;
    let lookup = engine(&store)
        .resolve_as_of("12345678", date(2026, 1, 1))
        .await
        .unwrap();

    assert_eq!(lookup.searched_by, SearchKind::Document);
    let client = lookup.client.as_ref().unwrap();
    assert_eq!(client.codigo, "0012345");
    assert_eq!(client.nombre, "Pereyra, Ana");

    let ids: Vec<_> = lookup.line_items.iter().map(|item| item.id_trans).collect();
    assert_eq!(ids, vec![11, 10]);

    let overdue = &lookup.line_items[1];
    assert_eq!(overdue.dias_mora, 365);
    assert_eq!(overdue.interes, Decimal::new(40000, 2));
    assert_eq!(overdue.total, Decimal::new(1400, 0));
    assert_eq!(lookup.total(), Decimal::new(1650, 0));
}

#[tokio::test]
async fn unknown_document_yields_no_client_and_no_items() {
    let store = seeded().await;
    let lookup = engine(&store).resolve("87654321").await.unwrap();

    assert!(lookup.is_unknown_document());
    assert!(lookup.line_items.is_empty());
}

#[tokio::test]
async fn client_code_and_plate_searches_use_their_filters() {
    let store = seeded().await;
    let engine = engine(&store);

    let by_code = engine.resolve("0012345").await.unwrap();
    assert_eq!(by_code.searched_by, SearchKind::ClientCode);
    assert_eq!(by_code.line_items.len(), 2);
    assert!(by_code.client.is_some());

    let by_plate = engine.resolve("ABC123").await.unwrap();
    assert_eq!(by_plate.searched_by, SearchKind::Plate);
    assert_eq!(by_plate.line_items.len(), 1);
    assert_eq!(by_plate.line_items[0].detalle, "PATENTE ABC123");
    assert_eq!(by_plate.line_items[0].tipo_descripcion, "Automotor");

    let unknown_plate = engine.resolve("1234567").await.unwrap();
    assert!(unknown_plate.line_items.is_empty());
    assert!(!unknown_plate.is_unknown_document());
}

#[tokio::test]
async fn malformed_identifier_is_rejected() {
    let store = seeded().await;
    assert!(matches!(
        engine(&store).resolve("123").await,
        Err(RecaudoError::Validation { .. })
    ));
}

#[tokio::test]
async fn find_client_by_document_validates_and_reports_missing_clients() {
    let store = seeded().await;
    let engine = engine(&store);

    assert!(matches!(
        engine.find_client_by_document("12AB").await,
        Err(RecaudoError::Validation { field: "dni", .. })
    ));
    assert!(matches!(
        engine.find_client_by_document("99999999").await,
        Err(RecaudoError::NotFound(_))
    ));

    let found = engine.find_client_by_document("12345678").await.unwrap();
    assert_eq!(found.client.codigo, "0012345");
    assert_eq!(found.line_items.len(), 2);
    assert_eq!(
        found.total,
        found.line_items.iter().map(|item| item.total).sum::<Decimal>()
    );
}

#[tokio::test]
async fn selection_summary_skips_unknown_and_settled_rows() {
    let store = seeded().await;
    let engine = engine(&store);

    assert!(matches!(
        engine.summarize_selection(&[]).await,
        Err(RecaudoError::Validation { field: "ids", .. })
    ));

    let summary = engine.summarize_selection(&[11, 12, 404, 20]).await.unwrap();
    assert_eq!(summary.ids, vec![11, 20]);
    assert_eq!(summary.count, 2);
    assert_eq!(summary.total, Decimal::new(1050, 0));
}

#[tokio::test]
async fn payment_history_lists_collections_newest_first() {
    use recaudo_core::{LedgerStore, LedgerTx, NewCollectionEntry};

    let store = seeded().await;
    for (id, day) in [(10, 5), (11, 9)] {
        let debt = store.line_item(id).await.unwrap();
        let settlement = Settlement {
            fecha_pago: Utc.with_ymd_and_hms(2026, 2, day, 12, 0, 0).unwrap(),
            numero_pago: i64::from(day),
            nro_operacion: format!("op-{day}"),
            ejercicio: "2026".to_string(),
        };
        let mut tx = store.begin().await.unwrap();
        tx.mark_settled(id, &settlement).await.unwrap();
        tx.insert_collection(&NewCollectionEntry::offsetting(&debt, &settlement, debt.importe))
            .await
            .unwrap();
        tx.commit().await.unwrap();
    }

    let history = engine(&store).payment_history("0012345").await.unwrap();
    let numbers: Vec<_> = history.iter().map(|record| record.numero_pago).collect();
    assert_eq!(numbers, vec![Some(9), Some(5)]);
    assert_eq!(history[0].tipo_descripcion, "Inmobiliario");

    assert!(engine(&store).payment_history("0099999").await.unwrap().is_empty());
}

#[tokio::test]
async fn client_by_code_trims_and_reports_missing_clients() {
    let store = seeded().await;
    let engine = engine(&store);

    let found = engine.client_by_code(" 0012345 ").await.unwrap();
    assert_eq!(found.documento.as_deref(), Some("12345678"));
    assert_eq!(found.nombre, "Pereyra, Ana");

    assert!(matches!(
        engine.client_by_code("  ").await,
        Err(RecaudoError::Validation { field: "codigo", .. })
    ));
    assert!(matches!(
        engine.client_by_code("0099999").await,
        Err(RecaudoError::NotFound(_))
    ));
}

#[test]
fn page_bounds_default_and_reject_out_of_range_values() {
    let page = page_request(None, None).unwrap();
    assert_eq!((page.limit, page.offset), (50, 0));

    assert!(matches!(
        page_request(Some(0), None),
        Err(RecaudoError::Validation { field: "limit", .. })
    ));
    assert!(matches!(
        page_request(Some(501), None),
        Err(RecaudoError::Validation { field: "limit", .. })
    ));
    assert!(matches!(
        page_request(Some(10), Some(-1)),
        Err(RecaudoError::Validation { field: "offset", .. })
    ));
}

#[tokio::test]
async fn client_and_taxpayer_listings_echo_the_window() {
    let store = seeded().await;
    let mut second = client("0000007", "23456789");
    second.apellido = Some("Acosta".to_string());
    second.nombre = Some("Luis".to_string());
    store.insert_client(second).await;
    let engine = engine(&store);

    let clients = engine
        .list_clients(page_request(Some(1), Some(0)).unwrap())
        .await
        .unwrap();
    assert_eq!(clients.total, 2);
    assert_eq!((clients.limit, clients.offset), (1, 0));
    assert_eq!(clients.clientes.len(), 1);
    assert_eq!(clients.clientes[0].codigo, "0000007");

    let taxpayers = engine
        .list_taxpayers(page_request(None, None).unwrap())
        .await
        .unwrap();
    assert_eq!(taxpayers.total, 2);
    assert_eq!(taxpayers.limit, 50);
    let names: Vec<_> = taxpayers
        .contribuyentes
        .iter()
        .map(|row| row.nombre_completo.as_str())
        .collect();
    assert_eq!(names, vec!["Acosta Luis", "Pereyra Ana"]);
    assert_eq!(taxpayers.contribuyentes[0].cantidad_deudas, 0);
    // The settled row 12 is not counted.
    assert_eq!(taxpayers.contribuyentes[1].cantidad_deudas, 2);
}
