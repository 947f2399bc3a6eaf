use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use recaudo_core::{
    Client, DebtFilter, DebtLineItem, LedgerStore, Page, PageRequest, TaxpayerRow, TransactionId,
};
use recaudo_debts::ArrearsPolicy;
use recaudo_ledger::{InMemoryLedgerStore, InMemoryLedgerTx};
use recaudo_platform::{GatewayError, PaymentGateway, PaymentPreference, PreferenceRequest};
use recaudo_portal::{AppState, app};
use rust_decimal::Decimal;
use serde_json::{Value, json};
use tower::ServiceExt;

/// Stands in for the upstream gateway; fails when `down` is set.
#[derive(Default)]
struct StubGateway {
    down: bool,
    requests: Mutex<Vec<PreferenceRequest>>,
}

#[async_trait]
impl PaymentGateway for StubGateway {
    async fn create_preference(
        &self,
        request: PreferenceRequest,
    ) -> Result<PaymentPreference, GatewayError> {
        self.requests.lock().unwrap().push(request);
        if self.down {
            return Err(GatewayError::Unreachable("connection refused".to_string()));
        }
        Ok(PaymentPreference {
            payment_url: "https://checkout.example/live/1".to_string(),
            sandbox_url: "https://checkout.example/sandbox/1".to_string(),
            external_reference: "MUNI-manzano-0001".to_string(),
            preference_id: Some("pref-1".to_string()),
        })
    }
}

/// Reads go to the in-memory ledger; opening a transaction fails as if the
/// database dropped the connection.
struct ReadOnlyStore {
    inner: InMemoryLedgerStore,
}

#[async_trait]
impl LedgerStore for ReadOnlyStore {
    type Tx = InMemoryLedgerTx;

    async fn begin(&self) -> anyhow::Result<Self::Tx> {
        anyhow::bail!("pool timed out while waiting for an open connection to 10.0.0.5")
    }

    async fn collection_exists(&self, nro_operacion: &str) -> anyhow::Result<bool> {
        self.inner.collection_exists(nro_operacion).await
    }

    async fn find_client_by_document(&self, documento: &str) -> anyhow::Result<Option<Client>> {
        self.inner.find_client_by_document(documento).await
    }

    async fn find_client_by_code(&self, codigo: &str) -> anyhow::Result<Option<Client>> {
        self.inner.find_client_by_code(codigo).await
    }

    async fn list_clients(&self, page: PageRequest) -> anyhow::Result<Page<Client>> {
        self.inner.list_clients(page).await
    }

    async fn list_taxpayers(&self, page: PageRequest) -> anyhow::Result<Page<TaxpayerRow>> {
        self.inner.list_taxpayers(page).await
    }

    async fn unpaid_line_items(&self, filter: &DebtFilter) -> anyhow::Result<Vec<DebtLineItem>> {
        self.inner.unpaid_line_items(filter).await
    }

    async fn line_items_by_ids(&self, ids: &[TransactionId]) -> anyhow::Result<Vec<DebtLineItem>> {
        self.inner.line_items_by_ids(ids).await
    }

    async fn collections_for_client(&self, codigo: &str) -> anyhow::Result<Vec<DebtLineItem>> {
        self.inner.collections_for_client(codigo).await
    }
}

async fn seeded_store() -> InMemoryLedgerStore {
    let store = InMemoryLedgerStore::new();
    store
        .insert_client(Client {
            codigo: "0012345".to_string(),
            documento: Some("12345678".to_string()),
            nombre: Some("Ana".to_string()),
            apellido: Some("Pereyra".to_string()),
            email: None,
            telefono: None,
        })
        .await;
    for (id, cuota) in [(101, 1), (102, 2)] {
        let mut debt = DebtLineItem::debt(id, "0012345", Decimal::new(1500, 0));
        debt.tipo_bien = Some("AUAU".to_string());
        debt.dominio = Some("ABC123".to_string());
        debt.ano_cuota = Some(2026);
        debt.nro_cuota = Some(cuota);
        store.insert_line_item(debt).await;
    }
    store
}

fn test_app(store: &InMemoryLedgerStore, gateway: Arc<StubGateway>) -> axum::Router {
    let state = AppState::new(
        Arc::new(store.clone()),
        ArrearsPolicy::default(),
        gateway,
        false,
    );
    app(state)
}

async fn body_json(response: axum::http::Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn webhook(payment_id: &str, status: &str) -> Value {
    json!({
        "external_reference": "MUNI-manzano-0001",
        "status": status,
        "status_detail": "accredited",
        "payment_id": payment_id,
        "transaction_amount": 3000,
        "date_approved": "2026-03-10T14:30:00.000-03:00",
        "metadata": { "conceptos_ids": [101, 102], "contribuyente_dni": "12345678" }
    })
}

#[tokio::test]
async fn healthz_is_ok() {
    let store = seeded_store().await;
    let response = test_app(&store, Arc::default())
        .oneshot(get("/healthz"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn debt_search_by_document_returns_items_and_total() {
    let store = seeded_store().await;
    let response = test_app(&store, Arc::default())
        .oneshot(get("/api/clientes/deudas/12345678"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["searched_by"], "document");
    assert_eq!(body["data"]["client"]["codigo"], "0012345");
    assert_eq!(body["data"]["count"], 2);
    assert_eq!(body["data"]["total"], 3000.0);
}

#[tokio::test]
async fn debt_search_errors_use_the_error_envelope() {
    let store = seeded_store().await;
    let app = test_app(&store, Arc::default());

    let response = app.clone().oneshot(get("/api/clientes/deudas/123")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let response = app.clone().oneshot(get("/api/clientes/deudas/87654321")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"]["code"], "NOT_FOUND");

    let response = app.oneshot(get("/api/clientes/deudas/XYZ987")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["count"], 0);
}

#[tokio::test]
async fn dni_lookup_and_selection_summary() {
    let store = seeded_store().await;
    let app = test_app(&store, Arc::default());

    let response = app
        .clone()
        .oneshot(get("/api/clientes/buscar/dni/12345678"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["client"]["nombre"], "Pereyra, Ana");

    let response = app
        .clone()
        .oneshot(get("/api/clientes/buscar/dni/99999999"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .clone()
        .oneshot(post_json("/api/clientes/generar-pago", json!({ "ids": [102] })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["ids"], json!([102]));
    assert_eq!(body["data"]["total"], 1500.0);

    let response = app
        .oneshot(post_json("/api/clientes/generar-pago", json!({ "ids": [] })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn initiating_a_payment_returns_the_sandbox_redirect() {
    let store = seeded_store().await;
    let gateway = Arc::new(StubGateway::default());
    let response = test_app(&store, Arc::clone(&gateway))
        .oneshot(post_json(
            "/pago/iniciar",
            json!({
                "conceptos": [{ "IdTrans": 101, "Detalle": "PATENTE ABC123", "Total": 1500 }],
                "contribuyente": { "dni": "12345678", "nombre": "Ana Pereyra" },
                "montoTotal": 1500
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["redirect_url"], "https://checkout.example/sandbox/1");
    assert_eq!(body["external_reference"], "MUNI-manzano-0001");

    let requests = gateway.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].conceptos[0].id_trans, 101);
    assert_eq!(requests[0].monto_total, Decimal::new(1500, 0));
}

#[tokio::test]
async fn incomplete_tickets_are_rejected_before_the_gateway() {
    let store = seeded_store().await;
    let gateway = Arc::new(StubGateway::default());
    let app = test_app(&store, Arc::clone(&gateway));

    for ticket in [
        json!({ "conceptos": [], "contribuyente": { "dni": "12345678" }, "montoTotal": 10 }),
        json!({ "conceptos": [{ "IdTrans": 101, "Total": 10 }], "montoTotal": 10 }),
        json!({ "conceptos": [{ "IdTrans": 101, "Total": 10 }], "contribuyente": { "dni": "12345678" }, "montoTotal": 0 }),
    ] {
        let response = app
            .clone()
            .oneshot(post_json("/pago/iniciar", ticket))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
    assert!(gateway.requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn gateway_failure_is_a_generic_internal_error() {
    let store = seeded_store().await;
    let gateway = Arc::new(StubGateway {
        down: true,
        ..StubGateway::default()
    });
    let response = test_app(&store, gateway)
        .oneshot(post_json(
            "/pago/iniciar",
            json!({
                "conceptos": [{ "IdTrans": 101, "Total": 1500 }],
                "contribuyente": { "dni": "12345678" },
                "montoTotal": 1500
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "INTERNAL_ERROR");
    assert!(!body["error"]["message"].as_str().unwrap().contains("connection refused"));
}

#[tokio::test]
async fn webhook_applies_once_and_acknowledges_duplicates() {
    let store = seeded_store().await;
    let app = test_app(&store, Arc::default());

    let response = app
        .clone()
        .oneshot(post_json("/api/pagos/confirmacion", webhook("1234567890123", "approved")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["received"], true);
    assert_eq!(body["processed"], true);
    assert_eq!(body["numero_pago"], 567890123);
    assert_eq!(body["settled_count"], 2);

    let response = app
        .clone()
        .oneshot(post_json("/api/pagos/confirmacion", webhook("1234567890123", "approved")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["processed"], false);
    assert_eq!(body["already_processed"], true);

    assert_eq!(store.collections_for_payment("1234567890123").await.len(), 2);

    let response = app
        .oneshot(get("/api/clientes/0012345/pagos"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["count"], 2);
}

#[tokio::test]
async fn webhook_reports_non_approved_and_malformed_deliveries() {
    let store = seeded_store().await;
    let app = test_app(&store, Arc::default());

    let response = app
        .clone()
        .oneshot(post_json("/api/pagos/confirmacion", webhook("555", "rejected")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["received"], true);
    assert_eq!(body["processed"], false);
    assert!(store.line_item(101).await.unwrap().is_payable());

    let mut missing_items = webhook("556", "approved");
    missing_items["metadata"] = json!({});
    let response = app
        .clone()
        .oneshot(post_json("/api/pagos/confirmacion", missing_items))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["received"], false);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/pagos/confirmacion")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["received"], false);
}

#[tokio::test]
async fn webhook_storage_failure_asks_for_redelivery_without_details() {
    let store = seeded_store().await;
    let state = AppState::new(
        Arc::new(ReadOnlyStore {
            inner: store.clone(),
        }),
        ArrearsPolicy::default(),
        Arc::new(StubGateway::default()),
        false,
    );

    let response = app(state)
        .oneshot(post_json("/api/pagos/confirmacion", webhook("1234567890123", "approved")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["received"], true);
    assert_eq!(body["processed"], false);
    let message = body["message"].as_str().unwrap();
    assert!(!message.contains("pool timed out"));
    assert!(!message.contains("10.0.0.5"));

    assert!(store.line_item(101).await.unwrap().is_payable());
    assert!(store.collections_for_payment("1234567890123").await.is_empty());
}

#[tokio::test]
async fn client_routes_list_and_fetch_by_code() {
    let store = seeded_store().await;
    store
        .insert_client(Client {
            codigo: "0000900".to_string(),
            documento: Some("30111222".to_string()),
            nombre: Some("Bruno".to_string()),
            apellido: Some("Alvarez".to_string()),
            email: None,
            telefono: None,
        })
        .await;
    let app = test_app(&store, Arc::default());

    let response = app.clone().oneshot(get("/api/clientes")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["total"], 2);
    assert_eq!(body["data"]["limit"], 50);
    assert_eq!(body["data"]["offset"], 0);
    assert_eq!(body["data"]["clientes"][0]["codigo"], "0000900");

    let response = app
        .clone()
        .oneshot(get("/api/clientes/contribuyentes?limit=1&offset=1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["total"], 2);
    assert_eq!(
        body["data"]["contribuyentes"],
        json!([{
            "codigo": "0012345",
            "nombreCompleto": "Pereyra Ana",
            "documento": "12345678",
            "cantidadDeudas": 2
        }])
    );

    let response = app.clone().oneshot(get("/api/clientes/0012345")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["nombre"], "Pereyra, Ana");

    let response = app.clone().oneshot(get("/api/clientes/0099999")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"]["code"], "NOT_FOUND");

    for uri in ["/api/clientes?limit=0", "/api/clientes?offset=-5", "/api/clientes?limit=many"] {
        let response = app.clone().oneshot(get(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(body_json(response).await["error"]["code"], "VALIDATION_ERROR");
    }
}
