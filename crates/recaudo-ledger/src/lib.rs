use std::{
    cmp::Reverse,
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use async_trait::async_trait;
use recaudo_core::{
    Client, DebtFilter, DebtLineItem, LedgerStore, LedgerTx, NewCollectionEntry, Page,
    PageRequest, PaymentClaim, Settlement, TaxpayerRow, TransactionId,
    standards::VEHICLE_CATEGORY,
};
use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Clone, Default)]
struct LedgerState {
    clients: Vec<Client>,
    rows: BTreeMap<TransactionId, DebtLineItem>,
    claims: HashMap<String, PaymentClaim>,
}

impl LedgerState {
    fn next_id(&self) -> TransactionId {
        self.rows.keys().next_back().copied().unwrap_or(0) + 1
    }
}

/// Ledger kept in process memory. A transaction takes the store lock for its
/// whole lifetime and works on a private copy that replaces the shared state
/// on commit, so transactions are serialised and all-or-nothing.
#[derive(Clone, Default)]
pub struct InMemoryLedgerStore {
    state: Arc<Mutex<LedgerState>>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_client(&self, client: Client) {
        self.state.lock().await.clients.push(client);
    }

    /// Stores `item` under its own `id_trans`, or the next free id when it is 0.
    pub async fn insert_line_item(&self, mut item: DebtLineItem) -> TransactionId {
        let mut state = self.state.lock().await;
        if item.id_trans == 0 {
            item.id_trans = state.next_id();
        }
        let id = item.id_trans;
        state.rows.insert(id, item);
        id
    }

    pub async fn line_item(&self, id: TransactionId) -> Option<DebtLineItem> {
        self.state.lock().await.rows.get(&id).cloned()
    }

    pub async fn collections_for_payment(&self, nro_operacion: &str) -> Vec<DebtLineItem> {
        self.state
            .lock()
            .await
            .rows
            .values()
            .filter(|row| row.is_collection() && row.nro_operacion.as_deref() == Some(nro_operacion))
            .cloned()
            .collect()
    }

    pub async fn claim(&self, nro_operacion: &str) -> Option<PaymentClaim> {
        self.state.lock().await.claims.get(nro_operacion).cloned()
    }

    pub async fn row_count(&self) -> usize {
        self.state.lock().await.rows.len()
    }
}

fn matches_filter(row: &DebtLineItem, filter: &DebtFilter) -> bool {
    match filter {
        DebtFilter::ClientCode(codigo) => row.codigo.trim() == codigo,
        DebtFilter::Plate(plate) => {
            row.tipo_bien.as_deref().map(str::trim) == Some(VEHICLE_CATEGORY)
                && row.dominio.as_deref().map(str::trim) == Some(plate.as_str())
        }
    }
}

fn window<T>(rows: Vec<T>, page: PageRequest) -> Page<T> {
    let total = rows.len() as i64;
    let start = usize::try_from(page.offset).unwrap_or(0).min(rows.len());
    let limit = usize::try_from(page.limit).unwrap_or(0);
    Page {
        rows: rows.into_iter().skip(start).take(limit).collect(),
        total,
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    type Tx = InMemoryLedgerTx;

    async fn begin(&self) -> anyhow::Result<Self::Tx> {
        let guard = self.state.clone().lock_owned().await;
        let staged = guard.clone();
        Ok(InMemoryLedgerTx { guard, staged })
    }

    async fn collection_exists(&self, nro_operacion: &str) -> anyhow::Result<bool> {
        let state = self.state.lock().await;
        Ok(state.rows.values().any(|row| {
            row.is_collection() && row.nro_operacion.as_deref() == Some(nro_operacion)
        }))
    }

    async fn find_client_by_document(&self, documento: &str) -> anyhow::Result<Option<Client>> {
        let state = self.state.lock().await;
        Ok(state
            .clients
            .iter()
            .find(|client| client.documento.as_deref().map(str::trim) == Some(documento.trim()))
            .cloned())
    }

    async fn find_client_by_code(&self, codigo: &str) -> anyhow::Result<Option<Client>> {
        let state = self.state.lock().await;
        Ok(state
            .clients
            .iter()
            .find(|client| client.codigo.trim() == codigo.trim())
            .cloned())
    }

    async fn list_clients(&self, page: PageRequest) -> anyhow::Result<Page<Client>> {
        let state = self.state.lock().await;
        let mut clients = state.clients.clone();
        clients.sort_by(|a, b| a.codigo.trim().cmp(b.codigo.trim()));
        Ok(window(clients, page))
    }

    async fn list_taxpayers(&self, page: PageRequest) -> anyhow::Result<Page<TaxpayerRow>> {
        let state = self.state.lock().await;
        let mut taxpayers: Vec<TaxpayerRow> = state
            .clients
            .iter()
            .map(|client| TaxpayerRow {
                unpaid_count: state
                    .rows
                    .values()
                    .filter(|row| row.is_payable() && row.codigo.trim() == client.codigo.trim())
                    .count() as i64,
                client: client.clone(),
            })
            .collect();
        // Missing surnames or names sort last.
        taxpayers.sort_by_key(|row| {
            (
                row.client.apellido.is_none(),
                row.client.apellido.clone(),
                row.client.nombre.is_none(),
                row.client.nombre.clone(),
            )
        });
        Ok(window(taxpayers, page))
    }

    async fn unpaid_line_items(&self, filter: &DebtFilter) -> anyhow::Result<Vec<DebtLineItem>> {
        let state = self.state.lock().await;
        let mut rows: Vec<DebtLineItem> = state
            .rows
            .values()
            .filter(|row| row.is_payable() && matches_filter(row, filter))
            .cloned()
            .collect();
        rows.sort_by_key(|row| Reverse((row.fecha, row.id_trans)));
        Ok(rows)
    }

    async fn line_items_by_ids(&self, ids: &[TransactionId]) -> anyhow::Result<Vec<DebtLineItem>> {
        let state = self.state.lock().await;
        Ok(ids
            .iter()
            .filter_map(|id| state.rows.get(id).cloned())
            .collect())
    }

    async fn collections_for_client(&self, codigo: &str) -> anyhow::Result<Vec<DebtLineItem>> {
        let state = self.state.lock().await;
        let mut rows: Vec<DebtLineItem> = state
            .rows
            .values()
            .filter(|row| {
                row.is_collection() && row.es_pago == Some(1) && row.codigo.trim() == codigo.trim()
            })
            .cloned()
            .collect();
        rows.sort_by_key(|row| Reverse((row.fecha_pago, row.id_trans)));
        Ok(rows)
    }
}

pub struct InMemoryLedgerTx {
    guard: OwnedMutexGuard<LedgerState>,
    staged: LedgerState,
}

#[async_trait]
impl LedgerTx for InMemoryLedgerTx {
    async fn claim_payment(&mut self, claim: &PaymentClaim) -> anyhow::Result<bool> {
        if self.staged.claims.contains_key(&claim.nro_operacion) {
            return Ok(false);
        }
        self.staged
            .claims
            .insert(claim.nro_operacion.clone(), claim.clone());
        Ok(true)
    }

    async fn fetch_line_item(&mut self, id: TransactionId) -> anyhow::Result<Option<DebtLineItem>> {
        Ok(self.staged.rows.get(&id).cloned())
    }

    async fn mark_settled(&mut self, id: TransactionId, settlement: &Settlement) -> anyhow::Result<()> {
        let row = self
            .staged
            .rows
            .get_mut(&id)
            .ok_or_else(|| anyhow::anyhow!("ledger row {id} vanished inside transaction"))?;

        row.saldo = Decimal::ZERO;
        row.es_pago = Some(1);
        row.fecha_pago = Some(settlement.fecha_pago);
        row.numero_pago = Some(settlement.numero_pago);
        row.nro_operacion = Some(settlement.nro_operacion.clone());
        row.ejercicio = Some(settlement.ejercicio.clone());
        Ok(())
    }

    async fn insert_collection(&mut self, entry: &NewCollectionEntry) -> anyhow::Result<TransactionId> {
        let id = self.staged.next_id();
        self.staged
            .rows
            .insert(id, entry.clone().into_line_item(id));
        Ok(id)
    }

    async fn commit(self) -> anyhow::Result<()> {
        let mut guard = self.guard;
        *guard = self.staged;
        Ok(())
    }

    async fn rollback(self) -> anyhow::Result<()> {
        Ok(())
    }
}
