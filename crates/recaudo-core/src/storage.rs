use async_trait::async_trait;

use crate::{
    models::{
        Client, DebtLineItem, NewCollectionEntry, Page, PageRequest, Settlement, TaxpayerRow,
        TransactionId,
    },
    payments::PaymentClaim,
};

/// Which unpaid rows a debt search selects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebtFilter {
    ClientCode(String),
    Plate(String),
}

/// Repository over the client current-account ledger.
///
/// Reads outside a transaction go straight to the store; every mutation
/// happens through a [`LedgerTx`] obtained from [`LedgerStore::begin`].
#[async_trait]
pub trait LedgerStore: Send + Sync + 'static {
    type Tx: LedgerTx;

    async fn begin(&self) -> anyhow::Result<Self::Tx>;

    /// True when a collection row already carries `nro_operacion`.
    async fn collection_exists(&self, nro_operacion: &str) -> anyhow::Result<bool>;

    async fn find_client_by_document(&self, documento: &str) -> anyhow::Result<Option<Client>>;

    async fn find_client_by_code(&self, codigo: &str) -> anyhow::Result<Option<Client>>;

    /// Clients ordered by `codigo`.
    async fn list_clients(&self, page: PageRequest) -> anyhow::Result<Page<Client>>;

    /// Clients ordered by surname then name, each with its count of payable rows.
    async fn list_taxpayers(&self, page: PageRequest) -> anyhow::Result<Page<TaxpayerRow>>;

    /// Rows with `saldo != 0` matching `filter`, newest `fecha` first.
    async fn unpaid_line_items(&self, filter: &DebtFilter) -> anyhow::Result<Vec<DebtLineItem>>;

    async fn line_items_by_ids(&self, ids: &[TransactionId]) -> anyhow::Result<Vec<DebtLineItem>>;

    /// Collection rows of a client, newest `fecha_pago` first.
    async fn collections_for_client(&self, codigo: &str) -> anyhow::Result<Vec<DebtLineItem>>;
}

/// One unit of work against the ledger. Dropping it without `commit`
/// discards every write.
#[async_trait]
pub trait LedgerTx: Send {
    /// Records the payment as applied. Returns false when another
    /// transaction already holds the claim.
    async fn claim_payment(&mut self, claim: &PaymentClaim) -> anyhow::Result<bool>;

    /// Reads a row and locks it for the rest of the transaction.
    async fn fetch_line_item(&mut self, id: TransactionId) -> anyhow::Result<Option<DebtLineItem>>;

    async fn mark_settled(&mut self, id: TransactionId, settlement: &Settlement) -> anyhow::Result<()>;

    async fn insert_collection(&mut self, entry: &NewCollectionEntry) -> anyhow::Result<TransactionId>;

    async fn commit(self) -> anyhow::Result<()>;

    async fn rollback(self) -> anyhow::Result<()>;
}
