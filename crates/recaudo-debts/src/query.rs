use std::sync::Arc;

use chrono::{DateTime, Local, NaiveDate, Utc};
use recaudo_core::{
    Client, DebtFilter, DebtLineItem, LedgerStore, PageRequest, RecaudoError, TaxpayerRow,
    TransactionId, category_for,
};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;

use crate::{
    arrears::{ArrearsPolicy, DebtView, format_line_item},
    identifier::{SearchKey, SearchKind, classify_identifier, is_valid_dni},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientSummary {
    pub codigo: String,
    pub documento: Option<String>,
    pub nombre: String,
    pub email: Option<String>,
    pub telefono: Option<String>,
}

impl From<Client> for ClientSummary {
    fn from(client: Client) -> Self {
        let nombre = [client.apellido.as_deref(), client.nombre.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(", ");
        Self {
            codigo: client.codigo.trim().to_string(),
            documento: client.documento.map(|doc| doc.trim().to_string()),
            nombre,
            email: client.email,
            telefono: client.telefono,
        }
    }
}

pub const DEFAULT_PAGE_LIMIT: i64 = 50;
pub const MAX_PAGE_LIMIT: i64 = 500;

/// Checks listing bounds; a missing limit is 50 and a missing offset 0.
pub fn page_request(limit: Option<i64>, offset: Option<i64>) -> Result<PageRequest, RecaudoError> {
    let limit = limit.unwrap_or(DEFAULT_PAGE_LIMIT);
    let offset = offset.unwrap_or(0);
    if !(1..=MAX_PAGE_LIMIT).contains(&limit) {
        return Err(RecaudoError::validation(
            "limit",
            format!("must be between 1 and {MAX_PAGE_LIMIT}"),
        ));
    }
    if offset < 0 {
        return Err(RecaudoError::validation("offset", "must not be negative"));
    }
    Ok(PageRequest { limit, offset })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientPage {
    pub clientes: Vec<ClientSummary>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxpayerSummary {
    pub codigo: String,
    pub nombre_completo: String,
    pub documento: Option<String>,
    pub cantidad_deudas: i64,
}

impl From<TaxpayerRow> for TaxpayerSummary {
    fn from(row: TaxpayerRow) -> Self {
        let nombre_completo = [row.client.apellido.as_deref(), row.client.nombre.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        Self {
            codigo: row.client.codigo.trim().to_string(),
            nombre_completo,
            documento: row.client.documento.map(|doc| doc.trim().to_string()),
            cantidad_deudas: row.unpaid_count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaxpayerPage {
    pub contribuyentes: Vec<TaxpayerSummary>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DebtLookup {
    pub searched_by: SearchKind,
    pub client: Option<ClientSummary>,
    pub line_items: Vec<DebtView>,
}

impl DebtLookup {
    pub fn total(&self) -> Decimal {
        self.line_items.iter().map(|item| item.total).sum()
    }

    /// A document search that matched no client.
    pub fn is_unknown_document(&self) -> bool {
        self.searched_by == SearchKind::Document && self.client.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientDebts {
    pub client: ClientSummary,
    pub line_items: Vec<DebtView>,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectionSummary {
    pub items: Vec<DebtView>,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
    pub count: usize,
    pub ids: Vec<TransactionId>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentRecord {
    pub id_trans: TransactionId,
    pub fecha_pago: Option<DateTime<Utc>>,
    pub numero_pago: Option<i64>,
    pub nro_operacion: Option<String>,
    pub detalle: Option<String>,
    #[serde(with = "rust_decimal::serde::float")]
    pub importe: Decimal,
    pub tipo_bien: Option<String>,
    pub tipo_descripcion: &'static str,
}

impl From<DebtLineItem> for PaymentRecord {
    fn from(row: DebtLineItem) -> Self {
        let category = category_for(row.tipo_bien.as_deref());
        Self {
            id_trans: row.id_trans,
            fecha_pago: row.fecha_pago,
            numero_pago: row.numero_pago,
            nro_operacion: row.nro_operacion,
            detalle: row.detalle,
            importe: row.importe,
            tipo_bien: row.tipo_bien,
            tipo_descripcion: category.description,
        }
    }
}

/// Read side of the portal: what a citizen owes and what they already paid.
pub struct DebtQueryEngine<S> {
    store: Arc<S>,
    policy: ArrearsPolicy,
}

impl<S> Clone for DebtQueryEngine<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            policy: self.policy,
        }
    }
}

impl<S: LedgerStore> DebtQueryEngine<S> {
    pub fn new(store: Arc<S>, policy: ArrearsPolicy) -> Self {
        Self { store, policy }
    }

    pub async fn resolve(&self, identifier: &str) -> Result<DebtLookup, RecaudoError> {
        self.resolve_as_of(identifier, today()).await
    }

    pub async fn resolve_as_of(
        &self,
        identifier: &str,
        today: NaiveDate,
    ) -> Result<DebtLookup, RecaudoError> {
        let key = classify_identifier(identifier)?;
        let searched_by = key.kind();

        let (client, filter) = match key {
            SearchKey::Document(dni) => {
                let Some(client) = self.store.find_client_by_document(&dni).await? else {
                    info!("no client registered for document {dni}");
                    return Ok(DebtLookup {
                        searched_by,
                        client: None,
                        line_items: Vec::new(),
                    });
                };
                let filter = DebtFilter::ClientCode(client.codigo.trim().to_string());
                (Some(client), filter)
            }
            SearchKey::ClientCode(codigo) => {
                let client = self.store.find_client_by_code(&codigo).await?;
                (client, DebtFilter::ClientCode(codigo))
            }
            SearchKey::Plate(plate) => (None, DebtFilter::Plate(plate)),
        };

        let line_items = self.unpaid(&filter, today).await?;
        Ok(DebtLookup {
            searched_by,
            client: client.map(ClientSummary::from),
            line_items,
        })
    }

    pub async fn find_client_by_document(&self, dni: &str) -> Result<ClientDebts, RecaudoError> {
        let dni = dni.trim();
        if !is_valid_dni(dni) {
            return Err(RecaudoError::validation(
                "dni",
                "must be between 7 and 10 digits",
            ));
        }

        let client = self
            .store
            .find_client_by_document(dni)
            .await?
            .ok_or_else(|| RecaudoError::NotFound(format!("client with document {dni}")))?;

        let filter = DebtFilter::ClientCode(client.codigo.trim().to_string());
        let line_items = self.unpaid(&filter, today()).await?;
        let total = line_items.iter().map(|item| item.total).sum();

        Ok(ClientDebts {
            client: client.into(),
            line_items,
            total,
        })
    }

    pub async fn client_by_code(&self, codigo: &str) -> Result<ClientSummary, RecaudoError> {
        let codigo = codigo.trim();
        if codigo.is_empty() {
            return Err(RecaudoError::validation("codigo", "must not be empty"));
        }
        self.store
            .find_client_by_code(codigo)
            .await?
            .map(ClientSummary::from)
            .ok_or_else(|| RecaudoError::NotFound(format!("client {codigo}")))
    }

    pub async fn list_clients(&self, page: PageRequest) -> Result<ClientPage, RecaudoError> {
        let listing = self.store.list_clients(page).await?;
        Ok(ClientPage {
            clientes: listing.rows.into_iter().map(ClientSummary::from).collect(),
            total: listing.total,
            limit: page.limit,
            offset: page.offset,
        })
    }

    /// Clients by surname with how many unpaid items each one has.
    pub async fn list_taxpayers(&self, page: PageRequest) -> Result<TaxpayerPage, RecaudoError> {
        let listing = self.store.list_taxpayers(page).await?;
        Ok(TaxpayerPage {
            contribuyentes: listing.rows.into_iter().map(TaxpayerSummary::from).collect(),
            total: listing.total,
            limit: page.limit,
            offset: page.offset,
        })
    }

    /// Formats the items a citizen picked for payment. Rows that are unknown
    /// or no longer payable are left out.
    pub async fn summarize_selection(
        &self,
        ids: &[TransactionId],
    ) -> Result<SelectionSummary, RecaudoError> {
        if ids.is_empty() {
            return Err(RecaudoError::validation("ids", "select at least one item"));
        }

        let today = today();
        let items: Vec<DebtView> = self
            .store
            .line_items_by_ids(ids)
            .await?
            .iter()
            .filter(|row| row.is_payable())
            .map(|row| format_line_item(row, today, &self.policy))
            .collect();

        Ok(SelectionSummary {
            total: items.iter().map(|item| item.total).sum(),
            count: items.len(),
            ids: items.iter().map(|item| item.id_trans).collect(),
            items,
        })
    }

    pub async fn payment_history(&self, codigo: &str) -> Result<Vec<PaymentRecord>, RecaudoError> {
        let codigo = codigo.trim();
        if codigo.is_empty() {
            return Err(RecaudoError::validation("codigo", "must not be empty"));
        }
        let rows = self.store.collections_for_client(codigo).await?;
        Ok(rows.into_iter().map(PaymentRecord::from).collect())
    }

    async fn unpaid(
        &self,
        filter: &DebtFilter,
        today: NaiveDate,
    ) -> Result<Vec<DebtView>, RecaudoError> {
        let rows = self.store.unpaid_line_items(filter).await?;
        Ok(rows
            .iter()
            .map(|row| format_line_item(row, today, &self.policy))
            .collect())
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}
