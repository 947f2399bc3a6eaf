use std::sync::Arc;

use chrono::{DateTime, Datelike, Local, TimeZone, Utc};
use recaudo_core::{
    LedgerStore, LedgerTx, NewCollectionEntry, PaymentClaim, PaymentConfirmation,
    PaymentNotification, RecaudoError, Settlement, TransactionId, payments::PaymentStatus,
};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Serialize, Serializer, ser::SerializeStruct};
use tracing::{error, info, warn};

use crate::{idempotency::has_been_applied, numbering::allocate_numero_pago};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Settled { detail: String },
    NotFound,
    AlreadyPaid,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemResult {
    pub transaction_id: TransactionId,
    pub outcome: ItemOutcome,
}

impl ItemResult {
    pub fn success(&self) -> bool {
        matches!(self.outcome, ItemOutcome::Settled { .. })
    }

    pub fn reason(&self) -> Option<&'static str> {
        match self.outcome {
            ItemOutcome::Settled { .. } => None,
            ItemOutcome::NotFound => Some("not found"),
            ItemOutcome::AlreadyPaid => Some("already paid"),
        }
    }
}

impl Serialize for ItemResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ItemResult", 3)?;
        state.serialize_field("transaction_id", &self.transaction_id)?;
        state.serialize_field("success", &self.success())?;
        match &self.outcome {
            ItemOutcome::Settled { detail } => state.serialize_field("detail", detail)?,
            _ => state.serialize_field("reason", &self.reason())?,
        }
        state.end()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconciliationResult {
    pub processed: bool,
    pub already_processed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub payment_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub numero_pago: Option<i64>,
    pub settled_count: usize,
    pub total_count: usize,
    pub items: Vec<ItemResult>,
}

impl ReconciliationResult {
    fn not_approved(payment_id: String, status: &PaymentStatus) -> Self {
        Self {
            reason: Some(status.to_string()),
            payment_id,
            ..Self::default()
        }
    }

    fn already_processed(payment_id: String) -> Self {
        Self {
            already_processed: true,
            reason: Some("payment already processed".to_string()),
            payment_id,
            ..Self::default()
        }
    }

    fn applied(payment_id: String, numero_pago: i64, items: Vec<ItemResult>) -> Self {
        Self {
            processed: true,
            payment_id,
            numero_pago: Some(numero_pago),
            settled_count: items.iter().filter(|item| item.success()).count(),
            total_count: items.len(),
            items,
            ..Self::default()
        }
    }
}

/// Applies confirmed gateway payments to the ledger.
///
/// Each confirmation runs in a single store transaction. The first write of
/// that transaction claims the external payment id; a claim that already
/// exists means a concurrent or earlier delivery won, and the whole
/// transaction is rolled back as "already processed".
pub struct ReconciliationEngine<S> {
    store: Arc<S>,
}

impl<S> Clone for ReconciliationEngine<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: LedgerStore> ReconciliationEngine<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub async fn confirm(
        &self,
        notification: PaymentNotification,
    ) -> Result<ReconciliationResult, RecaudoError> {
        let confirmation = PaymentConfirmation::try_from(notification)?;
        self.apply(confirmation).await
    }

    pub async fn apply(
        &self,
        confirmation: PaymentConfirmation,
    ) -> Result<ReconciliationResult, RecaudoError> {
        let payment_id = confirmation.payment_id.clone();

        if confirmation.status != PaymentStatus::Approved {
            info!(
                "payment {} has status {}, nothing to apply",
                payment_id, confirmation.status
            );
            return Ok(ReconciliationResult::not_approved(
                payment_id,
                &confirmation.status,
            ));
        }

        // Only the approved path splits the amount across items.
        if confirmation.conceptos_ids.is_empty() {
            return Err(RecaudoError::validation(
                "metadata.conceptos_ids",
                "metadata.conceptos_ids must reference at least one item",
            ));
        }

        if has_been_applied(self.store.as_ref(), &payment_id).await? {
            info!("payment {} was already applied", payment_id);
            return Ok(ReconciliationResult::already_processed(payment_id));
        }

        let numero_pago = allocate_numero_pago(&payment_id)?;
        let now = Utc::now();
        let settlement = Settlement {
            fecha_pago: confirmation.date_approved.unwrap_or(now),
            numero_pago,
            nro_operacion: payment_id.clone(),
            ejercicio: accounting_year(Local::now()),
        };
        let claim = PaymentClaim {
            nro_operacion: payment_id.clone(),
            numero_pago,
            external_reference: confirmation.external_reference.clone(),
            transaction_amount: confirmation.transaction_amount,
            contribuyente_dni: confirmation.contribuyente_dni.clone(),
            claimed_at: now,
        };

        let mut tx = self.store.begin().await?;
        let items = match settle_items(&mut tx, &confirmation, &claim, &settlement).await {
            Ok(Some(items)) => items,
            Ok(None) => {
                tx.rollback().await?;
                info!("payment {} was claimed by a concurrent delivery", payment_id);
                return Ok(ReconciliationResult::already_processed(payment_id));
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    error!("rollback for payment {} failed: {rollback_err:#}", payment_id);
                }
                error!(
                    "payment {} not applied, items {:?} need manual reconciliation: {err:#}",
                    payment_id, confirmation.conceptos_ids
                );
                return Err(RecaudoError::Infrastructure(err));
            }
        };

        if let Err(err) = tx.commit().await {
            error!(
                "commit for payment {} failed, items {:?} need manual reconciliation: {err:#}",
                payment_id, confirmation.conceptos_ids
            );
            return Err(RecaudoError::Infrastructure(err));
        }

        let result = ReconciliationResult::applied(payment_id, numero_pago, items);
        info!(
            "payment {} applied as numero_pago {}: {}/{} items settled",
            result.payment_id, numero_pago, result.settled_count, result.total_count
        );
        Ok(result)
    }
}

/// Accounting period of a settlement: the calendar year at the municipality,
/// not in UTC.
fn accounting_year<Tz: TimeZone>(now: DateTime<Tz>) -> String {
    now.year().to_string()
}

/// Equal split of the payment across the referenced items. The notification
/// carries no per-item amounts.
fn share_per_item(total: Decimal, items: usize) -> Decimal {
    (total / Decimal::from(items as u64))
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

async fn settle_items<T: LedgerTx>(
    tx: &mut T,
    confirmation: &PaymentConfirmation,
    claim: &PaymentClaim,
    settlement: &Settlement,
) -> anyhow::Result<Option<Vec<ItemResult>>> {
    if !tx.claim_payment(claim).await? {
        return Ok(None);
    }

    let share = share_per_item(
        confirmation.transaction_amount,
        confirmation.conceptos_ids.len(),
    );
    let mut results = Vec::with_capacity(confirmation.conceptos_ids.len());

    for &transaction_id in &confirmation.conceptos_ids {
        let Some(debt) = tx.fetch_line_item(transaction_id).await? else {
            warn!(
                "payment {}: ledger row {} not found",
                settlement.nro_operacion, transaction_id
            );
            results.push(ItemResult {
                transaction_id,
                outcome: ItemOutcome::NotFound,
            });
            continue;
        };

        if debt.is_settled() {
            warn!(
                "payment {}: ledger row {} is already paid",
                settlement.nro_operacion, transaction_id
            );
            results.push(ItemResult {
                transaction_id,
                outcome: ItemOutcome::AlreadyPaid,
            });
            continue;
        }

        tx.mark_settled(transaction_id, settlement).await?;
        let entry = NewCollectionEntry::offsetting(&debt, settlement, share);
        let detail = entry.detalle.clone();
        tx.insert_collection(&entry).await?;

        info!(
            "payment {}: ledger row {} settled ({})",
            settlement.nro_operacion, transaction_id, detail
        );
        results.push(ItemResult {
            transaction_id,
            outcome: ItemOutcome::Settled { detail },
        });
    }

    Ok(Some(results))
}
