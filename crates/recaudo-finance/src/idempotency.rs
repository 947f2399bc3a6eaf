use recaudo_core::{LedgerStore, RecaudoError};

/// Whether a collection row already records `payment_id`. Read-only.
pub async fn has_been_applied<S: LedgerStore>(
    store: &S,
    payment_id: &str,
) -> Result<bool, RecaudoError> {
    Ok(store.collection_exists(payment_id.trim()).await?)
}
