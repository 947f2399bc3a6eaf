use recaudo_core::RecaudoError;

const NUMERO_PAGO_DIGITS: usize = 9;

/// Internal `NumeroPago` for an external payment id: the trailing nine
/// characters parsed as an integer, so it fits the legacy INT column and can
/// be re-derived at any time. Falls back to the whole id when the tail does
/// not parse.
pub fn allocate_numero_pago(payment_id: &str) -> Result<i64, RecaudoError> {
    let payment_id = payment_id.trim();
    let char_count = payment_id.chars().count();
    let tail: String = payment_id
        .chars()
        .skip(char_count.saturating_sub(NUMERO_PAGO_DIGITS))
        .collect();

    tail.parse::<i64>()
        .or_else(|_| payment_id.parse::<i64>())
        .map_err(|_| {
            RecaudoError::validation(
                "payment_id",
                format!("payment_id '{payment_id}' cannot be turned into a payment number"),
            )
        })
}
