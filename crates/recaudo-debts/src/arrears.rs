use chrono::NaiveDate;
use recaudo_core::{DebtLineItem, TransactionId, category_for};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

const DAYS_PER_YEAR: i64 = 365;

/// Simple (non-compounding) daily interest on overdue debts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArrearsPolicy {
    pub annual_rate_percent: Decimal,
}

impl Default for ArrearsPolicy {
    fn default() -> Self {
        Self {
            annual_rate_percent: Decimal::new(40, 0),
        }
    }
}

impl ArrearsPolicy {
    pub fn daily_rate(&self) -> Decimal {
        self.annual_rate_percent / Decimal::ONE_HUNDRED / Decimal::from(DAYS_PER_YEAR)
    }

    pub fn interest(&self, importe: Decimal, dias_mora: i64) -> Decimal {
        if dias_mora <= 0 || importe <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        // Divide last so 40% over 365 days stays exact.
        let accrued = importe * self.annual_rate_percent * Decimal::from(dias_mora)
            / (Decimal::ONE_HUNDRED * Decimal::from(DAYS_PER_YEAR));
        round2(accrued)
    }
}

/// An unpaid line item as shown to the citizen.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DebtView {
    pub id_trans: TransactionId,
    pub fecha: Option<NaiveDate>,
    pub fecha_vto: Option<NaiveDate>,
    pub detalle: String,
    pub cuota: String,
    pub tipo_bien: Option<String>,
    pub tipo_descripcion: &'static str,
    pub tipo_icono: &'static str,
    #[serde(with = "rust_decimal::serde::float")]
    pub importe: Decimal,
    pub dias_mora: i64,
    #[serde(with = "rust_decimal::serde::float")]
    pub interes: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
}

pub fn days_overdue(due: Option<NaiveDate>, today: NaiveDate) -> i64 {
    due.map(|due| (today - due).num_days().max(0)).unwrap_or(0)
}

pub fn format_line_item(item: &DebtLineItem, today: NaiveDate, policy: &ArrearsPolicy) -> DebtView {
    let dias_mora = days_overdue(item.fecha_vto, today);
    let interes = policy.interest(item.importe, dias_mora);
    let category = category_for(item.tipo_bien.as_deref());

    let detalle = format!(
        "{} {}",
        item.detalle.as_deref().unwrap_or("").trim(),
        item.dominio.as_deref().unwrap_or("").trim()
    )
    .trim()
    .to_string();
    let cuota = match (item.nro_cuota, item.ano_cuota) {
        (Some(nro), Some(ano)) => format!("{nro}/{ano}"),
        _ => String::new(),
    };

    DebtView {
        id_trans: item.id_trans,
        fecha: item.fecha.map(|fecha| fecha.date_naive()),
        fecha_vto: item.fecha_vto,
        detalle,
        cuota,
        tipo_bien: item.tipo_bien.as_deref().map(str::trim).map(str::to_string),
        tipo_descripcion: category.description,
        tipo_icono: category.icon,
        importe: item.importe,
        dias_mora,
        interes,
        total: round2(item.importe + interes),
    }
}

fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}
