use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::standards::{
    COLLECTION_MOVEMENT, DEFAULT_COLLECTION_ACCOUNT, RECEIPT_MOVEMENT_TYPE,
};

/// Store-assigned identifier of a ledger row (`IdTrans`).
pub type TransactionId = i64;

/// One row of the client current-account ledger. Debts and collection
/// entries share this shape; collections carry `cod_movim = "D"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebtLineItem {
    pub id_trans: TransactionId,
    pub codigo: String,
    pub fecha: Option<DateTime<Utc>>,
    pub cod_movim: Option<String>,
    pub detalle: Option<String>,
    pub importe: Decimal,
    pub saldo: Decimal,
    pub tipo_movim: Option<String>,
    pub fecha_vto: Option<NaiveDate>,
    pub cuenta_contable: Option<String>,
    pub es_pago: Option<i32>,
    pub tipo_bien: Option<String>,
    pub ano_cuota: Option<i32>,
    pub nro_cuota: Option<i32>,
    pub id_bien: Option<i32>,
    pub dominio: Option<String>,
    pub nro_operacion: Option<String>,
    pub fecha_pago: Option<DateTime<Utc>>,
    pub numero_pago: Option<i64>,
    pub ejercicio: Option<String>,
}

impl DebtLineItem {
    /// A blank debt row for `codigo`; callers fill in the remaining columns.
    pub fn debt(id_trans: TransactionId, codigo: &str, importe: Decimal) -> Self {
        Self {
            id_trans,
            codigo: codigo.to_string(),
            fecha: None,
            cod_movim: None,
            detalle: None,
            importe,
            saldo: importe,
            tipo_movim: None,
            fecha_vto: None,
            cuenta_contable: None,
            es_pago: None,
            tipo_bien: None,
            ano_cuota: None,
            nro_cuota: None,
            id_bien: None,
            dominio: None,
            nro_operacion: None,
            fecha_pago: None,
            numero_pago: None,
            ejercicio: None,
        }
    }

    pub fn is_payable(&self) -> bool {
        !self.saldo.is_zero()
    }

    pub fn is_settled(&self) -> bool {
        self.saldo.is_zero() && self.es_pago == Some(1)
    }

    pub fn is_collection(&self) -> bool {
        self.cod_movim.as_deref() == Some(COLLECTION_MOVEMENT)
    }

    /// Receipt text written on the collection entry, e.g. `PAGO 2024 003 AUAU`.
    pub fn collection_detail(&self) -> String {
        let anio = self
            .ano_cuota
            .map(|value| value.to_string())
            .unwrap_or_else(|| "0000".to_string());
        let cuota = format!("{:03}", self.nro_cuota.unwrap_or(0));
        let tipo = self
            .tipo_bien
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or("xxxx");

        format!("PAGO {anio} {cuota} {tipo}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub codigo: String,
    pub documento: Option<String>,
    pub nombre: Option<String>,
    pub apellido: Option<String>,
    pub email: Option<String>,
    pub telefono: Option<String>,
}

/// A client together with how many payable rows they still have.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaxpayerRow {
    pub client: Client,
    pub unpaid_count: i64,
}

/// Window over an ordered listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub limit: i64,
    pub offset: i64,
}

/// One window of a listing plus the size of the whole listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub rows: Vec<T>,
    pub total: i64,
}

/// Columns written on a debt row when a payment settles it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settlement {
    pub fecha_pago: DateTime<Utc>,
    pub numero_pago: i64,
    pub nro_operacion: String,
    pub ejercicio: String,
}

/// Collection row to insert as the counterpart of a settled debt.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCollectionEntry {
    pub codigo: String,
    pub fecha: DateTime<Utc>,
    pub detalle: String,
    pub importe: Decimal,
    pub cuenta_contable: String,
    pub tipo_bien: Option<String>,
    pub ano_cuota: Option<i32>,
    pub nro_cuota: Option<i32>,
    pub id_bien: Option<i32>,
    pub settlement: Settlement,
}

impl NewCollectionEntry {
    pub fn offsetting(debt: &DebtLineItem, settlement: &Settlement, importe: Decimal) -> Self {
        Self {
            codigo: debt.codigo.clone(),
            fecha: settlement.fecha_pago,
            detalle: debt.collection_detail(),
            importe,
            cuenta_contable: debt
                .cuenta_contable
                .as_deref()
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .unwrap_or(DEFAULT_COLLECTION_ACCOUNT)
                .to_string(),
            tipo_bien: debt.tipo_bien.clone(),
            ano_cuota: debt.ano_cuota,
            nro_cuota: debt.nro_cuota,
            id_bien: debt.id_bien,
            settlement: settlement.clone(),
        }
    }

    /// The ledger row this entry becomes once the store assigns `id_trans`.
    pub fn into_line_item(self, id_trans: TransactionId) -> DebtLineItem {
        DebtLineItem {
            id_trans,
            codigo: self.codigo,
            fecha: Some(self.fecha),
            cod_movim: Some(COLLECTION_MOVEMENT.to_string()),
            detalle: Some(self.detalle),
            importe: self.importe,
            saldo: Decimal::ZERO,
            tipo_movim: Some(RECEIPT_MOVEMENT_TYPE.to_string()),
            fecha_vto: None,
            cuenta_contable: Some(self.cuenta_contable),
            es_pago: Some(1),
            tipo_bien: self.tipo_bien,
            ano_cuota: self.ano_cuota,
            nro_cuota: self.nro_cuota,
            id_bien: self.id_bien,
            dominio: None,
            nro_operacion: Some(self.settlement.nro_operacion),
            fecha_pago: Some(self.settlement.fecha_pago),
            numero_pago: Some(self.settlement.numero_pago),
            ejercicio: Some(self.settlement.ejercicio),
        }
    }
}
