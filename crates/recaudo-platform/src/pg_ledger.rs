use async_trait::async_trait;
use recaudo_core::{
    Client, DebtFilter, DebtLineItem, LedgerStore, LedgerTx, NewCollectionEntry, Page,
    PageRequest, PaymentClaim, Settlement, TaxpayerRow, TransactionId,
    standards::VEHICLE_CATEGORY,
};
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};

const LINE_ITEM_COLUMNS: &str = "id_trans, codigo, fecha, cod_movim, detalle, importe, saldo, \
     tipo_movim, fecha_vto, cuenta_contable, es_pago, tipo_bien, ano_cuota, nro_cuota, id_bien, \
     dominio, nro_operacion, fecha_pago, numero_pago, ejercicio";

const CLIENT_COLUMNS: &str = "codigo, documento, nombre, apellido, email, telefono";

/// Ledger backed by the `clientes_cta_cte` current-account table.
#[derive(Clone)]
pub struct PgLedgerStore {
    pool: PgPool,
}

impl PgLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn line_item_from_row(row: &PgRow) -> Result<DebtLineItem, sqlx::Error> {
    Ok(DebtLineItem {
        id_trans: row.try_get("id_trans")?,
        codigo: row.try_get::<String, _>("codigo")?.trim().to_string(),
        fecha: row.try_get("fecha")?,
        cod_movim: row.try_get("cod_movim")?,
        detalle: row.try_get("detalle")?,
        importe: row.try_get("importe")?,
        saldo: row.try_get("saldo")?,
        tipo_movim: row.try_get("tipo_movim")?,
        fecha_vto: row.try_get("fecha_vto")?,
        cuenta_contable: row.try_get("cuenta_contable")?,
        es_pago: row.try_get("es_pago")?,
        tipo_bien: row.try_get("tipo_bien")?,
        ano_cuota: row.try_get("ano_cuota")?,
        nro_cuota: row.try_get("nro_cuota")?,
        id_bien: row.try_get("id_bien")?,
        dominio: row.try_get("dominio")?,
        nro_operacion: row.try_get("nro_operacion")?,
        fecha_pago: row.try_get("fecha_pago")?,
        numero_pago: row.try_get("numero_pago")?,
        ejercicio: row.try_get("ejercicio")?,
    })
}

fn client_from_row(row: &PgRow) -> Result<Client, sqlx::Error> {
    Ok(Client {
        codigo: row.try_get::<String, _>("codigo")?.trim().to_string(),
        documento: row.try_get("documento")?,
        nombre: row.try_get("nombre")?,
        apellido: row.try_get("apellido")?,
        email: row.try_get("email")?,
        telefono: row.try_get("telefono")?,
    })
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    type Tx = PgLedgerTx;

    async fn begin(&self) -> anyhow::Result<Self::Tx> {
        let tx = self.pool.begin().await?;
        Ok(PgLedgerTx { tx })
    }

    async fn collection_exists(&self, nro_operacion: &str) -> anyhow::Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM clientes_cta_cte WHERE nro_operacion = $1 AND cod_movim = 'D')",
        )
        .bind(nro_operacion)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn find_client_by_document(&self, documento: &str) -> anyhow::Result<Option<Client>> {
        let row = sqlx::query(&format!(
            "SELECT {CLIENT_COLUMNS} FROM clientes WHERE TRIM(documento) = $1 LIMIT 1"
        ))
        .bind(documento.trim())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(client_from_row).transpose()?)
    }

    async fn find_client_by_code(&self, codigo: &str) -> anyhow::Result<Option<Client>> {
        let row = sqlx::query(&format!(
            "SELECT {CLIENT_COLUMNS} FROM clientes WHERE TRIM(codigo) = $1 LIMIT 1"
        ))
        .bind(codigo.trim())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(client_from_row).transpose()?)
    }

    async fn list_clients(&self, page: PageRequest) -> anyhow::Result<Page<Client>> {
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM clientes")
            .fetch_one(&self.pool)
            .await?;
        let rows = sqlx::query(&format!(
            "SELECT {CLIENT_COLUMNS} FROM clientes ORDER BY codigo ASC LIMIT $1 OFFSET $2"
        ))
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(Page {
            rows: rows
                .iter()
                .map(client_from_row)
                .collect::<Result<Vec<_>, _>>()?,
            total,
        })
    }

    async fn list_taxpayers(&self, page: PageRequest) -> anyhow::Result<Page<TaxpayerRow>> {
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM clientes")
            .fetch_one(&self.pool)
            .await?;
        let rows = sqlx::query(
            "SELECT c.codigo, c.documento, c.nombre, c.apellido, c.email, c.telefono, \
             (SELECT COUNT(*) FROM clientes_cta_cte m \
              WHERE TRIM(m.codigo) = TRIM(c.codigo) AND m.saldo <> 0) AS unpaid_count \
             FROM clientes c \
             ORDER BY c.apellido ASC NULLS LAST, c.nombre ASC NULLS LAST \
             LIMIT $1 OFFSET $2",
        )
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;

        let mut taxpayers = Vec::with_capacity(rows.len());
        for row in &rows {
            taxpayers.push(TaxpayerRow {
                client: client_from_row(row)?,
                unpaid_count: row.try_get("unpaid_count")?,
            });
        }
        Ok(Page {
            rows: taxpayers,
            total,
        })
    }

    async fn unpaid_line_items(&self, filter: &DebtFilter) -> anyhow::Result<Vec<DebtLineItem>> {
        let rows = match filter {
            DebtFilter::ClientCode(codigo) => {
                let sql = format!(
                    "SELECT {LINE_ITEM_COLUMNS} FROM clientes_cta_cte \
                     WHERE TRIM(codigo) = $1 AND saldo <> 0 \
                     ORDER BY fecha DESC NULLS LAST, id_trans DESC"
                );
                sqlx::query(&sql)
                    .bind(codigo.trim())
                    .fetch_all(&self.pool)
                    .await?
            }
            DebtFilter::Plate(plate) => {
                let sql = format!(
                    "SELECT {LINE_ITEM_COLUMNS} FROM clientes_cta_cte \
                     WHERE TRIM(tipo_bien) = $1 AND TRIM(dominio) = $2 AND saldo <> 0 \
                     ORDER BY fecha DESC NULLS LAST, id_trans DESC"
                );
                sqlx::query(&sql)
                    .bind(VEHICLE_CATEGORY)
                    .bind(plate.trim())
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        Ok(rows
            .iter()
            .map(line_item_from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }

    async fn line_items_by_ids(&self, ids: &[TransactionId]) -> anyhow::Result<Vec<DebtLineItem>> {
        let rows = sqlx::query(&format!(
            "SELECT {LINE_ITEM_COLUMNS} FROM clientes_cta_cte WHERE id_trans = ANY($1)"
        ))
        .bind(ids.to_vec())
        .fetch_all(&self.pool)
        .await?;

        let mut items = rows
            .iter()
            .map(line_item_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        items.sort_by_key(|item| ids.iter().position(|id| *id == item.id_trans));
        Ok(items)
    }

    async fn collections_for_client(&self, codigo: &str) -> anyhow::Result<Vec<DebtLineItem>> {
        let rows = sqlx::query(&format!(
            "SELECT {LINE_ITEM_COLUMNS} FROM clientes_cta_cte \
             WHERE TRIM(codigo) = $1 AND cod_movim = 'D' AND es_pago = 1 \
             ORDER BY fecha_pago DESC NULLS LAST, id_trans DESC"
        ))
        .bind(codigo.trim())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(line_item_from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }
}

/// A postgres transaction. Dropped without commit, sqlx rolls it back.
pub struct PgLedgerTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl LedgerTx for PgLedgerTx {
    async fn claim_payment(&mut self, claim: &PaymentClaim) -> anyhow::Result<bool> {
        let inserted = sqlx::query(
            "INSERT INTO payment_applications \
             (nro_operacion, numero_pago, external_reference, transaction_amount, contribuyente_dni, claimed_at) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (nro_operacion) DO NOTHING",
        )
        .bind(&claim.nro_operacion)
        .bind(claim.numero_pago)
        .bind(&claim.external_reference)
        .bind(claim.transaction_amount)
        .bind(&claim.contribuyente_dni)
        .bind(claim.claimed_at)
        .execute(&mut *self.tx)
        .await?
        .rows_affected();

        Ok(inserted == 1)
    }

    async fn fetch_line_item(&mut self, id: TransactionId) -> anyhow::Result<Option<DebtLineItem>> {
        let row = sqlx::query(&format!(
            "SELECT {LINE_ITEM_COLUMNS} FROM clientes_cta_cte WHERE id_trans = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(row.as_ref().map(line_item_from_row).transpose()?)
    }

    async fn mark_settled(&mut self, id: TransactionId, settlement: &Settlement) -> anyhow::Result<()> {
        let updated = sqlx::query(
            "UPDATE clientes_cta_cte \
             SET saldo = 0, es_pago = 1, fecha_pago = $2, numero_pago = $3, nro_operacion = $4, ejercicio = $5 \
             WHERE id_trans = $1",
        )
        .bind(id)
        .bind(settlement.fecha_pago)
        .bind(settlement.numero_pago)
        .bind(&settlement.nro_operacion)
        .bind(&settlement.ejercicio)
        .execute(&mut *self.tx)
        .await?
        .rows_affected();

        if updated != 1 {
            anyhow::bail!("ledger row {id} vanished inside transaction");
        }
        Ok(())
    }

    async fn insert_collection(&mut self, entry: &NewCollectionEntry) -> anyhow::Result<TransactionId> {
        let id = sqlx::query_scalar::<_, TransactionId>(
            "INSERT INTO clientes_cta_cte \
             (codigo, fecha, cod_movim, detalle, importe, saldo, tipo_movim, cuenta_contable, es_pago, \
              tipo_bien, ano_cuota, nro_cuota, id_bien, nro_operacion, fecha_pago, numero_pago, ejercicio) \
             VALUES ($1, $2, 'D', $3, $4, 0, 'RR', $5, 1, $6, $7, $8, $9, $10, $11, $12, $13) \
             RETURNING id_trans",
        )
        .bind(&entry.codigo)
        .bind(entry.fecha)
        .bind(&entry.detalle)
        .bind(entry.importe)
        .bind(&entry.cuenta_contable)
        .bind(&entry.tipo_bien)
        .bind(entry.ano_cuota)
        .bind(entry.nro_cuota)
        .bind(entry.id_bien)
        .bind(&entry.settlement.nro_operacion)
        .bind(entry.settlement.fecha_pago)
        .bind(entry.settlement.numero_pago)
        .bind(&entry.settlement.ejercicio)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(id)
    }

    async fn commit(self) -> anyhow::Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> anyhow::Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
