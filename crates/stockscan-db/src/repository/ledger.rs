//! # Ledger Repository
//!
//! Committed sale and debt lines.
//!
//! ## Line Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  insert_lines([..])   one SQL transaction for the whole batch          │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  update_line(id, ..)  mutated in place                                  │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  delete_line(id)      removed                                           │
//! │                                                                         │
//! │  codes_sold_among(store, codes) reads unit_codes of every line of the  │
//! │  store, whatever its kind: a unit on a debt line has left the shelf    │
//! │  just like a sold one.                                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use stockscan_core::codes;
use stockscan_core::{CommittedLine, LedgerKind, LineEdit, PaymentMethod, SettlementStatus};

#[derive(Debug, sqlx::FromRow)]
struct LineRow {
    id: String,
    transaction_id: String,
    store_id: String,
    kind: LedgerKind,
    product_id: String,
    product_name: String,
    quantity: i64,
    unit_price_cents: i64,
    amount_cents: i64,
    unit_codes: String,
    unit_tags: String,
    counterparty: Option<String>,
    settlement: SettlementStatus,
    payment_method: Option<PaymentMethod>,
    amount_paid_cents: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<LineRow> for CommittedLine {
    fn from(row: LineRow) -> Self {
        let (unit_codes, unit_tags) = codes::decode_units(&row.unit_codes, &row.unit_tags);
        CommittedLine {
            id: row.id,
            transaction_id: row.transaction_id,
            store_id: row.store_id,
            kind: row.kind,
            product_id: row.product_id,
            product_name: row.product_name,
            quantity: row.quantity,
            unit_price_cents: row.unit_price_cents,
            amount_cents: row.amount_cents,
            unit_codes,
            unit_tags,
            counterparty: row.counterparty,
            settlement: row.settlement,
            payment_method: row.payment_method,
            amount_paid_cents: row.amount_paid_cents,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const SELECT_LINE: &str = r#"
    SELECT id, transaction_id, store_id, kind, product_id, product_name,
           quantity, unit_price_cents, amount_cents, unit_codes, unit_tags,
           counterparty, settlement, payment_method, amount_paid_cents,
           created_at, updated_at
    FROM committed_lines
"#;

/// Repository for committed ledger lines.
#[derive(Debug, Clone)]
pub struct LedgerRepository {
    pool: SqlitePool,
}

impl LedgerRepository {
    /// Creates a new LedgerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        LedgerRepository { pool }
    }

    /// Inserts a batch of lines in one transaction.
    ///
    /// Every list is encoded before the transaction starts, so a line with an
    /// unstorable code fails the batch without touching the database.
    ///
    /// ## Returns
    /// The ids of the inserted lines, in input order.
    pub async fn insert_lines(&self, lines: &[CommittedLine]) -> DbResult<Vec<String>> {
        let encoded = lines
            .iter()
            .map(|line| -> DbResult<(String, String)> {
                Ok((
                    codes::encode_list("unit_codes", &line.unit_codes)?,
                    codes::encode_list("unit_tags", &line.unit_tags)?,
                ))
            })
            .collect::<DbResult<Vec<(String, String)>>>()?;

        let mut tx = self.pool.begin().await?;

        for (line, (unit_codes, unit_tags)) in lines.iter().zip(encoded) {
            sqlx::query(
                r#"
                INSERT INTO committed_lines (
                    id, transaction_id, store_id, kind, product_id, product_name,
                    quantity, unit_price_cents, amount_cents, unit_codes, unit_tags,
                    counterparty, settlement, payment_method, amount_paid_cents,
                    created_at, updated_at
                ) VALUES (
                    ?1, ?2, ?3, ?4, ?5, ?6,
                    ?7, ?8, ?9, ?10, ?11,
                    ?12, ?13, ?14, ?15,
                    ?16, ?17
                )
                "#,
            )
            .bind(&line.id)
            .bind(&line.transaction_id)
            .bind(&line.store_id)
            .bind(line.kind)
            .bind(&line.product_id)
            .bind(&line.product_name)
            .bind(line.quantity)
            .bind(line.unit_price_cents)
            .bind(line.amount_cents)
            .bind(unit_codes)
            .bind(unit_tags)
            .bind(&line.counterparty)
            .bind(line.settlement)
            .bind(line.payment_method)
            .bind(line.amount_paid_cents)
            .bind(line.created_at)
            .bind(line.updated_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        info!(count = lines.len(), "Inserted committed lines");
        Ok(lines.iter().map(|line| line.id.clone()).collect())
    }

    /// Gets a line by id.
    pub async fn get(&self, id: &str) -> DbResult<Option<CommittedLine>> {
        let row: Option<LineRow> = sqlx::query_as(&format!("{SELECT_LINE} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(CommittedLine::from))
    }

    /// Lines committed together as one transaction.
    pub async fn list_by_transaction(&self, transaction_id: &str) -> DbResult<Vec<CommittedLine>> {
        let rows: Vec<LineRow> = sqlx::query_as(&format!(
            "{SELECT_LINE} WHERE transaction_id = ?1 ORDER BY created_at, rowid"
        ))
        .bind(transaction_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(CommittedLine::from).collect())
    }

    /// A store's lines, newest first, optionally of one kind.
    pub async fn list_by_store(
        &self,
        store_id: &str,
        kind: Option<LedgerKind>,
    ) -> DbResult<Vec<CommittedLine>> {
        let rows: Vec<LineRow> = sqlx::query_as(&format!(
            "{SELECT_LINE} WHERE store_id = ?1 AND (?2 IS NULL OR kind = ?2) \
             ORDER BY created_at DESC, rowid DESC"
        ))
        .bind(store_id)
        .bind(kind)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(CommittedLine::from).collect())
    }

    /// Returns the subset of `candidates` that appear on any committed line
    /// of the store (case-insensitive, exact element match).
    ///
    /// Codes are returned as spelled in `candidates`.
    pub async fn codes_sold_among(
        &self,
        store_id: &str,
        candidates: &[String],
    ) -> DbResult<HashSet<String>> {
        let wanted: Vec<String> = candidates
            .iter()
            .map(|code| codes::normalize(code))
            .filter(|code| !code.is_empty())
            .collect();
        if wanted.is_empty() {
            return Ok(HashSet::new());
        }

        let json = serde_json::to_string(&wanted)?;

        let sold: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT DISTINCT j.value
            FROM json_each(?2) AS j
            WHERE EXISTS (
                SELECT 1 FROM committed_lines cl
                WHERE cl.store_id = ?1
                  AND instr(',' || lower(cl.unit_codes) || ',', ',' || lower(j.value) || ',') > 0
            )
            "#,
        )
        .bind(store_id)
        .bind(json)
        .fetch_all(&self.pool)
        .await?;

        debug!(
            store_id = %store_id,
            checked = wanted.len(),
            sold = sold.len(),
            "Checked sold codes"
        );
        Ok(sold.into_iter().collect())
    }

    /// Applies an edit in place.
    ///
    /// Amount and settlement status are recomputed from the edit.
    pub async fn update_line(&self, id: &str, edit: &LineEdit) -> DbResult<CommittedLine> {
        let unit_codes = codes::encode_list("unit_codes", &edit.unit_codes)?;
        let unit_tags = codes::encode_list("unit_tags", &edit.unit_tags)?;
        let amount_cents = edit.amount_cents();
        let settlement = SettlementStatus::from_amounts(edit.amount_paid_cents, amount_cents);

        let result = sqlx::query(
            r#"
            UPDATE committed_lines SET
                quantity = ?2,
                unit_price_cents = ?3,
                amount_cents = ?4,
                unit_codes = ?5,
                unit_tags = ?6,
                counterparty = ?7,
                settlement = ?8,
                payment_method = ?9,
                amount_paid_cents = ?10,
                updated_at = ?11
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(edit.quantity)
        .bind(edit.unit_price_cents)
        .bind(amount_cents)
        .bind(unit_codes)
        .bind(unit_tags)
        .bind(&edit.counterparty)
        .bind(settlement)
        .bind(edit.payment_method)
        .bind(edit.amount_paid_cents)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Committed line", id));
        }

        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found("Committed line", id))
    }

    /// Removes a line.
    pub async fn delete_line(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM committed_lines WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Committed line", id));
        }

        debug!(id = %id, "Deleted committed line");
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
