//! Collaborator gateways
//!
//! PostgreSQL-backed implementations of the warehouse collaborators billing
//! depends on: document numbering, stock moves, invoice issuance and income
//! account resolution.

use coldstore_core::{
    models::InvoiceHandle,
    traits::{AccountResolver, InvoiceDraft, InvoiceIssuer, MoveHandle, Sequencer, StockMover,
        StockMoveRequest},
    AppError, AppResult,
};
use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::{debug, error, info, instrument, warn};

/// Sequence-table backed document numbering
pub struct PgSequencer {
    pool: PgPool,
}

impl PgSequencer {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Sequencer for PgSequencer {
    #[instrument(skip(self))]
    async fn next_document_number(&self, series: &str) -> AppResult<String> {
        // The UPDATE takes a row lock, so concurrent callers get distinct
        // numbers.
        let row: Option<(String, i64, i32)> = sqlx::query_as(
            r#"
            UPDATE document_sequences
            SET next_number = next_number + 1
            WHERE series = $1
            RETURNING prefix, next_number - 1, padding
            "#,
        )
        .bind(series)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error advancing sequence {}: {}", series, e);
            AppError::Sequence(format!("Failed to advance sequence {}: {}", series, e))
        })?;

        let (prefix, number, padding) = row.ok_or_else(|| {
            AppError::Sequence(format!("No document sequence configured for '{series}'"))
        })?;

        Ok(format!(
            "{}-{:0width$}",
            prefix,
            number,
            width = padding.max(0) as usize
        ))
    }
}

/// Stock quant backed inventory gateway
pub struct PgStockMover {
    pool: PgPool,
}

impl PgStockMover {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StockMover for PgStockMover {
    #[instrument(skip(self, request), fields(reference = %request.reference))]
    async fn move_goods(&self, request: &StockMoveRequest) -> AppResult<MoveHandle> {
        debug!(
            "Moving {} x product {} from location {} to {}",
            request.qty, request.product_id, request.source_location_id, request.dest_location_id
        );

        let mut tx = self.pool.begin().await.map_err(|e| {
            error!("Failed to start transaction: {}", e);
            AppError::Transaction(format!("Failed to start transaction: {}", e))
        })?;

        let location: Option<(String,)> =
            sqlx::query_as("SELECT usage FROM locations WHERE id = $1")
                .bind(request.source_location_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| {
                    error!("Database error reading source location: {}", e);
                    AppError::Database(format!("Failed to read location: {}", e))
                })?;

        let (usage,) = location.ok_or_else(|| {
            AppError::NotFound(format!("location {}", request.source_location_id))
        })?;

        // The quant row stays locked until commit, so concurrent moves off
        // the same quant serialize. A missing row means nothing on hand.
        let quant: Option<(f64,)> = sqlx::query_as(
            r#"
            SELECT qty FROM stock_quants
            WHERE location_id = $1
              AND product_id = $2
              AND lot IS NOT DISTINCT FROM $3
            FOR UPDATE
            "#,
        )
        .bind(request.source_location_id)
        .bind(request.product_id)
        .bind(&request.lot)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| {
            error!("Database error reading source quant: {}", e);
            AppError::Database(format!("Failed to read stock level: {}", e))
        })?;

        // Internal locations cannot go negative; virtual counterpart
        // locations (customers, suppliers) can.
        let available = quant.map(|(qty,)| qty).unwrap_or(0.0);
        if usage == "internal" && available < request.qty {
            warn!(
                "Insufficient stock for product {} at location {}: have {}, need {}",
                request.product_id, request.source_location_id, available, request.qty
            );
            return Err(AppError::Stock(format!(
                "insufficient quantity for product {} (available {}, requested {})",
                request.product_id, available, request.qty
            )));
        }

        for (location_id, delta) in [
            (request.source_location_id, -request.qty),
            (request.dest_location_id, request.qty),
        ] {
            sqlx::query(
                r#"
                INSERT INTO stock_quants (product_id, lot, location_id, qty)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (product_id, lot, location_id)
                DO UPDATE SET qty = stock_quants.qty + EXCLUDED.qty
                "#,
            )
            .bind(request.product_id)
            .bind(&request.lot)
            .bind(location_id)
            .bind(delta)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                error!("Database error adjusting quant: {}", e);
                AppError::Database(format!("Failed to adjust stock level: {}", e))
            })?;
        }

        let (move_id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO stock_moves (
                reference, product_id, lot, qty, uom,
                source_location_id, dest_location_id, company_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(&request.reference)
        .bind(request.product_id)
        .bind(&request.lot)
        .bind(request.qty)
        .bind(&request.uom)
        .bind(request.source_location_id)
        .bind(request.dest_location_id)
        .bind(request.company_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            error!("Database error recording stock move: {}", e);
            AppError::Database(format!("Failed to record stock move: {}", e))
        })?;

        tx.commit().await.map_err(|e| {
            error!("Failed to commit stock move: {}", e);
            AppError::Transaction(format!("Failed to commit stock move: {}", e))
        })?;

        Ok(MoveHandle { id: move_id })
    }
}

/// Invoice tables backed accounting gateway
pub struct PgInvoiceIssuer {
    pool: PgPool,
}

impl PgInvoiceIssuer {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InvoiceIssuer for PgInvoiceIssuer {
    #[instrument(skip(self, draft), fields(customer_id = draft.customer_id))]
    async fn create_invoice(&self, draft: &InvoiceDraft) -> AppResult<InvoiceHandle> {
        if draft.lines.is_empty() {
            return Err(AppError::InvoiceCreation(
                "invoice draft has no lines".into(),
            ));
        }

        let total: Decimal = draft.lines.iter().map(|l| l.amount).sum();

        let mut tx = self.pool.begin().await.map_err(|e| {
            error!("Failed to start transaction: {}", e);
            AppError::Transaction(format!("Failed to start transaction: {}", e))
        })?;

        let number: Option<(String, i64, i32)> = sqlx::query_as(
            r#"
            UPDATE document_sequences
            SET next_number = next_number + 1
            WHERE series = 'invoice'
            RETURNING prefix, next_number - 1, padding
            "#,
        )
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| {
            error!("Database error advancing invoice sequence: {}", e);
            AppError::Sequence(format!("Failed to advance invoice sequence: {}", e))
        })?;

        let (prefix, seq, padding) = number.ok_or_else(|| {
            AppError::Sequence("No document sequence configured for 'invoice'".into())
        })?;
        let number = format!("{}-{:0width$}", prefix, seq, width = padding.max(0) as usize);

        let (invoice_id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO invoices (
                number, customer_id, company_id, currency, reference,
                invoice_date, state, total
            )
            VALUES ($1, $2, $3, $4, $5, $6, 'posted', $7)
            RETURNING id
            "#,
        )
        .bind(&number)
        .bind(draft.customer_id)
        .bind(draft.company_id)
        .bind(&draft.currency)
        .bind(&draft.reference)
        .bind(draft.invoice_date)
        .bind(total)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            error!("Database error creating invoice: {}", e);
            AppError::InvoiceCreation(format!("Failed to create invoice: {}", e))
        })?;

        for line in &draft.lines {
            sqlx::query(
                r#"
                INSERT INTO invoice_lines (invoice_id, product_id, description, amount, account)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(invoice_id)
            .bind(line.product_id)
            .bind(&line.description)
            .bind(line.amount)
            .bind(&line.account)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                error!("Database error creating invoice line: {}", e);
                AppError::InvoiceCreation(format!("Failed to create invoice line: {}", e))
            })?;
        }

        tx.commit().await.map_err(|e| {
            error!("Failed to commit invoice: {}", e);
            AppError::Transaction(format!("Failed to commit invoice: {}", e))
        })?;

        info!("Created invoice {} for customer {} ({} {})",
            number, draft.customer_id, total, draft.currency);

        Ok(InvoiceHandle {
            id: invoice_id,
            number,
        })
    }

    #[instrument(skip(self))]
    async fn has_active_invoice(&self, reference: &str) -> AppResult<bool> {
        // \m and \M anchor on word boundaries, so a lookup for INT-1000
        // does not match a reference carrying INT-10001.
        let pattern = format!(r"\m{reference}\M");

        let (exists,): (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM invoices
                WHERE reference ~* $1 AND state != 'cancelled'
            )
            "#,
        )
        .bind(&pattern)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error checking invoices for {}: {}", reference, e);
            AppError::Database(format!("Failed to check invoices: {}", e))
        })?;

        Ok(exists)
    }
}

/// Product-table backed income account lookup
pub struct PgAccountResolver {
    pool: PgPool,
}

impl PgAccountResolver {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountResolver for PgAccountResolver {
    #[instrument(skip(self))]
    async fn resolve_income_account(&self, service_product_id: i64) -> AppResult<Option<String>> {
        // Product's own account first, then its category's.
        let row: Option<(Option<String>, Option<String>)> = sqlx::query_as(
            r#"
            SELECT p.income_account, c.income_account
            FROM products p
            LEFT JOIN product_categories c ON c.id = p.category_id
            WHERE p.id = $1
            "#,
        )
        .bind(service_product_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!(
                "Database error resolving income account for product {}: {}",
                service_product_id, e
            );
            AppError::Database(format!("Failed to resolve income account: {}", e))
        })?;

        Ok(row.and_then(|(product_account, category_account)| {
            product_account.or(category_account)
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_pool() -> PgPool {
        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgresql://localhost/coldstore".to_string());
        let pool = crate::create_pool(&database_url, Some(2)).await.unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        pool
    }

    async fn insert_location(pool: &PgPool, name: &str, usage: &str) -> i64 {
        let (id,): (i64,) =
            sqlx::query_as("INSERT INTO locations (name, usage) VALUES ($1, $2) RETURNING id")
                .bind(name)
                .bind(usage)
                .fetch_one(pool)
                .await
                .unwrap();
        id
    }

    fn move_request(qty: f64, source: i64, dest: i64) -> StockMoveRequest {
        StockMoveRequest {
            reference: "INT-9001".to_string(),
            product_id: 9001,
            lot: Some("LOT-A".to_string()),
            qty,
            uom: "kg".to_string(),
            source_location_id: source,
            dest_location_id: dest,
            company_id: 1,
        }
    }

    #[tokio::test]
    #[ignore] // Requires database
    async fn test_move_goods_receives_and_rejects_overdraw() {
        let pool = test_pool().await;
        let customer = insert_location(&pool, "Customers", "customer").await;
        let freezer = insert_location(&pool, "Freezer A", "internal").await;

        let mover = PgStockMover::new(pool.clone());

        // Receiving from a customer location: the virtual side may go
        // negative, so this succeeds with no prior quant rows.
        mover.move_goods(&move_request(100.0, customer, freezer)).await.unwrap();

        let (qty,): (f64,) = sqlx::query_as(
            "SELECT qty FROM stock_quants WHERE location_id = $1 AND product_id = 9001",
        )
        .bind(freezer)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(qty, 100.0);

        // Drawing more than on hand from an internal location fails and
        // leaves the quant untouched.
        let err = mover
            .move_goods(&move_request(150.0, freezer, customer))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Stock(_)));

        mover.move_goods(&move_request(60.0, freezer, customer)).await.unwrap();
        let (qty,): (f64,) = sqlx::query_as(
            "SELECT qty FROM stock_quants WHERE location_id = $1 AND product_id = 9001",
        )
        .bind(freezer)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(qty, 40.0);
    }

    #[tokio::test]
    #[ignore] // Requires database
    async fn test_has_active_invoice_matches_whole_numbers_only() {
        let pool = test_pool().await;
        let issuer = PgInvoiceIssuer::new(pool.clone());

        sqlx::query(
            r#"
            INSERT INTO invoices (number, customer_id, company_id, currency,
                reference, invoice_date, state, total)
            VALUES ('FAC-9001', 7, 1, 'USD',
                'Cold storage charges from 2024-01-01 to 2024-01-31: INT-10001',
                '2024-02-01', 'posted', 10)
            ON CONFLICT (number) DO NOTHING
            "#,
        )
        .execute(&pool)
        .await
        .unwrap();

        assert!(issuer.has_active_invoice("INT-10001").await.unwrap());
        assert!(!issuer.has_active_invoice("INT-1000").await.unwrap());
    }
}
