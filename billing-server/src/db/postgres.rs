//! PostgreSQL store
//!
//! Counters use `SET col = col + $n`; the commission ledger relies on the
//! `UNIQUE (order_id)` constraint with `ON CONFLICT DO NOTHING`.

use async_trait::async_trait;
use rust_decimal::Decimal;
use shared::models::{
    BillingPeriod, Business, CollectionStatus, CommissionRecord, CourierType, Invoice, LimitType,
    MonthUsage, PaymentMethod, PlanDocument,
};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;

use super::{BillingStore, RepoError, RepoResult};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect and run pending migrations
    pub async fn connect(database_url: &str, max_connections: u32) -> RepoResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;
        Ok(Self::new(pool))
    }
}

fn usage_column(limit_type: LimitType) -> &'static str {
    match limit_type {
        LimitType::Orders => "orders",
        LimitType::Push => "push",
        LimitType::TableReservation => "table_reservations",
    }
}

fn parse_period(s: &str) -> RepoResult<BillingPeriod> {
    s.parse()
        .map_err(|e: shared::AppError| RepoError::Serialization(e.message))
}

fn count(value: i64) -> u64 {
    u64::try_from(value).unwrap_or_default()
}

#[derive(sqlx::FromRow)]
struct BusinessRow {
    id: String,
    name: Option<String>,
    business_type: Option<String>,
    subscription_plan: Option<String>,
    has_own_courier: bool,
    account_balance: Decimal,
    last_order_at: Option<i64>,
}

impl From<BusinessRow> for Business {
    fn from(row: BusinessRow) -> Self {
        Business {
            id: row.id,
            name: row.name,
            business_type: row.business_type,
            subscription_plan: row.subscription_plan,
            has_own_courier: row.has_own_courier,
            account_balance: row.account_balance,
            last_order_at: row.last_order_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct UsageRow {
    orders: i64,
    total_commission: Decimal,
    push: i64,
    table_reservations: i64,
}

#[derive(sqlx::FromRow)]
struct CommissionRow {
    id: String,
    order_id: String,
    business_id: String,
    plan_id: Option<String>,
    order_total: Decimal,
    courier_type: String,
    commission_rate: Decimal,
    commission_amount: Decimal,
    per_order_fee: Decimal,
    total_commission: Decimal,
    net_commission: Decimal,
    vat_rate: Decimal,
    vat_amount: Decimal,
    payment_method: String,
    collection_status: String,
    is_free_order: bool,
    period: String,
    created_at: i64,
}

impl TryFrom<CommissionRow> for CommissionRecord {
    type Error = RepoError;

    fn try_from(row: CommissionRow) -> Result<Self, Self::Error> {
        let courier_type = CourierType::from_db(&row.courier_type).ok_or_else(|| {
            RepoError::Serialization(format!("unknown courier_type {}", row.courier_type))
        })?;
        let collection_status =
            CollectionStatus::from_db(&row.collection_status).ok_or_else(|| {
                RepoError::Serialization(format!(
                    "unknown collection_status {}",
                    row.collection_status
                ))
            })?;
        Ok(CommissionRecord {
            id: row.id,
            order_id: row.order_id,
            business_id: row.business_id,
            plan_id: row.plan_id,
            order_total: row.order_total,
            courier_type,
            commission_rate: row.commission_rate,
            commission_amount: row.commission_amount,
            per_order_fee: row.per_order_fee,
            total_commission: row.total_commission,
            net_commission: row.net_commission,
            vat_rate: row.vat_rate,
            vat_amount: row.vat_amount,
            payment_method: PaymentMethod::from_db(&row.payment_method),
            collection_status,
            is_free_order: row.is_free_order,
            period: parse_period(&row.period)?,
            created_at: row.created_at,
        })
    }
}

const COMMISSION_COLUMNS: &str = "id, order_id, business_id, plan_id, order_total, courier_type, \
     commission_rate, commission_amount, per_order_fee, total_commission, net_commission, \
     vat_rate, vat_amount, payment_method, collection_status, is_free_order, period, created_at";

#[async_trait]
impl BillingStore for PgStore {
    async fn find_plan_by_id(&self, id: &str) -> RepoResult<Option<PlanDocument>> {
        let row: Option<(Json<PlanDocument>,)> =
            sqlx::query_as("SELECT document FROM plans WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|(doc,)| doc.0))
    }

    async fn find_plan_by_code(&self, code: &str) -> RepoResult<Option<PlanDocument>> {
        let row: Option<(Json<PlanDocument>,)> =
            sqlx::query_as("SELECT document FROM plans WHERE code = $1 ORDER BY updated_at DESC LIMIT 1")
                .bind(code)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|(doc,)| doc.0))
    }

    async fn list_plans(&self) -> RepoResult<Vec<PlanDocument>> {
        let rows: Vec<(Json<PlanDocument>,)> =
            sqlx::query_as("SELECT document FROM plans ORDER BY id")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(|(doc,)| doc.0).collect())
    }

    async fn upsert_plan(&self, plan: &PlanDocument) -> RepoResult<()> {
        sqlx::query(
            "INSERT INTO plans (id, code, document, updated_at) VALUES ($1, $2, $3, $4)
             ON CONFLICT (id) DO UPDATE SET code = $2, document = $3, updated_at = $4",
        )
        .bind(&plan.id)
        .bind(&plan.code)
        .bind(Json(plan))
        .bind(shared::util::now_millis())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn insert_plan_if_absent(&self, plan: &PlanDocument) -> RepoResult<bool> {
        let result = sqlx::query(
            "INSERT INTO plans (id, code, document, updated_at) VALUES ($1, $2, $3, $4)
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(&plan.id)
        .bind(&plan.code)
        .bind(Json(plan))
        .bind(shared::util::now_millis())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn find_business(&self, id: &str) -> RepoResult<Option<Business>> {
        let row: Option<BusinessRow> = sqlx::query_as(
            "SELECT id, name, business_type, subscription_plan, has_own_courier,
                account_balance, last_order_at
             FROM businesses WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Business::from))
    }

    async fn upsert_business(&self, business: &Business) -> RepoResult<()> {
        sqlx::query(
            "INSERT INTO businesses
                (id, name, business_type, subscription_plan, has_own_courier, account_balance, last_order_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             ON CONFLICT (id) DO UPDATE SET
                name = $2, business_type = $3, subscription_plan = $4, has_own_courier = $5",
        )
        .bind(&business.id)
        .bind(&business.name)
        .bind(&business.business_type)
        .bind(&business.subscription_plan)
        .bind(business.has_own_courier)
        .bind(business.account_balance)
        .bind(business.last_order_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_business_ids(&self) -> RepoResult<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as("SELECT id FROM businesses ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    async fn month_usage(
        &self,
        business_id: &str,
        period: BillingPeriod,
    ) -> RepoResult<MonthUsage> {
        let row: Option<UsageRow> = sqlx::query_as(
            "SELECT orders, total_commission, push, table_reservations
             FROM business_usage WHERE business_id = $1 AND period = $2",
        )
        .bind(business_id)
        .bind(period.key())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row
            .map(|r| MonthUsage {
                orders: count(r.orders),
                total_commission: r.total_commission,
                push: count(r.push),
                table_reservations: count(r.table_reservations),
            })
            .unwrap_or_default())
    }

    async fn increment_usage(
        &self,
        business_id: &str,
        period: BillingPeriod,
        limit_type: LimitType,
        amount: u64,
    ) -> RepoResult<()> {
        let column = usage_column(limit_type);
        let sql = format!(
            "INSERT INTO business_usage (business_id, period, {column}) VALUES ($1, $2, $3)
             ON CONFLICT (business_id, period)
             DO UPDATE SET {column} = business_usage.{column} + EXCLUDED.{column}"
        );
        let amount = i64::try_from(amount)
            .map_err(|_| RepoError::Database(format!("usage increment out of range: {amount}")))?;
        sqlx::query(&sql)
            .bind(business_id)
            .bind(period.key())
            .bind(amount)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn record_order_usage(
        &self,
        business_id: &str,
        period: BillingPeriod,
        commission: Decimal,
        at: i64,
    ) -> RepoResult<()> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query("UPDATE businesses SET last_order_at = $2 WHERE id = $1")
            .bind(business_id)
            .bind(at)
            .execute(&mut *tx)
            .await?;
        if updated.rows_affected() == 0 {
            return Err(RepoError::NotFound(format!("business {business_id}")));
        }

        sqlx::query(
            "INSERT INTO business_usage (business_id, period, orders, total_commission)
             VALUES ($1, $2, 1, $3)
             ON CONFLICT (business_id, period) DO UPDATE SET
                orders = business_usage.orders + 1,
                total_commission = business_usage.total_commission + EXCLUDED.total_commission",
        )
        .bind(business_id)
        .bind(period.key())
        .bind(commission)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn increment_account_balance(
        &self,
        business_id: &str,
        amount: Decimal,
    ) -> RepoResult<()> {
        let updated = sqlx::query(
            "UPDATE businesses SET account_balance = account_balance + $2 WHERE id = $1",
        )
        .bind(business_id)
        .bind(amount)
        .execute(&self.pool)
        .await?;
        if updated.rows_affected() == 0 {
            return Err(RepoError::NotFound(format!("business {business_id}")));
        }
        Ok(())
    }

    async fn clear_account_balance(&self, business_id: &str) -> RepoResult<Decimal> {
        // Old value is read from the locked row inside the same statement
        let row: Option<(Decimal,)> = sqlx::query_as(
            "UPDATE businesses b SET account_balance = 0
             FROM (SELECT id, account_balance FROM businesses WHERE id = $1 FOR UPDATE) old
             WHERE b.id = old.id
             RETURNING old.account_balance",
        )
        .bind(business_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|(cleared,)| cleared)
            .ok_or_else(|| RepoError::NotFound(format!("business {business_id}")))
    }

    async fn insert_commission_if_absent(&self, record: &CommissionRecord) -> RepoResult<bool> {
        let sql = format!(
            "INSERT INTO commission_records ({COMMISSION_COLUMNS})
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
             ON CONFLICT (order_id) DO NOTHING"
        );
        let result = sqlx::query(&sql)
            .bind(&record.id)
            .bind(&record.order_id)
            .bind(&record.business_id)
            .bind(&record.plan_id)
            .bind(record.order_total)
            .bind(record.courier_type.as_str())
            .bind(record.commission_rate)
            .bind(record.commission_amount)
            .bind(record.per_order_fee)
            .bind(record.total_commission)
            .bind(record.net_commission)
            .bind(record.vat_rate)
            .bind(record.vat_amount)
            .bind(record.payment_method.as_str())
            .bind(record.collection_status.as_str())
            .bind(record.is_free_order)
            .bind(record.period.key())
            .bind(record.created_at)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn find_commission_by_order(
        &self,
        order_id: &str,
    ) -> RepoResult<Option<CommissionRecord>> {
        let sql = format!("SELECT {COMMISSION_COLUMNS} FROM commission_records WHERE order_id = $1");
        let row: Option<CommissionRow> = sqlx::query_as(&sql)
            .bind(order_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(CommissionRecord::try_from).transpose()
    }

    async fn list_commissions(
        &self,
        business_id: &str,
        period: BillingPeriod,
    ) -> RepoResult<Vec<CommissionRecord>> {
        let sql = format!(
            "SELECT {COMMISSION_COLUMNS} FROM commission_records
             WHERE business_id = $1 AND period = $2 ORDER BY created_at"
        );
        let rows: Vec<CommissionRow> = sqlx::query_as(&sql)
            .bind(business_id)
            .bind(period.key())
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(CommissionRecord::try_from).collect()
    }

    async fn find_invoice(
        &self,
        business_id: &str,
        period: BillingPeriod,
    ) -> RepoResult<Option<Invoice>> {
        let row: Option<(Json<Invoice>,)> = sqlx::query_as(
            "SELECT document FROM invoices WHERE business_id = $1 AND period = $2",
        )
        .bind(business_id)
        .bind(period.key())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(doc,)| doc.0))
    }

    async fn save_invoice(&self, invoice: &Invoice) -> RepoResult<()> {
        sqlx::query(
            "INSERT INTO invoices
                (id, invoice_number, business_id, period, status, total, document, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             ON CONFLICT (business_id, period) DO UPDATE SET
                id = $1, invoice_number = $2, status = $5, total = $6, document = $7, created_at = $8",
        )
        .bind(&invoice.id)
        .bind(&invoice.invoice_number)
        .bind(&invoice.business_id)
        .bind(invoice.period.key())
        .bind(invoice.status.as_str())
        .bind(invoice.total)
        .bind(Json(invoice))
        .bind(invoice.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_invoices(&self, business_id: &str) -> RepoResult<Vec<Invoice>> {
        let rows: Vec<(Json<Invoice>,)> = sqlx::query_as(
            "SELECT document FROM invoices WHERE business_id = $1 ORDER BY period",
        )
        .bind(business_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(doc,)| doc.0).collect())
    }
}
