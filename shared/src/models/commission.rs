//! Commission Ledger Model
//!
//! One immutable `CommissionRecord` per order.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::order::PaymentMethod;
use super::period::BillingPeriod;

/// Fulfillment channel, selects the commission rate
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CourierType {
    /// Pickup or table order
    ClickCollect,
    /// Delivered by the business's own staff
    OwnCourier,
    /// Delivered by the platform courier pool
    LokmaCourier,
}

impl CourierType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ClickCollect => "click_collect",
            Self::OwnCourier => "own_courier",
            Self::LokmaCourier => "lokma_courier",
        }
    }

    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "click_collect" => Some(Self::ClickCollect),
            "own_courier" => Some(Self::OwnCourier),
            "lokma_courier" => Some(Self::LokmaCourier),
            _ => None,
        }
    }
}

/// Whether the platform cut is already in hand
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CollectionStatus {
    /// Deducted at card capture
    AutoCollected,
    /// Owed by the business (cash), accumulates in `account_balance`
    Pending,
}

impl CollectionStatus {
    pub fn for_payment(method: PaymentMethod) -> Self {
        if method.is_card() {
            Self::AutoCollected
        } else {
            Self::Pending
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AutoCollected => "auto_collected",
            Self::Pending => "pending",
        }
    }

    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "auto_collected" => Some(Self::AutoCollected),
            "pending" => Some(Self::Pending),
            _ => None,
        }
    }
}

/// Output of the commission calculation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommissionResult {
    /// Plan used, `None` when the fallback rate applied
    pub plan_id: Option<String>,
    pub courier_type: CourierType,
    pub commission_rate: Decimal,
    pub commission_amount: Decimal,
    pub per_order_fee: Decimal,
    /// Gross (VAT-inclusive) platform cut
    pub total_commission: Decimal,
    pub net_commission: Decimal,
    pub vat_rate: Decimal,
    pub vat_amount: Decimal,
    pub collection_status: CollectionStatus,
    pub is_free_order: bool,
}

/// Immutable ledger entry, at most one per `order_id`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommissionRecord {
    pub id: String,
    pub order_id: String,
    pub business_id: String,
    pub plan_id: Option<String>,
    pub order_total: Decimal,
    pub courier_type: CourierType,
    pub commission_rate: Decimal,
    pub commission_amount: Decimal,
    pub per_order_fee: Decimal,
    pub total_commission: Decimal,
    pub net_commission: Decimal,
    pub vat_rate: Decimal,
    pub vat_amount: Decimal,
    pub payment_method: PaymentMethod,
    pub collection_status: CollectionStatus,
    pub is_free_order: bool,
    pub period: BillingPeriod,
    pub created_at: i64,
}

impl CommissionRecord {
    /// Build the ledger entry from a calculation result
    pub fn from_result(
        id: String,
        order_id: impl Into<String>,
        business_id: impl Into<String>,
        order_total: Decimal,
        payment_method: PaymentMethod,
        result: CommissionResult,
        created_at: i64,
    ) -> Self {
        Self {
            id,
            order_id: order_id.into(),
            business_id: business_id.into(),
            plan_id: result.plan_id,
            order_total,
            courier_type: result.courier_type,
            commission_rate: result.commission_rate,
            commission_amount: result.commission_amount,
            per_order_fee: result.per_order_fee,
            total_commission: result.total_commission,
            net_commission: result.net_commission,
            vat_rate: result.vat_rate,
            vat_amount: result.vat_amount,
            payment_method,
            collection_status: result.collection_status,
            is_free_order: result.is_free_order,
            period: BillingPeriod::from_millis(created_at),
            created_at,
        }
    }

    /// Amount to add to the business's running balance
    pub fn owed_amount(&self) -> Decimal {
        if self.collection_status == CollectionStatus::Pending
            && self.total_commission > Decimal::ZERO
        {
            self.total_commission
        } else {
            Decimal::ZERO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn result(status: CollectionStatus, total: Decimal) -> CommissionResult {
        CommissionResult {
            plan_id: Some("basic".into()),
            courier_type: CourierType::LokmaCourier,
            commission_rate: dec!(7),
            commission_amount: total,
            per_order_fee: Decimal::ZERO,
            total_commission: total,
            net_commission: dec!(5.88),
            vat_rate: dec!(19),
            vat_amount: dec!(1.12),
            collection_status: status,
            is_free_order: false,
        }
    }

    #[test]
    fn test_collection_status_for_payment() {
        assert_eq!(
            CollectionStatus::for_payment(PaymentMethod::Card),
            CollectionStatus::AutoCollected
        );
        assert_eq!(
            CollectionStatus::for_payment(PaymentMethod::Cash),
            CollectionStatus::Pending
        );
        assert_eq!(
            CollectionStatus::for_payment(PaymentMethod::Other),
            CollectionStatus::Pending
        );
    }

    #[test]
    fn test_owed_amount_only_for_pending_positive() {
        let created_at = 1_739_188_800_000; // 2025-02-10
        let cash = CommissionRecord::from_result(
            "c1".into(),
            "o1",
            "b1",
            dec!(100),
            PaymentMethod::Cash,
            result(CollectionStatus::Pending, dec!(7)),
            created_at,
        );
        assert_eq!(cash.owed_amount(), dec!(7));
        assert_eq!(cash.period.to_string(), "2025-02");

        let card = CommissionRecord::from_result(
            "c2".into(),
            "o2",
            "b1",
            dec!(100),
            PaymentMethod::Card,
            result(CollectionStatus::AutoCollected, dec!(7)),
            created_at,
        );
        assert_eq!(card.owed_amount(), Decimal::ZERO);

        let free = CommissionRecord::from_result(
            "c3".into(),
            "o3",
            "b1",
            dec!(100),
            PaymentMethod::Cash,
            result(CollectionStatus::Pending, Decimal::ZERO),
            created_at,
        );
        assert_eq!(free.owed_amount(), Decimal::ZERO);
    }

    #[test]
    fn test_courier_type_db_roundtrip() {
        for ct in [
            CourierType::ClickCollect,
            CourierType::OwnCourier,
            CourierType::LokmaCourier,
        ] {
            assert_eq!(CourierType::from_db(ct.as_str()), Some(ct));
        }
    }
}
