//! Commission Calculator
//!
//! Pure computation of the platform's cut for one order. Money is rounded
//! to 2 places after every intermediate step, in this order:
//!
//! 1. `commission_amount = round2(total × rate / 100)` (0 for free orders)
//! 2. `per_order_fee`: percentage → `round2(total × amount / 100)`,
//!    fixed → `amount` (0 for free orders)
//! 3. `total_commission = round2(commission_amount + per_order_fee)`
//! 4. `net_commission = round2(total_commission / 1.19)`
//! 5. `vat_amount = round2(total_commission − net_commission)`

use rust_decimal::Decimal;
use shared::models::{
    BillingPeriod, Business, CollectionStatus, CommissionResult, CourierType, Order, PaymentMethod,
    PerOrderFeeType, Plan, PlanDefaults,
};
use shared::util::{VAT_RATE, percent_of, round2};
use std::sync::Arc;

use super::plans::PlanCatalog;
use crate::db::BillingStore;
use crate::error::ServiceResult;

/// Fulfillment channel of an order
///
/// - pickup / table: `click_collect`
/// - delivery with a platform courier assigned: `lokma_courier`
/// - delivery by a business with its own staff: `own_courier`
/// - any other delivery: `lokma_courier`
pub fn classify_channel(order: &Order, business: &Business) -> CourierType {
    if !order.is_delivery() {
        return CourierType::ClickCollect;
    }
    if order.has_assigned_courier() {
        CourierType::LokmaCourier
    } else if business.has_own_courier {
        CourierType::OwnCourier
    } else {
        CourierType::LokmaCourier
    }
}

/// Inputs of one calculation
#[derive(Debug, Clone, Copy)]
pub struct CommissionInput {
    pub order_total: Decimal,
    pub courier_type: CourierType,
    pub payment_method: PaymentMethod,
    /// Orders already counted this month, before this one
    pub monthly_orders: u64,
}

/// Compute the commission for one order.
///
/// `plan = None` applies the fallback rate with no per-order fee.
pub fn calculate(plan: Option<&Plan>, defaults: &PlanDefaults, input: CommissionInput) -> CommissionResult {
    let is_free_order = plan.is_some_and(|p| input.monthly_orders < u64::from(p.free_order_count));

    let commission_rate = match plan {
        Some(p) => p.commission_rate(input.courier_type),
        None => defaults.fallback_commission_rate,
    };

    let (commission_amount, per_order_fee) = if is_free_order {
        (Decimal::ZERO, Decimal::ZERO)
    } else {
        let commission = percent_of(input.order_total, commission_rate);
        let fee = match plan.map(|p| (p.per_order_fee_type, p.per_order_fee_amount)) {
            Some((PerOrderFeeType::Percentage, amount)) => percent_of(input.order_total, amount),
            Some((PerOrderFeeType::Fixed, amount)) => amount,
            _ => Decimal::ZERO,
        };
        (commission, fee)
    };

    let total_commission = round2(commission_amount + per_order_fee);
    let vat_divisor = Decimal::ONE + VAT_RATE / Decimal::ONE_HUNDRED;
    let net_commission = round2(total_commission / vat_divisor);
    let vat_amount = round2(total_commission - net_commission);

    CommissionResult {
        plan_id: plan.map(|p| p.id.clone()),
        courier_type: input.courier_type,
        commission_rate,
        commission_amount,
        per_order_fee,
        total_commission,
        net_commission,
        vat_rate: VAT_RATE,
        vat_amount,
        collection_status: CollectionStatus::for_payment(input.payment_method),
        is_free_order,
    }
}

/// Commission calculation against stored plan and usage
#[derive(Clone)]
pub struct CommissionCalculator {
    store: Arc<dyn BillingStore>,
    catalog: Arc<PlanCatalog>,
}

impl CommissionCalculator {
    pub fn new(store: Arc<dyn BillingStore>, catalog: Arc<PlanCatalog>) -> Self {
        Self { store, catalog }
    }

    /// Resolve plan and monthly order count for `business_id`, then calculate.
    /// A business or plan that cannot be resolved gets the fallback rate.
    pub async fn calculate_commission(
        &self,
        business_id: &str,
        order_total: Decimal,
        courier_type: CourierType,
        payment_method: PaymentMethod,
    ) -> ServiceResult<CommissionResult> {
        let plan = match self.store.find_business(business_id).await? {
            Some(business) => self.catalog.plan_for_business(&business).await?,
            None => None,
        };
        if plan.is_none() {
            tracing::warn!(
                business_id = %business_id,
                rate = %self.catalog.defaults().fallback_commission_rate,
                "No plan resolved, applying fallback commission rate"
            );
        }

        self.calculate_with_plan(
            business_id,
            plan.as_ref(),
            BillingPeriod::current(),
            order_total,
            courier_type,
            payment_method,
        )
        .await
    }

    /// Calculate for an already resolved plan. Free orders are counted
    /// against the orders recorded for `business_id` in `period`.
    pub async fn calculate_with_plan(
        &self,
        business_id: &str,
        plan: Option<&Plan>,
        period: BillingPeriod,
        order_total: Decimal,
        courier_type: CourierType,
        payment_method: PaymentMethod,
    ) -> ServiceResult<CommissionResult> {
        let usage = self.store.month_usage(business_id, period).await?;

        Ok(calculate(
            plan,
            self.catalog.defaults(),
            CommissionInput {
                order_total,
                courier_type,
                payment_method,
                monthly_orders: usage.orders,
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use rust_decimal_macros::dec;
    use shared::models::{OrderStatus, OrderType, PlanDocument};
    use std::time::Duration;

    fn plan(doc: PlanDocument) -> Plan {
        PlanDefaults::STANDARD.resolve(doc)
    }

    fn input(total: Decimal, courier_type: CourierType) -> CommissionInput {
        CommissionInput {
            order_total: total,
            courier_type,
            payment_method: PaymentMethod::Cash,
            monthly_orders: 0,
        }
    }

    fn order(order_type: Option<OrderType>, courier: Option<&str>) -> Order {
        Order {
            id: "o1".into(),
            butcher_id: Some("b1".into()),
            business_id: None,
            total_amount: dec!(20),
            payment_method: None,
            order_type,
            delivery_method: None,
            assigned_courier_id: courier.map(str::to_string),
            status: OrderStatus::Delivered,
        }
    }

    #[test]
    fn test_rounding_order_lokma_courier() {
        let p = plan(PlanDocument {
            id: "basic".into(),
            commission_lokma_courier: Some(dec!(7)),
            ..Default::default()
        });
        let r = calculate(
            Some(&p),
            &PlanDefaults::STANDARD,
            input(dec!(100.00), CourierType::LokmaCourier),
        );
        assert_eq!(r.commission_amount, dec!(7.00));
        assert_eq!(r.total_commission, dec!(7.00));
        assert_eq!(r.net_commission, dec!(5.88));
        assert_eq!(r.vat_amount, dec!(1.12));
        assert_eq!(r.vat_rate, dec!(19));
        assert_eq!(r.collection_status, CollectionStatus::Pending);
        assert!(!r.is_free_order);
    }

    #[test]
    fn test_each_step_is_rounded() {
        // 33.33 × 5% = 1.6665 → 1.67; 33.33 × 1.5% = 0.49995 → 0.50
        let p = plan(PlanDocument {
            id: "p".into(),
            per_order_fee_type: Some(PerOrderFeeType::Percentage),
            per_order_fee_amount: Some(dec!(1.5)),
            ..Default::default()
        });
        let r = calculate(
            Some(&p),
            &PlanDefaults::STANDARD,
            input(dec!(33.33), CourierType::ClickCollect),
        );
        assert_eq!(r.commission_amount, dec!(1.67));
        assert_eq!(r.per_order_fee, dec!(0.50));
        assert_eq!(r.total_commission, dec!(2.17));
        // 2.17 / 1.19 = 1.8235... → 1.82
        assert_eq!(r.net_commission, dec!(1.82));
        assert_eq!(r.vat_amount, dec!(0.35));
    }

    #[test]
    fn test_fixed_fee_is_verbatim() {
        let p = plan(PlanDocument {
            id: "p".into(),
            per_order_fee_type: Some(PerOrderFeeType::Fixed),
            per_order_fee_amount: Some(dec!(0.25)),
            ..Default::default()
        });
        let r = calculate(
            Some(&p),
            &PlanDefaults::STANDARD,
            input(dec!(10), CourierType::OwnCourier),
        );
        assert_eq!(r.commission_amount, dec!(0.40));
        assert_eq!(r.per_order_fee, dec!(0.25));
        assert_eq!(r.total_commission, dec!(0.65));
    }

    #[test]
    fn test_free_orders_pay_nothing_regardless_of_fee_type() {
        for fee_type in [
            PerOrderFeeType::None,
            PerOrderFeeType::Percentage,
            PerOrderFeeType::Fixed,
        ] {
            let p = plan(PlanDocument {
                id: "p".into(),
                free_order_count: Some(3),
                per_order_fee_type: Some(fee_type),
                per_order_fee_amount: Some(dec!(2)),
                ..Default::default()
            });
            for monthly_orders in 0..3 {
                let r = calculate(
                    Some(&p),
                    &PlanDefaults::STANDARD,
                    CommissionInput {
                        monthly_orders,
                        ..input(dec!(80), CourierType::LokmaCourier)
                    },
                );
                assert!(r.is_free_order);
                assert_eq!(r.commission_amount, Decimal::ZERO);
                assert_eq!(r.per_order_fee, Decimal::ZERO);
                assert_eq!(r.total_commission, Decimal::ZERO);
                assert_eq!(r.vat_amount, Decimal::ZERO);
            }

            // the 4th order of the month is billed
            let r = calculate(
                Some(&p),
                &PlanDefaults::STANDARD,
                CommissionInput {
                    monthly_orders: 3,
                    ..input(dec!(80), CourierType::LokmaCourier)
                },
            );
            assert!(!r.is_free_order);
            assert_eq!(r.commission_amount, dec!(5.60));
        }
    }

    #[test]
    fn test_fallback_rate_without_plan() {
        let r = calculate(
            None,
            &PlanDefaults::STANDARD,
            CommissionInput {
                payment_method: PaymentMethod::Card,
                ..input(dec!(50), CourierType::LokmaCourier)
            },
        );
        assert_eq!(r.plan_id, None);
        assert_eq!(r.commission_rate, dec!(5));
        assert_eq!(r.commission_amount, dec!(2.50));
        assert_eq!(r.per_order_fee, Decimal::ZERO);
        assert_eq!(r.collection_status, CollectionStatus::AutoCollected);
    }

    async fn calculator_with_business(plan_code: &str) -> (Arc<MemoryStore>, CommissionCalculator) {
        let store = Arc::new(MemoryStore::new());
        store
            .upsert_plan(&PlanDocument {
                id: "basic".into(),
                commission_lokma_courier: Some(dec!(7)),
                free_order_count: Some(2),
                ..Default::default()
            })
            .await
            .unwrap();
        store
            .upsert_business(&Business {
                id: "b1".into(),
                subscription_plan: Some(plan_code.into()),
                ..Default::default()
            })
            .await
            .unwrap();
        let catalog = Arc::new(PlanCatalog::new(store.clone(), Duration::from_secs(60)));
        (store.clone(), CommissionCalculator::new(store, catalog))
    }

    #[tokio::test]
    async fn test_free_quota_follows_recorded_orders() {
        let (store, calculator) = calculator_with_business("basic").await;
        let period = BillingPeriod::current();

        let r = calculator
            .calculate_commission("b1", dec!(100), CourierType::LokmaCourier, PaymentMethod::Cash)
            .await
            .unwrap();
        assert!(r.is_free_order);
        assert_eq!(r.total_commission, Decimal::ZERO);
        assert_eq!(r.plan_id.as_deref(), Some("basic"));

        for _ in 0..2 {
            store
                .record_order_usage("b1", period, Decimal::ZERO, 0)
                .await
                .unwrap();
        }
        let r = calculator
            .calculate_commission("b1", dec!(100), CourierType::LokmaCourier, PaymentMethod::Cash)
            .await
            .unwrap();
        assert!(!r.is_free_order);
        assert_eq!(r.total_commission, dec!(7.00));
    }

    #[tokio::test]
    async fn test_unresolved_business_or_plan_uses_fallback_rate() {
        let (_store, calculator) = calculator_with_business("legacy-gold").await;

        for business_id in ["ghost", "b1"] {
            let r = calculator
                .calculate_commission(
                    business_id,
                    dec!(100),
                    CourierType::OwnCourier,
                    PaymentMethod::Card,
                )
                .await
                .unwrap();
            assert_eq!(r.plan_id, None);
            assert_eq!(r.commission_rate, dec!(5));
            assert_eq!(r.total_commission, dec!(5.00));
            assert_eq!(r.collection_status, CollectionStatus::AutoCollected);
            assert!(!r.is_free_order);
        }
    }

    #[test]
    fn test_channel_classification() {
        let own = Business {
            id: "b1".into(),
            has_own_courier: true,
            ..Default::default()
        };
        let no_own = Business {
            id: "b2".into(),
            ..Default::default()
        };

        let pickup = order(Some(OrderType::Pickup), None);
        assert_eq!(classify_channel(&pickup, &own), CourierType::ClickCollect);
        let table = order(Some(OrderType::DineIn), None);
        assert_eq!(classify_channel(&table, &no_own), CourierType::ClickCollect);
        let unspecified = order(None, None);
        assert_eq!(
            classify_channel(&unspecified, &no_own),
            CourierType::ClickCollect
        );

        let delivery = order(Some(OrderType::Delivery), None);
        assert_eq!(classify_channel(&delivery, &own), CourierType::OwnCourier);
        // no courier assigned, no own staff: platform courier rate
        assert_eq!(
            classify_channel(&delivery, &no_own),
            CourierType::LokmaCourier
        );

        let assigned = order(Some(OrderType::Delivery), Some("courier-7"));
        assert_eq!(classify_channel(&assigned, &own), CourierType::LokmaCourier);
    }
}
