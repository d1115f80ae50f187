//! Subscription Plan Model
//!
//! `PlanDocument` is the stored shape, where every tunable is optional.
//! `PlanDefaults` is the single place default values live; `resolve` merges
//! a document with the defaults into a fully populated [`Plan`].

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::business::LimitType;
use super::commission::CourierType;

/// What happens once a usage limit is reached
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OverageAction {
    /// Hard block: the action is refused
    Block,
    /// Allowed, each excess unit is billed at the overage fee
    OverageFee,
    /// No consequence
    #[default]
    None,
}

impl OverageAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Block => "block",
            Self::OverageFee => "overage_fee",
            Self::None => "none",
        }
    }
}

/// Per-order platform fee, charged on top of the commission
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PerOrderFeeType {
    #[default]
    None,
    /// `per_order_fee_amount` percent of the order total
    Percentage,
    /// `per_order_fee_amount` currency units per order
    Fixed,
}

/// Plan as stored in the catalog
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PlanDocument {
    /// Primary key (versioned, e.g. `basic` or `basic-2025`)
    pub id: String,
    /// Current code that businesses reference (may differ from `id`)
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub business_type: Option<String>,
    #[serde(default)]
    pub monthly_fee: Option<Decimal>,
    #[serde(default)]
    pub yearly_fee: Option<Decimal>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub commission_click_collect: Option<Decimal>,
    #[serde(default)]
    pub commission_own_courier: Option<Decimal>,
    #[serde(default)]
    pub commission_lokma_courier: Option<Decimal>,
    #[serde(default)]
    pub free_order_count: Option<u32>,
    /// `None` = unlimited
    #[serde(default)]
    pub order_limit: Option<u32>,
    #[serde(default)]
    pub order_overage_action: Option<OverageAction>,
    #[serde(default)]
    pub order_overage_fee: Option<Decimal>,
    /// Push notifications per month, `None` = unlimited
    #[serde(default)]
    pub campaign_limit: Option<u32>,
    /// `None` = unlimited
    #[serde(default)]
    pub table_reservation_limit: Option<u32>,
    #[serde(default)]
    pub table_reservation_overage_fee: Option<Decimal>,
    #[serde(default)]
    pub per_order_fee_type: Option<PerOrderFeeType>,
    #[serde(default)]
    pub per_order_fee_amount: Option<Decimal>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

/// Fully resolved plan, every consumer sees the same values
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Plan {
    pub id: String,
    pub code: String,
    pub name: String,
    pub business_type: String,
    pub monthly_fee: Decimal,
    pub yearly_fee: Decimal,
    pub currency: String,
    pub commission_click_collect: Decimal,
    pub commission_own_courier: Decimal,
    pub commission_lokma_courier: Decimal,
    pub free_order_count: u32,
    pub order_limit: Option<u32>,
    pub order_overage_action: OverageAction,
    pub order_overage_fee: Decimal,
    pub campaign_limit: Option<u32>,
    pub table_reservation_limit: Option<u32>,
    pub table_reservation_overage_fee: Decimal,
    pub per_order_fee_type: PerOrderFeeType,
    pub per_order_fee_amount: Decimal,
    pub is_active: bool,
}

impl Plan {
    /// Commission percentage for the fulfillment channel (exactly one applies)
    pub fn commission_rate(&self, courier_type: CourierType) -> Decimal {
        match courier_type {
            CourierType::ClickCollect => self.commission_click_collect,
            CourierType::OwnCourier => self.commission_own_courier,
            CourierType::LokmaCourier => self.commission_lokma_courier,
        }
    }

    /// Monthly limit for a limit type (`None` = unlimited)
    pub fn limit_for(&self, limit_type: LimitType) -> Option<u32> {
        match limit_type {
            LimitType::Orders => self.order_limit,
            LimitType::Push => self.campaign_limit,
            LimitType::TableReservation => self.table_reservation_limit,
        }
    }

    /// Overage policy per limit type
    ///
    /// - orders: configured on the plan
    /// - push: always a hard block
    /// - table reservations: overage fee when a limit exists, otherwise none
    pub fn overage_action_for(&self, limit_type: LimitType) -> OverageAction {
        match limit_type {
            LimitType::Orders => self.order_overage_action,
            LimitType::Push => OverageAction::Block,
            LimitType::TableReservation => {
                if self.table_reservation_limit.is_some() {
                    OverageAction::OverageFee
                } else {
                    OverageAction::None
                }
            }
        }
    }

    /// Per-unit overage fee per limit type
    pub fn overage_fee_for(&self, limit_type: LimitType) -> Decimal {
        match limit_type {
            LimitType::Orders => self.order_overage_fee,
            LimitType::Push => Decimal::ZERO,
            LimitType::TableReservation => self.table_reservation_overage_fee,
        }
    }
}

/// Default values merged into every stored plan at load time
#[derive(Debug, Clone, PartialEq)]
pub struct PlanDefaults {
    pub plan_code: &'static str,
    pub currency: &'static str,
    pub business_type: &'static str,
    pub commission_click_collect: Decimal,
    pub commission_own_courier: Decimal,
    pub commission_lokma_courier: Decimal,
    /// Rate applied when no plan resolves at all
    pub fallback_commission_rate: Decimal,
    pub free_order_count: u32,
}

impl PlanDefaults {
    pub const STANDARD: PlanDefaults = PlanDefaults {
        plan_code: "free",
        currency: "EUR",
        business_type: "all",
        commission_click_collect: dec!(5),
        commission_own_courier: dec!(4),
        commission_lokma_courier: dec!(7),
        fallback_commission_rate: dec!(5),
        free_order_count: 0,
    };

    /// Merge a stored document with the defaults
    pub fn resolve(&self, doc: PlanDocument) -> Plan {
        let code = doc.code.unwrap_or_else(|| doc.id.clone());
        Plan {
            name: doc.name.unwrap_or_else(|| code.clone()),
            id: doc.id,
            code,
            business_type: doc
                .business_type
                .unwrap_or_else(|| self.business_type.to_string()),
            monthly_fee: doc.monthly_fee.unwrap_or(Decimal::ZERO),
            yearly_fee: doc.yearly_fee.unwrap_or(Decimal::ZERO),
            currency: doc.currency.unwrap_or_else(|| self.currency.to_string()),
            commission_click_collect: doc
                .commission_click_collect
                .unwrap_or(self.commission_click_collect),
            commission_own_courier: doc
                .commission_own_courier
                .unwrap_or(self.commission_own_courier),
            commission_lokma_courier: doc
                .commission_lokma_courier
                .unwrap_or(self.commission_lokma_courier),
            free_order_count: doc.free_order_count.unwrap_or(self.free_order_count),
            order_limit: doc.order_limit,
            order_overage_action: doc.order_overage_action.unwrap_or_default(),
            order_overage_fee: doc.order_overage_fee.unwrap_or(Decimal::ZERO),
            campaign_limit: doc.campaign_limit,
            table_reservation_limit: doc.table_reservation_limit,
            table_reservation_overage_fee: doc
                .table_reservation_overage_fee
                .unwrap_or(Decimal::ZERO),
            per_order_fee_type: doc.per_order_fee_type.unwrap_or_default(),
            per_order_fee_amount: doc.per_order_fee_amount.unwrap_or(Decimal::ZERO),
            is_active: doc.is_active.unwrap_or(true),
        }
    }
}

impl Default for PlanDefaults {
    fn default() -> Self {
        Self::STANDARD
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bare(id: &str) -> PlanDocument {
        PlanDocument {
            id: id.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_resolve_fills_commission_defaults() {
        let plan = PlanDefaults::STANDARD.resolve(bare("basic"));
        assert_eq!(plan.commission_rate(CourierType::ClickCollect), dec!(5));
        assert_eq!(plan.commission_rate(CourierType::OwnCourier), dec!(4));
        assert_eq!(plan.commission_rate(CourierType::LokmaCourier), dec!(7));
        assert_eq!(plan.code, "basic");
        assert_eq!(plan.currency, "EUR");
        assert_eq!(plan.per_order_fee_type, PerOrderFeeType::None);
        assert_eq!(plan.order_overage_action, OverageAction::None);
        assert!(plan.is_active);
    }

    #[test]
    fn test_resolve_keeps_configured_rates() {
        let doc = PlanDocument {
            commission_click_collect: Some(dec!(2.5)),
            commission_own_courier: Some(dec!(3)),
            commission_lokma_courier: Some(dec!(9)),
            code: Some("premium".into()),
            ..bare("premium-2025")
        };
        let plan = PlanDefaults::STANDARD.resolve(doc);
        assert_eq!(plan.id, "premium-2025");
        assert_eq!(plan.code, "premium");
        assert_eq!(plan.commission_rate(CourierType::ClickCollect), dec!(2.5));
        assert_eq!(plan.commission_rate(CourierType::OwnCourier), dec!(3));
        assert_eq!(plan.commission_rate(CourierType::LokmaCourier), dec!(9));
    }

    #[test]
    fn test_commission_rate_is_one_of_three() {
        let plan = PlanDefaults::STANDARD.resolve(PlanDocument {
            commission_own_courier: Some(dec!(6)),
            ..bare("x")
        });
        let configured = [
            plan.commission_click_collect,
            plan.commission_own_courier,
            plan.commission_lokma_courier,
        ];
        for ct in [
            CourierType::ClickCollect,
            CourierType::OwnCourier,
            CourierType::LokmaCourier,
        ] {
            assert!(configured.contains(&plan.commission_rate(ct)));
        }
    }

    #[test]
    fn test_overage_policy_per_limit_type() {
        let mut plan = PlanDefaults::STANDARD.resolve(PlanDocument {
            order_overage_action: Some(OverageAction::OverageFee),
            ..bare("x")
        });
        assert_eq!(
            plan.overage_action_for(LimitType::Orders),
            OverageAction::OverageFee
        );
        assert_eq!(plan.overage_action_for(LimitType::Push), OverageAction::Block);
        assert_eq!(
            plan.overage_action_for(LimitType::TableReservation),
            OverageAction::None
        );

        plan.table_reservation_limit = Some(10);
        assert_eq!(
            plan.overage_action_for(LimitType::TableReservation),
            OverageAction::OverageFee
        );
    }

    #[test]
    fn test_document_deserializes_partial_json() {
        let json = r#"{"id":"free","order_limit":30,"order_overage_action":"block"}"#;
        let doc: PlanDocument = serde_json::from_str(json).unwrap();
        assert_eq!(doc.order_limit, Some(30));
        assert_eq!(doc.order_overage_action, Some(OverageAction::Block));
        assert!(doc.commission_lokma_courier.is_none());
    }
}
