//! Limit Enforcer
//!
//! Read-only decision: may a business perform one more action of a given
//! type this month? The counter itself is bumped separately through
//! [`LimitEnforcer::increment_usage`], after the action succeeded.
//!
//! Resolution rules:
//! - unknown business: fail closed (`allowed = false`)
//! - business without a resolvable plan: fail open (allowed, unlimited)

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::error::{AppError, ErrorCode};
use shared::models::{BillingPeriod, LimitType, MonthUsage, OverageAction, Plan};
use std::sync::Arc;

use super::plans::PlanCatalog;
use crate::db::BillingStore;
use crate::error::ServiceResult;

/// Message language
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    De,
    En,
    Tr,
}

impl Locale {
    /// Lenient parse: unknown tags fall back to German
    pub fn from_tag(tag: &str) -> Self {
        let primary = tag.split(['-', '_']).next().unwrap_or_default();
        match primary.to_ascii_lowercase().as_str() {
            "en" => Self::En,
            "tr" => Self::Tr,
            _ => Self::De,
        }
    }

    fn limit_label(&self, limit_type: LimitType) -> &'static str {
        match (self, limit_type) {
            (Self::De, LimitType::Orders) => "Bestellungen",
            (Self::De, LimitType::Push) => "Push-Benachrichtigungen",
            (Self::De, LimitType::TableReservation) => "Tischreservierungen",
            (Self::En, LimitType::Orders) => "orders",
            (Self::En, LimitType::Push) => "push notifications",
            (Self::En, LimitType::TableReservation) => "table reservations",
            (Self::Tr, LimitType::Orders) => "sipariş",
            (Self::Tr, LimitType::Push) => "bildirim",
            (Self::Tr, LimitType::TableReservation) => "masa rezervasyonu",
        }
    }

    fn blocked_message(&self, limit_type: LimitType, limit: u32) -> String {
        let label = self.limit_label(limit_type);
        match self {
            Self::De => format!(
                "Sie haben Ihr monatliches Limit für {label} ({limit}) erreicht. Bitte wechseln Sie zu einem höheren Plan."
            ),
            Self::En => format!(
                "You have reached your monthly limit for {label} ({limit}). Please upgrade your plan."
            ),
            Self::Tr => format!(
                "Aylık {label} limitinize ({limit}) ulaştınız. Lütfen planınızı yükseltin."
            ),
        }
    }

    fn overage_message(&self, limit_type: LimitType, limit: u32, fee: Decimal, currency: &str) -> String {
        let label = self.limit_label(limit_type);
        match self {
            Self::De => format!(
                "Monatliches Limit für {label} ({limit}) erreicht. Jede weitere Einheit kostet {fee} {currency}."
            ),
            Self::En => format!(
                "Monthly limit for {label} ({limit}) reached. Each additional unit costs {fee} {currency}."
            ),
            Self::Tr => format!(
                "Aylık {label} limiti ({limit}) aşıldı. Her ek birim {fee} {currency} olarak ücretlendirilir."
            ),
        }
    }

    fn unknown_business_message(&self) -> String {
        match self {
            Self::De => "Unternehmen nicht gefunden.".to_string(),
            Self::En => "Business not found.".to_string(),
            Self::Tr => "İşletme bulunamadı.".to_string(),
        }
    }
}

/// Result of a limit check
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LimitCheck {
    pub allowed: bool,
    pub current_usage: u64,
    /// `None` = unlimited
    pub limit: Option<u32>,
    /// `None` = unlimited; never negative
    pub remaining: Option<u64>,
    pub is_over_limit: bool,
    pub overage_action: OverageAction,
    pub overage_fee: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl LimitCheck {
    fn unlimited(current_usage: u64) -> Self {
        Self {
            allowed: true,
            current_usage,
            limit: None,
            remaining: None,
            is_over_limit: false,
            overage_action: OverageAction::None,
            overage_fee: Decimal::ZERO,
            message: None,
        }
    }

    fn unknown_business(locale: Locale) -> Self {
        Self {
            allowed: false,
            current_usage: 0,
            limit: None,
            remaining: None,
            is_over_limit: false,
            overage_action: OverageAction::Block,
            overage_fee: Decimal::ZERO,
            message: Some(locale.unknown_business_message()),
        }
    }
}

/// Pure decision for one limit type
pub fn evaluate(plan: &Plan, limit_type: LimitType, current_usage: u64, locale: Locale) -> LimitCheck {
    let Some(limit) = plan.limit_for(limit_type) else {
        return LimitCheck::unlimited(current_usage);
    };

    let remaining = u64::from(limit).saturating_sub(current_usage);
    let is_over_limit = current_usage >= u64::from(limit);
    let overage_action = plan.overage_action_for(limit_type);
    let overage_fee = plan.overage_fee_for(limit_type);

    let (allowed, message) = match (is_over_limit, overage_action) {
        (true, OverageAction::Block) => (false, Some(locale.blocked_message(limit_type, limit))),
        (true, OverageAction::OverageFee) => (
            true,
            Some(locale.overage_message(limit_type, limit, overage_fee, &plan.currency)),
        ),
        _ => (true, None),
    };

    LimitCheck {
        allowed,
        current_usage,
        limit: Some(limit),
        remaining: Some(remaining),
        is_over_limit,
        overage_action,
        overage_fee,
        message,
    }
}

/// Usage of one limit type within a month
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LimitUsage {
    pub limit_type: LimitType,
    pub used: u64,
    pub limit: Option<u32>,
    pub remaining: Option<u64>,
    pub is_over_limit: bool,
}

/// Month counters with their limits (dashboard feed)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UsageSummary {
    pub business_id: String,
    pub period: BillingPeriod,
    pub plan_id: Option<String>,
    pub usage: MonthUsage,
    pub account_balance: Decimal,
    pub limits: Vec<LimitUsage>,
}

#[derive(Clone)]
pub struct LimitEnforcer {
    store: Arc<dyn BillingStore>,
    catalog: Arc<PlanCatalog>,
}

impl LimitEnforcer {
    pub fn new(store: Arc<dyn BillingStore>, catalog: Arc<PlanCatalog>) -> Self {
        Self { store, catalog }
    }

    /// May the business perform one more `limit_type` action this month?
    pub async fn check_limit(
        &self,
        business_id: &str,
        limit_type: LimitType,
        locale: Locale,
    ) -> ServiceResult<LimitCheck> {
        let Some(business) = self.store.find_business(business_id).await? else {
            tracing::warn!(business_id = %business_id, limit_type = %limit_type, "Limit check for unknown business");
            return Ok(LimitCheck::unknown_business(locale));
        };

        let usage = self
            .store
            .month_usage(business_id, BillingPeriod::current())
            .await?;
        let current = usage.count(limit_type);

        let Some(plan) = self.catalog.plan_for_business(&business).await? else {
            tracing::warn!(
                business_id = %business_id,
                plan = ?business.subscription_plan,
                "Plan not resolvable, limit check fails open"
            );
            return Ok(LimitCheck::unlimited(current));
        };

        let check = evaluate(&plan, limit_type, current, locale);
        if !check.allowed {
            tracing::info!(
                business_id = %business_id,
                limit_type = %limit_type,
                current = current,
                limit = ?check.limit,
                "Action blocked by plan limit"
            );
        }
        Ok(check)
    }

    /// Count `amount` successful actions against the current month
    pub async fn increment_usage(
        &self,
        business_id: &str,
        limit_type: LimitType,
        amount: u64,
    ) -> ServiceResult<()> {
        if amount == 0 {
            return Err(AppError::with_message(
                ErrorCode::InvalidUsageAmount,
                "Usage amount must be at least 1",
            )
            .into());
        }
        let period = BillingPeriod::current();
        self.store
            .increment_usage(business_id, period, limit_type, amount)
            .await?;
        tracing::debug!(
            business_id = %business_id,
            limit_type = %limit_type,
            amount = amount,
            period = %period,
            "Usage incremented"
        );
        Ok(())
    }

    pub async fn usage_summary(
        &self,
        business_id: &str,
        period: BillingPeriod,
    ) -> ServiceResult<UsageSummary> {
        let business = self
            .store
            .find_business(business_id)
            .await?
            .ok_or_else(|| AppError::business_not_found(business_id))?;
        let usage = self.store.month_usage(business_id, period).await?;
        let plan = self.catalog.plan_for_business(&business).await?;

        let limits = LimitType::ALL
            .iter()
            .map(|&limit_type| {
                let used = usage.count(limit_type);
                let limit = plan.as_ref().and_then(|p| p.limit_for(limit_type));
                LimitUsage {
                    limit_type,
                    used,
                    limit,
                    remaining: limit.map(|l| u64::from(l).saturating_sub(used)),
                    is_over_limit: limit.is_some_and(|l| used >= u64::from(l)),
                }
            })
            .collect();

        Ok(UsageSummary {
            business_id: business.id,
            period,
            plan_id: plan.map(|p| p.id),
            usage,
            account_balance: business.account_balance,
            limits,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use rust_decimal_macros::dec;
    use shared::models::{Business, PlanDefaults, PlanDocument};
    use std::time::Duration;

    fn plan(doc: PlanDocument) -> Plan {
        PlanDefaults::STANDARD.resolve(doc)
    }

    fn order_plan(limit: u32, action: OverageAction) -> Plan {
        plan(PlanDocument {
            id: "p".into(),
            order_limit: Some(limit),
            order_overage_action: Some(action),
            order_overage_fee: Some(dec!(0.50)),
            ..Default::default()
        })
    }

    #[test]
    fn test_limit_boundary() {
        let p = order_plan(50, OverageAction::Block);

        let at_limit = evaluate(&p, LimitType::Orders, 50, Locale::En);
        assert!(at_limit.is_over_limit);
        assert!(!at_limit.allowed);
        assert_eq!(at_limit.remaining, Some(0));
        assert!(at_limit.message.is_some());

        let below = evaluate(&p, LimitType::Orders, 49, Locale::En);
        assert!(!below.is_over_limit);
        assert!(below.allowed);
        assert_eq!(below.remaining, Some(1));
        assert!(below.message.is_none());
    }

    #[test]
    fn test_overage_fee_allows_with_warning() {
        let p = order_plan(200, OverageAction::OverageFee);
        let check = evaluate(&p, LimitType::Orders, 230, Locale::En);
        assert!(check.allowed);
        assert!(check.is_over_limit);
        assert_eq!(check.remaining, Some(0));
        assert_eq!(check.overage_fee, dec!(0.50));
        let msg = check.message.unwrap();
        assert!(msg.contains("0.50"), "{msg}");
        assert!(msg.contains("EUR"), "{msg}");
    }

    #[test]
    fn test_over_limit_with_no_policy_is_silent() {
        let p = order_plan(10, OverageAction::None);
        let check = evaluate(&p, LimitType::Orders, 12, Locale::De);
        assert!(check.allowed);
        assert!(check.is_over_limit);
        assert!(check.message.is_none());
    }

    #[test]
    fn test_push_is_always_blocked_past_campaign_limit() {
        let p = plan(PlanDocument {
            id: "p".into(),
            campaign_limit: Some(2),
            order_overage_action: Some(OverageAction::OverageFee),
            ..Default::default()
        });
        let check = evaluate(&p, LimitType::Push, 2, Locale::Tr);
        assert!(!check.allowed);
        assert_eq!(check.overage_action, OverageAction::Block);
        assert!(check.message.unwrap().contains("bildirim"));
    }

    #[test]
    fn test_table_reservations_charge_when_limited() {
        let limited = plan(PlanDocument {
            id: "p".into(),
            table_reservation_limit: Some(5),
            table_reservation_overage_fee: Some(dec!(0.30)),
            ..Default::default()
        });
        let check = evaluate(&limited, LimitType::TableReservation, 7, Locale::De);
        assert!(check.allowed);
        assert_eq!(check.overage_action, OverageAction::OverageFee);
        assert!(check.message.unwrap().contains("Tischreservierungen"));

        let unlimited = plan(PlanDocument {
            id: "p".into(),
            ..Default::default()
        });
        let check = evaluate(&unlimited, LimitType::TableReservation, 700, Locale::De);
        assert!(check.allowed);
        assert_eq!(check.limit, None);
        assert_eq!(check.remaining, None);
        assert_eq!(check.overage_action, OverageAction::None);
    }

    #[test]
    fn test_locale_from_tag() {
        assert_eq!(Locale::from_tag("en-GB"), Locale::En);
        assert_eq!(Locale::from_tag("TR"), Locale::Tr);
        assert_eq!(Locale::from_tag("fr"), Locale::De);
        assert_eq!(Locale::from_tag(""), Locale::De);
    }

    fn enforcer(store: Arc<MemoryStore>) -> LimitEnforcer {
        let catalog = Arc::new(PlanCatalog::new(store.clone(), Duration::from_secs(60)));
        LimitEnforcer::new(store, catalog)
    }

    #[tokio::test]
    async fn test_unknown_business_fails_closed() {
        let limits = enforcer(Arc::new(MemoryStore::new()));

        let check = limits
            .check_limit("ghost", LimitType::Orders, Locale::En)
            .await
            .unwrap();
        assert!(!check.allowed);
        assert_eq!(check.message.as_deref(), Some("Business not found."));

        let check = limits
            .check_limit("ghost", LimitType::Push, Locale::De)
            .await
            .unwrap();
        assert!(!check.allowed);
        assert_eq!(check.message.as_deref(), Some("Unternehmen nicht gefunden."));
    }

    #[tokio::test]
    async fn test_unresolvable_plan_fails_open() {
        let store = Arc::new(MemoryStore::new());
        store
            .upsert_business(&Business {
                id: "b1".into(),
                subscription_plan: Some("retired-plan".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        store
            .increment_usage("b1", BillingPeriod::current(), LimitType::Orders, 3)
            .await
            .unwrap();
        let limits = enforcer(store);

        let check = limits
            .check_limit("b1", LimitType::Orders, Locale::De)
            .await
            .unwrap();
        assert!(check.allowed);
        assert_eq!(check.limit, None);
        assert_eq!(check.remaining, None);
        assert_eq!(check.current_usage, 3);
        assert!(check.message.is_none());
    }
}
