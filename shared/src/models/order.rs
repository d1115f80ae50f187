//! Order Model (trigger input)
//!
//! Orders live outside the billing engine. Only the fields the engine needs
//! are modelled; camelCase and legacy field names are accepted as aliases.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Order lifecycle status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum OrderStatus {
    Pending,
    Accepted,
    Preparing,
    Ready,
    #[serde(alias = "on_the_way")]
    OnTheWay,
    Delivered,
    Completed,
    Cancelled,
    Rejected,
}

impl OrderStatus {
    /// Transition into this status records commission
    pub fn triggers_commission(&self) -> bool {
        matches!(self, Self::Delivered | Self::Completed)
    }
}

/// How the customer paid
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    /// Captured by the payment processor (connected-account split)
    #[serde(alias = "stripe", alias = "credit_card")]
    Card,
    #[serde(other)]
    Other,
}

impl PaymentMethod {
    /// Platform cut already deducted at capture time
    pub fn is_card(&self) -> bool {
        matches!(self, Self::Card)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cash => "cash",
            Self::Card => "card",
            Self::Other => "other",
        }
    }

    pub fn from_db(s: &str) -> Self {
        match s {
            "cash" => Self::Cash,
            "card" => Self::Card,
            _ => Self::Other,
        }
    }
}

/// Fulfillment type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    #[serde(alias = "click_collect", alias = "takeaway")]
    Pickup,
    #[serde(alias = "table", alias = "dine-in")]
    DineIn,
    Delivery,
    #[serde(other)]
    Unknown,
}

/// Order document as delivered by the status-change trigger
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    pub id: String,
    /// Legacy synonym of `business_id`
    #[serde(default, alias = "butcherId")]
    pub butcher_id: Option<String>,
    #[serde(default, alias = "businessId")]
    pub business_id: Option<String>,
    #[serde(alias = "totalAmount")]
    pub total_amount: Decimal,
    #[serde(default, alias = "paymentMethod")]
    pub payment_method: Option<PaymentMethod>,
    #[serde(default, alias = "orderType")]
    pub order_type: Option<OrderType>,
    #[serde(default, alias = "deliveryMethod")]
    pub delivery_method: Option<OrderType>,
    /// Platform courier assigned to the order
    #[serde(default, alias = "assignedCourierId")]
    pub assigned_courier_id: Option<String>,
    pub status: OrderStatus,
}

impl Order {
    /// Owning business (`butcher_id` wins, empty strings ignored)
    pub fn owner_id(&self) -> Option<&str> {
        self.butcher_id
            .as_deref()
            .filter(|s| !s.is_empty())
            .or_else(|| self.business_id.as_deref().filter(|s| !s.is_empty()))
    }

    /// Either fulfillment indicator says delivery
    pub fn is_delivery(&self) -> bool {
        self.order_type == Some(OrderType::Delivery)
            || self.delivery_method == Some(OrderType::Delivery)
    }

    pub fn has_assigned_courier(&self) -> bool {
        self.assigned_courier_id
            .as_deref()
            .is_some_and(|s| !s.is_empty())
    }

    /// Missing payment method is treated as cash (owed, not collected)
    pub fn payment_method(&self) -> PaymentMethod {
        self.payment_method.unwrap_or(PaymentMethod::Cash)
    }
}

/// Before/after documents of an order status change
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderStatusChange {
    #[serde(default)]
    pub before: Option<Order>,
    pub after: Order,
}

impl OrderStatusChange {
    /// Status actually changed into delivered/completed
    pub fn is_commission_trigger(&self) -> bool {
        let changed = self
            .before
            .as_ref()
            .is_none_or(|before| before.status != self.after.status);
        changed && self.after.status.triggers_commission()
    }
}
