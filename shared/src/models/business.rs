//! Business & Usage Ledger Models

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{AppError, ErrorCode};

/// A tenant selling through the marketplace (butcher, restaurant, event vendor)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Business {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub business_type: Option<String>,
    /// Plan code (resolved by id first, then by `code`)
    #[serde(default)]
    pub subscription_plan: Option<String>,
    /// Business runs its own delivery staff
    #[serde(default)]
    pub has_own_courier: bool,
    /// Owed to the platform for cash-settled orders, only grows until cleared
    #[serde(default)]
    pub account_balance: Decimal,
    /// Unix millis of the last recorded order
    #[serde(default)]
    pub last_order_at: Option<i64>,
}

/// Limited action types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum LimitType {
    Orders,
    Push,
    TableReservation,
}

impl LimitType {
    pub const ALL: [LimitType; 3] = [Self::Orders, Self::Push, Self::TableReservation];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Orders => "orders",
            Self::Push => "push",
            Self::TableReservation => "table_reservation",
        }
    }
}

impl fmt::Display for LimitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LimitType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "orders" => Ok(Self::Orders),
            "push" => Ok(Self::Push),
            "table_reservation" | "table_reservations" => Ok(Self::TableReservation),
            other => Err(AppError::with_message(
                ErrorCode::InvalidLimitType,
                format!("Unknown limit type: {other}"),
            )),
        }
    }
}

/// Per-business, per-month counters
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MonthUsage {
    pub orders: u64,
    pub total_commission: Decimal,
    pub push: u64,
    pub table_reservations: u64,
}

impl MonthUsage {
    /// Counter consumed by a limit type
    pub fn count(&self, limit_type: LimitType) -> u64 {
        match limit_type {
            LimitType::Orders => self.orders,
            LimitType::Push => self.push,
            LimitType::TableReservation => self.table_reservations,
        }
    }

    /// Mutable counter for a limit type (used by in-process stores)
    pub fn counter_mut(&mut self, limit_type: LimitType) -> &mut u64 {
        match limit_type {
            LimitType::Orders => &mut self.orders,
            LimitType::Push => &mut self.push,
            LimitType::TableReservation => &mut self.table_reservations,
        }
    }
}
