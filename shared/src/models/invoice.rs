//! Invoice Model
//!
//! One invoice per business per billing period. The engine only produces
//! `draft` invoices; the rest of the lifecycle is driven elsewhere.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::period::BillingPeriod;

/// Invoice lifecycle: `draft → issued → paid | overdue | cancelled`
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    #[default]
    Draft,
    Issued,
    Paid,
    Overdue,
    Cancelled,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Issued => "issued",
            Self::Paid => "paid",
            Self::Overdue => "overdue",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(Self::Draft),
            "issued" => Some(Self::Issued),
            "paid" => Some(Self::Paid),
            "overdue" => Some(Self::Overdue),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    pub fn can_transition_to(&self, next: InvoiceStatus) -> bool {
        use InvoiceStatus::*;
        matches!(
            (self, next),
            (Draft, Issued)
                | (Draft, Cancelled)
                | (Issued, Paid)
                | (Issued, Overdue)
                | (Issued, Cancelled)
                | (Overdue, Paid)
                | (Overdue, Cancelled)
        )
    }
}

/// Line item classification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum LineItemType {
    Subscription,
    Commission,
    Overage,
    PerOrder,
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InvoiceLineItem {
    pub description: String,
    pub quantity: u64,
    pub unit_price: Decimal,
    pub total: Decimal,
    #[serde(rename = "type")]
    pub item_type: LineItemType,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Invoice {
    pub id: String,
    /// `INV-<last 4 of business id>-<YYYYMM>`
    pub invoice_number: String,
    pub business_id: String,
    pub plan_id: String,
    pub period: BillingPeriod,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub line_items: Vec<InvoiceLineItem>,
    pub subtotal: Decimal,
    /// Percent
    pub tax_rate: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    pub currency: String,
    pub status: InvoiceStatus,
    pub due_date: NaiveDate,
    pub created_at: i64,
}

impl Invoice {
    /// Build the invoice number for a business and period
    pub fn number_for(business_id: &str, period: &BillingPeriod) -> String {
        let chars: Vec<char> = business_id.chars().collect();
        let start = chars.len().saturating_sub(4);
        let suffix: String = chars[start..].iter().collect::<String>().to_uppercase();
        format!("INV-{}-{}", suffix, period.compact())
    }
}
