//! Error category classification

use super::codes::ErrorCode;
use serde::{Deserialize, Serialize};

/// Error category classification based on error code ranges
///
/// Categories are determined by the leading digit of the error code:
/// - 0xxx: General errors
/// - 1xxx: Business errors
/// - 2xxx: Plan errors
/// - 3xxx: Usage errors
/// - 5xxx: Invoice errors
/// - 9xxx: System errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// General errors (0xxx)
    General,
    /// Business errors (1xxx)
    Business,
    /// Plan errors (2xxx)
    Plan,
    /// Usage / limit errors (3xxx)
    Usage,
    /// Invoice errors (5xxx)
    Invoice,
    /// System errors (9xxx and unassigned ranges)
    System,
}

impl ErrorCategory {
    /// Determine category from error code value
    pub fn from_code(code: u16) -> Self {
        match code {
            0..1000 => Self::General,
            1000..2000 => Self::Business,
            2000..3000 => Self::Plan,
            3000..4000 => Self::Usage,
            5000..6000 => Self::Invoice,
            _ => Self::System,
        }
    }

    /// Get the string name for this category
    pub fn name(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Business => "business",
            Self::Plan => "plan",
            Self::Usage => "usage",
            Self::Invoice => "invoice",
            Self::System => "system",
        }
    }
}

impl ErrorCode {
    /// Get the category for this error code
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::from_code(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_from_code() {
        assert_eq!(ErrorCategory::from_code(0), ErrorCategory::General);
        assert_eq!(ErrorCategory::from_code(999), ErrorCategory::General);
        assert_eq!(ErrorCategory::from_code(1001), ErrorCategory::Business);
        assert_eq!(ErrorCategory::from_code(2001), ErrorCategory::Plan);
        assert_eq!(ErrorCategory::from_code(3001), ErrorCategory::Usage);
        assert_eq!(ErrorCategory::from_code(5001), ErrorCategory::Invoice);
        assert_eq!(ErrorCategory::from_code(9001), ErrorCategory::System);
        assert_eq!(ErrorCategory::from_code(10000), ErrorCategory::System);
    }

    #[test]
    fn test_error_code_category() {
        assert_eq!(
            ErrorCode::BusinessNotFound.category(),
            ErrorCategory::Business
        );
        assert_eq!(ErrorCode::PlanNotFound.category(), ErrorCategory::Plan);
        assert_eq!(ErrorCode::InvalidLimitType.category(), ErrorCategory::Usage);
        assert_eq!(ErrorCode::InvoiceNotFound.category(), ErrorCategory::Invoice);
        assert_eq!(ErrorCode::DatabaseError.category(), ErrorCategory::System);
    }

    #[test]
    fn test_category_name() {
        assert_eq!(ErrorCategory::Usage.name(), "usage");
        assert_eq!(ErrorCategory::Invoice.name(), "invoice");
    }
}
