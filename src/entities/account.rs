// 💳 Account Entity - a billable obligation with an amount and due date
//
// "Account id is IDENTITY (never changes), paid is STATE (set externally)"
//
// - UUID identity generated on creation, never reused
// - value is a positive, finite amount owed
// - due_date has day granularity only (stored as YYYY-MM-DD)
// - Account owns its PaymentPredictions (cascade delete)

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ServiceError, ServiceResult};

/// Wire and storage format for calendar dates
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse a `YYYY-MM-DD` calendar date
pub fn parse_date(raw: &str) -> ServiceResult<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).map_err(|_| {
        ServiceError::validation(format!(
            "Invalid due_date {:?}: expected YYYY-MM-DD",
            raw
        ))
    })
}

/// Format a calendar date as `YYYY-MM-DD`
pub fn format_date(date: &NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn validate_name(name: &str) -> ServiceResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ServiceError::validation("Account name must not be empty"));
    }
    Ok(name.to_string())
}

fn validate_value(value: f64) -> ServiceResult<f64> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ServiceError::validation(format!(
            "Account value must be a positive number, got {}",
            value
        )));
    }
    Ok(value)
}

// ============================================================================
// ACCOUNT ENTITY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    // ========================================================================
    // IDENTITY (never changes)
    // ========================================================================
    /// Stable identity (UUID)
    pub id: String,

    // ========================================================================
    // VALUES
    // ========================================================================
    /// Display name (e.g., "Electricity bill")
    pub name: String,

    /// Amount owed
    pub value: f64,

    /// Due date
    pub due_date: NaiveDate,

    /// Set externally once the account has been settled
    pub paid: bool,

    /// When this record was created in our system
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Create a new unpaid account with a fresh UUID
    ///
    /// Fails with `Validation` when the name is blank or the value is not a
    /// positive finite number.
    pub fn new(name: &str, value: f64, due_date: NaiveDate) -> ServiceResult<Self> {
        Ok(Account {
            id: uuid::Uuid::new_v4().to_string(),
            name: validate_name(name)?,
            value: validate_value(value)?,
            due_date,
            paid: false,
            created_at: Utc::now(),
        })
    }

    /// Builder-style helper for accounts imported as already settled
    pub fn with_paid(mut self, paid: bool) -> Self {
        self.paid = paid;
        self
    }

    /// Get identity (stable UUID)
    pub fn identity(&self) -> &str {
        &self.id
    }

    /// Read-facing projection used by the reminder views
    pub fn summary(&self) -> AccountSummary {
        AccountSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            value: self.value,
            due_date: format_date(&self.due_date),
            paid: self.paid,
        }
    }
}

// ============================================================================
// REMINDER PROJECTION
// ============================================================================

/// Reminder: the display projection of an Account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountSummary {
    pub id: String,
    pub name: String,
    pub value: f64,
    /// Formatted as YYYY-MM-DD
    pub due_date: String,
    pub paid: bool,
}

impl From<Account> for AccountSummary {
    fn from(account: Account) -> Self {
        account.summary()
    }
}

// ============================================================================
// CREATE PAYLOAD
// ============================================================================

/// Payload for creating an account through the API or the CSV importer
#[derive(Debug, Clone, Deserialize)]
pub struct NewAccount {
    pub name: String,
    pub value: f64,
    pub due_date: String,
    #[serde(default)]
    pub paid: bool,
}

impl NewAccount {
    /// Validate and turn the payload into a fresh Account
    pub fn into_account(self) -> ServiceResult<Account> {
        let due_date = parse_date(&self.due_date)?;
        Ok(Account::new(&self.name, self.value, due_date)?.with_paid(self.paid))
    }
}

// ============================================================================
// UPDATE PAYLOAD
// ============================================================================

/// Partial update: absent fields keep their current value
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateAccount {
    pub name: Option<String>,
    pub value: Option<f64>,
    pub due_date: Option<String>,
    pub paid: Option<bool>,
}

impl UpdateAccount {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.value.is_none() && self.due_date.is_none() && self.paid.is_none()
    }

    /// Apply the changes to a copy of `account`, with the same checks as creation
    pub fn apply_to(&self, account: &Account) -> ServiceResult<Account> {
        let mut updated = account.clone();

        if let Some(name) = &self.name {
            updated.name = validate_name(name)?;
        }
        if let Some(value) = self.value {
            updated.value = validate_value(value)?;
        }
        if let Some(due_date) = &self.due_date {
            updated.due_date = parse_date(due_date)?;
        }
        if let Some(paid) = self.paid {
            updated.paid = paid;
        }

        Ok(updated)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_account_creation() {
        let account = Account::new("Water bill", 150.0, date(2024, 12, 15)).unwrap();

        assert!(!account.id.is_empty());
        assert_eq!(account.name, "Water bill");
        assert_eq!(account.value, 150.0);
        assert!(!account.paid);
    }

    #[test]
    fn test_account_ids_are_unique() {
        let a = Account::new("A", 10.0, date(2024, 1, 1)).unwrap();
        let b = Account::new("A", 10.0, date(2024, 1, 1)).unwrap();

        assert_ne!(a.identity(), b.identity());
    }

    #[test]
    fn test_account_rejects_blank_name() {
        let err = Account::new("   ", 10.0, date(2024, 1, 1)).unwrap_err();
        assert_eq!(err.kind(), "validation");
    }

    #[test]
    fn test_account_rejects_non_positive_or_non_finite_value() {
        for value in [0.0, -5.0, f64::NAN, f64::INFINITY] {
            let result = Account::new("Rent", value, date(2024, 1, 1));
            assert!(result.is_err(), "value {} should be rejected", value);
        }
    }

    #[test]
    fn test_summary_formats_due_date() {
        let account = Account::new("Rent", 900.0, date(2024, 3, 5)).unwrap();
        let summary = account.summary();

        assert_eq!(summary.due_date, "2024-03-05");
        assert_eq!(summary.id, account.id);
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date("2024-12-15").unwrap(), date(2024, 12, 15));
        assert!(parse_date("15/12/2024").is_err());
        assert!(parse_date("2024-02-30").is_err());
        assert!(parse_date("").is_err());
    }

    #[test]
    fn test_new_account_payload() {
        let payload: NewAccount = serde_json::from_str(
            r#"{"name": "Internet", "value": 99.9, "due_date": "2024-12-20"}"#,
        )
        .unwrap();

        let account = payload.into_account().unwrap();
        assert_eq!(account.due_date, date(2024, 12, 20));
        assert!(!account.paid);
    }

    #[test]
    fn test_update_applies_only_given_fields() {
        let account = Account::new("Rent", 900.0, date(2024, 3, 5)).unwrap();
        let update: UpdateAccount =
            serde_json::from_str(r#"{"value": 950.5, "due_date": "2024-04-05"}"#).unwrap();

        let updated = update.apply_to(&account).unwrap();

        assert_eq!(updated.id, account.id);
        assert_eq!(updated.name, "Rent");
        assert_eq!(updated.value, 950.5);
        assert_eq!(updated.due_date, date(2024, 4, 5));
        assert!(!updated.paid);
        assert_eq!(updated.created_at, account.created_at);
    }

    #[test]
    fn test_update_validates_like_create() {
        let account = Account::new("Rent", 900.0, date(2024, 3, 5)).unwrap();

        for raw in [
            r#"{"value": 0}"#,
            r#"{"name": "  "}"#,
            r#"{"due_date": "soon"}"#,
        ] {
            let update: UpdateAccount = serde_json::from_str(raw).unwrap();
            let err = update.apply_to(&account).unwrap_err();
            assert_eq!(err.kind(), "validation", "{} should be rejected", raw);
        }

        assert!(serde_json::from_str::<UpdateAccount>(r#"{"id": "other"}"#).is_err());
        assert!(UpdateAccount::default().is_empty());
    }
}
