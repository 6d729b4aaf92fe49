// 🔮 PaymentPrediction Entity - append-only log of prediction attempts
//
// Created once per prediction request, never updated in place.
// Removed only through cascade when the owning Account is deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// PREDICTION LABEL
// ============================================================================

/// Binary forecast of whether an account will be paid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PredictionLabel {
    #[serde(rename = "pago")]
    Paid,
    #[serde(rename = "não pago")]
    NotPaid,
}

impl PredictionLabel {
    /// Map the scorer's binary indicator onto a label
    pub fn from_indicator(paid: bool) -> Self {
        if paid {
            PredictionLabel::Paid
        } else {
            PredictionLabel::NotPaid
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PredictionLabel::Paid => "pago",
            PredictionLabel::NotPaid => "não pago",
        }
    }
}

impl fmt::Display for PredictionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PredictionLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pago" => Ok(PredictionLabel::Paid),
            "não pago" => Ok(PredictionLabel::NotPaid),
            other => Err(format!("unknown prediction label: {}", other)),
        }
    }
}

// ============================================================================
// PREDICTION STATUS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PredictionStatus {
    #[default]
    Pending,
    Success,
    Failed,
}

impl PredictionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PredictionStatus::Pending => "pending",
            PredictionStatus::Success => "success",
            PredictionStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for PredictionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PredictionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PredictionStatus::Pending),
            "success" => Ok(PredictionStatus::Success),
            "failed" => Ok(PredictionStatus::Failed),
            other => Err(format!("unknown prediction status: {}", other)),
        }
    }
}

// ============================================================================
// PAYMENT PREDICTION ENTITY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentPrediction {
    /// Stable identity (UUID)
    pub id: String,

    /// Owning account (foreign key, cascade delete)
    pub account_id: String,

    pub prediction: PredictionLabel,

    pub status: PredictionStatus,

    /// Set at creation, immutable
    pub predicted_at: DateTime<Utc>,
}

impl PaymentPrediction {
    /// New prediction with the default `pending` status
    pub fn new(account_id: &str, prediction: PredictionLabel) -> Self {
        PaymentPrediction {
            id: uuid::Uuid::new_v4().to_string(),
            account_id: account_id.to_string(),
            prediction,
            status: PredictionStatus::default(),
            predicted_at: Utc::now(),
        }
    }

    /// A prediction the scorer produced successfully
    pub fn succeeded(account_id: &str, prediction: PredictionLabel) -> Self {
        PaymentPrediction {
            status: PredictionStatus::Success,
            ..PaymentPrediction::new(account_id, prediction)
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_wire_format() {
        assert_eq!(
            serde_json::to_string(&PredictionLabel::Paid).unwrap(),
            "\"pago\""
        );
        assert_eq!(
            serde_json::to_string(&PredictionLabel::NotPaid).unwrap(),
            "\"não pago\""
        );
        assert_eq!("não pago".parse::<PredictionLabel>().unwrap(), PredictionLabel::NotPaid);
        assert!("maybe".parse::<PredictionLabel>().is_err());
    }

    #[test]
    fn test_label_from_indicator() {
        assert_eq!(PredictionLabel::from_indicator(true), PredictionLabel::Paid);
        assert_eq!(PredictionLabel::from_indicator(false), PredictionLabel::NotPaid);
    }

    #[test]
    fn test_status_defaults_to_pending() {
        let prediction = PaymentPrediction::new("acct-1", PredictionLabel::Paid);
        assert_eq!(prediction.status, PredictionStatus::Pending);
        assert_eq!(prediction.status.to_string(), "pending");
    }

    #[test]
    fn test_succeeded_prediction() {
        let prediction = PaymentPrediction::succeeded("acct-1", PredictionLabel::NotPaid);
        assert_eq!(prediction.status, PredictionStatus::Success);
        assert_eq!(prediction.account_id, "acct-1");
        assert!(!prediction.id.is_empty());
    }
}
