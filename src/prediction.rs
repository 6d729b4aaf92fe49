// 🔮 Prediction Service - validate, score, record
//
// request body → PredictionRequest (validation) → Scorer → payment_predictions
//
// Exactly one prediction row per successful call, none on any failure.

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info};

use crate::db::{insert_prediction, Database};
use crate::entities::{parse_date, PaymentPrediction, PredictionLabel};
use crate::error::{ServiceError, ServiceResult};
use crate::scoring::{payment_features, Scorer};

const MISSING_FIELDS: &str = "Fields \"valor\" and \"due_date\" are required.";

// ============================================================================
// REQUEST
// ============================================================================

/// Validated body of `POST /accounts/{id}/predict_payment`
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionRequest {
    pub valor: f64,
    pub due_date: NaiveDate,
    /// The due date exactly as the caller sent it (echoed back)
    pub due_date_raw: String,
}

impl PredictionRequest {
    /// Validate a JSON body of the form `{"valor": <number>, "due_date": "YYYY-MM-DD"}`
    ///
    /// `valor` may also be a numeric string. `null` counts as missing.
    pub fn from_json(body: &Value) -> ServiceResult<Self> {
        let field = |name: &str| body.get(name).filter(|v| !v.is_null());

        let (valor, due_date) = match (field("valor"), field("due_date")) {
            (Some(valor), Some(due_date)) => (valor, due_date),
            _ => return Err(ServiceError::validation(MISSING_FIELDS)),
        };

        let valor = parse_amount(valor)?;

        let due_date_raw = due_date
            .as_str()
            .ok_or_else(|| ServiceError::validation("Field \"due_date\" must be a YYYY-MM-DD string"))?
            .to_string();
        let due_date = parse_date(&due_date_raw)?;

        Ok(PredictionRequest {
            valor,
            due_date,
            due_date_raw,
        })
    }
}

fn parse_amount(raw: &Value) -> ServiceResult<f64> {
    let amount = match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    match amount {
        Some(value) if value.is_finite() => Ok(value),
        _ => Err(ServiceError::validation(format!(
            "Field \"valor\" must be a finite number, got {}",
            raw
        ))),
    }
}

// ============================================================================
// RESULT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    pub account_id: String,
    pub valor: f64,
    pub due_date: String,
    pub prediction: PredictionLabel,
}

// ============================================================================
// SERVICE
// ============================================================================

#[derive(Clone)]
pub struct PredictionService {
    db: Database,
    scorer: Arc<dyn Scorer>,
}

impl PredictionService {
    pub fn new(db: Database, scorer: Arc<dyn Scorer>) -> Self {
        PredictionService { db, scorer }
    }

    /// Score the request and record the outcome against `account_id`
    ///
    /// Account existence is not checked here; the foreign key on
    /// `payment_predictions.account_id` rejects unknown ids as a storage error.
    pub fn predict(
        &self,
        account_id: &str,
        request: &PredictionRequest,
    ) -> ServiceResult<PredictionResult> {
        let account_id = account_id.trim();
        if account_id.is_empty() {
            return Err(ServiceError::validation("account_id must not be empty"));
        }

        let features = payment_features(request.valor, request.due_date);
        let label = PredictionLabel::from_indicator(self.scorer.score(&features));

        let record = PaymentPrediction::succeeded(account_id, label);
        self.db
            .write(|conn| Ok(insert_prediction(conn, &record)?))
            .map_err(|e| {
                error!(account_id, error = %e, kind = e.kind(), "failed to record prediction");
                e
            })?;

        info!(
            account_id,
            valor = request.valor,
            due_date = %request.due_date_raw,
            prediction = %label,
            "payment prediction recorded"
        );

        Ok(PredictionResult {
            account_id: account_id.to_string(),
            valor: request.valor,
            due_date: request.due_date_raw.clone(),
            prediction: label,
        })
    }

    /// Validate a raw JSON body, then predict
    pub fn predict_json(&self, account_id: &str, body: &Value) -> ServiceResult<PredictionResult> {
        let request = PredictionRequest::from_json(body)?;
        self.predict(account_id, &request)
    }
}

// ============================================================================
// TESTS
// ============================================================================
