// Entity Models
//
// Each entity has a stable UUID identity that never changes.
// Account owns its PaymentPredictions.

pub mod account;
pub mod prediction;

pub use account::{
    format_date, parse_date, Account, AccountSummary, NewAccount, UpdateAccount, DATE_FORMAT,
};
pub use prediction::{PaymentPrediction, PredictionLabel, PredictionStatus};
