// Payment Predictor - Core Library
// Exposes all modules for use in the CLI, the API server, and tests

pub mod accounts;
pub mod config;
pub mod db;
pub mod entities;
pub mod error;
pub mod logging;
pub mod prediction;
pub mod reminders;
pub mod scoring;
pub mod training;

#[cfg(feature = "server")]
pub mod api;

// Re-export commonly used types
pub use accounts::AccountService;
pub use db::{
    count_accounts, count_all_predictions, count_predictions, delete_account, get_account,
    get_all_accounts, get_predictions_for_account, insert_account, insert_accounts,
    insert_prediction, open_database, setup_database, update_account, Database,
};
pub use entities::{
    Account, AccountSummary, NewAccount, PaymentPrediction, PredictionLabel, PredictionStatus,
    UpdateAccount,
};
pub use error::{ServiceError, ServiceResult};
pub use prediction::{PredictionRequest, PredictionResult, PredictionService};
pub use reminders::ReminderService;
pub use scoring::{
    load_scorer, payment_features, FeatureVector, ModelArtifact, ModelError,
    NearestNeighborModel, Scorer,
};
pub use training::{default_dataset, load_training_csv, train, TrainingSample};

#[cfg(feature = "server")]
pub use api::{create_router, AppState};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
