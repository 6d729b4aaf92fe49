// 🎯 Scoring Function - opaque binary classifier over [amount, due_date]
//
// The service only depends on the `Scorer` trait. The bundled model is a
// k-nearest-neighbours vote over min-max normalised features, persisted as a
// JSON artifact tagged by model kind and loaded once at process start.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Number of features fed to the scorer
pub const FEATURE_COUNT: usize = 2;

/// `[amount, due_date as seconds since the Unix epoch]`
pub type FeatureVector = [f64; FEATURE_COUNT];

/// Build the feature vector for an amount and due date
///
/// The date is taken at midnight UTC.
pub fn payment_features(amount: f64, due_date: NaiveDate) -> FeatureVector {
    let seconds = due_date.and_time(NaiveTime::MIN).and_utc().timestamp();
    [amount, seconds as f64]
}

// ============================================================================
// SCORER TRAIT
// ============================================================================

/// Interface for payment classifiers
///
/// Implementations must be deterministic and side-effect-free: a single
/// instance is shared by every request for the lifetime of the process.
pub trait Scorer: Send + Sync {
    /// `true` when the account is predicted to be paid
    fn score(&self, features: &FeatureVector) -> bool;

    /// Model name/type
    fn name(&self) -> &str;
}

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model artifact not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to access model artifact {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse model artifact: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid model: {0}")]
    Invalid(String),
}

// ============================================================================
// NEAREST NEIGHBOUR MODEL
// ============================================================================

/// One labelled point in feature space
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelledPoint {
    pub features: FeatureVector,
    pub paid: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearestNeighborModel {
    /// Neighbours consulted per vote
    pub k: usize,
    /// Per-feature minimum seen during training
    pub min: FeatureVector,
    /// Per-feature maximum seen during training
    pub max: FeatureVector,
    pub points: Vec<LabelledPoint>,
    pub trained_at: DateTime<Utc>,
}

impl NearestNeighborModel {
    /// Fit the model: remember the points and the feature ranges
    pub fn fit(points: Vec<LabelledPoint>, k: usize) -> Result<Self, ModelError> {
        if points.is_empty() {
            return Err(ModelError::Invalid("no training points".to_string()));
        }

        let mut min = [f64::INFINITY; FEATURE_COUNT];
        let mut max = [f64::NEG_INFINITY; FEATURE_COUNT];
        for point in &points {
            for (i, value) in point.features.iter().enumerate() {
                min[i] = min[i].min(*value);
                max[i] = max[i].max(*value);
            }
        }

        let model = NearestNeighborModel {
            k,
            min,
            max,
            points,
            trained_at: Utc::now(),
        };
        model.validate()?;
        Ok(model)
    }

    /// Reject artifacts that could not produce a vote
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.k == 0 {
            return Err(ModelError::Invalid("k must be at least 1".to_string()));
        }
        if self.points.is_empty() {
            return Err(ModelError::Invalid("no training points".to_string()));
        }
        let all_finite = self
            .points
            .iter()
            .flat_map(|p| p.features.iter())
            .chain(self.min.iter())
            .chain(self.max.iter())
            .all(|v| v.is_finite());
        if !all_finite {
            return Err(ModelError::Invalid("non-finite feature value".to_string()));
        }
        Ok(())
    }

    fn normalise(&self, features: &FeatureVector) -> FeatureVector {
        let mut out = [0.0; FEATURE_COUNT];
        for i in 0..FEATURE_COUNT {
            let range = self.max[i] - self.min[i];
            out[i] = if range > 0.0 {
                (features[i] - self.min[i]) / range
            } else {
                0.0
            };
        }
        out
    }

    fn squared_distance(a: &FeatureVector, b: &FeatureVector) -> f64 {
        a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
    }
}

impl Scorer for NearestNeighborModel {
    fn score(&self, features: &FeatureVector) -> bool {
        let query = self.normalise(features);

        let mut distances: Vec<(f64, bool)> = self
            .points
            .iter()
            .map(|p| (Self::squared_distance(&query, &self.normalise(&p.features)), p.paid))
            .collect();

        // Stable sort: equal distances keep training order
        distances.sort_by(|a, b| a.0.total_cmp(&b.0));

        let consulted = self.k.min(distances.len());
        let paid_votes = distances
            .iter()
            .take(consulted)
            .filter(|(_, paid)| *paid)
            .count();

        // Ties go to "not paid"
        paid_votes * 2 > consulted
    }

    fn name(&self) -> &str {
        "nearest_neighbors"
    }
}

// ============================================================================
// ARTIFACT
// ============================================================================

/// Serialized form of a trained model
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelArtifact {
    NearestNeighbors(NearestNeighborModel),
}

impl ModelArtifact {
    /// Load an artifact from disk. A missing file is `ModelError::NotFound`.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ModelError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ModelError::NotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|source| ModelError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let artifact: ModelArtifact = serde_json::from_str(&content)?;
        artifact.validate()?;
        Ok(artifact)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ModelError> {
        let path = path.as_ref();
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).map_err(|source| ModelError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        match self {
            ModelArtifact::NearestNeighbors(model) => model.validate(),
        }
    }

    pub fn into_scorer(self) -> Arc<dyn Scorer> {
        match self {
            ModelArtifact::NearestNeighbors(model) => Arc::new(model),
        }
    }
}

/// Load the scorer used for the whole process lifetime
pub fn load_scorer<P: AsRef<Path>>(path: P) -> Result<Arc<dyn Scorer>, ModelError> {
    let artifact = ModelArtifact::from_file(path.as_ref())?;
    let scorer = artifact.into_scorer();
    info!(path = ?path.as_ref(), model = scorer.name(), "scoring model loaded");
    Ok(scorer)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn point(amount: f64, day: u32, paid: bool) -> LabelledPoint {
        LabelledPoint {
            features: payment_features(amount, NaiveDate::from_ymd_opt(2024, 12, day).unwrap()),
            paid,
        }
    }

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("{}-{}.json", name, uuid::Uuid::new_v4()))
    }

    #[test]
    fn test_payment_features_use_midnight_utc() {
        let features = payment_features(150.0, NaiveDate::from_ymd_opt(2024, 12, 15).unwrap());
        assert_eq!(features[0], 150.0);
        assert_eq!(features[1], 1_734_220_800.0);
    }

    #[test]
    fn test_single_neighbour_returns_own_label() {
        let model = NearestNeighborModel::fit(
            vec![point(100.0, 5, true), point(200.0, 10, false)],
            1,
        )
        .unwrap();

        assert!(model.score(&point(100.0, 5, true).features));
        assert!(!model.score(&point(200.0, 10, false).features));
    }

    #[test]
    fn test_majority_vote() {
        let model = NearestNeighborModel::fit(
            vec![
                point(100.0, 1, true),
                point(101.0, 1, true),
                point(102.0, 1, false),
                point(500.0, 28, false),
            ],
            3,
        )
        .unwrap();

        assert!(model.score(&point(100.5, 1, false).features));
    }

    #[test]
    fn test_tie_is_not_paid() {
        let model = NearestNeighborModel::fit(
            vec![point(100.0, 1, true), point(100.0, 1, false)],
            2,
        )
        .unwrap();

        assert!(!model.score(&point(100.0, 1, false).features));
    }

    #[test]
    fn test_fit_rejects_empty_and_zero_k() {
        assert!(NearestNeighborModel::fit(vec![], 3).is_err());
        assert!(NearestNeighborModel::fit(vec![point(1.0, 1, true)], 0).is_err());
    }

    #[test]
    fn test_artifact_save_and_load() {
        let path = temp_path("model");
        let model = NearestNeighborModel::fit(vec![point(100.0, 5, true)], 1).unwrap();

        ModelArtifact::NearestNeighbors(model.clone()).save(&path).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("\"kind\": \"nearest_neighbors\""));

        let scorer = load_scorer(&path).unwrap();
        assert_eq!(scorer.name(), "nearest_neighbors");
        assert!(scorer.score(&point(100.0, 5, true).features));

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_missing_artifact_is_not_found() {
        let path = temp_path("missing");
        match load_scorer(&path) {
            Err(ModelError::NotFound(p)) => assert_eq!(p, path),
            Err(other) => panic!("expected NotFound, got {}", other),
            Ok(_) => panic!("expected NotFound, got a scorer"),
        }
    }

    #[test]
    fn test_corrupt_artifact_is_parse_error() {
        let path = temp_path("corrupt");
        fs::write(&path, "{ not json").unwrap();

        assert!(matches!(load_scorer(&path), Err(ModelError::Parse(_))));

        fs::remove_file(&path).unwrap();
    }
}
