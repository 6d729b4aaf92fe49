// 🧪 Training - build a scoring artifact from labelled payment history
//
// The default dataset is a tiny hard-coded history; a CSV with
// `valor,due_date,paid` columns can be used instead.

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use std::path::Path;

use crate::entities::parse_date;
use crate::scoring::{payment_features, LabelledPoint, ModelArtifact, NearestNeighborModel};

/// Neighbours consulted per vote unless overridden
pub const DEFAULT_K: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSample {
    pub valor: f64,
    pub due_date: NaiveDate,
    pub paid: bool,
}

impl TrainingSample {
    fn to_point(&self) -> LabelledPoint {
        LabelledPoint {
            features: payment_features(self.valor, self.due_date),
            paid: self.paid,
        }
    }
}

/// CSV row as written by hand: `paid` is 1 or 0
#[derive(Debug, Deserialize)]
struct CsvSample {
    valor: f64,
    due_date: String,
    paid: u8,
}

/// Built-in payment history
pub fn default_dataset() -> Vec<TrainingSample> {
    let rows: [(f64, u32, bool); 5] = [
        (100.0, 5, true),
        (200.0, 10, false),
        (150.0, 15, true),
        (50.0, 20, false),
        (300.0, 25, true),
    ];

    rows.iter()
        .filter_map(|(valor, day, paid)| {
            NaiveDate::from_ymd_opt(2024, 12, *day).map(|due_date| TrainingSample {
                valor: *valor,
                due_date,
                paid: *paid,
            })
        })
        .collect()
}

/// Load labelled samples from CSV
pub fn load_training_csv(csv_path: &Path) -> Result<Vec<TrainingSample>> {
    let mut rdr = csv::Reader::from_path(csv_path)
        .with_context(|| format!("Failed to open training CSV: {:?}", csv_path))?;

    let mut samples = Vec::new();

    for (line, result) in rdr.deserialize().enumerate() {
        let row: CsvSample = result
            .with_context(|| format!("Failed to deserialize training row {}", line + 1))?;

        let due_date = parse_date(&row.due_date)
            .with_context(|| format!("Bad due_date on training row {}", line + 1))?;

        let paid = match row.paid {
            1 => true,
            0 => false,
            other => bail!(
                "Invalid paid label {} on training row {} (expected 1 or 0)",
                other,
                line + 1
            ),
        };

        samples.push(TrainingSample {
            valor: row.valor,
            due_date,
            paid,
        });
    }

    Ok(samples)
}

/// Fit the nearest-neighbour model and wrap it as an artifact
pub fn train(samples: &[TrainingSample], k: usize) -> Result<ModelArtifact> {
    let points = samples.iter().map(TrainingSample::to_point).collect();
    let model = NearestNeighborModel::fit(points, k).context("Failed to train model")?;

    Ok(ModelArtifact::NearestNeighbors(model))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::Scorer;
    use std::fs;

    #[test]
    fn test_default_dataset() {
        let samples = default_dataset();

        assert_eq!(samples.len(), 5);
        assert_eq!(samples.iter().filter(|s| s.paid).count(), 3);
        assert_eq!(
            samples[2].due_date,
            NaiveDate::from_ymd_opt(2024, 12, 15).unwrap()
        );
    }

    #[test]
    fn test_train_default_dataset() {
        let artifact = train(&default_dataset(), DEFAULT_K).unwrap();
        let scorer = artifact.into_scorer();

        // Any label is acceptable; the vote must just be deterministic
        let features = payment_features(150.0, NaiveDate::from_ymd_opt(2024, 12, 15).unwrap());
        assert_eq!(scorer.score(&features), scorer.score(&features));
    }

    #[test]
    fn test_train_with_k_one_reproduces_history() {
        let samples = default_dataset();
        let scorer = train(&samples, 1).unwrap().into_scorer();

        for sample in &samples {
            assert_eq!(scorer.score(&sample.to_point().features), sample.paid);
        }
    }

    #[test]
    fn test_train_rejects_empty_history() {
        assert!(train(&[], DEFAULT_K).is_err());
    }

    #[test]
    fn test_load_training_csv() {
        let path = std::env::temp_dir().join(format!("history-{}.csv", uuid::Uuid::new_v4()));
        fs::write(
            &path,
            "valor,due_date,paid\n100,2024-12-05,1\n200,2024-12-10,0\n",
        )
        .unwrap();

        let samples = load_training_csv(&path).unwrap();
        assert_eq!(samples.len(), 2);
        assert!(samples[0].paid);
        assert!(!samples[1].paid);
        assert_eq!(samples[1].valor, 200.0);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_load_training_csv_bad_date() {
        let path = std::env::temp_dir().join(format!("history-{}.csv", uuid::Uuid::new_v4()));
        fs::write(&path, "valor,due_date,paid\n100,12/05/2024,1\n").unwrap();

        assert!(load_training_csv(&path).is_err());

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_load_training_csv_rejects_unknown_label() {
        let path = std::env::temp_dir().join(format!("history-{}.csv", uuid::Uuid::new_v4()));
        fs::write(
            &path,
            "valor,due_date,paid\n100,2024-12-05,1\n200,2024-12-10,2\n",
        )
        .unwrap();

        let err = load_training_csv(&path).unwrap_err();
        assert!(err.to_string().contains("row 2"), "{}", err);

        fs::remove_file(&path).unwrap();
    }
}
