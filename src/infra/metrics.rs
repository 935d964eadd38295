// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Records training metrics to a CSV file after each epoch.
//
// Columns:
//   epoch, train_loss, train_acc, val_loss, val_acc
//
// val_* are empty when the validation split has no samples.
//
// Output file: <model_dir>/metrics.csv, recreated per run.
//
// Example:
//   epoch,train_loss,train_acc,val_loss,val_acc
//   1,0.693100,0.512500,0.688000,0.550000
//   2,0.512300,0.781250,0.540100,0.750000

use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::domain::error::{ClassifierError, Result};

pub const METRICS_FILE: &str = "metrics.csv";

/// One row of metrics data for a single training epoch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// The epoch number (starts at 1)
    pub epoch: usize,

    /// Mean cross-entropy over the training batches
    pub train_loss: f64,

    /// Fraction of training samples classified correctly
    pub train_accuracy: f64,

    pub val_loss: Option<f64>,

    pub val_accuracy: Option<f64>,
}

impl EpochMetrics {
    /// True if this epoch's validation loss beats `best_val_loss`.
    pub fn is_improvement(&self, best_val_loss: f64) -> bool {
        matches!(self.val_loss, Some(loss) if loss < best_val_loss)
    }
}

pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Create (or truncate) `metrics.csv` in `dir` and write the header.
    pub fn create(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir).map_err(|e| ClassifierError::persist(dir, e))?;
        let csv_path = dir.join(METRICS_FILE);

        let mut f = fs::File::create(&csv_path).map_err(|e| ClassifierError::persist(&csv_path, e))?;
        writeln!(f, "epoch,train_loss,train_acc,val_loss,val_acc")
            .map_err(|e| ClassifierError::persist(&csv_path, e))?;
        tracing::debug!("Created metrics CSV: '{}'", csv_path.display());

        Ok(Self { csv_path })
    }

    /// Append one epoch's metrics as a new row in the CSV.
    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let optional = |v: Option<f64>| v.map(|v| format!("{v:.6}")).unwrap_or_default();

        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .map_err(|e| ClassifierError::persist(&self.csv_path, e))?;

        writeln!(
            f,
            "{},{:.6},{:.6},{},{}",
            m.epoch,
            m.train_loss,
            m.train_accuracy,
            optional(m.val_loss),
            optional(m.val_accuracy),
        )
        .map_err(|e| ClassifierError::persist(&self.csv_path, e))?;

        tracing::debug!(
            "Logged epoch {} metrics: train_loss={:.4}, val_loss={:?}",
            m.epoch,
            m.train_loss,
            m.val_loss,
        );

        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(epoch: usize, val_loss: Option<f64>) -> EpochMetrics {
        EpochMetrics {
            epoch,
            train_loss: 0.5,
            train_accuracy: 0.75,
            val_loss,
            val_accuracy: val_loss.map(|_| 0.5),
        }
    }

    #[test]
    fn test_is_improvement() {
        let m = metrics(2, Some(2.3));
        assert!(m.is_improvement(3.0));
        assert!(!m.is_improvement(2.0));
        assert!(!metrics(1, None).is_improvement(f64::INFINITY));
    }

    #[test]
    fn test_rows_are_appended_after_header() {
        let dir    = tempfile::tempdir().unwrap();
        let logger = MetricsLogger::create(dir.path()).unwrap();
        logger.log(&metrics(1, Some(0.25))).unwrap();
        logger.log(&metrics(2, None)).unwrap();

        let text  = fs::read_to_string(logger.csv_path()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "epoch,train_loss,train_acc,val_loss,val_acc");
        assert_eq!(lines[1], "1,0.500000,0.750000,0.250000,0.500000");
        assert_eq!(lines[2], "2,0.500000,0.750000,,");
    }

    #[test]
    fn test_create_truncates_previous_run() {
        let dir = tempfile::tempdir().unwrap();
        MetricsLogger::create(dir.path()).unwrap().log(&metrics(1, None)).unwrap();
        let logger = MetricsLogger::create(dir.path()).unwrap();
        assert_eq!(fs::read_to_string(logger.csv_path()).unwrap().lines().count(), 1);
    }
}
