use crate::error::ScoreError;
use crate::isolation_forest::IsolationForest;
use crate::normalizer::Normalizer;
use relay_core::now_epoch_secs;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelState {
    pub trained: bool,
    pub model_version: String,
    pub updated_at: u64,
    normalizer: Option<Normalizer>,
    forest: Option<IsolationForest>,
}

impl ModelState {
    pub fn untrained() -> Self {
        Self {
            trained: false,
            model_version: "untrained".to_string(),
            updated_at: 0,
            normalizer: None,
            forest: None,
        }
    }

    pub fn fit(samples: &[Vec<f64>], arity: usize, tree_count: usize, contamination: f64, version: u64) -> Self {
        let normalizer = Normalizer::fit(samples, arity);
        let normalized: Vec<Vec<f64>> = samples.iter().map(|s| normalizer.transform(s)).collect();
        let forest = IsolationForest::fit(&normalized, arity, tree_count, contamination);
        Self {
            trained: true,
            model_version: format!("v{version}"),
            updated_at: now_epoch_secs(),
            normalizer: Some(normalizer),
            forest: Some(forest),
        }
    }

    /// `d` per the scorer's decision contract: positive for normal
    /// points, negative for anomalous ones. Returns `None` if untrained.
    pub fn decision(&self, vector: &[f64]) -> Option<f64> {
        let normalizer = self.normalizer.as_ref()?;
        let forest = self.forest.as_ref()?;
        let transformed = normalizer.transform(vector);
        Some(forest.decision(&transformed))
    }

    /// Writes the snapshot to a sibling temp file and renames it over
    /// `path`, so a concurrent `load` or a crash mid-write never observes
    /// a truncated file.
    pub fn save(&self, path: &Path) -> Result<(), ScoreError> {
        let json = serde_json::to_vec(self)?;
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(parent).map_err(ScoreError::Persist)?;

        let mut tmp = tempfile::NamedTempFile::new_in(parent).map_err(ScoreError::Persist)?;
        tmp.write_all(&json).map_err(ScoreError::Persist)?;
        tmp.flush().map_err(ScoreError::Persist)?;
        tmp.persist(path).map_err(|e| ScoreError::Persist(e.error))?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, ScoreError> {
        let bytes = std::fs::read(path).map_err(ScoreError::Load)?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}
