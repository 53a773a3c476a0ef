use crate::error::ScoreError;
use crate::scorer::ScorerHealth;

/// The contract both the single-model scorer and the consensus ensemble
/// expose, so a caller can swap one for the other without touching the
/// policy engine or the pipeline.
pub trait Scorer: Send + Sync {
    fn add_observation(&self, vector: &[f64]) -> Result<(), ScoreError>;
    fn score(&self, vector: &[f64]) -> Result<i64, ScoreError>;
    fn force_retrain(&self) -> bool;
    fn health(&self) -> ScorerHealth;
}

impl Scorer for crate::scorer::AnomalyScorer {
    fn add_observation(&self, vector: &[f64]) -> Result<(), ScoreError> {
        crate::scorer::AnomalyScorer::add_observation(self, vector)
    }

    fn score(&self, vector: &[f64]) -> Result<i64, ScoreError> {
        crate::scorer::AnomalyScorer::score(self, vector)
    }

    fn force_retrain(&self) -> bool {
        crate::scorer::AnomalyScorer::force_retrain(self)
    }

    fn health(&self) -> ScorerHealth {
        crate::scorer::AnomalyScorer::health(self)
    }
}
