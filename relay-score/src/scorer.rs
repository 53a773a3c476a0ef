use crate::buffer::RollingBuffer;
use crate::config::ScorerConfig;
use crate::error::ScoreError;
use crate::heuristic::heuristic_fallback;
use crate::model::ModelState;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct ScorerHealth {
    pub trained: bool,
    pub buffer_size: usize,
    pub min_samples: usize,
    pub contamination: f64,
    pub model_version: String,
    pub last_retrain_ts: u64,
}

struct Inner {
    buffer: RollingBuffer,
    model: Arc<ModelState>,
    version_counter: u64,
}

/// Single-model anomaly scorer: a rolling buffer of recent observations
/// plus a periodically retrained isolation-forest-family detector, with
/// a deterministic heuristic fallback while untrained.
pub struct AnomalyScorer {
    config: ScorerConfig,
    inner: Mutex<Inner>,
}

impl AnomalyScorer {
    pub fn new(config: ScorerConfig) -> Arc<Self> {
        let model = config
            .model_path
            .as_deref()
            .and_then(|path| ModelState::load(path).ok())
            .map(Arc::new)
            .unwrap_or_else(|| Arc::new(ModelState::untrained()));

        Arc::new(Self {
            inner: Mutex::new(Inner {
                buffer: RollingBuffer::new(config.buffer_capacity, config.use_reservoir),
                model,
                version_counter: 0,
            }),
            config,
        })
    }

    fn validate(&self, vector: &[f64]) -> Result<(), ScoreError> {
        if vector.len() != self.config.arity {
            return Err(ScoreError::ArityMismatch {
                expected: self.config.arity,
                got: vector.len(),
            });
        }
        if vector.iter().any(|v| !v.is_finite()) {
            return Err(ScoreError::NonFinite);
        }
        Ok(())
    }

    pub fn add_observation(&self, vector: &[f64]) -> Result<(), ScoreError> {
        self.validate(vector)?;
        // A panic while holding this lock would indicate a bug in this
        // module, not a recoverable runtime condition.
        #[allow(clippy::unwrap_used)]
        let mut guard = self.inner.lock().unwrap();
        guard.buffer.push(vector.to_vec());
        Ok(())
    }

    /// Pure with respect to buffer and model state: never mutates either.
    pub fn score(&self, vector: &[f64]) -> Result<i64, ScoreError> {
        self.validate(vector)?;
        let model = {
            #[allow(clippy::unwrap_used)]
            let guard = self.inner.lock().unwrap();
            Arc::clone(&guard.model)
        };

        let risk = match model.decision(vector) {
            Some(d) => (50.0 + 50.0 * d).round() as i64,
            None => heuristic_fallback(vector),
        };
        Ok(risk.clamp(0, 100))
    }

    /// Copies the buffer under the lock, fits outside it, then swaps the
    /// new model in under a short re-acquisition — the retrain never
    /// holds the lock for the expensive fitting step.
    pub fn force_retrain(&self) -> bool {
        let snapshot = {
            #[allow(clippy::unwrap_used)]
            let guard = self.inner.lock().unwrap();
            if guard.buffer.len() < self.config.min_train_samples {
                return false;
            }
            guard.buffer.snapshot()
        };

        let next_version = {
            #[allow(clippy::unwrap_used)]
            let guard = self.inner.lock().unwrap();
            guard.version_counter + 1
        };
        let fitted = ModelState::fit(
            &snapshot,
            self.config.arity,
            self.config.tree_count,
            self.config.contamination,
            next_version,
        );

        if let Some(path) = &self.config.model_path {
            if let Err(err) = fitted.save(path) {
                tracing::warn!(error = %err, "failed to persist scorer model snapshot");
            }
        }

        #[allow(clippy::unwrap_used)]
        let mut guard = self.inner.lock().unwrap();
        guard.model = Arc::new(fitted);
        guard.version_counter = next_version;
        true
    }

    pub fn health(&self) -> ScorerHealth {
        #[allow(clippy::unwrap_used)]
        let guard = self.inner.lock().unwrap();
        ScorerHealth {
            trained: guard.model.trained,
            buffer_size: guard.buffer.len(),
            min_samples: self.config.min_train_samples,
            contamination: self.config.contamination,
            model_version: guard.model.model_version.clone(),
            last_retrain_ts: guard.model.updated_at,
        }
    }

    pub fn spawn_retrainer(
        self: &Arc<Self>,
        shutdown: CancellationToken,
    ) -> tokio::task::JoinHandle<()> {
        let scorer = Arc::clone(self);
        let interval = std::time::Duration::from_secs(scorer.config.retrain_interval_secs.max(1));
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {
                        if !scorer.force_retrain() {
                            tracing::debug!("scorer retrain skipped: insufficient samples");
                        }
                    }
                    _ = shutdown.cancelled() => {
                        tracing::info!("scorer retrain task shut down cleanly");
                        break;
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn untrained_scorer_uses_heuristic() {
        let scorer = AnomalyScorer::new(ScorerConfig::default());
        let risk = scorer.score(&[2048.0, 0.5, 3.0, 1.0]).expect("score");
        assert_eq!(risk, 0);
    }

    #[test]
    fn rejects_wrong_arity() {
        let scorer = AnomalyScorer::new(ScorerConfig::default());
        assert!(scorer.score(&[1.0, 2.0]).is_err());
    }

    #[test]
    fn rejects_non_finite() {
        let scorer = AnomalyScorer::new(ScorerConfig::default());
        assert!(scorer.add_observation(&[f64::NAN, 0.0, 1.0, 0.0]).is_err());
    }

    #[test]
    fn retrain_requires_minimum_samples() {
        let mut config = ScorerConfig::default();
        config.min_train_samples = 10;
        let scorer = AnomalyScorer::new(config);
        for _ in 0..5 {
            scorer.add_observation(&[800.0, 30.0, 1.0, 0.0]).expect("add");
        }
        assert!(!scorer.force_retrain());
    }

    #[test]
    fn retrain_then_score_differentiates_normal_from_outlier() {
        let mut config = ScorerConfig::default();
        config.min_train_samples = 50;
        config.tree_count = 50;
        let scorer = AnomalyScorer::new(config);
        for i in 0..300 {
            let jitter = (i % 7) as f64;
            scorer
                .add_observation(&[800.0 + jitter, 30.0 + jitter * 0.1, 1.0, 0.0])
                .expect("add");
        }
        assert!(scorer.force_retrain());

        let normal = scorer.score(&[800.0, 30.0, 1.0, 0.0]).expect("score");
        let outlier = scorer.score(&[20_000.0, 0.1, 15.0, 1.0]).expect("score");
        assert!(normal > outlier);
    }
}
