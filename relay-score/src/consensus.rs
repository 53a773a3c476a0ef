//! Multi-model consensus ensemble: a drop-in replacement for
//! [`crate::scorer::AnomalyScorer`] exposing the same
//! `add_observation`/`score`/`health` contract, backed by several
//! detectors over distinct feature views rather than one model.

use crate::buffer::RollingBuffer;
use crate::config::ScorerConfig;
use crate::error::ScoreError;
use crate::heuristic::heuristic_fallback;
use crate::isolation_forest::IsolationForest;
use crate::normalizer::Normalizer;
use crate::scorer::ScorerHealth;
use relay_core::now_epoch_secs;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

/// One feature view plus the detector fitted over it. Each view is blind
/// to how the others see the same observation.
trait ConsensusView: Send + Sync {
    fn transform(&self, vector: &[f64]) -> Vec<f64>;
    /// Normality probability in `[0,1]`, 1 = typical, 0 = anomalous.
    fn normality(&self, vector: &[f64]) -> f64;
}

struct RobustScaledView {
    median: Vec<f64>,
    mad: Vec<f64>,
    forest: IsolationForest,
}

impl RobustScaledView {
    fn fit(samples: &[Vec<f64>], arity: usize, tree_count: usize, contamination: f64) -> Self {
        let (median, mad) = robust_stats(samples, arity);
        let transform = |v: &[f64]| -> Vec<f64> {
            v.iter()
                .enumerate()
                .map(|(i, x)| (x - median[i]) / mad[i].max(1e-9))
                .collect()
        };
        let transformed: Vec<Vec<f64>> = samples.iter().map(|s| transform(s)).collect();
        let forest = IsolationForest::fit(&transformed, arity, tree_count, contamination);
        Self { median, mad, forest }
    }
}

impl ConsensusView for RobustScaledView {
    fn transform(&self, vector: &[f64]) -> Vec<f64> {
        vector
            .iter()
            .enumerate()
            .map(|(i, x)| (x - self.median[i]) / self.mad[i].max(1e-9))
            .collect()
    }

    fn normality(&self, vector: &[f64]) -> f64 {
        1.0 - self.forest.anomaly_score(&self.transform(vector))
    }
}

struct ZScoreIsolationView {
    normalizer: Normalizer,
    forest: IsolationForest,
}

impl ZScoreIsolationView {
    fn fit(samples: &[Vec<f64>], arity: usize, tree_count: usize, contamination: f64) -> Self {
        let normalizer = Normalizer::fit(samples, arity);
        let transformed: Vec<Vec<f64>> = samples.iter().map(|s| normalizer.transform(s)).collect();
        let forest = IsolationForest::fit(&transformed, arity, tree_count, contamination);
        Self { normalizer, forest }
    }
}

impl ConsensusView for ZScoreIsolationView {
    fn transform(&self, vector: &[f64]) -> Vec<f64> {
        self.normalizer.transform(vector)
    }

    fn normality(&self, vector: &[f64]) -> f64 {
        1.0 - self.forest.anomaly_score(&self.transform(vector))
    }
}

/// A 2-centroid clusterer standing in for the "supervised classifier
/// with synthetic labels from clustering" view: points closer to their
/// nearest centroid relative to the average intra-cluster spread are
/// scored as more typical.
struct CentroidView {
    centroids: [Vec<f64>; 2],
    average_spread: f64,
}

impl CentroidView {
    fn fit(samples: &[Vec<f64>], arity: usize) -> Self {
        let centroids = kmeans_2(samples, arity);
        let average_spread = samples
            .iter()
            .map(|s| nearest_centroid_distance(s, &centroids))
            .sum::<f64>()
            .max(1e-9)
            / samples.len().max(1) as f64;
        Self {
            centroids,
            average_spread,
        }
    }
}

impl ConsensusView for CentroidView {
    fn transform(&self, vector: &[f64]) -> Vec<f64> {
        vector.to_vec()
    }

    fn normality(&self, vector: &[f64]) -> f64 {
        let d = nearest_centroid_distance(vector, &self.centroids) / self.average_spread;
        (1.0 / (1.0 + d)).clamp(0.0, 1.0)
    }
}

struct EnsembleModel {
    views: Vec<Box<dyn ConsensusView>>,
    view_weights: Vec<f64>,
    feature_weights: Vec<f64>,
    trained: bool,
    model_version: String,
    updated_at: u64,
}

impl EnsembleModel {
    fn untrained() -> Self {
        Self {
            views: Vec::new(),
            view_weights: Vec::new(),
            feature_weights: Vec::new(),
            trained: false,
            model_version: "untrained".to_string(),
            updated_at: 0,
        }
    }

    fn fit(samples: &[Vec<f64>], arity: usize, tree_count: usize, contamination: f64, version: u64) -> Self {
        let feature_weights = fair_feature_weights(samples, arity);
        let weighted: Vec<Vec<f64>> = samples
            .iter()
            .map(|s| apply_feature_weights(s, &feature_weights))
            .collect();

        let views: Vec<Box<dyn ConsensusView>> = vec![
            Box::new(RobustScaledView::fit(&weighted, arity, tree_count, contamination)),
            Box::new(ZScoreIsolationView::fit(&weighted, arity, tree_count, contamination)),
            Box::new(CentroidView::fit(&weighted, arity)),
        ];

        // Consistency weight: views whose normality over the training
        // sample varies least are trusted more.
        let mut view_weights = Vec::with_capacity(views.len());
        for view in &views {
            let scores: Vec<f64> = weighted.iter().map(|s| view.normality(s)).collect();
            let std_dev = sample_std_dev(&scores);
            view_weights.push(1.0 / (std_dev + 0.05));
        }
        let total: f64 = view_weights.iter().sum();
        if total > 0.0 {
            for w in &mut view_weights {
                *w /= total;
            }
        }

        Self {
            views,
            view_weights,
            feature_weights,
            trained: true,
            model_version: format!("v{version}"),
            updated_at: now_epoch_secs(),
        }
    }

    fn consensus(&self, vector: &[f64]) -> Option<(f64, f64)> {
        if !self.trained {
            return None;
        }
        let weighted = apply_feature_weights(vector, &self.feature_weights);
        let normalities: Vec<f64> = self.views.iter().map(|v| v.normality(&weighted)).collect();
        let consensus_score: f64 = normalities
            .iter()
            .zip(&self.view_weights)
            .map(|(n, w)| n * w)
            .sum();
        let std_dev = sample_std_dev(&normalities);
        Some((consensus_score, std_dev))
    }
}

struct Inner {
    buffer: RollingBuffer,
    model: Arc<EnsembleModel>,
    version_counter: u64,
}

#[derive(Debug, Clone)]
pub struct ConsensusReport {
    pub risk: i64,
    pub consensus_reached: bool,
    pub confidence: f64,
}

/// The consensus ensemble. See module docs for the view composition.
pub struct ConsensusEnsemble {
    config: ScorerConfig,
    inner: Mutex<Inner>,
}

impl ConsensusEnsemble {
    pub fn new(config: ScorerConfig) -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(Inner {
                buffer: RollingBuffer::new(config.buffer_capacity, config.use_reservoir),
                model: Arc::new(EnsembleModel::untrained()),
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
        #[allow(clippy::unwrap_used)]
        let mut guard = self.inner.lock().unwrap();
        guard.buffer.push(vector.to_vec());
        Ok(())
    }

    /// Full report including consensus/confidence, beyond the bare risk
    /// scalar `score()` returns.
    pub fn score_report(&self, vector: &[f64]) -> Result<ConsensusReport, ScoreError> {
        self.validate(vector)?;
        let model = {
            #[allow(clippy::unwrap_used)]
            let guard = self.inner.lock().unwrap();
            Arc::clone(&guard.model)
        };

        match model.consensus(vector) {
            Some((consensus_score, std_dev)) => Ok(ConsensusReport {
                risk: ((1.0 - consensus_score) * 100.0).round().clamp(0.0, 100.0) as i64,
                consensus_reached: std_dev < 0.3,
                confidence: (1.0 - std_dev).clamp(0.0, 1.0),
            }),
            None => Ok(ConsensusReport {
                risk: heuristic_fallback(vector),
                consensus_reached: false,
                confidence: 0.0,
            }),
        }
    }

    pub fn score(&self, vector: &[f64]) -> Result<i64, ScoreError> {
        Ok(self.score_report(vector)?.risk)
    }

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
        let fitted = EnsembleModel::fit(
            &snapshot,
            self.config.arity,
            self.config.tree_count,
            self.config.contamination,
            next_version,
        );

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
        let ensemble = Arc::clone(self);
        let interval = std::time::Duration::from_secs(ensemble.config.retrain_interval_secs.max(1));
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {
                        if !ensemble.force_retrain() {
                            tracing::debug!("ensemble retrain skipped: insufficient samples");
                        }
                    }
                    _ = shutdown.cancelled() => {
                        tracing::info!("ensemble retrain task shut down cleanly");
                        break;
                    }
                }
            }
        })
    }
}

impl crate::trait_scorer::Scorer for ConsensusEnsemble {
    fn add_observation(&self, vector: &[f64]) -> Result<(), ScoreError> {
        ConsensusEnsemble::add_observation(self, vector)
    }

    fn score(&self, vector: &[f64]) -> Result<i64, ScoreError> {
        ConsensusEnsemble::score(self, vector)
    }

    fn force_retrain(&self) -> bool {
        ConsensusEnsemble::force_retrain(self)
    }

    fn health(&self) -> ScorerHealth {
        ConsensusEnsemble::health(self)
    }
}

fn robust_stats(samples: &[Vec<f64>], arity: usize) -> (Vec<f64>, Vec<f64>) {
    let mut median = vec![0.0; arity];
    let mut mad = vec![1.0; arity];
    for feature in 0..arity {
        let mut values: Vec<f64> = samples.iter().map(|s| s.get(feature).copied().unwrap_or(0.0)).collect();
        values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let m = percentile_sorted(&values, 0.5);
        let deviations: Vec<f64> = values.iter().map(|v| (v - m).abs()).collect();
        let mut sorted_dev = deviations;
        sorted_dev.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        median[feature] = m;
        mad[feature] = percentile_sorted(&sorted_dev, 0.5).max(1e-9);
    }
    (median, mad)
}

fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let idx = ((sorted.len() - 1) as f64 * p).round() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

/// Per-feature weight = normalized(variance · mean-independence), where
/// mean-independence of feature i is `1 - mean(|corr(i, j)|)` for j != i.
fn fair_feature_weights(samples: &[Vec<f64>], arity: usize) -> Vec<f64> {
    if samples.is_empty() || arity == 0 {
        return vec![1.0; arity];
    }
    let n = samples.len() as f64;
    let means: Vec<f64> = (0..arity)
        .map(|i| samples.iter().map(|s| s.get(i).copied().unwrap_or(0.0)).sum::<f64>() / n)
        .collect();
    let variances: Vec<f64> = (0..arity)
        .map(|i| {
            samples
                .iter()
                .map(|s| (s.get(i).copied().unwrap_or(0.0) - means[i]).powi(2))
                .sum::<f64>()
                / n
        })
        .collect();

    let mut correlations = vec![vec![0.0; arity]; arity];
    for i in 0..arity {
        for j in 0..arity {
            if i == j {
                continue;
            }
            let cov: f64 = samples
                .iter()
                .map(|s| {
                    (s.get(i).copied().unwrap_or(0.0) - means[i]) * (s.get(j).copied().unwrap_or(0.0) - means[j])
                })
                .sum::<f64>()
                / n;
            let denom = (variances[i] * variances[j]).sqrt().max(1e-9);
            correlations[i][j] = (cov / denom).clamp(-1.0, 1.0);
        }
    }

    let mut weights = Vec::with_capacity(arity);
    for i in 0..arity {
        let mean_independence = if arity > 1 {
            1.0 - correlations[i].iter().map(|c| c.abs()).sum::<f64>() / (arity - 1) as f64
        } else {
            1.0
        };
        weights.push((variances[i] * mean_independence).max(1e-9));
    }
    let total: f64 = weights.iter().sum();
    if total > 0.0 {
        for w in &mut weights {
            *w /= total;
        }
    }
    weights
}

fn apply_feature_weights(vector: &[f64], weights: &[f64]) -> Vec<f64> {
    vector
        .iter()
        .enumerate()
        .map(|(i, v)| v * weights.get(i).copied().unwrap_or(1.0))
        .collect()
}

fn sample_std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt()
}

fn kmeans_2(samples: &[Vec<f64>], arity: usize) -> [Vec<f64>; 2] {
    if samples.is_empty() {
        return [vec![0.0; arity], vec![0.0; arity]];
    }
    let mut centroids = [samples[0].clone(), samples[samples.len() / 2].clone()];
    for _ in 0..10 {
        let mut sums = [vec![0.0; arity], vec![0.0; arity]];
        let mut counts = [0usize; 2];
        for s in samples {
            let d0 = euclidean(s, &centroids[0]);
            let d1 = euclidean(s, &centroids[1]);
            let cluster = if d0 <= d1 { 0 } else { 1 };
            for (k, v) in s.iter().enumerate() {
                sums[cluster][k] += v;
            }
            counts[cluster] += 1;
        }
        for c in 0..2 {
            if counts[c] > 0 {
                for k in 0..arity {
                    centroids[c][k] = sums[c][k] / counts[c] as f64;
                }
            }
        }
    }
    centroids
}

fn nearest_centroid_distance(vector: &[f64], centroids: &[Vec<f64>; 2]) -> f64 {
    euclidean(vector, &centroids[0]).min(euclidean(vector, &centroids[1]))
}

fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}
