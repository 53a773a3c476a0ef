use serde::{Deserialize, Serialize};

/// Per-feature mean/variance normalizer, fitted once per training round
/// over an immutable snapshot of the buffer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Normalizer {
    means: Vec<f64>,
    std_devs: Vec<f64>,
}

impl Normalizer {
    pub fn fit(samples: &[Vec<f64>], arity: usize) -> Self {
        let n = samples.len().max(1) as f64;
        let mut means = vec![0.0; arity];
        for sample in samples {
            for (i, v) in sample.iter().enumerate().take(arity) {
                means[i] += v;
            }
        }
        for m in &mut means {
            *m /= n;
        }

        let mut variances = vec![0.0; arity];
        for sample in samples {
            for (i, v) in sample.iter().enumerate().take(arity) {
                variances[i] += (v - means[i]).powi(2);
            }
        }
        let std_devs = variances
            .into_iter()
            .map(|v| (v / n).sqrt().max(1e-9))
            .collect();

        Self { means, std_devs }
    }

    pub fn transform(&self, vector: &[f64]) -> Vec<f64> {
        vector
            .iter()
            .enumerate()
            .map(|(i, v)| {
                let mean = self.means.get(i).copied().unwrap_or(0.0);
                let std_dev = self.std_devs.get(i).copied().unwrap_or(1.0);
                (v - mean) / std_dev
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transform_centers_and_scales() {
        let samples = vec![vec![0.0], vec![10.0]];
        let normalizer = Normalizer::fit(&samples, 1);
        let transformed = normalizer.transform(&[5.0]);
        assert!((transformed[0]).abs() < 1e-9);
    }
}
