//! Fitness scoring: simulated output against reference measurements.
//!
//! Channels are compared position by position. When the two datasets have
//! different row counts, each channel is truncated to the shorter length
//! before comparison so corresponding positions stay aligned.

use crate::schema::{Dataset, FitnessConfig, FitnessMetric};

/// Score given to failed or numerically degenerate evaluations.
pub const NEUTRAL_FITNESS: f64 = 0.0;

/// Contract violations while comparing datasets.
#[derive(Debug, thiserror::Error)]
pub enum FitnessError {
    #[error("{dataset} dataset is missing channel `{channel}`")]
    MissingChannel {
        dataset: &'static str,
        channel: String,
    },
}

/// Reduces a simulated dataset to a single fitness score.
#[derive(Debug, Clone)]
pub struct FitnessEvaluator {
    channels: Vec<String>,
    metric: FitnessMetric,
}

impl FitnessEvaluator {
    /// Create a new fitness evaluator.
    pub fn new(config: FitnessConfig) -> Self {
        Self {
            channels: config.channels,
            metric: config.metric,
        }
    }

    /// Channels compared, in order.
    pub fn channels(&self) -> &[String] {
        &self.channels
    }

    /// Check that the reference exposes every channel.
    pub fn check_reference(&self, reference: &Dataset) -> Result<(), FitnessError> {
        self.columns(reference, "reference").map(|_| ())
    }

    /// Score `candidate` against `reference`. Higher is better.
    pub fn score(&self, reference: &Dataset, candidate: &Dataset) -> Result<f64, FitnessError> {
        let reference = self.columns(reference, "reference")?;
        let candidate = self.columns(candidate, "candidate")?;

        let pairs: Vec<(&[f64], &[f64])> = reference
            .into_iter()
            .zip(candidate)
            .map(|(r, c)| {
                let n = r.len().min(c.len());
                if r.len() != c.len() {
                    log::debug!(
                        "Row count mismatch ({} vs {}), comparing first {} rows",
                        r.len(),
                        c.len(),
                        n
                    );
                }
                (&r[..n], &c[..n])
            })
            .collect();

        let score = match self.metric {
            FitnessMetric::Pearson => {
                let (x, y) = concatenate(&pairs);
                pearson(&x, &y)
            }
            FitnessMetric::Spearman => {
                let (x, y) = concatenate(&pairs);
                spearman(&x, &y)
            }
            FitnessMetric::ChannelMean => {
                // Undefined channels are left out of the mean entirely.
                let defined: Vec<f64> = pairs.iter().filter_map(|(r, c)| pearson(r, c)).collect();
                if defined.is_empty() {
                    None
                } else {
                    Some(defined.iter().sum::<f64>() / defined.len() as f64)
                }
            }
        };

        Ok(score.unwrap_or(NEUTRAL_FITNESS))
    }

    fn columns<'a>(
        &self,
        dataset: &'a Dataset,
        label: &'static str,
    ) -> Result<Vec<&'a [f64]>, FitnessError> {
        self.channels
            .iter()
            .map(|name| {
                dataset
                    .column(name)
                    .ok_or_else(|| FitnessError::MissingChannel {
                        dataset: label,
                        channel: name.clone(),
                    })
            })
            .collect()
    }
}

fn concatenate(pairs: &[(&[f64], &[f64])]) -> (Vec<f64>, Vec<f64>) {
    let len: usize = pairs.iter().map(|(r, _)| r.len()).sum();
    let mut x = Vec::with_capacity(len);
    let mut y = Vec::with_capacity(len);
    for (r, c) in pairs {
        x.extend_from_slice(r);
        y.extend_from_slice(c);
    }
    (x, y)
}

/// Pearson correlation coefficient.
///
/// Returns `None` for fewer than two points, zero variance or a non-finite
/// result. Only the common prefix of `x` and `y` is used.
pub fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    let n = x.len().min(y.len());
    if n < 2 {
        return None;
    }
    let (x, y) = (&x[..n], &y[..n]);

    let mean_x = x.iter().sum::<f64>() / n as f64;
    let mean_y = y.iter().sum::<f64>() / n as f64;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (&a, &b) in x.iter().zip(y) {
        let dx = a - mean_x;
        let dy = b - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if !(var_x > 0.0 && var_y > 0.0) {
        return None;
    }

    let r = cov / (var_x.sqrt() * var_y.sqrt());
    r.is_finite().then(|| r.clamp(-1.0, 1.0))
}

/// Spearman rank correlation (Pearson on average ranks).
pub fn spearman(x: &[f64], y: &[f64]) -> Option<f64> {
    let n = x.len().min(y.len());
    if n < 2 {
        return None;
    }
    pearson(&ranks(&x[..n]), &ranks(&y[..n]))
}

/// Ranks starting at 1, ties sharing their average rank.
fn ranks(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; values.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && values[order[end]] == values[order[start]] {
            end += 1;
        }
        // Positions start..end share ranks start+1..=end.
        let average = (start + 1 + end) as f64 / 2.0;
        for &idx in &order[start..end] {
            ranks[idx] = average;
        }
        start = end;
    }
    ranks
}
