// src/scoring.rs

use tracing::debug;

use crate::config::ScoringConfig;
use crate::error::Result;
use crate::models::PriorityScore;

/// Validated weights. Only constructible through [`ScoreWeights::from_config`],
/// so the divisor is always positive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreWeights {
    depth: f64,
    aa: f64,
    domain: f64,
}

impl ScoreWeights {
    pub fn from_config(config: &ScoringConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            depth: config.depth_weight,
            aa: config.aa_weight,
            domain: config.domain_weight,
        })
    }

    pub fn total(&self) -> f64 {
        self.depth + self.aa + self.domain
    }
}

/// Weighted mean of the three evidence signals, clamped to [0, 1].
pub fn calculate_priority_score(
    normalized_depth: f64,
    impact_score: f64,
    domain_match: u8,
    weights: &ScoreWeights,
) -> PriorityScore {
    let depth_component = weights.depth * normalized_depth;
    let impact_component = weights.aa * impact_score;
    let domain_component = weights.domain * f64::from(domain_match);

    let final_score =
        ((depth_component + impact_component + domain_component) / weights.total()).clamp(0.0, 1.0);

    PriorityScore {
        depth_component,
        impact_component,
        domain_component,
        final_score,
        final_score_percent: final_score * 100.0,
    }
}

/// Log the spread of a scored batch.
pub fn log_score_summary(scores: &[PriorityScore]) {
    if scores.is_empty() {
        return;
    }
    let (min, max, sum) = scores.iter().fold(
        (f64::INFINITY, f64::NEG_INFINITY, 0.0),
        |(min, max, sum), s| (min.min(s.final_score), max.max(s.final_score), sum + s.final_score),
    );
    debug!(
        "Priority scores: min={:.4}, max={:.4}, mean={:.4}",
        min,
        max,
        sum / scores.len() as f64
    );
}
