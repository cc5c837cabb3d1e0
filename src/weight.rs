use serde::{Deserialize, Serialize};

/// User-tunable coefficients for the evidence weight formula. Serialized
/// verbatim into the weight endpoint request body.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeightCoefficients {
    pub frequency: f64,
    #[serde(rename = "hasSignificance")]
    pub has_significance: f64,
    #[serde(rename = "avgSignificance")]
    pub avg_significance: f64,
    #[serde(rename = "avgImpactFactor")]
    pub avg_impact_factor: f64,
    #[serde(rename = "maxImpactFactor")]
    pub max_impact_factor: f64,
    #[serde(rename = "pValue")]
    pub p_value: f64,
}

impl Default for WeightCoefficients {
    fn default() -> Self {
        Self {
            frequency: 1.0,
            has_significance: 1.0,
            avg_significance: 1.0,
            avg_impact_factor: 1.0,
            max_impact_factor: 1.0,
            p_value: 1.0,
        }
    }
}

/// Per-relationship evidence statistics as reported by the backend.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct EvidenceStats {
    #[serde(default)]
    pub freq: f64,
    // Arrives as 0/1 on the wire.
    #[serde(default)]
    pub has_significance: Option<f64>,
    #[serde(default)]
    pub percentage_significance: Option<f64>,
    #[serde(default)]
    pub avg_impact: f64,
    #[serde(default)]
    pub max_impact: f64,
    #[serde(default)]
    pub avg_pvalue: f64,
}

/// Linear combination of the evidence statistics. Frequencies and impact
/// factors below zero are clamped to zero before entering the log terms;
/// a zero frequency is valid and contributes nothing.
pub fn compute_weight(stats: &EvidenceStats, coefficients: &WeightCoefficients) -> f64 {
    let freq = stats.freq.max(0.0);
    let max_impact = stats.max_impact.max(0.0);
    let significance = match stats.has_significance {
        Some(flag) if flag != 0.0 => 1.0,
        _ => 0.0,
    };
    let percentage_term = stats
        .percentage_significance
        .map(|p| (2.0 * p).powi(2))
        .unwrap_or(0.0);

    coefficients.frequency * (freq + 1.0).ln()
        + coefficients.has_significance * significance
        + coefficients.avg_significance * percentage_term
        + coefficients.avg_impact_factor * stats.avg_impact
        + coefficients.max_impact_factor * (max_impact + 1.0).ln()
        + coefficients.p_value * (1.0 - stats.avg_pvalue)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScaleMode {
    Linear,
    Log,
}

/// Non-positive values are clamped to this before a log-scale fit; the
/// backend weights are positive in practice but a defensive floor keeps
/// the log domain valid.
const LOG_DOMAIN_EPSILON: f64 = 1e-6;

/// Monotonic mapping from a value domain onto a visual radius range,
/// fitted to the min/max of the supplied values. Refit whenever the node
/// set or the coefficients change.
#[derive(Clone, Copy, Debug)]
pub struct RadiusScale {
    mode: ScaleMode,
    domain_min: f64,
    domain_max: f64,
    range_min: f32,
    range_max: f32,
}

impl RadiusScale {
    pub fn fit(values: &[f64], mode: ScaleMode, range_min: f32, range_max: f32) -> Self {
        let mut domain_min = f64::INFINITY;
        let mut domain_max = f64::NEG_INFINITY;
        for &value in values {
            let value = Self::domain_value(mode, value);
            domain_min = domain_min.min(value);
            domain_max = domain_max.max(value);
        }
        if !domain_min.is_finite() || !domain_max.is_finite() {
            domain_min = 0.0;
            domain_max = 0.0;
        }

        Self {
            mode,
            domain_min,
            domain_max,
            range_min,
            range_max,
        }
    }

    pub fn radius(&self, value: f64) -> f32 {
        let span = self.domain_max - self.domain_min;
        if span.abs() <= f64::EPSILON {
            return (self.range_min + self.range_max) * 0.5;
        }

        let value = Self::domain_value(self.mode, value);
        let t = ((value - self.domain_min) / span).clamp(0.0, 1.0) as f32;
        self.range_min + t * (self.range_max - self.range_min)
    }

    fn domain_value(mode: ScaleMode, value: f64) -> f64 {
        match mode {
            ScaleMode::Linear => value,
            ScaleMode::Log => value.max(LOG_DOMAIN_EPSILON).ln(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_evidence_has_zero_weight() {
        let stats = EvidenceStats {
            freq: 0.0,
            has_significance: None,
            percentage_significance: None,
            avg_impact: 0.0,
            max_impact: 0.0,
            avg_pvalue: 1.0,
        };
        let weight = compute_weight(&stats, &WeightCoefficients::default());
        assert!(weight.abs() < 1e-12, "weight {weight}");
    }

    #[test]
    fn negative_frequency_is_clamped() {
        let stats = EvidenceStats {
            freq: -5.0,
            avg_pvalue: 1.0,
            ..EvidenceStats::default()
        };
        let weight = compute_weight(&stats, &WeightCoefficients::default());
        assert!(weight.is_finite());
        assert!(weight.abs() < 1e-12);
    }

    #[test]
    fn significance_terms_contribute() {
        let stats = EvidenceStats {
            freq: 0.0,
            has_significance: Some(1.0),
            percentage_significance: Some(0.5),
            avg_impact: 0.0,
            max_impact: 0.0,
            avg_pvalue: 1.0,
        };
        let weight = compute_weight(&stats, &WeightCoefficients::default());
        // has_significance contributes 1, (2 * 0.5)^2 contributes 1.
        assert!((weight - 2.0).abs() < 1e-12, "weight {weight}");
    }

    #[test]
    fn linear_scale_interpolates_endpoints() {
        let scale = RadiusScale::fit(&[1.0, 5.0, 10.0], ScaleMode::Linear, 2.0, 20.0);
        assert!((scale.radius(1.0) - 2.0).abs() < 1e-4);
        assert!((scale.radius(10.0) - 20.0).abs() < 1e-4);
        let mid = scale.radius(5.0);
        let expected = 2.0 + (5.0 - 1.0) / (10.0 - 1.0) * 18.0;
        assert!((mid - expected as f32).abs() < 1e-4, "mid {mid}");
    }

    #[test]
    fn log_scale_tolerates_zero_values() {
        let scale = RadiusScale::fit(&[0.0, 10.0], ScaleMode::Log, 1.0, 30.0);
        let low = scale.radius(0.0);
        let high = scale.radius(10.0);
        assert!(low.is_finite() && high.is_finite());
        assert!((low - 1.0).abs() < 1e-4);
        assert!((high - 30.0).abs() < 1e-4);
    }

    #[test]
    fn degenerate_domain_maps_to_range_midpoint() {
        let scale = RadiusScale::fit(&[3.0, 3.0], ScaleMode::Linear, 4.0, 10.0);
        assert!((scale.radius(3.0) - 7.0).abs() < 1e-4);
    }

    #[test]
    fn scale_is_monotonic() {
        for mode in [ScaleMode::Linear, ScaleMode::Log] {
            let scale = RadiusScale::fit(&[1.0, 100.0], mode, 2.0, 30.0);
            let mut previous = f32::NEG_INFINITY;
            for value in [1.0, 2.0, 5.0, 20.0, 50.0, 100.0] {
                let radius = scale.radius(value);
                assert!(radius >= previous);
                previous = radius;
            }
        }
    }
}
