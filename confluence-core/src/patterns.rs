//! Pattern matcher — geometric similarity between the recent price window
//! and a library of labeled shape templates.
//!
//! The candidate window and every template are z-score normalized (scale
//! and offset invariant), then compared with dynamic time warping under a
//! Sakoe-Chiba band so locally stretched or compressed shapes still match.
//! The best match below the distance threshold emits one signal; ties are
//! broken by the lowest template index for determinism.

use serde::{Deserialize, Serialize};

use chrono::{DateTime, Utc};

use crate::domain::{Bar, Direction, Signal, SignalSource};
use crate::error::ConfigError;

/// A normalized reference price shape with a labeled outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternTemplate {
    pub name: String,
    /// Shape points; normalized internally, so any scale/offset works.
    pub shape: Vec<f64>,
    pub outcome: Direction,
}

/// Matcher parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternConfig {
    /// Trailing window length compared against the templates.
    pub window_len: usize,
    /// Maximum normalized DTW distance for a match.
    pub distance_threshold: f64,
    /// Sakoe-Chiba band half-width as a fraction of the longer sequence.
    pub band_fraction: f64,
}

impl PatternConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_len < 2 {
            return Err(ConfigError::ZeroPeriod {
                name: "pattern.window_len",
                value: self.window_len,
            });
        }
        if !self.distance_threshold.is_finite() || self.distance_threshold <= 0.0 {
            return Err(ConfigError::NonPositive {
                name: "pattern.distance_threshold",
                value: self.distance_threshold,
            });
        }
        if !(0.0..=1.0).contains(&self.band_fraction) {
            return Err(ConfigError::FractionOutOfRange {
                name: "pattern.band_fraction",
                value: self.band_fraction,
            });
        }
        Ok(())
    }
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            window_len: 16,
            distance_threshold: 0.6,
            band_fraction: 0.2,
        }
    }
}

/// Z-score normalize a series. Returns `None` for constant or non-finite input.
fn z_normalize(values: &[f64]) -> Option<Vec<f64>> {
    if values.len() < 2 || values.iter().any(|v| !v.is_finite()) {
        return None;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    let std = var.sqrt();
    if std < 1e-12 {
        return None;
    }
    Some(values.iter().map(|v| (v - mean) / std).collect())
}

/// DTW distance between two z-normalized series under a Sakoe-Chiba band.
///
/// Cost is |a - b| per aligned pair; the accumulated cost is normalized by
/// the combined length so distances are comparable across window sizes.
fn dtw_distance(a: &[f64], b: &[f64], band_fraction: f64) -> f64 {
    let n = a.len();
    let m = b.len();
    let band = ((n.max(m) as f64 * band_fraction).ceil() as usize)
        .max(n.abs_diff(m))
        .max(1);

    let mut prev = vec![f64::INFINITY; m + 1];
    let mut curr = vec![f64::INFINITY; m + 1];
    prev[0] = 0.0;

    for i in 1..=n {
        curr.fill(f64::INFINITY);
        let lo = i.saturating_sub(band).max(1);
        let hi = (i + band).min(m);
        for j in lo..=hi {
            let cost = (a[i - 1] - b[j - 1]).abs();
            let best = prev[j].min(curr[j - 1]).min(prev[j - 1]);
            curr[j] = cost + best;
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[m] / (n + m) as f64
}

/// Library of shape templates plus match parameters.
pub struct PatternMatcher {
    config: PatternConfig,
    templates: Vec<PatternTemplate>,
    /// Pre-normalized template shapes, parallel to `templates`.
    normalized: Vec<Vec<f64>>,
}

impl PatternMatcher {
    /// Build a matcher. Fails fast on empty/degenerate templates.
    pub fn new(config: PatternConfig, templates: Vec<PatternTemplate>) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut normalized = Vec::with_capacity(templates.len());
        for template in &templates {
            let norm = z_normalize(&template.shape)
                .ok_or_else(|| ConfigError::InvalidTemplate(template.name.clone()))?;
            normalized.push(norm);
        }
        Ok(Self {
            config,
            templates,
            normalized,
        })
    }

    /// Matcher with the built-in template library.
    pub fn with_builtin(config: PatternConfig) -> Result<Self, ConfigError> {
        Self::new(config, builtin_templates())
    }

    pub fn template_count(&self) -> usize {
        self.templates.len()
    }

    pub fn window_len(&self) -> usize {
        self.config.window_len
    }

    /// Match the trailing window ending at `t`.
    ///
    /// At most one signal per (symbol, t): best match wins, ties go to the
    /// lowest template index. Short or degenerate (constant) windows abstain.
    pub fn signal_at(&self, symbol: &str, t: DateTime<Utc>, window: &[Bar]) -> Option<Signal> {
        if window.len() < self.config.window_len || self.templates.is_empty() {
            return None;
        }
        let closes: Vec<f64> = window[window.len() - self.config.window_len..]
            .iter()
            .map(|b| b.close)
            .collect();
        let candidate = z_normalize(&closes)?;

        let mut best: Option<(usize, f64)> = None;
        for (idx, template) in self.normalized.iter().enumerate() {
            let dist = dtw_distance(&candidate, template, self.config.band_fraction);
            let better = match best {
                None => true,
                // Strict inequality keeps the lowest index on exact ties.
                Some((_, best_dist)) => dist < best_dist,
            };
            if better {
                best = Some((idx, dist));
            }
        }

        let (idx, dist) = best?;
        if dist >= self.config.distance_threshold {
            return None;
        }
        let template = &self.templates[idx];
        Some(Signal {
            source: SignalSource::Pattern,
            symbol: symbol.to_string(),
            timestamp: t,
            direction: template.outcome,
            strength: (1.0 - dist / self.config.distance_threshold).clamp(0.0, 1.0),
            confidence: 1.0,
        })
    }
}

/// Built-in shape library: coarse geometric archetypes with labeled outcomes.
pub fn builtin_templates() -> Vec<PatternTemplate> {
    vec![
        PatternTemplate {
            name: "v_reversal".into(),
            shape: vec![8.0, 6.0, 4.0, 2.0, 0.0, 0.5, 2.0, 4.0, 6.0, 8.0],
            outcome: Direction::Long,
        },
        PatternTemplate {
            name: "breakout_staircase".into(),
            shape: vec![0.0, 0.0, 1.0, 1.0, 1.0, 2.0, 2.0, 3.0, 4.0, 6.0],
            outcome: Direction::Long,
        },
        PatternTemplate {
            name: "rounded_top".into(),
            shape: vec![0.0, 2.0, 4.0, 5.5, 6.0, 6.0, 5.5, 4.0, 2.0, 0.0],
            outcome: Direction::Short,
        },
        PatternTemplate {
            name: "descending_slide".into(),
            shape: vec![8.0, 7.5, 7.0, 6.0, 5.5, 4.5, 3.5, 2.5, 1.0, 0.0],
            outcome: Direction::Short,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;

    fn matcher(window_len: usize, threshold: f64) -> PatternMatcher {
        PatternMatcher::with_builtin(PatternConfig {
            window_len,
            distance_threshold: threshold,
            band_fraction: 0.2,
        })
        .unwrap()
    }

    #[test]
    fn z_normalize_is_scale_and_offset_invariant() {
        let a = z_normalize(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        let b = z_normalize(&[10.0, 20.0, 30.0, 40.0]).unwrap();
        let c = z_normalize(&[101.0, 102.0, 103.0, 104.0]).unwrap();
        for i in 0..a.len() {
            assert!((a[i] - b[i]).abs() < 1e-12);
            assert!((a[i] - c[i]).abs() < 1e-12);
        }
    }

    #[test]
    fn z_normalize_rejects_constant_series() {
        assert!(z_normalize(&[5.0, 5.0, 5.0]).is_none());
    }

    #[test]
    fn dtw_identical_series_is_zero() {
        let series = z_normalize(&[1.0, 3.0, 2.0, 5.0, 4.0]).unwrap();
        assert!(dtw_distance(&series, &series, 0.2) < 1e-12);
    }

    #[test]
    fn dtw_tolerates_time_warp() {
        // The same ramp with one step repeated: DTW aligns the stutter at
        // zero cost, where a pointwise comparison cannot line the two up.
        let a = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0];
        let stuttered = [0.0, 1.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0];
        assert!(dtw_distance(&a, &stuttered, 0.3) < 1e-12);

        // On equal-length normalized inputs the elastic distance can never
        // exceed the rigid pointwise alignment.
        let x = z_normalize(&[0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]).unwrap();
        let warped = z_normalize(&[0.0, 1.0, 1.0, 2.0, 3.0, 4.0, 6.0, 7.0]).unwrap();
        let pointwise: f64 = x
            .iter()
            .zip(&warped)
            .map(|(p, q)| (p - q).abs())
            .sum::<f64>()
            / (x.len() + warped.len()) as f64;
        assert!(dtw_distance(&x, &warped, 0.3) <= pointwise + 1e-12);
    }

    #[test]
    fn v_shape_matches_long_template() {
        let closes = vec![108.0, 106.0, 104.0, 102.0, 100.0, 100.5, 102.0, 104.0, 106.0, 108.0];
        let bars = make_bars(&closes);
        let m = matcher(10, 0.6);
        let signal = m
            .signal_at("TEST", bars.last().unwrap().timestamp, &bars)
            .unwrap();
        assert_eq!(signal.direction, Direction::Long);
        assert!(signal.strength > 0.5);
    }

    #[test]
    fn slide_matches_short_template() {
        let closes = vec![108.0, 107.5, 107.0, 106.0, 105.5, 104.5, 103.5, 102.5, 101.0, 100.0];
        let bars = make_bars(&closes);
        let m = matcher(10, 0.6);
        let signal = m
            .signal_at("TEST", bars.last().unwrap().timestamp, &bars)
            .unwrap();
        assert_eq!(signal.direction, Direction::Short);
    }

    #[test]
    fn noise_above_threshold_abstains() {
        let closes = vec![100.0, 108.0, 99.0, 107.0, 98.0, 109.0, 100.0, 106.0, 97.0, 108.0];
        let bars = make_bars(&closes);
        // Tight threshold: sawtooth noise matches nothing well.
        let m = matcher(10, 0.05);
        assert!(m
            .signal_at("TEST", bars.last().unwrap().timestamp, &bars)
            .is_none());
    }

    #[test]
    fn short_window_abstains() {
        let bars = make_bars(&[100.0, 101.0, 102.0]);
        let m = matcher(10, 0.6);
        assert!(m
            .signal_at("TEST", bars.last().unwrap().timestamp, &bars)
            .is_none());
    }

    #[test]
    fn constant_window_abstains() {
        let bars = make_bars(&vec![100.0; 12]);
        let m = matcher(10, 0.6);
        assert!(m
            .signal_at("TEST", bars.last().unwrap().timestamp, &bars)
            .is_none());
    }

    #[test]
    fn degenerate_template_rejected_at_startup() {
        let result = PatternMatcher::new(
            PatternConfig::default(),
            vec![PatternTemplate {
                name: "flatline".into(),
                shape: vec![1.0, 1.0, 1.0, 1.0],
                outcome: Direction::Long,
            }],
        );
        assert!(matches!(result, Err(ConfigError::InvalidTemplate(_))));
    }
}
