// ==============================================================================
// estimator.rs - Log-Likelihood Ancestry Estimator
// ==============================================================================
// Description: Scores a marker sample against a reference panel
// Author: Matt Barham
// Created: 2026-09-05
// Modified: 2026-09-21
// Version: 1.2.0
// ==============================================================================
// Algorithm:
//   For each input marker present in the panel (used = distinct rsids),
//   for each population:
//     L = Π freq(allele)            (floor for unlisted / zero alleles)
//     score[pop] += ln(L + ε)
//   If fewer than min_markers matched → insufficient result (all zero)
//   Otherwise softmax via log-sum-exp:
//     pct[pop] = exp(score[pop] - max) / Σ exp(score - max) × 100
//   Residual drift from 100 is spread evenly across populations
//   confidence = clamp((top - second) × min(1, used / calibration), 0, 100)
// ==============================================================================

use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::{AncestryBreakdown, AncestryResult, Marker};
use crate::reference_panel::ReferencePanel;

pub const DEFAULT_MIN_MARKERS: usize = 3;
pub const DEFAULT_CONFIDENCE_CALIBRATION: f64 = 7.0;
pub const DEFAULT_ALLELE_FLOOR: f64 = 0.01;
pub const DEFAULT_LOG_EPSILON: f64 = 1e-4;
pub const DEFAULT_SUM_TOLERANCE: f64 = 0.01;

pub const INSUFFICIENT_MARKERS_WARNING: &str =
    "Insufficient ancestry markers in file to generate a reliable estimate.";

/// Invalid estimator settings
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Confidence calibration must be positive (got {0})")]
    InvalidCalibration(f64),

    #[error("Allele floor frequency must be within (0, 1] (got {0})")]
    InvalidAlleleFloor(f64),

    #[error("Log epsilon must be positive (got {0})")]
    InvalidEpsilon(f64),

    #[error("Sum tolerance must be non-negative (got {0})")]
    InvalidTolerance(f64),
}

/// Tunable estimator constants
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EstimatorConfig {
    /// Minimum panel markers required before scoring
    pub min_markers: usize,

    /// Markers needed for full confidence weight
    pub confidence_calibration: f64,

    /// Frequency used for alleles a population does not list
    pub allele_floor: f64,

    /// Added inside the logarithm to keep it finite
    pub log_epsilon: f64,

    /// Allowed |Σ% - 100| before residual redistribution
    pub sum_tolerance: f64,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            min_markers: DEFAULT_MIN_MARKERS,
            confidence_calibration: DEFAULT_CONFIDENCE_CALIBRATION,
            allele_floor: DEFAULT_ALLELE_FLOOR,
            log_epsilon: DEFAULT_LOG_EPSILON,
            sum_tolerance: DEFAULT_SUM_TOLERANCE,
        }
    }
}

impl EstimatorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.confidence_calibration.is_finite() && self.confidence_calibration > 0.0) {
            return Err(ConfigError::InvalidCalibration(self.confidence_calibration));
        }
        if !(self.allele_floor > 0.0 && self.allele_floor <= 1.0) {
            return Err(ConfigError::InvalidAlleleFloor(self.allele_floor));
        }
        if !(self.log_epsilon.is_finite() && self.log_epsilon > 0.0) {
            return Err(ConfigError::InvalidEpsilon(self.log_epsilon));
        }
        if !(self.sum_tolerance.is_finite() && self.sum_tolerance >= 0.0) {
            return Err(ConfigError::InvalidTolerance(self.sum_tolerance));
        }
        Ok(())
    }
}

/// Ancestry estimator (one algorithm for every panel)
#[derive(Debug, Clone, Copy, Default)]
pub struct AncestryEstimator {
    config: EstimatorConfig,
}

impl AncestryEstimator {
    /// Create an estimator, rejecting invalid settings
    pub fn new(config: EstimatorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &EstimatorConfig {
        &self.config
    }

    /// Estimate ancestry proportions for a marker sample
    ///
    /// Markers are scored in input order; duplicate rsids are scored once
    /// per occurrence but count once toward `markers_used`. Never fails: too few usable markers yields a result
    /// with `insufficient_markers` set.
    pub fn estimate(&self, panel: &ReferencePanel, markers: &[Marker]) -> AncestryResult {
        let populations = panel.populations();
        let (scores, markers_used) = self.log_likelihoods(panel, markers);

        if markers_used < self.config.min_markers {
            warn!(
                "Only {} of {} '{}' markers present (minimum {}), skipping estimate",
                markers_used,
                panel.marker_count(),
                panel.id(),
                self.config.min_markers
            );
            return AncestryResult {
                name: panel.name().to_string(),
                description: panel.description().to_string(),
                ancestry: zero_breakdown(populations),
                confidence: 0.0,
                markers_used,
                total_markers: panel.marker_count(),
                warning: Some(INSUFFICIENT_MARKERS_WARNING.to_string()),
                insufficient_markers: true,
            };
        }

        let percentages = self.normalize(&scores);
        let confidence = self.confidence(&percentages, markers_used);

        debug!(
            "Panel '{}': {} markers used, confidence {:.1}",
            panel.id(),
            markers_used,
            confidence
        );

        AncestryResult {
            name: panel.name().to_string(),
            description: panel.description().to_string(),
            ancestry: AncestryBreakdown::new(
                populations.iter().cloned().zip(percentages).collect(),
            ),
            confidence,
            markers_used,
            total_markers: panel.marker_count(),
            warning: None,
            insufficient_markers: false,
        }
    }

    /// Accumulated ln-likelihood per population plus the distinct matched rsid count
    fn log_likelihoods(&self, panel: &ReferencePanel, markers: &[Marker]) -> (Vec<f64>, usize) {
        let population_count = panel.populations().len();
        let mut scores = vec![0.0_f64; population_count];
        let mut matched: HashSet<&str> = HashSet::new();

        for marker in markers {
            let Some(frequencies) = panel.marker(&marker.rsid) else {
                continue;
            };
            matched.insert(marker.rsid.as_str());

            for (idx, score) in scores.iter_mut().enumerate() {
                let likelihood: f64 = marker
                    .genotype
                    .alleles()
                    .map(|allele| match frequencies.frequency(idx, allele) {
                        Some(freq) if freq > 0.0 => freq,
                        _ => self.config.allele_floor,
                    })
                    .product();

                *score += (likelihood + self.config.log_epsilon).ln();
            }
        }

        (scores, matched.len())
    }

    /// Log-sum-exp softmax to percentages, with residual correction
    fn normalize(&self, scores: &[f64]) -> Vec<f64> {
        let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let exps: Vec<f64> = scores.iter().map(|score| (score - max).exp()).collect();
        let total: f64 = exps.iter().sum();

        let mut percentages: Vec<f64> = exps.iter().map(|e| e / total * 100.0).collect();
        redistribute_residual(&mut percentages, self.config.sum_tolerance);
        percentages
    }

    fn confidence(&self, percentages: &[f64], markers_used: usize) -> f64 {
        let mut ranked = percentages.to_vec();
        ranked.sort_by(|a, b| b.total_cmp(a));

        let top = ranked.first().copied().unwrap_or(0.0);
        let second = ranked.get(1).copied().unwrap_or(0.0);
        let evidence = (markers_used as f64 / self.config.confidence_calibration).min(1.0);

        ((top - second) * evidence).clamp(0.0, 100.0)
    }
}

/// Spread any drift from 100 beyond `tolerance` evenly across populations
fn redistribute_residual(percentages: &mut [f64], tolerance: f64) {
    if percentages.is_empty() {
        return;
    }

    let residual = 100.0 - percentages.iter().sum::<f64>();
    if residual.abs() > tolerance {
        let adjustment = residual / percentages.len() as f64;
        for pct in percentages.iter_mut() {
            *pct += adjustment;
        }
    }
}

fn zero_breakdown(populations: &[String]) -> AncestryBreakdown {
    AncestryBreakdown::new(populations.iter().map(|p| (p.clone(), 0.0)).collect())
}
