// ==============================================================================
// calculator.rs - Ancestry Calculator Variants
// ==============================================================================
// Description: Registry of named reference panels sharing one estimator
// Author: Matt Barham
// Created: 2026-09-08
// Modified: 2026-09-21
// Version: 1.1.0
// ==============================================================================
// Adding a calculator means registering another panel; scoring logic is
// shared by every variant.
// ==============================================================================

use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

use crate::estimator::{AncestryEstimator, ConfigError, EstimatorConfig};
use crate::models::{AncestryResult, Marker};
use crate::reference_panel::{PanelError, ReferencePanel};

/// Variant used when none is requested
pub const DEFAULT_VARIANT: &str = "comprehensive";

/// Errors raised while building a calculator or selecting a variant
#[derive(Error, Debug)]
pub enum CalculatorError {
    #[error("Unknown calculator variant '{requested}' (available: {})", .available.join(", "))]
    UnknownVariant {
        requested: String,
        available: Vec<String>,
    },

    #[error("Reference panel error: {0}")]
    Panel(#[from] PanelError),

    #[error("Estimator configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Normalize a variant id for lookup ("Eurogenes_K13" → "eurogenes-k13")
fn variant_key(id: &str) -> String {
    id.trim().to_lowercase().replace('_', "-")
}

/// Ancestry calculator: named panels plus the shared estimator
///
/// Cheap to share across threads; panels are immutable and reference counted.
#[derive(Debug, Clone)]
pub struct Calculator {
    estimator: AncestryEstimator,
    panels: Vec<Arc<ReferencePanel>>,
}

impl Calculator {
    /// Calculator with no panels registered
    pub fn new(config: EstimatorConfig) -> Result<Self, CalculatorError> {
        Ok(Self {
            estimator: AncestryEstimator::new(config)?,
            panels: Vec::new(),
        })
    }

    /// Calculator preloaded with every built-in panel
    pub fn with_builtin_panels(config: EstimatorConfig) -> Result<Self, CalculatorError> {
        let mut calculator = Self::new(config)?;
        for id in ReferencePanel::builtin_ids() {
            calculator.register(ReferencePanel::builtin(id)?);
        }

        info!(
            "Loaded {} built-in calculator variants: {}",
            calculator.panels.len(),
            calculator.variants().join(", ")
        );
        Ok(calculator)
    }

    /// Register a panel, replacing any variant with the same id
    pub fn register(&mut self, panel: ReferencePanel) {
        let key = variant_key(panel.id());
        let panel = Arc::new(panel);

        match self
            .panels
            .iter_mut()
            .find(|existing| variant_key(existing.id()) == key)
        {
            Some(existing) => {
                debug!("Replacing calculator variant '{}'", key);
                *existing = panel;
            }
            None => {
                debug!("Registered calculator variant '{}'", key);
                self.panels.push(panel);
            }
        }
    }

    /// Registered variant ids, in registration order
    pub fn variants(&self) -> Vec<String> {
        self.panels.iter().map(|p| p.id().to_string()).collect()
    }

    pub fn panels(&self) -> impl Iterator<Item = &Arc<ReferencePanel>> {
        self.panels.iter()
    }

    pub fn estimator(&self) -> &AncestryEstimator {
        &self.estimator
    }

    /// Select a variant's panel
    ///
    /// Ids match case-insensitively with `_` and `-` interchangeable.
    pub fn panel(&self, variant: &str) -> Result<&Arc<ReferencePanel>, CalculatorError> {
        let key = variant_key(variant);
        self.panels
            .iter()
            .find(|panel| variant_key(panel.id()) == key)
            .ok_or_else(|| CalculatorError::UnknownVariant {
                requested: variant.to_string(),
                available: self.variants(),
            })
    }

    /// Estimate ancestry with the named variant
    pub fn estimate(&self, variant: &str, markers: &[Marker]) -> Result<AncestryResult, CalculatorError> {
        let panel = self.panel(variant)?;
        Ok(self.estimator.estimate(panel, markers))
    }

    /// Estimate with every registered variant, in registration order
    pub fn estimate_all(&self, markers: &[Marker]) -> Vec<(String, AncestryResult)> {
        self.panels
            .iter()
            .map(|panel| (panel.id().to_string(), self.estimator.estimate(panel, markers)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::thread;

    fn sample_markers() -> Vec<Marker> {
        vec![
            Marker::new("rs1426654", "15", Some(48426484), "AA"),
            Marker::new("rs4988235", "2", Some(136608646), "TT"),
            Marker::new("rs12913832", "15", Some(28365618), "GG"),
            Marker::new("rs2814778", "1", Some(159174683), "TT"),
            Marker::new("rs3827760", "2", Some(109513601), "AA"),
            Marker::new("rs16891982", "5", Some(33951693), "GG"),
        ]
    }

    fn calculator() -> Calculator {
        Calculator::with_builtin_panels(EstimatorConfig::default()).unwrap()
    }

    #[test]
    fn test_builtin_variants_registered() {
        let calc = calculator();
        assert_eq!(
            calc.variants(),
            vec!["six-population", "comprehensive", "eurogenes-k13"]
        );
    }

    #[test]
    fn test_select_variant() {
        let calc = calculator();

        assert_eq!(calc.panel("comprehensive").unwrap().id(), "comprehensive");
        assert_eq!(calc.panel("Eurogenes_K13").unwrap().id(), "eurogenes-k13");
        assert_eq!(calc.panel(" SIX-POPULATION ").unwrap().id(), "six-population");
    }

    #[test]
    fn test_unknown_variant_fails_fast() {
        let calc = calculator();

        match calc.estimate("dodecad-k12b", &sample_markers()) {
            Err(CalculatorError::UnknownVariant { requested, available }) => {
                assert_eq!(requested, "dodecad-k12b");
                assert_eq!(available.len(), 3);
            }
            other => panic!("Expected UnknownVariant, got {:?}", other),
        }
    }

    #[test]
    fn test_same_result_shape_across_variants() {
        let calc = calculator();
        let markers = sample_markers();

        for (id, result) in calc.estimate_all(&markers) {
            let panel = calc.panel(&id).unwrap();
            assert_eq!(result.total_markers, panel.marker_count());
            assert_eq!(result.ancestry.len(), panel.populations().len());
            assert!(result.markers_used <= result.total_markers);
            assert!(!result.insufficient_markers, "{} insufficient", id);
            assert!((result.ancestry.total() - 100.0).abs() <= 0.05);
            assert_eq!(result.name, panel.name());
        }
    }

    #[test]
    fn test_european_focused_variant() {
        let calc = calculator();
        let result = calc.estimate("eurogenes-k13", &sample_markers()).unwrap();

        // rs16891982 only exists in the European-focused panel
        assert_eq!(result.markers_used, 6);
        let (top, _) = result.ancestry.top().unwrap();
        assert_eq!(top, "North_European");
    }

    #[test]
    fn test_register_custom_panel() {
        let mut calc = calculator();
        let panel = ReferencePanel::from_json_str(
            &json!({
                "id": "two-way",
                "name": "Two Way",
                "populations": ["European", "African"],
                "markers": {
                    "rs1426654": { "European": { "A": 0.99 }, "African": { "G": 0.98 } }
                }
            })
            .to_string(),
        )
        .unwrap();
        calc.register(panel);

        assert_eq!(calc.variants().len(), 4);
        let result = calc.estimate("two-way", &sample_markers()).unwrap();
        assert_eq!(result.total_markers, 1);
        assert_eq!(result.markers_used, 1);
        assert!(result.insufficient_markers);
    }

    #[test]
    fn test_register_replaces_same_id() {
        let mut calc = calculator();
        let replacement = ReferencePanel::from_json_str(
            &json!({
                "id": "comprehensive",
                "name": "Replacement",
                "populations": ["A", "B"],
                "markers": { "rs1": { "A": { "A": 1.0 }, "B": { "C": 1.0 } } }
            })
            .to_string(),
        )
        .unwrap();
        calc.register(replacement);

        assert_eq!(calc.variants().len(), 3);
        assert_eq!(calc.panel("comprehensive").unwrap().name(), "Replacement");
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = EstimatorConfig {
            confidence_calibration: -1.0,
            ..EstimatorConfig::default()
        };
        assert!(matches!(
            Calculator::with_builtin_panels(config),
            Err(CalculatorError::Config(_))
        ));
    }

    #[test]
    fn test_concurrent_estimates_share_panels() {
        let calc = Arc::new(calculator());
        let markers = Arc::new(sample_markers());
        let expected = calc.estimate(DEFAULT_VARIANT, &markers).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let calc = Arc::clone(&calc);
                let markers = Arc::clone(&markers);
                thread::spawn(move || calc.estimate(DEFAULT_VARIANT, &markers).unwrap())
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), expected);
        }
    }
}
