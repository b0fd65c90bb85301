// ==============================================================================
// reference_panel.rs - Population Allele-Frequency Reference Panels
// ==============================================================================
// Description: Loads and validates immutable ancestry reference panels
// Author: Matt Barham
// Created: 2025-11-12
// Modified: 2026-09-18
// Version: 2.0.0
// ==============================================================================
// Panel file format (JSON):
//   {
//     "id": "comprehensive", "name": "...", "description": "...", "version": "...",
//     "populations": ["European", "African", ...],
//     "markers": { "rs1426654": { "European": { "A": 0.99, "G": 0.01 }, ... } }
//   }
// Every marker must list every population. Built-in panels live in panels/
// and are embedded at compile time.
// ==============================================================================

use serde::Deserialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use crate::models::has_marker_prefix;

const BUILTIN_PANELS: &[(&str, &str)] = &[
    (
        "six-population",
        include_str!("../panels/six-population.json"),
    ),
    ("comprehensive", include_str!("../panels/comprehensive.json")),
    ("eurogenes-k13", include_str!("../panels/eurogenes-k13.json")),
];

/// Listed allele frequencies for one population are expected to sum near 1
const SUM_WARN_LOW: f64 = 0.9;
const SUM_WARN_HIGH: f64 = 1.1;

/// Errors raised while loading a reference panel
#[derive(Error, Debug)]
pub enum PanelError {
    #[error("Failed to read panel file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid panel JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Unknown built-in panel: {0}")]
    UnknownBuiltin(String),

    #[error("Panel id must not be empty")]
    MissingId,

    #[error("Panel '{panel}' declares no populations")]
    NoPopulations { panel: String },

    #[error("Panel '{panel}' lists population '{population}' more than once")]
    DuplicatePopulation { panel: String, population: String },

    #[error("Panel '{panel}' has an empty marker set")]
    EmptyMarkerSet { panel: String },

    #[error("Panel '{panel}': invalid marker id '{rsid}'")]
    InvalidRsid { panel: String, rsid: String },

    #[error("Panel '{panel}': marker {rsid} has no frequencies for population '{population}'")]
    MissingPopulation {
        panel: String,
        rsid: String,
        population: String,
    },

    #[error("Panel '{panel}': marker {rsid} references undeclared population '{population}'")]
    UnknownPopulation {
        panel: String,
        rsid: String,
        population: String,
    },

    #[error("Panel '{panel}': marker {rsid}, population '{population}' has invalid allele '{allele}'")]
    InvalidAllele {
        panel: String,
        rsid: String,
        population: String,
        allele: String,
    },

    #[error("Panel '{panel}': marker {rsid}, population '{population}', allele {allele} frequency {value} outside [0, 1]")]
    FrequencyOutOfRange {
        panel: String,
        rsid: String,
        population: String,
        allele: char,
        value: f64,
    },
}

/// On-disk panel layout
#[derive(Debug, Deserialize)]
struct PanelFile {
    id: String,
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    version: String,
    populations: Vec<String>,
    markers: BTreeMap<String, BTreeMap<String, BTreeMap<String, f64>>>,
}

const ALLELES: [char; 4] = ['A', 'C', 'G', 'T'];

fn allele_slot(allele: char) -> Option<usize> {
    ALLELES.iter().position(|&a| a == allele)
}

/// Listed frequencies of A, C, G, T for one population at one marker
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct AlleleFrequencies([Option<f64>; 4]);

/// Per-population frequencies for one marker, indexed like `ReferencePanel::populations`
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerFrequencies {
    by_population: Vec<AlleleFrequencies>,
}

impl MarkerFrequencies {
    /// Listed frequency of `allele` for the population at `population_index`
    ///
    /// `None` when the allele is not listed (or is not a base at all).
    pub fn frequency(&self, population_index: usize, allele: char) -> Option<f64> {
        let slot = allele_slot(allele)?;
        self.by_population
            .get(population_index)
            .and_then(|freqs| freqs.0[slot])
    }
}

/// Immutable ancestry reference panel
///
/// Loaded once and shared read-only (typically behind an `Arc`) across any
/// number of concurrent estimations.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferencePanel {
    id: String,
    name: String,
    description: String,
    version: String,
    populations: Vec<String>,
    markers: HashMap<String, MarkerFrequencies>,
}

impl ReferencePanel {
    /// Parse and validate a panel from JSON text
    pub fn from_json_str(json: &str) -> Result<Self, PanelError> {
        let file: PanelFile = serde_json::from_str(json)?;
        Self::from_file(file)
    }

    /// Load a panel from a JSON file on disk
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, PanelError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| PanelError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let panel = Self::from_json_str(&json)?;
        info!(
            "Loaded reference panel '{}' from {:?}: {} markers, {} populations",
            panel.id,
            path,
            panel.marker_count(),
            panel.populations.len()
        );
        Ok(panel)
    }

    /// Load one of the panels shipped with the crate
    pub fn builtin(id: &str) -> Result<Self, PanelError> {
        let (_, json) = BUILTIN_PANELS
            .iter()
            .find(|(builtin_id, _)| *builtin_id == id)
            .ok_or_else(|| PanelError::UnknownBuiltin(id.to_string()))?;

        Self::from_json_str(json)
    }

    /// Ids of the shipped panels, in registration order
    pub fn builtin_ids() -> impl Iterator<Item = &'static str> {
        BUILTIN_PANELS.iter().map(|(id, _)| *id)
    }

    fn from_file(file: PanelFile) -> Result<Self, PanelError> {
        let panel = file.id.trim().to_string();
        if panel.is_empty() {
            return Err(PanelError::MissingId);
        }

        if file.populations.is_empty() {
            return Err(PanelError::NoPopulations { panel });
        }

        let mut population_index: HashMap<&str, usize> = HashMap::new();
        for (idx, population) in file.populations.iter().enumerate() {
            if population_index.insert(population.as_str(), idx).is_some() {
                return Err(PanelError::DuplicatePopulation {
                    panel,
                    population: population.clone(),
                });
            }
        }

        if file.markers.is_empty() {
            return Err(PanelError::EmptyMarkerSet { panel });
        }

        let mut markers = HashMap::with_capacity(file.markers.len());
        for (rsid, populations) in &file.markers {
            if !has_marker_prefix(rsid) {
                return Err(PanelError::InvalidRsid {
                    panel,
                    rsid: rsid.clone(),
                });
            }

            let mut by_population = vec![AlleleFrequencies::default(); file.populations.len()];
            let mut seen: HashSet<usize> = HashSet::new();

            for (population, alleles) in populations {
                let idx = *population_index.get(population.as_str()).ok_or_else(|| {
                    PanelError::UnknownPopulation {
                        panel: panel.clone(),
                        rsid: rsid.clone(),
                        population: population.clone(),
                    }
                })?;
                seen.insert(idx);

                let mut sum = 0.0;
                for (allele_key, &value) in alleles {
                    let allele = parse_allele(allele_key).ok_or_else(|| PanelError::InvalidAllele {
                        panel: panel.clone(),
                        rsid: rsid.clone(),
                        population: population.clone(),
                        allele: allele_key.clone(),
                    })?;

                    if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                        return Err(PanelError::FrequencyOutOfRange {
                            panel,
                            rsid: rsid.clone(),
                            population: population.clone(),
                            allele,
                            value,
                        });
                    }

                    if let Some(slot) = allele_slot(allele) {
                        by_population[idx].0[slot] = Some(value);
                    }
                    sum += value;
                }

                if !(SUM_WARN_LOW..=SUM_WARN_HIGH).contains(&sum) {
                    warn!(
                        "Panel '{}': {} frequencies for {} sum to {:.3}",
                        panel, rsid, population, sum
                    );
                }
            }

            if let Some(missing) = file
                .populations
                .iter()
                .enumerate()
                .find(|(idx, _)| !seen.contains(idx))
            {
                return Err(PanelError::MissingPopulation {
                    panel,
                    rsid: rsid.clone(),
                    population: missing.1.clone(),
                });
            }

            markers.insert(rsid.clone(), MarkerFrequencies { by_population });
        }

        Ok(Self {
            id: panel,
            name: file.name,
            description: file.description,
            version: file.version,
            populations: file.populations,
            markers,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Display name used in results (e.g., "Comprehensive Ancestry")
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Populations in declaration order
    pub fn populations(&self) -> &[String] {
        &self.populations
    }

    /// Size of the marker set (`total_markers` in results)
    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    pub fn contains(&self, rsid: &str) -> bool {
        self.markers.contains_key(rsid)
    }

    pub fn marker(&self, rsid: &str) -> Option<&MarkerFrequencies> {
        self.markers.get(rsid)
    }

    /// Listed frequency for one marker / population / allele
    pub fn frequency(&self, rsid: &str, population_index: usize, allele: char) -> Option<f64> {
        self.marker(rsid)?.frequency(population_index, allele)
    }

    /// Marker ids, sorted
    pub fn marker_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.markers.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}

fn parse_allele(key: &str) -> Option<char> {
    let mut chars = key.trim().chars();
    let allele = chars.next()?.to_ascii_uppercase();
    if chars.next().is_some() || allele_slot(allele).is_none() {
        return None;
    }
    Some(allele)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn two_population_panel() -> serde_json::Value {
        json!({
            "id": "test",
            "name": "Test Panel",
            "populations": ["European", "African"],
            "markers": {
                "rs1426654": {
                    "European": { "A": 0.99, "G": 0.01 },
                    "African": { "A": 0.02, "G": 0.98 }
                },
                "rs4988235": {
                    "European": { "T": 0.52, "C": 0.48 },
                    "African": { "T": 0.08, "C": 0.92 }
                }
            }
        })
    }

    #[test]
    fn test_load_valid_panel() {
        let panel = ReferencePanel::from_json_str(&two_population_panel().to_string()).unwrap();

        assert_eq!(panel.id(), "test");
        assert_eq!(panel.name(), "Test Panel");
        assert_eq!(panel.populations(), ["European", "African"]);
        assert_eq!(panel.marker_count(), 2);
        assert!(panel.contains("rs1426654"));
        assert!(!panel.contains("rs0"));
        assert_eq!(panel.frequency("rs1426654", 0, 'A'), Some(0.99));
        assert_eq!(panel.frequency("rs4988235", 1, 'C'), Some(0.92));
        assert_eq!(panel.frequency("rs4988235", 1, 'A'), None);
        assert_eq!(panel.frequency("rs4988235", 1, '-'), None);
        assert_eq!(panel.marker_ids(), vec!["rs1426654", "rs4988235"]);
    }

    #[test]
    fn test_builtin_panels_load() {
        for id in ReferencePanel::builtin_ids() {
            let panel = ReferencePanel::builtin(id).unwrap();
            assert_eq!(panel.id(), id);
            assert!(panel.populations().len() >= 6, "{} populations", id);
            assert!(panel.marker_count() >= 7, "{} markers", id);
            assert!(!panel.name().is_empty());
        }
    }

    #[test]
    fn test_builtin_shapes() {
        let six = ReferencePanel::builtin("six-population").unwrap();
        assert_eq!(six.populations().len(), 6);
        assert_eq!(six.marker_count(), 8);

        let comprehensive = ReferencePanel::builtin("comprehensive").unwrap();
        assert_eq!(comprehensive.populations().len(), 7);
        assert_eq!(comprehensive.marker_count(), 7);
        assert_eq!(comprehensive.name(), "Comprehensive Ancestry");

        let eurogenes = ReferencePanel::builtin("eurogenes-k13").unwrap();
        assert_eq!(eurogenes.populations()[0], "North_European");
        assert_eq!(eurogenes.marker_count(), 9);
    }

    #[test]
    fn test_unknown_builtin() {
        assert!(matches!(
            ReferencePanel::builtin("dodecad"),
            Err(PanelError::UnknownBuiltin(_))
        ));
    }

    #[test]
    fn test_missing_population_rejected() {
        let mut value = two_population_panel();
        value["markers"]["rs4988235"]
            .as_object_mut()
            .unwrap()
            .remove("African");

        match ReferencePanel::from_json_str(&value.to_string()) {
            Err(PanelError::MissingPopulation { rsid, population, .. }) => {
                assert_eq!(rsid, "rs4988235");
                assert_eq!(population, "African");
            }
            other => panic!("Expected MissingPopulation, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_population_rejected() {
        let mut value = two_population_panel();
        value["markers"]["rs1426654"]["Martian"] = json!({ "A": 0.5 });

        assert!(matches!(
            ReferencePanel::from_json_str(&value.to_string()),
            Err(PanelError::UnknownPopulation { .. })
        ));
    }

    #[test]
    fn test_frequency_out_of_range_rejected() {
        let mut value = two_population_panel();
        value["markers"]["rs1426654"]["European"]["A"] = json!(1.5);

        assert!(matches!(
            ReferencePanel::from_json_str(&value.to_string()),
            Err(PanelError::FrequencyOutOfRange { allele: 'A', .. })
        ));
    }

    #[test]
    fn test_invalid_allele_rejected() {
        let mut value = two_population_panel();
        value["markers"]["rs1426654"]["European"]["AG"] = json!(0.1);

        assert!(matches!(
            ReferencePanel::from_json_str(&value.to_string()),
            Err(PanelError::InvalidAllele { .. })
        ));
    }

    #[test]
    fn test_structural_errors() {
        let mut value = two_population_panel();
        value["populations"] = json!([]);
        assert!(matches!(
            ReferencePanel::from_json_str(&value.to_string()),
            Err(PanelError::NoPopulations { .. })
        ));

        let mut value = two_population_panel();
        value["populations"] = json!(["European", "African", "European"]);
        assert!(matches!(
            ReferencePanel::from_json_str(&value.to_string()),
            Err(PanelError::DuplicatePopulation { .. })
        ));

        let mut value = two_population_panel();
        value["markers"] = json!({});
        assert!(matches!(
            ReferencePanel::from_json_str(&value.to_string()),
            Err(PanelError::EmptyMarkerSet { .. })
        ));

        let mut value = two_population_panel();
        value["id"] = json!("  ");
        assert!(matches!(
            ReferencePanel::from_json_str(&value.to_string()),
            Err(PanelError::MissingId)
        ));

        let mut value = two_population_panel();
        value["markers"]["chr1:100"] = value["markers"]["rs1426654"].clone();
        assert!(matches!(
            ReferencePanel::from_json_str(&value.to_string()),
            Err(PanelError::InvalidRsid { .. })
        ));

        assert!(matches!(
            ReferencePanel::from_json_str("{ not json"),
            Err(PanelError::InvalidJson(_))
        ));
    }

    #[test]
    fn test_from_path() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(two_population_panel().to_string().as_bytes())
            .unwrap();
        file.flush().unwrap();

        let panel = ReferencePanel::from_path(file.path()).unwrap();
        assert_eq!(panel.marker_count(), 2);

        assert!(matches!(
            ReferencePanel::from_path("/nonexistent/panel.json"),
            Err(PanelError::Io { .. })
        ));
    }

    #[test]
    fn test_lowercase_allele_keys_accepted() {
        let mut value = two_population_panel();
        value["markers"]["rs1426654"]["European"] = json!({ "a": 0.99, "g": 0.01 });

        let panel = ReferencePanel::from_json_str(&value.to_string()).unwrap();
        assert_eq!(panel.frequency("rs1426654", 0, 'A'), Some(0.99));
    }
}
