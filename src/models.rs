// ==============================================================================
// models.rs - Marker & Ancestry Data Models
// ==============================================================================
// Description: Shared value types for raw export ingestion and ancestry results
// Author: Matt Barham
// Created: 2026-09-02
// Modified: 2026-09-21
// Version: 3.0.0
// ==============================================================================

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;

use crate::genotype::Genotype;

/// rsid prefixes accepted by the parser and reference panels
pub const RSID_PREFIXES: &[&str] = &["rs", "i"];

/// Whether an identifier looks like a marker id ("rs…" or vendor-internal "i…")
pub fn has_marker_prefix(rsid: &str) -> bool {
    RSID_PREFIXES.iter().any(|prefix| rsid.starts_with(prefix))
}

/// A single genotyped marker from a raw export
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Marker {
    /// Marker identifier (e.g., "rs4988235", "i3000001")
    pub rsid: String,

    /// Chromosome as written by the vendor ("1"-"22", "X", "Y", "MT", ...)
    pub chromosome: String,

    /// Base pair position, None if absent or unparseable
    pub position: Option<u64>,

    /// Canonical genotype
    pub genotype: Genotype,
}

impl Marker {
    pub fn new(
        rsid: impl Into<String>,
        chromosome: impl Into<String>,
        position: Option<u64>,
        genotype: &str,
    ) -> Self {
        Self {
            rsid: rsid.into(),
            chromosome: chromosome.into(),
            position,
            genotype: Genotype::parse(genotype),
        }
    }
}

/// Vendor / format family a raw export is attributed to
///
/// Detection is heuristic and never authoritative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Provider {
    #[serde(rename = "23andMe")]
    TwentyThreeAndMe,
    #[serde(rename = "AncestryDNA")]
    AncestryDna,
    #[serde(rename = "MyHeritage")]
    MyHeritage,
    /// No header row; positional rsid/chromosome/position/genotype columns
    #[serde(rename = "23andMe-like")]
    Positional,
    #[serde(rename = "Unknown")]
    Unknown,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::TwentyThreeAndMe => "23andMe",
            Provider::AncestryDna => "AncestryDNA",
            Provider::MyHeritage => "MyHeritage",
            Provider::Positional => "23andMe-like",
            Provider::Unknown => "Unknown",
        }
    }

    /// Infer a provider from free text (header cells or comment lines)
    ///
    /// When several vendor keywords appear the last one checked wins.
    pub fn from_hint(text: &str) -> Option<Self> {
        let lowered = text.to_lowercase();
        let mut provider = None;

        if lowered.contains("23andme") {
            provider = Some(Provider::TwentyThreeAndMe);
        }
        if lowered.contains("ancestry") {
            provider = Some(Provider::AncestryDna);
        }
        if lowered.contains("myheritage") {
            provider = Some(Provider::MyHeritage);
        }

        provider
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Statistics gathered during one parse
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestionSummary {
    /// Every line read, including comments and blanks
    pub total_lines_scanned: usize,

    /// Every marker successfully built (not capped by the sample limit)
    pub parsed_marker_count: usize,

    /// Distinct chromosome labels across all parsed markers
    pub distinct_chromosome_count: usize,

    pub detected_provider: Provider,
}

/// Result of parsing one raw export
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedFile {
    pub provider: Provider,

    /// Materialized marker sample, in file order (at most the parser's sample limit)
    pub markers: Vec<Marker>,

    pub summary: IngestionSummary,
}

impl ParsedFile {
    /// rsid → genotype lookup over the materialized markers
    ///
    /// Duplicate rsids resolve to the last occurrence; `markers` itself
    /// keeps every duplicate.
    pub fn genotype_map(&self) -> HashMap<&str, &Genotype> {
        self.markers
            .iter()
            .map(|marker| (marker.rsid.as_str(), &marker.genotype))
            .collect()
    }
}

/// Population → percentage, kept in panel order
///
/// Serializes as a JSON object whose key order follows the panel's
/// population list so equal percentages always render identically.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AncestryBreakdown(Vec<(String, f64)>);

impl AncestryBreakdown {
    pub fn new(entries: Vec<(String, f64)>) -> Self {
        Self(entries)
    }

    pub fn get(&self, population: &str) -> Option<f64> {
        self.0
            .iter()
            .find(|(name, _)| name == population)
            .map(|(_, value)| *value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(name, value)| (name.as_str(), *value))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn total(&self) -> f64 {
        self.0.iter().map(|(_, value)| value).sum()
    }

    /// Highest-ranked population; ties resolve to the earlier panel entry
    pub fn top(&self) -> Option<(&str, f64)> {
        self.iter().fold(None, |best, (name, value)| match best {
            Some((_, best_value)) if best_value >= value => best,
            _ => Some((name, value)),
        })
    }

    /// Entries sorted by descending percentage (stable for ties)
    pub fn ranked(&self) -> Vec<(&str, f64)> {
        let mut ranked: Vec<(&str, f64)> = self.iter().collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked
    }
}

impl Serialize for AncestryBreakdown {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (population, percentage) in &self.0 {
            map.serialize_entry(population, percentage)?;
        }
        map.end()
    }
}

/// Ancestry estimate for one sample against one reference panel
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AncestryResult {
    /// Calculator display name (e.g., "Comprehensive Ancestry")
    pub name: String,

    pub description: String,

    /// Percentages per population, panel order
    pub ancestry: AncestryBreakdown,

    /// Heuristic 0-100 separation score
    pub confidence: f64,

    /// Distinct panel rsids present in the input (never above `total_markers`)
    pub markers_used: usize,

    /// Size of the panel's marker set
    pub total_markers: usize,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,

    pub insufficient_markers: bool,
}
