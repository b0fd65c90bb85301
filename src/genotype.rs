// ==============================================================================
// genotype.rs - Genotype Normalization
// ==============================================================================
// Description: Canonicalizes raw vendor genotype tokens for comparison/scoring
// Author: Matt Barham
// Created: 2026-09-02
// Modified: 2026-09-14
// Version: 1.1.0
// ==============================================================================
// Algorithm:
//   - Keep only A/C/G/T (case-insensitive), uppercase the rest
//   - "" after cleaning          → "--" (missing)
//   - one base (e.g. "A")        → "A"  (hemizygous X/Y/MT calls)
//   - two or more bases ("GA")   → first two, sorted ("AG")
//   Examples: "A/G" → "AG", "ga" → "AG", "TT" → "TT", "--" → "--", "II" → "--"
// ==============================================================================

use serde::{Deserialize, Serialize};
use std::fmt;

/// Sentinel for a missing / no-call genotype
pub const MISSING_GENOTYPE: &str = "--";

/// Normalize a raw genotype token into its canonical form
///
/// Never fails: anything that contains no recognizable base collapses to
/// the missing sentinel `"--"`.
///
/// # Examples
/// ```
/// use ancestry_processor::genotype::normalize_genotype;
///
/// assert_eq!(normalize_genotype("A/G"), "AG");
/// assert_eq!(normalize_genotype("ga"), "AG");
/// assert_eq!(normalize_genotype("TT"), "TT");
/// assert_eq!(normalize_genotype("C"), "C");
/// assert_eq!(normalize_genotype(""), "--");
/// assert_eq!(normalize_genotype("--"), "--");
/// ```
pub fn normalize_genotype(raw: &str) -> String {
    let mut bases: Vec<char> = raw
        .chars()
        .map(|c| c.to_ascii_uppercase())
        .filter(|c| matches!(c, 'A' | 'C' | 'G' | 'T'))
        .take(2)
        .collect();

    match bases.len() {
        0 => MISSING_GENOTYPE.to_string(),
        1 => bases.iter().collect(),
        _ => {
            bases.sort_unstable();
            bases.iter().collect()
        }
    }
}

/// Normalize an optional token (absent cells map to the missing sentinel)
pub fn normalize_optional(raw: Option<&str>) -> String {
    raw.map(normalize_genotype)
        .unwrap_or_else(|| MISSING_GENOTYPE.to_string())
}

/// Canonical genotype value
///
/// Only constructible through normalization, so every `Genotype` in the
/// system is already canonical.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Genotype(String);

impl Genotype {
    /// Normalize a raw token
    pub fn parse(raw: &str) -> Self {
        Self(normalize_genotype(raw))
    }

    /// The missing / no-call genotype
    pub fn missing() -> Self {
        Self(MISSING_GENOTYPE.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_missing(&self) -> bool {
        self.0 == MISSING_GENOTYPE
    }

    /// Individual allele characters of the canonical form
    ///
    /// The missing sentinel yields two `'-'` alleles; no panel lists `'-'`,
    /// so a no-call is scored with the floor frequency for every population.
    pub fn alleles(&self) -> impl Iterator<Item = char> + '_ {
        self.0.chars()
    }
}

impl From<String> for Genotype {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl From<Genotype> for String {
    fn from(genotype: Genotype) -> Self {
        genotype.0
    }
}

impl fmt::Display for Genotype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Genotype {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
