// ==============================================================================
// lib.rs - Ancestry Processor Library
// ==============================================================================
// Description: Library interface for raw export parsing and ancestry estimation
// Author: Matt Barham
// Created: 2025-11-03
// Modified: 2026-09-22
// Version: 2.0.0
// ==============================================================================

pub mod calculator;
pub mod estimator;
pub mod genotype;
pub mod input;
pub mod models;
pub mod output;
pub mod parsers;
pub mod processor;
pub mod reference_panel;
pub mod validator;

pub use calculator::{Calculator, CalculatorError, DEFAULT_VARIANT};
pub use estimator::{AncestryEstimator, EstimatorConfig};
pub use models::{AncestryResult, Marker, ParsedFile, Provider};
pub use parsers::RawExportParser;
pub use reference_panel::ReferencePanel;
