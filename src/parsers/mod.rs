// ==============================================================================
// parsers/mod.rs - File parser modules
// ==============================================================================
// Description: Parsers for consumer genetic data export formats
// Author: Matt Barham
// Created: 2025-11-03
// Modified: 2026-09-03
// Version: 2.0.0
// ==============================================================================

pub mod raw_export;

pub use raw_export::{ExportLines, MarkerStream, ParseError, ParserOptions, RawExportParser};
