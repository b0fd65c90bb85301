// ==============================================================================
// ancestry_calculator_demo.rs - Ancestry Calculator Example
// ==============================================================================
// Description: Demonstrates scoring a marker set with every calculator variant
// Author: Matthew Barham
// Created: 2026-09-15
// Modified: 2026-09-22
// Version: 1.0.0
// ==============================================================================

use ancestry_processor::calculator::Calculator;
use ancestry_processor::estimator::EstimatorConfig;
use ancestry_processor::models::Marker;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Ancestry Calculator Example ===\n");

    let calculator = Calculator::with_builtin_panels(EstimatorConfig::default())?;

    // Example 1: Registered variants
    println!("--- Example 1: Variants ---\n");
    println!("{:<18} {:<30} {:>8} {:>12}", "Id", "Name", "Markers", "Populations");
    println!("{:-<72}", "");
    for panel in calculator.panels() {
        println!(
            "{:<18} {:<30} {:>8} {:>12}",
            panel.id(),
            panel.name(),
            panel.marker_count(),
            panel.populations().len()
        );
    }

    // Example 2: European-leaning sample
    let markers = vec![
        Marker::new("rs1426654", "15", Some(48426484), "AA"),
        Marker::new("rs4988235", "2", Some(136608646), "TT"),
        Marker::new("rs12913832", "15", Some(28365618), "GG"),
        Marker::new("rs2814778", "1", Some(159174683), "TT"),
        Marker::new("rs3827760", "2", Some(109513601), "AA"),
        Marker::new("rs16891982", "5", Some(33951693), "GG"),
    ];

    println!("\n--- Example 2: Scoring {} markers ---", markers.len());
    for (variant, result) in calculator.estimate_all(&markers) {
        println!("\n{} ({})", result.name, variant);
        println!(
            "  used {}/{} markers, confidence {:.1}",
            result.markers_used, result.total_markers, result.confidence
        );
        for (population, percent) in result.ancestry.ranked() {
            println!("  {:<20} {:>6.1}%", population, percent);
        }
    }

    // Example 3: Too few markers
    println!("\n--- Example 3: Insufficient Markers ---\n");
    let result = calculator.estimate("comprehensive", &markers[..2])?;
    println!(
        "insufficient: {}, warning: {}",
        result.insufficient_markers,
        result.warning.as_deref().unwrap_or("none")
    );

    println!("\n=== Example Complete ===");
    Ok(())
}
