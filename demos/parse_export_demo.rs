// ==============================================================================
// parse_export_demo.rs - Raw Export Parsing Example
// ==============================================================================
// Description: Demonstrates parsing vendor exports into canonical markers
// Author: Matthew Barham
// Created: 2026-09-15
// Modified: 2026-09-22
// Version: 1.0.0
// ==============================================================================

use ancestry_processor::genotype::normalize_genotype;
use ancestry_processor::parsers::RawExportParser;

const EXPORTS: &[(&str, &str)] = &[
    (
        "23andMe (tab, comment header)",
        "# This data file generated by 23andMe\n\
         # rsid\tchromosome\tposition\tgenotype\n\
         rs4988235\t2\t136608646\tCT\n\
         rs1426654\t15\t48426484\tAA\n\
         i3000001\tMT\t16470\tG\n",
    ),
    (
        "AncestryDNA (split alleles)",
        "#AncestryDNA raw data download\n\
         rsid\tchromosome\tposition\tallele1\tallele2\n\
         rs4988235\t2\t136608646\tT\tC\n\
         rs12913832\t15\t28365618\t0\t0\n",
    ),
    (
        "MyHeritage (quoted CSV)",
        "# MyHeritage DNA raw data.\n\
         RSID,CHROMOSOME,POSITION,RESULT\n\
         \"rs4988235\",\"2\",\"136608646\",\"TC\"\n\
         \"rs3827760\",\"2\",\"109513601\",\"GA\"\n",
    ),
    (
        "Headerless (positional)",
        "rs2814778 1 159174683 TT\nrs1229984 4 100239319 CT\nnot-a-marker 1 1 AA\n",
    ),
];

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Raw Export Parsing Example ===\n");

    // Example 1: Genotype normalization
    println!("--- Example 1: Genotype Normalization ---\n");
    println!("{:<12} {}", "Raw", "Canonical");
    println!("{:-<24}", "");
    for raw in ["TC", "ct", "A", "--", "00", "I/D", "GAT"] {
        println!("{:<12} {}", format!("{:?}", raw), normalize_genotype(raw));
    }

    // Example 2: Vendor layouts
    println!("\n--- Example 2: Vendor Layouts ---");
    let parser = RawExportParser::new();

    for (label, text) in EXPORTS {
        let parsed = parser.parse_str(text)?;
        println!("\n{} -> provider {}", label, parsed.provider);
        println!(
            "  lines: {}, markers: {}, chromosomes: {}",
            parsed.summary.total_lines_scanned,
            parsed.summary.parsed_marker_count,
            parsed.summary.distinct_chromosome_count
        );
        println!("  {:<12} {:<6} {:<12} {}", "rsid", "chr", "position", "genotype");
        for marker in &parsed.markers {
            let position = marker
                .position
                .map(|p| p.to_string())
                .unwrap_or_else(|| "-".to_string());
            println!(
                "  {:<12} {:<6} {:<12} {}",
                marker.rsid, marker.chromosome, position, marker.genotype
            );
        }
    }

    // Example 3: Streaming with a small materialized sample
    println!("\n--- Example 3: Streaming ---\n");
    let large: String = (1..=25_000)
        .map(|i| format!("rs{}\t{}\t{}\tAG\n", i, i % 22 + 1, i * 100))
        .collect();
    let parsed = RawExportParser::new()
        .with_sample_limit(5)
        .parse_str(&large)?;
    println!(
        "Counted {} markers, kept {} in memory",
        parsed.summary.parsed_marker_count,
        parsed.markers.len()
    );

    println!("\n=== Example Complete ===");
    Ok(())
}
