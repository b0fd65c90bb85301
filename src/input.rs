// ==============================================================================
// input.rs - Export Container Decoding
// ==============================================================================
// Description: Opens plain, gzip and zip raw exports as buffered text readers
// Author: Matt Barham
// Created: 2026-10-02
// Modified: 2026-10-02
// Version: 1.0.0
// ==============================================================================

use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use serde::Serialize;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::debug;

const GZIP_MAGIC: &[u8] = &[0x1f, 0x8b, 0x08];
const ZIP_MAGIC: &[u8] = &[0x50, 0x4b, 0x03, 0x04];

const ZIP_TEXT_EXTENSIONS: &[&str] = &[".txt", ".csv", ".tsv"];

/// Container format of an export file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    None,
    Gzip,
    Zip,
}

impl Compression {
    /// Leading bytes every file of this format starts with (empty for plain text)
    pub fn magic(&self) -> &'static [u8] {
        match self {
            Compression::None => &[],
            Compression::Gzip => GZIP_MAGIC,
            Compression::Zip => ZIP_MAGIC,
        }
    }
}

/// Run `f` over a buffered, decompressed view of an export file
///
/// Zip archives are read from their first `.txt`/`.csv`/`.tsv` entry.
pub fn with_export_reader<T>(
    path: &Path,
    compression: Compression,
    f: impl FnOnce(&mut dyn BufRead) -> Result<T>,
) -> Result<T> {
    let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;

    match compression {
        Compression::None => f(&mut BufReader::new(file)),
        Compression::Gzip => f(&mut BufReader::new(GzDecoder::new(file))),
        Compression::Zip => {
            let mut archive =
                zip::ZipArchive::new(file).context("Failed to open zip archive")?;

            let entry_name = archive
                .file_names()
                .filter(|name| !name.starts_with("__MACOSX"))
                .find(|name| {
                    let lowered = name.to_lowercase();
                    ZIP_TEXT_EXTENSIONS.iter().any(|ext| lowered.ends_with(ext))
                })
                .map(str::to_string)
                .ok_or_else(|| anyhow::anyhow!("Zip archive contains no raw data text file"))?;

            debug!("Reading zip entry {}", entry_name);
            let mut entry = archive
                .by_name(&entry_name)
                .with_context(|| format!("Failed to read zip entry {}", entry_name))?;
            f(&mut BufReader::new(&mut entry))
        }
    }
}
